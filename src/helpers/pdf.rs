use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::error::{Error, Result};
use crate::models::summary::{SectionValue, Summary};

pub const REPORT_TITLE: &str = "Helpdesk Daily Report";

// A4 in points
const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: i64 = 56;
const INDENT: i64 = 18;

const TITLE_SIZE: i64 = 16;
const BODY_SIZE: i64 = 12;
const TITLE_ADVANCE: i64 = 40;
const LINE_ADVANCE: i64 = 20;
const SECTION_GAP: i64 = 10;

const REGULAR_FONT: &[u8] = b"F1";
const BOLD_FONT: &[u8] = b"F2";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStyle {
    Title,
    Heading,
    Entry,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Line { text: String, style: LineStyle },
    Gap,
}

/// A line positioned on a page, text already encoded for the PDF font.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub x: i64,
    pub y: i64,
    pub style: LineStyle,
    pub text: Vec<u8>,
}

/// Report content in reading order: title, then one block run per summary field.
pub fn layout(summary: &Summary) -> Vec<Block> {
    let mut blocks = vec![Block::Line {
        text: REPORT_TITLE.to_string(),
        style: LineStyle::Title,
    }];

    for section in summary.sections() {
        match section.value {
            SectionValue::Scalar(value) => blocks.push(Block::Line {
                text: format!("{}: {}", section.label, value),
                style: LineStyle::Heading,
            }),
            SectionValue::Entries(entries) => {
                blocks.push(Block::Line {
                    text: format!("{}:", section.label),
                    style: LineStyle::Heading,
                });
                blocks.extend(entries.into_iter().map(|(key, value)| Block::Line {
                    text: format!("{}: {}", key, value),
                    style: LineStyle::Entry,
                }));
            }
        }
        blocks.push(Block::Gap);
    }

    blocks
}

/// Assigns page coordinates, starting a new page when the bottom margin is reached.
pub fn paginate(blocks: &[Block]) -> Result<Vec<Vec<PlacedLine>>> {
    let top = PAGE_HEIGHT - MARGIN;
    let mut pages: Vec<Vec<PlacedLine>> = vec![Vec::new()];
    let mut y = top;

    for block in blocks {
        match block {
            Block::Gap => y -= SECTION_GAP,
            Block::Line { text, style } => {
                if y < MARGIN {
                    pages.push(Vec::new());
                    y = top;
                }

                let encoded = encode_win_ansi(text)?;
                let (x, advance) = match style {
                    LineStyle::Title => (centered_x(encoded.len(), TITLE_SIZE), TITLE_ADVANCE),
                    LineStyle::Heading => (MARGIN, LINE_ADVANCE),
                    LineStyle::Entry => (MARGIN + INDENT, LINE_ADVANCE),
                };

                if let Some(page) = pages.last_mut() {
                    page.push(PlacedLine {
                        x,
                        y,
                        style: *style,
                        text: encoded,
                    });
                }
                y -= advance;
            }
        }
    }

    Ok(pages)
}

// Helvetica Bold averages a little over half an em per glyph.
fn centered_x(chars: usize, size: i64) -> i64 {
    let width = chars as i64 * size * 11 / 20;
    ((PAGE_WIDTH - width) / 2).max(MARGIN)
}

/// Standard Type1 fonts only cover WinAnsi: Latin-1 plus the cp1252
/// punctuation block at 0x80..=0x9F. Anything else is rejected.
fn encode_win_ansi(text: &str) -> Result<Vec<u8>> {
    text.chars()
        .map(|c| match c as u32 {
            0x20..=0x7E | 0xA0..=0xFF => Ok(c as u8),
            _ => win_ansi_extra(c).ok_or_else(|| {
                Error::Format(format!(
                    "character {:?} in {:?} cannot be rendered in the PDF report",
                    c, text
                ))
            }),
        })
        .collect()
}

fn win_ansi_extra(c: char) -> Option<u8> {
    let byte = match c {
        '\u{20AC}' => 0x80, // €
        '\u{201A}' => 0x82,
        '\u{0192}' => 0x83,
        '\u{201E}' => 0x84,
        '\u{2026}' => 0x85, // …
        '\u{2020}' => 0x86,
        '\u{2021}' => 0x87,
        '\u{02C6}' => 0x88,
        '\u{2030}' => 0x89,
        '\u{0160}' => 0x8A,
        '\u{2039}' => 0x8B,
        '\u{0152}' => 0x8C,
        '\u{017D}' => 0x8E,
        '\u{2018}' => 0x91,
        '\u{2019}' => 0x92,
        '\u{201C}' => 0x93,
        '\u{201D}' => 0x94,
        '\u{2022}' => 0x95,
        '\u{2013}' => 0x96, // en dash
        '\u{2014}' => 0x97, // em dash
        '\u{02DC}' => 0x98,
        '\u{2122}' => 0x99,
        '\u{0161}' => 0x9A,
        '\u{203A}' => 0x9B,
        '\u{0153}' => 0x9C,
        '\u{017E}' => 0x9E,
        '\u{0178}' => 0x9F,
        _ => return None,
    };
    Some(byte)
}

fn font(base_font: &[u8]) -> lopdf::Dictionary {
    dictionary! {
        b"Type" => Object::Name(b"Font".to_vec()),
        b"Subtype" => Object::Name(b"Type1".to_vec()),
        b"BaseFont" => Object::Name(base_font.to_vec()),
        b"Encoding" => Object::Name(b"WinAnsiEncoding".to_vec()),
    }
}

fn page_content(lines: &[PlacedLine]) -> Result<Vec<u8>> {
    let mut operations = Vec::with_capacity(lines.len() * 5);

    for line in lines {
        let (font_name, size) = match line.style {
            LineStyle::Title => (BOLD_FONT, TITLE_SIZE),
            LineStyle::Heading | LineStyle::Entry => (REGULAR_FONT, BODY_SIZE),
        };
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new(
            "Tf",
            vec![Object::Name(font_name.to_vec()), Object::Integer(size)],
        ));
        operations.push(Operation::new(
            "Td",
            vec![Object::Integer(line.x), Object::Integer(line.y)],
        ));
        operations.push(Operation::new(
            "Tj",
            vec![Object::String(line.text.clone(), StringFormat::Literal)],
        ));
        operations.push(Operation::new("ET", vec![]));
    }

    Content { operations }
        .encode()
        .map_err(|e| Error::Format(format!("Failed to encode page content: {}", e)))
}

/// Builds the PDF document in memory.
pub fn render_document(summary: &Summary) -> Result<Vec<u8>> {
    let pages = paginate(&layout(summary))?;

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular_id = doc.add_object(font(b"Helvetica"));
    let bold_id = doc.add_object(font(b"Helvetica-Bold"));
    let resources_id = doc.add_object(dictionary! {
        b"Font" => dictionary! {
            REGULAR_FONT => regular_id,
            BOLD_FONT => bold_id,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for lines in &pages {
        let content_id = doc.add_object(Stream::new(dictionary! {}, page_content(lines)?));
        let page_id: ObjectId = doc.add_object(dictionary! {
            b"Type" => Object::Name(b"Page".to_vec()),
            b"Parent" => pages_id,
            b"Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let page_count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            b"Type" => Object::Name(b"Pages".to_vec()),
            b"Kids" => Object::Array(kids),
            b"Count" => Object::Integer(page_count),
            b"Resources" => resources_id,
            b"MediaBox" => Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(PAGE_WIDTH),
                Object::Integer(PAGE_HEIGHT),
            ]),
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        b"Type" => Object::Name(b"Catalog".to_vec()),
        b"Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        b"Title" => Object::string_literal(REPORT_TITLE),
        b"Producer" => Object::string_literal("helpdesk-report"),
    });
    doc.trailer.set(b"Root", catalog_id);
    doc.trailer.set(b"Info", info_id);
    doc.compress();

    let mut output_buffer: Vec<u8> = Vec::new();
    match doc.save_to(&mut output_buffer) {
        Ok(_) => {
            info!(
                "Rendered PDF report: {} page(s), {} bytes",
                pages.len(),
                output_buffer.len()
            );
            Ok(output_buffer)
        }
        Err(e) => {
            error!("Failed to serialize PDF: {}", e);
            Err(Error::Format(format!("Failed to serialize PDF: {}", e)))
        }
    }
}

/// Renders the summary and writes it to `path`, returning the path written.
pub fn export_document<P: AsRef<Path>>(summary: &Summary, path: P) -> Result<PathBuf> {
    let path = path.as_ref();
    info!("Exporting PDF report to {}", path.display());

    let bytes = render_document(summary)?;
    if let Err(e) = fs::write(path, &bytes) {
        error!("Failed to write PDF {}: {}", path.display(), e);
        return Err(e.into());
    }

    Ok(path.to_path_buf())
}
