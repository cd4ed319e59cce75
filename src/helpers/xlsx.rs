use chrono::NaiveDate;
use rust_xlsxwriter::{Format, FormatBorder, Workbook, Worksheet, XlsxError};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::error::Result;
use crate::models::summary::Summary;
use crate::models::ticket::Ticket;

pub const TICKETS_SHEET: &str = "Tickets";
pub const OPENED_SHEET: &str = "Opened per Day";
pub const CLOSED_SHEET: &str = "Closed per Day";
pub const CATEGORY_SHEET: &str = "By Category";

/// Bold white-on-blue header with a thin border.
fn header_format() -> Format {
    Format::new()
        .set_bold()
        .set_background_color("2C5F8A")
        .set_font_color("FFFFFF")
        .set_border(FormatBorder::Thin)
}

fn datetime_format() -> Format {
    Format::new().set_num_format("yyyy-mm-dd hh:mm")
}

fn date_format() -> Format {
    Format::new().set_num_format("yyyy-mm-dd")
}

fn integer_format() -> Format {
    Format::new().set_num_format("#,##0")
}

/// Writes the four-sheet workbook to `path` and returns the path written.
pub fn export_spreadsheet<P: AsRef<Path>>(
    summary: &Summary,
    tickets: &[Ticket],
    path: P,
) -> Result<PathBuf> {
    let path = path.as_ref();
    info!("Exporting spreadsheet report to {}", path.display());

    let mut wb = Workbook::new();
    write_tickets(&mut wb, tickets)?;
    write_daily_counts(&mut wb, OPENED_SHEET, "Opened", &summary.tickets_per_day)?;
    write_daily_counts(&mut wb, CLOSED_SHEET, "Closed", &summary.closed_per_day)?;
    write_categories(&mut wb, summary)?;

    if let Err(e) = wb.save(path) {
        error!("Failed to save spreadsheet {}: {}", path.display(), e);
        return Err(e.into());
    }

    info!("Spreadsheet written with {} ticket rows", tickets.len());
    Ok(path.to_path_buf())
}

fn write_headers(ws: &mut Worksheet, headers: &[&str]) -> std::result::Result<(), XlsxError> {
    let hdr = header_format();
    for (col, h) in headers.iter().enumerate() {
        ws.write_with_format(0, col as u16, *h, &hdr)?;
    }
    ws.set_freeze_panes(1, 0)?;
    Ok(())
}

fn write_tickets(wb: &mut Workbook, tickets: &[Ticket]) -> std::result::Result<(), XlsxError> {
    let ws = wb.add_worksheet();
    ws.set_name(TICKETS_SHEET)?;
    write_headers(
        ws,
        &["Ticket_ID", "Date_Opened", "Date_Closed", "Category", "Status"],
    )?;

    let dt = datetime_format();
    for (i, t) in tickets.iter().enumerate() {
        let row = (i + 1) as u32;
        ws.write(row, 0, t.id())?;
        ws.write_datetime_with_format(row, 1, &t.opened(), &dt)?;
        if let Some(closed) = t.closed() {
            ws.write_datetime_with_format(row, 2, &closed, &dt)?;
        }
        ws.write(row, 3, t.category())?;
        ws.write(row, 4, t.status().as_str())?;
    }

    ws.set_column_width(0, 14)?;
    ws.set_column_width(1, 18)?;
    ws.set_column_width(2, 18)?;
    ws.set_column_width(3, 20)?;
    ws.set_column_width(4, 12)?;
    Ok(())
}

fn write_daily_counts(
    wb: &mut Workbook,
    sheet: &str,
    value_header: &str,
    counts: &BTreeMap<NaiveDate, usize>,
) -> std::result::Result<(), XlsxError> {
    let ws = wb.add_worksheet();
    ws.set_name(sheet)?;
    write_headers(ws, &["Date", value_header])?;

    let date = date_format();
    let int = integer_format();
    for (i, (day, count)) in counts.iter().enumerate() {
        let row = (i + 1) as u32;
        ws.write_datetime_with_format(row, 0, day, &date)?;
        ws.write_with_format(row, 1, *count as f64, &int)?;
    }

    ws.set_column_width(0, 14)?;
    ws.set_column_width(1, 10)?;
    Ok(())
}

fn write_categories(wb: &mut Workbook, summary: &Summary) -> std::result::Result<(), XlsxError> {
    let ws = wb.add_worksheet();
    ws.set_name(CATEGORY_SHEET)?;
    write_headers(ws, &["Category", "Count"])?;

    let int = integer_format();
    for (i, c) in summary.by_category.iter().enumerate() {
        let row = (i + 1) as u32;
        ws.write(row, 0, c.category.as_str())?;
        ws.write_with_format(row, 1, c.count as f64, &int)?;
    }

    ws.set_column_width(0, 24)?;
    ws.set_column_width(1, 10)?;
    Ok(())
}
