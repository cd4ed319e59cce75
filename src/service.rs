use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::{
    aggregator::Aggregator,
    config::EmailConfig,
    error::{Error, Result},
    helpers::{email, loader, pdf, xlsx},
    models::summary::Summary,
};

pub const DEFAULT_XLSX_PATH: &str = "helpdesk_report.xlsx";
pub const DEFAULT_PDF_PATH: &str = "helpdesk_report.pdf";

/// How the summary is printed to standard output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SummaryFormat {
    #[default]
    Text,
    Json,
}

/// Configuration for the report service
#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub xlsx_path: PathBuf,
    pub pdf_path: PathBuf,
    pub summary_format: SummaryFormat,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            xlsx_path: PathBuf::from(DEFAULT_XLSX_PATH),
            pdf_path: PathBuf::from(DEFAULT_PDF_PATH),
            summary_format: SummaryFormat::Text,
        }
    }
}

/// What a completed run produced.
#[derive(Debug, Clone)]
pub struct ReportOutcome {
    pub summary: Summary,
    pub xlsx_path: PathBuf,
    pub pdf_path: PathBuf,
    pub emailed: bool,
}

/// Runs the load → aggregate → export → send pipeline.
#[derive(Debug, Clone, Default)]
pub struct ReportService {
    pub config: ReportConfig,
}

impl ReportService {
    pub fn new(config: ReportConfig) -> Self {
        info!("Creating new ReportService instance");
        Self { config }
    }

    /// Errors propagate unchanged; files already exported stay on disk.
    pub fn run<P: AsRef<Path>>(
        &self,
        source: P,
        email_config: Option<&EmailConfig>,
    ) -> Result<ReportOutcome> {
        let source = source.as_ref();
        info!("Generating helpdesk report from {}", source.display());

        let tickets = loader::load_tickets(source)?;
        let summary = Aggregator::new(&tickets).summary();
        info!(
            "Aggregated {} tickets ({} closed, {}%)",
            summary.total, summary.closed, summary.closure_rate
        );

        self.print_summary(&summary)?;

        let xlsx_path = xlsx::export_spreadsheet(&summary, &tickets, &self.config.xlsx_path)?;
        let pdf_path = pdf::export_document(&summary, &self.config.pdf_path)?;

        println!();
        println!("Excel exported to: {}", xlsx_path.display());
        println!("PDF exported to: {}", pdf_path.display());

        let emailed = match email_config {
            Some(cfg) => {
                match email::send_report(&[&xlsx_path, &pdf_path], cfg) {
                    Ok(()) => println!("Email sent to {} with attachments.", cfg.to.join(", ")),
                    Err(e) => {
                        error!("Report generated but email delivery failed: {}", e);
                        return Err(e);
                    }
                }
                true
            }
            None => {
                info!("No email configuration, skipping delivery");
                false
            }
        };

        Ok(ReportOutcome {
            summary,
            xlsx_path,
            pdf_path,
            emailed,
        })
    }

    fn print_summary(&self, summary: &Summary) -> Result<()> {
        match self.config.summary_format {
            SummaryFormat::Text => {
                println!();
                println!("=== Helpdesk Report Summary ===");
                print!("{}", summary);
            }
            SummaryFormat::Json => {
                let json = serde_json::to_string_pretty(summary)
                    .map_err(|e| Error::Format(format!("Failed to serialize summary: {}", e)))?;
                println!("{}", json);
            }
        }
        Ok(())
    }
}
