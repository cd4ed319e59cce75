use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use helpdesk_report::{
    EmailConfig, ReportConfig, ReportService, SummaryFormat,
    service::{DEFAULT_PDF_PATH, DEFAULT_XLSX_PATH},
};

#[derive(Parser)]
#[command(
    name = "helpdesk-report",
    about = "Summarize helpdesk tickets into Excel and PDF reports"
)]
struct Cli {
    /// Ticket export (.xlsx, .xls, .ods or .csv) with Ticket_ID, Date_Opened,
    /// Date_Closed, Category and Status columns
    source: PathBuf,

    /// Spreadsheet report path
    #[arg(long, default_value = DEFAULT_XLSX_PATH)]
    xlsx_out: PathBuf,

    /// PDF report path
    #[arg(long, default_value = DEFAULT_PDF_PATH)]
    pdf_out: PathBuf,

    /// JSON email settings; otherwise HELPDESK_* environment variables are used
    #[arg(long, value_name = "FILE")]
    email_config: Option<PathBuf>,

    /// Never send the report by email
    #[arg(long, conflicts_with = "email_config")]
    no_email: bool,

    /// Print the summary as JSON instead of text
    #[arg(long)]
    json: bool,

    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> anyhow::Result<()> {
    // A missing .env file is fine
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: Error loading .env file: {}", e);
        }
    }

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let email_config = if cli.no_email {
        None
    } else if let Some(path) = &cli.email_config {
        let config = EmailConfig::from_json_file(path)
            .with_context(|| format!("loading email settings from {}", path.display()))?;
        Some(config)
    } else {
        EmailConfig::from_env().context("reading email settings from the environment")?
    };

    let service = ReportService::new(ReportConfig {
        xlsx_path: cli.xlsx_out,
        pdf_path: cli.pdf_out,
        summary_format: if cli.json {
            SummaryFormat::Json
        } else {
            SummaryFormat::Text
        },
    });

    let outcome = service
        .run(&cli.source, email_config.as_ref())
        .with_context(|| format!("generating report from {}", cli.source.display()))?;

    info!(
        "Done: {} tickets, reports at {} and {}{}",
        outcome.summary.total,
        outcome.xlsx_path.display(),
        outcome.pdf_path.display(),
        if outcome.emailed { ", emailed" } else { "" }
    );
    Ok(())
}
