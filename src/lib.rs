//! Helpdesk report library
//!
//! Loads helpdesk ticket exports, aggregates them into summary statistics,
//! renders spreadsheet and PDF reports, and optionally emails them over SMTP.

pub mod aggregator;
pub mod config;
pub mod error;
pub mod helpers;
pub mod models;
pub mod service;

pub use aggregator::Aggregator;
pub use config::{EmailConfig, SmtpSecurity};
pub use error::{Error, Result};
pub use service::{ReportConfig, ReportOutcome, ReportService, SummaryFormat};

// Re-export key types for convenience
pub use helpers::loader::load_tickets;
pub use helpers::pdf::export_document;
pub use helpers::xlsx::export_spreadsheet;
pub use models::summary::{CategoryCount, Summary};
pub use models::ticket::{Ticket, TicketStatus};
