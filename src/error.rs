use rust_xlsxwriter::XlsxError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to load tickets from {path}: {message}")]
    Load { path: String, message: String },

    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("Invalid ticket on row {row}: {message}")]
    Parse { row: usize, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Format error: {0}")]
    Format(String),

    #[error("SMTP login rejected: {0}")]
    Auth(String),

    #[error("SMTP transport error: {0}")]
    Transport(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<XlsxError> for Error {
    fn from(e: XlsxError) -> Self {
        match e {
            XlsxError::IoError(io) => Error::Io(io),
            other => Error::Format(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
