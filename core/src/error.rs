use std::path::PathBuf;
use thiserror::Error;

/// Result type for sarcopipe operations
pub type Result<T> = std::result::Result<T, SarcopipeError>;

/// Error types for sarcopipe operations
#[derive(Error, Debug)]
pub enum SarcopipeError {
    /// I/O error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// CSV reading or writing error
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// External tool could not be run
    #[error("Tool error ({program}): {message}")]
    ToolError { program: String, message: String },

    /// Required input file does not exist
    #[error("Missing input: {}", .0.display())]
    MissingInput(PathBuf),

    /// Table has a header but no data row
    #[error("Empty table: {}", .0.display())]
    EmptyTable(PathBuf),

    /// Required value absent from the input tables
    #[error("Missing value: {0}")]
    MissingValue(String),

    /// Value present but not usable
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Caller-supplied input rejected
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<String> for SarcopipeError {
    fn from(s: String) -> Self {
        SarcopipeError::InvalidInput(s)
    }
}

impl From<&str> for SarcopipeError {
    fn from(s: &str) -> Self {
        SarcopipeError::InvalidInput(s.to_string())
    }
}
