//! Error types for defsys-core.

use thiserror::Error;

/// Result type alias for defsys-core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors that can occur while preparing a tree report.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Writing the dataset or script failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The CSV writer rejected a record.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
