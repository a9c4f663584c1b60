use std::path::PathBuf;
use thiserror::Error;

/// Run-level failures. Individual unparsable cells never end up here; they
/// become missing values inside the tables.
#[derive(Error, Debug)]
pub enum O2cError {
    #[error("input not found: {}", path.display())]
    InputMissing { path: PathBuf },

    #[error("could not read {} as a table: {reason}", path.display())]
    InputMalformed { path: PathBuf, reason: String },

    #[error("required column {column} missing in {}", path.display())]
    MissingColumn { path: PathBuf, column: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, O2cError>;
