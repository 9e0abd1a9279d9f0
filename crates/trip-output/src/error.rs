//! Output backend errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "sqlite")]
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub type OutputResult<T> = Result<T, OutputError>;
