//! GTFS ingestion errors.

use thiserror::Error;

/// Anything that makes a feed unusable (*gtfs-invalid* in the simulator's
/// error taxonomy).  Raised before the simulation starts; never recovered.
#[derive(Debug, Error)]
pub enum GtfsError {
    #[error("required GTFS table {0:?} is missing")]
    MissingTable(&'static str),

    #[error("GTFS table {table:?}: {message}")]
    Invalid { table: &'static str, message: String },

    #[error("malformed time in {table:?} row {row}: {source}")]
    BadTime {
        table: &'static str,
        row:   usize,
        #[source]
        source: trip_core::time::TimeError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shorthand result type for feed loading.
pub type GtfsResult<T> = Result<T, GtfsError>;
