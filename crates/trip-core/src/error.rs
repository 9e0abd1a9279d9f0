//! Framework error type.
//!
//! Sub-crates define their own error enums (`GtfsError`, `TransitError`,
//! `RoadError`, `SimError`, `OutputError`) and either convert `CoreError`
//! into them via `From` impls or wrap it as one variant.  Both patterns are
//! acceptable; prefer whichever keeps error sites clean.

use thiserror::Error;

use crate::time::TimeError;

/// The base error type for `trip-core` primitives.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Time(#[from] TimeError),
}

/// Shorthand result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
