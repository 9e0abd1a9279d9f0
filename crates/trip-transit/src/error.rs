//! Transit routing errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransitError {
    /// No transit journey exists for any candidate stop pair and walking is
    /// not an option.
    #[error("no transit route found")]
    NoTransitRoute,

    /// Like `NoTransitRoute`, but the departure is later than every vehicle
    /// still operating that day — the next day's services are not consulted.
    #[error("departure at {dep_secs}s is after the last operating vehicle of the day")]
    TimeOutOfDay { dep_secs: u32 },

    #[error("stop {0:?} not found")]
    StopNotFound(String),

    #[error("trip {0:?} not found")]
    TripNotFound(String),

    /// A trip's stop sequence or frequency spans are mutually inconsistent.
    #[error("trip {trip:?}: {message}")]
    InvalidTemplate { trip: String, message: String },
}

pub type TransitResult<T> = Result<T, TransitError>;
