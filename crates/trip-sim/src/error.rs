//! Simulation errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Transit(#[from] trip_transit::TransitError),

    #[error(transparent)]
    Road(#[from] trip_road::RoadError),

    #[error("snapshot parse error: {0}")]
    Snapshot(String),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type SimResult<T> = Result<T, SimError>;
