//! Road routing errors.

use thiserror::Error;

use trip_core::NodeId;

#[derive(Debug, Error)]
pub enum RoadError {
    /// The search exhausted the graph without reaching the target.
    #[error("no road route from {from} to {to}")]
    NoRoute { from: NodeId, to: NodeId },

    /// No road edge anywhere near the coordinate — the point is outside the
    /// network's coverage.
    #[error("no road edge near ({lat:.6}, {lon:.6})")]
    OutOfBounds { lat: f64, lon: f64 },

    #[error("road network has no edges")]
    EmptyNetwork,
}

pub type RoadResult<T> = Result<T, RoadError>;
