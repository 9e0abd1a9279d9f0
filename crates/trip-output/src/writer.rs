//! The `OutputWriter` trait implemented by all backend writers.

use crate::row::{AgentTripRow, RoadOccupancyRow};
use crate::OutputResult;

/// Trait implemented by the CSV and SQLite writers.
pub trait OutputWriter {
    /// Write a batch of completed agent trips.
    fn write_trips(&mut self, rows: &[AgentTripRow]) -> OutputResult<()>;

    /// Write a batch of road occupancy changes.
    fn write_occupancy(&mut self, rows: &[RoadOccupancyRow]) -> OutputResult<()>;

    /// Flush and close all underlying file handles.
    ///
    /// Idempotent — safe to call more than once.
    fn finish(&mut self) -> OutputResult<()>;
}
