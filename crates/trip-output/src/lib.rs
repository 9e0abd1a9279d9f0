//! `trip-output` — simulation output writers.
//!
//! Two backends behind Cargo features:
//!
//! | Feature  | Backend | Files created                          |
//! |----------|---------|----------------------------------------|
//! | *(none)* | CSV     | `agent_trips.csv`, `road_occupancy.csv`|
//! | `sqlite` | SQLite  | `output.db`                            |
//!
//! Both implement [`OutputWriter`] over the flat row types in [`row`];
//! [`rows_from_output`] flattens a finished run into those rows.  The rows
//! feed downstream histogram/visualization tooling, which is out of scope
//! here.

pub mod csv;
pub mod error;
pub mod row;
pub mod writer;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(test)]
mod tests;

pub use csv::CsvWriter;
pub use error::{OutputError, OutputResult};
pub use row::{AgentTripRow, RoadOccupancyRow, rows_from_output};
pub use writer::OutputWriter;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteWriter;
