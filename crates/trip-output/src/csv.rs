//! CSV output backend.
//!
//! Creates two files in the configured output directory:
//! - `agent_trips.csv`
//! - `road_occupancy.csv`

use std::fs::File;
use std::path::Path;

use csv::Writer;

use crate::row::{AgentTripRow, RoadOccupancyRow};
use crate::writer::OutputWriter;
use crate::OutputResult;

/// Writes simulation output to two CSV files.
pub struct CsvWriter {
    trips:     Writer<File>,
    occupancy: Writer<File>,
    finished:  bool,
}

impl CsvWriter {
    /// Open (or create) the two CSV files in `dir` and write the header rows.
    pub fn new(dir: &Path) -> OutputResult<Self> {
        let mut trips = Writer::from_path(dir.join("agent_trips.csv"))?;
        trips.write_record([
            "agent_id", "start_lat", "start_lon", "end_lat", "end_lon", "stop_type",
            "dep_time_s", "arr_time_s",
        ])?;

        let mut occupancy = Writer::from_path(dir.join("road_occupancy.csv"))?;
        occupancy.write_record(["network", "edge_id", "occupancy", "time_s"])?;

        Ok(Self { trips, occupancy, finished: false })
    }
}

impl OutputWriter for CsvWriter {
    fn write_trips(&mut self, rows: &[AgentTripRow]) -> OutputResult<()> {
        for row in rows {
            self.trips.write_record(&[
                row.agent_id.clone(),
                row.start_lat.to_string(),
                row.start_lon.to_string(),
                row.end_lat.to_string(),
                row.end_lon.to_string(),
                row.stop_type.to_string(),
                row.dep_time_s.to_string(),
                row.arr_time_s.to_string(),
            ])?;
        }
        Ok(())
    }

    fn write_occupancy(&mut self, rows: &[RoadOccupancyRow]) -> OutputResult<()> {
        for row in rows {
            self.occupancy.write_record(&[
                row.network.to_string(),
                row.edge_id.to_string(),
                row.occupancy.to_string(),
                row.time_s.to_string(),
            ])?;
        }
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.trips.flush()?;
        self.occupancy.flush()?;
        Ok(())
    }
}
