//! SQLite output backend (feature `sqlite`).
//!
//! Creates a single `output.db` in the configured output directory with two
//! tables: `agent_trips` and `road_occupancy`.

use std::path::Path;

use rusqlite::Connection;

use crate::row::{AgentTripRow, RoadOccupancyRow};
use crate::writer::OutputWriter;
use crate::OutputResult;

/// Writes simulation output to an SQLite database.
pub struct SqliteWriter {
    conn:     Connection,
    finished: bool,
}

impl SqliteWriter {
    /// Open (or create) `output.db` in `dir` and initialise the schema.
    pub fn new(dir: &Path) -> OutputResult<Self> {
        let conn = Connection::open(dir.join("output.db"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous  = NORMAL;
             CREATE TABLE IF NOT EXISTS agent_trips (
                 agent_id   TEXT    NOT NULL,
                 start_lat  REAL    NOT NULL,
                 start_lon  REAL    NOT NULL,
                 end_lat    REAL    NOT NULL,
                 end_lon    REAL    NOT NULL,
                 stop_type  TEXT    NOT NULL,
                 dep_time_s INTEGER NOT NULL,
                 arr_time_s INTEGER NOT NULL
             );
             CREATE TABLE IF NOT EXISTS road_occupancy (
                 network   TEXT    NOT NULL,
                 edge_id   INTEGER NOT NULL,
                 occupancy INTEGER NOT NULL,
                 time_s    INTEGER NOT NULL
             );",
        )?;

        Ok(Self { conn, finished: false })
    }
}

impl OutputWriter for SqliteWriter {
    fn write_trips(&mut self, rows: &[AgentTripRow]) -> OutputResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO agent_trips \
                 (agent_id, start_lat, start_lon, end_lat, end_lon, stop_type, dep_time_s, arr_time_s) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for row in rows {
                stmt.execute(rusqlite::params![
                    row.agent_id,
                    row.start_lat,
                    row.start_lon,
                    row.end_lat,
                    row.end_lon,
                    row.stop_type,
                    row.dep_time_s,
                    row.arr_time_s,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn write_occupancy(&mut self, rows: &[RoadOccupancyRow]) -> OutputResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO road_occupancy (network, edge_id, occupancy, time_s) \
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for row in rows {
                stmt.execute(rusqlite::params![
                    row.network,
                    row.edge_id,
                    row.occupancy,
                    row.time_s,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        Ok(())
    }
}
