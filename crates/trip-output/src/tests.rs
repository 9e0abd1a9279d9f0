//! Tests for row flattening and the output backends.

use std::fs;

use rustc_hash::FxHashMap;

use trip_core::{EdgeId, GeoPoint, SimTime};
use trip_sim::{AgentTrip, SimOutput, SimSummary, StopType};

use crate::row::{AgentTripRow, RoadOccupancyRow, rows_from_output};
use crate::writer::OutputWriter;
use crate::CsvWriter;

// ── Fixtures ──────────────────────────────────────────────────────────────────

fn sample_output() -> SimOutput {
    let mut road_capacities: FxHashMap<EdgeId, Vec<(u32, u64)>> = FxHashMap::default();
    road_capacities.insert(EdgeId(3), vec![(1, 100), (0, 160)]);
    road_capacities.insert(EdgeId(1), vec![(1, 90), (2, 120), (1, 150), (0, 200)]);

    SimOutput {
        agent_trips: vec![AgentTrip {
            agent:     "77".into(),
            start:     GeoPoint::new(-19.92, -43.94),
            end:       GeoPoint::new(-19.93, -43.95),
            stop_type: StopType::Commute,
            depart:    SimTime::from_secs(25_200),
            arrive:    SimTime::from_secs(25_900),
        }],
        road_capacities,
        transit_road_capacities: FxHashMap::default(),
        summary: SimSummary::default(),
        bus_deviations: vec![],
    }
}

fn trip_row() -> AgentTripRow {
    AgentTripRow {
        agent_id:   "9".into(),
        start_lat:  -19.92,
        start_lon:  -43.94,
        end_lat:    -19.93,
        end_lon:    -43.95,
        stop_type:  "commute",
        dep_time_s: 25_200,
        arr_time_s: 25_900,
    }
}

// ── Row flattening ────────────────────────────────────────────────────────────

#[cfg(test)]
mod row_tests {
    use super::*;

    #[test]
    fn trips_flatten_with_times_in_seconds() {
        let (trips, _) = rows_from_output(&sample_output());
        assert_eq!(trips.len(), 1);
        let row = &trips[0];
        assert_eq!(row.agent_id, "77");
        assert_eq!(row.stop_type, "commute");
        assert_eq!((row.dep_time_s, row.arr_time_s), (25_200, 25_900));
    }

    #[test]
    fn occupancy_rows_sorted_by_edge_then_time() {
        let (_, occupancy) = rows_from_output(&sample_output());
        assert_eq!(occupancy.len(), 6);
        assert!(occupancy.iter().all(|r| r.network == "drive"));

        let keys: Vec<(u32, u64)> = occupancy.iter().map(|r| (r.edge_id, r.time_s)).collect();
        let mut sorted = keys.clone();
        sorted.sort_unstable();
        assert_eq!(keys, sorted);
    }
}

// ── CSV backend ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod csv_tests {
    use super::*;

    #[test]
    fn writes_both_files_with_headers() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = CsvWriter::new(dir.path()).unwrap();

        writer.write_trips(&[trip_row()]).unwrap();
        writer
            .write_occupancy(&[RoadOccupancyRow {
                network:   "drive",
                edge_id:   4,
                occupancy: 2,
                time_s:    123,
            }])
            .unwrap();
        writer.finish().unwrap();

        let trips = fs::read_to_string(dir.path().join("agent_trips.csv")).unwrap();
        let mut lines = trips.lines();
        assert_eq!(
            lines.next().unwrap(),
            "agent_id,start_lat,start_lon,end_lat,end_lon,stop_type,dep_time_s,arr_time_s"
        );
        assert!(lines.next().unwrap().starts_with("9,-19.92,-43.94"));

        let occupancy = fs::read_to_string(dir.path().join("road_occupancy.csv")).unwrap();
        assert!(occupancy.contains("drive,4,2,123"));
    }

    #[test]
    fn finish_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = CsvWriter::new(dir.path()).unwrap();
        writer.finish().unwrap();
        writer.finish().unwrap();
    }
}

// ── SQLite backend ────────────────────────────────────────────────────────────

#[cfg(all(test, feature = "sqlite"))]
mod sqlite_tests {
    use super::*;
    use crate::SqliteWriter;

    #[test]
    fn rows_survive_a_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = SqliteWriter::new(dir.path()).unwrap();

        writer.write_trips(&[trip_row()]).unwrap();
        writer
            .write_occupancy(&[RoadOccupancyRow {
                network:   "transit",
                edge_id:   7,
                occupancy: 1,
                time_s:    456,
            }])
            .unwrap();
        writer.finish().unwrap();

        let conn = rusqlite::Connection::open(dir.path().join("output.db")).unwrap();
        let trip_count: i64 = conn
            .query_row("SELECT COUNT(*) FROM agent_trips", [], |r| r.get(0))
            .unwrap();
        assert_eq!(trip_count, 1);

        let (network, edge): (String, i64) = conn
            .query_row(
                "SELECT network, edge_id FROM road_occupancy",
                [],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .unwrap();
        assert_eq!(network, "transit");
        assert_eq!(edge, 7);
    }
}
