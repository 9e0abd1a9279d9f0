//! GTFS feed tables as typed records.
//!
//! Each table is deserialized by header name, so column order is free and
//! extra columns are ignored.  Clock times (`arrival_time`, `departure_time`,
//! frequency spans) are parsed to seconds-since-midnight during the load so
//! the rest of the workspace never sees a time string.

use std::path::Path;

use serde::Deserialize;

use trip_core::{format_gtfs_time, parse_gtfs_time};

use crate::error::{GtfsError, GtfsResult};

// ── Table records ─────────────────────────────────────────────────────────────

/// One row of `stops.txt`.
#[derive(Debug, Clone, Deserialize)]
pub struct StopRecord {
    pub stop_id:  String,
    pub stop_lat: f64,
    pub stop_lon: f64,
}

/// One row of `stop_times.txt` with its times already in seconds.
#[derive(Debug, Clone)]
pub struct StopTimeRecord {
    pub trip_id:        String,
    pub stop_id:        String,
    pub stop_sequence:  u32,
    pub arrival_secs:   u32,
    pub departure_secs: u32,
}

#[derive(Deserialize)]
struct RawStopTime {
    trip_id:        String,
    stop_id:        String,
    stop_sequence:  u32,
    arrival_time:   String,
    departure_time: String,
}

/// One row of `trips.txt`.
#[derive(Debug, Clone, Deserialize)]
pub struct TripRecord {
    pub trip_id:    String,
    pub route_id:   String,
    pub service_id: String,
}

/// One row of `routes.txt`.
#[derive(Debug, Clone, Deserialize)]
pub struct RouteRecord {
    pub route_id:   String,
    pub route_type: u8,
}

/// One row of `frequencies.txt` with its span in seconds.
#[derive(Debug, Clone)]
pub struct FrequencyRecord {
    pub trip_id:      String,
    pub start_secs:   u32,
    pub end_secs:     u32,
    pub headway_secs: u32,
}

#[derive(Deserialize)]
struct RawFrequency {
    trip_id:      String,
    start_time:   String,
    end_time:     String,
    headway_secs: u32,
}

/// One row of `calendar.txt`.  Weekday flags are 0/1.
#[derive(Debug, Clone, Deserialize)]
pub struct CalendarRecord {
    pub service_id: String,
    pub monday:     u8,
    pub tuesday:    u8,
    pub wednesday:  u8,
    pub thursday:   u8,
    pub friday:     u8,
    pub saturday:   u8,
    pub sunday:     u8,
    /// `YYYYMMDD`.
    pub start_date: String,
    pub end_date:   String,
}

/// One row of `calendar_dates.txt`.
#[derive(Debug, Clone, Deserialize)]
pub struct CalendarDateRecord {
    pub service_id:     String,
    /// `YYYYMMDD`.
    pub date:           String,
    /// 1 = service added on `date`, 2 = service removed.
    pub exception_type: u8,
}

// ── GtfsFeed ──────────────────────────────────────────────────────────────────

/// A fully loaded GTFS feed.
///
/// `frequencies` and `calendar_dates` are optional tables; a missing file
/// simply yields an empty vector.
#[derive(Debug, Clone, Default)]
pub struct GtfsFeed {
    pub stops:          Vec<StopRecord>,
    pub stop_times:     Vec<StopTimeRecord>,
    pub trips:          Vec<TripRecord>,
    pub routes:         Vec<RouteRecord>,
    pub frequencies:    Vec<FrequencyRecord>,
    pub calendar:       Vec<CalendarRecord>,
    pub calendar_dates: Vec<CalendarDateRecord>,
}

impl GtfsFeed {
    /// Load a feed from an unpacked GTFS directory.
    ///
    /// # Errors
    ///
    /// Any missing required table, missing column, or malformed value aborts
    /// the load with a [`GtfsError`].
    pub fn from_dir(dir: &Path) -> GtfsResult<Self> {
        log::info!("loading GTFS feed from {}", dir.display());

        let stops = read_table::<StopRecord>(dir, "stops")?;
        let raw_stop_times = read_table::<RawStopTime>(dir, "stop_times")?;
        let trips = read_table::<TripRecord>(dir, "trips")?;
        let routes = read_table::<RouteRecord>(dir, "routes")?;
        let raw_frequencies = read_optional_table::<RawFrequency>(dir, "frequencies")?;
        let calendar = read_table::<CalendarRecord>(dir, "calendar")?;
        let calendar_dates = read_optional_table::<CalendarDateRecord>(dir, "calendar_dates")?;

        let stop_times = raw_stop_times
            .into_iter()
            .enumerate()
            .map(|(row, r)| {
                Ok(StopTimeRecord {
                    arrival_secs: parse_gtfs_time(&r.arrival_time)
                        .map_err(|source| GtfsError::BadTime { table: "stop_times", row, source })?,
                    departure_secs: parse_gtfs_time(&r.departure_time)
                        .map_err(|source| GtfsError::BadTime { table: "stop_times", row, source })?,
                    trip_id:       r.trip_id,
                    stop_id:       r.stop_id,
                    stop_sequence: r.stop_sequence,
                })
            })
            .collect::<GtfsResult<Vec<_>>>()?;

        let frequencies = raw_frequencies
            .into_iter()
            .enumerate()
            .map(|(row, r)| {
                let record = FrequencyRecord {
                    start_secs: parse_gtfs_time(&r.start_time)
                        .map_err(|source| GtfsError::BadTime { table: "frequencies", row, source })?,
                    end_secs: parse_gtfs_time(&r.end_time)
                        .map_err(|source| GtfsError::BadTime { table: "frequencies", row, source })?,
                    trip_id:      r.trip_id,
                    headway_secs: r.headway_secs,
                };
                if record.headway_secs == 0 {
                    return Err(GtfsError::Invalid {
                        table:   "frequencies",
                        message: format!("row {row}: headway_secs must be positive"),
                    });
                }
                Ok(record)
            })
            .collect::<GtfsResult<Vec<_>>>()?;

        let feed = GtfsFeed {
            stops,
            stop_times,
            trips,
            routes,
            frequencies,
            calendar,
            calendar_dates,
        };
        feed.validate()?;

        log::info!(
            "loaded {} stops, {} stop_times, {} trips, {} frequency spans",
            feed.stops.len(),
            feed.stop_times.len(),
            feed.trips.len(),
            feed.frequencies.len(),
        );
        Ok(feed)
    }

    /// Cross-table consistency checks that serde cannot express.
    fn validate(&self) -> GtfsResult<()> {
        for r in &self.routes {
            if r.route_type > 7 {
                return Err(GtfsError::Invalid {
                    table:   "routes",
                    message: format!("route {:?}: route_type {} outside 0..=7", r.route_id, r.route_type),
                });
            }
        }
        for (row, st) in self.stop_times.iter().enumerate() {
            if st.departure_secs < st.arrival_secs {
                return Err(GtfsError::Invalid {
                    table:   "stop_times",
                    message: format!(
                        "row {row}: departure {} precedes arrival {}",
                        format_gtfs_time(st.departure_secs),
                        format_gtfs_time(st.arrival_secs),
                    ),
                });
            }
        }
        for c in &self.calendar {
            for (day, flag) in [
                ("monday", c.monday),
                ("tuesday", c.tuesday),
                ("wednesday", c.wednesday),
                ("thursday", c.thursday),
                ("friday", c.friday),
                ("saturday", c.saturday),
                ("sunday", c.sunday),
            ] {
                if flag > 1 {
                    return Err(GtfsError::Invalid {
                        table:   "calendar",
                        message: format!("service {:?}: {day} flag must be 0 or 1", c.service_id),
                    });
                }
            }
        }
        Ok(())
    }
}

// ── CSV plumbing ──────────────────────────────────────────────────────────────

/// Read `<dir>/<table>.txt`, mapping deserialization failures (including
/// missing columns) to [`GtfsError::Invalid`].
fn read_table<T: for<'de> Deserialize<'de>>(dir: &Path, table: &'static str) -> GtfsResult<Vec<T>> {
    let path = dir.join(format!("{table}.txt"));
    if !path.exists() {
        return Err(GtfsError::MissingTable(table));
    }
    read_records(csv::Reader::from_path(&path).map_err(|e| csv_error(table, e))?, table)
}

/// Like [`read_table`] but a missing file yields an empty vector.
fn read_optional_table<T: for<'de> Deserialize<'de>>(
    dir: &Path,
    table: &'static str,
) -> GtfsResult<Vec<T>> {
    let path = dir.join(format!("{table}.txt"));
    if !path.exists() {
        return Ok(Vec::new());
    }
    read_records(csv::Reader::from_path(&path).map_err(|e| csv_error(table, e))?, table)
}

fn read_records<R: std::io::Read, T: for<'de> Deserialize<'de>>(
    mut reader: csv::Reader<R>,
    table: &'static str,
) -> GtfsResult<Vec<T>> {
    reader
        .deserialize::<T>()
        .map(|r| r.map_err(|e| csv_error(table, e)))
        .collect()
}

fn csv_error(table: &'static str, e: csv::Error) -> GtfsError {
    GtfsError::Invalid { table, message: e.to_string() }
}
