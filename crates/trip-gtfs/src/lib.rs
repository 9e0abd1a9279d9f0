//! `trip-gtfs` — GTFS feed ingestion for the tripsim simulator.
//!
//! Reads the CSV tables of a GTFS directory into typed records, validating
//! required columns and clock-time formats up front: any violation is a
//! [`GtfsError`] and aborts the load before a simulation can start.
//!
//! | Module       | Contents                                             |
//! |--------------|------------------------------------------------------|
//! | [`feed`]     | `GtfsFeed` and its per-table record types            |
//! | [`calendar`] | `ServiceCalendar` — which trips run on a given date  |
//!
//! Zip extraction, geocoding, and projection are external collaborators; this
//! crate starts from an unpacked feed directory.

pub mod calendar;
pub mod error;
pub mod feed;


pub use calendar::ServiceCalendar;
pub use error::{GtfsError, GtfsResult};
pub use feed::{
    CalendarDateRecord, CalendarRecord, FrequencyRecord, GtfsFeed, RouteRecord, StopRecord,
    StopTimeRecord, TripRecord,
};
