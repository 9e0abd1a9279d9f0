//! `trip-transit` — public transit timetable and routing.
//!
//! The pipeline from a loaded GTFS feed to an answered query:
//!
//! 1. [`Timetable::build`] interns stop/trip string ids into dense indices,
//!    expands frequency spans into concrete vehicle starts, spatially indexes
//!    the stops, and precomputes walking transfers (footpaths).
//! 2. [`TransitRouter::for_date`] filters the timetable's connections down to
//!    the trips operating on one calendar date.
//! 3. [`csa::earliest_arrival`] answers a stop-to-stop earliest-arrival query
//!    by scanning the day's connections once.
//! 4. [`TransitRouter::plan`] wraps the scan into a coordinate-to-coordinate
//!    multimodal plan: candidate stops around both endpoints, a direct-walk
//!    fallback, and journey legs folded into a passenger-executable plan.
//!
//! Connections, footpaths, and the stop index are immutable after
//! construction, so any number of routing queries may run in parallel over
//! one `TransitRouter`.

pub mod csa;
pub mod error;
pub mod planner;
pub mod store;
pub mod timetable;

#[cfg(test)]
mod tests;

pub use csa::{Journey, JourneyLeg};
pub use error::{TransitError, TransitResult};
pub use planner::{PlanLeg, TransitRouter, TripPlan};
pub use store::{Connection, Footpath};
pub use timetable::{Timetable, TripStop, TripTemplate};
