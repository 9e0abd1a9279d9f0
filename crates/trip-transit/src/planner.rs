//! Day-scoped transit router and coordinate-to-coordinate planner.
//!
//! `TransitRouter` owns the connection list for one operating day.  Its
//! `plan` method turns an `(origin, destination, departure)` request into a
//! passenger-executable plan:
//!
//! 1. take the k closest stops to each endpoint as board/alight candidates;
//! 2. if the candidate sets share a stop, the endpoints are close enough that
//!    walking straight there is worth considering — keep it as a candidate;
//! 3. scan every (board, alight) pair and score it by
//!    `walk-to-board + (arrival − departure) + walk-from-alight`;
//! 4. return the cheapest candidate, folding the journey's connections into
//!    `Walk` / `Transfer` / `Ride` legs (consecutive connections on one trip
//!    collapse into a single ride).
//!
//! The pair scans share only immutable data and run in parallel.

use chrono::NaiveDate;
use rayon::prelude::*;
use rustc_hash::FxHashSet;

use trip_core::{GeoPoint, SimConfig, StopId, TripId, walking_time};
use trip_gtfs::ServiceCalendar;

use crate::csa::{Journey, JourneyLeg, earliest_arrival};
use crate::error::{TransitError, TransitResult};
use crate::store::Connection;
use crate::timetable::Timetable;

// ── Plan legs ─────────────────────────────────────────────────────────────────

/// One leg of a passenger's plan, in execution order.
#[derive(Clone, Debug, PartialEq)]
pub enum PlanLeg {
    /// Walk for a fixed duration (station access/egress or a direct walk).
    Walk { secs: f64 },
    /// Walk between two nearby stops mid-journey.
    Transfer { from: StopId, to: StopId, secs: u32 },
    /// Wait at `board` for a vehicle of `trip`, ride it, and alight at
    /// `alight`.  Scheduled times are kept for delay accounting.
    Ride {
        trip:         TripId,
        board:        StopId,
        alight:       StopId,
        sched_board:  u32,
        sched_alight: u32,
    },
}

/// A scored passenger plan.
#[derive(Clone, Debug, PartialEq)]
pub struct TripPlan {
    pub legs:       Vec<PlanLeg>,
    /// Estimated door-to-door duration in seconds.
    pub total_secs: f64,
}

// ── TransitRouter ─────────────────────────────────────────────────────────────

/// Earliest-arrival routing over the trips operating on one calendar date.
pub struct TransitRouter<'a> {
    timetable:     &'a Timetable,
    connections:   Vec<Connection>,
    valid_trips:   FxHashSet<TripId>,
    transfer_secs: u32,
}

impl<'a> TransitRouter<'a> {
    /// Filter `timetable` down to the trips `calendar` says operate on `date`.
    pub fn for_date(
        timetable: &'a Timetable,
        calendar:  &ServiceCalendar,
        date:      NaiveDate,
        config:    &SimConfig,
    ) -> Self {
        let valid_trips: FxHashSet<TripId> = calendar
            .trips_for_date(date)
            .into_iter()
            .filter_map(|external| timetable.trip_id(external).ok())
            .collect();
        let connections = timetable.connections_for_trips(&valid_trips);
        log::info!(
            "router for {date}: {} trips, {} connections",
            valid_trips.len(),
            connections.len()
        );
        Self {
            timetable,
            connections,
            valid_trips,
            transfer_secs: config.base_transfer_time,
        }
    }

    /// Build a router over every trip in the timetable, ignoring the calendar.
    pub fn all_days(timetable: &'a Timetable, config: &SimConfig) -> Self {
        let valid_trips: FxHashSet<TripId> = timetable
            .templates()
            .iter()
            .map(|t| t.trip)
            .collect();
        let connections = timetable.connections_for_trips(&valid_trips);
        Self {
            timetable,
            connections,
            valid_trips,
            transfer_secs: config.base_transfer_time,
        }
    }

    /// Trips this router will put vehicles on the street for.
    #[inline]
    pub fn valid_trips(&self) -> &FxHashSet<TripId> {
        &self.valid_trips
    }

    /// The timetable this router was built over.  Returned at the
    /// timetable's own lifetime so callers holding the router by reference
    /// can keep the timetable across their own mutations.
    #[inline]
    pub fn timetable(&self) -> &'a Timetable {
        self.timetable
    }

    /// Stop-to-stop earliest arrival; `None` when no journey exists.
    pub fn route_stops(&self, start: StopId, end: StopId, dep_secs: u32) -> Option<Journey> {
        earliest_arrival(
            &self.connections,
            self.timetable.footpaths(),
            start,
            end,
            dep_secs,
            self.transfer_secs,
        )
    }

    /// Coordinate-to-coordinate plan for a departure at `dep_secs`.
    pub fn plan(
        &self,
        origin:      GeoPoint,
        destination: GeoPoint,
        dep_secs:    u32,
        config:      &SimConfig,
    ) -> TransitResult<TripPlan> {
        let start_stops = self.timetable.closest_stops(origin, config.closest_stops);
        let end_stops = self.timetable.closest_stops(destination, config.closest_stops);

        // A shared candidate means origin and destination sit by the same
        // stop; a direct walk competes with any transit option.
        let overlaps = start_stops
            .iter()
            .any(|(s, _)| end_stops.iter().any(|(e, _)| e == s));
        let walk_candidate = overlaps.then(|| {
            let secs = walking_time(
                origin,
                destination,
                config.footpath_delta_base as f64,
                config.footpath_speed_kmh,
            );
            TripPlan { legs: vec![PlanLeg::Walk { secs }], total_secs: secs }
        });

        let pairs: Vec<((StopId, f64), (StopId, f64))> = start_stops
            .iter()
            .flat_map(|s| end_stops.iter().map(move |e| (*s, *e)))
            .collect();

        // Tie-break equal totals by pair index so the parallel reduction is
        // deterministic regardless of work-stealing order.
        let best_transit = pairs
            .par_iter()
            .enumerate()
            .filter_map(|(idx, &((s_stop, s_walk), (e_stop, e_walk)))| {
                let journey = self.route_stops(s_stop, e_stop, dep_secs)?;
                let total = s_walk + (journey.arrival - dep_secs) as f64 + e_walk;
                Some((total, idx, journey, s_walk, e_walk))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let transit_plan = best_transit.map(|(total, _, journey, s_walk, e_walk)| TripPlan {
            legs:       fold_journey(&journey, s_walk, e_walk),
            total_secs: total,
        });

        match (transit_plan, walk_candidate) {
            (Some(t), Some(w)) => Ok(if w.total_secs < t.total_secs { w } else { t }),
            (Some(t), None) => Ok(t),
            (None, Some(w)) => Ok(w),
            (None, None) => {
                // Distinguish "no service left today" from a plain dead end.
                match self.connections.last() {
                    Some(last) if dep_secs > last.dep_time => {
                        Err(TransitError::TimeOutOfDay { dep_secs })
                    }
                    _ => Err(TransitError::NoTransitRoute),
                }
            }
        }
    }
}

// ── Journey folding ───────────────────────────────────────────────────────────

/// Collapse a journey's connections into passenger plan legs, bracketed by
/// the access and egress walks.
pub(crate) fn fold_journey(journey: &Journey, s_walk: f64, e_walk: f64) -> Vec<PlanLeg> {
    let mut legs: Vec<PlanLeg> = vec![PlanLeg::Walk { secs: s_walk }];

    for leg in &journey.legs {
        match *leg {
            JourneyLeg::Ride { trip, dep_stop, arr_stop, dep_time, arr_time } => {
                // A consecutive connection of the same trip is the same
                // vehicle: extend the ride instead of alighting.
                if let Some(PlanLeg::Ride { trip: prev_trip, alight, sched_alight, .. }) =
                    legs.last_mut()
                    && *prev_trip == trip
                {
                    *alight = arr_stop;
                    *sched_alight = arr_time;
                } else {
                    legs.push(PlanLeg::Ride {
                        trip,
                        board:        dep_stop,
                        alight:       arr_stop,
                        sched_board:  dep_time,
                        sched_alight: arr_time,
                    });
                }
            }
            JourneyLeg::Foot { dep_stop, arr_stop, dep_time, arr_time } => {
                legs.push(PlanLeg::Transfer {
                    from: dep_stop,
                    to:   arr_stop,
                    secs: arr_time - dep_time,
                });
            }
        }
    }

    legs.push(PlanLeg::Walk { secs: e_walk });
    legs
}
