//! Connection Scan Algorithm: earliest-arrival queries over the day's
//! departure-sorted connection list.
//!
//! One scan keeps two dense per-stop tables: the earliest known arrival and
//! the incoming segment that produced it.  An incoming segment is either a
//! timetabled ride or a footpath; the transfer rules dispatch on that tag:
//!
//! - same trip as the candidate connection → board with zero transfer cost;
//! - a timetabled ride → must arrive `transfer_secs` before the departure;
//! - a footpath → must arrive no later than the departure.
//!
//! When a connection improves a stop, its outgoing footpaths are relaxed too,
//! with a strict `<` improvement test on both tables — a `≤` here would let
//! equal-time updates cycle.
//!
//! The scan stops early once a connection arrives after the best known
//! arrival at the target without being usable, since later connections can
//! only arrive later still.

use trip_core::StopId;

use crate::store::{Connection, Footpath};

/// One segment of a reconstructed journey.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum JourneyLeg {
    /// Aboard the vehicle of `trip` for a single connection.
    Ride {
        dep_time: u32,
        arr_time: u32,
        dep_stop: StopId,
        arr_stop: StopId,
        trip:     trip_core::TripId,
    },
    /// Walking between two nearby stops.
    Foot {
        dep_time: u32,
        arr_time: u32,
        dep_stop: StopId,
        arr_stop: StopId,
    },
}

impl JourneyLeg {
    #[inline]
    pub fn dep_stop(&self) -> StopId {
        match *self {
            JourneyLeg::Ride { dep_stop, .. } | JourneyLeg::Foot { dep_stop, .. } => dep_stop,
        }
    }

    #[inline]
    pub fn arr_stop(&self) -> StopId {
        match *self {
            JourneyLeg::Ride { arr_stop, .. } | JourneyLeg::Foot { arr_stop, .. } => arr_stop,
        }
    }

    #[inline]
    pub fn dep_time(&self) -> u32 {
        match *self {
            JourneyLeg::Ride { dep_time, .. } | JourneyLeg::Foot { dep_time, .. } => dep_time,
        }
    }

    #[inline]
    pub fn arr_time(&self) -> u32 {
        match *self {
            JourneyLeg::Ride { arr_time, .. } | JourneyLeg::Foot { arr_time, .. } => arr_time,
        }
    }
}

/// An earliest-arrival journey: chronological legs and the arrival time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Journey {
    pub legs:    Vec<JourneyLeg>,
    pub arrival: u32,
}

/// Scan `connections` (sorted ascending by departure) for the earliest
/// arrival at `end` when departing `start` at `dep_time`.
///
/// `footpaths` is indexed by `StopId` and supplies outgoing walks per stop.
/// Returns `None` when no journey exists.  `start == end` yields an empty
/// journey arriving at `dep_time`.
pub fn earliest_arrival(
    connections:   &[Connection],
    footpaths:     &[Vec<Footpath>],
    start:         StopId,
    end:           StopId,
    dep_time:      u32,
    transfer_secs: u32,
) -> Option<Journey> {
    if start == end {
        return Some(Journey { legs: Vec::new(), arrival: dep_time });
    }

    let stop_count = footpaths.len();
    let mut earliest = vec![u32::MAX; stop_count];
    let mut incoming: Vec<Option<JourneyLeg>> = vec![None; stop_count];
    earliest[start.index()] = dep_time;

    for c in connections {
        // Departures before ours can never be boarded.
        if c.dep_time < dep_time {
            continue;
        }

        let reachable = c.dep_time >= earliest[c.dep_stop.index()]
            && (c.dep_stop == start
                || connects(incoming[c.dep_stop.index()].as_ref(), c, transfer_secs));

        if reachable && c.arr_time < earliest[c.arr_stop.index()] {
            earliest[c.arr_stop.index()] = c.arr_time;
            incoming[c.arr_stop.index()] = Some(JourneyLeg::Ride {
                dep_time: c.dep_time,
                arr_time: c.arr_time,
                dep_stop: c.dep_stop,
                arr_stop: c.arr_stop,
                trip:     c.trip,
            });
            expand_footpaths(c, &footpaths[c.arr_stop.index()], &mut earliest, &mut incoming);
        } else if c.arr_time > earliest[end.index()] {
            // Connections are departure-sorted, so nothing later can still
            // improve the target.
            break;
        }
    }

    reconstruct(&incoming, start, end, earliest[end.index()])
}

/// Can the incoming segment at a connection's departure stop hand over to it?
fn connects(incoming: Option<&JourneyLeg>, c: &Connection, transfer_secs: u32) -> bool {
    match incoming {
        None => false,
        Some(JourneyLeg::Ride { trip, arr_time, .. }) => {
            // Staying aboard the same trip is free; changing vehicles needs
            // the transfer overhead.
            *trip == c.trip || arr_time.saturating_add(transfer_secs) <= c.dep_time
        }
        Some(JourneyLeg::Foot { arr_time, .. }) => *arr_time <= c.dep_time,
    }
}

/// Relax the outgoing footpaths of a just-improved stop.
fn expand_footpaths(
    c:         &Connection,
    paths:     &[Footpath],
    earliest:  &mut [u32],
    incoming:  &mut [Option<JourneyLeg>],
) {
    for path in paths {
        let t = c.arr_time.saturating_add(path.walk_secs);
        if t < earliest[path.arr_stop.index()] {
            earliest[path.arr_stop.index()] = t;
            incoming[path.arr_stop.index()] = Some(JourneyLeg::Foot {
                dep_time: c.arr_time,
                arr_time: t,
                dep_stop: path.dep_stop,
                arr_stop: path.arr_stop,
            });
        }
    }
}

/// Walk the incoming table backward from `end` to `start`.
fn reconstruct(
    incoming: &[Option<JourneyLeg>],
    start:    StopId,
    end:      StopId,
    arrival:  u32,
) -> Option<Journey> {
    if incoming[end.index()].is_none() {
        return None;
    }

    let mut legs = Vec::new();
    let mut cursor = end;
    while cursor != start {
        let leg = incoming[cursor.index()]?;
        cursor = leg.dep_stop();
        legs.push(leg);
    }
    legs.reverse();
    Some(Journey { legs, arrival })
}
