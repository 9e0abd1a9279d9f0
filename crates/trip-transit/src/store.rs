//! The fundamental CSA units: timetabled connections and walking transfers.

use trip_core::{StopId, TripId};

/// A single timetabled hop of one vehicle from one stop to the next.
///
/// Times are absolute seconds from the operating day's midnight.  Invariant:
/// `arr_time > dep_time`.  Connections sharing a `trip` belong to the same
/// vehicle family — a rider already aboard continues with zero transfer cost.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Connection {
    pub dep_time: u32,
    pub arr_time: u32,
    pub dep_stop: StopId,
    pub arr_stop: StopId,
    pub trip:     TripId,
}

/// A precomputed walkable transfer between two nearby stops.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Footpath {
    pub dep_stop:  StopId,
    pub arr_stop:  StopId,
    pub walk_secs: u32,
}

/// Sort connections ascending by departure time, as the scan requires.
///
/// The sort is stable: connections of distinct trips departing at the same
/// second keep their timetable build order.
pub fn sort_for_scan(connections: &mut [Connection]) {
    connections.sort_by_key(|c| c.dep_time);
}
