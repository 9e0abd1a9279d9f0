//! Transit vehicles: one per expanded vehicle start, visiting its trip's
//! stops in order.
//!
//! The state machine is shared between schedule-followers (rail, metro, …)
//! and buses; only the *propulsion* differs.  A schedule-follower's next
//! arrival comes straight from timetable deltas, while a bus's comes from its
//! coupled road vehicle — see the bus handling in [`crate::sim`].

use rustc_hash::FxHashMap;

use trip_core::{AgentId, SimTime, StopId, TripId, VehicleId};

use crate::road_vehicle::RoadVehicleId;

/// One scheduled stop visit with absolute times for this vehicle start.
#[derive(Copy, Clone, Debug)]
pub struct ScheduledStop {
    pub stop:      StopId,
    pub arrival:   SimTime,
    pub departure: SimTime,
}

/// How a vehicle moves between stops.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VehicleKind {
    /// Advances by timetable deltas; never touches the road network.
    Scheduled,
    /// Drives the transit road network between stops via this road vehicle.
    Bus { road_vehicle: RoadVehicleId },
}

/// Per-vehicle driver state.
pub struct TransitVehicle {
    pub id:   VehicleId,
    pub trip: TripId,
    pub kind: VehicleKind,

    /// The full stop visit schedule, absolute times.
    pub schedule: Vec<ScheduledStop>,

    /// Index of the stop most recently reached; −1 before the first arrival.
    /// Invariant: equals the index of the stop just reached whenever an
    /// arrival event for this vehicle fires.
    pub stop_idx: isize,

    /// Riders aboard, grouped by the stop where they alight.
    pub passengers: FxHashMap<StopId, Vec<AgentId>>,
}

impl TransitVehicle {
    pub fn new(id: VehicleId, trip: TripId, kind: VehicleKind, schedule: Vec<ScheduledStop>) -> Self {
        Self {
            id,
            trip,
            kind,
            schedule,
            stop_idx: -1,
            passengers: FxHashMap::default(),
        }
    }

    /// The stop visit just reached (only valid between the first arrival and
    /// termination).
    #[inline]
    pub fn current(&self) -> &ScheduledStop {
        &self.schedule[self.stop_idx as usize]
    }

    /// The upcoming stop visit, if the trip continues.
    #[inline]
    pub fn next(&self) -> Option<&ScheduledStop> {
        self.schedule.get((self.stop_idx + 1) as usize)
    }

    /// Total riders currently aboard.
    pub fn rider_count(&self) -> usize {
        self.passengers.values().map(Vec::len).sum()
    }
}
