//! Passenger plan execution state.
//!
//! A passenger is a plan being consumed leg by leg.  Walks and transfers
//! burn time; a ride parks the passenger in the pickup table until a vehicle
//! of the right trip reaches the board stop and wakes it.  The actual
//! bookkeeping happens in [`crate::sim`] — this module holds the state and
//! the pickup table type.

use std::collections::VecDeque;

use rustc_hash::FxHashMap;

use trip_core::{AgentId, SimTime, StopId, TripId};
use trip_transit::PlanLeg;

use crate::agent::PlannedStop;

/// `pickups[stop][trip]` — passengers waiting at `stop` for a vehicle of
/// `trip`, with the stop where each will alight.
///
/// Buckets are drained wholesale when a vehicle boards, never edited
/// per-element.
pub type PickupTable = Vec<FxHashMap<TripId, Vec<(StopId, AgentId)>>>;

/// The trip an agent is currently executing, kept for the trip log.
#[derive(Clone, Debug)]
pub struct ActiveTrip {
    pub stop:   PlannedStop,
    pub depart: SimTime,
}

/// Mutable per-agent simulation state.
pub struct PassengerState {
    pub agent:       AgentId,
    pub external_id: String,
    pub public:      bool,

    /// Trips not yet started, in day order.
    pub remaining_stops: VecDeque<PlannedStop>,

    /// Legs of the trip in progress (public agents only).
    pub plan: VecDeque<PlanLeg>,

    /// The trip in progress, if any.
    pub active: Option<ActiveTrip>,

    /// The private car this agent drives, once one exists.
    pub road_vehicle: Option<crate::road_vehicle::RoadVehicleId>,
}

impl PassengerState {
    pub fn new(agent: AgentId, external_id: String, public: bool, stops: Vec<PlannedStop>) -> Self {
        Self {
            agent,
            external_id,
            public,
            remaining_stops: stops.into(),
            plan: VecDeque::new(),
            active: None,
            road_vehicle: None,
        }
    }
}
