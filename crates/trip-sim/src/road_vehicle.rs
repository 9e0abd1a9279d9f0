//! Road-vehicle traversal: advancing a vehicle along its routed legs while
//! keeping edge occupancy (and the occupancy log) honest.
//!
//! Each step is one firing of the traversal protocol:
//!
//! 1. leave the current edge, if any, and discard its leg;
//! 2. with no legs left, the trip is over — the caller fires the owner's
//!    arrival;
//! 3. otherwise price the next leg at the edge's *current* congestion,
//!    scaled by the fraction of the edge the leg covers, enter it, and
//!    reschedule after that travel time.

use std::collections::VecDeque;
use std::fmt;

use trip_core::{AgentId, EdgeId, SimTime, VehicleId};
use trip_road::{Leg, RoadNetwork, edge_entry_cost_secs};

/// Index of a road vehicle in the simulation's dense vehicle table.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct RoadVehicleId(pub u32);

impl RoadVehicleId {
    #[inline(always)]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for RoadVehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RoadVehicleId({})", self.0)
    }
}

/// Who to notify when the vehicle finishes its route.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RoadArrival {
    /// A private car: its agent has arrived.
    Agent(AgentId),
    /// A bus pulling in at its next scheduled stop.
    Bus(VehicleId),
}

/// Which road network the vehicle runs on.  Private traffic and transit
/// services use separately loaded networks.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RoadKind {
    Private,
    Transit,
}

/// A vehicle advancing along a routed sequence of legs.
#[derive(Debug)]
pub struct RoadVehicle {
    pub id:           RoadVehicleId,
    pub route:        VecDeque<Leg>,
    pub current_edge: Option<EdgeId>,
    pub on_arrive:    RoadArrival,
    pub kind:         RoadKind,
}

impl RoadVehicle {
    pub fn new(id: RoadVehicleId, on_arrive: RoadArrival, kind: RoadKind) -> Self {
        Self {
            id,
            route: VecDeque::new(),
            current_edge: None,
            on_arrive,
            kind,
        }
    }

    /// Point the vehicle at a fresh route.  Must only be called while parked
    /// (a bus at a stop, or before the first step).
    pub fn reset_route(&mut self, legs: impl IntoIterator<Item = Leg>) {
        debug_assert!(self.current_edge.is_none(), "resetting route mid-edge");
        self.route = legs.into_iter().collect();
        self.current_edge = None;
    }
}

/// Outcome of one traversal step.
#[derive(Debug, PartialEq)]
pub enum StepOutcome {
    /// The vehicle entered the next leg; step again after this many ms.
    Continue { delay_ms: u64 },
    /// The route is exhausted; fire the vehicle's arrival.
    Arrived,
}

/// Advance `vehicle` one leg over `net` at `time`.
pub fn step(
    vehicle:      &mut RoadVehicle,
    net:          &mut RoadNetwork,
    time:         SimTime,
    speed_factor: f64,
) -> StepOutcome {
    // Leave the edge finished by the previous step.
    if let Some(edge) = vehicle.current_edge.take() {
        net.leave(edge, time);
        vehicle.route.pop_front();
    }

    let Some(leg) = vehicle.route.front().copied() else {
        return StepOutcome::Arrived;
    };

    // Price the leg before entering: the cost function already counts this
    // vehicle as the entering occupant.
    let cost_secs = edge_entry_cost_secs(net.edge(leg.edge), speed_factor) * leg.p;

    net.enter(leg.edge, time);
    vehicle.current_edge = Some(leg.edge);

    StepOutcome::Continue {
        delay_ms: ((cost_secs * 1_000.0).round() as u64).max(1),
    }
}
