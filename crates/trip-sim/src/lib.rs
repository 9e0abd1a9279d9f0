//! `trip-sim` — the discrete-event heart of the simulator.
//!
//! Everything that *happens* during a run flows through one priority queue of
//! `(time, action)` events:
//!
//! - scheduled transit vehicles advance stop to stop, picking up and dropping
//!   off passengers ([`vehicle`]);
//! - buses do the same, but physically drive the road network between stops,
//!   contributing to and suffering from congestion ([`vehicle`], [`road_vehicle`]);
//! - private cars traverse their routed legs edge by edge, mutating edge
//!   occupancy as they go ([`road_vehicle`]);
//! - passengers walk, wait at stops, and resume when their vehicle arrives
//!   ([`passenger`]).
//!
//! The kernel ([`sim`]) pops the earliest event, dispatches it, and pushes
//! whatever the handler schedules next; equal-time events fire in insertion
//! order.  There is no clock variable — the popped event's time *is* the
//! current time.
//!
//! [`Sim`] is also the orchestrator: it pre-queues every vehicle of the
//! operating day, plans all agents' first trips in parallel, runs the queue
//! dry, and collects the per-agent trip log and per-edge occupancy series.

pub mod agent;
pub mod error;
pub mod events;
pub mod passenger;
pub mod road_vehicle;
pub mod sim;
pub mod snapshot;
pub mod vehicle;

#[cfg(test)]
mod tests;

pub use agent::{Agent, AgentTrip, PlannedStop, StopType};
pub use error::{SimError, SimResult};
pub use events::{Action, EventQueue};
pub use road_vehicle::{RoadArrival, RoadVehicle, RoadVehicleId};
pub use sim::{BusDeviation, Sim, SimOutput, SimSummary};
pub use snapshot::{AgentSnapshot, build_agents};
pub use vehicle::{ScheduledStop, TransitVehicle, VehicleKind};
