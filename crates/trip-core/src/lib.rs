//! `trip-core` — foundational types for the `tripsim` urban trip simulator.
//!
//! This crate is a dependency of every other `trip-*` crate.  It intentionally
//! has no `trip-*` dependencies and minimal external ones (only `rand`,
//! `serde`, and `thiserror`).
//!
//! # What lives here
//!
//! | Module          | Contents                                              |
//! |-----------------|-------------------------------------------------------|
//! | [`ids`]         | `StopId`, `TripId`, `AgentId`, `NodeId`, `EdgeId`, `VehicleId` |
//! | [`geo`]         | `GeoPoint`, haversine distance, walking time          |
//! | [`time`]        | `SimTime`, GTFS clock-time parsing                    |
//! | [`config`]      | `SimConfig` — every tunable the simulator recognizes  |
//! | [`rng`]         | `SimRng` (deterministic, seeded)                      |
//! | [`route_type`]  | GTFS `RouteType` enum                                 |
//! | [`error`]       | `CoreError`, `CoreResult`                             |

pub mod config;
pub mod error;
pub mod geo;
pub mod ids;
pub mod rng;
pub mod route_type;
pub mod time;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use config::SimConfig;
pub use error::{CoreError, CoreResult};
pub use geo::{GeoPoint, walking_time};
pub use ids::{AgentId, EdgeId, NodeId, StopId, TripId, VehicleId};
pub use rng::SimRng;
pub use route_type::RouteType;
pub use time::{SimTime, format_gtfs_time, parse_gtfs_time};
