//! `trip-road` — the road side of the simulator.
//!
//! A directed multigraph of road segments whose edge weights respond to
//! occupancy: every vehicle on an edge slows the next one down.  The crate
//! splits into:
//!
//! | Module      | Contents                                                  |
//! |-------------|-----------------------------------------------------------|
//! | [`graph`]   | CSR multigraph, mutable occupancy, occupancy log          |
//! | [`builder`] | Raw-segment normalization and attribute imputation        |
//! | [`spatial`] | R-tree edge index: coordinate → (edge, fraction along it) |
//! | [`cost`]    | Congestion travel-time function and capacity estimation   |
//! | [`router`]  | Dijkstra over current costs, fractional start/end legs    |
//!
//! Edge *attributes* are immutable after `build()`; only `occupancy` changes,
//! and only through [`graph::RoadNetwork::enter`]/[`graph::RoadNetwork::leave`],
//! which also feed the occupancy log consumed by post-run capacity analysis.

pub mod builder;
pub mod cost;
pub mod error;
pub mod graph;
pub mod router;
pub mod spatial;


pub use builder::{RawSegment, RoadNetworkBuilder};
pub use cost::{capacity_for_lane_width, edge_entry_cost_secs};
pub use error::{RoadError, RoadResult};
pub use graph::{OccupancyRecord, RoadEdge, RoadNetwork};
pub use router::{Leg, route, route_between_edges};
pub use spatial::{EdgeLocator, EdgePoint};
