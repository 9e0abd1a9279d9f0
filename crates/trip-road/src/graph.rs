//! Road network representation.
//!
//! # Data layout
//!
//! The graph uses **Compressed Sparse Row (CSR)** format for outgoing edges.
//! Given a `NodeId n`, its outgoing edges occupy the `EdgeId` range:
//!
//! ```text
//! node_out_start[n] .. node_out_start[n+1]
//! ```
//!
//! Edges are stored in one contiguous array sorted by source node, so
//! Dijkstra's inner loop is a linear scan.  Parallel edges between the same
//! endpoints are ordinary entries distinguished by `key`.
//!
//! # Occupancy
//!
//! `occupancy` is the only mutable edge field.  It changes exclusively
//! through [`RoadNetwork::enter`] and [`RoadNetwork::leave`]; both append to
//! the occupancy log, and `leave` enforces the `occupancy ≥ 0` invariant —
//! an unmatched leave is a driver-logic bug, not a recoverable condition.

use trip_core::{EdgeId, GeoPoint, NodeId, SimTime};

// ── Edges ─────────────────────────────────────────────────────────────────────

/// One directed road segment.
#[derive(Clone, Debug)]
pub struct RoadEdge {
    pub from: NodeId,
    pub to:   NodeId,
    /// Disambiguates parallel edges between the same endpoints.
    pub key:  u32,

    pub length_m:     f64,
    /// Free-flow speed in m/s (normalized from km/h at build time).
    pub maxspeed_mps: f64,
    pub lanes:        u32,
    /// Saturation flow per lane, vehicles/hour.
    pub capacity:     f64,

    /// Vehicles currently on the edge.
    pub occupancy: u32,

    /// Polyline from `from` to `to`; always at least the two endpoints.
    pub geometry: Vec<GeoPoint>,
}

/// One occupancy change, appended on every enter/leave.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct OccupancyRecord {
    pub edge:      EdgeId,
    /// Occupancy *after* the change.
    pub occupancy: u32,
    pub time:      SimTime,
}

// ── RoadNetwork ───────────────────────────────────────────────────────────────

/// Directed road multigraph in CSR format plus the occupancy change log.
///
/// Construct via [`RoadNetworkBuilder`](crate::builder::RoadNetworkBuilder).
pub struct RoadNetwork {
    /// Geographic position of each node, indexed by `NodeId`.
    pub(crate) node_pos: Vec<GeoPoint>,

    /// CSR row pointer; length `node_count + 1`.
    pub(crate) node_out_start: Vec<u32>,

    /// Edge records sorted by source node, indexed by `EdgeId`.
    pub(crate) edges: Vec<RoadEdge>,

    /// Append-only occupancy history.
    log: Vec<OccupancyRecord>,
    /// Record only changes inside this window when set.
    log_window: Option<(SimTime, SimTime)>,
    log_enabled: bool,

    /// Running enter/leave totals, for end-of-run balance checks.
    enters: u64,
    leaves: u64,
}

impl RoadNetwork {
    pub(crate) fn from_parts(
        node_pos: Vec<GeoPoint>,
        node_out_start: Vec<u32>,
        edges: Vec<RoadEdge>,
    ) -> Self {
        Self {
            node_pos,
            node_out_start,
            edges,
            log: Vec::new(),
            log_window: None,
            log_enabled: true,
            enters: 0,
            leaves: 0,
        }
    }

    // ── Graph dimensions ──────────────────────────────────────────────────

    #[inline]
    pub fn node_count(&self) -> usize {
        self.node_pos.len()
    }

    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    #[inline]
    pub fn node_pos(&self, node: NodeId) -> GeoPoint {
        self.node_pos[node.index()]
    }

    #[inline]
    pub fn edge(&self, edge: EdgeId) -> &RoadEdge {
        &self.edges[edge.index()]
    }

    /// Iterator over the `EdgeId`s of all outgoing edges from `node`.
    ///
    /// This is a contiguous index range — no heap allocation.
    #[inline]
    pub fn out_edges(&self, node: NodeId) -> impl Iterator<Item = EdgeId> + '_ {
        let start = self.node_out_start[node.index()] as usize;
        let end = self.node_out_start[node.index() + 1] as usize;
        (start..end).map(|i| EdgeId(i as u32))
    }

    /// The edge id for an exact `(from, to, key)` triple, if present.
    pub fn find_edge(&self, from: NodeId, to: NodeId, key: u32) -> Option<EdgeId> {
        self.out_edges(from).find(|&e| {
            let edge = self.edge(e);
            edge.to == to && edge.key == key
        })
    }

    /// Smallest axis-aligned box containing every node: `(min, max)` corner
    /// points.  Used for cheap out-of-bounds checks on agent coordinates.
    pub fn bbox(&self) -> Option<(GeoPoint, GeoPoint)> {
        let first = *self.node_pos.first()?;
        let mut min = first;
        let mut max = first;
        for p in &self.node_pos {
            min.lat = min.lat.min(p.lat);
            min.lon = min.lon.min(p.lon);
            max.lat = max.lat.max(p.lat);
            max.lon = max.lon.max(p.lon);
        }
        Some((min, max))
    }

    // ── Occupancy ─────────────────────────────────────────────────────────

    /// A vehicle enters `edge` at `time`.
    pub fn enter(&mut self, edge: EdgeId, time: SimTime) {
        let occ = {
            let e = &mut self.edges[edge.index()];
            e.occupancy += 1;
            e.occupancy
        };
        self.enters += 1;
        self.record(edge, occ, time);
    }

    /// A vehicle leaves `edge` at `time`.
    ///
    /// # Panics
    ///
    /// Panics if the edge's occupancy is already zero — a leave without a
    /// matching enter.
    pub fn leave(&mut self, edge: EdgeId, time: SimTime) {
        let occ = {
            let e = &mut self.edges[edge.index()];
            assert!(e.occupancy > 0, "leave on empty edge {edge}");
            e.occupancy -= 1;
            e.occupancy
        };
        self.leaves += 1;
        self.record(edge, occ, time);
    }

    fn record(&mut self, edge: EdgeId, occupancy: u32, time: SimTime) {
        if !self.log_enabled {
            return;
        }
        if let Some((from, to)) = self.log_window
            && (time < from || time > to)
        {
            return;
        }
        self.log.push(OccupancyRecord { edge, occupancy, time });
    }

    /// Restrict the occupancy log to `[from, to]`, or disable it entirely.
    pub fn configure_log(&mut self, enabled: bool, window: Option<(SimTime, SimTime)>) {
        self.log_enabled = enabled;
        self.log_window = window;
    }

    #[inline]
    pub fn occupancy_log(&self) -> &[OccupancyRecord] {
        &self.log
    }

    /// `(total enters, total leaves)` since construction.  Equal at the end
    /// of a drained simulation.
    #[inline]
    pub fn flow_totals(&self) -> (u64, u64) {
        (self.enters, self.leaves)
    }
}
