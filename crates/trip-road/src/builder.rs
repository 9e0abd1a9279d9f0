//! Road network construction from raw OSM-derived segments.
//!
//! OSM attributes arrive messy: speeds and lane counts may be absent or
//! lists, lane counts are occasionally `-1`, and `maxspeed` is missing from
//! most residential ways.  The builder normalizes per the conventions the
//! simulator expects:
//!
//! - multiple listed speeds are **averaged**; multiple lane counts **summed**;
//! - `lanes` defaults to 1 and never drops below 1;
//! - missing `maxspeed` is imputed from the mean of known speeds on the same
//!   highway class, then the configured class default, then the global
//!   default;
//! - two-way segments yield a reverse edge with reversed geometry.
//!
//! Per-lane capacity comes from the lane width via the Webster saturation
//! table (see [`crate::cost::capacity_for_lane_width`]).

use rustc_hash::FxHashMap;

use trip_core::{GeoPoint, NodeId, SimConfig};

use crate::cost::capacity_for_lane_width;
use crate::graph::{RoadEdge, RoadNetwork};

/// One road segment as delivered by the (external) OSM extraction step.
#[derive(Clone, Debug, Default)]
pub struct RawSegment {
    pub from: NodeId,
    pub to:   NodeId,

    pub length_m: f64,

    /// Known max speeds in km/h; empty means missing.
    pub maxspeed_kmh: Vec<f64>,

    /// Listed lane counts; empty means unknown.
    pub lanes: Vec<i32>,

    /// OSM highway classes (usually one).
    pub highway: Vec<String>,

    pub oneway: bool,

    /// Lane width in metres when surveyed.
    pub lane_width_m: Option<f64>,

    /// Polyline from `from` to `to`.  Empty means a straight line between
    /// the node positions.
    pub geometry: Vec<GeoPoint>,
}

/// Construct a [`RoadNetwork`] incrementally, then call [`build`](Self::build).
///
/// Nodes and segments may be added in any order; `build()` imputes missing
/// attributes, sorts edges by source node, and assembles the CSR arrays.
pub struct RoadNetworkBuilder {
    nodes:    Vec<GeoPoint>,
    segments: Vec<RawSegment>,
}

impl RoadNetworkBuilder {
    pub fn new() -> Self {
        Self { nodes: Vec::new(), segments: Vec::new() }
    }

    /// Pre-allocate for the expected number of nodes and segments to reduce
    /// reallocations when bulk-loading an extracted network.
    pub fn with_capacity(nodes: usize, segments: usize) -> Self {
        Self {
            nodes:    Vec::with_capacity(nodes),
            segments: Vec::with_capacity(segments),
        }
    }

    /// Add a road node and return its `NodeId` (sequential from 0).
    pub fn add_node(&mut self, pos: GeoPoint) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(pos);
        id
    }

    /// Look up the position of a node added earlier.
    pub fn node_pos(&self, id: NodeId) -> GeoPoint {
        self.nodes[id.index()]
    }

    pub fn add_segment(&mut self, segment: RawSegment) {
        self.segments.push(segment);
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Consume the builder and produce a [`RoadNetwork`].
    pub fn build(self, config: &SimConfig) -> RoadNetwork {
        // ── Pass 1: mean known speed per highway class ────────────────────
        let mut class_speeds: FxHashMap<&str, (f64, u32)> = FxHashMap::default();
        for seg in &self.segments {
            if let Some(speed) = average(&seg.maxspeed_kmh) {
                for class in &seg.highway {
                    let entry = class_speeds.entry(class.as_str()).or_insert((0.0, 0));
                    entry.0 += speed;
                    entry.1 += 1;
                }
            }
        }

        let impute = |classes: &[String]| -> f64 {
            let mut sum = 0.0;
            let mut n = 0u32;
            for class in classes {
                if let Some(&(total, count)) = class_speeds.get(class.as_str()) {
                    sum += total;
                    n += count;
                }
            }
            if n > 0 {
                return sum / n as f64;
            }
            classes
                .iter()
                .find_map(|c| config.default_road_speeds.get(c).copied())
                .unwrap_or(config.default_road_speed_kmh)
        };

        // ── Pass 2: normalize into directed edges ─────────────────────────
        let mut imputed = 0usize;
        let mut raw_edges: Vec<RoadEdge> = Vec::with_capacity(self.segments.len() * 2);
        for seg in &self.segments {
            let speed_kmh = match average(&seg.maxspeed_kmh) {
                Some(s) => s,
                None => {
                    imputed += 1;
                    impute(&seg.highway)
                }
            };

            let lanes = if seg.lanes.is_empty() {
                1
            } else {
                // -1 shows up in the wild (data misentry); read it as 1.
                seg.lanes.iter().map(|&l| l.max(1) as u32).sum::<u32>()
            };

            let width = seg.lane_width_m.unwrap_or(config.default_lane_width_m);

            let mut geometry = if seg.geometry.is_empty() {
                vec![self.nodes[seg.from.index()], self.nodes[seg.to.index()]]
            } else {
                seg.geometry.clone()
            };

            let forward = RoadEdge {
                from:         seg.from,
                to:           seg.to,
                key:          0, // assigned after the CSR sort
                length_m:     seg.length_m,
                maxspeed_mps: speed_kmh / 3.6,
                lanes:        lanes.max(1),
                capacity:     capacity_for_lane_width(width),
                occupancy:    0,
                geometry:     geometry.clone(),
            };
            if !seg.oneway {
                geometry.reverse();
                raw_edges.push(RoadEdge {
                    from: seg.to,
                    to: seg.from,
                    geometry,
                    ..forward.clone()
                });
            }
            raw_edges.push(forward);
        }
        if imputed > 0 {
            log::info!("imputed maxspeed for {imputed} of {} segments", self.segments.len());
        }

        // ── Pass 3: CSR assembly ──────────────────────────────────────────
        raw_edges.sort_by_key(|e| e.from.0);

        let node_count = self.nodes.len();
        let mut node_out_start = vec![0u32; node_count + 1];
        for e in &raw_edges {
            node_out_start[e.from.index() + 1] += 1;
        }
        for i in 1..=node_count {
            node_out_start[i] += node_out_start[i - 1];
        }
        debug_assert_eq!(node_out_start[node_count] as usize, raw_edges.len());

        // Parallel-edge keys: position among edges sharing (from, to).
        let mut pair_counts: FxHashMap<(NodeId, NodeId), u32> = FxHashMap::default();
        for e in raw_edges.iter_mut() {
            let counter = pair_counts.entry((e.from, e.to)).or_insert(0);
            e.key = *counter;
            *counter += 1;
        }

        RoadNetwork::from_parts(self.nodes, node_out_start, raw_edges)
    }
}

impl Default for RoadNetworkBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn average(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}
