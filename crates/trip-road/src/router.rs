//! Congestion-aware shortest-path routing over the road multigraph.
//!
//! Costs are the *current* entering-vehicle travel times, so a route computed
//! under load steers around congestion.  The heap works in integer
//! milliseconds with the node id as a secondary key, making the search
//! deterministic; parallel edges are relaxed individually, so the one with
//! the lowest current cost carries the path.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use trip_core::{EdgeId, GeoPoint, NodeId};

use crate::cost::edge_entry_cost_secs;
use crate::error::{RoadError, RoadResult};
use crate::graph::RoadNetwork;
use crate::spatial::{EdgeLocator, EdgePoint};

/// One edge-sized piece of a road plan.
///
/// `p` is the fraction of the edge actually traversed: interior legs cover
/// the whole edge, while the first and last legs of a trip may begin or end
/// mid-edge.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Leg {
    pub edge: EdgeId,
    pub p:    f64,
}

/// Route between two coordinates.
///
/// Each endpoint resolves to an edge (not a node); the search runs from the
/// start edge's head to the end edge's tail, and the returned plan covers
/// `1 − p_start` of the start edge, every interior edge fully, and `p_end`
/// of the end edge.
pub fn route(
    net:          &RoadNetwork,
    locator:      &EdgeLocator,
    start:        GeoPoint,
    end:          GeoPoint,
    base_radius:  f64,
    speed_factor: f64,
) -> RoadResult<Vec<Leg>> {
    let start_point = locator.nearest_edge(net, start, base_radius)?;
    let end_point = locator.nearest_edge(net, end, base_radius)?;
    route_between_edges(net, start_point, end_point, speed_factor)
}

/// Route between two pre-resolved edge positions (bus stop-to-stop routing
/// snaps each stop once and reuses the positions).
pub fn route_between_edges(
    net:          &RoadNetwork,
    start:        EdgePoint,
    end:          EdgePoint,
    speed_factor: f64,
) -> RoadResult<Vec<Leg>> {
    let search_from = net.edge(start.edge).to;
    let search_to = net.edge(end.edge).from;

    let interior = dijkstra(net, search_from, search_to, speed_factor)?;

    let mut legs = Vec::with_capacity(interior.len() + 2);
    legs.push(Leg { edge: start.edge, p: 1.0 - start.p });
    legs.extend(interior.into_iter().map(|edge| Leg { edge, p: 1.0 }));
    legs.push(Leg { edge: end.edge, p: end.p });
    Ok(legs)
}

// ── Dijkstra internals ────────────────────────────────────────────────────────

/// Current cost of `edge` in milliseconds, floored at 1 so the search cannot
/// loop on degenerate zero-length edges.
#[inline]
fn edge_cost_ms(net: &RoadNetwork, edge: EdgeId, speed_factor: f64) -> u64 {
    ((edge_entry_cost_secs(net.edge(edge), speed_factor) * 1_000.0).round() as u64).max(1)
}

fn dijkstra(
    net:          &RoadNetwork,
    from:         NodeId,
    to:           NodeId,
    speed_factor: f64,
) -> RoadResult<Vec<EdgeId>> {
    if from == to {
        return Ok(Vec::new());
    }

    let n = net.node_count();
    // dist[v] = best known cost (ms) to reach v.
    let mut dist = vec![u64::MAX; n];
    // prev_edge[v] = EdgeId that reached v; EdgeId::INVALID for unreached nodes.
    let mut prev_edge = vec![EdgeId::INVALID; n];

    dist[from.index()] = 0;

    // Min-heap: (cost, node). Reverse makes BinaryHeap (max) behave as min-heap.
    // Secondary key NodeId ensures deterministic tie-breaking.
    let mut heap: BinaryHeap<Reverse<(u64, NodeId)>> = BinaryHeap::new();
    heap.push(Reverse((0, from)));

    while let Some(Reverse((cost, node))) = heap.pop() {
        if node == to {
            return Ok(reconstruct(net, &prev_edge, to));
        }

        // Skip stale heap entries.
        if cost > dist[node.index()] {
            continue;
        }

        for edge in net.out_edges(node) {
            let neighbor = net.edge(edge).to;
            let new_cost = cost.saturating_add(edge_cost_ms(net, edge, speed_factor));

            if new_cost < dist[neighbor.index()] {
                dist[neighbor.index()] = new_cost;
                prev_edge[neighbor.index()] = edge;
                heap.push(Reverse((new_cost, neighbor)));
            }
        }
    }

    Err(RoadError::NoRoute { from, to })
}

fn reconstruct(net: &RoadNetwork, prev_edge: &[EdgeId], to: NodeId) -> Vec<EdgeId> {
    let mut edges = Vec::new();
    let mut cursor = to;
    loop {
        let e = prev_edge[cursor.index()];
        if e == EdgeId::INVALID {
            break;
        }
        edges.push(e);
        cursor = net.edge(e).from;
    }
    edges.reverse();
    edges
}
