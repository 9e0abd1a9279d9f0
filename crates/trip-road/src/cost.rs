//! Congestion-aware edge travel time and capacity estimation.

use crate::graph::RoadEdge;

/// Travel time in seconds for a vehicle *entering* `edge` now.
///
/// The entering vehicle counts itself: with the edge otherwise empty the
/// per-lane occupancy is 1 and the multiplier is `1 + sqrt(1/capacity)`.
/// Occupants share lanes — integer division, so 3 vehicles on 2 lanes load
/// each lane as 2.
pub fn edge_entry_cost_secs(edge: &RoadEdge, speed_factor: f64) -> f64 {
    let base = edge.length_m / edge.maxspeed_mps;

    let occupancy_incl = edge.occupancy as u64 + 1;
    let per_lane = 1 + (occupancy_incl - 1) / edge.lanes as u64;

    let multiplier = 1.0 + ((per_lane * per_lane) as f64 / edge.capacity).sqrt();
    base * multiplier / speed_factor
}

/// Webster saturation-flow knots: (lane width m, vehicles/hour).
const SATURATION_FLOW: [(f64, f64); 8] = [
    (3.0, 1_850.0),
    (3.3, 1_875.0),
    (3.6, 1_900.0),
    (3.9, 1_950.0),
    (4.2, 2_075.0),
    (4.5, 2_250.0),
    (4.8, 2_475.0),
    (5.2, 2_700.0),
];

/// Per-lane capacity (vehicles/hour) for a lane of the given width.
///
/// Linear interpolation between the Webster knots; beyond the table the
/// plain `525 × width` approximation (unit factors = 1) takes over, and
/// widths below the first knot clamp to it.
pub fn capacity_for_lane_width(width_m: f64) -> f64 {
    let (first_w, first_cap) = SATURATION_FLOW[0];
    if width_m <= first_w {
        return first_cap;
    }
    let (last_w, _) = SATURATION_FLOW[SATURATION_FLOW.len() - 1];
    if width_m > last_w {
        return 525.0 * width_m;
    }
    for pair in SATURATION_FLOW.windows(2) {
        let ((w0, c0), (w1, c1)) = (pair[0], pair[1]);
        if width_m <= w1 {
            let t = (width_m - w0) / (w1 - w0);
            return c0 + t * (c1 - c0);
        }
    }
    525.0 * width_m
}
