//! Spatial edge index: from a coordinate to the nearest road edge and the
//! fraction along it.
//!
//! Endpoint resolution maps a query point to an *edge*, not a node — trips
//! begin and end mid-block.  The search seeds a small bounding box around the
//! point and doubles its half-width until at least one edge envelope
//! intersects, then picks the candidate whose geometry passes closest and
//! projects the point onto its polyline.

use rstar::{RTree, RTreeObject, AABB};

use trip_core::{EdgeId, GeoPoint};

use crate::error::{RoadError, RoadResult};
use crate::graph::RoadNetwork;

/// A point resolved onto the road network.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct EdgePoint {
    pub edge: EdgeId,
    /// Fraction along the edge geometry, `0.0` at `from`, `1.0` at `to`.
    pub p: f64,
    /// The snapped position on the edge.
    pub point: GeoPoint,
}

struct EdgeEntry {
    aabb: AABB<[f64; 2]>,
    edge: EdgeId,
}

impl RTreeObject for EdgeEntry {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

/// R-tree over edge geometry bounding boxes.
pub struct EdgeLocator {
    tree: RTree<EdgeEntry>,
}

impl EdgeLocator {
    /// Index every edge of `net`.
    pub fn build(net: &RoadNetwork) -> Self {
        let entries = (0..net.edge_count())
            .map(|i| {
                let edge = EdgeId(i as u32);
                let geometry = &net.edge(edge).geometry;
                let mut min = [f64::INFINITY; 2];
                let mut max = [f64::NEG_INFINITY; 2];
                for p in geometry {
                    min[0] = min[0].min(p.lat);
                    min[1] = min[1].min(p.lon);
                    max[0] = max[0].max(p.lat);
                    max[1] = max[1].max(p.lon);
                }
                EdgeEntry { aabb: AABB::from_corners(min, max), edge }
            })
            .collect();
        Self { tree: RTree::bulk_load(entries) }
    }

    /// Resolve `point` to its closest edge, starting the candidate search at
    /// a half-width of `base_radius` degrees.
    ///
    /// # Errors
    ///
    /// [`RoadError::EmptyNetwork`] with no edges at all;
    /// [`RoadError::OutOfBounds`] if doubling the search box past a whole
    /// hemisphere still finds nothing (the point is nowhere near the map).
    pub fn nearest_edge(
        &self,
        net: &RoadNetwork,
        point: GeoPoint,
        base_radius: f64,
    ) -> RoadResult<EdgePoint> {
        if net.is_empty() {
            return Err(RoadError::EmptyNetwork);
        }

        let mut radius = base_radius;
        loop {
            if radius > 180.0 {
                return Err(RoadError::OutOfBounds { lat: point.lat, lon: point.lon });
            }
            let envelope = AABB::from_corners(
                [point.lat - radius, point.lon - radius],
                [point.lat + radius, point.lon + radius],
            );
            let best = self
                .tree
                .locate_in_envelope_intersecting(&envelope)
                .map(|entry| {
                    let (p, dist2, snapped) =
                        project_onto_polyline(&net.edge(entry.edge).geometry, point);
                    (entry.edge, p, dist2, snapped)
                })
                .min_by(|a, b| a.2.total_cmp(&b.2));

            match best {
                Some((edge, p, _, snapped)) => {
                    return Ok(EdgePoint { edge, p, point: snapped });
                }
                None => radius *= 2.0, // expand the search area
            }
        }
    }
}

// ── Polyline projection ───────────────────────────────────────────────────────

/// Project `point` onto `polyline`, returning the global length fraction in
/// `[0, 1]`, the squared planar distance (scaled degrees), and the snapped
/// point.
///
/// Works in a local equirectangular frame (longitude scaled by cos of the
/// point's latitude), accurate to well under a metre at city scale.
fn project_onto_polyline(polyline: &[GeoPoint], point: GeoPoint) -> (f64, f64, GeoPoint) {
    let lon_scale = point.lat.to_radians().cos();
    let to_xy = |g: GeoPoint| [g.lat, g.lon * lon_scale];
    let q = to_xy(point);

    // Segment lengths in metres to turn a segment-local parameter into a
    // fraction of the whole polyline.
    let seg_lengths: Vec<f64> = polyline
        .windows(2)
        .map(|w| w[0].distance_m(w[1]))
        .collect();
    let total: f64 = seg_lengths.iter().sum();

    let mut best = (0.0, f64::INFINITY, polyline[0]);
    let mut length_before = 0.0;

    for (i, w) in polyline.windows(2).enumerate() {
        let (a, b) = (to_xy(w[0]), to_xy(w[1]));
        let ab = [b[0] - a[0], b[1] - a[1]];
        let aq = [q[0] - a[0], q[1] - a[1]];
        let ab_len2 = ab[0] * ab[0] + ab[1] * ab[1];

        let t = if ab_len2 > 0.0 {
            ((aq[0] * ab[0] + aq[1] * ab[1]) / ab_len2).clamp(0.0, 1.0)
        } else {
            0.0
        };

        let closest = [a[0] + t * ab[0], a[1] + t * ab[1]];
        let d2 = (q[0] - closest[0]).powi(2) + (q[1] - closest[1]).powi(2);

        if d2 < best.1 {
            let p = if total > 0.0 {
                (length_before + t * seg_lengths[i]) / total
            } else {
                0.0
            };
            let snapped = GeoPoint::new(
                w[0].lat + t * (w[1].lat - w[0].lat),
                w[0].lon + t * (w[1].lon - w[0].lon),
            );
            best = (p, d2, snapped);
        }
        length_before += seg_lengths[i];
    }
    best
}
