//! Simulation configuration.
//!
//! One immutable `SimConfig` is built by the application (defaults, or
//! deserialized from JSON/TOML) and passed by reference to every constructor
//! that needs a tunable.  Nothing in the workspace reads module-level mutable
//! state.

use std::collections::HashMap;

/// Every tunable the simulator recognizes, with calibrated defaults.
#[derive(Clone, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SimConfig {
    // ── Transit routing ───────────────────────────────────────────────────
    /// Lower-bound time-delta overhead for changing trips, seconds.
    pub base_transfer_time: u32,

    /// Base walking overhead added to every footpath, seconds.
    pub footpath_delta_base: u32,

    /// Assumed walking speed, km/h.
    pub footpath_speed_kmh: f64,

    /// Footpaths longer than this are discarded as invalid, seconds.
    pub footpath_delta_max: u32,

    /// Number of closest stops for which indirect (walking) transfers are
    /// generated per stop.  Raising it links more routes at the cost of
    /// preprocessing time and memory.
    pub closest_indirect_transfers: usize,

    /// Number of candidate board/alight stops the planner considers around
    /// each of the origin and destination coordinates.
    pub closest_stops: usize,

    // ── Road network ──────────────────────────────────────────────────────
    /// Global travel-time scale.  Must be calibrated against the public
    /// transit schedule when buses run on the road network.
    pub speed_factor: f64,

    /// Max speed (km/h) used when none is specified and none can be imputed
    /// for a road segment's highway class.
    pub default_road_speed_kmh: f64,

    /// Per-highway-class default speeds (km/h), consulted before
    /// `default_road_speed_kmh` when imputing.
    pub default_road_speeds: HashMap<String, f64>,

    /// Lane width (metres) assumed when a segment does not carry one; feeds
    /// the saturation-flow capacity estimate.
    pub default_lane_width_m: f64,

    /// Initial half-width (degrees) of the bounding box used to search for
    /// the closest road edge to a point.  Doubled until candidates appear.
    pub bound_radius: f64,

    // ── Simulation ────────────────────────────────────────────────────────
    /// Warn when a bus arrives this many seconds later than its schedule
    /// (debug runs only).
    pub acceptable_delay_margin: f64,

    /// Master RNG seed.  The same seed always produces identical runs.
    pub seed: u64,

    /// Car-ownership probability per last-wage decile (decile 0 = lowest).
    /// Used with household size to decide whether an agent drives or rides
    /// transit.
    pub car_ownership_quantiles: [f64; 10],
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            base_transfer_time:         2 * 60,
            footpath_delta_base:        2 * 60,
            footpath_speed_kmh:         5.0,
            footpath_delta_max:         7 * 60,
            closest_indirect_transfers: 5,
            closest_stops:              3,
            speed_factor:               1.0,
            default_road_speed_kmh:     30.0,
            default_road_speeds:        default_road_speeds(),
            default_lane_width_m:       3.0,
            bound_radius:               0.001,
            acceptable_delay_margin:    5.0 * 60.0,
            seed:                       0,
            car_ownership_quantiles: [
                0.05, 0.11, 0.18, 0.26, 0.35, 0.45, 0.56, 0.68, 0.81, 0.93,
            ],
        }
    }
}

/// Default max speeds (km/h) by OSM highway class.
fn default_road_speeds() -> HashMap<String, f64> {
    [
        ("motorway", 100.0),
        ("motorway_link", 60.0),
        ("trunk", 80.0),
        ("trunk_link", 50.0),
        ("primary", 60.0),
        ("primary_link", 40.0),
        ("secondary", 50.0),
        ("secondary_link", 40.0),
        ("tertiary", 40.0),
        ("tertiary_link", 30.0),
        ("residential", 30.0),
        ("living_street", 10.0),
        ("unclassified", 30.0),
        ("service", 20.0),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

impl SimConfig {
    /// Walking speed in km/s, the unit the footpath formula consumes.
    #[inline]
    pub fn footpath_speed_km_s(&self) -> f64 {
        self.footpath_speed_kmh / 3_600.0
    }
}
