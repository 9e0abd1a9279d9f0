//! Geographic coordinate type and spatial utilities.
//!
//! `GeoPoint` uses `f64` latitude/longitude: edge-projection parameters and
//! walking-time estimates both feed simulation arithmetic, so the extra
//! precision is worth the memory over `f32` at the scale of one city's stops
//! and road nodes.

/// A WGS-84 geographic coordinate.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    #[inline]
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Haversine great-circle distance in kilometres.
    pub fn distance_km(self, other: GeoPoint) -> f64 {
        const R_KM: f64 = 6_371.0; // mean Earth radius

        let d_lat = (other.lat - self.lat).to_radians();
        let d_lon = (other.lon - self.lon).to_radians();

        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();

        let a = (d_lat * 0.5).sin().powi(2)
            + lat1.cos() * lat2.cos() * (d_lon * 0.5).sin().powi(2);

        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        R_KM * c
    }

    /// Haversine great-circle distance in metres.
    #[inline]
    pub fn distance_m(self, other: GeoPoint) -> f64 {
        self.distance_km(other) * 1_000.0
    }

    /// Approximate bounding-box check — much cheaper than `distance_km` for
    /// quick rejection in candidate searches.
    #[inline]
    pub fn within_bbox(self, center: GeoPoint, half_deg: f64) -> bool {
        (self.lat - center.lat).abs() <= half_deg
            && (self.lon - center.lon).abs() <= half_deg
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lon)
    }
}

/// Footpath time in seconds between two coordinates.
///
/// `delta_base_s` is a fixed overhead added to every walk (finding the exit,
/// crossing the street); `speed_kmh` is the assumed walking speed.
pub fn walking_time(a: GeoPoint, b: GeoPoint, delta_base_s: f64, speed_kmh: f64) -> f64 {
    let km = a.distance_km(b);
    delta_base_s + km / speed_kmh * 3_600.0
}
