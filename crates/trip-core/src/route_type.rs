//! GTFS route-type enum shared by the transit and simulation crates.

use crate::error::CoreError;

/// The kind of service a route provides (GTFS `routes.route_type`, 0–7).
///
/// Only [`RouteType::Bus`] changes simulator behavior — buses physically
/// traverse the road network; every other kind follows its schedule exactly.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub enum RouteType {
    /// Streetcar / light rail.
    Tram,
    /// Subway.
    Metro,
    Rail,
    Bus,
    Ferry,
    /// Street-level cable car.
    Cable,
    /// Suspended cable car.
    Gondola,
    /// Steep-incline rail.
    Funicular,
}

impl RouteType {
    /// Map the GTFS integer code.
    pub fn from_gtfs(code: u8) -> Result<Self, CoreError> {
        Ok(match code {
            0 => RouteType::Tram,
            1 => RouteType::Metro,
            2 => RouteType::Rail,
            3 => RouteType::Bus,
            4 => RouteType::Ferry,
            5 => RouteType::Cable,
            6 => RouteType::Gondola,
            7 => RouteType::Funicular,
            _ => return Err(CoreError::Parse(format!("unknown route_type {code}"))),
        })
    }

    /// `true` for services that share the road network with private traffic.
    #[inline]
    pub fn is_bus(self) -> bool {
        matches!(self, RouteType::Bus)
    }

    /// Human-readable label, useful for output column values.
    pub fn as_str(self) -> &'static str {
        match self {
            RouteType::Tram      => "tram",
            RouteType::Metro     => "metro",
            RouteType::Rail      => "rail",
            RouteType::Bus       => "bus",
            RouteType::Ferry     => "ferry",
            RouteType::Cable     => "cable",
            RouteType::Gondola   => "gondola",
            RouteType::Funicular => "funicular",
        }
    }
}

impl std::fmt::Display for RouteType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
