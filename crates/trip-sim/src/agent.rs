//! Agents and their trip traces.

use trip_core::{GeoPoint, SimTime};

/// Why an agent makes a trip.  Only commutes exist today; the variant set
/// matches the snapshot producer's vocabulary.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StopType {
    Commute,
}

impl StopType {
    pub fn as_str(self) -> &'static str {
        match self {
            StopType::Commute => "commute",
        }
    }
}

/// One planned trip in an agent's day: go from `start` to `end`, departing
/// at `dep_secs` (seconds from midnight).
#[derive(Clone, Debug)]
pub struct PlannedStop {
    pub start:     GeoPoint,
    pub end:       GeoPoint,
    pub dep_secs:  u32,
    pub stop_type: StopType,
}

/// An agent as delivered by the snapshot: an external id, the day's ordered
/// stops, and whether it rides transit (`public`) or drives.
#[derive(Clone, Debug)]
pub struct Agent {
    pub external_id: String,
    pub stops:       Vec<PlannedStop>,
    pub public:      bool,
}

/// One completed trip, emitted into the run's trip log.
#[derive(Clone, Debug)]
pub struct AgentTrip {
    pub agent:       String,
    pub start:       GeoPoint,
    pub end:         GeoPoint,
    pub stop_type:   StopType,
    pub depart:      SimTime,
    pub arrive:      SimTime,
}
