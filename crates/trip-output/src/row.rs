//! Plain data row types written by output backends.

use trip_sim::SimOutput;

/// One completed agent trip.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentTripRow {
    pub agent_id:    String,
    pub start_lat:   f64,
    pub start_lon:   f64,
    pub end_lat:     f64,
    pub end_lon:     f64,
    pub stop_type:   &'static str,
    pub dep_time_s:  u64,
    pub arr_time_s:  u64,
}

/// One occupancy change on a road edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoadOccupancyRow {
    /// `"drive"` for the private network, `"transit"` for the bus network.
    pub network:   &'static str,
    pub edge_id:   u32,
    pub occupancy: u32,
    pub time_s:    u64,
}

/// Flatten a finished run into writable rows.
///
/// Occupancy rows come out ordered by edge id then time within each network,
/// so files are deterministic for a given run.
pub fn rows_from_output(output: &SimOutput) -> (Vec<AgentTripRow>, Vec<RoadOccupancyRow>) {
    let trips = output
        .agent_trips
        .iter()
        .map(|t| AgentTripRow {
            agent_id:   t.agent.clone(),
            start_lat:  t.start.lat,
            start_lon:  t.start.lon,
            end_lat:    t.end.lat,
            end_lon:    t.end.lon,
            stop_type:  t.stop_type.as_str(),
            dep_time_s: t.depart.as_secs(),
            arr_time_s: t.arrive.as_secs(),
        })
        .collect();

    let mut occupancy = Vec::new();
    for (label, map) in [
        ("drive", &output.road_capacities),
        ("transit", &output.transit_road_capacities),
    ] {
        let mut edges: Vec<_> = map.iter().collect();
        edges.sort_by_key(|(edge, _)| edge.0);
        for (edge, series) in edges {
            for &(occ, time_s) in series {
                occupancy.push(RoadOccupancyRow {
                    network:   label,
                    edge_id:   edge.0,
                    occupancy: occ,
                    time_s,
                });
            }
        }
    }
    (trips, occupancy)
}
