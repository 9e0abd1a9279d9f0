//! Agent snapshot ingestion.
//!
//! The upstream economy model hands over a JSON snapshot keyed by agent id:
//!
//! ```json
//! {
//!   "agents": { "123": [x, y, house_id, firm_id, last_wage], ... },
//!   "firms":  { "7": [x, y], ... }
//! }
//! ```
//!
//! Coordinates are `(x = lon, y = lat)`.  From this the orchestrator derives
//! one commute per working agent: home → firm, departing early enough to hit
//! a target arrival drawn between 07:00 and 09:00, with the transit/car split
//! decided by household wage decile.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use trip_core::{GeoPoint, SimConfig, SimRng};

use crate::agent::{Agent, PlannedStop, StopType};
use crate::error::{SimError, SimResult};

/// Rough door-to-door speed (km/h) used to back-compute a departure time
/// from the target arrival.
const EXPECTED_SPEED_KMH: f64 = 80.0;

/// `(x, y, house_id, firm_id, last_wage)` — ids and wage are nullable.
#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotAgent(
    pub f64,
    pub f64,
    pub Option<u64>,
    pub Option<u64>,
    pub Option<f64>,
);

/// A deserialized snapshot file.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentSnapshot {
    pub agents: HashMap<String, SnapshotAgent>,
    pub firms:  HashMap<String, (f64, f64)>,
}

impl AgentSnapshot {
    pub fn from_path(path: &Path) -> SimResult<Self> {
        let file = std::fs::File::open(path)
            .map_err(|e| SimError::Snapshot(format!("{}: {e}", path.display())))?;
        serde_json::from_reader(file).map_err(|e| SimError::Snapshot(e.to_string()))
    }

    pub fn from_str(json: &str) -> SimResult<Self> {
        serde_json::from_str(json).map_err(|e| SimError::Snapshot(e.to_string()))
    }
}

/// Agents derived from a snapshot, plus how many were skipped and why.
pub struct BuiltAgents {
    pub agents:        Vec<Agent>,
    pub not_working:   usize,
    pub out_of_bounds: usize,
}

/// Derive simulated agents from a snapshot.
///
/// - Agents without a firm stay home and are skipped.
/// - Agents outside `bounds` (the road network's coverage, if known) are
///   skipped with a warning — their coordinates cannot be resolved.
/// - Car availability: the household's working members share its cars, so an
///   agent drives with probability `quantile(decile(wage)) / working members`;
///   unknown wages ride transit.
pub fn build_agents(
    snapshot: &AgentSnapshot,
    bounds:   Option<(GeoPoint, GeoPoint)>,
    config:   &SimConfig,
    rng:      &mut SimRng,
) -> BuiltAgents {
    // Working members per household, and the wage list for decile ranking.
    let mut household_workers: HashMap<u64, u32> = HashMap::new();
    let mut wages: Vec<f64> = Vec::new();
    for a in snapshot.agents.values() {
        let SnapshotAgent(_, _, house_id, firm_id, last_wage) = a;
        if firm_id.is_some() {
            if let Some(house) = house_id {
                *household_workers.entry(*house).or_insert(0) += 1;
            }
            if let Some(w) = last_wage {
                wages.push(*w);
            }
        }
    }
    wages.sort_by(f64::total_cmp);

    let decile_of = |wage: f64| -> usize {
        if wages.is_empty() {
            return 0;
        }
        // Rank position → decile 0..=9.
        let rank = wages.partition_point(|&w| w < wage);
        (rank * 10 / wages.len()).min(9)
    };

    let mut agents = Vec::new();
    let mut not_working = 0usize;
    let mut out_of_bounds = 0usize;

    // Deterministic iteration: sort ids so the RNG consumption order is
    // stable across runs.
    let mut ids: Vec<&String> = snapshot.agents.keys().collect();
    ids.sort();

    for id in ids {
        let SnapshotAgent(x, y, house_id, firm_id, last_wage) = &snapshot.agents[id];

        let Some(firm) = firm_id else {
            not_working += 1;
            continue;
        };
        let Some(&(fx, fy)) = snapshot.firms.get(&firm.to_string()) else {
            not_working += 1;
            continue;
        };

        let home = GeoPoint::new(*y, *x);
        let work = GeoPoint::new(fy, fx);

        if let Some((min, max)) = bounds
            && !(home.lat >= min.lat
                && home.lat <= max.lat
                && home.lon >= min.lon
                && home.lon <= max.lon)
        {
            log::warn!("agent {id}: home {home} outside network bounds, skipping");
            out_of_bounds += 1;
            continue;
        }

        // Aim to clock in between 07:00 and 09:00; leave early enough for a
        // rough straight-line estimate of the trip.
        let target_arrival = rng.gen_range(7 * 3_600..=9 * 3_600) as f64;
        let expected_travel_secs = home.distance_km(work) / EXPECTED_SPEED_KMH * 3_600.0;
        let dep_secs = (target_arrival - expected_travel_secs).max(0.0) as u32;

        let public = match last_wage {
            None => true,
            Some(wage) => {
                let workers = house_id
                    .and_then(|h| household_workers.get(&h).copied())
                    .unwrap_or(1)
                    .max(1);
                let car_prob =
                    config.car_ownership_quantiles[decile_of(*wage)] / workers as f64;
                !rng.gen_bool(car_prob)
            }
        };

        agents.push(Agent {
            external_id: id.clone(),
            stops: vec![PlannedStop {
                start:     home,
                end:       work,
                dep_secs,
                stop_type: StopType::Commute,
            }],
            public,
        });
    }

    if out_of_bounds > 0 {
        log::warn!("{out_of_bounds} agents outside the network were skipped");
    }

    BuiltAgents { agents, not_working, out_of_bounds }
}
