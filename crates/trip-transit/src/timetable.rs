//! Timetable construction: id interning, frequency expansion, stop spatial
//! index, and footpath precomputation.
//!
//! # Dense indices
//!
//! GTFS identifies stops and trips by strings.  Everything downstream wants
//! array indexing, so both id spaces are interned once into `StopId`/`TripId`
//! and the two-way mapping is kept here.
//!
//! # Frequency expansion
//!
//! A trip with frequency spans is a *template*: its stop times are offsets
//! from a vehicle start, and each span `(start, end, headway)` contributes
//! starts `start, start+headway, …` strictly below `end`.  Feeds in the wild
//! offset the template's stop times by the first span's start, so templates
//! are re-based to t=0 during the build.  A trip with no frequency entries is
//! a single concrete run whose timetabled times are already absolute.

use rstar::{PointDistance, RTree, RTreeObject, AABB};
use rustc_hash::FxHashMap;

use trip_core::{GeoPoint, RouteType, SimConfig, StopId, TripId, walking_time};
use trip_gtfs::GtfsFeed;

use crate::error::{TransitError, TransitResult};
use crate::store::{Connection, Footpath, sort_for_scan};

// ── Id interning ──────────────────────────────────────────────────────────────

/// Two-way mapping between external string ids and dense `u32` positions.
pub struct IdIndex {
    ids: Vec<String>,
    idx: FxHashMap<String, u32>,
}

impl IdIndex {
    fn new(ids: impl IntoIterator<Item = String>) -> Self {
        let ids: Vec<String> = ids.into_iter().collect();
        let idx = ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i as u32))
            .collect();
        Self { ids, idx }
    }

    #[inline]
    pub fn get(&self, external: &str) -> Option<u32> {
        self.idx.get(external).copied()
    }

    #[inline]
    pub fn external(&self, i: u32) -> &str {
        &self.ids[i as usize]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

// ── Trip templates ────────────────────────────────────────────────────────────

/// One scheduled visit within a trip template.  Times are relative to the
/// vehicle's start.
#[derive(Copy, Clone, Debug)]
pub struct TripStop {
    pub stop:           StopId,
    pub arrival_secs:   u32,
    pub departure_secs: u32,
    pub sequence:       u32,
}

/// A trip's ordered stop sequence plus the concrete vehicle starts expanded
/// from its frequency spans.
#[derive(Clone, Debug)]
pub struct TripTemplate {
    pub trip:       TripId,
    pub route_type: RouteType,
    pub stops:      Vec<TripStop>,
    /// Absolute start times (seconds).  `[0]` alone for non-frequency trips,
    /// whose stop times are absolute already.
    pub starts:     Vec<u32>,
}

// ── Stop spatial index ────────────────────────────────────────────────────────

#[derive(Clone)]
struct StopEntry {
    point: [f64; 2], // [lat, lon]
    id:    StopId,
}

impl RTreeObject for StopEntry {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for StopEntry {
    /// Squared Euclidean distance in lat/lon space — sufficient to order
    /// nearest-stop candidates within one city.
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dlat = self.point[0] - point[0];
        let dlon = self.point[1] - point[1];
        dlat * dlat + dlon * dlon
    }
}

// ── Timetable ─────────────────────────────────────────────────────────────────

/// The immutable transit schedule for a feed: interned ids, stop positions,
/// trip templates, and walking transfers.
pub struct Timetable {
    stop_index:  IdIndex,
    trip_index:  IdIndex,
    stop_coords: Vec<GeoPoint>,
    /// Indexed by `TripId`.
    templates:   Vec<TripTemplate>,
    /// Outgoing footpaths per stop, indexed by `StopId`.
    footpaths:   Vec<Vec<Footpath>>,
    stop_tree:   RTree<StopEntry>,
    /// Walking parameters captured at build time.
    walk_delta_base: f64,
    walk_speed_kmh:  f64,
}

impl Timetable {
    /// Build the timetable from a loaded feed.
    pub fn build(feed: &GtfsFeed, config: &SimConfig) -> TransitResult<Self> {
        let stop_index = IdIndex::new(feed.stops.iter().map(|s| s.stop_id.clone()));
        let stop_coords: Vec<GeoPoint> = feed
            .stops
            .iter()
            .map(|s| GeoPoint::new(s.stop_lat, s.stop_lon))
            .collect();

        // route_id -> RouteType
        let route_types: FxHashMap<&str, RouteType> = feed
            .routes
            .iter()
            .map(|r| {
                RouteType::from_gtfs(r.route_type)
                    .map(|t| (r.route_id.as_str(), t))
                    .map_err(|e| TransitError::InvalidTemplate {
                        trip:    r.route_id.clone(),
                        message: e.to_string(),
                    })
            })
            .collect::<TransitResult<_>>()?;

        // Keep only trips whose stop_times we actually have.
        let mut stops_by_trip: FxHashMap<&str, Vec<&trip_gtfs::StopTimeRecord>> =
            FxHashMap::default();
        for st in &feed.stop_times {
            stops_by_trip.entry(st.trip_id.as_str()).or_default().push(st);
        }

        let trip_ids: Vec<String> = feed
            .trips
            .iter()
            .filter(|t| stops_by_trip.contains_key(t.trip_id.as_str()))
            .map(|t| t.trip_id.clone())
            .collect();
        let trip_index = IdIndex::new(trip_ids);

        let mut spans_by_trip: FxHashMap<&str, Vec<&trip_gtfs::FrequencyRecord>> =
            FxHashMap::default();
        for f in &feed.frequencies {
            spans_by_trip.entry(f.trip_id.as_str()).or_default().push(f);
        }

        log::info!("expanding {} trips into templates", trip_index.len());
        let mut templates = Vec::with_capacity(trip_index.len());
        for t in &feed.trips {
            let Some(trip_idx) = trip_index.get(&t.trip_id) else { continue };
            let route_type = *route_types
                .get(t.route_id.as_str())
                .ok_or_else(|| TransitError::InvalidTemplate {
                    trip:    t.trip_id.clone(),
                    message: format!("references unknown route {:?}", t.route_id),
                })?;

            let mut records = stops_by_trip[t.trip_id.as_str()].clone();
            records.sort_by_key(|r| r.stop_sequence);

            let mut spans = spans_by_trip
                .get(t.trip_id.as_str())
                .cloned()
                .unwrap_or_default();
            spans.sort_by_key(|s| s.start_secs);

            let mut starts = Vec::new();
            for span in &spans {
                let mut at = span.start_secs;
                while at < span.end_secs {
                    starts.push(at);
                    at += span.headway_secs;
                }
            }

            // Frequency feeds offset stop times by the first start; re-base
            // the template so stop times are relative to t=0.
            let base = if starts.is_empty() { 0 } else { starts[0] };
            if starts.is_empty() {
                starts.push(0);
            }

            let stops: Vec<TripStop> = records
                .iter()
                .map(|r| {
                    if r.arrival_secs < base || r.departure_secs < base {
                        return Err(TransitError::InvalidTemplate {
                            trip:    t.trip_id.clone(),
                            message: format!(
                                "stop time {} precedes the first frequency start {}",
                                r.arrival_secs.min(r.departure_secs),
                                base
                            ),
                        });
                    }
                    Ok(TripStop {
                        stop: stop_index
                            .get(&r.stop_id)
                            .map(StopId)
                            .ok_or_else(|| TransitError::StopNotFound(r.stop_id.clone()))?,
                        arrival_secs:   r.arrival_secs - base,
                        departure_secs: r.departure_secs - base,
                        sequence:       r.stop_sequence,
                    })
                })
                .collect::<TransitResult<_>>()?;

            templates.push(TripTemplate {
                trip: TripId(trip_idx),
                route_type,
                stops,
                starts,
            });
        }
        // Index templates by TripId position.
        templates.sort_by_key(|t| t.trip.0);

        let stop_tree = RTree::bulk_load(
            stop_coords
                .iter()
                .enumerate()
                .map(|(i, &pos)| StopEntry {
                    point: [pos.lat, pos.lon],
                    id:    StopId(i as u32),
                })
                .collect(),
        );

        let mut timetable = Self {
            stop_index,
            trip_index,
            stop_coords,
            templates,
            footpaths: Vec::new(),
            stop_tree,
            walk_delta_base: config.footpath_delta_base as f64,
            walk_speed_kmh:  config.footpath_speed_kmh,
        };
        timetable.footpaths = timetable.compute_footpaths(config);
        Ok(timetable)
    }

    // ── Footpaths ─────────────────────────────────────────────────────────

    /// For each stop, walking transfers to its nearest neighbours, keeping
    /// only those within `footpath_delta_max`.
    fn compute_footpaths(&self, config: &SimConfig) -> Vec<Vec<Footpath>> {
        log::info!(
            "computing footpaths ({} closest per stop)",
            config.closest_indirect_transfers
        );
        let max = config.footpath_delta_max as f64;
        (0..self.stop_count())
            .map(|i| {
                let stop = StopId(i as u32);
                let coord = self.stop_coords[i];
                // +1 because the nearest neighbour is the stop itself.
                self.closest_stops(coord, config.closest_indirect_transfers + 1)
                    .into_iter()
                    .filter(|(other, _)| *other != stop)
                    .filter(|(_, walk)| *walk <= max)
                    .map(|(other, walk)| Footpath {
                        dep_stop:  stop,
                        arr_stop:  other,
                        walk_secs: walk.ceil() as u32,
                    })
                    .collect()
            })
            .collect()
    }

    // ── Queries ───────────────────────────────────────────────────────────

    /// The `n` stops closest to `coord`, paired with estimated walking time
    /// in seconds, nearest first.
    pub fn closest_stops(&self, coord: GeoPoint, n: usize) -> Vec<(StopId, f64)> {
        self.stop_tree
            .nearest_neighbor_iter(&[coord.lat, coord.lon])
            .take(n)
            .map(|e| {
                let walk = walking_time(
                    coord,
                    self.stop_coords[e.id.index()],
                    self.walk_delta_base,
                    self.walk_speed_kmh,
                );
                (e.id, walk)
            })
            .collect()
    }

    #[inline]
    pub fn stop_count(&self) -> usize {
        self.stop_coords.len()
    }

    pub fn stop_id(&self, external: &str) -> TransitResult<StopId> {
        self.stop_index
            .get(external)
            .map(StopId)
            .ok_or_else(|| TransitError::StopNotFound(external.to_string()))
    }

    #[inline]
    pub fn stop_external(&self, stop: StopId) -> &str {
        self.stop_index.external(stop.0)
    }

    #[inline]
    pub fn stop_coord(&self, stop: StopId) -> GeoPoint {
        self.stop_coords[stop.index()]
    }

    pub fn trip_id(&self, external: &str) -> TransitResult<TripId> {
        self.trip_index
            .get(external)
            .map(TripId)
            .ok_or_else(|| TransitError::TripNotFound(external.to_string()))
    }

    #[inline]
    pub fn trip_external(&self, trip: TripId) -> &str {
        self.trip_index.external(trip.0)
    }

    #[inline]
    pub fn templates(&self) -> &[TripTemplate] {
        &self.templates
    }

    #[inline]
    pub fn template(&self, trip: TripId) -> &TripTemplate {
        &self.templates[trip.index()]
    }

    /// What kind of route a trip runs on (bus, metro, …).
    #[inline]
    pub fn route_type(&self, trip: TripId) -> RouteType {
        self.templates[trip.index()].route_type
    }

    #[inline]
    pub fn footpaths(&self) -> &[Vec<Footpath>] {
        &self.footpaths
    }

    // ── Connection generation ─────────────────────────────────────────────

    /// Generate the departure-sorted connection list for the trips in
    /// `valid`, one connection per consecutive stop pair per vehicle start.
    ///
    /// Degenerate pairs whose arrival does not come after their departure are
    /// dropped with a warning — the scan's invariants assume strictly
    /// positive hop durations.
    pub fn connections_for_trips(&self, valid: &rustc_hash::FxHashSet<TripId>) -> Vec<Connection> {
        let mut connections = Vec::new();
        let mut dropped = 0usize;
        for template in &self.templates {
            if !valid.contains(&template.trip) {
                continue;
            }
            for pair in template.stops.windows(2) {
                let (dep, arr) = (&pair[0], &pair[1]);
                if arr.arrival_secs <= dep.departure_secs {
                    dropped += 1;
                    continue;
                }
                for &start in &template.starts {
                    connections.push(Connection {
                        dep_time: dep.departure_secs + start,
                        arr_time: arr.arrival_secs + start,
                        dep_stop: dep.stop,
                        arr_stop: arr.stop,
                        trip:     template.trip,
                    });
                }
            }
        }
        if dropped > 0 {
            log::warn!("dropped {dropped} zero-duration stop pairs from the connection list");
        }
        sort_for_scan(&mut connections);
        connections
    }
}
