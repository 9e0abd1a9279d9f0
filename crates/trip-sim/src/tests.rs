//! Integration tests: event ordering, rendezvous, private traffic, and the
//! coupled bus.

use trip_core::{AgentId, GeoPoint, SimConfig, SimTime, VehicleId};
use trip_gtfs::{CalendarRecord, GtfsFeed, RouteRecord, StopRecord, StopTimeRecord, TripRecord};
use trip_road::{RawSegment, RoadNetwork, RoadNetworkBuilder};
use trip_transit::{Timetable, TransitRouter};

use crate::agent::{Agent, PlannedStop, StopType};
use crate::events::{Action, EventQueue};
use crate::road_vehicle::RoadVehicleId;
use crate::sim::Sim;

// ── Fixtures ──────────────────────────────────────────────────────────────────

fn calendar_every_day(service_id: &str) -> CalendarRecord {
    CalendarRecord {
        service_id: service_id.into(),
        monday: 1, tuesday: 1, wednesday: 1, thursday: 1, friday: 1,
        saturday: 1, sunday: 1,
        start_date: "20170101".into(),
        end_date:   "20271231".into(),
    }
}

/// One trip A → B with absolute stop times (no frequencies).
///
/// A at (-19.920, -43.940), B 3 km south.  Arr/dep: A 8:00:00/8:00:30,
/// B 8:02:30/8:03:00.
fn rail_feed() -> GtfsFeed {
    feed_with_route_type(1, GeoPoint::new(-19.947, -43.940))
}

/// Same shape but a bus route, with B only ~1.1 km south so the test road
/// network stays small.
fn bus_feed() -> GtfsFeed {
    feed_with_route_type(3, GeoPoint::new(-19.930, -43.940))
}

fn feed_with_route_type(route_type: u8, stop_b: GeoPoint) -> GtfsFeed {
    GtfsFeed {
        stops: vec![
            StopRecord { stop_id: "A".into(), stop_lat: -19.920, stop_lon: -43.940 },
            StopRecord { stop_id: "B".into(), stop_lat: stop_b.lat, stop_lon: stop_b.lon },
        ],
        stop_times: vec![
            StopTimeRecord {
                trip_id:        "T1".into(),
                stop_id:        "A".into(),
                stop_sequence:  1,
                arrival_secs:   28_800,
                departure_secs: 28_830,
            },
            StopTimeRecord {
                trip_id:        "T1".into(),
                stop_id:        "B".into(),
                stop_sequence:  2,
                arrival_secs:   28_950,
                departure_secs: 28_980,
            },
        ],
        trips: vec![TripRecord {
            trip_id:    "T1".into(),
            route_id:   "R1".into(),
            service_id: "S".into(),
        }],
        routes: vec![RouteRecord { route_id: "R1".into(), route_type }],
        frequencies: vec![],
        calendar: vec![calendar_every_day("S")],
        calendar_dates: vec![],
    }
}

fn street(from: trip_core::NodeId, to: trip_core::NodeId, length_m: f64, oneway: bool) -> RawSegment {
    RawSegment {
        from,
        to,
        length_m,
        maxspeed_kmh: vec![36.0], // 10 m/s
        lanes: vec![1],
        highway: vec!["residential".into()],
        oneway,
        ..RawSegment::default()
    }
}

/// A 2×2 two-way block grid for private traffic.
fn private_grid() -> RoadNetwork {
    let mut b = RoadNetworkBuilder::new();
    let n0 = b.add_node(GeoPoint::new(-19.920, -43.940));
    let n1 = b.add_node(GeoPoint::new(-19.920, -43.935));
    let n2 = b.add_node(GeoPoint::new(-19.930, -43.940));
    let n3 = b.add_node(GeoPoint::new(-19.930, -43.935));
    b.add_segment(street(n0, n1, 550.0, false));
    b.add_segment(street(n2, n3, 550.0, false));
    b.add_segment(street(n0, n2, 1_100.0, false));
    b.add_segment(street(n1, n3, 1_100.0, false));
    b.build(&SimConfig::default())
}

/// A one-way street along the bus line, split mid-way so stops A and B snap
/// to distinct edges: n0 → nm → n1 north to south.
fn bus_road_network() -> RoadNetwork {
    let mut b = RoadNetworkBuilder::new();
    let n0 = b.add_node(GeoPoint::new(-19.918, -43.940));
    let nm = b.add_node(GeoPoint::new(-19.925, -43.940));
    let n1 = b.add_node(GeoPoint::new(-19.932, -43.940));
    b.add_segment(street(n0, nm, 778.0, true));
    b.add_segment(street(nm, n1, 778.0, true));
    b.build(&SimConfig::default())
}

fn commute(start: GeoPoint, end: GeoPoint, dep_secs: u32) -> Vec<PlannedStop> {
    vec![PlannedStop { start, end, dep_secs, stop_type: StopType::Commute }]
}

// ── Event queue ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod event_queue_tests {
    use super::*;

    #[test]
    fn pops_in_time_order() {
        let mut q = EventQueue::new();
        q.push(SimTime::from_secs(30), Action::PassengerStep(AgentId(0)));
        q.push(SimTime::from_secs(10), Action::PassengerStep(AgentId(1)));
        q.push(SimTime::from_secs(20), Action::PassengerStep(AgentId(2)));

        let order: Vec<SimTime> = std::iter::from_fn(|| q.pop().map(|(t, _)| t)).collect();
        assert_eq!(
            order,
            vec![SimTime::from_secs(10), SimTime::from_secs(20), SimTime::from_secs(30)]
        );
    }

    #[test]
    fn equal_times_pop_fifo() {
        let mut q = EventQueue::new();
        let t = SimTime::from_secs(60);
        for i in 0..5 {
            q.push(t, Action::PassengerStep(AgentId(i)));
        }
        let order: Vec<Action> = std::iter::from_fn(|| q.pop().map(|(_, a)| a)).collect();
        let expected: Vec<Action> = (0..5).map(|i| Action::PassengerStep(AgentId(i))).collect();
        assert_eq!(order, expected);
    }

    #[test]
    fn interleaved_pushes_keep_fifo_within_a_time() {
        let mut q = EventQueue::new();
        q.push(SimTime::from_secs(10), Action::RoadStep(RoadVehicleId(0)));
        q.push(SimTime::from_secs(5), Action::TransitAdvance(VehicleId(9)));
        q.push(SimTime::from_secs(10), Action::RoadStep(RoadVehicleId(1)));

        assert_eq!(q.pop().unwrap().1, Action::TransitAdvance(VehicleId(9)));
        assert_eq!(q.pop().unwrap().1, Action::RoadStep(RoadVehicleId(0)));
        assert_eq!(q.pop().unwrap().1, Action::RoadStep(RoadVehicleId(1)));
        assert!(q.pop().is_none());
    }
}

// ── Scheduled transit rendezvous ──────────────────────────────────────────────

#[cfg(test)]
mod rendezvous_tests {
    use super::*;

    #[test]
    fn passenger_rides_a_scheduled_vehicle() {
        let config = SimConfig::default();
        let feed = rail_feed();
        let timetable = Timetable::build(&feed, &config).unwrap();
        let router = TransitRouter::all_days(&timetable, &config);

        let mut sim = Sim::new(&config, &router, private_grid());
        let agent = Agent {
            external_id: "42".into(),
            stops: commute(
                GeoPoint::new(-19.920, -43.940),
                GeoPoint::new(-19.947, -43.940),
                28_500, // 07:55
            ),
            public: true,
        };
        sim.run(vec![agent]);

        let output = sim.into_output();
        assert_eq!(output.summary.vehicles_spawned, 1);
        assert_eq!(output.summary.agents_planned, 1);
        assert_eq!(output.agent_trips.len(), 1);

        let trip = &output.agent_trips[0];
        assert_eq!(trip.agent, "42");
        assert_eq!(trip.depart, SimTime::from_secs(28_500));
        // The vehicle reaches B 120 s of travel after leaving A (arriving
        // 8:02:00); the rider then walks ~2 min to the door.
        assert!(trip.arrive > SimTime::from_secs(29_000));
        assert!(trip.arrive < SimTime::from_secs(29_250), "arrived at {}", trip.arrive);
    }

    #[test]
    fn late_passenger_misses_the_vehicle_and_stays_queued() {
        // Departing at 08:10 the passenger reaches the stop after the only
        // vehicle has passed; per policy it waits forever rather than
        // re-planning, so its trip never completes.
        let config = SimConfig { closest_stops: 1, ..SimConfig::default() };
        let feed = rail_feed();
        let timetable = Timetable::build(&feed, &config).unwrap();
        let router = TransitRouter::all_days(&timetable, &config);

        let mut sim = Sim::new(&config, &router, private_grid());
        let agent = Agent {
            external_id: "late".into(),
            stops: commute(
                GeoPoint::new(-19.920, -43.940),
                GeoPoint::new(-19.947, -43.940),
                28_790, // reaches the stop just after the 08:00:00 departure
            ),
            public: true,
        };
        sim.run(vec![agent]);

        let output = sim.into_output();
        // The queue drained (the run ended) with the trip unfinished.
        assert_eq!(output.summary.agents_planned, 1);
        assert_eq!(output.agent_trips.len(), 0);
    }
}

// ── Private traffic ───────────────────────────────────────────────────────────

#[cfg(test)]
mod private_car_tests {
    use super::*;

    #[test]
    fn car_trip_completes_and_occupancy_balances() {
        let config = SimConfig::default();
        let feed = rail_feed();
        let timetable = Timetable::build(&feed, &config).unwrap();
        let router = TransitRouter::all_days(&timetable, &config);

        let mut sim = Sim::new(&config, &router, private_grid());
        let agent = Agent {
            external_id: "driver".into(),
            stops: commute(
                GeoPoint::new(-19.9201, -43.938),
                GeoPoint::new(-19.9299, -43.937),
                25_200, // 07:00
            ),
            public: false,
        };
        sim.run(vec![agent]);

        // Every entered edge was left again.
        let (enters, leaves) = sim.roads().flow_totals();
        assert!(enters >= 2, "expected a multi-leg route, got {enters} enters");
        assert_eq!(enters, leaves);
        for i in 0..sim.roads().edge_count() {
            assert_eq!(sim.roads().edge(trip_core::EdgeId(i as u32)).occupancy, 0);
        }

        let output = sim.into_output();
        assert_eq!(output.agent_trips.len(), 1);
        let trip = &output.agent_trips[0];
        assert_eq!(trip.depart, SimTime::from_secs(25_200));
        assert!(trip.arrive > trip.depart);
        assert!(trip.arrive < SimTime::from_secs(26_200), "arrived at {}", trip.arrive);

        // The occupancy series covers the traversed edges and ends at zero.
        assert!(!output.road_capacities.is_empty());
        for series in output.road_capacities.values() {
            assert_eq!(series.last().map(|&(occ, _)| occ), Some(0));
        }
    }

    #[test]
    fn later_vehicles_pay_for_congestion() {
        // Many simultaneous departures on the same corridor: the trip log
        // shows strictly later arrivals for vehicles that entered a loaded
        // edge.
        let config = SimConfig::default();
        let feed = rail_feed();
        let timetable = Timetable::build(&feed, &config).unwrap();
        let router = TransitRouter::all_days(&timetable, &config);

        let mut sim = Sim::new(&config, &router, private_grid());
        let agents: Vec<Agent> = (0..12)
            .map(|i| Agent {
                external_id: format!("car{i}"),
                stops: commute(
                    GeoPoint::new(-19.9201, -43.938),
                    GeoPoint::new(-19.9299, -43.937),
                    25_200,
                ),
                public: false,
            })
            .collect();
        sim.run(agents);

        let output = sim.into_output();
        assert_eq!(output.agent_trips.len(), 12);

        let mut durations: Vec<u64> =
            output.agent_trips.iter().map(|t| t.arrive - t.depart).collect();
        durations.sort_unstable();
        // All departed together, but occupancy made the slowest strictly
        // slower than the fastest.
        assert!(
            durations.last() > durations.first(),
            "expected congestion spread, got {durations:?}"
        );
    }
}

// ── Coupled bus ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod bus_tests {
    use super::*;

    fn bus_sim_setup() -> (SimConfig, GtfsFeed) {
        (SimConfig::default(), bus_feed())
    }

    #[test]
    fn empty_road_keeps_the_bus_near_schedule() {
        let (config, feed) = bus_sim_setup();
        let timetable = Timetable::build(&feed, &config).unwrap();
        let router = TransitRouter::all_days(&timetable, &config);

        let mut sim =
            Sim::new(&config, &router, private_grid()).with_transit_roads(bus_road_network());
        sim.set_debug(true);

        let agent = Agent {
            external_id: "rider".into(),
            stops: commute(
                GeoPoint::new(-19.920, -43.940),
                GeoPoint::new(-19.930, -43.940),
                28_500,
            ),
            public: true,
        };
        sim.run(vec![agent]);

        let output = sim.into_output();
        assert_eq!(output.summary.no_road_route_fallbacks, 0);
        assert_eq!(output.summary.unsnapped_stops, 0);
        assert_eq!(output.summary.delayed_bus_arrivals, 0);
        assert_eq!(output.agent_trips.len(), 1);

        // Bus left A at 08:00:30 and drove ~1.1 km of free road at 10 m/s:
        // arrival at B lands within seconds of the scheduled 08:02:30, and
        // the rider walks off after it.
        let trip = &output.agent_trips[0];
        assert!(trip.arrive > SimTime::from_secs(28_950));
        assert!(trip.arrive < SimTime::from_secs(29_250), "arrived at {}", trip.arrive);

        // The bus showed up in the transit network's occupancy series.
        assert!(!output.transit_road_capacities.is_empty());
        for series in output.transit_road_capacities.values() {
            assert_eq!(series.last().map(|&(occ, _)| occ), Some(0));
        }
    }

    #[test]
    fn congestion_delays_the_bus_and_its_riders() {
        let (config, feed) = bus_sim_setup();
        let timetable = Timetable::build(&feed, &config).unwrap();
        let router = TransitRouter::all_days(&timetable, &config);

        // Jam the first street segment before the bus leaves the depot.
        let mut bus_net = bus_road_network();
        let jammed = bus_net.find_edge(trip_core::NodeId(0), trip_core::NodeId(1), 0).unwrap();
        bus_net.configure_log(false, None); // keep the jam out of the series
        for _ in 0..400 {
            bus_net.enter(jammed, SimTime::ZERO);
        }
        bus_net.configure_log(true, None);

        let mut sim = Sim::new(&config, &router, private_grid()).with_transit_roads(bus_net);
        sim.set_debug(true);

        let agent = Agent {
            external_id: "rider".into(),
            stops: commute(
                GeoPoint::new(-19.920, -43.940),
                GeoPoint::new(-19.930, -43.940),
                28_500,
            ),
            public: true,
        };
        sim.run(vec![agent]);

        let output = sim.into_output();
        assert_eq!(output.summary.no_road_route_fallbacks, 0);

        // The jammed edge multiplies travel time several-fold: the bus blows
        // through the delay margin and the rider's arrival reflects it.
        assert!(output.summary.delayed_bus_arrivals >= 1);
        let worst = output
            .bus_deviations
            .iter()
            .map(|d| d.deviation_secs)
            .fold(f64::MIN, f64::max);
        assert!(worst > config.acceptable_delay_margin, "worst deviation {worst}");

        let trip = &output.agent_trips[0];
        assert!(
            trip.arrive > SimTime::from_secs(29_400),
            "expected a late arrival, got {}",
            trip.arrive
        );
    }

    #[test]
    fn missing_road_route_falls_back_to_schedule() {
        let (config, feed) = bus_sim_setup();
        let timetable = Timetable::build(&feed, &config).unwrap();
        let router = TransitRouter::all_days(&timetable, &config);

        // A bus network nowhere near the stops still snaps them (the search
        // widens until it finds *something*), but stop B's edge precedes
        // stop A's in one-way order, so no path connects them.
        let mut b = RoadNetworkBuilder::new();
        let n0 = b.add_node(GeoPoint::new(-19.932, -43.940));
        let n1 = b.add_node(GeoPoint::new(-19.918, -43.940));
        b.add_segment(street(n0, n1, 1_556.0, true)); // south→north only
        let bus_net = b.build(&config);

        let mut sim = Sim::new(&config, &router, private_grid()).with_transit_roads(bus_net);

        let agent = Agent {
            external_id: "rider".into(),
            stops: commute(
                GeoPoint::new(-19.920, -43.940),
                GeoPoint::new(-19.930, -43.940),
                28_500,
            ),
            public: true,
        };
        sim.run(vec![agent]);

        let output = sim.into_output();
        // The segment fell back to timetable deltas and the ride still
        // completed at the scheduled time.
        assert!(output.summary.no_road_route_fallbacks >= 1);
        assert_eq!(output.agent_trips.len(), 1);
        let trip = &output.agent_trips[0];
        assert!(trip.arrive > SimTime::from_secs(28_950));
        assert!(trip.arrive < SimTime::from_secs(29_250));
    }
}

// ── Multi-stop itineraries ────────────────────────────────────────────────────

#[cfg(test)]
mod itinerary_tests {
    use super::*;

    #[test]
    fn second_stop_is_planned_after_the_first_arrival() {
        let config = SimConfig::default();
        let feed = rail_feed();
        let timetable = Timetable::build(&feed, &config).unwrap();
        let router = TransitRouter::all_days(&timetable, &config);

        let home = GeoPoint::new(-19.9201, -43.938);
        let work = GeoPoint::new(-19.9299, -43.937);

        let mut sim = Sim::new(&config, &router, private_grid());
        let agent = Agent {
            external_id: "commuter".into(),
            stops: vec![
                PlannedStop {
                    start:     home,
                    end:       work,
                    dep_secs:  25_200, // 07:00 out
                    stop_type: StopType::Commute,
                },
                PlannedStop {
                    start:     work,
                    end:       home,
                    dep_secs:  61_200, // 17:00 back
                    stop_type: StopType::Commute,
                },
            ],
            public: false,
        };
        sim.run(vec![agent]);

        // Both trips released their edges.
        let (enters, leaves) = sim.roads().flow_totals();
        assert_eq!(enters, leaves);

        let output = sim.into_output();
        assert_eq!(output.agent_trips.len(), 2);

        let (out, back) = (&output.agent_trips[0], &output.agent_trips[1]);
        assert_eq!(out.start, home);
        assert_eq!(out.end, work);
        // The return leg waits for its scheduled departure, well after the
        // morning arrival.
        assert_eq!(back.depart, SimTime::from_secs(61_200));
        assert_eq!(back.start, work);
        assert_eq!(back.end, home);
        assert!(back.arrive > back.depart);
    }
}

// ── Snapshot ingestion ────────────────────────────────────────────────────────

#[cfg(test)]
mod snapshot_tests {
    use super::*;
    use trip_core::SimRng;

    use crate::snapshot::{AgentSnapshot, build_agents};

    const SNAPSHOT: &str = r#"{
        "agents": {
            "1": [-43.94, -19.92, 10, 7, 1200.0],
            "2": [-43.94, -19.921, 10, null, null],
            "3": [-43.50, -19.50, 11, 7, 500.0]
        },
        "firms": { "7": [-43.935, -19.925] }
    }"#;

    fn bounds() -> (GeoPoint, GeoPoint) {
        (GeoPoint::new(-19.95, -43.95), GeoPoint::new(-19.90, -43.90))
    }

    #[test]
    fn snapshot_parses_coordinates_as_lon_lat() {
        let snapshot = AgentSnapshot::from_str(SNAPSHOT).unwrap();
        assert_eq!(snapshot.agents.len(), 3);
        assert_eq!(snapshot.firms.len(), 1);

        let config = SimConfig::default();
        let mut rng = SimRng::new(config.seed);
        let built = build_agents(&snapshot, Some(bounds()), &config, &mut rng);

        assert_eq!(built.agents.len(), 1);
        let agent = &built.agents[0];
        assert_eq!(agent.external_id, "1");
        // (x, y) in the file is (lon, lat).
        assert_eq!(agent.stops[0].start, GeoPoint::new(-19.92, -43.94));
        assert_eq!(agent.stops[0].end, GeoPoint::new(-19.925, -43.935));
    }

    #[test]
    fn non_working_and_out_of_bounds_agents_are_skipped() {
        let snapshot = AgentSnapshot::from_str(SNAPSHOT).unwrap();
        let config = SimConfig::default();
        let mut rng = SimRng::new(config.seed);
        let built = build_agents(&snapshot, Some(bounds()), &config, &mut rng);

        assert_eq!(built.not_working, 1); // agent 2 has no firm
        assert_eq!(built.out_of_bounds, 1); // agent 3 lives off the map
    }

    #[test]
    fn departures_target_the_morning_window() {
        let snapshot = AgentSnapshot::from_str(SNAPSHOT).unwrap();
        let config = SimConfig::default();
        let mut rng = SimRng::new(config.seed);
        let built = build_agents(&snapshot, Some(bounds()), &config, &mut rng);

        let dep = built.agents[0].stops[0].dep_secs;
        // Departure precedes the 09:00 upper target but not absurdly so —
        // the home/work distance here is under a kilometre.
        assert!(dep > 6 * 3_600, "dep {dep}");
        assert!(dep < 9 * 3_600, "dep {dep}");
    }

    #[test]
    fn same_seed_reproduces_the_same_population() {
        let snapshot = AgentSnapshot::from_str(SNAPSHOT).unwrap();
        let config = SimConfig::default();

        let a = build_agents(&snapshot, None, &config, &mut SimRng::new(7));
        let b = build_agents(&snapshot, None, &config, &mut SimRng::new(7));

        let key = |agents: &[Agent]| -> Vec<(String, u32, bool)> {
            agents
                .iter()
                .map(|a| (a.external_id.clone(), a.stops[0].dep_secs, a.public))
                .collect()
        };
        assert_eq!(key(&a.agents), key(&b.agents));
    }

    #[test]
    fn malformed_snapshot_is_an_error() {
        assert!(AgentSnapshot::from_str("{\"agents\": 5}").is_err());
    }
}

// ── Drop accounting ───────────────────────────────────────────────────────────

#[cfg(test)]
mod drop_tests {
    use super::*;

    #[test]
    fn unplannable_agent_is_dropped_with_a_count() {
        // One candidate stop per endpoint and a departure after the last
        // vehicle: planning fails and the agent is dropped up front.
        let config = SimConfig { closest_stops: 1, ..SimConfig::default() };
        let feed = rail_feed();
        let timetable = Timetable::build(&feed, &config).unwrap();
        let router = TransitRouter::all_days(&timetable, &config);

        let mut sim = Sim::new(&config, &router, private_grid());
        let agent = Agent {
            external_id: "stranded".into(),
            stops: commute(
                GeoPoint::new(-19.920, -43.940),
                GeoPoint::new(-19.947, -43.940),
                80_000,
            ),
            public: true,
        };
        sim.run(vec![agent]);

        let output = sim.into_output();
        assert_eq!(output.summary.agents_dropped, 1);
        assert_eq!(output.summary.agents_planned, 0);
        assert!(output.agent_trips.is_empty());
    }
}
