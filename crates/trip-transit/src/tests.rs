//! Tests for the connection scan, timetable building, and planner.

use rustc_hash::FxHashSet;

use trip_core::{GeoPoint, SimConfig, StopId, TripId};
use trip_gtfs::{
    CalendarRecord, FrequencyRecord, GtfsFeed, RouteRecord, StopRecord, StopTimeRecord, TripRecord,
};

use crate::csa::{JourneyLeg, earliest_arrival};
use crate::planner::{PlanLeg, TransitRouter};
use crate::store::{Connection, Footpath, sort_for_scan};
use crate::timetable::Timetable;

const TRANSFER: u32 = 120;

// ── Scan fixtures ─────────────────────────────────────────────────────────────

fn con(dep: u32, arr: u32, from: u32, to: u32, trip: u32) -> Connection {
    Connection {
        dep_time: dep,
        arr_time: arr,
        dep_stop: StopId(from),
        arr_stop: StopId(to),
        trip:     TripId(trip),
    }
}

/// Scan over `connections` with `stops` total stops and no footpaths.
fn scan(
    connections: &mut Vec<Connection>,
    stops: usize,
    start: u32,
    end: u32,
    dep: u32,
) -> Option<crate::csa::Journey> {
    let footpaths = vec![Vec::new(); stops];
    sort_for_scan(connections);
    earliest_arrival(connections, &footpaths, StopId(start), StopId(end), dep, TRANSFER)
}

// ── Connection scan ───────────────────────────────────────────────────────────

#[cfg(test)]
mod csa_tests {
    use super::*;

    #[test]
    fn trivial_direct_ride() {
        let mut cons = vec![con(100, 200, 0, 1, 1)];

        let journey = scan(&mut cons, 2, 0, 1, 50).unwrap();
        assert_eq!(journey.arrival, 200);
        assert_eq!(journey.legs.len(), 1);
        assert!(matches!(journey.legs[0], JourneyLeg::Ride { trip: TripId(1), .. }));

        // Departing after the only connection has left: no path.
        assert!(scan(&mut cons, 2, 0, 1, 150).is_none());
    }

    #[test]
    fn departure_exactly_at_connection_time_is_usable() {
        let mut cons = vec![con(100, 200, 0, 1, 1)];
        let journey = scan(&mut cons, 2, 0, 1, 100).unwrap();
        assert_eq!(journey.arrival, 200);
    }

    #[test]
    fn start_equals_end_returns_empty_journey() {
        let mut cons = vec![con(100, 200, 0, 1, 1)];
        let journey = scan(&mut cons, 2, 0, 0, 77).unwrap();
        assert!(journey.legs.is_empty());
        assert_eq!(journey.arrival, 77);
    }

    #[test]
    fn single_transfer_needs_transfer_time() {
        // X: A→B arriving 200; Y: B→C departing 350.  200 + 120 ≤ 350: feasible.
        let mut cons = vec![con(100, 200, 0, 1, 1), con(350, 450, 1, 2, 2)];
        let journey = scan(&mut cons, 3, 0, 2, 50).unwrap();
        assert_eq!(journey.arrival, 450);
        assert_eq!(journey.legs.len(), 2);

        // With Y departing at 290, 200 + 120 > 290: the transfer is lost.
        let mut cons = vec![con(100, 200, 0, 1, 1), con(290, 450, 1, 2, 2)];
        assert!(scan(&mut cons, 3, 0, 2, 50).is_none());
    }

    #[test]
    fn on_vehicle_continuation_skips_transfer_time() {
        // Same trip: the 210 departure is reachable from the 200 arrival even
        // though 200 + 120 > 210.
        let mut cons = vec![con(100, 200, 0, 1, 7), con(210, 300, 1, 2, 7)];
        let journey = scan(&mut cons, 3, 0, 2, 50).unwrap();
        assert_eq!(journey.arrival, 300);
        assert_eq!(journey.legs.len(), 2);
        assert!(
            journey
                .legs
                .iter()
                .all(|l| matches!(l, JourneyLeg::Ride { trip: TripId(7), .. }))
        );
    }

    #[test]
    fn footpath_reaches_final_stop() {
        // Ride A→B arriving 200, then walk B→C for 60.
        let mut cons = vec![con(100, 200, 0, 1, 1)];
        sort_for_scan(&mut cons);
        let mut footpaths = vec![Vec::new(); 3];
        footpaths[1] = vec![Footpath { dep_stop: StopId(1), arr_stop: StopId(2), walk_secs: 60 }];

        let journey =
            earliest_arrival(&cons, &footpaths, StopId(0), StopId(2), 50, TRANSFER).unwrap();
        assert_eq!(journey.arrival, 260);
        assert_eq!(
            journey.legs.last().copied().unwrap(),
            JourneyLeg::Foot {
                dep_time: 200,
                arr_time: 260,
                dep_stop: StopId(1),
                arr_stop: StopId(2),
            }
        );
    }

    #[test]
    fn footpath_enables_onward_boarding() {
        // Ride A→B (arr 200), walk B→C (60), then board C→D departing 260.
        // Footpath hand-offs need arrival ≤ departure, not the full transfer
        // overhead.
        let mut cons = vec![con(100, 200, 0, 1, 1), con(260, 400, 2, 3, 2)];
        sort_for_scan(&mut cons);
        let mut footpaths = vec![Vec::new(); 4];
        footpaths[1] = vec![Footpath { dep_stop: StopId(1), arr_stop: StopId(2), walk_secs: 60 }];

        let journey =
            earliest_arrival(&cons, &footpaths, StopId(0), StopId(3), 50, TRANSFER).unwrap();
        assert_eq!(journey.arrival, 400);
        assert_eq!(journey.legs.len(), 3);
    }

    #[test]
    fn footpath_expansion_never_overwrites_an_equal_arrival() {
        // A direct ride reaches C at 260 first; a later-scanned connection
        // into B spawns a walk that would *also* reach C at 260.  The strict
        // `<` improvement test leaves the ride in place.
        let mut cons = vec![con(100, 260, 0, 2, 1), con(110, 200, 0, 1, 2)];
        sort_for_scan(&mut cons);
        let mut footpaths = vec![Vec::new(); 3];
        footpaths[1] = vec![Footpath { dep_stop: StopId(1), arr_stop: StopId(2), walk_secs: 60 }];

        let journey =
            earliest_arrival(&cons, &footpaths, StopId(0), StopId(2), 50, TRANSFER).unwrap();
        assert_eq!(journey.arrival, 260);
        assert!(matches!(journey.legs.last(), Some(JourneyLeg::Ride { .. })));
    }

    #[test]
    fn journeys_are_chronological() {
        let mut cons = vec![
            con(100, 200, 0, 1, 1),
            con(350, 450, 1, 2, 2),
            con(600, 700, 2, 3, 3),
        ];
        let journey = scan(&mut cons, 4, 0, 3, 0).unwrap();
        for pair in journey.legs.windows(2) {
            assert!(pair[1].dep_time() >= pair[0].arr_time());
            assert_eq!(pair[1].dep_stop(), pair[0].arr_stop());
        }
    }

    #[test]
    fn picks_earliest_of_competing_arrivals() {
        // Two ways into B: slow direct and an express leaving later but
        // arriving earlier.
        let mut cons = vec![con(100, 500, 0, 1, 1), con(150, 300, 0, 1, 2)];
        let journey = scan(&mut cons, 2, 0, 1, 0).unwrap();
        assert_eq!(journey.arrival, 300);
    }

    #[test]
    fn scan_matches_the_best_handcrafted_alternative() {
        // Three ways from A(0) to D(3): slow direct, via B(1), via C(2).
        // The via-C itinerary wins with arrival 550.
        let mut cons = vec![
            con(100, 1_000, 0, 3, 1), // direct
            con(120, 200, 0, 1, 2),   // A→B
            con(150, 300, 0, 2, 4),   // A→C
            con(400, 600, 1, 3, 3),   // B→D  (200 + 120 ≤ 400)
            con(430, 550, 2, 3, 5),   // C→D  (300 + 120 ≤ 430)
        ];
        let journey = scan(&mut cons, 4, 0, 3, 0).unwrap();
        assert_eq!(journey.arrival, 550);
        assert_eq!(journey.legs.len(), 2);
        assert!(matches!(journey.legs[0], JourneyLeg::Ride { trip: TripId(4), .. }));
        assert!(matches!(journey.legs[1], JourneyLeg::Ride { trip: TripId(5), .. }));
    }

    #[test]
    fn equal_departure_ties_keep_build_order() {
        // Both trips depart at 100 and improve B identically in sequence;
        // the first one in build order wins the incoming slot.
        let mut cons = vec![con(100, 200, 0, 1, 1), con(100, 200, 0, 1, 2)];
        let journey = scan(&mut cons, 2, 0, 1, 0).unwrap();
        assert!(matches!(journey.legs[0], JourneyLeg::Ride { trip: TripId(1), .. }));
    }
}

// ── Timetable + frequency expansion ───────────────────────────────────────────

/// Two stops ~3 km apart and one metro trip running every 600 s from 08:00 to
/// 09:00, plus an unserved faraway stop.
fn metro_feed() -> GtfsFeed {
    GtfsFeed {
        stops: vec![
            StopRecord { stop_id: "A".into(), stop_lat: -19.920, stop_lon: -43.940 },
            StopRecord { stop_id: "B".into(), stop_lat: -19.947, stop_lon: -43.940 },
            StopRecord { stop_id: "FAR".into(), stop_lat: -19.700, stop_lon: -43.700 },
        ],
        stop_times: vec![
            StopTimeRecord {
                trip_id:        "M1".into(),
                stop_id:        "A".into(),
                stop_sequence:  1,
                arrival_secs:   8 * 3_600,
                departure_secs: 8 * 3_600,
            },
            StopTimeRecord {
                trip_id:        "M1".into(),
                stop_id:        "B".into(),
                stop_sequence:  2,
                arrival_secs:   8 * 3_600 + 300,
                departure_secs: 8 * 3_600 + 330,
            },
        ],
        trips: vec![TripRecord {
            trip_id:    "M1".into(),
            route_id:   "R1".into(),
            service_id: "S".into(),
        }],
        routes: vec![RouteRecord { route_id: "R1".into(), route_type: 1 }],
        frequencies: vec![FrequencyRecord {
            trip_id:      "M1".into(),
            start_secs:   8 * 3_600,
            end_secs:     9 * 3_600,
            headway_secs: 600,
        }],
        calendar: vec![CalendarRecord {
            service_id: "S".into(),
            monday: 1, tuesday: 1, wednesday: 1, thursday: 1, friday: 1,
            saturday: 1, sunday: 1,
            start_date: "20170101".into(),
            end_date:   "20271231".into(),
        }],
        calendar_dates: vec![],
    }
}

#[cfg(test)]
mod timetable_tests {
    use super::*;

    #[test]
    fn frequency_spans_expand_into_starts() {
        let timetable = Timetable::build(&metro_feed(), &SimConfig::default()).unwrap();
        let template = &timetable.templates()[0];

        // 08:00..09:00 every 600 s = 6 vehicles; times re-based to t=0.
        assert_eq!(template.starts.len(), 6);
        assert_eq!(template.starts[0], 8 * 3_600);
        assert_eq!(template.stops[0].departure_secs, 0);
        assert_eq!(template.stops[1].arrival_secs, 300);
    }

    #[test]
    fn connections_cover_every_start() {
        let timetable = Timetable::build(&metro_feed(), &SimConfig::default()).unwrap();
        let valid: FxHashSet<TripId> = [TripId(0)].into_iter().collect();
        let connections = timetable.connections_for_trips(&valid);

        // One stop pair × 6 starts.
        assert_eq!(connections.len(), 6);
        assert!(connections.windows(2).all(|w| w[0].dep_time <= w[1].dep_time));
        assert_eq!(connections[0].dep_time, 8 * 3_600);
        assert_eq!(connections[5].dep_time, 8 * 3_600 + 5 * 600);
    }

    #[test]
    fn footpaths_link_only_nearby_stops() {
        let timetable = Timetable::build(&metro_feed(), &SimConfig::default()).unwrap();
        let a = timetable.stop_id("A").unwrap();
        let far = timetable.stop_id("FAR").unwrap();

        // A↔B are ~3 km apart — over 2000 s on foot, well past the 420 s
        // cutoff, so no stop here gets a footpath.
        assert!(timetable.footpaths()[a.index()].is_empty());
        assert!(timetable.footpaths()[far.index()].is_empty());
    }

    #[test]
    fn closest_stops_orders_by_distance() {
        let timetable = Timetable::build(&metro_feed(), &SimConfig::default()).unwrap();
        let near_a = GeoPoint::new(-19.9201, -43.9401);
        let ranked = timetable.closest_stops(near_a, 3);
        assert_eq!(ranked[0].0, timetable.stop_id("A").unwrap());
        assert_eq!(ranked[1].0, timetable.stop_id("B").unwrap());
        // Walking estimates grow with distance.
        assert!(ranked[0].1 < ranked[1].1);
    }

    #[test]
    fn unknown_stop_is_an_error() {
        let timetable = Timetable::build(&metro_feed(), &SimConfig::default()).unwrap();
        assert!(timetable.stop_id("NOPE").is_err());
    }
}

// ── Planner ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod planner_tests {
    use super::*;

    #[test]
    fn plans_a_ride_between_coordinates() {
        let config = SimConfig::default();
        let timetable = Timetable::build(&metro_feed(), &config).unwrap();
        let router = TransitRouter::all_days(&timetable, &config);

        let origin = GeoPoint::new(-19.9201, -43.9401); // by stop A
        let destination = GeoPoint::new(-19.9469, -43.9401); // by stop B

        let plan = router.plan(origin, destination, 8 * 3_600 - 600, &config).unwrap();

        // Walk, ride A→B, walk.
        assert_eq!(plan.legs.len(), 3);
        assert!(matches!(plan.legs[0], PlanLeg::Walk { .. }));
        match &plan.legs[1] {
            PlanLeg::Ride { board, alight, sched_board, .. } => {
                assert_eq!(*board, timetable.stop_id("A").unwrap());
                assert_eq!(*alight, timetable.stop_id("B").unwrap());
                // First vehicle of the day.
                assert_eq!(*sched_board, 8 * 3_600);
            }
            other => panic!("expected a ride leg, got {other:?}"),
        }
        assert!(matches!(plan.legs[2], PlanLeg::Walk { .. }));
    }

    #[test]
    fn departure_after_last_vehicle_is_time_out_of_day() {
        // One candidate stop per endpoint so the sets cannot overlap and no
        // walk fallback hides the routing failure.
        let config = SimConfig { closest_stops: 1, ..SimConfig::default() };
        let timetable = Timetable::build(&metro_feed(), &config).unwrap();
        let router = TransitRouter::all_days(&timetable, &config);

        let origin = GeoPoint::new(-19.9201, -43.9401);
        let destination = GeoPoint::new(-19.9469, -43.9401);

        match router.plan(origin, destination, 23 * 3_600, &config) {
            Err(crate::error::TransitError::TimeOutOfDay { .. }) => {}
            other => panic!("expected TimeOutOfDay, got {other:?}"),
        }
    }

    #[test]
    fn adjacent_endpoints_fall_back_to_walking() {
        let config = SimConfig::default();
        let timetable = Timetable::build(&metro_feed(), &config).unwrap();
        let router = TransitRouter::all_days(&timetable, &config);

        // Both coordinates sit next to stop A, so the candidate sets overlap
        // and a direct walk beats riding away and back.
        let origin = GeoPoint::new(-19.9200, -43.9400);
        let destination = GeoPoint::new(-19.9202, -43.9401);

        let plan = router.plan(origin, destination, 8 * 3_600, &config).unwrap();
        assert_eq!(plan.legs.len(), 1);
        assert!(matches!(plan.legs[0], PlanLeg::Walk { .. }));
    }

    #[test]
    fn router_for_date_respects_the_calendar() {
        use chrono::NaiveDate;
        use trip_gtfs::ServiceCalendar;

        let config = SimConfig::default();
        let feed = metro_feed();
        let timetable = Timetable::build(&feed, &config).unwrap();
        let calendar = ServiceCalendar::from_feed(&feed).unwrap();

        // Inside the service range the trip operates…
        let running = NaiveDate::from_ymd_opt(2017, 2, 13).unwrap();
        let router = TransitRouter::for_date(&timetable, &calendar, running, &config);
        assert_eq!(router.valid_trips().len(), 1);

        // …before it, nothing does, and planning cannot succeed.
        let dark = NaiveDate::from_ymd_opt(2016, 6, 1).unwrap();
        let router = TransitRouter::for_date(&timetable, &calendar, dark, &config);
        assert!(router.valid_trips().is_empty());
        let origin = GeoPoint::new(-19.9201, -43.9401);
        let destination = GeoPoint::new(-19.9469, -43.9401);
        let config_one = SimConfig { closest_stops: 1, ..SimConfig::default() };
        assert!(router.plan(origin, destination, 8 * 3_600, &config_one).is_err());
    }

    #[test]
    fn consecutive_same_trip_connections_fold_into_one_ride() {
        use crate::csa::Journey;

        let journey = Journey {
            legs: vec![
                JourneyLeg::Ride {
                    dep_time: 100,
                    arr_time: 200,
                    dep_stop: StopId(0),
                    arr_stop: StopId(1),
                    trip:     TripId(3),
                },
                JourneyLeg::Ride {
                    dep_time: 210,
                    arr_time: 300,
                    dep_stop: StopId(1),
                    arr_stop: StopId(2),
                    trip:     TripId(3),
                },
            ],
            arrival: 300,
        };
        let legs = crate::planner::fold_journey(&journey, 60.0, 30.0);
        assert_eq!(legs.len(), 3); // walk, one merged ride, walk
        match &legs[1] {
            PlanLeg::Ride { board, alight, sched_board, sched_alight, .. } => {
                assert_eq!(*board, StopId(0));
                assert_eq!(*alight, StopId(2));
                assert_eq!((*sched_board, *sched_alight), (100, 300));
            }
            other => panic!("expected merged ride, got {other:?}"),
        }
    }
}
