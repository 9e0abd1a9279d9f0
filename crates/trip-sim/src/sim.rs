//! The `Sim` orchestrator and its event-dispatch kernel.
//!
//! # Run shape
//!
//! 1. **Spawn vehicles.**  Every vehicle start of every trip operating today
//!    is queued up front, passengers or not — empty buses still occupy road
//!    edges and shape congestion, and pre-queuing avoids juggling spawn
//!    conditions mid-run.
//! 2. **Plan agents.**  All first trips are planned in parallel (planning
//!    only reads immutable state), then queued at their departure times.
//!    Agents that cannot be planned are dropped with a warning and counted.
//! 3. **Drain the queue.**  Pop the earliest event, dispatch to the owning
//!    driver, push whatever it schedules.  The popped event's time is the
//!    current time; the run ends when the queue empties.
//!
//! # Time units
//!
//! The queue works in [`SimTime`] milliseconds.  Timetable values (whole
//! seconds) convert on the way in; trip-log rows convert back on the way out.

use rayon::prelude::*;
use rustc_hash::FxHashMap;

use trip_core::{AgentId, EdgeId, SimConfig, SimTime, StopId, VehicleId};
use trip_road::{EdgeLocator, EdgePoint, Leg, OccupancyRecord, RoadNetwork, route, route_between_edges};
use trip_transit::{PlanLeg, TransitRouter, TripPlan};

use crate::agent::{Agent, AgentTrip, PlannedStop};
use crate::events::{Action, EventQueue};
use crate::passenger::{ActiveTrip, PassengerState, PickupTable};
use crate::road_vehicle::{self, RoadArrival, RoadKind, RoadVehicle, RoadVehicleId, StepOutcome};
use crate::vehicle::{ScheduledStop, TransitVehicle, VehicleKind};

// ── Run accounting ────────────────────────────────────────────────────────────

/// Counters surfaced in the run summary.
#[derive(Clone, Debug, Default)]
pub struct SimSummary {
    pub vehicles_spawned:        usize,
    pub agents_planned:          usize,
    pub agents_dropped:          usize,
    /// Bus segments that fell back to scheduled times for lack of a road
    /// route.
    pub no_road_route_fallbacks: usize,
    /// Bus arrivals later than schedule by more than the configured margin
    /// (debug runs only).
    pub delayed_bus_arrivals:    usize,
    pub completed_trips:         usize,
    /// Transit stops that could not be snapped onto the transit road
    /// network; buses treat segments touching them as unroutable.
    pub unsnapped_stops:         usize,
}

/// Actual-minus-scheduled arrival for one bus stop visit (debug runs only).
#[derive(Clone, Debug)]
pub struct BusDeviation {
    pub vehicle:        VehicleId,
    pub stop:           StopId,
    pub deviation_secs: f64,
}

/// Everything a run produces.
pub struct SimOutput {
    pub agent_trips: Vec<AgentTrip>,
    /// Private-network occupancy series: edge → [(occupancy, time s)].
    pub road_capacities: FxHashMap<EdgeId, Vec<(u32, u64)>>,
    /// Transit-network occupancy series (buses), same shape.
    pub transit_road_capacities: FxHashMap<EdgeId, Vec<(u32, u64)>>,
    pub summary: SimSummary,
    pub bus_deviations: Vec<BusDeviation>,
}

// ── Internal pieces ───────────────────────────────────────────────────────────

struct TransitRoads {
    net:        RoadNetwork,
    /// Per-stop snapped position on the transit road network.
    stop_edges: Vec<Option<EdgePoint>>,
}

enum PlanOutcome {
    Transit(TripPlan),
    Drive(Vec<Leg>),
}

// ── Sim ───────────────────────────────────────────────────────────────────────

/// The simulation: shared state, drivers, and the event loop.
pub struct Sim<'a> {
    config: &'a SimConfig,
    router: &'a TransitRouter<'a>,

    /// Private-traffic road network; occupancy mutates during the run.
    roads:        RoadNetwork,
    road_locator: EdgeLocator,

    /// Road network buses drive on, when bus coupling is enabled.
    transit_roads: Option<TransitRoads>,

    queue:         EventQueue,
    vehicles:      Vec<TransitVehicle>,
    road_vehicles: Vec<RoadVehicle>,
    passengers:    Vec<PassengerState>,

    /// `pickups[stop][trip]` rendezvous table.
    pickups: PickupTable,

    /// Stop-pair route cache for buses.  Failures are cached too, so a
    /// hopeless pair is not re-searched every headway.
    bus_routes: FxHashMap<(StopId, StopId), Option<Vec<Leg>>>,

    trips_log:  Vec<AgentTrip>,
    summary:    SimSummary,
    deviations: Vec<BusDeviation>,
    debug:      bool,
}

impl<'a> Sim<'a> {
    /// Create a simulation over `router`'s operating day and the given
    /// private road network.
    pub fn new(config: &'a SimConfig, router: &'a TransitRouter<'a>, roads: RoadNetwork) -> Self {
        let road_locator = EdgeLocator::build(&roads);
        let stop_count = router.timetable().stop_count();
        Self {
            config,
            router,
            roads,
            road_locator,
            transit_roads: None,
            queue: EventQueue::new(),
            vehicles: Vec::new(),
            road_vehicles: Vec::new(),
            passengers: Vec::new(),
            pickups: vec![FxHashMap::default(); stop_count],
            bus_routes: FxHashMap::default(),
            trips_log: Vec::new(),
            summary: SimSummary::default(),
            deviations: Vec::new(),
            debug: false,
        }
    }

    /// Attach the road network buses drive on.  Every transit stop is
    /// snapped onto it once; stops that cannot be snapped are counted and
    /// their segments fall back to scheduled times.
    pub fn with_transit_roads(mut self, net: RoadNetwork) -> Self {
        log::info!("snapping transit stops onto the bus road network");
        let locator = EdgeLocator::build(&net);
        let timetable = self.router.timetable();
        let stop_edges: Vec<Option<EdgePoint>> = (0..timetable.stop_count())
            .map(|i| {
                let stop = StopId(i as u32);
                locator
                    .nearest_edge(&net, timetable.stop_coord(stop), self.config.bound_radius)
                    .ok()
            })
            .collect();
        self.summary.unsnapped_stops = stop_edges.iter().filter(|e| e.is_none()).count();
        if self.summary.unsnapped_stops > 0 {
            log::warn!(
                "{} transit stops could not be snapped to the road network",
                self.summary.unsnapped_stops
            );
        }
        self.transit_roads = Some(TransitRoads { net, stop_edges });
        self
    }

    /// Record actual-vs-scheduled bus arrivals and flag large deviations.
    pub fn set_debug(&mut self, on: bool) {
        self.debug = on;
    }

    /// Restrict (or disable) occupancy recording on both networks.
    pub fn configure_occupancy_log(&mut self, enabled: bool, window: Option<(SimTime, SimTime)>) {
        self.roads.configure_log(enabled, window);
        if let Some(tr) = self.transit_roads.as_mut() {
            tr.net.configure_log(enabled, window);
        }
    }

    // ── Run ───────────────────────────────────────────────────────────────

    /// Simulate `agents` over the operating day, draining the event queue.
    pub fn run(&mut self, agents: Vec<Agent>) {
        self.spawn_vehicles();
        self.enqueue_agents(agents);

        log::info!(
            "processing trips: {} vehicles, {} agents",
            self.summary.vehicles_spawned,
            self.summary.agents_planned
        );
        while let Some((time, action)) = self.queue.pop() {
            self.dispatch(action, time);
        }
        log::info!(
            "run complete: {} trips finished, {} road-route fallbacks",
            self.summary.completed_trips,
            self.summary.no_road_route_fallbacks
        );
    }

    /// Consume the simulation and return its collected outputs.
    pub fn into_output(self) -> SimOutput {
        let fold = |records: &[OccupancyRecord]| {
            let mut map: FxHashMap<EdgeId, Vec<(u32, u64)>> = FxHashMap::default();
            for r in records {
                map.entry(r.edge).or_default().push((r.occupancy, r.time.as_secs()));
            }
            map
        };
        SimOutput {
            road_capacities: fold(self.roads.occupancy_log()),
            transit_road_capacities: self
                .transit_roads
                .as_ref()
                .map(|tr| fold(tr.net.occupancy_log()))
                .unwrap_or_default(),
            agent_trips: self.trips_log,
            summary: self.summary,
            bus_deviations: self.deviations,
        }
    }

    /// The run summary so far.
    pub fn summary(&self) -> &SimSummary {
        &self.summary
    }

    /// Private road network (for inspection in tests and analysis).
    pub fn roads(&self) -> &RoadNetwork {
        &self.roads
    }

    // ── Phase 1: vehicles ─────────────────────────────────────────────────

    /// Queue every vehicle start of every trip operating today.  Vehicles
    /// run whether or not anyone boards: they shape road congestion.
    fn spawn_vehicles(&mut self) {
        let timetable = self.router.timetable();
        for template in timetable.templates() {
            if !self.router.valid_trips().contains(&template.trip) {
                continue;
            }
            let as_bus = template.route_type.is_bus() && self.transit_roads.is_some();

            for &start in &template.starts {
                let schedule: Vec<ScheduledStop> = template
                    .stops
                    .iter()
                    .map(|s| ScheduledStop {
                        stop:      s.stop,
                        arrival:   SimTime::from_secs(s.arrival_secs + start),
                        departure: SimTime::from_secs(s.departure_secs + start),
                    })
                    .collect();
                if schedule.is_empty() {
                    continue;
                }
                let first_arrival = schedule[0].arrival;

                let id = VehicleId(self.vehicles.len() as u32);
                let (kind, action) = if as_bus {
                    let rv = RoadVehicleId(self.road_vehicles.len() as u32);
                    self.road_vehicles
                        .push(RoadVehicle::new(rv, RoadArrival::Bus(id), RoadKind::Transit));
                    (VehicleKind::Bus { road_vehicle: rv }, Action::BusArrive(id))
                } else {
                    (VehicleKind::Scheduled, Action::TransitAdvance(id))
                };

                self.vehicles
                    .push(TransitVehicle::new(id, template.trip, kind, schedule));
                self.queue.push(first_arrival, action);
                self.summary.vehicles_spawned += 1;
            }
        }
    }

    // ── Phase 2: agents ───────────────────────────────────────────────────

    fn enqueue_agents(&mut self, agents: Vec<Agent>) {
        // Planning only reads immutable state; fan it out.
        let planned: Vec<(Agent, Option<PlanOutcome>)> = agents
            .into_par_iter()
            .map(|agent| {
                let outcome = self.plan_first_trip(&agent);
                (agent, outcome)
            })
            .collect();

        for (agent, outcome) in planned {
            let Some(outcome) = outcome else {
                self.summary.agents_dropped += 1;
                continue;
            };
            let id = AgentId(self.passengers.len() as u32);
            let mut stops = agent.stops;
            let first = stops.remove(0);
            let depart = SimTime::from_secs(first.dep_secs);

            let mut state = PassengerState::new(id, agent.external_id, agent.public, stops);
            state.active = Some(ActiveTrip { stop: first, depart });

            match outcome {
                PlanOutcome::Transit(plan) => {
                    state.plan = plan.legs.into();
                    self.queue.push(depart, Action::PassengerStep(id));
                }
                PlanOutcome::Drive(legs) => {
                    let rv = RoadVehicleId(self.road_vehicles.len() as u32);
                    let mut vehicle =
                        RoadVehicle::new(rv, RoadArrival::Agent(id), RoadKind::Private);
                    vehicle.reset_route(legs);
                    self.road_vehicles.push(vehicle);
                    state.road_vehicle = Some(rv);
                    self.queue.push(depart, Action::RoadStep(rv));
                }
            }
            self.passengers.push(state);
            self.summary.agents_planned += 1;
        }
        if self.summary.agents_dropped > 0 {
            log::warn!("dropped {} unplannable agents", self.summary.agents_dropped);
        }
    }

    fn plan_first_trip(&self, agent: &Agent) -> Option<PlanOutcome> {
        let stop = agent.stops.first()?;
        self.plan_trip(stop, agent.public, stop.dep_secs, &agent.external_id)
    }

    fn plan_trip(
        &self,
        stop:     &PlannedStop,
        public:   bool,
        dep_secs: u32,
        who:      &str,
    ) -> Option<PlanOutcome> {
        if public {
            match self.router.plan(stop.start, stop.end, dep_secs, self.config) {
                Ok(plan) => Some(PlanOutcome::Transit(plan)),
                Err(e) => {
                    log::warn!("agent {who}: {e}");
                    None
                }
            }
        } else {
            match route(
                &self.roads,
                &self.road_locator,
                stop.start,
                stop.end,
                self.config.bound_radius,
                self.config.speed_factor,
            ) {
                Ok(legs) => Some(PlanOutcome::Drive(legs)),
                Err(e) => {
                    log::warn!("agent {who}: {e}");
                    None
                }
            }
        }
    }

    // ── Kernel ────────────────────────────────────────────────────────────

    fn dispatch(&mut self, action: Action, time: SimTime) {
        match action {
            Action::TransitAdvance(v) => self.transit_advance(v, time),
            Action::BusArrive(v) => self.bus_arrive(v, time),
            Action::RoadStep(rv) => self.road_step(rv, time),
            Action::PassengerStep(a) => self.passenger_step(a, time),
        }
    }

    // ── Transit vehicle driver (schedule-following) ───────────────────────

    fn transit_advance(&mut self, v: VehicleId, time: SimTime) {
        self.board_alight(v, time);

        let vehicle = &self.vehicles[v.index()];
        if let Some(next) = vehicle.next() {
            // Timetable delta from the stop just reached to the next one.
            let delta_ms = next.arrival.since(vehicle.current().departure);
            self.queue.push(time + delta_ms, Action::TransitAdvance(v));
        }
        // No next stop: the vehicle terminates by scheduling nothing.
    }

    /// Shared arrival bookkeeping: advance to the stop, board waiting
    /// riders, and wake the ones alighting here.
    fn board_alight(&mut self, v: VehicleId, time: SimTime) {
        let vehicle = &mut self.vehicles[v.index()];
        vehicle.stop_idx += 1;
        let stop = vehicle.current().stop;

        // Board: drain everyone waiting at this stop for this trip.
        if let Some(bucket) = self.pickups[stop.index()].remove(&vehicle.trip) {
            log::debug!("vehicle {v}: boarding {} riders at {stop} ({time})", bucket.len());
            for (alight_stop, agent) in bucket {
                vehicle.passengers.entry(alight_stop).or_default().push(agent);
            }
        }

        // Alight: resume riders whose destination this is.  Scheduling at
        // the current time keeps invocation-time semantics; FIFO ordering
        // runs them after this handler returns.
        if let Some(riders) = vehicle.passengers.remove(&stop) {
            log::debug!("vehicle {v}: dropping {} riders at {stop} ({time})", riders.len());
            for agent in riders {
                self.queue.push(time, Action::PassengerStep(agent));
            }
        }
    }

    // ── Bus driver (hybrid) ───────────────────────────────────────────────

    fn bus_arrive(&mut self, v: VehicleId, time: SimTime) {
        self.board_alight(v, time);

        let vehicle = &self.vehicles[v.index()];
        let current = *vehicle.current();
        let next = vehicle.next().copied();
        let kind = vehicle.kind;

        if self.debug {
            let deviation_secs =
                time.as_secs_f64() - current.arrival.as_secs_f64();
            if deviation_secs > self.config.acceptable_delay_margin {
                self.summary.delayed_bus_arrivals += 1;
                log::debug!(
                    "vehicle {v}: {deviation_secs:.0}s behind schedule at {}",
                    current.stop
                );
            }
            self.deviations.push(BusDeviation {
                vehicle:        v,
                stop:           current.stop,
                deviation_secs,
            });
        }

        let Some(next) = next else {
            return; // trip complete
        };
        let VehicleKind::Bus { road_vehicle } = kind else {
            debug_assert!(false, "bus arrival dispatched to a scheduled vehicle");
            return;
        };

        let dwell_ms = current.departure.since(current.arrival);

        match self.bus_route(current.stop, next.stop) {
            Some(legs) => {
                self.road_vehicles[road_vehicle.index()].reset_route(legs);
                self.queue.push(time + dwell_ms, Action::RoadStep(road_vehicle));
            }
            None => {
                // Leave the road network for this segment: advance on the
                // scheduled travel time, contributing nothing to congestion.
                self.summary.no_road_route_fallbacks += 1;
                let delta_ms = dwell_ms + next.arrival.since(current.departure);
                self.queue.push(time + delta_ms, Action::BusArrive(v));
            }
        }
    }

    /// Stop-pair road route for buses, cached (including failures — the
    /// endpoints derive deterministically from stop positions).
    fn bus_route(&mut self, from: StopId, to: StopId) -> Option<Vec<Leg>> {
        if let Some(cached) = self.bus_routes.get(&(from, to)) {
            return cached.clone();
        }
        let computed = self.transit_roads.as_ref().and_then(|tr| {
            let start = tr.stop_edges[from.index()]?;
            let end = tr.stop_edges[to.index()]?;
            route_between_edges(&tr.net, start, end, self.config.speed_factor).ok()
        });
        if computed.is_none() {
            log::warn!("no road route between stops {from} and {to}; falling back to schedule");
        }
        self.bus_routes.insert((from, to), computed.clone());
        computed
    }

    // ── Road vehicle driver ───────────────────────────────────────────────

    fn road_step(&mut self, rv: RoadVehicleId, time: SimTime) {
        let vehicle = &mut self.road_vehicles[rv.index()];
        let on_arrive = vehicle.on_arrive;

        let outcome = match vehicle.kind {
            RoadKind::Private => {
                road_vehicle::step(vehicle, &mut self.roads, time, self.config.speed_factor)
            }
            RoadKind::Transit => {
                let Some(tr) = self.transit_roads.as_mut() else {
                    debug_assert!(false, "transit road vehicle without a transit network");
                    return;
                };
                road_vehicle::step(vehicle, &mut tr.net, time, self.config.speed_factor)
            }
        };

        match outcome {
            StepOutcome::Continue { delay_ms } => {
                self.queue.push(time + delay_ms, Action::RoadStep(rv));
            }
            StepOutcome::Arrived => match on_arrive {
                RoadArrival::Agent(agent) => self.agent_arrived(agent, time),
                RoadArrival::Bus(v) => self.bus_arrive(v, time),
            },
        }
    }

    // ── Passenger driver ──────────────────────────────────────────────────

    fn passenger_step(&mut self, agent: AgentId, time: SimTime) {
        let passenger = &mut self.passengers[agent.index()];
        match passenger.plan.pop_front() {
            None => self.agent_arrived(agent, time),

            Some(PlanLeg::Walk { secs }) => {
                let walk_ms = (secs * 1_000.0).round() as u64;
                self.queue.push(time + walk_ms, Action::PassengerStep(agent));
            }

            Some(PlanLeg::Transfer { secs, .. }) => {
                self.queue
                    .push(time + secs as u64 * 1_000, Action::PassengerStep(agent));
            }

            Some(PlanLeg::Ride { trip, board, alight, .. }) => {
                // Wait at the stop; the next vehicle of `trip` that reaches
                // `board` wakes us.  If the last one already passed, we stay
                // queued — re-planning is the caller's affair.
                self.pickups[board.index()]
                    .entry(trip)
                    .or_default()
                    .push((alight, agent));
            }
        }
    }

    /// An agent finished its current trip (stepped off the road or emptied
    /// its plan): log the trace and start the next stop of its day, if any.
    fn agent_arrived(&mut self, agent: AgentId, time: SimTime) {
        let passenger = &mut self.passengers[agent.index()];

        if let Some(active) = passenger.active.take() {
            self.trips_log.push(AgentTrip {
                agent:     passenger.external_id.clone(),
                start:     active.stop.start,
                end:       active.stop.end,
                stop_type: active.stop.stop_type,
                depart:    active.depart,
                arrive:    time,
            });
            self.summary.completed_trips += 1;
        }

        let Some(stop) = passenger.remaining_stops.pop_front() else {
            return; // day complete; the agent's state simply goes quiet
        };

        // Later trips leave at their scheduled departure, or immediately if
        // the previous trip overran it.
        let dep = SimTime::from_secs(stop.dep_secs).max(time);
        let public = passenger.public;
        let external = passenger.external_id.clone();

        match self.plan_trip(&stop, public, dep.as_secs() as u32, &external) {
            None => {
                self.summary.agents_dropped += 1;
            }
            Some(PlanOutcome::Transit(plan)) => {
                let passenger = &mut self.passengers[agent.index()];
                passenger.plan = plan.legs.into();
                passenger.active = Some(ActiveTrip { stop, depart: dep });
                self.queue.push(dep, Action::PassengerStep(agent));
            }
            Some(PlanOutcome::Drive(legs)) => {
                let rv = match self.passengers[agent.index()].road_vehicle {
                    Some(rv) => rv,
                    None => {
                        let rv = RoadVehicleId(self.road_vehicles.len() as u32);
                        self.road_vehicles.push(RoadVehicle::new(
                            rv,
                            RoadArrival::Agent(agent),
                            RoadKind::Private,
                        ));
                        rv
                    }
                };
                self.road_vehicles[rv.index()].reset_route(legs);
                let passenger = &mut self.passengers[agent.index()];
                passenger.road_vehicle = Some(rv);
                passenger.active = Some(ActiveTrip { stop, depart: dep });
                self.queue.push(dep, Action::RoadStep(rv));
            }
        }
    }
}
