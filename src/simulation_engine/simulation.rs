// simulation.rs
use crate::control_system::traffic_light_controller::SignalNetwork;
use crate::error::AdapterError;
use crate::shared_data::{Approach, IntersectionId, PhaseProgram};
use crate::simulation_engine::adapter::{SimulationAdapter, SimulationStep};
use crate::simulation_engine::intersections::{grid_intersections, standard_program, Intersection};
use crate::simulation_engine::lanes::{link_index, ApproachLane};

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use tokio::time::{interval, Duration};

/// A phase command accepted by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseCommand {
    pub tick: u64,
    pub intersection: IntersectionId,
    pub phase: usize,
}

/// In-process stand-in for the traffic simulator: signal heads with phase
/// programs and one queued approach lane per detector.
///
/// Vehicles arrive at random on each lane and leave one per tick while their
/// link shows green. Nothing else about vehicle movement is modelled.
pub struct GridSimulation {
    intersections: BTreeMap<IntersectionId, Intersection>,
    lanes: BTreeMap<String, ApproachLane>,
    rng: SmallRng,
    tick: u64,
    commands: Vec<PhaseCommand>,
}

impl GridSimulation {
    /// Simulation without intersections or traffic.
    pub fn empty(seed: u64) -> Self {
        Self {
            intersections: BTreeMap::new(),
            lanes: BTreeMap::new(),
            rng: SmallRng::seed_from_u64(seed),
            tick: 0,
            commands: Vec::new(),
        }
    }

    /// The built-in grid, every intersection running the standard program,
    /// with a random arrival rate per approach lane.
    pub fn new(seed: u64) -> Self {
        let mut simulation = Self::empty(seed);
        for layout in grid_intersections() {
            let id = IntersectionId::from(layout.id);
            simulation.add_intersection(id.clone(), standard_program(31.0, 3.0, Some(2.0)));
            for &approach in layout.approaches {
                let rate = simulation.rng.random_range(0.05..0.30);
                simulation.add_lane(&id, approach, rate);
            }
        }
        simulation
    }

    pub fn add_intersection(&mut self, id: IntersectionId, program: PhaseProgram) {
        self.intersections
            .insert(id.clone(), Intersection::new(id, program));
    }

    pub fn add_lane(&mut self, intersection: &IntersectionId, approach: Approach, arrival_rate: f64) {
        let lane = ApproachLane::new(intersection, approach, arrival_rate);
        self.lanes.insert(lane.id.clone(), lane);
    }

    pub fn remove_lane(&mut self, lane: &str) -> Option<ApproachLane> {
        self.lanes.remove(lane)
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Phase commands accepted so far, oldest first.
    pub fn commands(&self) -> &[PhaseCommand] {
        &self.commands
    }

    /// Overwrites a lane's queue. Returns false if the lane does not exist.
    pub fn set_queue(&mut self, lane: &str, halting: u32) -> bool {
        match self.lanes.get_mut(lane) {
            Some(l) => {
                l.set_queue(halting, 0.0);
                true
            }
            None => false,
        }
    }

    pub fn set_waiting_time(&mut self, lane: &str, seconds: f64) -> bool {
        match self.lanes.get_mut(lane) {
            Some(l) => {
                l.waiting_time = seconds;
                true
            }
            None => false,
        }
    }

    pub fn set_accepts_commands(&mut self, intersection: &IntersectionId, accepts: bool) {
        if let Some(i) = self.intersections.get_mut(intersection) {
            i.accepts_commands = accepts;
        }
    }

    /// Moves a signal head without going through the command path, as an
    /// engine running its own program would.
    pub fn force_phase(&mut self, intersection: &IntersectionId, phase: usize) {
        if let Some(i) = self.intersections.get_mut(intersection) {
            if phase < i.program.len() {
                i.current_phase = phase;
            }
        }
    }

    pub fn phase_of(&self, intersection: &IntersectionId) -> Option<usize> {
        self.intersections.get(intersection).map(|i| i.current_phase)
    }

    pub fn total_halting(&self) -> u64 {
        self.lanes.values().map(|l| l.halting as u64).sum()
    }

    pub fn total_discharged(&self) -> u64 {
        self.lanes.values().map(|l| l.discharged).sum()
    }

    pub fn total_waiting_time(&self) -> f64 {
        self.lanes.values().map(|l| l.waiting_time).sum()
    }
}

impl SimulationStep for GridSimulation {
    fn advance(&mut self) -> u64 {
        self.tick += 1;
        for lane in self.lanes.values_mut() {
            let green = self
                .intersections
                .get(&lane.intersection)
                .map(|i| i.is_link_green(link_index(lane.approach)))
                .unwrap_or(false);
            if green {
                lane.discharge();
            }
            lane.accumulate_wait();
            if lane.arrival_rate > 0.0 && self.rng.random_bool(lane.arrival_rate.min(1.0)) {
                lane.add_vehicle();
            }
        }
        self.tick
    }
}

impl SimulationAdapter for GridSimulation {
    fn has_intersection(&self, intersection: &IntersectionId) -> bool {
        self.intersections.contains_key(intersection)
    }

    fn phase_program(&self, intersection: &IntersectionId) -> Result<PhaseProgram, AdapterError> {
        self.intersections
            .get(intersection)
            .map(|i| i.program.clone())
            .ok_or_else(|| AdapterError::UnknownIntersection(intersection.clone()))
    }

    fn current_phase_index(&self, intersection: &IntersectionId) -> Result<usize, AdapterError> {
        self.intersections
            .get(intersection)
            .map(|i| i.current_phase)
            .ok_or_else(|| AdapterError::UnknownIntersection(intersection.clone()))
    }

    fn set_phase_index(
        &mut self,
        intersection: &IntersectionId,
        index: usize,
    ) -> Result<(), AdapterError> {
        let signal = self
            .intersections
            .get_mut(intersection)
            .ok_or_else(|| AdapterError::UnknownIntersection(intersection.clone()))?;
        signal.set_phase(index)?;
        self.commands.push(PhaseCommand {
            tick: self.tick,
            intersection: intersection.clone(),
            phase: index,
        });
        Ok(())
    }

    fn halting_count(&self, lane: &str) -> Result<u32, AdapterError> {
        self.lanes
            .get(lane)
            .map(|l| l.halting)
            .ok_or_else(|| AdapterError::UnknownLane(lane.to_string()))
    }

    fn waiting_time(&self, lane: &str) -> Result<f64, AdapterError> {
        self.lanes
            .get(lane)
            .map(|l| l.waiting_time)
            .ok_or_else(|| AdapterError::UnknownLane(lane.to_string()))
    }
}

/// Outcome of a driven run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub interrupted: bool,
}

/// Drives the control loop: advance the engine, then step the network, for
/// `ticks` ticks or until Ctrl-C. With `pace`, each tick waits for the next
/// interval so the run can be watched in real time.
pub async fn run_simulation<S>(
    network: &mut SignalNetwork,
    simulation: &mut S,
    ticks: u64,
    pace: Option<Duration>,
) -> RunSummary
where
    S: SimulationAdapter + SimulationStep,
{
    let mut pacer = pace.map(interval);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut completed = 0;
    let mut interrupted = false;
    while completed < ticks {
        let stop = match pacer.as_mut() {
            Some(pacer) => tokio::select! {
                biased;
                _ = &mut ctrl_c => true,
                _ = pacer.tick() => false,
            },
            None => tokio::select! {
                biased;
                _ = &mut ctrl_c => true,
                _ = tokio::task::yield_now() => false,
            },
        };
        if stop {
            log::warn!("Simulation interrupted after {} ticks", completed);
            interrupted = true;
            break;
        }

        let tick = simulation.advance();
        network.step(tick, simulation);
        completed += 1;
    }

    RunSummary {
        ticks: completed,
        interrupted,
    }
}
