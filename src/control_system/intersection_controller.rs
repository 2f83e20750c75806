use crate::config::{ControlMode, DemandSignal, IntersectionConfig, SignalTiming};
use crate::control_system::phase_topology::{PhaseRole, PhaseTopology};
use crate::control_system::signal_policy::{clamp_priority, select_policy, DemandContext, SignalPolicy};
use crate::error::SignalError;
use crate::shared_data::{
    Approach, ControllerSnapshot, GroupSlot, IntersectionId, QueueSnapshot,
};
use crate::simulation_engine::adapter::SimulationAdapter;
use std::collections::BTreeMap;

/// Where an intersection is in its signal cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalState {
    Green(GroupSlot),
    Yellow(GroupSlot),
    AllRed(GroupSlot),
    /// The engine shows a phase outside the resolved cycle.
    Unmanaged(usize),
    /// No green group could be resolved; the controller never issues commands.
    Inert,
}

/// Mutable per-tick state of one intersection.
#[derive(Debug, Clone, PartialEq)]
pub struct IntersectionState {
    pub signal: SignalState,
    pub current_phase: usize,
    pub elapsed_ticks: u32,
    pub active_group: GroupSlot,
    pub queues: QueueSnapshot,
    pub priority_factor: f64,
}

/// A phase change accepted by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from_phase: usize,
    pub to_phase: usize,
    pub state: SignalState,
}

pub struct IntersectionController {
    id: IntersectionId,
    detectors: BTreeMap<Approach, String>,
    corridor_adjustment: f64,
    timing: SignalTiming,
    demand_signal: DemandSignal,
    topology: PhaseTopology,
    policy: Box<dyn SignalPolicy>,
    state: IntersectionState,
}

impl IntersectionController {
    /// Resolves the intersection's phase program and snaps the engine to the
    /// first group's green. An unresolvable intersection yields an inert
    /// controller rather than an error.
    pub fn new(
        config: &IntersectionConfig,
        timing: &SignalTiming,
        mode: ControlMode,
        demand_signal: DemandSignal,
        adapter: &mut dyn SimulationAdapter,
    ) -> Self {
        let topology = PhaseTopology::resolve(adapter, &config.id, timing);
        let policy = select_policy(mode, topology.is_alternating());

        let mut controller = Self {
            id: config.id.clone(),
            detectors: config.detectors.clone(),
            corridor_adjustment: config.corridor_adjustment,
            timing: timing.clone(),
            demand_signal,
            topology,
            policy,
            state: IntersectionState {
                signal: SignalState::Inert,
                current_phase: 0,
                elapsed_ticks: 0,
                active_group: GroupSlot::First,
                queues: QueueSnapshot::default(),
                priority_factor: 0.0,
            },
        };

        let first_green = match controller.topology.group(GroupSlot::First) {
            Some(group) => group.green,
            None => {
                match &controller.topology.failure {
                    Some(failure) => log::warn!("Intersection {} is inert: {}", controller.id, failure),
                    None => log::warn!(
                        "Intersection {} is inert: no green phase found in its program",
                        controller.id
                    ),
                }
                return controller;
            }
        };

        for &green in &controller.topology.unpaired_greens {
            let err = SignalError::ResolutionFailure {
                intersection: controller.id.clone(),
                reason: format!("green phase {} has no yellow clearing its links", green),
            };
            log::warn!("{}; intersection will not alternate", err);
        }

        let reported = match adapter.current_phase_index(&controller.id) {
            Ok(phase) => phase,
            Err(e) => {
                log::warn!("Intersection {}: current phase unreadable: {}", controller.id, e);
                first_green
            }
        };
        controller.state.current_phase = reported;
        controller.state.signal = SignalState::Unmanaged(reported);

        if reported == first_green {
            controller.state.signal = SignalState::Green(GroupSlot::First);
        } else {
            match adapter.set_phase_index(&controller.id, first_green) {
                Ok(()) => {
                    controller.state.current_phase = first_green;
                    controller.state.signal = SignalState::Green(GroupSlot::First);
                }
                Err(source) => {
                    let err = SignalError::TransitionRejected {
                        intersection: controller.id.clone(),
                        phase: first_green,
                        source,
                    };
                    log::warn!("Startup snap failed, waiting for recovery: {}", err);
                }
            }
        }

        log::info!(
            "Controller ready for {}: greens={:?} alternating={} policy={}",
            controller.id,
            controller
                .topology
                .groups
                .iter()
                .map(|g| g.green)
                .collect::<Vec<_>>(),
            controller.is_alternating(),
            controller.policy.name()
        );
        controller
    }

    /// Advances the controller by one tick. Issues at most one phase command
    /// and returns the transition if the engine accepted it.
    pub fn step(&mut self, tick: u64, adapter: &mut dyn SimulationAdapter) -> Option<Transition> {
        if self.is_inert() {
            return None;
        }

        self.state.elapsed_ticks = self.state.elapsed_ticks.saturating_add(1);

        if tick % self.timing.sample_interval == 0 {
            self.sample_queues(adapter);
        }

        let (phase, next) = self.next_command()?;
        self.command(adapter, phase, next)
    }

    /// Overwrites the queue snapshot from the detector lanes. Unreadable lanes count as zero.
    pub fn sample_queues(&mut self, adapter: &dyn SimulationAdapter) {
        let mut queues = QueueSnapshot::default();
        for (&approach, lane) in &self.detectors {
            let reading = match self.demand_signal {
                DemandSignal::HaltingCount => adapter.halting_count(lane).map(f64::from),
                DemandSignal::WaitingTime => adapter.waiting_time(lane),
            };
            match reading {
                Ok(value) => queues.set(approach, value),
                Err(source) => {
                    let err = SignalError::SensorReadFailure {
                        lane: lane.clone(),
                        source,
                    };
                    log::debug!("{}: {}", self.id, err);
                }
            }
        }
        self.state.queues = queues;
    }

    fn next_command(&self) -> Option<(usize, SignalState)> {
        match self.state.signal {
            SignalState::Green(slot) => {
                if !self.green_should_end() {
                    return None;
                }
                // A green without a yellow is never left: it is the only group.
                let yellow = self.topology.group(slot)?.yellow?;
                Some((yellow, SignalState::Yellow(slot)))
            }
            SignalState::Yellow(slot) => {
                if self.state.elapsed_ticks < self.timing.yellow_duration {
                    return None;
                }
                match self.topology.group(slot)?.all_red {
                    Some(all_red) => Some((all_red, SignalState::AllRed(slot))),
                    None => self.next_green(slot),
                }
            }
            SignalState::AllRed(slot) => {
                if self.state.elapsed_ticks < self.timing.all_red_duration {
                    return None;
                }
                self.next_green(slot)
            }
            SignalState::Unmanaged(phase) => {
                let nominal = self
                    .topology
                    .program
                    .get(phase)
                    .map(|p| p.duration)
                    .unwrap_or(0.0);
                let grace = self.timing.unmanaged_grace as f64;
                if (self.state.elapsed_ticks as f64) <= nominal + grace {
                    return None;
                }
                let slot = self.state.active_group;
                let group = self.topology.group(slot)?;
                Some((group.green, SignalState::Green(slot)))
            }
            SignalState::Inert => None,
        }
    }

    fn next_green(&self, slot: GroupSlot) -> Option<(usize, SignalState)> {
        let next = if self.is_alternating() {
            slot.flipped()
        } else {
            slot
        };
        let group = self.topology.group(next)?;
        Some((group.green, SignalState::Green(next)))
    }

    fn green_should_end(&self) -> bool {
        if self.state.elapsed_ticks < self.timing.min_green {
            return false;
        }
        let ctx = self.demand_context();
        let target = self.policy.green_target(&self.timing, &ctx);
        if self.state.elapsed_ticks as f64 >= target {
            return true;
        }
        if self.policy.starvation_override(&self.timing, &ctx) {
            log::info!(
                "{}: conflicting demand {} preempts green (active {})",
                self.id,
                ctx.demand_conflict,
                ctx.demand_active
            );
            return true;
        }
        if ctx.demand_active > 0.0 {
            log::debug!("{}: holding green, demand {} target {:.1}", self.id, ctx.demand_active, target);
        }
        false
    }

    fn command(
        &mut self,
        adapter: &mut dyn SimulationAdapter,
        phase: usize,
        next: SignalState,
    ) -> Option<Transition> {
        match adapter.set_phase_index(&self.id, phase) {
            Ok(()) => {
                let transition = Transition {
                    from_phase: self.state.current_phase,
                    to_phase: phase,
                    state: next,
                };
                if let SignalState::Green(slot) = next {
                    self.state.active_group = slot;
                }
                self.state.signal = next;
                self.state.current_phase = phase;
                self.state.elapsed_ticks = 0;
                log::info!(
                    "{}: phase {} -> {} ({:?})",
                    self.id,
                    transition.from_phase,
                    phase,
                    next
                );
                Some(transition)
            }
            Err(source) => {
                let err = SignalError::TransitionRejected {
                    intersection: self.id.clone(),
                    phase,
                    source,
                };
                log::warn!("{}", err);
                None
            }
        }
    }

    fn demand_context(&self) -> DemandContext {
        DemandContext {
            elapsed_ticks: self.state.elapsed_ticks,
            demand_active: self.demand_active(),
            demand_conflict: self.demand_conflict(),
            priority_factor: self.state.priority_factor,
            corridor_adjustment: self.corridor_adjustment,
        }
    }

    /// Demand on the movement that currently holds (or last held) right-of-way.
    pub fn demand_active(&self) -> f64 {
        if self.is_inert() {
            return 0.0;
        }
        self.state.queues.sum(self.state.active_group.approaches())
    }

    /// Demand on the other movement; zero unless the intersection alternates.
    pub fn demand_conflict(&self) -> f64 {
        if !self.is_alternating() {
            return 0.0;
        }
        self.state
            .queues
            .sum(self.state.active_group.flipped().approaches())
    }

    /// Pressure reported to the coordinator.
    pub fn pressure_metric(&self) -> f64 {
        self.demand_conflict()
    }

    /// Current green target in ticks, as the policy would compute it now.
    pub fn green_target(&self) -> f64 {
        self.policy.green_target(&self.timing, &self.demand_context())
    }

    pub fn set_priority_factor(&mut self, factor: f64) {
        self.state.priority_factor = clamp_priority(factor);
    }

    pub fn priority_factor(&self) -> f64 {
        self.state.priority_factor
    }

    pub fn id(&self) -> &IntersectionId {
        &self.id
    }

    pub fn signal_state(&self) -> SignalState {
        self.state.signal
    }

    pub fn elapsed_ticks(&self) -> u32 {
        self.state.elapsed_ticks
    }

    pub fn current_phase(&self) -> usize {
        self.state.current_phase
    }

    pub fn active_group(&self) -> GroupSlot {
        self.state.active_group
    }

    pub fn queues(&self) -> &QueueSnapshot {
        &self.state.queues
    }

    pub fn topology(&self) -> &PhaseTopology {
        &self.topology
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    pub fn is_alternating(&self) -> bool {
        self.topology.is_alternating()
    }

    pub fn is_inert(&self) -> bool {
        !self.topology.is_valid()
    }

    /// Role the engine's current phase plays in the resolved cycle.
    pub fn current_role(&self) -> Option<PhaseRole> {
        self.topology.role_of(self.state.current_phase)
    }

    pub fn snapshot(&self) -> ControllerSnapshot {
        ControllerSnapshot {
            intersection_id: self.id.clone(),
            phase: self.state.current_phase,
            elapsed_ticks: self.state.elapsed_ticks,
            queues: self.state.queues,
            priority_factor: self.state.priority_factor,
            alternating: self.is_alternating(),
            inert: self.is_inert(),
        }
    }

    pub fn log_progress(&self, tick: u64) {
        let q = &self.state.queues;
        log::info!(
            "TLS:{} @{} phase:{} elapsed:{} queues:[N:{} S:{} E:{} W:{}] priority:{:.2}",
            self.id,
            tick,
            self.state.current_phase,
            self.state.elapsed_ticks,
            q.north,
            q.south,
            q.east,
            q.west,
            self.state.priority_factor
        );
    }
}
