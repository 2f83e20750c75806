use std::collections::HashMap;

use crate::config::NetworkConfig;
use crate::control_system::intersection_controller::IntersectionController;
use crate::control_system::pressure_coordinator::PressureCoordinator;
use crate::error::{Result, SignalError};
use crate::shared_data::{ControllerSnapshot, IntersectionId};
use crate::simulation_engine::adapter::{SimulationAdapter, SimulationStep};

/// Owns every intersection controller, in the fixed order they are stepped.
#[derive(Default)]
pub struct ControllerRegistry {
    controllers: Vec<IntersectionController>,
    index: HashMap<IntersectionId, usize>,
}

impl ControllerRegistry {
    /// Adds a controller, replacing any earlier one with the same id in place.
    pub fn insert(&mut self, controller: IntersectionController) {
        match self.index.get(controller.id()) {
            Some(&slot) => self.controllers[slot] = controller,
            None => {
                self.index
                    .insert(controller.id().clone(), self.controllers.len());
                self.controllers.push(controller);
            }
        }
    }

    pub fn get(&self, id: &IntersectionId) -> Option<&IntersectionController> {
        self.index.get(id).map(|&slot| &self.controllers[slot])
    }

    pub fn get_mut(&mut self, id: &IntersectionId) -> Option<&mut IntersectionController> {
        match self.index.get(id) {
            Some(&slot) => self.controllers.get_mut(slot),
            None => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &IntersectionController> {
        self.controllers.iter()
    }

    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    /// Controllers that resolved at least one green group.
    pub fn valid_count(&self) -> usize {
        self.controllers.iter().filter(|c| !c.is_inert()).count()
    }

    // Steps every controller once, in registration order. Returns how many changed phase.
    pub fn update_all(&mut self, tick: u64, adapter: &mut dyn SimulationAdapter) -> usize {
        let mut transitions = 0;
        for controller in self.controllers.iter_mut() {
            if controller.step(tick, adapter).is_some() {
                transitions += 1;
            }
        }
        transitions
    }
}

/// The whole control system for one simulated network: the controller
/// registry plus the coordinator that biases it.
pub struct SignalNetwork {
    registry: ControllerRegistry,
    coordinator: PressureCoordinator,
    progress_interval: u64,
}

impl SignalNetwork {
    /// Builds a controller for every configured intersection. Fails only when
    /// the configuration is invalid or no controller resolved a green group.
    pub fn initialize(config: &NetworkConfig, adapter: &mut dyn SimulationAdapter) -> Result<Self> {
        config.validate()?;

        let mut registry = ControllerRegistry::default();
        for intersection in &config.intersections {
            let controller = IntersectionController::new(
                intersection,
                &config.timing,
                config.mode,
                config.demand_signal,
                adapter,
            );
            registry.insert(controller);
        }

        let valid = registry.valid_count();
        if valid == 0 {
            log::error!(
                "None of the {} configured intersections has a usable phase program",
                config.intersections.len()
            );
            return Err(SignalError::NoValidControllers);
        }

        for group in &config.coordinator.groups {
            for member in &group.members {
                if registry.get(member).is_none() {
                    log::warn!("Arterial group {} lists {} which is not configured", group.name, member);
                }
            }
        }

        log::info!(
            "Signal network started with {} controllers ({} valid, mode {:?})",
            registry.len(),
            valid,
            config.mode
        );

        Ok(Self {
            registry,
            coordinator: PressureCoordinator::new(&config.coordinator),
            progress_interval: config.progress_interval.max(1),
        })
    }

    /// One control tick: every controller in order, then the coordinator on its cadence.
    pub fn step(&mut self, tick: u64, adapter: &mut dyn SimulationAdapter) -> usize {
        let transitions = self.registry.update_all(tick, adapter);
        self.coordinator.step(tick, &mut self.registry);
        if tick % self.progress_interval == 0 {
            for controller in self.registry.iter().filter(|c| !c.is_inert()) {
                controller.log_progress(tick);
            }
        }
        transitions
    }

    /// Synchronous driver: advance the engine, then step the network, `ticks` times.
    pub fn run<S>(&mut self, simulation: &mut S, ticks: u64) -> usize
    where
        S: SimulationAdapter + SimulationStep,
    {
        let mut transitions = 0;
        for _ in 0..ticks {
            let tick = simulation.advance();
            transitions += self.step(tick, simulation);
        }
        transitions
    }

    pub fn registry(&self) -> &ControllerRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ControllerRegistry {
        &mut self.registry
    }

    pub fn coordinator(&self) -> &PressureCoordinator {
        &self.coordinator
    }

    pub fn controller(&self, id: &IntersectionId) -> Option<&IntersectionController> {
        self.registry.get(id)
    }

    pub fn snapshot(&self) -> Vec<ControllerSnapshot> {
        self.registry.iter().map(|c| c.snapshot()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IntersectionConfig;
    use crate::simulation_engine::simulation::GridSimulation;

    #[test]
    fn default_grid_starts_every_controller() {
        let mut simulation = GridSimulation::new(11);
        let network = SignalNetwork::initialize(&NetworkConfig::default(), &mut simulation).unwrap();
        assert_eq!(network.registry().len(), 12);
        assert_eq!(network.registry().valid_count(), 12);
        assert!(network.registry().iter().all(|c| c.is_alternating()));
    }

    #[test]
    fn no_valid_controllers_is_fatal() {
        let mut simulation = GridSimulation::empty(11);
        let mut config = NetworkConfig::default();
        config.intersections = vec![IntersectionConfig::new("Ghost")];
        assert!(matches!(
            SignalNetwork::initialize(&config, &mut simulation),
            Err(SignalError::NoValidControllers)
        ));
    }

    #[test]
    fn invalid_controllers_do_not_stop_the_rest() {
        let mut simulation = GridSimulation::new(11);
        let mut config = NetworkConfig::default();
        config.intersections.push(IntersectionConfig::new("Ghost"));
        let mut network = SignalNetwork::initialize(&config, &mut simulation).unwrap();
        assert_eq!(network.registry().len(), 13);
        assert_eq!(network.registry().valid_count(), 12);
        assert!(network.run(&mut simulation, 200) > 0);
    }

    #[test]
    fn registry_keeps_insertion_order_and_replaces_duplicates() {
        let mut simulation = GridSimulation::new(11);
        let config = NetworkConfig::default();
        let mut registry = ControllerRegistry::default();
        for intersection in config.intersections.iter().take(3) {
            registry.insert(IntersectionController::new(
                intersection,
                &config.timing,
                config.mode,
                config.demand_signal,
                &mut simulation,
            ));
        }
        registry.insert(IntersectionController::new(
            &config.intersections[1],
            &config.timing,
            config.mode,
            config.demand_signal,
            &mut simulation,
        ));
        let ids: Vec<&str> = registry.iter().map(|c| c.id().as_str()).collect();
        assert_eq!(ids, vec!["A1", "A2", "B0"]);
    }
}
