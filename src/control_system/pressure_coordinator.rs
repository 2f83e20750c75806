use crate::config::{CongestionWatch, CoordinatorConfig};
use crate::control_system::traffic_light_controller::ControllerRegistry;
use crate::error::SignalError;
use crate::shared_data::ArterialGroup;

/// `clamp((a − b) / (a + b), [-1, 1]) × scale`, or 0 when there is no pressure at all.
pub fn pressure_bias(pressure_a: f64, pressure_b: f64, bias_scale: f64) -> f64 {
    let total = pressure_a + pressure_b;
    if !(total > 0.0) {
        return 0.0;
    }
    ((pressure_a - pressure_b) / total).clamp(-1.0, 1.0) * bias_scale
}

/// Pressures and bias computed in one coordination cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinationOutcome {
    pub pressures: Vec<(String, f64)>,
    pub bias: f64,
    pub congestion_boost: bool,
    /// Groups whose pressure could not be aggregated and counted as zero.
    pub failed_groups: Vec<String>,
}

/// Biases two competing arterial groups against each other.
///
/// The coordinator only writes priority factors. Phase commands stay with the
/// intersection controllers, so whatever it computes cannot cause an unsafe
/// signal transition.
#[derive(Debug)]
pub struct PressureCoordinator {
    groups: Vec<ArterialGroup>,
    interval: u64,
    bias_scale: f64,
    watch: Option<CongestionWatch>,
    congestion_counter: u32,
    last_outcome: Option<CoordinationOutcome>,
}

impl PressureCoordinator {
    pub fn new(config: &CoordinatorConfig) -> Self {
        Self {
            groups: config.groups.clone(),
            interval: config.interval.max(1),
            bias_scale: config.bias_scale,
            watch: config.congestion_watch.clone(),
            congestion_counter: 0,
            last_outcome: None,
        }
    }

    pub fn groups(&self) -> &[ArterialGroup] {
        &self.groups
    }

    pub fn congestion_counter(&self) -> u32 {
        self.congestion_counter
    }

    pub fn last_outcome(&self) -> Option<&CoordinationOutcome> {
        self.last_outcome.as_ref()
    }

    /// Runs a coordination cycle when `tick` falls on the coordinator's cadence.
    pub fn step(&mut self, tick: u64, registry: &mut ControllerRegistry) -> Option<CoordinationOutcome> {
        if tick % self.interval != 0 {
            return None;
        }
        self.coordinate(registry)
    }

    /// Aggregates group pressures and pushes `+bias` to the first group and
    /// `-bias` to the second. A group whose pressure cannot be aggregated
    /// counts as zero pressure; both groups are still written.
    pub fn coordinate(&mut self, registry: &mut ControllerRegistry) -> Option<CoordinationOutcome> {
        if self.groups.len() != 2 {
            log::warn!("Coordination skipped: {} groups configured, need 2", self.groups.len());
            return None;
        }
        self.update_congestion(registry);
        let boost = self.congestion_persistent();

        let mut pressures = Vec::with_capacity(self.groups.len());
        let mut failed_groups = Vec::new();
        for group in &self.groups {
            match group_pressure(group, registry) {
                Ok(pressure) => {
                    let boosted = match &self.watch {
                        Some(watch) if boost && watch.boosted_group == group.name => {
                            log::warn!(
                                "Persistent congestion at {} ({:?}): boosting {} pressure x{}",
                                watch.intersection,
                                watch.approach,
                                group.name,
                                watch.multiplier
                            );
                            pressure * watch.multiplier
                        }
                        _ => pressure,
                    };
                    pressures.push((group.name.clone(), boosted));
                }
                Err(e) => {
                    log::warn!("{}; counting it as zero pressure", e);
                    failed_groups.push(group.name.clone());
                    pressures.push((group.name.clone(), 0.0));
                }
            }
        }

        let bias = pressure_bias(pressures[0].1, pressures[1].1, self.bias_scale);
        log::debug!(
            "Coordination: {}={:.1} {}={:.1} bias={:.3}",
            pressures[0].0,
            pressures[0].1,
            pressures[1].0,
            pressures[1].1,
            bias
        );

        apply_bias(&self.groups[0], bias, registry);
        apply_bias(&self.groups[1], -bias, registry);

        let outcome = CoordinationOutcome {
            pressures,
            bias,
            congestion_boost: boost,
            failed_groups,
        };
        self.last_outcome = Some(outcome.clone());
        Some(outcome)
    }

    fn update_congestion(&mut self, registry: &ControllerRegistry) {
        let Some(watch) = &self.watch else {
            return;
        };
        let queue = registry
            .get(&watch.intersection)
            .map(|c| c.queues().get(watch.approach))
            .unwrap_or(0.0);
        if queue > watch.queue_threshold {
            self.congestion_counter += 1;
        } else {
            self.congestion_counter = self.congestion_counter.saturating_sub(1);
        }
    }

    fn congestion_persistent(&self) -> bool {
        self.watch
            .as_ref()
            .is_some_and(|w| self.congestion_counter > w.persistence_threshold)
    }
}

fn group_pressure(group: &ArterialGroup, registry: &ControllerRegistry) -> Result<f64, SignalError> {
    let mut total = 0.0;
    for member in &group.members {
        match registry.get(member) {
            Some(controller) => total += controller.pressure_metric(),
            None => log::debug!("Group {}: member {} has no controller", group.name, member),
        }
    }
    if !total.is_finite() || total < 0.0 {
        return Err(SignalError::CoordinationError {
            group: group.name.clone(),
            reason: format!("pressure aggregate {} is not usable", total),
        });
    }
    Ok(total)
}

fn apply_bias(group: &ArterialGroup, bias: f64, registry: &mut ControllerRegistry) {
    for member in &group.members {
        match registry.get_mut(member) {
            Some(controller) if controller.is_alternating() => controller.set_priority_factor(bias),
            Some(_) => {}
            None => {
                let err = SignalError::CoordinationError {
                    group: group.name.clone(),
                    reason: format!("member {} has no controller", member),
                };
                log::debug!("{}", err);
            }
        }
    }
}
