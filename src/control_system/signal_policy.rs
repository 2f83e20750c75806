use crate::config::{ControlMode, SignalTiming};
use crate::global_variables::PRIORITY_FACTOR_LIMIT;
use std::fmt::Debug;

/// Demand seen by a controller while its active group is green.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DemandContext {
    pub elapsed_ticks: u32,
    pub demand_active: f64,
    pub demand_conflict: f64,
    pub priority_factor: f64,
    pub corridor_adjustment: f64,
}

/// Decides how long a green may last. Selected once per controller.
pub trait SignalPolicy: Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// Green target in ticks, always within `[min_green, max_green]`.
    fn green_target(&self, timing: &SignalTiming, ctx: &DemandContext) -> f64;

    /// Whether the conflicting movement may cut the current green short.
    fn starvation_override(&self, timing: &SignalTiming, ctx: &DemandContext) -> bool;
}

/// Fixed normal green; ignores demand and the priority factor.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticPolicy;

impl SignalPolicy for StaticPolicy {
    fn name(&self) -> &'static str {
        "static"
    }

    fn green_target(&self, timing: &SignalTiming, _ctx: &DemandContext) -> f64 {
        bound_green(timing, timing.normal_green as f64)
    }

    fn starvation_override(&self, _timing: &SignalTiming, _ctx: &DemandContext) -> bool {
        false
    }
}

/// Extends green under active demand and lets a starved movement preempt it.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdaptivePolicy;

impl SignalPolicy for AdaptivePolicy {
    fn name(&self) -> &'static str {
        "adaptive"
    }

    fn green_target(&self, timing: &SignalTiming, ctx: &DemandContext) -> f64 {
        let extended = bound_green(
            timing,
            extended_green(timing, ctx.priority_factor, ctx.corridor_adjustment),
        );
        let threshold = extension_threshold(timing, ctx.priority_factor);
        if ctx.demand_active >= threshold && (ctx.elapsed_ticks as f64) < extended {
            extended
        } else {
            bound_green(timing, timing.normal_green as f64)
        }
    }

    fn starvation_override(&self, timing: &SignalTiming, ctx: &DemandContext) -> bool {
        ctx.elapsed_ticks >= timing.min_green
            && ctx.demand_conflict > ctx.demand_active + timing.pressure_margin
    }
}

/// Static for `ControlMode::Static` and for intersections with a single green group.
pub fn select_policy(mode: ControlMode, alternating: bool) -> Box<dyn SignalPolicy> {
    match (mode, alternating) {
        (ControlMode::Adaptive, true) => Box::new(AdaptivePolicy),
        _ => Box::new(StaticPolicy),
    }
}

/// `extended_green × (1 + pf × cap / 2) × corridor_adjustment`, before bounding.
pub fn extended_green(timing: &SignalTiming, priority_factor: f64, corridor_adjustment: f64) -> f64 {
    timing.extended_green as f64
        * (1.0 + priority_factor * timing.priority_effect_cap / 2.0)
        * corridor_adjustment
}

/// `demand_threshold × (1 − |pf| × cap)`.
pub fn extension_threshold(timing: &SignalTiming, priority_factor: f64) -> f64 {
    timing.demand_threshold * (1.0 - priority_factor.abs() * timing.priority_effect_cap)
}

/// Clamps a priority factor to `[-0.8, 0.8]`. NaN becomes neutral.
pub fn clamp_priority(factor: f64) -> f64 {
    if factor.is_nan() {
        return 0.0;
    }
    factor.clamp(-PRIORITY_FACTOR_LIMIT, PRIORITY_FACTOR_LIMIT)
}

fn bound_green(timing: &SignalTiming, target: f64) -> f64 {
    target.clamp(timing.min_green as f64, timing.max_green as f64)
}
