// tests/properties.rs
use adaptive_signals::config::{NetworkConfig, SignalTiming};
use adaptive_signals::control_system::pressure_coordinator::pressure_bias;
use adaptive_signals::control_system::signal_policy::{
    clamp_priority, AdaptivePolicy, DemandContext, SignalPolicy, StaticPolicy,
};
use adaptive_signals::control_system::traffic_light_controller::SignalNetwork;
use adaptive_signals::simulation_engine::simulation::GridSimulation;
use proptest::prelude::*;
use std::collections::BTreeMap;

fn demand_context() -> impl Strategy<Value = DemandContext> {
    (
        0u32..200,
        0.0f64..100.0,
        0.0f64..100.0,
        -2.0f64..2.0,
        0.5f64..2.0,
    )
        .prop_map(|(elapsed, active, conflict, pf, adjustment)| DemandContext {
            elapsed_ticks: elapsed,
            demand_active: active,
            demand_conflict: conflict,
            priority_factor: clamp_priority(pf),
            corridor_adjustment: adjustment,
        })
}

proptest! {
    #[test]
    fn priority_factor_stays_in_band(factor in proptest::num::f64::ANY) {
        let clamped = clamp_priority(factor);
        prop_assert!((-0.8..=0.8).contains(&clamped));
    }

    #[test]
    fn bias_never_exceeds_scale(a in 0.0f64..1e6, b in 0.0f64..1e6, scale in 0.0f64..=1.0) {
        let bias = pressure_bias(a, b, scale);
        prop_assert!(bias.abs() <= scale + 1e-12);
        if a > b {
            prop_assert!(bias >= 0.0);
        }
    }

    #[test]
    fn green_target_is_bounded(ctx in demand_context()) {
        let timing = SignalTiming::default();
        for target in [
            AdaptivePolicy.green_target(&timing, &ctx),
            StaticPolicy.green_target(&timing, &ctx),
        ] {
            prop_assert!(target >= timing.min_green as f64);
            prop_assert!(target <= timing.max_green as f64);
        }
    }

    #[test]
    fn starvation_override_needs_min_green_and_margin(ctx in demand_context()) {
        let timing = SignalTiming::default();
        let expected = ctx.elapsed_ticks >= timing.min_green
            && ctx.demand_conflict > ctx.demand_active + timing.pressure_margin;
        prop_assert_eq!(AdaptivePolicy.starvation_override(&timing, &ctx), expected);
        prop_assert!(!StaticPolicy.starvation_override(&timing, &ctx));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    /// Every head walks green, yellow, all-red in program order with bounded durations.
    #[test]
    fn grid_commands_follow_the_cycle(seed in any::<u64>()) {
        let config = NetworkConfig::default();
        let timing = config.timing.clone();
        let mut simulation = GridSimulation::new(seed);
        let mut network = SignalNetwork::initialize(&config, &mut simulation).unwrap();
        network.run(&mut simulation, 600);

        let mut per_head: BTreeMap<String, Vec<(u64, usize)>> = BTreeMap::new();
        for command in simulation.commands() {
            per_head
                .entry(command.intersection.to_string())
                .or_default()
                .push((command.tick, command.phase));
        }
        prop_assert_eq!(per_head.len(), 12);

        for commands in per_head.values() {
            for pair in commands.windows(2) {
                let (start, phase) = pair[0];
                let (end, next) = pair[1];
                prop_assert_eq!(next, (phase + 1) % 6);
                let held = (end - start) as u32;
                match phase {
                    0 | 3 => {
                        prop_assert!(held >= timing.min_green);
                        prop_assert!(held <= timing.max_green);
                    }
                    1 | 4 => prop_assert_eq!(held, timing.yellow_duration),
                    _ => prop_assert_eq!(held, timing.all_red_duration),
                }
            }
        }
    }
}
