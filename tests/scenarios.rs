// tests/scenarios.rs
use adaptive_signals::config::{
    CongestionWatch, DemandSignal, IntersectionConfig, NetworkConfig, SignalTiming,
};
use adaptive_signals::control_system::intersection_controller::SignalState;
use adaptive_signals::control_system::traffic_light_controller::SignalNetwork;
use adaptive_signals::error::SignalError;
use adaptive_signals::shared_data::{
    Approach, ArterialGroup, GroupSlot, IntersectionId, PhaseDefinition, PhaseProgram,
};
use adaptive_signals::simulation_engine::adapter::SimulationStep;
use adaptive_signals::simulation_engine::lanes::detector_lane_id;
use adaptive_signals::simulation_engine::simulation::{run_simulation, GridSimulation};

fn two_phase_program() -> PhaseProgram {
    PhaseProgram::new(vec![
        PhaseDefinition::fixed("GGrr", 31.0),
        PhaseDefinition::fixed("yyrr", 4.0),
        PhaseDefinition::fixed("rrGG", 31.0),
        PhaseDefinition::fixed("rryy", 4.0),
    ])
}

fn single_green_program() -> PhaseProgram {
    PhaseProgram::new(vec![
        PhaseDefinition::fixed("GGGG", 31.0),
        PhaseDefinition::fixed("yyyy", 3.0),
        PhaseDefinition::fixed("rrrr", 2.0),
    ])
}

fn timing() -> SignalTiming {
    SignalTiming {
        min_green: 15,
        normal_green: 31,
        extended_green: 60,
        max_green: 60,
        yellow_duration: 4,
        all_red_duration: 2,
        sample_interval: 1,
        pressure_margin: 5.0,
        ..SignalTiming::default()
    }
}

/// A simulation with one signal head per `(id, program)` and a zero-arrival lane
/// on every approach, plus a matching network configuration.
fn build(sites: &[(&str, PhaseProgram)], groups: [ArterialGroup; 2]) -> (GridSimulation, NetworkConfig) {
    let mut simulation = GridSimulation::empty(5);
    let mut config = NetworkConfig {
        timing: timing(),
        intersections: Vec::new(),
        ..NetworkConfig::default()
    };
    config.coordinator.groups = groups.to_vec();
    config.coordinator.congestion_watch = None;

    for (name, program) in sites {
        let id = IntersectionId::from(*name);
        simulation.add_intersection(id.clone(), program.clone());
        let mut intersection = IntersectionConfig::new(name);
        for approach in Approach::ALL {
            simulation.add_lane(&id, approach, 0.0);
            intersection = intersection.with_detector(approach, &detector_lane_id(name, approach));
        }
        config.intersections.push(intersection);
    }
    (simulation, config)
}

fn default_groups() -> [ArterialGroup; 2] {
    [ArterialGroup::new("NS", &["N1"]), ArterialGroup::new("EW", &["E1"])]
}

fn commanded(simulation: &GridSimulation, id: &str) -> Vec<(u64, usize)> {
    simulation
        .commands()
        .iter()
        .filter(|c| c.intersection.as_str() == id)
        .map(|c| (c.tick, c.phase))
        .collect()
}

#[test]
fn timer_cycle_without_demand() {
    let (mut simulation, config) = build(&[("J1", two_phase_program())], default_groups());
    let mut network = SignalNetwork::initialize(&config, &mut simulation).unwrap();
    network.run(&mut simulation, 140);

    assert_eq!(
        commanded(&simulation, "J1"),
        vec![
            (31, 1),
            (35, 2),
            (66, 3),
            (70, 0),
            (101, 1),
            (105, 2),
            (136, 3),
            (140, 0)
        ]
    );
}

#[test]
fn starved_movement_preempts_green() {
    let (mut simulation, config) = build(&[("J1", two_phase_program())], default_groups());
    let mut network = SignalNetwork::initialize(&config, &mut simulation).unwrap();
    network.run(&mut simulation, 15);
    assert!(commanded(&simulation, "J1").is_empty());

    simulation.set_queue("J1_N_in", 12);
    simulation.set_queue("J1_S_in", 8);
    network.run(&mut simulation, 1);

    assert_eq!(commanded(&simulation, "J1"), vec![(16, 1)]);
    let j1 = network.controller(&IntersectionId::from("J1")).unwrap();
    assert_eq!(j1.signal_state(), SignalState::Yellow(GroupSlot::First));
    assert_eq!(j1.demand_conflict(), 20.0);
    assert_eq!(j1.demand_active(), 0.0);
}

#[test]
fn coordinator_biases_groups_against_each_other() {
    let (mut simulation, config) = build(
        &[("N1", two_phase_program()), ("E1", two_phase_program())],
        default_groups(),
    );
    let mut network = SignalNetwork::initialize(&config, &mut simulation).unwrap();

    // Both heads start on east-west green, so north-south queues are the conflicting pressure.
    simulation.set_queue("N1_N_in", 30);
    simulation.set_queue("E1_S_in", 10);
    network.run(&mut simulation, 10);

    let outcome = network.coordinator().last_outcome().unwrap();
    assert_eq!(
        outcome.pressures,
        vec![("NS".to_string(), 30.0), ("EW".to_string(), 10.0)]
    );
    assert!((outcome.bias - 0.4).abs() < 1e-12);

    let n1 = network.controller(&IntersectionId::from("N1")).unwrap();
    let e1 = network.controller(&IntersectionId::from("E1")).unwrap();
    assert!((n1.priority_factor() - 0.4).abs() < 1e-12);
    assert!((e1.priority_factor() + 0.4).abs() < 1e-12);
}

#[test]
fn unusable_group_pressure_does_not_block_the_other_group() {
    let (mut simulation, mut config) = build(
        &[("N1", two_phase_program()), ("E1", two_phase_program())],
        default_groups(),
    );
    config.demand_signal = DemandSignal::WaitingTime;
    let mut network = SignalNetwork::initialize(&config, &mut simulation).unwrap();

    simulation.set_waiting_time("N1_N_in", 30.0);
    simulation.set_waiting_time("E1_S_in", f64::NAN);
    network.run(&mut simulation, 10);

    let outcome = network.coordinator().last_outcome().unwrap();
    assert_eq!(outcome.failed_groups, vec!["EW".to_string()]);
    assert_eq!(
        outcome.pressures,
        vec![("NS".to_string(), 30.0), ("EW".to_string(), 0.0)]
    );
    assert!((outcome.bias - 0.8).abs() < 1e-12);

    let n1 = network.controller(&IntersectionId::from("N1")).unwrap();
    let e1 = network.controller(&IntersectionId::from("E1")).unwrap();
    assert!((n1.priority_factor() - 0.8).abs() < 1e-12);
    assert!((e1.priority_factor() + 0.8).abs() < 1e-12);
}

#[test]
fn greens_without_yellow_hold_instead_of_switching() {
    let program = PhaseProgram::new(vec![
        PhaseDefinition::fixed("GGrr", 31.0),
        PhaseDefinition::fixed("rrGG", 31.0),
    ]);
    let (mut simulation, config) = build(&[("J1", program)], default_groups());
    let mut network = SignalNetwork::initialize(&config, &mut simulation).unwrap();
    simulation.set_queue("J1_N_in", 20);
    network.run(&mut simulation, 70);

    assert!(commanded(&simulation, "J1").is_empty());
    let j1 = network.controller(&IntersectionId::from("J1")).unwrap();
    assert!(!j1.is_alternating());
    assert_eq!(j1.signal_state(), SignalState::Green(GroupSlot::First));
}

#[test]
fn single_group_intersection_runs_on_timer_and_ignores_bias() {
    let groups = [
        ArterialGroup::new("NS", &["N1", "S1"]),
        ArterialGroup::new("EW", &["E1"]),
    ];
    let (mut simulation, config) = build(
        &[
            ("N1", two_phase_program()),
            ("E1", two_phase_program()),
            ("S1", single_green_program()),
        ],
        groups,
    );
    let mut network = SignalNetwork::initialize(&config, &mut simulation).unwrap();
    let s1_id = IntersectionId::from("S1");
    {
        let s1 = network.controller(&s1_id).unwrap();
        assert_eq!(s1.topology().groups.len(), 1);
        assert!(!s1.is_alternating());
        assert_eq!(s1.policy_name(), "static");
    }

    simulation.set_queue("N1_N_in", 25);
    simulation.set_queue("S1_N_in", 40);
    network.run(&mut simulation, 10);

    let n1 = network.controller(&IntersectionId::from("N1")).unwrap();
    assert!((n1.priority_factor() - 0.8).abs() < 1e-12);
    let s1 = network.controller(&s1_id).unwrap();
    assert_eq!(s1.pressure_metric(), 0.0);
    assert_eq!(s1.priority_factor(), 0.0);

    network.run(&mut simulation, 30);
    assert_eq!(network.controller(&s1_id).unwrap().priority_factor(), 0.0);
    // Normal green 31, yellow 4, all-red 2, then back to the only green.
    assert_eq!(commanded(&simulation, "S1"), vec![(31, 1), (35, 2), (37, 0)]);
}

#[test]
fn persistent_congestion_boosts_watched_group() {
    let (mut simulation, mut config) = build(
        &[("N1", two_phase_program()), ("E1", two_phase_program())],
        default_groups(),
    );
    config.coordinator.interval = 1;
    config.coordinator.congestion_watch = Some(CongestionWatch {
        intersection: IntersectionId::from("E1"),
        approach: Approach::West,
        boosted_group: "EW".to_string(),
        queue_threshold: 15.0,
        persistence_threshold: 3,
        multiplier: 1.8,
    });
    let mut network = SignalNetwork::initialize(&config, &mut simulation).unwrap();

    simulation.set_queue("N1_N_in", 30);
    simulation.set_queue("E1_N_in", 10);
    let mut boosts = Vec::new();
    for _ in 0..5 {
        // The west approach is green and discharging; keep it congested.
        simulation.set_queue("E1_W_in", 20);
        network.run(&mut simulation, 1);
        boosts.push(network.coordinator().last_outcome().unwrap().congestion_boost);
    }

    assert_eq!(boosts, vec![false, false, false, true, true]);
    assert_eq!(network.coordinator().congestion_counter(), 5);
    let outcome = network.coordinator().last_outcome().unwrap();
    assert!((outcome.pressures[1].1 - 18.0).abs() < 1e-9);
}

#[test]
fn startup_fails_without_any_valid_controller() {
    let mut simulation = GridSimulation::empty(5);
    simulation.add_intersection(IntersectionId::from("R1"), PhaseProgram::new(vec![
        PhaseDefinition::fixed("rrrr", 40.0),
    ]));
    let mut config = NetworkConfig::default();
    config.intersections = vec![IntersectionConfig::new("R1"), IntersectionConfig::new("Ghost")];

    let result = SignalNetwork::initialize(&config, &mut simulation);
    assert!(matches!(result, Err(SignalError::NoValidControllers)));
    assert!(simulation.commands().is_empty());
}

#[test]
fn invalid_config_is_rejected_before_any_command() {
    let mut simulation = GridSimulation::new(5);
    let mut config = NetworkConfig::default();
    config.timing.min_green = 40;
    assert!(matches!(
        SignalNetwork::initialize(&config, &mut simulation),
        Err(SignalError::Config(_))
    ));
    assert!(simulation.commands().is_empty());
}

#[test]
fn config_file_round_trips_through_disk() {
    let path = std::env::temp_dir().join(format!("adaptive_signals_{}.json", std::process::id()));
    let mut config = NetworkConfig::default();
    config.timing.normal_green = 35;
    std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

    let loaded = NetworkConfig::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn missing_config_file_is_an_io_error() {
    let result = NetworkConfig::load("/nonexistent/adaptive_signals.json");
    assert!(matches!(result, Err(SignalError::Io(_))));
}

#[tokio::test]
async fn async_driver_runs_requested_ticks() {
    let mut simulation = GridSimulation::new(9);
    let mut network = SignalNetwork::initialize(&NetworkConfig::default(), &mut simulation).unwrap();
    let summary = run_simulation(&mut network, &mut simulation, 400, None).await;

    assert_eq!(summary.ticks, 400);
    assert!(!summary.interrupted);
    assert_eq!(simulation.tick(), 400);
    assert!(!simulation.commands().is_empty());
    assert_eq!(network.snapshot().len(), 12);
}

#[test]
fn grid_run_keeps_every_controller_managed() {
    let mut simulation = GridSimulation::new(21);
    let mut network = SignalNetwork::initialize(&NetworkConfig::default(), &mut simulation).unwrap();
    for _ in 0..1000 {
        let tick = simulation.advance();
        network.step(tick, &mut simulation);
    }
    for controller in network.registry().iter() {
        assert!(!matches!(
            controller.signal_state(),
            SignalState::Unmanaged(_) | SignalState::Inert
        ));
        assert!(controller.priority_factor().abs() <= 0.8);
    }
}
