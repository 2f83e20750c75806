// signal_control_main.rs
use adaptive_signals::cli::Cli;
use adaptive_signals::config::NetworkConfig;
use adaptive_signals::control_system::traffic_light_controller::SignalNetwork;
use adaptive_signals::simulation_engine::simulation::{run_simulation, GridSimulation};
use clap::Parser;
use std::process::ExitCode;
use std::time::Duration;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    env_logger::init();

    let config = match &cli.config {
        Some(path) => match NetworkConfig::load(path) {
            Ok(config) => {
                log::info!("Loaded configuration from {}", path.display());
                config
            }
            Err(e) => {
                log::error!("{}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => NetworkConfig::default(),
    };

    let mut simulation = GridSimulation::new(cli.seed);
    let mut network = match SignalNetwork::initialize(&config, &mut simulation) {
        Ok(network) => network,
        Err(e) => {
            log::error!("Signal control could not start: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let summary = run_simulation(
        &mut network,
        &mut simulation,
        cli.ticks,
        cli.pace_ms.map(Duration::from_millis),
    )
    .await;

    log::info!(
        "Run finished after {} ticks{}: {} phase commands, {} vehicles discharged, {} still halting, {:.0}s total waiting",
        summary.ticks,
        if summary.interrupted { " (interrupted)" } else { "" },
        simulation.commands().len(),
        simulation.total_discharged(),
        simulation.total_halting(),
        simulation.total_waiting_time()
    );
    if let Some(outcome) = network.coordinator().last_outcome() {
        log::info!("Last coordination bias {:.3} from {:?}", outcome.bias, outcome.pressures);
    }
    match serde_json::to_string_pretty(&network.snapshot()) {
        Ok(json) => println!("{}", json),
        Err(e) => log::error!("Could not serialise controller snapshots: {}", e),
    }
    ExitCode::SUCCESS
}
