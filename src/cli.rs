//! Command-line arguments of `signal_control_main`.

use std::path::PathBuf;

use clap::Parser;

use crate::global_variables::DEFAULT_RUN_TICKS;

/// Runs adaptive signal control on the built-in grid simulation.
#[derive(Parser, Debug)]
#[command(name = "signal_control_main", version, about)]
pub struct Cli {
    /// JSON network configuration. The built-in grid configuration is used when omitted.
    pub config: Option<PathBuf>,

    /// Number of simulation ticks to run.
    #[arg(short, long, default_value_t = DEFAULT_RUN_TICKS, value_parser = clap::value_parser!(u64).range(1..))]
    pub ticks: u64,

    /// Seed for the grid simulation's random arrivals.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Wall-clock milliseconds per tick. Runs as fast as possible when omitted.
    #[arg(long)]
    pub pace_ms: Option<u64>,
}
