// CLI - Command line interface for powctl
// Principle: Diagnostics only; nothing here feeds back into header math

pub mod config;
pub mod runner;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// powctl - Inspect and simulate the adaptive PoW controller
#[derive(Parser, Debug)]
#[command(name = "powctl")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Adaptive PoW difficulty, price and gas controller tooling")]
#[command(long_about = r#"
powctl drives the per-block controller outside a node.

Print the default parameter table:
  powctl params

Write it to a file, edit it, then simulate with it:
  powctl params --output params.json
  powctl simulate --params params.json --blocks 5000 --seed 7

Schedule governance plans during a simulation:
  powctl simulate --plans plans.json
"#)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true, default_value = "false")]
    pub verbose: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info", env = "POWCTL_LOG")]
    pub log_level: String,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print or write the parameter table
    Params(ParamsCmd),

    /// Run the controller against a synthetic miner population
    Simulate(SimulateCmd),
}

/// Print or write parameters
#[derive(Parser, Debug)]
pub struct ParamsCmd {
    /// Parameter file to start from instead of the defaults
    #[arg(long, env = "POWCTL_PARAMS")]
    pub params: Option<PathBuf>,

    /// Write to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Run a simulation
#[derive(Parser, Debug)]
pub struct SimulateCmd {
    /// Parameter file (JSON). Defaults are used when absent.
    #[arg(long, env = "POWCTL_PARAMS")]
    pub params: Option<PathBuf>,

    /// JSON array of plans to schedule before the first block
    #[arg(long)]
    pub plans: Option<PathBuf>,

    /// Number of blocks to produce after genesis
    #[arg(short, long, default_value = "1000")]
    pub blocks: u64,

    /// Seed for the miner population noise
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Amplitude of the uniform noise added to the PoW share
    #[arg(long, default_value = "0.05")]
    pub noise: f64,

    /// Log a progress line every N blocks (0 disables)
    #[arg(long, default_value = "100")]
    pub report_every: u64,
}
