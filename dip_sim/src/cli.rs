// dip_sim/src/cli.rs

use clap::{Args, Parser, Subcommand};
use dip_core::control::registry::ControllerKind;
use std::path::PathBuf;

/// Sliding-mode control of a double inverted pendulum on a cart.
///
/// Simulates one controller from a chosen start or tunes its gains with a
/// particle swarm over a scenario suite.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// TOML configuration file. Defaults apply to every key it leaves out.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level (ignored when RUST_LOG is set).
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run one closed-loop simulation and report its metrics.
    Simulate(SimulateArgs),
    /// Tune a controller's gains with particle swarm optimization.
    Optimize(OptimizeArgs),
    /// Print the effective configuration as TOML.
    Config,
}

#[derive(Args, Debug, Clone)]
pub struct SimulateArgs {
    /// Controller type, e.g. `classical_smc` or `sta_smc`.
    #[arg(long)]
    pub controller: ControllerKind,

    /// Comma-separated gain vector. Registry defaults when omitted.
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub gains: Option<Vec<f64>>,

    /// Gains written by `optimize --output`.
    #[arg(long, conflicts_with = "gains")]
    pub gains_file: Option<PathBuf>,

    /// Initial state `x,x_dot,theta1,theta1_dot,theta2,theta2_dot`.
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub initial: Option<Vec<f64>>,

    /// Overrides `simulation.duration` [s].
    #[arg(long)]
    pub duration: Option<f64>,

    /// Where to write the trajectory as JSON.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct OptimizeArgs {
    #[arg(long)]
    pub controller: ControllerKind,

    /// Overrides `pso.swarm.seed`.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Overrides `pso.swarm.iterations`.
    #[arg(long)]
    pub iterations: Option<usize>,

    /// Overrides `pso.swarm.swarm_size`.
    #[arg(long)]
    pub swarm_size: Option<usize>,

    /// Where to write `{controller, gains, cost}` as JSON.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Where to write the per-iteration history and scenario breakdown.
    #[arg(long)]
    pub report: Option<PathBuf>,
}
