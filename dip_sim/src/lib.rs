// dip_sim/src/lib.rs

//! Command-line front end over `dip_core`: layered configuration, logging
//! setup and the `simulate` / `optimize` workflows with their JSON outputs.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
pub mod prelude;

use cli::{Cli, Command};
use config::AppConfig;
use error::SimResult;

/// Loads the configuration named on the command line and runs the subcommand.
pub fn run(cli: &Cli) -> SimResult<()> {
    let config = AppConfig::load(cli.config.as_deref())?;
    match &cli.command {
        Command::Simulate(args) => commands::simulate(&config, args).map(|_| ()),
        Command::Optimize(args) => commands::optimize(&config, args).map(|_| ()),
        Command::Config => {
            print!("{}", commands::render_config(&config)?);
            Ok(())
        }
    }
}
