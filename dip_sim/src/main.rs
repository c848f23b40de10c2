// dip_sim/src/main.rs

use clap::Parser;
use dip_sim::cli::Cli;
use std::process::ExitCode;
use tracing::error;

fn main() -> ExitCode {
    let cli = Cli::parse();
    dip_sim::logging::init(cli.verbose);

    match dip_sim::run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::from(err.exit_code())
        }
    }
}
