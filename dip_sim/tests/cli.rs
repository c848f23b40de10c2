// dip_sim/tests/cli.rs

use clap::Parser;
use dip_core::control::registry::ControllerKind;
use dip_sim::cli::{Cli, Command};
use std::path::PathBuf;

#[test]
fn simulate_parses_vectors_and_global_flags() {
    let cli = Cli::try_parse_from([
        "dip-sim",
        "simulate",
        "--controller",
        "sta_smc",
        "--gains",
        "10,15,2,2.5,3,5",
        "--initial",
        "0,0,0.1,0,-0.1,0",
        "--duration",
        "3",
        "--config",
        "dip.toml",
        "-v",
    ])
    .unwrap();

    assert!(cli.verbose);
    assert_eq!(cli.config, Some(PathBuf::from("dip.toml")));
    let Command::Simulate(args) = cli.command else {
        panic!("expected simulate");
    };
    assert_eq!(args.controller, ControllerKind::StaSmc);
    assert_eq!(args.gains, Some(vec![10.0, 15.0, 2.0, 2.5, 3.0, 5.0]));
    assert_eq!(args.initial, Some(vec![0.0, 0.0, 0.1, 0.0, -0.1, 0.0]));
    assert_eq!(args.duration, Some(3.0));
    assert_eq!(args.output, None);
}

#[test]
fn optimize_parses_overrides() {
    let cli = Cli::try_parse_from([
        "dip-sim",
        "optimize",
        "--controller",
        "hybrid-adaptive-sta-smc",
        "--seed",
        "11",
        "--iterations",
        "5",
        "--swarm-size",
        "8",
        "--output",
        "gains.json",
    ])
    .unwrap();

    let Command::Optimize(args) = cli.command else {
        panic!("expected optimize");
    };
    assert_eq!(args.controller, ControllerKind::HybridAdaptiveStaSmc);
    assert_eq!(args.seed, Some(11));
    assert_eq!(args.iterations, Some(5));
    assert_eq!(args.swarm_size, Some(8));
    assert_eq!(args.output, Some(PathBuf::from("gains.json")));
    assert_eq!(args.report, None);
}

#[test]
fn unknown_controller_is_a_usage_error() {
    let err = Cli::try_parse_from(["dip-sim", "simulate", "--controller", "pid"]).unwrap_err();
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn gains_and_gains_file_are_exclusive() {
    let parsed = Cli::try_parse_from([
        "dip-sim",
        "simulate",
        "--controller",
        "classical_smc",
        "--gains",
        "1,2,3,4,5,6",
        "--gains-file",
        "g.json",
    ]);
    assert!(parsed.is_err());
}

#[test]
fn malformed_numbers_are_rejected() {
    let parsed = Cli::try_parse_from([
        "dip-sim",
        "simulate",
        "--controller",
        "classical_smc",
        "--gains",
        "1,two,3",
    ]);
    assert!(parsed.is_err());
}
