// dip_sim/src/commands.rs

//! The work behind each subcommand, kept apart from argument parsing so
//! tests can drive it directly.

use crate::cli::{OptimizeArgs, SimulateArgs};
use crate::config::AppConfig;
use crate::error::SimResult;
use crate::output::{self, GainsFile, OptimizationReport, TrajectoryFile};
use dip_core::control::config::ControllerConfig;
use dip_core::control::factory::ControllerFactory;
use dip_core::control::registry::{ControllerKind, ControllerRegistry};
use dip_core::control::sta::SuperTwistingSmc;
use dip_core::error::ConfigurationError;
use dip_core::models::dynamics::dip::DoubleInvertedPendulum;
use dip_core::optimization::{FitnessEvaluator, PsoOptimizer, PsoResult};
use dip_core::simulation::{compute_metrics, SimulationResult, SimulationRunner, TrajectoryMetrics};
use dip_core::types::{perturbed_upright, state_from_slice, State, STATE_DIM};
use dip_core::utils::safety::all_finite;
use tracing::{debug, info, warn};

/// Angle band [rad] used for the settling time printed after a run.
pub const SETTLING_TOLERANCE: f64 = 0.01;

fn factory(config: &AppConfig) -> Result<ControllerFactory, ConfigurationError> {
    let plant = DoubleInvertedPendulum::new(config.physics)?;
    Ok(ControllerFactory::new(ControllerRegistry::standard(), plant))
}

/// Gains from the command line, a gains file or the registry, in that order.
fn resolve_gains(
    kind: ControllerKind,
    args: &SimulateArgs,
    registry: &ControllerRegistry,
) -> SimResult<Vec<f64>> {
    if let Some(gains) = &args.gains {
        return Ok(gains.clone());
    }
    if let Some(path) = &args.gains_file {
        let file: GainsFile = output::read_json(path)?;
        if file.controller != kind {
            return Err(ConfigurationError::ConfigMismatch {
                expected: kind.as_str(),
                found: file.controller.as_str(),
            }
            .into());
        }
        debug!(path = %path.display(), "loaded gains");
        return Ok(file.gains);
    }
    Ok(registry.descriptor(kind).default_gains.to_vec())
}

/// Stability check for gains the user is about to run or keep. Only the
/// super-twisting controller has one; it warns at most once per call.
fn check_convergence(gains: &[f64], config: &ControllerConfig) -> bool {
    match config {
        ControllerConfig::StaSmc(sta) => SuperTwistingSmc::check_convergence(gains, sta),
        _ => true,
    }
}

fn resolve_initial(values: Option<&[f64]>) -> Result<State, ConfigurationError> {
    match values {
        None => Ok(perturbed_upright(0.05, 0.05)),
        Some(values) => state_from_slice(values)
            .filter(|x| all_finite(x.iter()))
            .ok_or_else(|| ConfigurationError::InvalidScenario {
                name: "--initial".into(),
                reason: format!("expected {STATE_DIM} finite values, got {values:?}"),
            }),
    }
}

/// A finished `simulate` command.
#[derive(Debug, Clone)]
pub struct SimulationOutcome {
    pub controller: ControllerKind,
    pub gains: Vec<f64>,
    pub result: SimulationResult,
    pub metrics: TrajectoryMetrics,
}

pub fn simulate(config: &AppConfig, args: &SimulateArgs) -> SimResult<SimulationOutcome> {
    let kind = args.controller;
    let factory = factory(config)?;
    let gains = resolve_gains(kind, args, factory.registry())?;
    let x0 = resolve_initial(args.initial.as_deref())?;

    let mut sim = config.simulation;
    if let Some(duration) = args.duration {
        sim.duration = duration;
    }
    let runner = SimulationRunner::new(sim)?;
    let controller_config = config.controllers.get(kind);
    let controller = factory.create(kind, &gains, &controller_config)?;
    check_convergence(&gains, &controller_config);

    info!(controller = %kind, ?gains, duration = sim.duration, "simulating");
    let result = runner.run(factory.nominal(), controller.as_ref(), &x0);
    let metrics = compute_metrics(&result.trajectory, controller.max_force(), SETTLING_TOLERANCE);

    if result.status.is_completed() {
        info!(
            settling_time = ?metrics.settling_time,
            overshoot = metrics.overshoot,
            rms_control = metrics.rms_control,
            final_angle_error = metrics.final_angle_error,
            "run completed"
        );
    } else {
        warn!(
            status = result.status.label(),
            step = ?result.status.failure_step(),
            survived = result.survived_fraction(),
            "run ended early"
        );
    }

    if let Some(path) = &args.output {
        output::write_json(path, &TrajectoryFile::new(kind, &gains, &result, metrics))?;
        info!(path = %path.display(), samples = result.trajectory.len(), "trajectory written");
    }

    Ok(SimulationOutcome {
        controller: kind,
        gains,
        result,
        metrics,
    })
}

/// A finished `optimize` command.
#[derive(Debug, Clone)]
pub struct OptimizationOutcome {
    pub controller: ControllerKind,
    pub result: PsoResult,
    pub report: OptimizationReport,
}

pub fn optimize(config: &AppConfig, args: &OptimizeArgs) -> SimResult<OptimizationOutcome> {
    let kind = args.controller;
    let mut swarm = config.pso.swarm;
    if let Some(seed) = args.seed {
        swarm.seed = seed;
    }
    if let Some(iterations) = args.iterations {
        swarm.iterations = iterations;
    }
    if let Some(swarm_size) = args.swarm_size {
        swarm.swarm_size = swarm_size;
    }

    let factory = factory(config)?;
    let bounds = config.pso.bounds.for_kind(kind, factory.registry());
    bounds.validate_for(factory.descriptor(kind))?;
    let suite = config.fitness.build_suite()?;
    let runner = SimulationRunner::new(config.simulation)?;
    let evaluator = FitnessEvaluator::new(
        factory,
        runner,
        config.controllers.get(kind),
        config.fitness.cost,
        &suite,
    )?;

    let optimizer = PsoOptimizer::new(swarm)?;
    let result = optimizer.optimize(&evaluator, &bounds)?;
    let fitness = evaluator.report(&result.best_position, 0)?;
    check_convergence(&result.best_position, &config.controllers.get(kind));

    for score in &fitness.scenarios {
        debug!(
            scenario = %score.name,
            status = score.status.label(),
            cost = score.cost,
            "best gains"
        );
    }
    info!(
        controller = %kind,
        best_cost = result.best_cost,
        gains = ?result.best_position,
        evaluations = result.evaluations,
        "optimization finished"
    );

    let report = OptimizationReport::new(kind, swarm.seed, &result, fitness);
    if let Some(path) = &args.output {
        let gains = GainsFile {
            controller: kind,
            gains: result.best_position.clone(),
            cost: Some(result.best_cost),
        };
        output::write_json(path, &gains)?;
        info!(path = %path.display(), "gains written");
    }
    if let Some(path) = &args.report {
        output::write_json(path, &report)?;
        info!(path = %path.display(), "report written");
    }

    Ok(OptimizationOutcome {
        controller: kind,
        result,
        report,
    })
}

/// The merged configuration rendered back to TOML.
pub fn render_config(config: &AppConfig) -> SimResult<String> {
    toml::to_string_pretty(config).map_err(|e| {
        std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()).into()
    })
}
