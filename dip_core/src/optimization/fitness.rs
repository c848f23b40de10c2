// dip_core/src/optimization/fitness.rs

//! Turns simulated runs into one scalar cost per gain vector.

use super::scenario::{Scenario, ScenarioSuite};
use super::Objective;
use crate::control::config::ControllerConfig;
use crate::control::factory::ControllerFactory;
use crate::control::registry::{ControllerDescriptor, ControllerKind};
use crate::control::Controller;
use crate::error::{check, ConfigurationError};
use crate::models::dynamics::dip::DoubleInvertedPendulum;
use crate::simulation::{SimulationResult, SimulationRunner, SimulationStatus};
use crate::types::{State, STATE_DIM};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Fraction of the instability penalty a completed run can cost at most.
const COMPLETED_COST_CAP: f64 = 0.999;

/// Weights of the four cost terms of a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CostWeights {
    /// Integral of the weighted squared state error.
    pub tracking: f64,
    /// Integral of `u^2`.
    pub effort: f64,
    /// Integral of `(du/dt)^2`, the chattering proxy.
    pub control_rate: f64,
    /// Variance of the sliding surface value.
    pub surface_variance: f64,
}

impl Default for CostWeights {
    fn default() -> Self {
        Self {
            tracking: 1.0,
            effort: 1e-3,
            control_rate: 1e-6,
            surface_variance: 1.0,
        }
    }
}

impl CostWeights {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        check::non_negative("fitness.weights.tracking", self.tracking)?;
        check::non_negative("fitness.weights.effort", self.effort)?;
        check::non_negative("fitness.weights.control_rate", self.control_rate)?;
        check::non_negative("fitness.weights.surface_variance", self.surface_variance)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FitnessConfig {
    pub weights: CostWeights,
    /// Diagonal of the tracking-error weighting, in state order.
    pub state_weights: [f64; STATE_DIM],
    /// Cost of a run that fails at its first step.
    pub instability_penalty: f64,
    /// Factor `alpha` on the worst scenario cost added to the weighted mean.
    pub worst_case_weight: f64,
}

impl Default for FitnessConfig {
    fn default() -> Self {
        Self {
            weights: CostWeights::default(),
            state_weights: [1.0, 0.1, 10.0, 0.5, 10.0, 0.5],
            instability_penalty: 1000.0,
            worst_case_weight: 0.0,
        }
    }
}

/// The four integrals of a completed run, unweighted.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub tracking: f64,
    pub effort: f64,
    pub control_rate: f64,
    pub surface_variance: f64,
}

impl CostBreakdown {
    /// Integrates the cost terms over a recorded run.
    pub fn from_result(result: &SimulationResult, state_weights: &[f64; STATE_DIM]) -> Self {
        let traj = &result.trajectory;
        let dt = traj.dt;
        let n = traj.len();
        if n == 0 {
            return Self::default();
        }

        let tracking = traj
            .states
            .iter()
            .map(|x| {
                x.iter()
                    .zip(state_weights)
                    .map(|(e, q)| q * e * e)
                    .sum::<f64>()
            })
            .sum::<f64>()
            * dt;
        let effort = traj.controls.iter().map(|u| u * u).sum::<f64>() * dt;
        let control_rate = traj
            .controls
            .windows(2)
            .map(|w| ((w[1] - w[0]) / dt).powi(2))
            .sum::<f64>()
            * dt;
        let mean_s = traj.surfaces.iter().sum::<f64>() / n as f64;
        let surface_variance =
            traj.surfaces.iter().map(|s| (s - mean_s).powi(2)).sum::<f64>() / n as f64;

        Self {
            tracking,
            effort,
            control_rate,
            surface_variance,
        }
    }

    pub fn weighted(&self, w: &CostWeights) -> f64 {
        w.tracking * self.tracking
            + w.effort * self.effort
            + w.control_rate * self.control_rate
            + w.surface_variance * self.surface_variance
    }
}

impl FitnessConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.weights.validate()?;
        for &q in &self.state_weights {
            check::non_negative("fitness.state_weights", q)?;
        }
        check::positive("fitness.instability_penalty", self.instability_penalty)?;
        check::non_negative("fitness.worst_case_weight", self.worst_case_weight)
    }

    /// Cost of one run. A completed run costs at most `0.999 * penalty`; a
    /// failed one costs `penalty * (2 - survived_fraction)`, so every failure
    /// ranks behind every completion while longer survival still ranks ahead.
    pub fn scenario_cost(&self, result: &SimulationResult) -> f64 {
        let cap = COMPLETED_COST_CAP * self.instability_penalty;
        if result.status.is_completed() {
            let raw = CostBreakdown::from_result(result, &self.state_weights).weighted(&self.weights);
            if raw.is_finite() {
                raw.min(cap)
            } else {
                cap
            }
        } else {
            self.instability_penalty * (2.0 - result.survived_fraction())
        }
    }

    /// `sum(w_i J_i) / sum(w_i) + alpha * max(J_i)`.
    pub fn aggregate<I>(&self, weighted_costs: I) -> f64
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let (mut num, mut den, mut worst) = (0.0, 0.0, f64::NEG_INFINITY);
        for (cost, weight) in weighted_costs {
            num += weight * cost;
            den += weight;
            worst = worst.max(cost);
        }
        if den <= 0.0 {
            return self.worst_possible_cost();
        }
        num / den + self.worst_case_weight * worst
    }

    /// Aggregate cost when every scenario fails at its first step.
    pub fn worst_possible_cost(&self) -> f64 {
        2.0 * self.instability_penalty * (1.0 + self.worst_case_weight)
    }
}

/// Outcome of one scenario in a detailed evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioScore {
    pub name: String,
    pub status: SimulationStatus,
    pub survived_fraction: f64,
    pub cost: f64,
    /// Present for completed runs.
    pub breakdown: Option<CostBreakdown>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitnessReport {
    pub controller: ControllerKind,
    pub gains: Vec<f64>,
    pub scenarios: Vec<ScenarioScore>,
    pub total: f64,
}

#[derive(Debug, Clone)]
struct PreparedScenario {
    scenario: Scenario,
    plant: DoubleInvertedPendulum,
    initial: State,
}

/// Scores gain vectors of one controller type on a fixed scenario suite.
///
/// Holds only immutable data. Every call builds its own controller and its
/// own random streams, so one evaluator is shared by reference across the
/// PSO worker threads.
#[derive(Debug, Clone)]
pub struct FitnessEvaluator {
    factory: ControllerFactory,
    runner: SimulationRunner,
    controller: ControllerConfig,
    config: FitnessConfig,
    cases: Vec<PreparedScenario>,
}

impl FitnessEvaluator {
    pub fn new(
        factory: ControllerFactory,
        runner: SimulationRunner,
        controller: ControllerConfig,
        config: FitnessConfig,
        suite: &ScenarioSuite,
    ) -> Result<Self, ConfigurationError> {
        config.validate()?;
        controller.validate()?;
        suite.validate()?;
        let sim_dt = runner.config().dt;
        if (controller.dt() - sim_dt).abs() > 1e-12 {
            return Err(ConfigurationError::Relation {
                lhs: "controller.dt",
                lhs_value: controller.dt(),
                relation: "==",
                rhs: "simulation.dt",
                rhs_value: sim_dt,
            });
        }

        let nominal = *factory.nominal().params();
        let cases = suite
            .iter()
            .map(|scenario| {
                let params = match &scenario.plant_scaling {
                    Some(scaling) => nominal.scaled(scaling),
                    None => nominal,
                };
                let plant = DoubleInvertedPendulum::new(params).map_err(|e| {
                    ConfigurationError::InvalidScenario {
                        name: scenario.name.clone(),
                        reason: e.to_string(),
                    }
                })?;
                Ok(PreparedScenario {
                    scenario: scenario.clone(),
                    plant,
                    initial: scenario.initial(),
                })
            })
            .collect::<Result<Vec<_>, ConfigurationError>>()?;

        Ok(Self {
            factory,
            runner,
            controller,
            config,
            cases,
        })
    }

    pub fn kind(&self) -> ControllerKind {
        self.controller.kind()
    }

    pub fn descriptor(&self) -> &ControllerDescriptor {
        self.factory.descriptor(self.kind())
    }

    pub fn config(&self) -> &FitnessConfig {
        &self.config
    }

    pub fn runner(&self) -> &SimulationRunner {
        &self.runner
    }

    pub fn scenario_count(&self) -> usize {
        self.cases.len()
    }

    /// Aggregated cost of `gains`, noise drawn from stream 0.
    pub fn evaluate(&self, gains: &[f64]) -> f64 {
        self.evaluate_seeded(gains, 0)
    }

    /// Aggregated cost of `gains` with measurement noise drawn from `stream`.
    /// Gains the factory rejects cost `worst_possible_cost()`.
    pub fn evaluate_seeded(&self, gains: &[f64], stream: u64) -> f64 {
        let controller = match self.factory.create(self.kind(), gains, &self.controller) {
            Ok(c) => c,
            Err(e) => {
                debug!(error = %e, "rejected gain vector");
                return self.config.worst_possible_cost();
            }
        };
        let costs = self.cases.iter().enumerate().map(|(i, case)| {
            let result = self.simulate(controller.as_ref(), case, stream, i);
            (self.config.scenario_cost(&result), case.scenario.weight)
        });
        self.config.aggregate(costs)
    }

    /// Per-scenario outcomes of `gains`. Unlike `evaluate`, invalid gains are
    /// returned as an error.
    pub fn report(&self, gains: &[f64], stream: u64) -> Result<FitnessReport, ConfigurationError> {
        let controller = self.factory.create(self.kind(), gains, &self.controller)?;
        let scenarios: Vec<ScenarioScore> = self
            .cases
            .iter()
            .enumerate()
            .map(|(i, case)| {
                let result = self.simulate(controller.as_ref(), case, stream, i);
                if !result.status.is_completed() {
                    warn!(
                        scenario = %case.scenario.name,
                        status = result.status.label(),
                        step = result.status.failure_step(),
                        "scenario did not complete"
                    );
                }
                ScenarioScore {
                    name: case.scenario.name.clone(),
                    status: result.status,
                    survived_fraction: result.survived_fraction(),
                    cost: self.config.scenario_cost(&result),
                    breakdown: result
                        .status
                        .is_completed()
                        .then(|| CostBreakdown::from_result(&result, &self.config.state_weights)),
                }
            })
            .collect();
        let total = self.config.aggregate(
            scenarios
                .iter()
                .zip(&self.cases)
                .map(|(score, case)| (score.cost, case.scenario.weight)),
        );
        Ok(FitnessReport {
            controller: self.kind(),
            gains: gains.to_vec(),
            scenarios,
            total,
        })
    }

    fn simulate(
        &self,
        controller: &dyn Controller,
        case: &PreparedScenario,
        stream: u64,
        index: usize,
    ) -> SimulationResult {
        let mut rng = ChaCha8Rng::seed_from_u64(stream);
        rng.set_stream(index as u64);
        self.runner.run_with(
            &case.plant,
            controller,
            &case.initial,
            &case.scenario.disturbance,
            case.scenario.noise.as_ref(),
            &mut rng,
        )
    }
}

impl Objective for FitnessEvaluator {
    fn dimension(&self) -> usize {
        self.descriptor().gain_count()
    }

    fn cost(&self, position: &[f64], stream: u64) -> f64 {
        self.evaluate_seeded(position, stream)
    }
}
