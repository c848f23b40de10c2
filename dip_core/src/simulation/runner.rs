// dip_core/src/simulation/runner.rs

use super::disturbance::{Disturbance, MeasurementNoise};
use super::trajectory::{DivergenceReason, SimulationResult, SimulationStatus, Trajectory};
use crate::control::Controller;
use crate::error::{check, ConfigurationError};
use crate::models::dynamics::Dynamics;
use crate::types::State;
use crate::types::StateVariable::{CartPosition, Theta1, Theta2};
use crate::utils::integrators::IntegrationMethod;
use crate::utils::safety::all_finite;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;
use tracing::debug;

/// Physical bounds past which a run is stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TerminationLimits {
    /// Largest admissible `|theta1|`, `|theta2|` [rad].
    pub max_angle: f64,
    /// Largest admissible `|x|` [m].
    pub track_limit: f64,
    /// Consecutive saturated commands that end a run.
    pub saturation_steps: usize,
    pub enforce_saturation: bool,
}

impl Default for TerminationLimits {
    fn default() -> Self {
        Self {
            max_angle: FRAC_PI_2,
            track_limit: 2.4,
            saturation_steps: 500,
            enforce_saturation: true,
        }
    }
}

impl TerminationLimits {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        check::positive("limits.max_angle", self.max_angle)?;
        check::at_most(
            "limits.max_angle",
            self.max_angle,
            "pi",
            std::f64::consts::PI,
        )?;
        check::positive("limits.track_limit", self.track_limit)?;
        check::positive("limits.saturation_steps", self.saturation_steps as f64)
    }

    /// Classifies the state reached at `step`, `None` while the run may continue.
    pub fn classify(&self, x: &State, step: usize) -> Option<SimulationStatus> {
        if !all_finite(x.iter()) {
            return Some(SimulationStatus::NonFinite { step });
        }
        if Theta1.of(x).abs() > self.max_angle || Theta2.of(x).abs() > self.max_angle {
            return Some(SimulationStatus::Diverged {
                step,
                reason: DivergenceReason::AngleLimit,
            });
        }
        if CartPosition.of(x).abs() > self.track_limit {
            return Some(SimulationStatus::Diverged {
                step,
                reason: DivergenceReason::TrackLimit,
            });
        }
        None
    }
}

/// Upper bound on `duration / dt`; trajectories are preallocated at this length.
pub const MAX_STEPS: usize = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationConfig {
    pub dt: f64,
    pub duration: f64,
    pub integration: IntegrationMethod,
    pub limits: TerminationLimits,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            dt: 0.01,
            duration: 10.0,
            integration: IntegrationMethod::Rk4,
            limits: TerminationLimits::default(),
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        check::positive("simulation.dt", self.dt)?;
        check::positive("simulation.duration", self.duration)?;
        check::at_most("simulation.dt", self.dt, "simulation.duration", self.duration)?;
        check::at_most(
            "simulation.duration / simulation.dt",
            self.duration / self.dt,
            "max_steps",
            MAX_STEPS as f64,
        )?;
        if let IntegrationMethod::Rk45(rk45) = self.integration {
            check::positive("rk45.abs_tol", rk45.abs_tol)?;
            check::positive("rk45.rel_tol", rk45.rel_tol)?;
        }
        self.limits.validate()
    }

    /// Number of control steps in one run.
    pub fn steps(&self) -> usize {
        (self.duration / self.dt).round() as usize
    }
}

/// Counts consecutive saturated commands.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct SaturationWatch {
    run: usize,
}

impl SaturationWatch {
    pub(crate) fn observe(&mut self, saturated: bool, limits: &TerminationLimits, step: usize) -> Option<SimulationStatus> {
        self.run = if saturated { self.run + 1 } else { 0 };
        if limits.enforce_saturation && self.run >= limits.saturation_steps {
            Some(SimulationStatus::Saturated { step })
        } else {
            None
        }
    }
}

/// Drives a controller and a plant through one or many runs.
#[derive(Debug, Clone)]
pub struct SimulationRunner {
    config: SimulationConfig,
}

impl SimulationRunner {
    pub fn new(config: SimulationConfig) -> Result<Self, ConfigurationError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Undisturbed, noise-free run.
    pub fn run<D: Dynamics + ?Sized>(
        &self,
        plant: &D,
        controller: &dyn Controller,
        x0: &State,
    ) -> SimulationResult {
        // The generator is never drawn from without noise.
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        self.run_with(plant, controller, x0, &Disturbance::None, None, &mut rng)
    }

    /// Full run: `disturbance` is added to the applied force and `noise`
    /// corrupts the state the controller sees, drawing from `rng`.
    pub fn run_with<D, R>(
        &self,
        plant: &D,
        controller: &dyn Controller,
        x0: &State,
        disturbance: &Disturbance,
        noise: Option<&MeasurementNoise>,
        rng: &mut R,
    ) -> SimulationResult
    where
        D: Dynamics + ?Sized,
        R: Rng + ?Sized,
    {
        let cfg = &self.config;
        let dt = cfg.dt;
        let requested_steps = cfg.steps();
        let integrator = cfg.integration.integrator();
        let mut trajectory = Trajectory::with_capacity(dt, *x0, requested_steps);

        if let Some(status) = cfg.limits.classify(x0, 0) {
            return SimulationResult {
                status,
                requested_steps,
                trajectory,
            };
        }

        let mut x = *x0;
        let mut history = controller.reset();
        let mut last_control = 0.0;
        let mut watch = SaturationWatch::default();
        let mut status = SimulationStatus::Completed;

        for k in 0..requested_steps {
            let t = k as f64 * dt;
            let measured = match noise {
                Some(model) => model.corrupt(&x, rng),
                None => x,
            };
            let out = controller.compute_control(&measured, last_control, &history);
            trajectory.push(t, x, out.force, out.diagnostics.surface);

            let applied = out.force + disturbance.force(t);
            x = plant.propagate(&x, applied, t, dt, integrator).state;
            trajectory.final_state = x;
            history = out.state;
            last_control = out.force;

            if let Some(stop) = cfg
                .limits
                .classify(&x, k + 1)
                .or_else(|| watch.observe(out.diagnostics.saturated, &cfg.limits, k + 1))
            {
                status = stop;
                break;
            }
        }

        debug!(
            controller = %controller.kind(),
            status = status.label(),
            steps = trajectory.len(),
            "simulation finished"
        );

        SimulationResult {
            status,
            requested_steps,
            trajectory,
        }
    }
}
