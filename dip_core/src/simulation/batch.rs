// dip_core/src/simulation/batch.rs

//! Lock-step simulation of many independent trajectories through the
//! batched integrator path.

use super::runner::{SaturationWatch, SimulationRunner};
use super::trajectory::{SimulationResult, SimulationStatus, Trajectory};
use crate::control::{Controller, ControllerState};
use crate::error::ConfigurationError;
use crate::models::dynamics::Dynamics;
use crate::types::{State, STATE_DIM};
use crate::utils::integrators::step_batch;
use nalgebra::DMatrix;
use rayon::prelude::*;

fn check_lanes(controllers: &[Box<dyn Controller>], initial: &[State]) -> Result<(), ConfigurationError> {
    if controllers.len() != initial.len() {
        return Err(ConfigurationError::LengthMismatch {
            what: "initial states",
            expected: controllers.len(),
            actual: initial.len(),
        });
    }
    Ok(())
}

struct Lane {
    history: ControllerState,
    last_control: f64,
    watch: SaturationWatch,
    status: Option<SimulationStatus>,
    trajectory: Trajectory,
}

impl SimulationRunner {
    /// Simulates `initial.len()` runs side by side, column `j` of the state
    /// matrix belonging to `controllers[j]`. Every lane goes through the same
    /// arithmetic as `run`, so each result equals the scalar one exactly.
    ///
    /// Fails when the two slices differ in length.
    pub fn run_batch<D: Dynamics + ?Sized>(
        &self,
        plant: &D,
        controllers: &[Box<dyn Controller>],
        initial: &[State],
    ) -> Result<Vec<SimulationResult>, ConfigurationError> {
        check_lanes(controllers, initial)?;
        let cfg = self.config();
        let dt = cfg.dt;
        let requested_steps = cfg.steps();
        let integrator = cfg.integration.integrator();
        let n = controllers.len();

        let mut states = DMatrix::zeros(STATE_DIM, n);
        let mut lanes: Vec<Lane> = Vec::with_capacity(n);
        for (j, (controller, x0)) in controllers.iter().zip(initial).enumerate() {
            states.set_column(j, x0);
            lanes.push(Lane {
                history: controller.reset(),
                last_control: 0.0,
                watch: SaturationWatch::default(),
                status: cfg.limits.classify(x0, 0),
                trajectory: Trajectory::with_capacity(dt, *x0, requested_steps),
            });
        }

        let mut controls = vec![0.0; n];
        let mut saturated = vec![false; n];
        for k in 0..requested_steps {
            if lanes.iter().all(|lane| lane.status.is_some()) {
                break;
            }
            let t = k as f64 * dt;

            for (j, lane) in lanes.iter_mut().enumerate() {
                if lane.status.is_some() {
                    controls[j] = 0.0;
                    saturated[j] = false;
                    continue;
                }
                let x = State::from_iterator(states.column(j).iter().copied());
                let out = controllers[j].compute_control(&x, lane.last_control, &lane.history);
                lane.trajectory.push(t, x, out.force, out.diagnostics.surface);
                lane.history = out.state;
                lane.last_control = out.force;
                controls[j] = out.force;
                saturated[j] = out.diagnostics.saturated;
            }

            let (next, _) = step_batch(
                integrator,
                |x, u, tt| plant.get_derivatives(x, u, tt),
                &states,
                &controls,
                t,
                dt,
            )?;

            for (j, lane) in lanes.iter_mut().enumerate() {
                if lane.status.is_some() {
                    continue;
                }
                let x = State::from_iterator(next.column(j).iter().copied());
                lane.trajectory.final_state = x;
                lane.status = cfg
                    .limits
                    .classify(&x, k + 1)
                    .or_else(|| lane.watch.observe(saturated[j], &cfg.limits, k + 1));
                states.set_column(j, &x);
            }
        }

        Ok(lanes
            .into_iter()
            .map(|lane| SimulationResult {
                status: lane.status.unwrap_or(SimulationStatus::Completed),
                requested_steps,
                trajectory: lane.trajectory,
            })
            .collect())
    }

    /// Independent runs distributed over the rayon pool, returned in input order.
    pub fn run_many<D: Dynamics + ?Sized>(
        &self,
        plant: &D,
        controllers: &[Box<dyn Controller>],
        initial: &[State],
    ) -> Result<Vec<SimulationResult>, ConfigurationError> {
        check_lanes(controllers, initial)?;
        Ok(controllers
            .par_iter()
            .zip(initial.par_iter())
            .map(|(controller, x0)| self.run(plant, controller.as_ref(), x0))
            .collect())
    }
}
