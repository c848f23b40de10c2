// dip_core/src/models/dynamics/mod.rs

use crate::types::{Control, State};
use crate::utils::integrators::{Integrator, StepResult};
use std::fmt::Debug;

// --- DYNAMICS MODEL TRAIT ---
// Represents the physics of the simulated plant. `x_dot = f(x, u, t)`
/// Implementations must be `Send + Sync` so one model can be shared by
/// every particle evaluation running on the thread pool.
pub trait Dynamics: Debug + Send + Sync {
    /// Computes the time derivative of the state vector: `x_dot = f(x, u, t)`.
    ///
    /// A degenerate configuration (singular mass matrix) yields a non-finite
    /// derivative instead of an error; the simulation runner classifies it.
    fn get_derivatives(&self, x: &State, u: Control, t: f64) -> State;

    /// Propagates the state forward by `dt` with `u` held constant over the step.
    fn propagate(
        &self,
        x: &State,
        u: Control,
        t: f64,
        dt: f64,
        integrator: &dyn Integrator,
    ) -> StepResult {
        let func = |func_x: &State, func_t: f64| -> State { self.get_derivatives(func_x, u, func_t) };
        integrator.step(&func, x, t, dt)
    }
}

pub mod dip;
pub mod params;
