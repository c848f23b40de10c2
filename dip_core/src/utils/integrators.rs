// dip_core/src/utils/integrators.rs

use crate::error::ConfigurationError;
use crate::types::{State, STATE_DIM};
use crate::utils::safety::all_finite;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Outcome of advancing a state over one outer timestep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepResult {
    pub state: State,
    /// Internal sub-steps consumed. Always 1 for the fixed-step schemes.
    pub substeps: u32,
}

pub trait Integrator: Debug + Send + Sync {
    /// Advances `x0` from `t0` to `t0 + dt` under `x_dot = func(x, t)`.
    fn step(&self, func: &dyn Fn(&State, f64) -> State, x0: &State, t0: f64, dt: f64) -> StepResult;
}

// --- Fixed-step schemes ---

/// Explicit Euler, `O(dt)` local error.
#[derive(Debug, Default, Clone, Copy)]
pub struct Euler;

impl Integrator for Euler {
    fn step(&self, func: &dyn Fn(&State, f64) -> State, x0: &State, t0: f64, dt: f64) -> StepResult {
        StepResult {
            state: x0 + func(x0, t0) * dt,
            substeps: 1,
        }
    }
}

/// Classic fourth-order Runge-Kutta.
#[derive(Debug, Default, Clone, Copy)]
pub struct RK4;

impl Integrator for RK4 {
    fn step(&self, func: &dyn Fn(&State, f64) -> State, x0: &State, t0: f64, dt: f64) -> StepResult {
        let half = 0.5 * dt;
        let k1 = func(x0, t0);
        let k2 = func(&(x0 + k1 * half), t0 + half);
        let k3 = func(&(x0 + k2 * half), t0 + half);
        let k4 = func(&(x0 + k3 * dt), t0 + dt);
        StepResult {
            state: x0 + (k1 + k2 * 2.0 + k3 * 2.0 + k4) * (dt / 6.0),
            substeps: 1,
        }
    }
}

// --- Adaptive scheme ---

// Dormand-Prince 5(4) tableau.
const C2: f64 = 1.0 / 5.0;
const C3: f64 = 3.0 / 10.0;
const C4: f64 = 4.0 / 5.0;
const C5: f64 = 8.0 / 9.0;

const A21: f64 = 1.0 / 5.0;
const A31: f64 = 3.0 / 40.0;
const A32: f64 = 9.0 / 40.0;
const A41: f64 = 44.0 / 45.0;
const A42: f64 = -56.0 / 15.0;
const A43: f64 = 32.0 / 9.0;
const A51: f64 = 19372.0 / 6561.0;
const A52: f64 = -25360.0 / 2187.0;
const A53: f64 = 64448.0 / 6561.0;
const A54: f64 = -212.0 / 729.0;
const A61: f64 = 9017.0 / 3168.0;
const A62: f64 = -355.0 / 33.0;
const A63: f64 = 46732.0 / 5247.0;
const A64: f64 = 49.0 / 176.0;
const A65: f64 = -5103.0 / 18656.0;
const B1: f64 = 35.0 / 384.0;
const B3: f64 = 500.0 / 1113.0;
const B4: f64 = 125.0 / 192.0;
const B5: f64 = -2187.0 / 6784.0;
const B6: f64 = 11.0 / 84.0;
// Difference between the 5th and embedded 4th order weights.
const E1: f64 = 71.0 / 57600.0;
const E3: f64 = -71.0 / 16695.0;
const E4: f64 = 71.0 / 1920.0;
const E5: f64 = -17253.0 / 339200.0;
const E6: f64 = 22.0 / 525.0;
const E7: f64 = -1.0 / 40.0;

/// Embedded Dormand-Prince RK45 with step halving.
///
/// The outer step is attempted whole; a sub-step whose scaled error norm
/// exceeds one is halved and retried, down to `dt / 2^max_halvings`, below
/// which the step is accepted as-is. After an accepted sub-step the trial
/// size doubles again, never past the remaining interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RK45 {
    pub abs_tol: f64,
    pub rel_tol: f64,
    pub max_halvings: u32,
}

impl Default for RK45 {
    fn default() -> Self {
        Self {
            abs_tol: 1e-8,
            rel_tol: 1e-6,
            max_halvings: 12,
        }
    }
}

impl RK45 {
    /// Single Dormand-Prince attempt, returning the 5th-order solution and its error norm.
    fn attempt(&self, func: &dyn Fn(&State, f64) -> State, x0: &State, t0: f64, h: f64) -> (State, f64) {
        let k1 = func(x0, t0);
        let k2 = func(&(x0 + k1 * (h * A21)), t0 + C2 * h);
        let k3 = func(&(x0 + (k1 * A31 + k2 * A32) * h), t0 + C3 * h);
        let k4 = func(&(x0 + (k1 * A41 + k2 * A42 + k3 * A43) * h), t0 + C4 * h);
        let k5 = func(
            &(x0 + (k1 * A51 + k2 * A52 + k3 * A53 + k4 * A54) * h),
            t0 + C5 * h,
        );
        let k6 = func(
            &(x0 + (k1 * A61 + k2 * A62 + k3 * A63 + k4 * A64 + k5 * A65) * h),
            t0 + h,
        );
        let x1 = x0 + (k1 * B1 + k3 * B3 + k4 * B4 + k5 * B5 + k6 * B6) * h;
        let k7 = func(&x1, t0 + h);
        let err = (k1 * E1 + k3 * E3 + k4 * E4 + k5 * E5 + k6 * E6 + k7 * E7) * h;

        let mut norm: f64 = 0.0;
        for i in 0..STATE_DIM {
            let scale = self.abs_tol + self.rel_tol * x0[i].abs().max(x1[i].abs());
            let ratio = err[i].abs() / scale;
            // NaN must reject the step, so compare explicitly instead of `max`.
            if !(ratio <= norm) {
                norm = ratio;
            }
        }
        (x1, norm)
    }
}

impl Integrator for RK45 {
    fn step(&self, func: &dyn Fn(&State, f64) -> State, x0: &State, t0: f64, dt: f64) -> StepResult {
        let tf = t0 + dt;
        let h_min = dt / f64::from(1u32 << self.max_halvings.min(30));
        let mut x = *x0;
        let mut t = t0;
        let mut h = dt;
        let mut substeps = 0u32;

        while tf - t > h_min * 1e-3 {
            h = h.min(tf - t);
            let (x_next, norm) = self.attempt(func, &x, t, h);
            if norm <= 1.0 || h <= h_min {
                x = x_next;
                t += h;
                substeps += 1;
                if !all_finite(x.iter()) {
                    break;
                }
                if norm <= 0.5 {
                    h *= 2.0;
                }
            } else {
                h *= 0.5;
            }
        }

        StepResult { state: x, substeps }
    }
}

// --- Configuration ---

/// Serializable choice of integration scheme.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum IntegrationMethod {
    Euler,
    #[default]
    Rk4,
    Rk45(RK45),
}

impl IntegrationMethod {
    /// Returns the integrator this method describes.
    pub fn integrator(&self) -> &dyn Integrator {
        match self {
            IntegrationMethod::Euler => &Euler,
            IntegrationMethod::Rk4 => &RK4,
            IntegrationMethod::Rk45(rk45) => rk45,
        }
    }
}

// --- Batched path ---

/// Advances a batch of independent trajectories stored column-wise in a
/// `STATE_DIM x N` matrix. Each column goes through exactly the same
/// arithmetic as the scalar `step`, so results match the scalar path bit for bit.
///
/// Returns the next states and the sub-step count per column. `controls`
/// must hold one entry per column and `states` must have `STATE_DIM` rows.
pub fn step_batch<F>(
    integrator: &dyn Integrator,
    func: F,
    states: &DMatrix<f64>,
    controls: &[f64],
    t0: f64,
    dt: f64,
) -> Result<(DMatrix<f64>, Vec<u32>), ConfigurationError>
where
    F: Fn(&State, f64, f64) -> State,
{
    if states.nrows() != STATE_DIM {
        return Err(ConfigurationError::LengthMismatch {
            what: "batch state rows",
            expected: STATE_DIM,
            actual: states.nrows(),
        });
    }
    let n = states.ncols();
    if controls.len() != n {
        return Err(ConfigurationError::LengthMismatch {
            what: "batch controls",
            expected: n,
            actual: controls.len(),
        });
    }
    let mut next = DMatrix::zeros(STATE_DIM, n);
    let mut substeps = Vec::with_capacity(n);

    for (j, &u) in controls.iter().enumerate() {
        let x0 = State::from_iterator(states.column(j).iter().copied());
        let result = integrator.step(&|x, t| func(x, u, t), &x0, t0, dt);
        next.set_column(j, &result.state);
        substeps.push(result.substeps);
    }

    Ok((next, substeps))
}
