// dip_core/src/control/mod.rs

use crate::types::{Control, State};
use crate::utils::safety::{all_finite, finite_or};
use dyn_clone::DynClone;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

pub mod adaptive;
pub mod classical;
pub mod config;
pub mod factory;
pub mod hybrid;
pub mod primitives;
pub mod registry;
pub mod sta;

pub use registry::ControllerKind;

/// Mutable per-run state of a controller, threaded explicitly through
/// `compute_control`. Fields a variant does not use stay at zero.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ControllerState {
    /// Adapted gains: `[K, 0]` for adaptive SMC, `[k1, k2]` for the hybrid.
    pub adaptive_gains: [f64; 2],
    /// Super-twisting integral term `z`.
    pub integral: f64,
    /// Unsaturated command of the previous step.
    pub last_raw_control: f64,
    /// Number of completed control steps since `reset`.
    pub step: u64,
}

/// Per-step values useful for analysis; never fed back into the controller.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    pub surface: f64,
    pub equivalent: f64,
    pub raw_control: f64,
    pub saturated: bool,
    /// The input state was non-finite and the previous command was held.
    pub held: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlOutput {
    pub force: Control,
    pub state: ControllerState,
    pub diagnostics: Diagnostics,
}

// --- CONTROLLER TRAIT ---
// Every sliding-mode variant: `(x, u_prev, history) -> (u, history', diagnostics)`.
pub trait Controller: DynClone + Debug + Send + Sync {
    fn kind(&self) -> ControllerKind;

    /// The validated gain vector this controller was built with.
    fn gains(&self) -> &[f64];

    fn max_force(&self) -> f64;

    /// Fresh internal state for a new run.
    fn reset(&self) -> ControllerState;

    /// The control law proper. Only called with a finite state.
    fn control_law(&self, x: &State, history: &ControllerState) -> ControlOutput;

    /// Computes the next command. A state with any non-finite component
    /// returns `last_control` unchanged together with the unchanged history.
    fn compute_control(
        &self,
        x: &State,
        last_control: Control,
        history: &ControllerState,
    ) -> ControlOutput {
        if !all_finite(x.iter()) {
            let force = finite_or(last_control, 0.0);
            return ControlOutput {
                force,
                state: *history,
                diagnostics: Diagnostics {
                    raw_control: force,
                    held: true,
                    ..Default::default()
                },
            };
        }
        self.control_law(x, history)
    }
}

// This macro automatically generates the implementation of `Clone` for `Box<dyn Controller>`.
dyn_clone::clone_trait_object!(Controller);

/// Saturates a raw command and fills in the shared diagnostic fields.
pub(crate) fn finish(
    raw: f64,
    max_force: f64,
    surface: f64,
    equivalent: f64,
    state: ControllerState,
) -> ControlOutput {
    let raw = if raw.is_finite() { raw } else { 0.0 };
    let force = raw.clamp(-max_force, max_force);
    ControlOutput {
        force,
        state,
        diagnostics: Diagnostics {
            surface,
            equivalent,
            raw_control: raw,
            saturated: raw.abs() > max_force,
            held: false,
        },
    }
}
