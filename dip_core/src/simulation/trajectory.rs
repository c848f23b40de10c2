// dip_core/src/simulation/trajectory.rs

use crate::types::State;
use serde::{Deserialize, Serialize};

/// Why a run stopped before its last step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DivergenceReason {
    AngleLimit,
    TrackLimit,
}

/// Termination status of one simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SimulationStatus {
    Completed,
    /// A link angle or the cart left its physical bounds at `step`.
    Diverged { step: usize, reason: DivergenceReason },
    /// The command stayed pinned at the force limit until `step`.
    Saturated { step: usize },
    /// The plant state became NaN or infinite at `step`.
    NonFinite { step: usize },
}

impl SimulationStatus {
    pub fn is_completed(&self) -> bool {
        matches!(self, SimulationStatus::Completed)
    }

    /// Step index at which an early termination happened.
    pub fn failure_step(&self) -> Option<usize> {
        match *self {
            SimulationStatus::Completed => None,
            SimulationStatus::Diverged { step, .. }
            | SimulationStatus::Saturated { step }
            | SimulationStatus::NonFinite { step } => Some(step),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SimulationStatus::Completed => "completed",
            SimulationStatus::Diverged { .. } => "diverged",
            SimulationStatus::Saturated { .. } => "saturated",
            SimulationStatus::NonFinite { .. } => "non_finite",
        }
    }
}

/// Time-ordered record of one run. Sample `k` holds the state at `times[k]`,
/// the command computed from it and the surface value at that instant.
/// `final_state` is the state after the last recorded command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub dt: f64,
    pub times: Vec<f64>,
    pub states: Vec<State>,
    pub controls: Vec<f64>,
    pub surfaces: Vec<f64>,
    pub final_state: State,
}

impl Trajectory {
    pub fn with_capacity(dt: f64, initial: State, capacity: usize) -> Self {
        Self {
            dt,
            times: Vec::with_capacity(capacity),
            states: Vec::with_capacity(capacity),
            controls: Vec::with_capacity(capacity),
            surfaces: Vec::with_capacity(capacity),
            final_state: initial,
        }
    }

    pub fn push(&mut self, t: f64, state: State, control: f64, surface: f64) {
        self.times.push(t);
        self.states.push(state);
        self.controls.push(control);
        self.surfaces.push(surface);
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Every recorded state followed by the final state.
    pub fn state_path(&self) -> impl Iterator<Item = &State> + '_ {
        self.states.iter().chain(std::iter::once(&self.final_state))
    }
}

/// Output of one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub status: SimulationStatus,
    /// Number of steps the run was asked for.
    pub requested_steps: usize,
    pub trajectory: Trajectory,
}

impl SimulationResult {
    /// Fraction of the requested horizon that was simulated, in `[0, 1]`.
    pub fn survived_fraction(&self) -> f64 {
        if self.requested_steps == 0 {
            return 1.0;
        }
        match self.status.failure_step() {
            None => 1.0,
            Some(step) => (step as f64 / self.requested_steps as f64).clamp(0.0, 1.0),
        }
    }
}
