// dip_core/src/types.rs

use nalgebra::{Vector3, Vector6};
use serde::{Deserialize, Serialize};

// --- Core Type Aliases ---
/// Full plant state `[x, x_dot, theta1, theta1_dot, theta2, theta2_dot]`.
pub type State = Vector6<f64>;
/// Horizontal force applied to the cart, in newtons.
pub type Control = f64;

/// The dimension of the plant state vector.
pub const STATE_DIM: usize = 6;

/// An enum naming every variable that can exist in the plant state vector.
/// The discriminant is the index of the variable inside `State`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateVariable {
    // --- Cart ---
    CartPosition = 0,
    CartVelocity = 1,
    // --- Lower link (absolute angle from the upright vertical) ---
    Theta1 = 2,
    Theta1Dot = 3,
    // --- Upper link (absolute angle from the upright vertical) ---
    Theta2 = 4,
    Theta2Dot = 5,
}

impl StateVariable {
    /// Index of this variable inside a `State`.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Reads this variable out of `x`.
    pub fn of(self, x: &State) -> f64 {
        x[self.index()]
    }
}

/// The ordered state layout of the double inverted pendulum. Trajectory files
/// carry it as their column labels.
pub const STATE_LAYOUT: [StateVariable; STATE_DIM] = [
    StateVariable::CartPosition,
    StateVariable::CartVelocity,
    StateVariable::Theta1,
    StateVariable::Theta1Dot,
    StateVariable::Theta2,
    StateVariable::Theta2Dot,
];

/// Builds a `State` from a flat slice, returning `None` when the length is wrong.
pub fn state_from_slice(values: &[f64]) -> Option<State> {
    if values.len() != STATE_DIM {
        return None;
    }
    Some(State::from_column_slice(values))
}

/// Generalized coordinates `[x, theta1, theta2]`.
pub const POSITIONS: [StateVariable; 3] = [
    StateVariable::CartPosition,
    StateVariable::Theta1,
    StateVariable::Theta2,
];

/// Generalized velocities `[x_dot, theta1_dot, theta2_dot]`.
pub const VELOCITIES: [StateVariable; 3] = [
    StateVariable::CartVelocity,
    StateVariable::Theta1Dot,
    StateVariable::Theta2Dot,
];

/// `q_dot = [x_dot, theta1_dot, theta2_dot]` read out of a full state.
pub fn generalized_velocities(x: &State) -> Vector3<f64> {
    Vector3::from(VELOCITIES.map(|v| v.of(x)))
}

/// Link angles `(theta1, theta2)`.
pub fn link_angles(x: &State) -> (f64, f64) {
    (StateVariable::Theta1.of(x), StateVariable::Theta2.of(x))
}

/// Upright equilibrium with both links perturbed by the same angle.
pub fn perturbed_upright(theta1: f64, theta2: f64) -> State {
    State::new(0.0, 0.0, theta1, 0.0, theta2, 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_matches_state_indices() {
        for (i, variable) in STATE_LAYOUT.iter().enumerate() {
            assert_eq!(variable.index(), i);
        }
        let x = State::new(0.1, 0.2, 0.3, 0.4, 0.5, 0.6);
        assert_eq!(StateVariable::Theta1.of(&x), 0.3);
        assert_eq!(StateVariable::Theta2.of(&x), 0.5);
        assert_eq!(POSITIONS.map(|v| v.of(&x)), [0.1, 0.3, 0.5]);
        assert_eq!(VELOCITIES.map(|v| v.of(&x)), [0.2, 0.4, 0.6]);
        assert_eq!(generalized_velocities(&x), Vector3::new(0.2, 0.4, 0.6));
        assert_eq!(link_angles(&x), (0.3, 0.5));
    }
}
