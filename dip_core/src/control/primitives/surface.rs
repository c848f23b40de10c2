// dip_core/src/control/primitives/surface.rs

use crate::control::config::{SurfaceConfig, SurfaceMode};
use crate::error::ConfigurationError;
use crate::models::dynamics::dip::DoubleInvertedPendulum;
use crate::types::{State, POSITIONS, VELOCITIES};
use nalgebra::{Vector3, Vector6};

/// Smallest `|L M^-1 B|` at the upright equilibrium for which a surface is usable.
pub const MIN_AUTHORITY: f64 = 1e-6;

/// Gains shared by every surface: link weights and their bandwidths.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceGains {
    pub c1: f64,
    pub c2: f64,
    pub lambda1: f64,
    pub lambda2: f64,
}

/// Linear sliding surface
/// `s = c1 (th1_dot + l1 th1) + c2 (th2_dot + l2 th2) - k_c (x_dot + l_c x)`,
/// with `theta2 - theta1` replacing `theta2` in relative mode.
///
/// The raw expression is multiplied by a fixed orientation `sigma = sign(L M(0)^-1 B)`
/// so that `s_dot` increases with the applied force and `u ~ -sign(s)` always reaches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlidingSurface {
    /// Oriented coefficients in state order, `s = weights . x`.
    weights: Vector6<f64>,
    orientation: f64,
    authority: f64,
}

impl SlidingSurface {
    /// Builds the surface and orients it against the nominal plant.
    /// Gain positivity is the caller's responsibility (checked by the registry).
    pub fn new(
        gains: SurfaceGains,
        config: &SurfaceConfig,
        nominal: &DoubleInvertedPendulum,
    ) -> Result<Self, ConfigurationError> {
        let SurfaceGains {
            c1,
            c2,
            lambda1,
            lambda2,
        } = gains;
        let cart_pos = -config.cart_gain * config.cart_lambda;
        let cart_vel = -config.cart_gain;
        let raw = match config.mode {
            SurfaceMode::Absolute => Vector6::new(
                cart_pos,
                cart_vel,
                c1 * lambda1,
                c1,
                c2 * lambda2,
                c2,
            ),
            SurfaceMode::Relative => Vector6::new(
                cart_pos,
                cart_vel,
                c1 * lambda1 - c2 * lambda2,
                c1 - c2,
                c2 * lambda2,
                c2,
            ),
        };

        let upright = State::zeros();
        let b_eff = nominal.solve_mass(
            &nominal.mass_matrix(&upright),
            &DoubleInvertedPendulum::input_vector(),
        );
        let authority = Vector3::from(VELOCITIES.map(|v| raw[v.index()])).dot(&b_eff);
        if !authority.is_finite() || authority.abs() < MIN_AUTHORITY {
            return Err(ConfigurationError::SingularSurface { authority });
        }
        let orientation = authority.signum();

        Ok(Self {
            weights: raw * orientation,
            orientation,
            authority: authority.abs(),
        })
    }

    pub fn compute(&self, x: &State) -> f64 {
        self.weights.dot(x)
    }

    /// Coefficients multiplying the generalized velocities `[x_dot, th1_dot, th2_dot]`.
    pub fn velocity_weights(&self) -> Vector3<f64> {
        Vector3::from(VELOCITIES.map(|v| self.weights[v.index()]))
    }

    /// Coefficients multiplying the generalized positions `[x, th1, th2]`.
    pub fn position_weights(&self) -> Vector3<f64> {
        Vector3::from(POSITIONS.map(|v| self.weights[v.index()]))
    }

    pub fn weights(&self) -> &Vector6<f64> {
        &self.weights
    }

    /// `+1` or `-1`, the factor applied to the raw surface expression.
    pub fn orientation(&self) -> f64 {
        self.orientation
    }

    /// `|L M(0)^-1 B|` on the nominal plant.
    pub fn authority(&self) -> f64 {
        self.authority
    }
}
