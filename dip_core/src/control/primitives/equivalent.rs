// dip_core/src/control/primitives/equivalent.rs

use super::surface::SlidingSurface;
use crate::control::config::EquivalentConfig;
use crate::models::dynamics::dip::DoubleInvertedPendulum;
use crate::types::{generalized_velocities, State};
use crate::utils::safety::saturate;
use nalgebra::Matrix3;

/// Below this `|L M_reg^-1 B|` the feedforward is zero.
pub const DENOMINATOR_FLOOR: f64 = 1e-6;

/// Model-based feedforward that keeps `s_dot = 0` on the nominal plant.
///
/// With `s = L q_dot + Lam q`, `s_dot = L M^-1 (B u - C q_dot - G) + Lam q_dot`, so
/// `u_eq = (L M^-1 (C q_dot + G) - Lam q_dot) / (L M^-1 B)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EquivalentControl {
    model: DoubleInvertedPendulum,
    enabled: bool,
    regularization: f64,
    limit: f64,
}

impl EquivalentControl {
    pub fn new(model: DoubleInvertedPendulum, config: &EquivalentConfig, max_force: f64) -> Self {
        Self {
            model,
            enabled: config.enabled,
            regularization: config.regularization,
            limit: config.clamp_factor * max_force,
        }
    }

    pub fn limit(&self) -> f64 {
        self.limit
    }

    pub fn compute(&self, x: &State, surface: &SlidingSurface) -> f64 {
        if !self.enabled {
            return 0.0;
        }
        let m_reg = self.model.mass_matrix(x) + Matrix3::identity() * self.regularization;
        let chol = match m_reg.cholesky() {
            Some(chol) => chol,
            None => return 0.0,
        };

        let qd = generalized_velocities(x);
        let drift = self.model.coriolis_matrix(x) * qd + self.model.gravity_vector(x);
        let l = surface.velocity_weights();

        let denominator = l.dot(&chol.solve(&DoubleInvertedPendulum::input_vector()));
        if !denominator.is_finite() || denominator.abs() < DENOMINATOR_FLOOR {
            return 0.0;
        }
        let numerator = l.dot(&chol.solve(&drift)) - surface.position_weights().dot(&qd);
        let u_eq = numerator / denominator;
        if u_eq.is_finite() {
            saturate(u_eq, self.limit)
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::config::SurfaceConfig;
    use crate::control::primitives::surface::SurfaceGains;
    use crate::models::dynamics::params::PhysicsParams;
    use crate::models::dynamics::Dynamics;
    use approx::assert_abs_diff_eq;

    fn setup() -> (DoubleInvertedPendulum, SlidingSurface) {
        let plant = DoubleInvertedPendulum::new(PhysicsParams::default()).unwrap();
        let surface = SlidingSurface::new(
            SurfaceGains {
                c1: 2.0,
                c2: 2.5,
                lambda1: 3.0,
                lambda2: 5.0,
            },
            &SurfaceConfig::default(),
            &plant,
        )
        .unwrap();
        (plant, surface)
    }

    #[test]
    fn equivalent_force_holds_the_surface_still() {
        let (plant, surface) = setup();
        let eq = EquivalentControl::new(plant, &EquivalentConfig::default(), 150.0);
        let x = State::new(0.05, 0.1, 0.04, -0.2, -0.03, 0.15);
        let u = eq.compute(&x, &surface);
        assert!(u.abs() < eq.limit());
        let s_dot = surface.weights().dot(&plant.get_derivatives(&x, u, 0.0));
        assert_abs_diff_eq!(s_dot, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn zero_at_rest_on_the_upright() {
        let (plant, surface) = setup();
        let eq = EquivalentControl::new(plant, &EquivalentConfig::default(), 150.0);
        assert_abs_diff_eq!(eq.compute(&State::zeros(), &surface), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn output_is_clamped_and_can_be_disabled() {
        let (plant, surface) = setup();
        let cfg = EquivalentConfig {
            clamp_factor: 0.01,
            ..Default::default()
        };
        let eq = EquivalentControl::new(plant, &cfg, 150.0);
        let x = State::new(0.0, 0.0, 0.6, 3.0, -0.5, -4.0);
        assert!(eq.compute(&x, &surface).abs() <= 1.5 + 1e-12);

        let off = EquivalentControl::new(
            plant,
            &EquivalentConfig {
                enabled: false,
                ..Default::default()
            },
            150.0,
        );
        assert_eq!(off.compute(&x, &surface), 0.0);
    }
}
