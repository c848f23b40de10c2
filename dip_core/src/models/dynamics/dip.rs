// dip_core/src/models/dynamics/dip.rs

use super::params::PhysicsParams;
use super::Dynamics;
use crate::error::ConfigurationError;
use crate::types::{generalized_velocities, link_angles, Control, State};
use nalgebra::{Matrix3, Vector3};

/// Regularization added to the diagonal when the Cholesky solve of `M` fails.
const FALLBACK_REGULARIZATION: f64 = 1e-9;

/// Double inverted pendulum on a cart.
///
/// Generalized coordinates `q = [x, theta1, theta2]`, absolute link angles
/// measured from the upright vertical (counter-clockwise positive, `x` to the
/// right). Equations of motion: `M(q) q_dd + C(q, q_d) q_d + G(q) = B u`
/// with `B = [1, 0, 0]^T`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DoubleInvertedPendulum {
    params: PhysicsParams,
    // Lumped coefficients, computed once.
    total_mass: f64,
    a1: f64,
    a2: f64,
    a12: f64,
    j1: f64,
    j2: f64,
}

impl DoubleInvertedPendulum {
    pub fn new(params: PhysicsParams) -> Result<Self, ConfigurationError> {
        params.validate()?;
        let p = &params;
        Ok(Self {
            params,
            total_mass: p.cart_mass + p.link1_mass + p.link2_mass,
            a1: p.link1_mass * p.link1_com + p.link2_mass * p.link1_length,
            a2: p.link2_mass * p.link2_com,
            a12: p.link2_mass * p.link1_length * p.link2_com,
            j1: p.link1_mass * p.link1_com.powi(2)
                + p.link2_mass * p.link1_length.powi(2)
                + p.link1_inertia,
            j2: p.link2_mass * p.link2_com.powi(2) + p.link2_inertia,
        })
    }

    pub fn params(&self) -> &PhysicsParams {
        &self.params
    }

    /// Input matrix `B`.
    pub fn input_vector() -> Vector3<f64> {
        Vector3::new(1.0, 0.0, 0.0)
    }

    pub fn mass_matrix(&self, x: &State) -> Matrix3<f64> {
        let (th1, th2) = link_angles(x);
        let (c1, c2) = (th1.cos(), th2.cos());
        let c12 = (th1 - th2).cos();
        let m01 = -self.a1 * c1;
        let m02 = -self.a2 * c2;
        let m12 = self.a12 * c12;
        Matrix3::new(
            self.total_mass, m01, m02, //
            m01, self.j1, m12, //
            m02, m12, self.j2,
        )
    }

    /// Coriolis/centrifugal matrix with the viscous friction on its diagonal.
    pub fn coriolis_matrix(&self, x: &State) -> Matrix3<f64> {
        let p = &self.params;
        let qd = generalized_velocities(x);
        let (t1d, t2d) = (qd[1], qd[2]);
        let (th1, th2) = link_angles(x);
        let (s1, s2) = (th1.sin(), th2.sin());
        let s12 = (th1 - th2).sin();
        Matrix3::new(
            p.cart_friction, self.a1 * s1 * t1d, self.a2 * s2 * t2d, //
            0.0, p.joint1_friction, self.a12 * s12 * t2d, //
            0.0, -self.a12 * s12 * t1d, p.joint2_friction,
        )
    }

    pub fn gravity_vector(&self, x: &State) -> Vector3<f64> {
        let g = self.params.gravity;
        let (th1, th2) = link_angles(x);
        Vector3::new(0.0, -self.a1 * g * th1.sin(), -self.a2 * g * th2.sin())
    }

    /// Solves `M a = rhs`. Cholesky first, then a regularized LU; a failed
    /// solve returns NaN so the caller sees a non-finite derivative.
    pub fn solve_mass(&self, m: &Matrix3<f64>, rhs: &Vector3<f64>) -> Vector3<f64> {
        if let Some(chol) = m.cholesky() {
            return chol.solve(rhs);
        }
        let regularized = m + Matrix3::identity() * FALLBACK_REGULARIZATION;
        regularized
            .lu()
            .solve(rhs)
            .unwrap_or_else(|| Vector3::repeat(f64::NAN))
    }

    /// Generalized accelerations `q_dd` for a given state and cart force.
    pub fn accelerations(&self, x: &State, u: Control) -> Vector3<f64> {
        let qd = generalized_velocities(x);
        let rhs = Self::input_vector() * u - self.coriolis_matrix(x) * qd - self.gravity_vector(x);
        self.solve_mass(&self.mass_matrix(x), &rhs)
    }

    /// Kinetic plus potential energy (potential measured from the pivot height).
    pub fn total_energy(&self, x: &State) -> f64 {
        let qd = generalized_velocities(x);
        let kinetic = 0.5 * qd.dot(&(self.mass_matrix(x) * qd));
        let (th1, th2) = link_angles(x);
        let potential = self.params.gravity * (self.a1 * th1.cos() + self.a2 * th2.cos());
        kinetic + potential
    }
}

impl Dynamics for DoubleInvertedPendulum {
    fn get_derivatives(&self, x: &State, u: Control, _t: f64) -> State {
        let qd = generalized_velocities(x);
        let qdd = self.accelerations(x, u);
        State::new(qd[0], qdd[0], qd[1], qdd[1], qd[2], qdd[2])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::integrators::{Integrator, RK4};
    use approx::assert_relative_eq;

    fn nominal() -> DoubleInvertedPendulum {
        DoubleInvertedPendulum::new(PhysicsParams::default()).unwrap()
    }

    #[test]
    fn upright_equilibrium_is_stationary() {
        let plant = nominal();
        let xdot = plant.get_derivatives(&State::zeros(), 0.0, 0.0);
        assert_relative_eq!(xdot, State::zeros(), epsilon = 1e-12);
    }

    #[test]
    fn mass_matrix_is_symmetric_positive_definite() {
        let plant = nominal();
        let x = State::new(0.3, 0.0, 0.7, 1.0, -1.2, 0.5);
        let m = plant.mass_matrix(&x);
        assert_relative_eq!(m, m.transpose());
        assert!(m.cholesky().is_some());
    }

    #[test]
    fn positive_lean_falls_further() {
        let plant = nominal();
        let xdot = plant.get_derivatives(&State::new(0.0, 0.0, 0.05, 0.0, 0.05, 0.0), 0.0, 0.0);
        assert!(xdot[3] > 0.0);
        assert!(xdot[5] > 0.0);
    }

    #[test]
    fn pushing_the_cart_right_tips_the_links_left() {
        let plant = nominal();
        let xdot = plant.get_derivatives(&State::zeros(), 10.0, 0.0);
        assert!(xdot[1] > 0.0);
        assert!(xdot[3] > 0.0);
    }

    #[test]
    fn frictionless_swing_conserves_energy() {
        let params = PhysicsParams {
            cart_friction: 0.0,
            joint1_friction: 0.0,
            joint2_friction: 0.0,
            ..Default::default()
        };
        let plant = DoubleInvertedPendulum::new(params).unwrap();
        let mut x = State::new(0.0, 0.0, 0.2, 0.0, -0.1, 0.0);
        let e0 = plant.total_energy(&x);
        for k in 0..200 {
            x = plant.propagate(&x, 0.0, k as f64 * 1e-3, 1e-3, &RK4).state;
        }
        assert_relative_eq!(plant.total_energy(&x), e0, max_relative = 1e-6);
    }

    #[test]
    fn rk4_step_goes_through_trait_default() {
        let plant = nominal();
        let x0 = State::new(0.0, 0.0, 0.05, 0.0, 0.05, 0.0);
        let direct = RK4.step(&|x, t| plant.get_derivatives(x, 1.0, t), &x0, 0.0, 0.01);
        let via_trait = plant.propagate(&x0, 1.0, 0.0, 0.01, &RK4);
        assert_eq!(direct, via_trait);
    }
}
