// dip_core/src/control/classical.rs

use super::config::ClassicalConfig;
use super::primitives::{EquivalentControl, SlidingSurface, SurfaceGains, SwitchingFunction};
use super::{finish, ControlOutput, Controller, ControllerKind, ControllerState};
use crate::error::ConfigurationError;
use crate::models::dynamics::dip::DoubleInvertedPendulum;
use crate::types::State;

/// Classical SMC: `u = u_eq - K switch(s) - k_d s`, saturated to `+-max_force`.
///
/// Gains: `[c1, c2, lambda1, lambda2, K, kd]`.
#[derive(Debug, Clone)]
pub struct ClassicalSmc {
    gains: [f64; 6],
    config: ClassicalConfig,
    surface: SlidingSurface,
    switching: SwitchingFunction,
    equivalent: EquivalentControl,
}

impl ClassicalSmc {
    pub fn new(
        gains: [f64; 6],
        config: ClassicalConfig,
        nominal: &DoubleInvertedPendulum,
    ) -> Result<Self, ConfigurationError> {
        config.validate()?;
        let [c1, c2, lambda1, lambda2, _, _] = gains;
        let surface = SlidingSurface::new(
            SurfaceGains {
                c1,
                c2,
                lambda1,
                lambda2,
            },
            &config.surface,
            nominal,
        )?;
        Ok(Self {
            gains,
            switching: SwitchingFunction::new(config.switching, config.boundary_layer, 0.0),
            equivalent: EquivalentControl::new(*nominal, &config.equivalent, config.max_force),
            surface,
            config,
        })
    }

    pub fn surface(&self) -> &SlidingSurface {
        &self.surface
    }
}

impl Controller for ClassicalSmc {
    fn kind(&self) -> ControllerKind {
        ControllerKind::ClassicalSmc
    }

    fn gains(&self) -> &[f64] {
        &self.gains
    }

    fn max_force(&self) -> f64 {
        self.config.max_force
    }

    fn reset(&self) -> ControllerState {
        ControllerState::default()
    }

    fn control_law(&self, x: &State, history: &ControllerState) -> ControlOutput {
        let [_, _, _, _, k_switch, kd] = self.gains;
        let s = self.surface.compute(x);
        let u_eq = self.equivalent.compute(x, &self.surface);
        let raw = u_eq - k_switch * self.switching.compute(s) - kd * s;

        let state = ControllerState {
            last_raw_control: raw,
            step: history.step + 1,
            ..*history
        };
        finish(raw, self.config.max_force, s, u_eq, state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::dynamics::params::PhysicsParams;

    fn controller() -> ClassicalSmc {
        let plant = DoubleInvertedPendulum::new(PhysicsParams::default()).unwrap();
        ClassicalSmc::new(
            [2.0, 2.5, 3.0, 5.0, 35.0, 5.0],
            ClassicalConfig::default(),
            &plant,
        )
        .unwrap()
    }

    #[test]
    fn pushes_against_the_surface() {
        let c = controller();
        let history = c.reset();
        let x = State::new(0.0, 0.0, 0.05, 0.0, 0.05, 0.0);
        let out = c.compute_control(&x, 0.0, &history);
        let s = out.diagnostics.surface;
        assert!(s != 0.0);
        // The switching and damping terms oppose s.
        assert!((out.diagnostics.raw_control - out.diagnostics.equivalent) * s < 0.0);
        assert_eq!(out.state.step, 1);
    }

    #[test]
    fn output_is_saturated() {
        let c = controller();
        let x = State::new(0.0, 0.0, 1.2, 8.0, -1.0, -9.0);
        let out = c.compute_control(&x, 0.0, &c.reset());
        assert!(out.force.abs() <= 150.0);
        assert!(out.diagnostics.saturated);
    }

    #[test]
    fn non_finite_state_holds_previous_command() {
        let c = controller();
        let x = State::new(0.0, f64::NAN, 0.05, 0.0, 0.05, 0.0);
        let history = c.reset();
        let out = c.compute_control(&x, 12.5, &history);
        assert_eq!(out.force, 12.5);
        assert_eq!(out.state, history);
        assert!(out.diagnostics.held);
    }
}
