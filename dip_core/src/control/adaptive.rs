// dip_core/src/control/adaptive.rs

use super::config::AdaptiveConfig;
use super::primitives::{
    AdaptationLaw, EquivalentControl, SlidingSurface, SurfaceGains, SwitchingFunction,
};
use super::{finish, ControlOutput, Controller, ControllerKind, ControllerState};
use crate::error::ConfigurationError;
use crate::models::dynamics::dip::DoubleInvertedPendulum;
use crate::types::State;

/// Adaptive SMC: classical structure with the switching gain `K(t)` maintained
/// by an `AdaptationLaw`. `u = u_eq - K(t) switch(s) - damping_gain s`.
///
/// Gains: `[c1, c2, lambda1, lambda2, gamma]`.
#[derive(Debug, Clone)]
pub struct AdaptiveSmc {
    gains: [f64; 5],
    config: AdaptiveConfig,
    surface: SlidingSurface,
    switching: SwitchingFunction,
    equivalent: EquivalentControl,
    adaptation: AdaptationLaw,
}

impl AdaptiveSmc {
    pub fn new(
        gains: [f64; 5],
        config: AdaptiveConfig,
        nominal: &DoubleInvertedPendulum,
    ) -> Result<Self, ConfigurationError> {
        config.validate()?;
        let [c1, c2, lambda1, lambda2, gamma] = gains;
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
        let adaptation = AdaptationLaw {
            gamma,
            dead_zone: config.dead_zone,
            leak_rate: config.leak_rate,
            rate_limit: config.rate_limit,
            k_min: config.k_min,
            k_max: config.k_max,
            equilibrium_band: config.equilibrium_band,
            taper_width: config.taper_width,
            decay_steps: config.decay_steps,
        };
        Ok(Self {
            gains,
            switching: SwitchingFunction::new(
                config.switching,
                config.boundary_layer,
                config.dead_zone,
            ),
            equivalent: EquivalentControl::new(*nominal, &config.equivalent, config.max_force),
            surface,
            adaptation,
            config,
        })
    }

    pub fn adaptation(&self) -> &AdaptationLaw {
        &self.adaptation
    }
}

impl Controller for AdaptiveSmc {
    fn kind(&self) -> ControllerKind {
        ControllerKind::AdaptiveSmc
    }

    fn gains(&self) -> &[f64] {
        &self.gains
    }

    fn max_force(&self) -> f64 {
        self.config.max_force
    }

    fn reset(&self) -> ControllerState {
        ControllerState {
            adaptive_gains: [self.config.k_init, 0.0],
            ..Default::default()
        }
    }

    fn control_law(&self, x: &State, history: &ControllerState) -> ControlOutput {
        let s = self.surface.compute(x);
        let saturated = history.last_raw_control.abs() > self.config.max_force;
        let k = self.adaptation.update(
            s,
            history.adaptive_gains[0],
            self.config.dt,
            history.step,
            saturated,
        );

        let u_eq = self.equivalent.compute(x, &self.surface);
        let raw = u_eq - k * self.switching.compute(s) - self.config.damping_gain * s;

        let state = ControllerState {
            adaptive_gains: [k, 0.0],
            last_raw_control: raw,
            step: history.step + 1,
            ..*history
        };
        finish(raw, self.config.max_force, s, u_eq, state)
    }
}
