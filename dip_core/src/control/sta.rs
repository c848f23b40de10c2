// dip_core/src/control/sta.rs

use super::config::StaConfig;
use super::primitives::{EquivalentControl, SlidingSurface, SurfaceGains, SwitchingFunction};
use super::{finish, ControlOutput, Controller, ControllerKind, ControllerState};
use crate::error::ConfigurationError;
use crate::models::dynamics::dip::DoubleInvertedPendulum;
use crate::types::State;
use crate::utils::safety::{safe_divide, safe_sqrt, saturate};
use tracing::{debug, warn};

/// Super-twisting SMC:
/// `u = -k1 sqrt|s| switch(s) + z + u_eq`, `z <- z - k2 switch(s) dt`.
///
/// `z` is frozen inside the dead-zone and clamped to `+-integral_limit`.
/// Gains: `[k1, k2, c1, c2, lambda1, lambda2]`.
#[derive(Debug, Clone)]
pub struct SuperTwistingSmc {
    gains: [f64; 6],
    config: StaConfig,
    surface: SlidingSurface,
    switching: SwitchingFunction,
    equivalent: EquivalentControl,
}

/// Lower bound on `k2` for finite-time convergence: `(5 k1^2 + 4 L) / (4 k1)`.
pub fn convergence_threshold(k1: f64, disturbance_bound: f64) -> f64 {
    safe_divide(5.0 * k1 * k1 + 4.0 * disturbance_bound, 4.0 * k1)
}

/// The threshold `k2` fails to exceed, `None` when the condition holds or
/// fewer than two gains are given.
fn convergence_shortfall(gains: &[f64], config: &StaConfig) -> Option<f64> {
    let &[k1, k2, ..] = gains else {
        return None;
    };
    let threshold = convergence_threshold(k1, config.disturbance_bound);
    (k2 <= threshold).then_some(threshold)
}

impl SuperTwistingSmc {
    pub fn new(
        gains: [f64; 6],
        config: StaConfig,
        nominal: &DoubleInvertedPendulum,
    ) -> Result<Self, ConfigurationError> {
        config.validate()?;
        let [k1, k2, c1, c2, lambda1, lambda2] = gains;
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
        debug!(k1, k2, "super-twisting controller built");

        Ok(Self {
            gains,
            switching: SwitchingFunction::new(
                config.switching,
                config.boundary_layer,
                config.dead_zone,
            ),
            equivalent: EquivalentControl::new(*nominal, &config.equivalent, config.max_force),
            surface,
            config,
        })
    }

    /// Whether the gains satisfy the convergence condition for the configured bound.
    pub fn satisfies_convergence_condition(&self) -> bool {
        convergence_shortfall(&self.gains, &self.config).is_none()
    }

    /// Checks user-facing gains once and warns when they violate
    /// `k2 > (5 k1^2 + 4 L) / (4 k1)`. Construction itself stays silent, so
    /// an optimizer can build thousands of candidates without noise.
    ///
    /// Returns `false` only when the check is enabled and fails.
    pub fn check_convergence(gains: &[f64], config: &StaConfig) -> bool {
        if !config.check_convergence {
            return true;
        }
        match convergence_shortfall(gains, config) {
            None => true,
            Some(threshold) => {
                warn!(
                    k1 = gains[0],
                    k2 = gains[1],
                    threshold,
                    disturbance_bound = config.disturbance_bound,
                    "super-twisting gains violate the convergence condition k2 > (5 k1^2 + 4 L) / (4 k1)"
                );
                false
            }
        }
    }
}

impl Controller for SuperTwistingSmc {
    fn kind(&self) -> ControllerKind {
        ControllerKind::StaSmc
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
        let [k1, k2, ..] = self.gains;
        let s = self.surface.compute(x);
        let sw = self.switching.compute(s);
        let u_eq = self.equivalent.compute(x, &self.surface);
        let raw = -k1 * safe_sqrt(s.abs()) * sw + history.integral + u_eq;

        let integral = if s.abs() < self.config.dead_zone {
            history.integral
        } else {
            saturate(
                history.integral - k2 * sw * self.config.dt,
                self.config.integral_limit,
            )
        };

        let state = ControllerState {
            integral,
            last_raw_control: raw,
            step: history.step + 1,
            ..*history
        };
        finish(raw, self.config.max_force, s, u_eq, state)
    }
}
