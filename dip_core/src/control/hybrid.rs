// dip_core/src/control/hybrid.rs

use super::config::{HybridConfig, RecenterConfig};
use super::primitives::{
    AdaptationLaw, EquivalentControl, SlidingSurface, SurfaceGains, SwitchingFunction,
};
use super::{finish, ControlOutput, Controller, ControllerKind, ControllerState};
use crate::error::ConfigurationError;
use crate::models::dynamics::dip::DoubleInvertedPendulum;
use crate::types::State;
use crate::types::StateVariable::{CartPosition, CartVelocity};
use crate::utils::safety::{clamp, safe_divide, safe_sqrt, saturate};

/// Hybrid adaptive super-twisting SMC.
///
/// `u = -k1(t) sqrt|s| switch(s) + z - damping_gain s + u_recenter + u_eq`,
/// with `z <- z - k2(t) switch(s) dt` and both `k1`, `k2` adapted online.
///
/// Gains: `[c1, lambda1, c2, lambda2]`.
#[derive(Debug, Clone)]
pub struct HybridAdaptiveStaSmc {
    gains: [f64; 4],
    config: HybridConfig,
    surface: SlidingSurface,
    switching: SwitchingFunction,
    equivalent: EquivalentControl,
    k1_law: AdaptationLaw,
    k2_law: AdaptationLaw,
}

/// Activation of the recentering term: 0 below `low`, 1 above `high`, linear in between.
pub fn recenter_weight(recenter: &RecenterConfig, cart_position: f64) -> f64 {
    let distance = cart_position.abs();
    if distance <= recenter.low {
        0.0
    } else if distance >= recenter.high {
        1.0
    } else {
        clamp(
            safe_divide(distance - recenter.low, recenter.high - recenter.low),
            0.0,
            1.0,
        )
    }
}

impl HybridAdaptiveStaSmc {
    pub fn new(
        gains: [f64; 4],
        config: HybridConfig,
        nominal: &DoubleInvertedPendulum,
    ) -> Result<Self, ConfigurationError> {
        config.validate()?;
        let [c1, lambda1, c2, lambda2] = gains;
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
        let law = |gamma: f64, k_max: f64| AdaptationLaw {
            gamma,
            dead_zone: config.dead_zone,
            leak_rate: config.leak_rate,
            rate_limit: config.rate_limit,
            k_min: 0.0,
            k_max,
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
            k1_law: law(config.gamma1, config.k1_max),
            k2_law: law(config.gamma2, config.k2_max),
            config,
        })
    }

    /// PD force pulling the cart back toward the track centre, gated by hysteresis.
    pub fn recenter_force(&self, x: &State) -> f64 {
        let r = &self.config.recenter;
        let cart = CartPosition.of(x);
        let weight = recenter_weight(r, cart);
        if weight == 0.0 {
            return 0.0;
        }
        -weight * (r.kp * cart + r.kd * CartVelocity.of(x))
    }
}

impl Controller for HybridAdaptiveStaSmc {
    fn kind(&self) -> ControllerKind {
        ControllerKind::HybridAdaptiveStaSmc
    }

    fn gains(&self) -> &[f64] {
        &self.gains
    }

    fn max_force(&self) -> f64 {
        self.config.max_force
    }

    fn reset(&self) -> ControllerState {
        ControllerState {
            adaptive_gains: [self.config.k1_init, self.config.k2_init],
            ..Default::default()
        }
    }

    fn control_law(&self, x: &State, history: &ControllerState) -> ControlOutput {
        let cfg = &self.config;
        let s = self.surface.compute(x);
        let saturated = history.last_raw_control.abs() > cfg.max_force;
        let [k1_prev, k2_prev] = history.adaptive_gains;
        let k1 = self.k1_law.update(s, k1_prev, cfg.dt, history.step, saturated);
        let k2 = self.k2_law.update(s, k2_prev, cfg.dt, history.step, saturated);

        let sw = self.switching.compute(s);
        let u_eq = self.equivalent.compute(x, &self.surface);
        let raw = -k1 * safe_sqrt(s.abs()) * sw + history.integral - cfg.damping_gain * s
            + self.recenter_force(x)
            + u_eq;

        let integral = if s.abs() < cfg.dead_zone {
            history.integral
        } else {
            saturate(history.integral - k2 * sw * cfg.dt, cfg.integral_limit)
        };

        let state = ControllerState {
            adaptive_gains: [k1, k2],
            integral,
            last_raw_control: raw,
            step: history.step + 1,
        };
        finish(raw, cfg.max_force, s, u_eq, state)
    }
}
