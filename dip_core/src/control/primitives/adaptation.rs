// dip_core/src/control/primitives/adaptation.rs

use crate::utils::safety::{clamp, finite_or, safe_divide};

/// Which branch of the adaptation law produced an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdaptationRegime {
    /// `|s|` inside the dead-zone: leak only.
    DeadZone,
    /// Previous command was clipped while near the surface: leak only.
    SaturatedNearEquilibrium,
    Normal,
}

/// Online switching-gain update with dead-zone, leak, rate limit, taper and time decay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdaptationLaw {
    pub gamma: f64,
    pub dead_zone: f64,
    pub leak_rate: f64,
    pub rate_limit: f64,
    pub k_min: f64,
    pub k_max: f64,
    pub equilibrium_band: f64,
    pub taper_width: f64,
    pub decay_steps: f64,
}

impl AdaptationLaw {
    pub fn regime(&self, s: f64, saturated: bool) -> AdaptationRegime {
        let magnitude = s.abs();
        if magnitude < self.dead_zone {
            AdaptationRegime::DeadZone
        } else if saturated && magnitude < self.equilibrium_band {
            AdaptationRegime::SaturatedNearEquilibrium
        } else {
            AdaptationRegime::Normal
        }
    }

    /// `taper(|s|) = |s| / (|s| + taper_width)`.
    pub fn taper(&self, magnitude: f64) -> f64 {
        safe_divide(magnitude, magnitude + self.taper_width)
    }

    /// `1 / (1 + step / decay_steps)`.
    pub fn time_factor(&self, step: u64) -> f64 {
        1.0 / (1.0 + safe_divide(step as f64, self.decay_steps))
    }

    /// Gain rate for the current step.
    pub fn rate(&self, s: f64, step: u64, saturated: bool) -> f64 {
        match self.regime(s, saturated) {
            AdaptationRegime::DeadZone | AdaptationRegime::SaturatedNearEquilibrium => {
                -self.leak_rate
            }
            AdaptationRegime::Normal => {
                let magnitude = s.abs();
                let growth = self.gamma * magnitude * self.taper(magnitude) * self.time_factor(step);
                growth.min(self.rate_limit) - self.leak_rate
            }
        }
    }

    /// One explicit Euler step of the gain, clamped to `[k_min, k_max]`.
    /// Non-finite inputs leave the gain at its clamped previous value.
    pub fn update(&self, s: f64, prev_gain: f64, dt: f64, step: u64, saturated: bool) -> f64 {
        let prev = clamp(prev_gain, self.k_min, self.k_max);
        if !s.is_finite() || !dt.is_finite() {
            return prev;
        }
        let next = prev + self.rate(s, step, saturated) * dt;
        clamp(finite_or(next, prev), self.k_min, self.k_max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn law() -> AdaptationLaw {
        AdaptationLaw {
            gamma: 5.0,
            dead_zone: 0.01,
            leak_rate: 0.01,
            rate_limit: 100.0,
            k_min: 0.0,
            k_max: 50.0,
            equilibrium_band: 0.05,
            taper_width: 0.05,
            decay_steps: 10_000.0,
        }
    }

    #[test]
    fn dead_zone_only_leaks() {
        let l = law();
        assert_eq!(l.regime(0.005, false), AdaptationRegime::DeadZone);
        assert_relative_eq!(l.update(0.005, 10.0, 0.01, 0, false), 10.0 - 0.01 * 0.01);
    }

    #[test]
    fn saturation_near_equilibrium_freezes_growth() {
        let l = law();
        assert_eq!(l.regime(0.03, true), AdaptationRegime::SaturatedNearEquilibrium);
        assert_eq!(l.regime(0.03, false), AdaptationRegime::Normal);
        assert!(l.update(0.03, 10.0, 0.01, 0, true) < 10.0);
        assert!(l.update(0.03, 10.0, 0.01, 0, false) > 10.0);
    }

    #[test]
    fn growth_is_rate_limited_and_decays_over_time() {
        let l = AdaptationLaw {
            rate_limit: 2.0,
            ..law()
        };
        assert_relative_eq!(l.rate(100.0, 0, false), 2.0 - 0.01);
        let early = law().rate(0.2, 0, false);
        let late = law().rate(0.2, 100_000, false);
        assert!(late < early);
        assert_relative_eq!(law().time_factor(10_000), 0.5);
    }

    #[test]
    fn non_finite_surface_keeps_previous_gain() {
        assert_eq!(law().update(f64::NAN, 7.0, 0.01, 0, false), 7.0);
        // A NaN gain restarts from the lower bound.
        let restarted = law().update(1.0, f64::NAN, 0.01, 0, false);
        assert!(restarted.is_finite() && restarted < 0.1);
    }

    #[test]
    fn ten_thousand_adversarial_steps_stay_in_bounds() {
        let l = AdaptationLaw {
            rate_limit: 1e6,
            decay_steps: 1e12,
            ..law()
        };
        let mut k = 1.0;
        for step in 0..10_000u64 {
            let s = if step % 2 == 0 { 1e3 } else { -1e3 };
            k = l.update(s, k, 0.01, step, false);
            assert!((0.0..=l.k_max).contains(&k), "step {step}: {k}");
        }
        assert_eq!(k, l.k_max);
    }

    proptest! {
        #[test]
        fn gain_never_leaves_bounds(
            s in prop::num::f64::ANY,
            prev in -1e3f64..1e3,
            dt in 0.0f64..1.0,
            step in 0u64..1_000_000,
            saturated in any::<bool>(),
        ) {
            let l = law();
            let k = l.update(s, prev, dt, step, saturated);
            prop_assert!(k >= 0.0 && k <= l.k_max);
        }
    }
}
