// dip_core/src/control/primitives/switching.rs

use crate::control::config::SwitchingMethod;
use crate::utils::safety::{clamp, safe_divide, sign};

/// Maps a surface value to a bounded direction signal in `[-1, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwitchingFunction {
    method: SwitchingMethod,
    width: f64,
}

impl SwitchingFunction {
    /// The effective width is `max(boundary_layer, dead_zone)`, so the smooth
    /// variants never switch hard inside the dead-zone.
    pub fn new(method: SwitchingMethod, boundary_layer: f64, dead_zone: f64) -> Self {
        Self {
            method,
            width: boundary_layer.max(dead_zone),
        }
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn compute(&self, s: f64) -> f64 {
        match self.method {
            SwitchingMethod::Sign => sign(s),
            SwitchingMethod::Tanh => safe_divide(s, self.width).tanh(),
            SwitchingMethod::Saturation => clamp(safe_divide(s, self.width), -1.0, 1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SMOOTH: [SwitchingMethod; 2] = [SwitchingMethod::Tanh, SwitchingMethod::Saturation];

    #[test]
    fn zero_maps_to_zero_for_every_method() {
        for method in [
            SwitchingMethod::Sign,
            SwitchingMethod::Tanh,
            SwitchingMethod::Saturation,
        ] {
            assert_eq!(SwitchingFunction::new(method, 0.1, 0.0).compute(0.0), 0.0);
        }
    }

    #[test]
    fn dead_zone_widens_the_layer() {
        let f = SwitchingFunction::new(SwitchingMethod::Saturation, 0.01, 0.05);
        assert_eq!(f.width(), 0.05);
        assert!((f.compute(0.025) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn approaches_sign_far_from_the_surface() {
        for method in SMOOTH {
            let f = SwitchingFunction::new(method, 0.05, 0.0);
            assert!((f.compute(10.0) - 1.0).abs() < 1e-9);
            assert!((f.compute(-10.0) + 1.0).abs() < 1e-9);
        }
    }

    proptest! {
        #[test]
        fn smooth_variants_are_odd_and_bounded(s in -100.0f64..100.0, width in 1e-3f64..1.0) {
            for method in SMOOTH {
                let f = SwitchingFunction::new(method, width, 0.0);
                let v = f.compute(s);
                prop_assert!(v.abs() <= 1.0);
                prop_assert!((v + f.compute(-s)).abs() < 1e-12);
            }
        }

        #[test]
        fn smooth_variants_are_lipschitz_continuous(s in -5.0f64..5.0, ds in -1e-6f64..1e-6, width in 1e-2f64..1.0) {
            for method in SMOOTH {
                let f = SwitchingFunction::new(method, width, 0.0);
                // Both variants have slope at most 1 / width.
                prop_assert!((f.compute(s + ds) - f.compute(s)).abs() <= ds.abs() / width + 1e-12);
            }
        }
    }
}
