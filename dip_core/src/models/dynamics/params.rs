// dip_core/src/models/dynamics/params.rs

use crate::error::{check, ConfigurationError};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Physical parameters of the cart and the two rigid links.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PhysicsParams {
    /// Cart mass [kg].
    pub cart_mass: f64,
    pub link1_mass: f64,
    pub link2_mass: f64,
    /// Full link lengths [m].
    pub link1_length: f64,
    pub link2_length: f64,
    /// Distance from the pivot to each link's centre of mass [m].
    pub link1_com: f64,
    pub link2_com: f64,
    /// Centroidal moments of inertia [kg m^2].
    pub link1_inertia: f64,
    pub link2_inertia: f64,
    pub gravity: f64,
    /// Viscous friction: cart [N s/m], joints [N m s/rad].
    pub cart_friction: f64,
    pub joint1_friction: f64,
    pub joint2_friction: f64,
}

impl Default for PhysicsParams {
    fn default() -> Self {
        Self {
            cart_mass: 1.5,
            link1_mass: 0.2,
            link2_mass: 0.15,
            link1_length: 0.4,
            link2_length: 0.3,
            link1_com: 0.2,
            link2_com: 0.15,
            link1_inertia: 0.0081,
            link2_inertia: 0.0034,
            gravity: 9.81,
            cart_friction: 0.2,
            joint1_friction: 0.005,
            joint2_friction: 0.004,
        }
    }
}

/// Multiplicative factors applied per parameter group to build a mismatched plant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParameterScaling {
    pub mass: f64,
    pub length: f64,
    pub inertia: f64,
    pub friction: f64,
}

impl Default for ParameterScaling {
    fn default() -> Self {
        Self {
            mass: 1.0,
            length: 1.0,
            inertia: 1.0,
            friction: 1.0,
        }
    }
}

impl ParameterScaling {
    /// Every group scaled by the same factor.
    pub fn uniform(factor: f64) -> Self {
        Self {
            mass: factor,
            length: factor,
            inertia: factor,
            friction: factor,
        }
    }

    /// Draws an independent uniform factor in `[1 - fraction, 1 + fraction]`
    /// per group. `fraction` is clamped to `[0, 0.9]`; zero draws nothing
    /// from `rng` and returns the identity scaling.
    pub fn sample<R: Rng + ?Sized>(fraction: f64, rng: &mut R) -> Self {
        let f = if fraction.is_finite() {
            fraction.clamp(0.0, 0.9)
        } else {
            0.0
        };
        if f == 0.0 {
            return Self::default();
        }
        let mut factor = || rng.gen_range((1.0 - f)..=(1.0 + f));
        Self {
            mass: factor(),
            length: factor(),
            inertia: factor(),
            friction: factor(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        check::positive("scaling.mass", self.mass)?;
        check::positive("scaling.length", self.length)?;
        check::positive("scaling.inertia", self.inertia)?;
        check::non_negative("scaling.friction", self.friction)
    }
}

impl PhysicsParams {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        check::positive("physics.cart_mass", self.cart_mass)?;
        check::positive("physics.link1_mass", self.link1_mass)?;
        check::positive("physics.link2_mass", self.link2_mass)?;
        check::positive("physics.link1_length", self.link1_length)?;
        check::positive("physics.link2_length", self.link2_length)?;
        check::positive("physics.link1_com", self.link1_com)?;
        check::positive("physics.link2_com", self.link2_com)?;
        check::at_most(
            "physics.link1_com",
            self.link1_com,
            "physics.link1_length",
            self.link1_length,
        )?;
        check::at_most(
            "physics.link2_com",
            self.link2_com,
            "physics.link2_length",
            self.link2_length,
        )?;
        check::positive("physics.link1_inertia", self.link1_inertia)?;
        check::positive("physics.link2_inertia", self.link2_inertia)?;
        check::positive("physics.gravity", self.gravity)?;
        check::non_negative("physics.cart_friction", self.cart_friction)?;
        check::non_negative("physics.joint1_friction", self.joint1_friction)?;
        check::non_negative("physics.joint2_friction", self.joint2_friction)
    }

    /// Returns a perturbed copy with each parameter group scaled.
    pub fn scaled(&self, scaling: &ParameterScaling) -> Self {
        Self {
            cart_mass: self.cart_mass * scaling.mass,
            link1_mass: self.link1_mass * scaling.mass,
            link2_mass: self.link2_mass * scaling.mass,
            link1_length: self.link1_length * scaling.length,
            link2_length: self.link2_length * scaling.length,
            link1_com: self.link1_com * scaling.length,
            link2_com: self.link2_com * scaling.length,
            link1_inertia: self.link1_inertia * scaling.inertia,
            link2_inertia: self.link2_inertia * scaling.inertia,
            gravity: self.gravity,
            cart_friction: self.cart_friction * scaling.friction,
            joint1_friction: self.joint1_friction * scaling.friction,
            joint2_friction: self.joint2_friction * scaling.friction,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn defaults_are_valid() {
        assert!(PhysicsParams::default().validate().is_ok());
    }

    #[test]
    fn rejects_com_beyond_link() {
        let params = PhysicsParams {
            link2_com: 0.5,
            ..Default::default()
        };
        let err = params.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::Relation {
                lhs: "physics.link2_com",
                ..
            }
        ));
    }

    #[test]
    fn rejects_non_positive_mass() {
        let params = PhysicsParams {
            cart_mass: 0.0,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn sampled_scalings_stay_within_fraction() {
        let nominal = PhysicsParams::default();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..50 {
            let scaling = ParameterScaling::sample(0.2, &mut rng);
            for factor in [scaling.mass, scaling.length, scaling.inertia, scaling.friction] {
                assert!((0.8..=1.2).contains(&factor));
            }
            let p = nominal.scaled(&scaling);
            assert!(p.validate().is_ok());
            assert_eq!(p.gravity, nominal.gravity);
        }
        assert_eq!(ParameterScaling::sample(0.0, &mut rng), ParameterScaling::default());
        assert_eq!(ParameterScaling::sample(f64::NAN, &mut rng), ParameterScaling::default());
    }

    #[test]
    fn scaling_multiplies_groups() {
        let p = PhysicsParams::default().scaled(&ParameterScaling {
            mass: 2.0,
            ..Default::default()
        });
        assert_eq!(p.link1_mass, 0.4);
        assert_eq!(p.link1_length, 0.4);
    }
}
