// dip_core/src/control/config.rs

//! Strongly-typed, validated configuration records, one per controller type.

use super::registry::ControllerKind;
use crate::error::{check, ConfigurationError};
use serde::{Deserialize, Serialize};

// --- Shared building blocks ---

/// Coordinates used for the second link's term of the sliding surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceMode {
    /// `theta2` and `theta2_dot` as measured.
    Absolute,
    /// `theta2 - theta1` and its derivative.
    #[default]
    Relative,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SurfaceConfig {
    pub mode: SurfaceMode,
    /// Weight of the cart term `-(x_dot + cart_lambda * x)`.
    pub cart_gain: f64,
    pub cart_lambda: f64,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            mode: SurfaceMode::Relative,
            cart_gain: 0.75,
            cart_lambda: 0.5,
        }
    }
}

impl SurfaceConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        check::non_negative("surface.cart_gain", self.cart_gain)?;
        check::non_negative("surface.cart_lambda", self.cart_lambda)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SwitchingMethod {
    /// Discontinuous `sign(s)`.
    Sign,
    /// `tanh(s / width)`.
    #[default]
    Tanh,
    /// Linear inside the boundary layer, `sign(s)` outside.
    Saturation,
}

/// Model-based feedforward settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EquivalentConfig {
    pub enabled: bool,
    /// Tikhonov term added to the mass matrix diagonal.
    pub regularization: f64,
    /// Output is clamped to `clamp_factor * max_force`.
    pub clamp_factor: f64,
}

impl Default for EquivalentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            regularization: 1e-10,
            clamp_factor: 10.0,
        }
    }
}

impl EquivalentConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        check::positive("equivalent.regularization", self.regularization)?;
        check::positive("equivalent.clamp_factor", self.clamp_factor)
    }
}

/// Hysteresis-gated cart recentering PD term of the hybrid controller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecenterConfig {
    /// Below this `|x|` the term is inactive [m].
    pub low: f64,
    /// Above this `|x|` the term is fully active [m].
    pub high: f64,
    pub kp: f64,
    pub kd: f64,
}

impl Default for RecenterConfig {
    fn default() -> Self {
        Self {
            low: 0.5,
            high: 1.2,
            kp: 4.0,
            kd: 2.0,
        }
    }
}

impl RecenterConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        check::non_negative("recenter.low", self.low)?;
        check::greater("recenter.high", self.high, "recenter.low", self.low)?;
        check::non_negative("recenter.kp", self.kp)?;
        check::non_negative("recenter.kd", self.kd)
    }
}

fn validate_common(
    max_force: f64,
    dt: f64,
    boundary_layer: f64,
    surface: &SurfaceConfig,
    equivalent: &EquivalentConfig,
) -> Result<(), ConfigurationError> {
    check::positive("max_force", max_force)?;
    check::positive("dt", dt)?;
    check::positive("boundary_layer", boundary_layer)?;
    surface.validate()?;
    equivalent.validate()
}

// --- Per-controller records ---

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassicalConfig {
    pub max_force: f64,
    pub dt: f64,
    pub boundary_layer: f64,
    pub switching: SwitchingMethod,
    pub surface: SurfaceConfig,
    pub equivalent: EquivalentConfig,
}

impl Default for ClassicalConfig {
    fn default() -> Self {
        Self {
            max_force: 150.0,
            dt: 0.01,
            boundary_layer: 0.5,
            switching: SwitchingMethod::Tanh,
            surface: SurfaceConfig::default(),
            equivalent: EquivalentConfig::default(),
        }
    }
}

impl ClassicalConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        validate_common(
            self.max_force,
            self.dt,
            self.boundary_layer,
            &self.surface,
            &self.equivalent,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StaConfig {
    pub max_force: f64,
    pub dt: f64,
    pub boundary_layer: f64,
    pub switching: SwitchingMethod,
    pub surface: SurfaceConfig,
    pub equivalent: EquivalentConfig,
    /// Band around `s = 0` in which the integral state is frozen.
    pub dead_zone: f64,
    /// Bound on `|z|`.
    pub integral_limit: f64,
    /// Lipschitz bound `L` of the matched disturbance, used by the convergence check.
    pub disturbance_bound: f64,
    pub check_convergence: bool,
}

impl Default for StaConfig {
    fn default() -> Self {
        Self {
            max_force: 150.0,
            dt: 0.01,
            boundary_layer: 0.2,
            switching: SwitchingMethod::Tanh,
            surface: SurfaceConfig::default(),
            equivalent: EquivalentConfig::default(),
            dead_zone: 0.01,
            integral_limit: 50.0,
            disturbance_bound: 1.0,
            check_convergence: true,
        }
    }
}

impl StaConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        validate_common(
            self.max_force,
            self.dt,
            self.boundary_layer,
            &self.surface,
            &self.equivalent,
        )?;
        check::non_negative("dead_zone", self.dead_zone)?;
        check::at_most(
            "dead_zone",
            self.dead_zone,
            "boundary_layer",
            self.boundary_layer,
        )?;
        check::positive("integral_limit", self.integral_limit)?;
        check::non_negative("disturbance_bound", self.disturbance_bound)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdaptiveConfig {
    pub max_force: f64,
    pub dt: f64,
    pub boundary_layer: f64,
    pub switching: SwitchingMethod,
    pub surface: SurfaceConfig,
    pub equivalent: EquivalentConfig,
    pub dead_zone: f64,
    pub k_init: f64,
    pub k_min: f64,
    pub k_max: f64,
    pub leak_rate: f64,
    pub rate_limit: f64,
    pub damping_gain: f64,
    /// `|s|` below which a saturated command freezes adaptation.
    pub equilibrium_band: f64,
    pub taper_width: f64,
    /// Step count at which the adaptation rate has halved.
    pub decay_steps: f64,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            max_force: 150.0,
            dt: 0.01,
            boundary_layer: 0.2,
            switching: SwitchingMethod::Tanh,
            surface: SurfaceConfig::default(),
            equivalent: EquivalentConfig::default(),
            dead_zone: 0.01,
            k_init: 10.0,
            k_min: 0.1,
            k_max: 100.0,
            leak_rate: 0.01,
            rate_limit: 100.0,
            damping_gain: 5.0,
            equilibrium_band: 0.05,
            taper_width: 0.05,
            decay_steps: 10_000.0,
        }
    }
}

impl AdaptiveConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        validate_common(
            self.max_force,
            self.dt,
            self.boundary_layer,
            &self.surface,
            &self.equivalent,
        )?;
        check::non_negative("dead_zone", self.dead_zone)?;
        check::at_most(
            "dead_zone",
            self.dead_zone,
            "boundary_layer",
            self.boundary_layer,
        )?;
        check::non_negative("k_min", self.k_min)?;
        check::positive("k_max", self.k_max)?;
        check::at_most("k_min", self.k_min, "k_init", self.k_init)?;
        check::at_most("k_init", self.k_init, "k_max", self.k_max)?;
        check::non_negative("leak_rate", self.leak_rate)?;
        check::positive("rate_limit", self.rate_limit)?;
        check::non_negative("damping_gain", self.damping_gain)?;
        check::non_negative("equilibrium_band", self.equilibrium_band)?;
        check::positive("taper_width", self.taper_width)?;
        check::positive("decay_steps", self.decay_steps)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HybridConfig {
    pub max_force: f64,
    pub dt: f64,
    pub boundary_layer: f64,
    pub switching: SwitchingMethod,
    pub surface: SurfaceConfig,
    pub equivalent: EquivalentConfig,
    pub dead_zone: f64,
    pub k1_init: f64,
    pub k2_init: f64,
    pub gamma1: f64,
    pub gamma2: f64,
    pub k1_max: f64,
    pub k2_max: f64,
    pub leak_rate: f64,
    pub rate_limit: f64,
    pub damping_gain: f64,
    pub integral_limit: f64,
    pub equilibrium_band: f64,
    pub taper_width: f64,
    pub decay_steps: f64,
    pub recenter: RecenterConfig,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            max_force: 150.0,
            dt: 0.01,
            boundary_layer: 0.2,
            switching: SwitchingMethod::Tanh,
            surface: SurfaceConfig::default(),
            equivalent: EquivalentConfig::default(),
            dead_zone: 0.01,
            k1_init: 10.0,
            k2_init: 5.0,
            gamma1: 2.0,
            gamma2: 0.5,
            k1_max: 50.0,
            k2_max: 50.0,
            leak_rate: 0.01,
            rate_limit: 100.0,
            damping_gain: 3.0,
            integral_limit: 50.0,
            equilibrium_band: 0.05,
            taper_width: 0.05,
            decay_steps: 10_000.0,
            recenter: RecenterConfig::default(),
        }
    }
}

impl HybridConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        validate_common(
            self.max_force,
            self.dt,
            self.boundary_layer,
            &self.surface,
            &self.equivalent,
        )?;
        check::non_negative("dead_zone", self.dead_zone)?;
        check::at_most(
            "dead_zone",
            self.dead_zone,
            "boundary_layer",
            self.boundary_layer,
        )?;
        check::non_negative("k1_init", self.k1_init)?;
        check::non_negative("k2_init", self.k2_init)?;
        check::positive("gamma1", self.gamma1)?;
        check::positive("gamma2", self.gamma2)?;
        check::positive("k1_max", self.k1_max)?;
        check::positive("k2_max", self.k2_max)?;
        check::at_most("k1_init", self.k1_init, "k1_max", self.k1_max)?;
        check::at_most("k2_init", self.k2_init, "k2_max", self.k2_max)?;
        check::non_negative("leak_rate", self.leak_rate)?;
        check::positive("rate_limit", self.rate_limit)?;
        check::non_negative("damping_gain", self.damping_gain)?;
        check::positive("integral_limit", self.integral_limit)?;
        check::non_negative("equilibrium_band", self.equilibrium_band)?;
        check::positive("taper_width", self.taper_width)?;
        check::positive("decay_steps", self.decay_steps)?;
        self.recenter.validate()
    }
}

// --- Tagged union ---

/// Configuration for one controller, tagged by controller type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControllerConfig {
    ClassicalSmc(ClassicalConfig),
    StaSmc(StaConfig),
    AdaptiveSmc(AdaptiveConfig),
    HybridAdaptiveStaSmc(HybridConfig),
}

impl ControllerConfig {
    /// Default configuration for a controller type.
    pub fn default_for(kind: ControllerKind) -> Self {
        match kind {
            ControllerKind::ClassicalSmc => Self::ClassicalSmc(ClassicalConfig::default()),
            ControllerKind::StaSmc => Self::StaSmc(StaConfig::default()),
            ControllerKind::AdaptiveSmc => Self::AdaptiveSmc(AdaptiveConfig::default()),
            ControllerKind::HybridAdaptiveStaSmc => {
                Self::HybridAdaptiveStaSmc(HybridConfig::default())
            }
        }
    }

    pub fn kind(&self) -> ControllerKind {
        match self {
            Self::ClassicalSmc(_) => ControllerKind::ClassicalSmc,
            Self::StaSmc(_) => ControllerKind::StaSmc,
            Self::AdaptiveSmc(_) => ControllerKind::AdaptiveSmc,
            Self::HybridAdaptiveStaSmc(_) => ControllerKind::HybridAdaptiveStaSmc,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        match self {
            Self::ClassicalSmc(c) => c.validate(),
            Self::StaSmc(c) => c.validate(),
            Self::AdaptiveSmc(c) => c.validate(),
            Self::HybridAdaptiveStaSmc(c) => c.validate(),
        }
    }

    pub fn dt(&self) -> f64 {
        match self {
            Self::ClassicalSmc(c) => c.dt,
            Self::StaSmc(c) => c.dt,
            Self::AdaptiveSmc(c) => c.dt,
            Self::HybridAdaptiveStaSmc(c) => c.dt,
        }
    }

    pub fn max_force(&self) -> f64 {
        match self {
            Self::ClassicalSmc(c) => c.max_force,
            Self::StaSmc(c) => c.max_force,
            Self::AdaptiveSmc(c) => c.max_force,
            Self::HybridAdaptiveStaSmc(c) => c.max_force,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        for kind in ControllerKind::ALL {
            assert!(ControllerConfig::default_for(kind).validate().is_ok(), "{kind}");
        }
    }

    #[test]
    fn dead_zone_wider_than_boundary_layer_is_rejected() {
        let cfg = AdaptiveConfig {
            dead_zone: 0.5,
            boundary_layer: 0.1,
            ..Default::default()
        };
        match cfg.validate() {
            Err(ConfigurationError::Relation { lhs, rhs, .. }) => {
                assert_eq!(lhs, "dead_zone");
                assert_eq!(rhs, "boundary_layer");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn k_init_above_k_max_is_rejected() {
        let cfg = AdaptiveConfig {
            k_init: 200.0,
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigurationError::Relation { lhs: "k_init", .. })
        ));
    }

    #[test]
    fn inverted_recenter_thresholds_are_rejected() {
        let cfg = HybridConfig {
            recenter: RecenterConfig {
                low: 1.0,
                high: 1.0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigurationError::Relation {
                lhs: "recenter.high",
                ..
            })
        ));
    }
}
