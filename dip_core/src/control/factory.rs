// dip_core/src/control/factory.rs

use super::adaptive::AdaptiveSmc;
use super::classical::ClassicalSmc;
use super::config::ControllerConfig;
use super::hybrid::HybridAdaptiveStaSmc;
use super::registry::{ControllerDescriptor, ControllerKind, ControllerRegistry};
use super::sta::SuperTwistingSmc;
use super::Controller;
use crate::error::ConfigurationError;
use crate::models::dynamics::dip::DoubleInvertedPendulum;

/// Validated construction of any controller variant.
///
/// The factory holds only immutable data (the registry and the nominal
/// plant), so one instance can be shared by reference across threads; each
/// call returns an independent controller.
#[derive(Debug, Clone)]
pub struct ControllerFactory {
    registry: ControllerRegistry,
    nominal: DoubleInvertedPendulum,
}

fn to_array<const N: usize>(gains: &[f64]) -> [f64; N] {
    let mut out = [0.0; N];
    out.copy_from_slice(&gains[..N]);
    out
}

impl ControllerFactory {
    pub fn new(registry: ControllerRegistry, nominal: DoubleInvertedPendulum) -> Self {
        Self { registry, nominal }
    }

    pub fn registry(&self) -> &ControllerRegistry {
        &self.registry
    }

    pub fn descriptor(&self, kind: ControllerKind) -> &ControllerDescriptor {
        self.registry.descriptor(kind)
    }

    pub fn nominal(&self) -> &DoubleInvertedPendulum {
        &self.nominal
    }

    /// Builds a controller from a user-facing type tag.
    pub fn create_from_tag(
        &self,
        tag: &str,
        gains: &[f64],
        config: &ControllerConfig,
    ) -> Result<Box<dyn Controller>, ConfigurationError> {
        let kind = tag.parse::<ControllerKind>()?;
        self.create(kind, gains, config)
    }

    /// Checks, in order: gain count and signs, that `config` belongs to `kind`,
    /// then the config's own constraints. The first violation is returned.
    pub fn create(
        &self,
        kind: ControllerKind,
        gains: &[f64],
        config: &ControllerConfig,
    ) -> Result<Box<dyn Controller>, ConfigurationError> {
        self.registry.descriptor(kind).validate_gains(gains)?;
        if config.kind() != kind {
            return Err(ConfigurationError::ConfigMismatch {
                expected: kind.as_str(),
                found: config.kind().as_str(),
            });
        }

        let nominal = &self.nominal;
        let controller: Box<dyn Controller> = match *config {
            ControllerConfig::ClassicalSmc(cfg) => {
                Box::new(ClassicalSmc::new(to_array(gains), cfg, nominal)?)
            }
            ControllerConfig::StaSmc(cfg) => {
                Box::new(SuperTwistingSmc::new(to_array(gains), cfg, nominal)?)
            }
            ControllerConfig::AdaptiveSmc(cfg) => {
                Box::new(AdaptiveSmc::new(to_array(gains), cfg, nominal)?)
            }
            ControllerConfig::HybridAdaptiveStaSmc(cfg) => {
                Box::new(HybridAdaptiveStaSmc::new(to_array(gains), cfg, nominal)?)
            }
        };
        Ok(controller)
    }

    /// Builds a controller with the registry's default gains and the default config.
    pub fn create_default(
        &self,
        kind: ControllerKind,
    ) -> Result<Box<dyn Controller>, ConfigurationError> {
        let descriptor = self.registry.descriptor(kind);
        self.create(
            kind,
            descriptor.default_gains,
            &ControllerConfig::default_for(kind),
        )
    }
}
