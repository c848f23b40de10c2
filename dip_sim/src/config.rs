// dip_sim/src/config.rs

//! The application's root configuration document and how it is loaded.

use crate::error::SimResult;
use dip_core::control::config::{
    AdaptiveConfig, ClassicalConfig, ControllerConfig, HybridConfig, StaConfig,
};
use dip_core::control::registry::{ControllerKind, ControllerRegistry};
use dip_core::error::ConfigurationError;
use dip_core::models::dynamics::params::PhysicsParams;
use dip_core::optimization::{FitnessConfig, PsoBounds, PsoConfig, Scenario, ScenarioSuite};
use dip_core::simulation::SimulationConfig;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Prefix of environment overrides, e.g. `DIP_SIMULATION__DURATION=5`.
pub const ENV_PREFIX: &str = "DIP_";

/// One typed record per controller type, `[controllers.<type>]` in TOML.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControllerSection {
    pub classical_smc: ClassicalConfig,
    pub sta_smc: StaConfig,
    pub adaptive_smc: AdaptiveConfig,
    pub hybrid_adaptive_sta_smc: HybridConfig,
}

impl ControllerSection {
    pub fn get(&self, kind: ControllerKind) -> ControllerConfig {
        match kind {
            ControllerKind::ClassicalSmc => ControllerConfig::ClassicalSmc(self.classical_smc),
            ControllerKind::StaSmc => ControllerConfig::StaSmc(self.sta_smc),
            ControllerKind::AdaptiveSmc => ControllerConfig::AdaptiveSmc(self.adaptive_smc),
            ControllerKind::HybridAdaptiveStaSmc => {
                ControllerConfig::HybridAdaptiveStaSmc(self.hybrid_adaptive_sta_smc)
            }
        }
    }
}

/// Which scenario suite the fitness function scores gains on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuitePreset {
    Nominal,
    #[default]
    Robust,
    /// `random_count` undisturbed starts drawn from `random_seed`, each on its
    /// own plant when `random_uncertainty > 0`.
    Random,
    /// The `[[fitness.scenarios]]` tables.
    Custom,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FitnessSection {
    pub cost: FitnessConfig,
    pub suite: SuitePreset,
    pub random_count: usize,
    pub random_max_angle: f64,
    /// Relative spread of the per-scenario plant parameters, `0` for the nominal plant.
    pub random_uncertainty: f64,
    pub random_seed: u64,
    pub scenarios: Vec<Scenario>,
}

impl Default for FitnessSection {
    fn default() -> Self {
        Self {
            cost: FitnessConfig::default(),
            suite: SuitePreset::Robust,
            random_count: 8,
            random_max_angle: 0.2,
            random_uncertainty: 0.0,
            random_seed: 0,
            scenarios: Vec::new(),
        }
    }
}

impl FitnessSection {
    pub fn build_suite(&self) -> Result<ScenarioSuite, ConfigurationError> {
        match self.suite {
            SuitePreset::Nominal => Ok(ScenarioSuite::nominal()),
            SuitePreset::Robust => Ok(ScenarioSuite::robust()),
            SuitePreset::Random => ScenarioSuite::random(
                self.random_count,
                self.random_max_angle,
                self.random_uncertainty,
                self.random_seed,
            ),
            SuitePreset::Custom => ScenarioSuite::new(self.scenarios.clone()),
        }
    }
}

/// Optional search bounds per controller type. Missing entries fall back
/// to the registry's bounds.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BoundsSection {
    pub classical_smc: Option<PsoBounds>,
    pub sta_smc: Option<PsoBounds>,
    pub adaptive_smc: Option<PsoBounds>,
    pub hybrid_adaptive_sta_smc: Option<PsoBounds>,
}

impl BoundsSection {
    fn configured(&self, kind: ControllerKind) -> Option<&PsoBounds> {
        match kind {
            ControllerKind::ClassicalSmc => self.classical_smc.as_ref(),
            ControllerKind::StaSmc => self.sta_smc.as_ref(),
            ControllerKind::AdaptiveSmc => self.adaptive_smc.as_ref(),
            ControllerKind::HybridAdaptiveStaSmc => self.hybrid_adaptive_sta_smc.as_ref(),
        }
    }

    pub fn for_kind(&self, kind: ControllerKind, registry: &ControllerRegistry) -> PsoBounds {
        self.configured(kind)
            .cloned()
            .unwrap_or_else(|| PsoBounds::from_descriptor(registry.descriptor(kind)))
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PsoSection {
    /// Swarm hyperparameters, `[pso.swarm]`.
    pub swarm: PsoConfig,
    pub bounds: BoundsSection,
}

/// Root document. Every section has complete defaults, so an empty file is valid.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub physics: PhysicsParams,
    pub simulation: SimulationConfig,
    pub controllers: ControllerSection,
    pub fitness: FitnessSection,
    pub pso: PsoSection,
}

impl AppConfig {
    /// Defaults, then the TOML file (when given), then `DIP_*` environment variables.
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Loads and validates the configuration. An explicitly named file must exist.
    pub fn load(path: Option<&Path>) -> SimResult<Self> {
        if let Some(path) = path {
            if !path.is_file() {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("configuration file '{}' not found", path.display()),
                )
                .into());
            }
        }
        let config: AppConfig = Self::figment(path).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Runs every section through the core validators. The first violation wins.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.physics.validate()?;
        self.simulation.validate()?;
        for kind in ControllerKind::ALL {
            let controller = self.controllers.get(kind);
            controller.validate()?;
            if (controller.dt() - self.simulation.dt).abs() > 1e-12 {
                return Err(ConfigurationError::Relation {
                    lhs: "controller.dt",
                    lhs_value: controller.dt(),
                    relation: "==",
                    rhs: "simulation.dt",
                    rhs_value: self.simulation.dt,
                });
            }
        }
        self.fitness.cost.validate()?;
        self.fitness.build_suite()?;
        self.pso.swarm.validate()?;

        let registry = ControllerRegistry::standard();
        for kind in ControllerKind::ALL {
            if let Some(bounds) = self.pso.bounds.configured(kind) {
                bounds.validate_for(registry.descriptor(kind))?;
            }
        }
        Ok(())
    }
}
