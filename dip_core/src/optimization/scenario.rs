// dip_core/src/optimization/scenario.rs

//! Initial conditions, disturbances and plant variations a gain vector is scored on.

use crate::error::ConfigurationError;
use crate::models::dynamics::params::ParameterScaling;
use crate::simulation::{Disturbance, MeasurementNoise};
use crate::types::{State, STATE_DIM};
use crate::utils::safety::all_finite;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::Uniform;
use serde::{Deserialize, Serialize};

fn unit_weight() -> f64 {
    1.0
}

/// One simulated test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    pub name: String,
    /// `[x, x_dot, theta1, theta1_dot, theta2, theta2_dot]`
    pub initial_state: [f64; STATE_DIM],
    #[serde(default)]
    pub disturbance: Disturbance,
    /// Scaling of the simulated plant. Controllers keep the nominal model.
    #[serde(default)]
    pub plant_scaling: Option<ParameterScaling>,
    #[serde(default)]
    pub noise: Option<MeasurementNoise>,
    /// Relative weight in the aggregated cost.
    #[serde(default = "unit_weight")]
    pub weight: f64,
}

impl Scenario {
    /// Undisturbed start from rest at the given link angles.
    pub fn from_angles(name: impl Into<String>, theta1: f64, theta2: f64) -> Self {
        Self {
            name: name.into(),
            initial_state: [0.0, 0.0, theta1, 0.0, theta2, 0.0],
            disturbance: Disturbance::None,
            plant_scaling: None,
            noise: None,
            weight: 1.0,
        }
    }

    pub fn with_disturbance(mut self, disturbance: Disturbance) -> Self {
        self.disturbance = disturbance;
        self
    }

    pub fn with_plant_scaling(mut self, scaling: ParameterScaling) -> Self {
        self.plant_scaling = Some(scaling);
        self
    }

    pub fn with_noise(mut self, noise: MeasurementNoise) -> Self {
        self.noise = Some(noise);
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn initial(&self) -> State {
        State::from_column_slice(&self.initial_state)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let invalid = |reason: String| ConfigurationError::InvalidScenario {
            name: self.name.clone(),
            reason,
        };
        if !all_finite(&self.initial_state) {
            return Err(invalid("initial state must be finite".into()));
        }
        if !(self.weight.is_finite() && self.weight > 0.0) {
            return Err(invalid(format!("weight must be > 0, got {}", self.weight)));
        }
        self.disturbance
            .validate()
            .map_err(|e| invalid(e.to_string()))?;
        if let Some(scaling) = &self.plant_scaling {
            scaling.validate().map_err(|e| invalid(e.to_string()))?;
        }
        if let Some(noise) = &self.noise {
            noise.validate().map_err(|e| invalid(e.to_string()))?;
        }
        Ok(())
    }
}

/// Ordered, non-empty set of scenarios.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScenarioSuite {
    scenarios: Vec<Scenario>,
}

impl Default for ScenarioSuite {
    fn default() -> Self {
        Self::nominal()
    }
}

impl ScenarioSuite {
    pub fn new(scenarios: Vec<Scenario>) -> Result<Self, ConfigurationError> {
        let suite = Self { scenarios };
        suite.validate()?;
        Ok(suite)
    }

    /// A single small symmetric lean.
    pub fn nominal() -> Self {
        Self {
            scenarios: vec![Scenario::from_angles("nominal", 0.05, 0.05)],
        }
    }

    /// Nominal lean plus a large lean, opposed links, a step push on the
    /// cart and a plant 20 % heavier and lighter than the model.
    pub fn robust() -> Self {
        Self {
            scenarios: vec![
                Scenario::from_angles("nominal", 0.05, 0.05),
                Scenario::from_angles("large_lean", 0.3, 0.3),
                Scenario::from_angles("opposed_links", 0.1, -0.1),
                Scenario::from_angles("step_push", 0.05, 0.05).with_disturbance(
                    Disturbance::Step {
                        magnitude: 5.0,
                        start: 2.0,
                    },
                ),
                Scenario::from_angles("plant_plus_20", 0.05, 0.05)
                    .with_plant_scaling(ParameterScaling::uniform(1.2)),
                Scenario::from_angles("plant_minus_20", 0.05, 0.05)
                    .with_plant_scaling(ParameterScaling::uniform(0.8)),
            ],
        }
    }

    /// `count` starts from rest with both link angles drawn uniformly from
    /// `[-max_angle, max_angle]`. Same seed, same suite.
    ///
    /// A positive `uncertainty` also gives each scenario its own plant, every
    /// parameter group scaled by a factor in `[1 - uncertainty, 1 + uncertainty]`
    /// drawn from the same stream right after the scenario's angles.
    pub fn random(
        count: usize,
        max_angle: f64,
        uncertainty: f64,
        seed: u64,
    ) -> Result<Self, ConfigurationError> {
        if count == 0 {
            return Err(ConfigurationError::InvalidParameter {
                field: "scenarios.count",
                rule: "must be >= 1",
                value: 0.0,
            });
        }
        crate::error::check::positive("scenarios.max_angle", max_angle)?;
        crate::error::check::non_negative("scenarios.uncertainty", uncertainty)?;
        crate::error::check::at_most("scenarios.uncertainty", uncertainty, "max_uncertainty", 0.9)?;

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let angle = Uniform::new_inclusive(-max_angle, max_angle);
        let scenarios = (0..count)
            .map(|i| {
                let theta1 = rng.sample(angle);
                let theta2 = rng.sample(angle);
                let scenario = Scenario::from_angles(format!("random_{i}"), theta1, theta2);
                if uncertainty > 0.0 {
                    scenario.with_plant_scaling(ParameterScaling::sample(uncertainty, &mut rng))
                } else {
                    scenario
                }
            })
            .collect();
        Self::new(scenarios)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.scenarios.is_empty() {
            return Err(ConfigurationError::InvalidScenario {
                name: "<suite>".into(),
                reason: "at least one scenario is required".into(),
            });
        }
        self.scenarios.iter().try_for_each(Scenario::validate)
    }

    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Scenario> {
        self.scenarios.iter()
    }
}
