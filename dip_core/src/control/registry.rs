// dip_core/src/control/registry.rs

use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Type tag of every controller variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerKind {
    ClassicalSmc,
    StaSmc,
    AdaptiveSmc,
    HybridAdaptiveStaSmc,
}

impl ControllerKind {
    pub const ALL: [ControllerKind; 4] = [
        ControllerKind::ClassicalSmc,
        ControllerKind::StaSmc,
        ControllerKind::AdaptiveSmc,
        ControllerKind::HybridAdaptiveStaSmc,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            ControllerKind::ClassicalSmc => "classical_smc",
            ControllerKind::StaSmc => "sta_smc",
            ControllerKind::AdaptiveSmc => "adaptive_smc",
            ControllerKind::HybridAdaptiveStaSmc => "hybrid_adaptive_sta_smc",
        }
    }
}

impl fmt::Display for ControllerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ControllerKind {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        ControllerKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| ConfigurationError::UnknownController(s.to_string()))
    }
}

/// Static facts about one controller variant's gain vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerDescriptor {
    pub kind: ControllerKind,
    pub gain_names: &'static [&'static str],
    /// `true` where a gain may be zero; every other gain must be strictly positive.
    pub zero_allowed: &'static [bool],
    pub default_gains: &'static [f64],
    /// Default PSO search box.
    pub lower_bounds: &'static [f64],
    pub upper_bounds: &'static [f64],
}

impl ControllerDescriptor {
    pub fn gain_count(&self) -> usize {
        self.gain_names.len()
    }

    /// Checks length, finiteness and positivity. Reports the first violation.
    pub fn validate_gains(&self, gains: &[f64]) -> Result<(), ConfigurationError> {
        let controller = self.kind.as_str();
        if gains.len() != self.gain_count() {
            return Err(ConfigurationError::GainCount {
                controller,
                expected: self.gain_count(),
                actual: gains.len(),
            });
        }
        for (index, (&value, &may_be_zero)) in gains.iter().zip(self.zero_allowed).enumerate() {
            let name = self.gain_names[index];
            if may_be_zero {
                if !(value.is_finite() && value >= 0.0) {
                    return Err(ConfigurationError::InvalidGain {
                        controller,
                        name,
                        index,
                        value,
                    });
                }
            } else if !(value.is_finite() && value > 0.0) {
                return Err(ConfigurationError::NonPositiveGain {
                    controller,
                    name,
                    index,
                    value,
                });
            }
        }
        Ok(())
    }
}

const CLASSICAL: ControllerDescriptor = ControllerDescriptor {
    kind: ControllerKind::ClassicalSmc,
    gain_names: &["c1", "c2", "lambda1", "lambda2", "k_switch", "kd"],
    zero_allowed: &[false, false, false, false, false, true],
    default_gains: &[2.0, 2.5, 3.0, 5.0, 35.0, 5.0],
    lower_bounds: &[0.1, 0.1, 0.5, 0.5, 1.0, 0.0],
    upper_bounds: &[20.0, 20.0, 20.0, 20.0, 100.0, 20.0],
};

const STA: ControllerDescriptor = ControllerDescriptor {
    kind: ControllerKind::StaSmc,
    gain_names: &["k1", "k2", "c1", "c2", "lambda1", "lambda2"],
    zero_allowed: &[false; 6],
    default_gains: &[10.0, 15.0, 2.0, 2.5, 3.0, 5.0],
    lower_bounds: &[1.0, 1.0, 0.1, 0.1, 0.5, 0.5],
    upper_bounds: &[50.0, 80.0, 20.0, 20.0, 20.0, 20.0],
};

const ADAPTIVE: ControllerDescriptor = ControllerDescriptor {
    kind: ControllerKind::AdaptiveSmc,
    gain_names: &["c1", "c2", "lambda1", "lambda2", "gamma"],
    zero_allowed: &[false; 5],
    default_gains: &[2.0, 2.5, 3.0, 5.0, 5.0],
    lower_bounds: &[0.1, 0.1, 0.5, 0.5, 0.1],
    upper_bounds: &[20.0, 20.0, 20.0, 20.0, 50.0],
};

const HYBRID: ControllerDescriptor = ControllerDescriptor {
    kind: ControllerKind::HybridAdaptiveStaSmc,
    gain_names: &["c1", "lambda1", "c2", "lambda2"],
    zero_allowed: &[false; 4],
    default_gains: &[2.0, 3.0, 2.5, 5.0],
    lower_bounds: &[0.1, 0.5, 0.1, 0.5],
    upper_bounds: &[20.0, 20.0, 20.0, 20.0],
};

/// Immutable table from type tag to descriptor. Built once and passed by
/// reference; there is no process-global lookup.
#[derive(Debug, Clone)]
pub struct ControllerRegistry {
    descriptors: [ControllerDescriptor; 4],
}

impl Default for ControllerRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl ControllerRegistry {
    /// The four built-in variants.
    pub fn standard() -> Self {
        Self {
            descriptors: [CLASSICAL, STA, ADAPTIVE, HYBRID],
        }
    }

    pub fn descriptor(&self, kind: ControllerKind) -> &ControllerDescriptor {
        match kind {
            ControllerKind::ClassicalSmc => &self.descriptors[0],
            ControllerKind::StaSmc => &self.descriptors[1],
            ControllerKind::AdaptiveSmc => &self.descriptors[2],
            ControllerKind::HybridAdaptiveStaSmc => &self.descriptors[3],
        }
    }

    /// Resolves a user-facing tag (e.g. `"classical_smc"`) to its descriptor.
    pub fn lookup(&self, tag: &str) -> Result<&ControllerDescriptor, ConfigurationError> {
        let kind = tag.parse::<ControllerKind>()?;
        Ok(self.descriptor(kind))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ControllerDescriptor> {
        self.descriptors.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_round_trip_through_from_str() {
        for kind in ControllerKind::ALL {
            assert_eq!(kind.as_str().parse::<ControllerKind>().unwrap(), kind);
        }
        assert_eq!(
            "Hybrid-Adaptive-STA-SMC".parse::<ControllerKind>().unwrap(),
            ControllerKind::HybridAdaptiveStaSmc
        );
        assert!(matches!(
            "pid".parse::<ControllerKind>(),
            Err(ConfigurationError::UnknownController(_))
        ));
    }

    #[test]
    fn descriptor_tables_are_consistent() {
        let registry = ControllerRegistry::standard();
        for d in registry.iter() {
            let n = d.gain_count();
            assert_eq!(d.zero_allowed.len(), n);
            assert_eq!(d.default_gains.len(), n);
            assert_eq!(d.lower_bounds.len(), n);
            assert_eq!(d.upper_bounds.len(), n);
            assert!(d.validate_gains(d.default_gains).is_ok());
            for i in 0..n {
                assert!(d.lower_bounds[i] < d.upper_bounds[i]);
                assert!(d.default_gains[i] >= d.lower_bounds[i]);
                assert!(d.default_gains[i] <= d.upper_bounds[i]);
            }
            assert_eq!(registry.descriptor(d.kind).kind, d.kind);
        }
    }

    #[test]
    fn zero_is_only_accepted_in_whitelisted_slots() {
        let registry = ControllerRegistry::standard();
        let classical = registry.descriptor(ControllerKind::ClassicalSmc);
        assert!(classical
            .validate_gains(&[2.0, 2.5, 3.0, 5.0, 35.0, 0.0])
            .is_ok());
        assert!(matches!(
            classical.validate_gains(&[2.0, 2.5, 3.0, 5.0, 0.0, 5.0]),
            Err(ConfigurationError::NonPositiveGain { name: "k_switch", index: 4, .. })
        ));
        assert!(matches!(
            classical.validate_gains(&[2.0, 2.5, 3.0, 5.0, 35.0, -1.0]),
            Err(ConfigurationError::InvalidGain { name: "kd", .. })
        ));
        assert!(matches!(
            classical.validate_gains(&[1.0; 5]),
            Err(ConfigurationError::GainCount { expected: 6, actual: 5, .. })
        ));
    }
}
