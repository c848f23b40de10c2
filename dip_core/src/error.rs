// dip_core/src/error.rs

use thiserror::Error;

/// Structural misconfiguration. Never recovered from automatically: the
/// caller has to fix the input, so every variant names the first violated
/// constraint.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("unknown controller type '{0}'")]
    UnknownController(String),

    #[error("{controller} expects {expected} gains, got {actual}")]
    GainCount {
        controller: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{controller} gain '{name}' (index {index}) must be strictly positive, got {value}")]
    NonPositiveGain {
        controller: &'static str,
        name: &'static str,
        index: usize,
        value: f64,
    },

    #[error("{controller} gain '{name}' (index {index}) must be finite and non-negative, got {value}")]
    InvalidGain {
        controller: &'static str,
        name: &'static str,
        index: usize,
        value: f64,
    },

    #[error("parameter '{field}' {rule}, got {value}")]
    InvalidParameter {
        field: &'static str,
        rule: &'static str,
        value: f64,
    },

    #[error("relation violated: {lhs} ({lhs_value}) must be {relation} {rhs} ({rhs_value})")]
    Relation {
        lhs: &'static str,
        lhs_value: f64,
        relation: &'static str,
        rhs: &'static str,
        rhs_value: f64,
    },

    #[error("configuration is for '{found}' but controller '{expected}' was requested")]
    ConfigMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("sliding surface has no control authority (|L M^-1 B| = {authority:e})")]
    SingularSurface { authority: f64 },

    #[error("{what} has {actual} entries, expected {expected}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("invalid search bounds: {0}")]
    InvalidBounds(String),

    #[error("invalid scenario '{name}': {reason}")]
    InvalidScenario { name: String, reason: String },
}

/// Crate-level error for operations that can fail for more than configuration reasons.
#[derive(Error, Debug)]
pub enum DipError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("unrecoverable numerical failure: {context}")]
    Numerical { context: String },
}

pub type DipResult<T> = Result<T, DipError>;

/// Small helpers shared by every `validate()` implementation.
pub(crate) mod check {
    use super::ConfigurationError;

    pub fn positive(field: &'static str, value: f64) -> Result<(), ConfigurationError> {
        if value.is_finite() && value > 0.0 {
            Ok(())
        } else {
            Err(ConfigurationError::InvalidParameter {
                field,
                rule: "must be finite and > 0",
                value,
            })
        }
    }

    pub fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigurationError> {
        if value.is_finite() && value >= 0.0 {
            Ok(())
        } else {
            Err(ConfigurationError::InvalidParameter {
                field,
                rule: "must be finite and >= 0",
                value,
            })
        }
    }

    /// `lhs <= rhs`
    pub fn at_most(
        lhs: &'static str,
        lhs_value: f64,
        rhs: &'static str,
        rhs_value: f64,
    ) -> Result<(), ConfigurationError> {
        if lhs_value <= rhs_value {
            Ok(())
        } else {
            Err(ConfigurationError::Relation {
                lhs,
                lhs_value,
                relation: "<=",
                rhs,
                rhs_value,
            })
        }
    }

    /// `lhs > rhs`
    pub fn greater(
        lhs: &'static str,
        lhs_value: f64,
        rhs: &'static str,
        rhs_value: f64,
    ) -> Result<(), ConfigurationError> {
        if lhs_value > rhs_value {
            Ok(())
        } else {
            Err(ConfigurationError::Relation {
                lhs,
                lhs_value,
                relation: ">",
                rhs,
                rhs_value,
            })
        }
    }
}
