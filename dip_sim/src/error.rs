// dip_sim/src/error.rs

use dip_core::error::{ConfigurationError, DipError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error(transparent)]
    Core(#[from] DipError),

    #[error("failed to load configuration: {0}")]
    Config(#[from] figment::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<ConfigurationError> for SimError {
    fn from(err: ConfigurationError) -> Self {
        SimError::Core(DipError::Configuration(err))
    }
}

impl SimError {
    /// Process exit code: 2 for configuration problems, 3 for numerical
    /// failures, 1 for everything that went wrong on the way to or from disk.
    pub fn exit_code(&self) -> u8 {
        match self {
            SimError::Config(_) | SimError::Core(DipError::Configuration(_)) => 2,
            SimError::Core(DipError::Numerical { .. }) => 3,
            SimError::Io(_) | SimError::Json(_) => 1,
        }
    }
}

pub type SimResult<T> = Result<T, SimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_the_error_family() {
        let config: SimError = ConfigurationError::UnknownController("pid".into()).into();
        assert_eq!(config.exit_code(), 2);
        assert!(config.to_string().contains("pid"));

        let numerical: SimError = DipError::Numerical {
            context: "best cost is NaN".into(),
        }
        .into();
        assert_eq!(numerical.exit_code(), 3);

        let io: SimError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert_eq!(io.exit_code(), 1);
    }
}
