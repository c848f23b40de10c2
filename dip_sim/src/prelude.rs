// dip_sim/src/prelude.rs

pub use crate::cli::{Cli, Command, OptimizeArgs, SimulateArgs};
pub use crate::commands::{optimize, simulate, OptimizationOutcome, SimulationOutcome};
pub use crate::config::{AppConfig, BoundsSection, ControllerSection, FitnessSection, PsoSection, SuitePreset};
pub use crate::error::{SimError, SimResult};
pub use crate::output::{GainsFile, OptimizationReport, TrajectoryFile};
