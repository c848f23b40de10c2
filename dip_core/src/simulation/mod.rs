// dip_core/src/simulation/mod.rs

pub mod batch;
pub mod disturbance;
pub mod metrics;
pub mod runner;
pub mod trajectory;

pub use disturbance::{Disturbance, MeasurementNoise};
pub use metrics::{compute_metrics, settling_time, TrajectoryMetrics};
pub use runner::{SimulationConfig, SimulationRunner, TerminationLimits};
pub use trajectory::{DivergenceReason, SimulationResult, SimulationStatus, Trajectory};
