// dip_core/src/prelude.rs

// --- Core Abstractions (The main contracts of the library) ---
pub use crate::control::Controller;
pub use crate::models::dynamics::Dynamics;
pub use crate::optimization::Objective;
pub use crate::utils::integrators::Integrator;

// --- Core Data Structures ---
pub use crate::control::{ControlOutput, ControllerState, Diagnostics};
pub use crate::error::{ConfigurationError, DipError, DipResult};
pub use crate::types::{Control, State, StateVariable, STATE_DIM};

// --- Plant ---
pub use crate::models::dynamics::dip::DoubleInvertedPendulum;
pub use crate::models::dynamics::params::{ParameterScaling, PhysicsParams};
pub use crate::utils::integrators::{IntegrationMethod, Euler, RK4, RK45};

// --- Controllers ---
pub use crate::control::config::{
    AdaptiveConfig, ClassicalConfig, ControllerConfig, HybridConfig, StaConfig, SurfaceConfig,
    SurfaceMode, SwitchingMethod,
};
pub use crate::control::factory::ControllerFactory;
pub use crate::control::registry::{ControllerDescriptor, ControllerKind, ControllerRegistry};

// --- Simulation ---
pub use crate::simulation::{
    compute_metrics, Disturbance, MeasurementNoise, SimulationConfig, SimulationResult,
    SimulationRunner, SimulationStatus, TerminationLimits, Trajectory, TrajectoryMetrics,
};

// --- Optimization ---
pub use crate::optimization::{
    FitnessConfig, FitnessEvaluator, FitnessReport, PsoBounds, PsoConfig, PsoOptimizer, PsoResult,
    Scenario, ScenarioSuite,
};
