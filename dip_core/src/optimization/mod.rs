// dip_core/src/optimization/mod.rs

pub mod fitness;
pub mod pso;
pub mod scenario;

pub use fitness::{CostBreakdown, CostWeights, FitnessConfig, FitnessEvaluator, FitnessReport, ScenarioScore};
pub use pso::{EarlyStopping, IterationStats, PsoBounds, PsoConfig, PsoOptimizer, PsoResult};
pub use scenario::{Scenario, ScenarioSuite};

/// A cost function over a box of real vectors.
///
/// Implementations must be pure functions of `(position, stream)`: the
/// optimizer calls them concurrently and relies on the result not depending
/// on which thread ran it.
pub trait Objective: Sync {
    fn dimension(&self) -> usize;

    /// Cost of `position`. `stream` selects the random stream for any
    /// stochastic part of the evaluation.
    fn cost(&self, position: &[f64], stream: u64) -> f64;
}

/// Mixes a run seed, an iteration and a particle index into one stream seed
/// (SplitMix64 finalizer).
pub fn stream_seed(seed: u64, iteration: u64, index: u64) -> u64 {
    let mut z = seed
        ^ iteration.wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ index.wrapping_add(1).wrapping_mul(0xC2B2_AE3D_27D4_EB4F);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
