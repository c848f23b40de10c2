// dip_core/src/optimization/pso.rs

use super::{stream_seed, Objective};
use crate::control::registry::ControllerDescriptor;
use crate::error::{check, ConfigurationError, DipError, DipResult};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Stop once the best cost has not improved by more than `tolerance` for
/// `patience` consecutive iterations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EarlyStopping {
    pub patience: usize,
    pub tolerance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PsoConfig {
    pub swarm_size: usize,
    /// Evaluation rounds, the initial swarm included.
    pub iterations: usize,
    /// Inertia `w`.
    pub inertia: f64,
    /// Cognitive coefficient `c1`.
    pub cognitive: f64,
    /// Social coefficient `c2`.
    pub social: f64,
    pub seed: u64,
    /// Evaluate particles on the rayon pool. Results do not depend on it.
    pub parallel: bool,
    /// Per-dimension velocity bound as a fraction of the search span.
    pub velocity_clamp: Option<f64>,
    pub early_stopping: Option<EarlyStopping>,
}

impl Default for PsoConfig {
    fn default() -> Self {
        Self {
            swarm_size: 20,
            iterations: 50,
            inertia: 0.7,
            cognitive: 1.5,
            social: 1.5,
            seed: 42,
            parallel: true,
            velocity_clamp: None,
            early_stopping: None,
        }
    }
}

impl PsoConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        check::positive("pso.swarm_size", self.swarm_size as f64)?;
        check::positive("pso.iterations", self.iterations as f64)?;
        check::non_negative("pso.inertia", self.inertia)?;
        check::non_negative("pso.cognitive", self.cognitive)?;
        check::non_negative("pso.social", self.social)?;
        if let Some(clamp) = self.velocity_clamp {
            check::positive("pso.velocity_clamp", clamp)?;
        }
        if let Some(stop) = self.early_stopping {
            check::positive("pso.early_stopping.patience", stop.patience as f64)?;
            check::non_negative("pso.early_stopping.tolerance", stop.tolerance)?;
        }
        Ok(())
    }
}

/// Axis-aligned search box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PsoBounds {
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

impl PsoBounds {
    pub fn new(lower: Vec<f64>, upper: Vec<f64>) -> Result<Self, ConfigurationError> {
        let bounds = Self { lower, upper };
        bounds.validate()?;
        Ok(bounds)
    }

    /// The registry's default box for a controller type.
    pub fn from_descriptor(descriptor: &ControllerDescriptor) -> Self {
        Self {
            lower: descriptor.lower_bounds.to_vec(),
            upper: descriptor.upper_bounds.to_vec(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.lower.len()
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.lower.len() != self.upper.len() {
            return Err(ConfigurationError::InvalidBounds(format!(
                "{} lower bounds but {} upper bounds",
                self.lower.len(),
                self.upper.len()
            )));
        }
        if self.lower.is_empty() {
            return Err(ConfigurationError::InvalidBounds("no dimensions".into()));
        }
        for (i, (&lo, &hi)) in self.lower.iter().zip(&self.upper).enumerate() {
            if !(lo.is_finite() && hi.is_finite()) {
                return Err(ConfigurationError::InvalidBounds(format!(
                    "dimension {i}: bounds must be finite"
                )));
            }
            if lo > hi {
                return Err(ConfigurationError::InvalidBounds(format!(
                    "dimension {i}: lower {lo} exceeds upper {hi}"
                )));
            }
        }
        Ok(())
    }

    /// Checks the box against a controller's gain vector: one bound pair per
    /// gain and no admissible point violating the gain's sign constraint.
    pub fn validate_for(&self, descriptor: &ControllerDescriptor) -> Result<(), ConfigurationError> {
        self.validate()?;
        if self.dimension() != descriptor.gain_count() {
            return Err(ConfigurationError::InvalidBounds(format!(
                "{} needs {} bound pairs, got {}",
                descriptor.kind,
                descriptor.gain_count(),
                self.dimension()
            )));
        }
        for (i, (&lo, &zero_ok)) in self.lower.iter().zip(descriptor.zero_allowed).enumerate() {
            let name = descriptor.gain_names[i];
            if zero_ok && lo < 0.0 {
                return Err(ConfigurationError::InvalidBounds(format!(
                    "gain '{name}': lower bound {lo} is negative"
                )));
            }
            if !zero_ok && lo <= 0.0 {
                return Err(ConfigurationError::InvalidBounds(format!(
                    "gain '{name}': lower bound {lo} must be > 0"
                )));
            }
        }
        Ok(())
    }

    fn clip(&self, d: usize, value: f64) -> f64 {
        value.clamp(self.lower[d], self.upper[d])
    }

    fn span(&self, d: usize) -> f64 {
        self.upper[d] - self.lower[d]
    }
}

/// Swarm statistics after one evaluation round.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IterationStats {
    pub iteration: usize,
    /// Global best cost after this round.
    pub best_cost: f64,
    /// Mean cost of the positions evaluated in this round.
    pub mean_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PsoResult {
    pub best_position: Vec<f64>,
    pub best_cost: f64,
    pub history: Vec<IterationStats>,
    pub evaluations: usize,
    /// The best cost never improved on the initial swarm's.
    pub stagnated: bool,
    pub stopped_early: bool,
}

impl PsoResult {
    /// Global best cost per round.
    pub fn cost_history(&self) -> Vec<f64> {
        self.history.iter().map(|s| s.best_cost).collect()
    }
}

#[derive(Debug, Clone)]
struct Particle {
    position: Vec<f64>,
    velocity: Vec<f64>,
    best_position: Vec<f64>,
    best_cost: f64,
}

#[derive(Debug, Clone)]
struct Swarm {
    particles: Vec<Particle>,
    best_position: Vec<f64>,
    best_cost: f64,
}

impl Swarm {
    /// Applies one round of costs in particle order; ties keep the earlier best.
    fn absorb(&mut self, costs: &[f64]) {
        for (p, &cost) in self.particles.iter_mut().zip(costs) {
            if cost < p.best_cost {
                p.best_cost = cost;
                p.best_position.clone_from(&p.position);
            }
            if cost < self.best_cost {
                self.best_cost = cost;
                self.best_position.clone_from(&p.position);
            }
        }
    }
}

/// NaN sorts after every real cost.
fn sanitize(cost: f64) -> f64 {
    if cost.is_nan() {
        f64::INFINITY
    } else {
        cost
    }
}

/// Global-best particle swarm optimizer.
#[derive(Debug, Clone)]
pub struct PsoOptimizer {
    config: PsoConfig,
}

impl PsoOptimizer {
    pub fn new(config: PsoConfig) -> Result<Self, ConfigurationError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PsoConfig {
        &self.config
    }

    /// Minimizes `objective` over `bounds`.
    ///
    /// All draws for initialization and velocity updates come from one
    /// generator seeded with `config.seed`; each evaluation gets the stream
    /// `stream_seed(seed, iteration, particle)`. The result is therefore a
    /// function of the configuration alone, parallel or not.
    pub fn optimize<O: Objective + ?Sized>(
        &self,
        objective: &O,
        bounds: &PsoBounds,
    ) -> DipResult<PsoResult> {
        bounds.validate()?;
        if bounds.dimension() != objective.dimension() {
            return Err(ConfigurationError::InvalidBounds(format!(
                "objective has {} dimensions, bounds have {}",
                objective.dimension(),
                bounds.dimension()
            ))
            .into());
        }

        let cfg = &self.config;
        let dim = bounds.dimension();
        let mut rng = ChaCha8Rng::seed_from_u64(cfg.seed);
        info!(
            swarm_size = cfg.swarm_size,
            iterations = cfg.iterations,
            dimension = dim,
            seed = cfg.seed,
            "starting particle swarm optimization"
        );

        let particles: Vec<Particle> = (0..cfg.swarm_size)
            .map(|_| {
                let position: Vec<f64> = (0..dim)
                    .map(|d| bounds.lower[d] + rng.gen::<f64>() * bounds.span(d))
                    .collect();
                let velocity: Vec<f64> = (0..dim)
                    .map(|d| self.limit_velocity(bounds, d, (rng.gen::<f64>() - 0.5) * 0.2 * bounds.span(d)))
                    .collect();
                Particle {
                    best_position: position.clone(),
                    position,
                    velocity,
                    best_cost: f64::INFINITY,
                }
            })
            .collect();
        let mut swarm = Swarm {
            best_position: particles[0].position.clone(),
            particles,
            best_cost: f64::INFINITY,
        };

        let mut history = Vec::with_capacity(cfg.iterations);
        let mut evaluations = 0;
        let mut since_improvement = 0;
        let mut stopped_early = false;

        for iteration in 0..cfg.iterations {
            if iteration > 0 {
                self.advance(&mut swarm, bounds, &mut rng);
            }
            let costs = self.evaluate_swarm(objective, &swarm, iteration);
            evaluations += costs.len();

            let previous_best = swarm.best_cost;
            swarm.absorb(&costs);
            let stats = IterationStats {
                iteration,
                best_cost: swarm.best_cost,
                mean_cost: costs.iter().sum::<f64>() / costs.len() as f64,
            };
            debug!(
                iteration,
                best = stats.best_cost,
                mean = stats.mean_cost,
                "pso iteration"
            );
            history.push(stats);

            if iteration > 0 {
                if let Some(stop) = cfg.early_stopping {
                    if previous_best - swarm.best_cost > stop.tolerance {
                        since_improvement = 0;
                    } else {
                        since_improvement += 1;
                    }
                    if since_improvement >= stop.patience {
                        info!(iteration, "no improvement for {} iterations, stopping", stop.patience);
                        stopped_early = true;
                        break;
                    }
                }
            }
        }

        if !swarm.best_cost.is_finite() {
            return Err(DipError::Numerical {
                context: "no particle produced a finite cost".into(),
            });
        }

        let stagnated = history
            .first()
            .map_or(false, |first| swarm.best_cost >= first.best_cost);
        if stagnated && history.len() > 1 {
            warn!(
                best = swarm.best_cost,
                "best cost did not improve on the initial swarm"
            );
        }
        info!(best = swarm.best_cost, evaluations, "optimization finished");

        Ok(PsoResult {
            best_position: swarm.best_position,
            best_cost: swarm.best_cost,
            history,
            evaluations,
            stagnated,
            stopped_early,
        })
    }

    fn limit_velocity(&self, bounds: &PsoBounds, d: usize, v: f64) -> f64 {
        match self.config.velocity_clamp {
            Some(fraction) => {
                let vmax = fraction * bounds.span(d);
                v.clamp(-vmax, vmax)
            }
            None => v,
        }
    }

    /// Velocity and position update for every particle, in particle order.
    fn advance(&self, swarm: &mut Swarm, bounds: &PsoBounds, rng: &mut ChaCha8Rng) {
        let PsoConfig {
            inertia,
            cognitive,
            social,
            ..
        } = self.config;
        let global = &swarm.best_position;
        for p in swarm.particles.iter_mut() {
            for d in 0..p.position.len() {
                let r1: f64 = rng.gen();
                let r2: f64 = rng.gen();
                let v = inertia * p.velocity[d]
                    + cognitive * r1 * (p.best_position[d] - p.position[d])
                    + social * r2 * (global[d] - p.position[d]);
                p.velocity[d] = self.limit_velocity(bounds, d, v);
                p.position[d] = bounds.clip(d, p.position[d] + p.velocity[d]);
            }
        }
    }

    fn evaluate_swarm<O: Objective + ?Sized>(
        &self,
        objective: &O,
        swarm: &Swarm,
        iteration: usize,
    ) -> Vec<f64> {
        let seed = self.config.seed;
        let eval = |(i, p): (usize, &Particle)| {
            sanitize(objective.cost(&p.position, stream_seed(seed, iteration as u64, i as u64)))
        };
        if self.config.parallel {
            swarm.particles.par_iter().enumerate().map(eval).collect()
        } else {
            swarm.particles.iter().enumerate().map(eval).collect()
        }
    }
}
