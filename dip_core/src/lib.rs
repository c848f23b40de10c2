// dip_core/src/lib.rs

//! Sliding-mode control of a double inverted pendulum on a cart, with
//! particle-swarm gain tuning. Pure numerics: no I/O and no global state.

pub mod control;
pub mod error;
pub mod models;
pub mod optimization;
pub mod prelude;
pub mod simulation;
pub mod types;
pub mod utils;
