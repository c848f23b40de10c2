// dip_sim/src/output.rs

//! JSON documents written and read by the command-line tool.

use crate::error::SimResult;
use dip_core::control::registry::ControllerKind;
use dip_core::optimization::{FitnessReport, IterationStats, PsoResult};
use dip_core::simulation::{SimulationResult, SimulationStatus, TrajectoryMetrics};
use dip_core::types::{StateVariable, STATE_DIM, STATE_LAYOUT};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// A tuned gain vector, as written by `optimize` and read by `simulate --gains-file`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GainsFile {
    pub controller: ControllerKind,
    pub gains: Vec<f64>,
    #[serde(default)]
    pub cost: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationReport {
    pub controller: ControllerKind,
    pub seed: u64,
    pub best_gains: Vec<f64>,
    pub best_cost: f64,
    pub evaluations: usize,
    pub stagnated: bool,
    pub stopped_early: bool,
    pub history: Vec<IterationStats>,
    /// Per-scenario scores of the best gains.
    pub fitness: FitnessReport,
}

impl OptimizationReport {
    pub fn new(controller: ControllerKind, seed: u64, result: &PsoResult, fitness: FitnessReport) -> Self {
        Self {
            controller,
            seed,
            best_gains: result.best_position.clone(),
            best_cost: result.best_cost,
            evaluations: result.evaluations,
            stagnated: result.stagnated,
            stopped_early: result.stopped_early,
            history: result.history.clone(),
            fitness,
        }
    }
}

/// Column-oriented trajectory: sample `k` of every series belongs to `time[k]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryFile {
    pub controller: ControllerKind,
    pub gains: Vec<f64>,
    pub status: SimulationStatus,
    pub metrics: TrajectoryMetrics,
    pub dt: f64,
    pub time: Vec<f64>,
    /// Names of the entries of every `states` row, in order.
    pub state_labels: [StateVariable; STATE_DIM],
    pub states: Vec<[f64; STATE_DIM]>,
    pub control: Vec<f64>,
    pub surface: Vec<f64>,
    pub final_state: [f64; STATE_DIM],
}

impl TrajectoryFile {
    pub fn new(
        controller: ControllerKind,
        gains: &[f64],
        result: &SimulationResult,
        metrics: TrajectoryMetrics,
    ) -> Self {
        let trajectory = &result.trajectory;
        Self {
            controller,
            gains: gains.to_vec(),
            status: result.status,
            metrics,
            dt: trajectory.dt,
            time: trajectory.times.clone(),
            state_labels: STATE_LAYOUT,
            states: trajectory.states.iter().map(|x| (*x).into()).collect(),
            control: trajectory.controls.clone(),
            surface: trajectory.surfaces.clone(),
            final_state: trajectory.final_state.into(),
        }
    }
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> SimResult<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> SimResult<T> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gains_file_cost_is_optional() {
        let parsed: GainsFile =
            serde_json::from_str(r#"{"controller": "sta_smc", "gains": [10, 15, 2, 2.5, 3, 5]}"#)
                .unwrap();
        assert_eq!(parsed.controller, ControllerKind::StaSmc);
        assert_eq!(parsed.gains.len(), 6);
        assert_eq!(parsed.cost, None);
    }

    #[test]
    fn unknown_controller_tags_do_not_parse() {
        let parsed = serde_json::from_str::<GainsFile>(r#"{"controller": "pid", "gains": [1]}"#);
        assert!(parsed.is_err());
    }
}
