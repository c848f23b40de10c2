// dip_core/src/simulation/metrics.rs

//! Scalar performance measures over a finished trajectory.

use super::trajectory::Trajectory;
use crate::types::StateVariable::{self, CartPosition, Theta1, Theta2};
use crate::types::State;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryMetrics {
    /// First time after which both link angles stay inside the band, if they do.
    pub settling_time: Option<f64>,
    /// Largest link-angle magnitude over the run [rad].
    pub peak_angle: f64,
    /// Largest excursion past zero opposite to the initial lean [rad].
    pub overshoot: f64,
    pub rms_control: f64,
    pub rms_control_rate: f64,
    /// Fraction of samples at or beyond the force limit.
    pub saturation_fraction: f64,
    /// Largest link-angle magnitude at the end of the run [rad].
    pub final_angle_error: f64,
    pub final_cart_position: f64,
    pub peak_cart_position: f64,
}

fn max_angle(x: &State) -> f64 {
    Theta1.of(x).abs().max(Theta2.of(x).abs())
}

/// Settling time for an angle band of `tolerance` radians.
pub fn settling_time(trajectory: &Trajectory, tolerance: f64) -> Option<f64> {
    if max_angle(&trajectory.final_state) > tolerance {
        return None;
    }
    let last_outside = trajectory
        .states
        .iter()
        .rposition(|x| max_angle(x) > tolerance);
    match last_outside {
        None => Some(0.0),
        Some(k) => Some((k + 1) as f64 * trajectory.dt),
    }
}

pub fn compute_metrics(trajectory: &Trajectory, max_force: f64, tolerance: f64) -> TrajectoryMetrics {
    let n = trajectory.len();
    let peak_angle = trajectory.state_path().map(max_angle).fold(0.0, f64::max);
    let peak_cart_position = trajectory.state_path().map(|x| CartPosition.of(x).abs()).fold(0.0, f64::max);

    let overshoot = trajectory
        .states
        .first()
        .map(|x0| {
            let lean = |v: StateVariable| v.of(x0).signum();
            trajectory
                .state_path()
                .flat_map(|x| [Theta1, Theta2].map(|v| (v, v.of(x))))
                .filter(|&(v, angle)| lean(v) != 0.0 && angle * lean(v) < 0.0)
                .map(|(_, angle)| angle.abs())
                .fold(0.0, f64::max)
        })
        .unwrap_or(0.0);

    let (rms_control, rms_control_rate, saturation_fraction) = if n == 0 {
        (0.0, 0.0, 0.0)
    } else {
        let sum_sq: f64 = trajectory.controls.iter().map(|u| u * u).sum();
        let rate_sq: f64 = trajectory
            .controls
            .windows(2)
            .map(|w| ((w[1] - w[0]) / trajectory.dt).powi(2))
            .sum();
        let saturated = trajectory
            .controls
            .iter()
            .filter(|u| u.abs() >= max_force * (1.0 - 1e-9))
            .count();
        (
            (sum_sq / n as f64).sqrt(),
            if n > 1 {
                (rate_sq / (n - 1) as f64).sqrt()
            } else {
                0.0
            },
            saturated as f64 / n as f64,
        )
    };

    TrajectoryMetrics {
        settling_time: settling_time(trajectory, tolerance),
        peak_angle,
        overshoot,
        rms_control,
        rms_control_rate,
        saturation_fraction,
        final_angle_error: max_angle(&trajectory.final_state),
        final_cart_position: CartPosition.of(&trajectory.final_state),
        peak_cart_position,
    }
}
