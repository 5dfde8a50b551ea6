use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReferenceFrame {
    /// True Equator Mean Equinox, the SGP4 output frame.
    Teme,
}

/// Inertial state of one satellite at one timepoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateVector {
    pub norad_id: u64,
    /// TLE epoch + `offset_seconds`.
    pub timestamp: DateTime<Utc>,
    pub offset_seconds: f64,
    pub position_km: [f64; 3],
    pub velocity_km_s: [f64; 3],
    pub frame: ReferenceFrame,
}

impl StateVector {
    pub fn radius_km(&self) -> f64 {
        let p = self.position_km;
        (p[0] * p[0] + p[1] * p[1] + p[2] * p[2]).sqrt()
    }
}

/// Offsets (seconds after each satellite's own epoch) at which to sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeGrid {
    step_seconds: f64,
    offsets_seconds: Vec<f64>,
}

impl TimeGrid {
    /// `floor(window / step)` samples starting at the epoch: 96 minutes at
    /// 30 seconds gives 192 points.
    pub fn covering(window_minutes: f64, step_seconds: f64) -> Self {
        let window_seconds = window_minutes * 60.0;
        let count = if step_seconds > 0.0 && window_seconds > 0.0 {
            (window_seconds / step_seconds + 1e-9).floor() as usize
        } else {
            0
        };
        Self {
            step_seconds,
            offsets_seconds: (0..count).map(|i| i as f64 * step_seconds).collect(),
        }
    }

    pub fn step_seconds(&self) -> f64 {
        self.step_seconds
    }

    pub fn offsets(&self) -> &[f64] {
        &self.offsets_seconds
    }

    pub fn len(&self) -> usize {
        self.offsets_seconds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets_seconds.is_empty()
    }
}
