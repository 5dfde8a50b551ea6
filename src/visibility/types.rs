use chrono::{DateTime, Utc};
use serde::Serialize;
use strum_macros::Display;

use crate::geometry::TopocentricObservation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PassQuality {
    VeryPoor,
    Poor,
    Fair,
    Good,
    Excellent,
}

impl PassQuality {
    pub fn grade(peak_elevation_deg: f64, duration_seconds: f64) -> Self {
        let minutes = duration_seconds / 60.0;
        match (peak_elevation_deg, minutes) {
            (e, m) if e >= 60.0 && m >= 8.0 => PassQuality::Excellent,
            (e, m) if e >= 45.0 && m >= 5.0 => PassQuality::Good,
            (e, m) if e >= 30.0 && m >= 3.0 => PassQuality::Fair,
            (e, m) if e >= 15.0 && m >= 1.0 => PassQuality::Poor,
            _ => PassQuality::VeryPoor,
        }
    }
}

/// One rise/set interval above the minimum elevation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassWindow {
    pub rise: DateTime<Utc>,
    pub set: DateTime<Utc>,
    /// Indices into `VisibilityRecord::observations`, inclusive.
    pub first_index: usize,
    pub last_index: usize,
    pub peak_elevation_deg: f64,
    pub peak_time: DateTime<Utc>,
    pub sample_count: usize,
    /// `sample_count * step`.
    pub duration_seconds: f64,
    /// Time bridged by merging, zero for an unmerged pass.
    pub merged_gap_seconds: f64,
    pub quality: PassQuality,
}

/// Time-ordered samples of one satellite that cleared the elevation mask.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisibilityRecord {
    pub norad_id: u64,
    pub constellation: String,
    pub min_elevation_deg: f64,
    pub step_seconds: f64,
    /// Samples on the grid before filtering.
    pub total_samples: usize,
    pub observations: Vec<TopocentricObservation>,
    pub passes: Vec<PassWindow>,
}

impl VisibilityRecord {
    pub fn visible_ratio(&self) -> f64 {
        if self.total_samples == 0 {
            return 0.0;
        }
        self.observations.len() as f64 / self.total_samples as f64
    }

    pub fn total_duration_seconds(&self) -> f64 {
        self.passes.iter().map(|p| p.duration_seconds).sum()
    }

    pub fn peak_elevation_deg(&self) -> f64 {
        self.observations
            .iter()
            .map(|o| o.elevation_deg)
            .fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn mean_elevation_deg(&self) -> f64 {
        if self.observations.is_empty() {
            return 0.0;
        }
        self.observations.iter().map(|o| o.elevation_deg).sum::<f64>()
            / self.observations.len() as f64
    }

    /// Observations belonging to one pass.
    pub fn pass_observations(&self, pass: &PassWindow) -> &[TopocentricObservation] {
        &self.observations[pass.first_index..=pass.last_index]
    }
}

/// Before/after counts for one filtering run. Informational only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VisibilityStats {
    pub satellites_in: usize,
    pub satellites_out: usize,
    pub points_in: usize,
    pub points_out: usize,
}

impl VisibilityStats {
    pub fn record(&mut self, points_in: usize, points_out: usize) {
        self.satellites_in += 1;
        if points_out > 0 {
            self.satellites_out += 1;
        }
        self.points_in += points_in;
        self.points_out += points_out;
    }

    pub fn merge(&mut self, other: &VisibilityStats) {
        self.satellites_in += other.satellites_in;
        self.satellites_out += other.satellites_out;
        self.points_in += other.points_in;
        self.points_out += other.points_out;
    }

    pub fn point_retention(&self) -> f64 {
        if self.points_in == 0 {
            0.0
        } else {
            self.points_out as f64 / self.points_in as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_quality_grades() {
        assert_eq!(PassQuality::grade(75.0, 600.0), PassQuality::Excellent);
        assert_eq!(PassQuality::grade(75.0, 400.0), PassQuality::Good);
        assert_eq!(PassQuality::grade(35.0, 200.0), PassQuality::Fair);
        assert_eq!(PassQuality::grade(20.0, 60.0), PassQuality::Poor);
        assert_eq!(PassQuality::grade(12.0, 900.0), PassQuality::VeryPoor);
        assert_eq!(PassQuality::VeryPoor.to_string(), "very_poor");
    }

    #[test]
    fn test_stats_accumulate() {
        let mut stats = VisibilityStats::default();
        stats.record(192, 20);
        stats.record(192, 0);
        assert_eq!(stats.satellites_in, 2);
        assert_eq!(stats.satellites_out, 1);
        assert_eq!(stats.points_out, 20);
        assert!((stats.point_retention() - 20.0 / 384.0).abs() < 1e-12);
    }
}
