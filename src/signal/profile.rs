use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::signal::model::{slant_range_km, LinkBudget};
use crate::visibility::VisibilityRecord;

pub const DEFAULT_REFERENCE_ELEVATIONS_DEG: [f64; 8] = [5.0, 10.0, 15.0, 30.0, 45.0, 60.0, 75.0, 90.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SignalGrade {
    VeryPoor,
    Poor,
    Fair,
    Good,
    Excellent,
}

/// Lower RSRP bound (dBm) of each grade.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradeThresholds {
    pub excellent_dbm: f64,
    pub good_dbm: f64,
    pub fair_dbm: f64,
    pub poor_dbm: f64,
}

impl Default for GradeThresholds {
    fn default() -> Self {
        Self {
            excellent_dbm: -80.0,
            good_dbm: -90.0,
            fair_dbm: -100.0,
            poor_dbm: -110.0,
        }
    }
}

impl GradeThresholds {
    pub fn grade(&self, rsrp_dbm: f64) -> SignalGrade {
        if rsrp_dbm >= self.excellent_dbm {
            SignalGrade::Excellent
        } else if rsrp_dbm >= self.good_dbm {
            SignalGrade::Good
        } else if rsrp_dbm >= self.fair_dbm {
            SignalGrade::Fair
        } else if rsrp_dbm >= self.poor_dbm {
            SignalGrade::Poor
        } else {
            SignalGrade::VeryPoor
        }
    }

    pub fn is_descending(&self) -> bool {
        self.excellent_dbm > self.good_dbm
            && self.good_dbm > self.fair_dbm
            && self.fair_dbm > self.poor_dbm
    }
}

/// RSRP span mapped linearly onto the [0, 1] signal sub-score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreRange {
    pub floor_dbm: f64,
    pub ceiling_dbm: f64,
}

impl Default for ScoreRange {
    fn default() -> Self {
        Self {
            floor_dbm: -120.0,
            ceiling_dbm: -80.0,
        }
    }
}

impl ScoreRange {
    pub fn score(&self, rsrp_dbm: f64) -> f64 {
        ((rsrp_dbm - self.floor_dbm) / (self.ceiling_dbm - self.floor_dbm)).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReferencePoint {
    pub elevation_deg: f64,
    pub slant_range_km: f64,
    pub rsrp_dbm: f64,
}

/// Expected signal of one satellite across reference elevations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalProfile {
    pub norad_id: u64,
    pub altitude_km: f64,
    pub reference: Vec<ReferencePoint>,
    pub mean_rsrp_dbm: f64,
    pub min_rsrp_dbm: f64,
    pub max_rsrp_dbm: f64,
    /// `max - min`.
    pub stability_db: f64,
    pub grade: SignalGrade,
}

/// Received power at one retained observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RsrpSample {
    pub timestamp: DateTime<Utc>,
    pub offset_seconds: f64,
    pub elevation_deg: f64,
    pub slant_range_km: f64,
    pub rsrp_dbm: f64,
    /// Position on the propagation grid.
    pub grid_index: usize,
    /// Index of the pass this sample belongs to.
    pub segment: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignalEstimator {
    pub budget: LinkBudget,
    pub reference_elevations_deg: Vec<f64>,
    pub grades: GradeThresholds,
}

impl SignalEstimator {
    pub fn profile(&self, norad_id: u64, altitude_km: f64) -> SignalProfile {
        let reference: Vec<ReferencePoint> = self
            .reference_elevations_deg
            .iter()
            .map(|&elevation_deg| {
                let slant_range_km = slant_range_km(altitude_km, elevation_deg);
                ReferencePoint {
                    elevation_deg,
                    slant_range_km,
                    rsrp_dbm: self.budget.rsrp_dbm(slant_range_km, elevation_deg),
                }
            })
            .collect();

        let values = reference.iter().map(|p| p.rsrp_dbm);
        let min_rsrp_dbm = values.clone().fold(f64::INFINITY, f64::min);
        let max_rsrp_dbm = values.clone().fold(f64::NEG_INFINITY, f64::max);
        let mean_rsrp_dbm = if reference.is_empty() {
            f64::NEG_INFINITY
        } else {
            values.sum::<f64>() / reference.len() as f64
        };

        SignalProfile {
            norad_id,
            altitude_km,
            reference,
            mean_rsrp_dbm,
            min_rsrp_dbm,
            max_rsrp_dbm,
            stability_db: max_rsrp_dbm - min_rsrp_dbm,
            grade: self.grades.grade(mean_rsrp_dbm),
        }
    }

    /// Per-sample RSRP over the retained observations, using each sample's
    /// measured slant range.
    pub fn observed(&self, record: &VisibilityRecord) -> Vec<RsrpSample> {
        record
            .passes
            .iter()
            .enumerate()
            .flat_map(|(segment, pass)| {
                record
                    .pass_observations(pass)
                    .iter()
                    .map(move |o| (segment, o))
            })
            .map(|(segment, o)| RsrpSample {
                timestamp: o.timestamp,
                offset_seconds: o.offset_seconds,
                elevation_deg: o.elevation_deg,
                slant_range_km: o.range_km,
                rsrp_dbm: self.budget.rsrp_dbm(o.range_km, o.elevation_deg),
                grid_index: (o.offset_seconds / record.step_seconds).round() as usize,
                segment,
            })
            .collect()
    }
}
