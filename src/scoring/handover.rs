use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::geometry::TopocentricObservation;
use crate::visibility::{PassWindow, VisibilityRecord};

/// Elevation above which a sample counts as stable for handover.
const STABLE_ELEVATION_DEG: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandoverParams {
    pub peak_weight: f64,
    pub duration_weight: f64,
    pub urgency_weight: f64,
    pub reference_duration_seconds: f64,
    /// Horizon elevation rate (deg/s) at which urgency saturates.
    pub reference_rate_deg_s: f64,
}

impl Default for HandoverParams {
    fn default() -> Self {
        Self {
            peak_weight: 40.0,
            duration_weight: 40.0,
            urgency_weight: 20.0,
            reference_duration_seconds: 600.0,
            reference_rate_deg_s: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Suitability {
    NotSuitable,
    Marginal,
    Suitable,
    HighlySuitable,
}

impl Suitability {
    pub fn classify(observations: &[TopocentricObservation], duration_seconds: f64) -> Self {
        if observations.is_empty() {
            return Suitability::NotSuitable;
        }
        let n = observations.len() as f64;
        let mean = observations.iter().map(|o| o.elevation_deg).sum::<f64>() / n;
        let stable = observations
            .iter()
            .filter(|o| o.elevation_deg >= STABLE_ELEVATION_DEG)
            .count() as f64
            / n;
        let minutes = duration_seconds / 60.0;

        if mean >= 30.0 && minutes >= 5.0 && stable >= 0.6 {
            Suitability::HighlySuitable
        } else if mean >= 20.0 && minutes >= 3.0 && stable >= 0.4 {
            Suitability::Suitable
        } else if mean >= 15.0 && minutes >= 2.0 {
            Suitability::Marginal
        } else {
            Suitability::NotSuitable
        }
    }
}

/// Pass-geometry score of one satellite.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandoverScore {
    pub norad_id: u64,
    /// In [0, 100].
    pub score: f64,
    pub peak_component: f64,
    pub duration_component: f64,
    pub urgency_component: f64,
    pub peak_elevation_deg: f64,
    pub total_duration_seconds: f64,
    pub suitability: Suitability,
}

pub fn score_handover(record: &VisibilityRecord, params: &HandoverParams) -> HandoverScore {
    let peak_elevation_deg = record.peak_elevation_deg().max(0.0);
    let total_duration_seconds = record.total_duration_seconds();

    let peak_component = (peak_elevation_deg / 90.0).clamp(0.0, 1.0);
    let duration_component = if params.reference_duration_seconds > 0.0 {
        (total_duration_seconds / params.reference_duration_seconds).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let urgency_component = horizon_urgency(record, params.reference_rate_deg_s);

    let weight_sum = params.peak_weight + params.duration_weight + params.urgency_weight;
    let score = if weight_sum > 0.0 {
        100.0
            * (params.peak_weight * peak_component
                + params.duration_weight * duration_component
                + params.urgency_weight * urgency_component)
            / weight_sum
    } else {
        0.0
    };

    HandoverScore {
        norad_id: record.norad_id,
        score: score.clamp(0.0, 100.0),
        peak_component,
        duration_component,
        urgency_component,
        peak_elevation_deg,
        total_duration_seconds,
        suitability: Suitability::classify(&record.observations, total_duration_seconds),
    }
}

/// Mean over passes of `1 - min(edge rate / reference, 1)`. Single-sample
/// passes have no measurable edge and contribute 0.
fn horizon_urgency(record: &VisibilityRecord, reference_rate_deg_s: f64) -> f64 {
    if record.passes.is_empty() || reference_rate_deg_s <= 0.0 {
        return 0.0;
    }
    let total: f64 = record
        .passes
        .iter()
        .map(|pass| match edge_rate(record, pass) {
            Some(rate) => 1.0 - (rate / reference_rate_deg_s).min(1.0),
            None => 0.0,
        })
        .sum();
    total / record.passes.len() as f64
}

/// Mean |dEl/dt| over the rise and set edges of one pass.
fn edge_rate(record: &VisibilityRecord, pass: &PassWindow) -> Option<f64> {
    let samples = record.pass_observations(pass);
    if samples.len() < 2 {
        return None;
    }
    let rate = |a: &TopocentricObservation, b: &TopocentricObservation| {
        let dt = b.offset_seconds - a.offset_seconds;
        if dt > 0.0 {
            (b.elevation_deg - a.elevation_deg).abs() / dt
        } else {
            0.0
        }
    };
    let n = samples.len();
    Some((rate(&samples[0], &samples[1]) + rate(&samples[n - 2], &samples[n - 1])) / 2.0)
}

/// Higher score first, then longer visibility, then lower NORAD id.
pub fn rank_cmp(a: &HandoverScore, b: &HandoverScore) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| b.total_duration_seconds.total_cmp(&a.total_duration_seconds))
        .then_with(|| a.norad_id.cmp(&b.norad_id))
}
