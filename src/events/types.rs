use serde::{Deserialize, Serialize};
use strum_macros::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
pub enum EventKind {
    A4,
    A5,
    D2,
}

/// Neighbour becomes better than an absolute threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct A4Params {
    pub threshold_dbm: f64,
    pub hysteresis_db: f64,
    /// Frequency-specific offset of the neighbour (Ofn).
    pub ofn_db: f64,
    /// Cell-individual offset of the neighbour (Ocn).
    pub ocn_db: f64,
}

impl Default for A4Params {
    fn default() -> Self {
        Self {
            threshold_dbm: -90.0,
            hysteresis_db: 2.0,
            ofn_db: 0.0,
            ocn_db: 0.0,
        }
    }
}

impl A4Params {
    pub fn neighbour_offset_db(&self) -> f64 {
        self.ofn_db + self.ocn_db
    }
}

/// Serving worse than threshold1 while neighbour better than threshold2.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct A5Params {
    pub threshold1_dbm: f64,
    pub threshold2_dbm: f64,
    pub hysteresis_db: f64,
    pub ofn_db: f64,
    pub ocn_db: f64,
}

impl Default for A5Params {
    fn default() -> Self {
        Self {
            threshold1_dbm: -100.0,
            threshold2_dbm: -90.0,
            hysteresis_db: 2.0,
            ofn_db: 0.0,
            ocn_db: 0.0,
        }
    }
}

impl A5Params {
    /// Offsets apply to the neighbour measurement only.
    pub fn neighbour_offset_db(&self) -> f64 {
        self.ofn_db + self.ocn_db
    }
}

/// Distance to the serving satellite above threshold1 while the candidate is
/// closer than threshold2.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct D2Params {
    pub threshold1_km: f64,
    pub threshold2_km: f64,
    pub hysteresis_km: f64,
}

impl Default for D2Params {
    fn default() -> Self {
        Self {
            threshold1_km: 1500.0,
            threshold2_km: 1200.0,
            hysteresis_km: 50.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventWeights {
    pub a4: f64,
    pub a5: f64,
    pub d2: f64,
}

impl Default for EventWeights {
    fn default() -> Self {
        Self {
            a4: 1.0 / 3.0,
            a5: 1.0 / 3.0,
            d2: 1.0 / 3.0,
        }
    }
}

impl EventWeights {
    pub fn total(&self) -> f64 {
        self.a4 + self.a5 + self.d2
    }
}

/// Serving-cell measurement at one sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServingSample {
    pub rsrp_dbm: f64,
    pub distance_km: f64,
}

impl Default for ServingSample {
    fn default() -> Self {
        Self {
            rsrp_dbm: -105.0,
            distance_km: 2000.0,
        }
    }
}

/// Source of the serving-side measurements (Mp, Ml1).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ServingLink {
    Fixed(ServingSample),
    /// One entry per grid timepoint; the last entry holds past the end.
    Series(Vec<ServingSample>),
}

impl ServingLink {
    pub fn at(&self, grid_index: usize) -> ServingSample {
        match self {
            ServingLink::Fixed(sample) => *sample,
            ServingLink::Series(series) => series
                .get(grid_index)
                .or_else(|| series.last())
                .copied()
                .unwrap_or_default(),
        }
    }
}

impl Default for ServingLink {
    fn default() -> Self {
        ServingLink::Fixed(ServingSample::default())
    }
}

/// Measured and configured values behind one event decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConditionSnapshot {
    pub offset_seconds: f64,
    pub measured: f64,
    /// Offset added to `measured` before comparing against `threshold`.
    pub offset: f64,
    pub threshold: f64,
    pub hysteresis: f64,
    pub serving_measured: Option<f64>,
    pub serving_threshold: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventOutcome {
    pub kind: EventKind,
    pub triggered: bool,
    /// Transitions into the triggered state.
    pub trigger_count: usize,
    /// Samples spent in the triggered state.
    pub triggered_samples: usize,
    pub evaluated_samples: usize,
    /// `triggered_samples / evaluated_samples`.
    pub score: f64,
    /// Taken at the first trigger, else at the last evaluated sample.
    pub snapshot: Option<ConditionSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventAssessment {
    pub norad_id: u64,
    pub a4: EventOutcome,
    pub a5: EventOutcome,
    pub d2: EventOutcome,
    /// Weighted mean of the three event scores, in [0, 1].
    pub event_potential: f64,
}

impl EventAssessment {
    pub fn outcomes(&self) -> [&EventOutcome; 3] {
        [&self.a4, &self.a5, &self.d2]
    }
}
