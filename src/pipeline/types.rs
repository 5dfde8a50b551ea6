use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use strum_macros::Display;

use crate::events::ServingLink;
use crate::pipeline::abort::AbortSignal;
use crate::scoring::{SelectionResult, StageCounts};
use crate::tle::TleSource;
use crate::visibility::{VisibilityRecord, VisibilityStats};

/// Already-loaded TLE text, grouped by constellation.
#[derive(Debug, Clone, Default)]
pub struct PipelineInput {
    pub constellations: BTreeMap<String, Vec<TleSource>>,
    /// Serving-side measurements for A5/D2. Falls back to the configured
    /// fixed reference.
    pub serving: Option<ServingLink>,
}

impl PipelineInput {
    pub fn new(constellations: BTreeMap<String, Vec<TleSource>>) -> Self {
        Self {
            constellations,
            serving: None,
        }
    }

    pub fn with_serving(mut self, serving: ServingLink) -> Self {
        self.serving = Some(serving);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ExclusionKind {
    Parse,
    TimeBase,
    Propagation,
    NotVisible,
    Cancelled,
}

/// A satellite or record left out of the run, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Exclusion {
    pub norad_id: Option<u64>,
    pub constellation: String,
    pub kind: ExclusionKind,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunMetadata {
    /// Latest TLE epoch among scored satellites.
    pub calculation_base_time: Option<DateTime<Utc>>,
    pub earliest_epoch: Option<DateTime<Utc>>,
    pub input_satellites: usize,
    pub output_satellites: usize,
    pub filtering_rate: f64,
    pub stage_counts: StageCounts,
    pub visibility: BTreeMap<String, VisibilityStats>,
    pub exclusions: Vec<Exclusion>,
    pub aborted: Option<AbortSignal>,
    pub generated_at: DateTime<Utc>,
    /// Age of the oldest parsed TLE at `generated_at`.
    pub max_tle_age_days: Option<f64>,
}

impl RunMetadata {
    pub fn exclusions_of(&self, kind: ExclusionKind) -> impl Iterator<Item = &Exclusion> {
        self.exclusions.iter().filter(move |e| e.kind == kind)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunOutput {
    pub selections: BTreeMap<String, SelectionResult>,
    /// Visibility records of satellites listed in `trajectory_requests`.
    pub trajectories: BTreeMap<u64, VisibilityRecord>,
    pub metadata: RunMetadata,
}
