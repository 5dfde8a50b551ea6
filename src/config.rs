use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

use crate::events::{A4Params, A5Params, D2Params, EventWeights, ServingSample};
use crate::geometry::ObserverLocation;
use crate::scoring::{CompositeWeights, HandoverParams, SelectionPolicy};
use crate::signal::{Band, GradeThresholds, Receiver, ScoreRange, DEFAULT_REFERENCE_ELEVATIONS_DEG};
use crate::visibility::DEFAULT_MAX_GAP_SECONDS;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid {field}: {reason}")]
    Invalid { field: String, reason: String },
    #[error("constellation '{0}' has no configuration")]
    UnknownConstellation(String),
}

fn invalid(field: impl Into<String>, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field: field.into(),
        reason: reason.into(),
    }
}

/// Everything one pipeline run needs besides the TLE text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub observer: ObserverLocation,
    #[serde(default = "default_time_window_minutes")]
    pub time_window_minutes: f64,
    #[serde(default = "default_sample_interval_seconds")]
    pub sample_interval_seconds: f64,
    /// Worker threads; `None` uses one per core.
    #[serde(default)]
    pub workers: Option<usize>,
    #[serde(default = "default_constellations")]
    pub constellations: BTreeMap<String, ConstellationConfig>,
    #[serde(default)]
    pub events: EventsConfig,
    #[serde(default)]
    pub weights: CompositeWeights,
    #[serde(default)]
    pub grades: GradeThresholds,
    #[serde(default)]
    pub signal_score_range: ScoreRange,
    #[serde(default = "default_reference_elevations")]
    pub reference_elevations_deg: Vec<f64>,
    #[serde(default)]
    pub receiver: Receiver,
    #[serde(default)]
    pub handover: HandoverParams,
    #[serde(default)]
    pub selection: SelectionPolicy,
    #[serde(default)]
    pub sample_mode: bool,
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,
    #[serde(default = "default_max_gap_seconds")]
    pub max_gap_seconds: f64,
    /// Satellites whose full visibility record is returned with the output.
    #[serde(default)]
    pub trajectory_requests: Vec<u64>,
    /// Warn when the oldest TLE is older than this at run time.
    #[serde(default = "default_stale_tle_days")]
    pub stale_tle_days: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstellationConfig {
    pub min_elevation_deg: f64,
    /// Overrides the run-wide window, e.g. one orbital period.
    #[serde(default)]
    pub time_window_minutes: Option<f64>,
    #[serde(default)]
    pub band: Band,
    /// Overrides the run-wide selection size.
    #[serde(default)]
    pub top_n: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventsConfig {
    #[serde(default)]
    pub a4: A4Params,
    #[serde(default)]
    pub a5: A5Params,
    #[serde(default)]
    pub d2: D2Params,
    #[serde(default = "default_confirm_samples")]
    pub confirm_samples: u32,
    #[serde(default)]
    pub weights: EventWeights,
    /// Fixed serving-cell reference used when no serving series is supplied.
    #[serde(default)]
    pub serving: ServingSample,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            a4: A4Params::default(),
            a5: A5Params::default(),
            d2: D2Params::default(),
            confirm_samples: default_confirm_samples(),
            weights: EventWeights::default(),
            serving: ServingSample::default(),
        }
    }
}

fn default_time_window_minutes() -> f64 {
    96.0
}

fn default_sample_interval_seconds() -> f64 {
    30.0
}

fn default_sample_size() -> usize {
    50
}

fn default_max_gap_seconds() -> f64 {
    DEFAULT_MAX_GAP_SECONDS
}

fn default_stale_tle_days() -> f64 {
    14.0
}

fn default_confirm_samples() -> u32 {
    crate::events::DEFAULT_CONFIRM_SAMPLES
}

fn default_reference_elevations() -> Vec<f64> {
    DEFAULT_REFERENCE_ELEVATIONS_DEG.to_vec()
}

fn default_constellations() -> BTreeMap<String, ConstellationConfig> {
    BTreeMap::from([
        (
            "starlink".to_string(),
            ConstellationConfig {
                min_elevation_deg: 5.0,
                time_window_minutes: Some(96.0),
                band: Band::ku(37.5),
                top_n: None,
            },
        ),
        (
            "oneweb".to_string(),
            ConstellationConfig {
                min_elevation_deg: 10.0,
                time_window_minutes: Some(109.0),
                band: Band::ku(40.0),
                top_n: None,
            },
        ),
    ])
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            observer: ObserverLocation::default(),
            time_window_minutes: default_time_window_minutes(),
            sample_interval_seconds: default_sample_interval_seconds(),
            workers: None,
            constellations: default_constellations(),
            events: EventsConfig::default(),
            weights: CompositeWeights::default(),
            grades: GradeThresholds::default(),
            signal_score_range: ScoreRange::default(),
            reference_elevations_deg: default_reference_elevations(),
            receiver: Receiver::default(),
            handover: HandoverParams::default(),
            selection: SelectionPolicy::default(),
            sample_mode: false,
            sample_size: default_sample_size(),
            max_gap_seconds: default_max_gap_seconds(),
            trajectory_requests: Vec::new(),
            stale_tle_days: default_stale_tle_days(),
        }
    }
}

impl RunConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let config: RunConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn constellation(&self, name: &str) -> Result<&ConstellationConfig, ConfigError> {
        self.constellations
            .get(name)
            .ok_or_else(|| ConfigError::UnknownConstellation(name.to_string()))
    }

    /// Window for one constellation, falling back to the run-wide value.
    pub fn window_minutes(&self, name: &str) -> Result<f64, ConfigError> {
        Ok(self
            .constellation(name)?
            .time_window_minutes
            .unwrap_or(self.time_window_minutes))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let observer = &self.observer;
        if !(-90.0..=90.0).contains(&observer.latitude_deg) {
            return Err(invalid("observer.latitude_deg", "must be within [-90, 90]"));
        }
        if !(-180.0..=180.0).contains(&observer.longitude_deg) {
            return Err(invalid("observer.longitude_deg", "must be within [-180, 180]"));
        }
        if !observer.altitude_m.is_finite() {
            return Err(invalid("observer.altitude_m", "must be finite"));
        }
        positive("time_window_minutes", self.time_window_minutes)?;
        positive("sample_interval_seconds", self.sample_interval_seconds)?;
        if self.workers == Some(0) {
            return Err(invalid("workers", "must be at least 1 when set"));
        }
        if self.constellations.is_empty() {
            return Err(invalid("constellations", "at least one is required"));
        }

        for (name, constellation) in &self.constellations {
            if !(-90.0..=90.0).contains(&constellation.min_elevation_deg) {
                return Err(invalid(
                    format!("constellations.{}.min_elevation_deg", name),
                    "must be within [-90, 90]",
                ));
            }
            if let Some(window) = constellation.time_window_minutes {
                positive(&format!("constellations.{}.time_window_minutes", name), window)?;
            }
            positive(
                &format!("constellations.{}.band.frequency_ghz", name),
                constellation.band.frequency_ghz,
            )?;
            if !constellation.band.eirp_dbw.is_finite()
                || !constellation.band.zenith_attenuation_db.is_finite()
                || constellation.band.zenith_attenuation_db < 0.0
            {
                return Err(invalid(
                    format!("constellations.{}.band", name),
                    "EIRP must be finite and attenuation non-negative",
                ));
            }
        }

        self.weights
            .validate()
            .map_err(|reason| invalid("weights", reason))?;

        let events = &self.events;
        if events.confirm_samples == 0 {
            return Err(invalid("events.confirm_samples", "must be at least 1"));
        }
        let hysteresis = [
            events.a4.hysteresis_db,
            events.a5.hysteresis_db,
            events.d2.hysteresis_km,
        ];
        if hysteresis.iter().any(|h| !h.is_finite() || *h < 0.0) {
            return Err(invalid("events", "hysteresis must be non-negative"));
        }
        let offsets = [
            events.a4.ofn_db,
            events.a4.ocn_db,
            events.a5.ofn_db,
            events.a5.ocn_db,
        ];
        if offsets.iter().any(|o| !o.is_finite()) {
            return Err(invalid("events", "cell offsets must be finite"));
        }
        let event_weights = [events.weights.a4, events.weights.a5, events.weights.d2];
        if event_weights.iter().any(|w| !w.is_finite() || *w < 0.0) || events.weights.total() <= 0.0
        {
            return Err(invalid(
                "events.weights",
                "must be non-negative with a positive sum",
            ));
        }

        if !self.grades.is_descending() {
            return Err(invalid("grades", "thresholds must strictly decrease"));
        }
        if self.signal_score_range.ceiling_dbm <= self.signal_score_range.floor_dbm {
            return Err(invalid("signal_score_range", "ceiling must exceed floor"));
        }
        if self.reference_elevations_deg.is_empty()
            || self
                .reference_elevations_deg
                .iter()
                .any(|e| !(0.0..=90.0).contains(e))
        {
            return Err(invalid(
                "reference_elevations_deg",
                "need at least one angle within [0, 90]",
            ));
        }
        if !self.receiver.antenna_gain_dbi.is_finite()
            || !self.receiver.misc_losses_db.is_finite()
            || self.receiver.misc_losses_db < 0.0
        {
            return Err(invalid(
                "receiver",
                "gain must be finite and losses non-negative",
            ));
        }

        let h = &self.handover;
        if [h.peak_weight, h.duration_weight, h.urgency_weight]
            .iter()
            .any(|w| !w.is_finite() || *w < 0.0)
            || h.peak_weight + h.duration_weight + h.urgency_weight <= 0.0
        {
            return Err(invalid(
                "handover",
                "weights must be non-negative with a positive sum",
            ));
        }
        positive("handover.reference_duration_seconds", h.reference_duration_seconds)?;
        positive("handover.reference_rate_deg_s", h.reference_rate_deg_s)?;

        if let Some(floor) = self.selection.score_floor {
            if !(0.0..=1.0).contains(&floor) {
                return Err(invalid("selection.score_floor", "must be within [0, 1]"));
            }
        }
        if self.sample_mode && self.sample_size == 0 {
            return Err(invalid("sample_size", "must be at least 1 in sample mode"));
        }
        if !self.max_gap_seconds.is_finite() || self.max_gap_seconds < 0.0 {
            return Err(invalid("max_gap_seconds", "must be non-negative"));
        }
        positive("stale_tle_days", self.stale_tle_days)?;
        Ok(())
    }
}

fn positive(field: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, "must be a positive number"))
    }
}
