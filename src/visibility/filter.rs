use crate::geometry::TopocentricObservation;
use crate::visibility::types::{PassQuality, PassWindow, VisibilityRecord};

pub const DEFAULT_MAX_GAP_SECONDS: f64 = 120.0;

/// Elevation mask and pass detection for one constellation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibilityFilter {
    pub min_elevation_deg: f64,
    pub step_seconds: f64,
    pub max_gap_seconds: f64,
}

/// Inclusive run of retained indices plus the time bridged to form it.
struct Run {
    first: usize,
    last: usize,
    bridged_seconds: f64,
}

impl VisibilityFilter {
    pub fn new(min_elevation_deg: f64, step_seconds: f64) -> Self {
        Self {
            min_elevation_deg,
            step_seconds,
            max_gap_seconds: DEFAULT_MAX_GAP_SECONDS,
        }
    }

    pub fn with_max_gap(mut self, max_gap_seconds: f64) -> Self {
        self.max_gap_seconds = max_gap_seconds;
        self
    }

    /// Keep samples at or above the mask. `None` when nothing qualifies.
    pub fn apply(
        &self,
        norad_id: u64,
        constellation: &str,
        observations: Vec<TopocentricObservation>,
    ) -> Option<VisibilityRecord> {
        let total_samples = observations.len();
        let (grid_indices, retained): (Vec<usize>, Vec<TopocentricObservation>) = observations
            .into_iter()
            .enumerate()
            .filter(|(_, o)| o.elevation_deg >= self.min_elevation_deg)
            .unzip();

        if retained.is_empty() {
            log::debug!(
                "satellite {} never reaches {:.1}° ({} samples)",
                norad_id,
                self.min_elevation_deg,
                total_samples
            );
            return None;
        }

        let runs = self.merge_runs(contiguous_runs(&grid_indices), &retained);
        let passes = runs
            .iter()
            .map(|run| self.pass_window(run, &retained))
            .collect();

        Some(VisibilityRecord {
            norad_id,
            constellation: constellation.to_string(),
            min_elevation_deg: self.min_elevation_deg,
            step_seconds: self.step_seconds,
            total_samples,
            observations: retained,
            passes,
        })
    }

    fn merge_runs(&self, runs: Vec<Run>, retained: &[TopocentricObservation]) -> Vec<Run> {
        let mut merged: Vec<Run> = Vec::with_capacity(runs.len());
        for run in runs {
            if let Some(current) = merged.last_mut() {
                let gap = (retained[run.first].timestamp - retained[current.last].timestamp)
                    .num_milliseconds() as f64
                    / 1000.0;
                if gap <= self.max_gap_seconds {
                    log::debug!("merging passes across a {:.0}s gap", gap);
                    current.last = run.last;
                    current.bridged_seconds += gap;
                    continue;
                }
            }
            merged.push(run);
        }
        merged
    }

    fn pass_window(&self, run: &Run, retained: &[TopocentricObservation]) -> PassWindow {
        let samples = &retained[run.first..=run.last];
        let peak = samples
            .iter()
            .max_by(|a, b| a.elevation_deg.total_cmp(&b.elevation_deg))
            .unwrap_or(&samples[0]);
        let sample_count = samples.len();
        let duration_seconds = sample_count as f64 * self.step_seconds;

        PassWindow {
            rise: samples[0].timestamp,
            set: samples[sample_count - 1].timestamp,
            first_index: run.first,
            last_index: run.last,
            peak_elevation_deg: peak.elevation_deg,
            peak_time: peak.timestamp,
            sample_count,
            duration_seconds,
            merged_gap_seconds: run.bridged_seconds,
            quality: PassQuality::grade(peak.elevation_deg, duration_seconds),
        }
    }
}

/// Split retained positions into runs of consecutive grid indices.
fn contiguous_runs(grid_indices: &[usize]) -> Vec<Run> {
    let mut runs: Vec<Run> = Vec::new();
    for (pos, &grid_index) in grid_indices.iter().enumerate() {
        match runs.last_mut() {
            Some(run) if grid_indices[run.last] + 1 == grid_index => run.last = pos,
            _ => runs.push(Run {
                first: pos,
                last: pos,
                bridged_seconds: 0.0,
            }),
        }
    }
    runs
}
