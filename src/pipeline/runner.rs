use chrono::{DateTime, Utc};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::{ConstellationConfig, RunConfig};
use crate::events::{EventAnalyzer, ServingLink};
use crate::geometry::{observe, ObserverLocation};
use crate::pipeline::abort::{AbortSignal, CancelToken};
use crate::pipeline::clock::{Clock, SystemClock};
use crate::pipeline::error::PipelineError;
use crate::pipeline::types::{Exclusion, ExclusionKind, PipelineInput, RunMetadata, RunOutput};
use crate::propagate::{propagate, PropagationError, TimeGrid};
use crate::scoring::{
    filtering_rate, geographic_score, score_handover, CompositeScore, CompositeWeights,
    HandoverParams, Ranker, SelectionResult, StageCounts, SubScores,
};
use crate::signal::{LinkBudget, ScoreRange, SignalEstimator};
use crate::tle::{parse_sources, OrbitalElementSet, ParseError, TleSource};
use crate::visibility::{VisibilityFilter, VisibilityRecord, VisibilityStats};

/// Called from a worker after each satellite finishes, with the
/// constellation name and NORAD id.
pub type ProgressFn = dyn Fn(&str, u64) + Send + Sync;

/// Runs the full selection for every constellation in an input.
pub struct Pipeline<C = SystemClock> {
    config: RunConfig,
    clock: C,
    cancel: CancelToken,
    progress: Option<Arc<ProgressFn>>,
}

impl Pipeline<SystemClock> {
    /// Validates the configuration up front; nothing runs on a bad config.
    pub fn new(config: RunConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self {
            config,
            clock: SystemClock,
            cancel: CancelToken::new(),
            progress: None,
        })
    }
}

impl<C: Clock> Pipeline<C> {
    pub fn with_clock<D: Clock>(self, clock: D) -> Pipeline<D> {
        Pipeline {
            config: self.config,
            clock,
            cancel: self.cancel,
            progress: self.progress,
        }
    }

    pub fn with_progress(mut self, progress: impl Fn(&str, u64) + Send + Sync + 'static) -> Self {
        self.progress = Some(Arc::new(progress));
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Handle for stopping the run from another thread.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn run(&self, input: &PipelineInput) -> Result<RunOutput, PipelineError> {
        for name in input.constellations.keys() {
            self.config.constellation(name)?;
        }

        let pool = ThreadPoolBuilder::new()
            .num_threads(self.config.workers.unwrap_or(0))
            .build()?;
        let serving = input
            .serving
            .clone()
            .unwrap_or(ServingLink::Fixed(self.config.events.serving));

        let mut selections = BTreeMap::new();
        let mut trajectories = BTreeMap::new();
        let mut visibility = BTreeMap::new();
        let mut exclusions = Vec::new();
        let mut totals = StageCounts::default();
        let mut oldest_epoch: Option<DateTime<Utc>> = None;
        let mut completed = 0;
        let mut pending = 0;

        for (name, sources) in &input.constellations {
            let run = self.run_constellation(&pool, name, sources, &serving)?;

            totals.add(&run.selection.stage_counts);
            oldest_epoch = match (oldest_epoch, run.oldest_epoch) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            };
            completed += run.completed;
            pending += run.cancelled;
            exclusions.extend(run.exclusions);
            for record in run.trajectories {
                trajectories.insert(record.norad_id, record);
            }
            visibility.insert(name.clone(), run.stats);
            selections.insert(name.clone(), run.selection);
        }

        let generated_at = self.clock.now();
        let max_tle_age_days =
            oldest_epoch.map(|epoch| (generated_at - epoch).num_seconds() as f64 / 86_400.0);
        if let Some(age) = max_tle_age_days {
            if age > self.config.stale_tle_days {
                log::warn!(
                    "oldest TLE is {:.1} days old (limit {:.1})",
                    age,
                    self.config.stale_tle_days
                );
            }
        }

        let aborted = (pending > 0).then(|| AbortSignal {
            completed,
            pending,
            reason: "run cancelled".to_string(),
        });
        if let Some(signal) = &aborted {
            log::warn!(
                "run cancelled: {} satellites done, {} never started",
                signal.completed,
                signal.pending
            );
        }

        let metadata = RunMetadata {
            calculation_base_time: selections
                .values()
                .filter_map(|s: &SelectionResult| s.calculation_base_time)
                .max(),
            earliest_epoch: selections
                .values()
                .filter_map(|s: &SelectionResult| s.earliest_epoch)
                .min(),
            input_satellites: totals.input,
            output_satellites: totals.selected,
            filtering_rate: filtering_rate(totals.input, totals.selected),
            stage_counts: totals,
            visibility,
            exclusions,
            aborted,
            generated_at,
            max_tle_age_days,
        };

        log::info!(
            "run complete: {} of {} satellites selected across {} constellations",
            metadata.output_satellites,
            metadata.input_satellites,
            selections.len()
        );

        Ok(RunOutput {
            selections,
            trajectories,
            metadata,
        })
    }

    fn run_constellation(
        &self,
        pool: &ThreadPool,
        name: &str,
        sources: &[TleSource],
        serving: &ServingLink,
    ) -> Result<ConstellationRun, PipelineError> {
        let constellation = self.config.constellation(name)?;
        let window_minutes = self.config.window_minutes(name)?;

        let outcome = parse_sources(name, sources);
        let input_records = outcome.records();
        let mut exclusions: Vec<Exclusion> = outcome
            .errors
            .iter()
            .map(|e| parse_exclusion(name, e))
            .collect();
        let mut sets = outcome.elements;
        let parsed = sets.len();
        let oldest_epoch = sets.iter().map(|s| s.epoch).min();

        if self.config.sample_mode {
            sets.truncate(self.config.sample_size);
        }
        let sampled = sets.len();

        log::info!(
            "{}: {} of {} records parsed, {} sampled, {:.0} min window at {}s",
            name,
            parsed,
            input_records,
            sampled,
            window_minutes,
            self.config.sample_interval_seconds
        );

        let context =
            SatelliteContext::new(&self.config, name, constellation, window_minutes, serving);
        let cancel = &self.cancel;
        let progress = self.progress.as_deref();
        let results: Vec<SatelliteOutcome> = pool.install(|| {
            sets.par_iter()
                .map(|set| {
                    if cancel.is_cancelled() {
                        return SatelliteOutcome::Cancelled(set.norad_id);
                    }
                    let outcome = context.evaluate(set);
                    if let Some(progress) = progress {
                        progress(name, set.norad_id);
                    }
                    outcome
                })
                .collect()
        });

        let grid_len = context.grid.len();
        let mut stats = VisibilityStats::default();
        let mut candidates = Vec::new();
        let mut trajectories = Vec::new();
        let mut propagated = 0;
        let mut cancelled = 0;

        for result in results {
            match result {
                SatelliteOutcome::Scored(scored) => {
                    propagated += 1;
                    stats.record(grid_len, scored.record.observations.len());
                    if self.config.trajectory_requests.contains(&scored.record.norad_id) {
                        trajectories.push(scored.record);
                    }
                    candidates.push(scored.composite);
                }
                SatelliteOutcome::NotVisible(norad_id) => {
                    propagated += 1;
                    stats.record(grid_len, 0);
                    exclusions.push(Exclusion {
                        norad_id: Some(norad_id),
                        constellation: name.to_string(),
                        kind: ExclusionKind::NotVisible,
                        reason: format!(
                            "never above {:.1}° elevation",
                            constellation.min_elevation_deg
                        ),
                    });
                }
                SatelliteOutcome::Failed(norad_id, error) => {
                    log::warn!("[{}] excluded: {}", name, error);
                    exclusions.push(Exclusion {
                        norad_id: Some(norad_id),
                        constellation: name.to_string(),
                        kind: ExclusionKind::Propagation,
                        reason: error.to_string(),
                    });
                }
                SatelliteOutcome::Cancelled(norad_id) => {
                    cancelled += 1;
                    exclusions.push(Exclusion {
                        norad_id: Some(norad_id),
                        constellation: name.to_string(),
                        kind: ExclusionKind::Cancelled,
                        reason: "run cancelled before processing".to_string(),
                    });
                }
            }
        }

        log::info!(
            "{}: visibility kept {} of {} satellites, {} of {} points",
            name,
            stats.satellites_out,
            stats.satellites_in,
            stats.points_out,
            stats.points_in
        );

        let scored = candidates.len();
        let counts = StageCounts {
            input: input_records,
            parsed,
            sampled,
            propagated,
            visible: scored,
            scored,
            selected: 0,
        };
        let ranker = Ranker {
            policy: self.config.selection,
        };
        let selection = ranker.select(name, candidates, constellation.top_n, counts);

        Ok(ConstellationRun {
            selection,
            trajectories,
            stats,
            exclusions,
            oldest_epoch,
            completed: sampled - cancelled,
            cancelled,
        })
    }
}

struct ConstellationRun {
    selection: SelectionResult,
    trajectories: Vec<VisibilityRecord>,
    stats: VisibilityStats,
    exclusions: Vec<Exclusion>,
    oldest_epoch: Option<DateTime<Utc>>,
    completed: usize,
    cancelled: usize,
}

struct ScoredSatellite {
    composite: CompositeScore,
    record: VisibilityRecord,
}

enum SatelliteOutcome {
    Scored(Box<ScoredSatellite>),
    NotVisible(u64),
    Failed(u64, PropagationError),
    Cancelled(u64),
}

/// Read-only per-constellation state shared by the workers.
struct SatelliteContext<'a> {
    constellation: &'a str,
    grid: TimeGrid,
    observer: ObserverLocation,
    filter: VisibilityFilter,
    estimator: SignalEstimator,
    analyzer: EventAnalyzer,
    serving: &'a ServingLink,
    handover: HandoverParams,
    weights: CompositeWeights,
    score_range: ScoreRange,
}

impl<'a> SatelliteContext<'a> {
    fn new(
        config: &RunConfig,
        constellation: &'a str,
        settings: &ConstellationConfig,
        window_minutes: f64,
        serving: &'a ServingLink,
    ) -> Self {
        let step = config.sample_interval_seconds;
        Self {
            constellation,
            grid: TimeGrid::covering(window_minutes, step),
            observer: config.observer,
            filter: VisibilityFilter::new(settings.min_elevation_deg, step)
                .with_max_gap(config.max_gap_seconds),
            estimator: SignalEstimator {
                budget: LinkBudget::new(settings.band, config.receiver),
                reference_elevations_deg: config.reference_elevations_deg.clone(),
                grades: config.grades,
            },
            analyzer: EventAnalyzer {
                a4: config.events.a4,
                a5: config.events.a5,
                d2: config.events.d2,
                confirm_samples: config.events.confirm_samples,
                weights: config.events.weights,
            },
            serving,
            handover: config.handover,
            weights: config.weights,
            score_range: config.signal_score_range,
        }
    }

    fn evaluate(&self, set: &OrbitalElementSet) -> SatelliteOutcome {
        let states = match propagate(set, &self.grid) {
            Ok(states) => states,
            Err(e) => return SatelliteOutcome::Failed(set.norad_id, e),
        };
        let observations = states.iter().map(|s| observe(s, &self.observer)).collect();

        let Some(record) = self.filter.apply(set.norad_id, self.constellation, observations)
        else {
            return SatelliteOutcome::NotVisible(set.norad_id);
        };

        let handover = score_handover(&record, &self.handover);
        let geographic = geographic_score(&record);
        let profile = self.estimator.profile(set.norad_id, set.altitude_km());
        let samples = self.estimator.observed(&record);
        let events = self.analyzer.assess(set.norad_id, &samples, self.serving);

        let sub_scores = SubScores::new(
            self.score_range.score(profile.mean_rsrp_dbm),
            events.event_potential,
            handover.score,
            geographic,
        );
        let score = self.weights.combine(&sub_scores);
        log::debug!(
            "[{}] {} {}: {:.3} (handover {:.1}, {} passes)",
            self.constellation,
            set.norad_id,
            set.name,
            score,
            handover.score,
            record.passes.len()
        );

        SatelliteOutcome::Scored(Box::new(ScoredSatellite {
            composite: CompositeScore {
                norad_id: set.norad_id,
                name: set.name.clone(),
                constellation: self.constellation.to_string(),
                score,
                sub_scores,
                signal_grade: profile.grade,
                handover,
                epoch: set.epoch,
            },
            record,
        }))
    }
}

fn parse_exclusion(constellation: &str, error: &ParseError) -> Exclusion {
    let norad_id = match error {
        ParseError::Duplicate { norad_id, .. } => Some(*norad_id),
        _ => None,
    };
    let kind = if error.is_time_base() {
        ExclusionKind::TimeBase
    } else {
        ExclusionKind::Parse
    };
    Exclusion {
        norad_id,
        constellation: constellation.to_string(),
        kind,
        reason: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;
    use crate::pipeline::clock::FixedClock;
    use crate::testing::SyntheticOrbit;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn starlink_text(count: u64) -> String {
        (0..count)
            .map(|i| {
                SyntheticOrbit::starlink_like(44000 + i)
                    .with_mean_anomaly(31.8751 + 6.0 * i as f64)
                    .record(&format!("STARLINK-{}", 44000 + i))
            })
            .collect()
    }

    fn input(constellation: &str, text: String) -> PipelineInput {
        PipelineInput::new(BTreeMap::from([(
            constellation.to_string(),
            vec![TleSource::new(format!("{}.tle", constellation), text)],
        )]))
    }

    fn pipeline(config: RunConfig) -> Pipeline<FixedClock> {
        Pipeline::new(config)
            .unwrap()
            .with_clock(FixedClock(Utc.with_ymd_and_hms(2024, 4, 12, 0, 0, 0).unwrap()))
    }

    fn small_config() -> RunConfig {
        RunConfig {
            workers: Some(2),
            ..RunConfig::default()
        }
    }

    #[test]
    fn test_runs_are_deterministic() {
        let input = input("starlink", starlink_text(12));
        let a = pipeline(small_config()).run(&input).unwrap();
        let b = pipeline(RunConfig {
            workers: Some(4),
            ..RunConfig::default()
        })
        .run(&input)
        .unwrap();
        assert_eq!(a.selections, b.selections);
        assert!(!a.selections["starlink"].selected.is_empty());
    }

    #[test]
    fn test_clock_does_not_change_selection() {
        let input = input("starlink", starlink_text(6));
        let early = pipeline(small_config())
            .with_clock(FixedClock(Utc.with_ymd_and_hms(2024, 4, 10, 0, 0, 0).unwrap()))
            .run(&input)
            .unwrap();
        let late = pipeline(small_config())
            .with_clock(FixedClock(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()))
            .run(&input)
            .unwrap();

        assert_eq!(early.selections, late.selections);
        assert_eq!(
            early.metadata.calculation_base_time,
            late.metadata.calculation_base_time
        );
        assert!(late.metadata.max_tle_age_days > early.metadata.max_tle_age_days);
    }

    #[test]
    fn test_sample_mode_takes_first_n() {
        let config = RunConfig {
            sample_mode: true,
            sample_size: 50,
            ..small_config()
        };
        let output = pipeline(config).run(&input("starlink", starlink_text(60))).unwrap();
        let counts = output.selections["starlink"].stage_counts;

        assert_eq!(counts.input, 60);
        assert_eq!(counts.parsed, 60);
        assert_eq!(counts.sampled, 50);
        assert_eq!(counts.propagated, 50);
    }

    #[test]
    fn test_counts_and_exclusions() {
        let mut text = starlink_text(3);
        text.push_str(&SyntheticOrbit::equatorial(45000).record("LOW-INCL"));
        text.push_str(
            &SyntheticOrbit::starlink_like(45001)
                .with_mean_motion(2.00563)
                .record("NOT-LEO"),
        );
        let (line1, _) = SyntheticOrbit::starlink_like(45002).lines();
        text.push_str(&format!("BROKEN\n{}\n", line1));

        let output = pipeline(small_config()).run(&input("starlink", text)).unwrap();
        let selection = &output.selections["starlink"];
        let counts = selection.stage_counts;

        assert!(counts.is_monotonic());
        assert_eq!(counts.input, 6);
        assert_eq!(counts.parsed, 5);
        assert_eq!(counts.propagated, 4);
        assert!(counts.visible <= 3);
        assert_eq!(
            selection.filtering_rate,
            1.0 - selection.retained_count as f64 / 6.0
        );

        let meta = &output.metadata;
        assert_eq!(meta.exclusions_of(ExclusionKind::Parse).count(), 1);
        assert_eq!(
            meta.exclusions_of(ExclusionKind::Propagation)
                .map(|e| e.norad_id)
                .collect::<Vec<_>>(),
            vec![Some(45001)]
        );
        assert!(meta
            .exclusions_of(ExclusionKind::NotVisible)
            .any(|e| e.norad_id == Some(45000)));
        assert!(meta.aborted.is_none());
    }

    #[test]
    fn test_cancelled_run_records_every_satellite() {
        let pipeline = pipeline(small_config());
        pipeline.cancel_token().cancel();
        let output = pipeline.run(&input("starlink", starlink_text(4))).unwrap();

        assert!(output.selections["starlink"].selected.is_empty());
        assert_eq!(output.metadata.exclusions_of(ExclusionKind::Cancelled).count(), 4);
        assert_eq!(
            output.metadata.aborted,
            Some(AbortSignal {
                completed: 0,
                pending: 4,
                reason: "run cancelled".to_string(),
            })
        );
    }

    #[test]
    fn test_cancel_mid_run_keeps_finished_satellites() {
        let pipeline = pipeline(RunConfig {
            workers: Some(1),
            trajectory_requests: vec![44000],
            ..small_config()
        });
        let token = pipeline.cancel_token();
        let finished = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&finished);
        let pipeline = pipeline.with_progress(move |_, _| {
            if counter.fetch_add(1, Ordering::SeqCst) + 1 == 3 {
                token.cancel();
            }
        });

        let output = pipeline.run(&input("starlink", starlink_text(8))).unwrap();
        let meta = &output.metadata;
        let selection = &output.selections["starlink"];

        assert_eq!(finished.load(Ordering::SeqCst), 3);
        assert_eq!(
            meta.aborted,
            Some(AbortSignal {
                completed: 3,
                pending: 5,
                reason: "run cancelled".to_string(),
            })
        );
        assert_eq!(meta.exclusions_of(ExclusionKind::Cancelled).count(), 5);
        assert_eq!(selection.stage_counts.propagated, 3);
        assert_eq!(
            selection.stage_counts.scored + meta.exclusions_of(ExclusionKind::NotVisible).count(),
            3
        );
        assert!(!selection.selected.is_empty());
        assert!(selection
            .selected
            .iter()
            .all(|c| meta.exclusions.iter().all(|e| e.norad_id != Some(c.norad_id))));
        assert!(output.trajectories.contains_key(&44000));
    }

    #[test]
    fn test_constellation_uses_its_own_mask() {
        let text: String = (0..2)
            .map(|i| {
                SyntheticOrbit::oneweb_like(48000 + i)
                    .with_mean_anomaly(24.9621 + 5.0 * i as f64)
                    .record(&format!("ONEWEB-{}", 48000 + i))
            })
            .collect();
        let config = RunConfig {
            trajectory_requests: vec![48000, 48001],
            ..small_config()
        };
        let output = pipeline(config).run(&input("oneweb", text)).unwrap();

        assert_eq!(output.selections["oneweb"].stage_counts.propagated, 2);
        for record in output.trajectories.values() {
            assert_eq!(record.min_elevation_deg, 10.0);
            assert!(record.observations.iter().all(|o| o.elevation_deg >= 10.0));
        }
    }

    #[test]
    fn test_unknown_constellation_is_fatal() {
        let result = pipeline(small_config()).run(&input("kuiper", starlink_text(1)));
        assert!(matches!(
            result,
            Err(PipelineError::Configuration(ConfigError::UnknownConstellation(_)))
        ));
    }

    #[test]
    fn test_trajectory_requests() {
        let config = RunConfig {
            trajectory_requests: vec![44000, 99999],
            ..small_config()
        };
        let output = pipeline(config).run(&input("starlink", starlink_text(2))).unwrap();
        let record = &output.trajectories[&44000];
        assert!(record.observations.iter().all(|o| o.elevation_deg >= 5.0));
        assert!(!output.trajectories.contains_key(&99999));
    }
}
