use crate::events::state::EventStateMachine;
use crate::events::types::{
    A4Params, A5Params, ConditionSnapshot, D2Params, EventAssessment, EventKind, EventOutcome,
    EventWeights, ServingLink, ServingSample,
};
use crate::signal::RsrpSample;

pub const DEFAULT_CONFIRM_SAMPLES: u32 = 2;

/// Entering and leaving conditions of one measurement event.
pub trait EventCondition {
    fn kind(&self) -> EventKind;
    fn entering(&self, candidate: &RsrpSample, serving: &ServingSample) -> bool;
    fn leaving(&self, candidate: &RsrpSample, serving: &ServingSample) -> bool;
    fn snapshot(&self, candidate: &RsrpSample, serving: &ServingSample) -> ConditionSnapshot;
}

impl EventCondition for A4Params {
    fn kind(&self) -> EventKind {
        EventKind::A4
    }

    fn entering(&self, candidate: &RsrpSample, _: &ServingSample) -> bool {
        candidate.rsrp_dbm + self.neighbour_offset_db() - self.hysteresis_db > self.threshold_dbm
    }

    fn leaving(&self, candidate: &RsrpSample, _: &ServingSample) -> bool {
        candidate.rsrp_dbm + self.neighbour_offset_db() + self.hysteresis_db < self.threshold_dbm
    }

    fn snapshot(&self, candidate: &RsrpSample, _: &ServingSample) -> ConditionSnapshot {
        ConditionSnapshot {
            offset_seconds: candidate.offset_seconds,
            measured: candidate.rsrp_dbm,
            offset: self.neighbour_offset_db(),
            threshold: self.threshold_dbm,
            hysteresis: self.hysteresis_db,
            serving_measured: None,
            serving_threshold: None,
        }
    }
}

impl EventCondition for A5Params {
    fn kind(&self) -> EventKind {
        EventKind::A5
    }

    fn entering(&self, candidate: &RsrpSample, serving: &ServingSample) -> bool {
        serving.rsrp_dbm + self.hysteresis_db < self.threshold1_dbm
            && candidate.rsrp_dbm + self.neighbour_offset_db() - self.hysteresis_db
                > self.threshold2_dbm
    }

    fn leaving(&self, candidate: &RsrpSample, serving: &ServingSample) -> bool {
        serving.rsrp_dbm - self.hysteresis_db > self.threshold1_dbm
            || candidate.rsrp_dbm + self.neighbour_offset_db() + self.hysteresis_db
                < self.threshold2_dbm
    }

    fn snapshot(&self, candidate: &RsrpSample, serving: &ServingSample) -> ConditionSnapshot {
        ConditionSnapshot {
            offset_seconds: candidate.offset_seconds,
            measured: candidate.rsrp_dbm,
            offset: self.neighbour_offset_db(),
            threshold: self.threshold2_dbm,
            hysteresis: self.hysteresis_db,
            serving_measured: Some(serving.rsrp_dbm),
            serving_threshold: Some(self.threshold1_dbm),
        }
    }
}

impl EventCondition for D2Params {
    fn kind(&self) -> EventKind {
        EventKind::D2
    }

    fn entering(&self, candidate: &RsrpSample, serving: &ServingSample) -> bool {
        serving.distance_km - self.hysteresis_km > self.threshold1_km
            && candidate.slant_range_km + self.hysteresis_km < self.threshold2_km
    }

    fn leaving(&self, candidate: &RsrpSample, serving: &ServingSample) -> bool {
        serving.distance_km + self.hysteresis_km < self.threshold1_km
            || candidate.slant_range_km - self.hysteresis_km > self.threshold2_km
    }

    fn snapshot(&self, candidate: &RsrpSample, serving: &ServingSample) -> ConditionSnapshot {
        ConditionSnapshot {
            offset_seconds: candidate.offset_seconds,
            measured: candidate.slant_range_km,
            offset: 0.0,
            threshold: self.threshold2_km,
            hysteresis: self.hysteresis_km,
            serving_measured: Some(serving.distance_km),
            serving_threshold: Some(self.threshold1_km),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventAnalyzer {
    pub a4: A4Params,
    pub a5: A5Params,
    pub d2: D2Params,
    pub confirm_samples: u32,
    pub weights: EventWeights,
}

impl Default for EventAnalyzer {
    fn default() -> Self {
        Self {
            a4: A4Params::default(),
            a5: A5Params::default(),
            d2: D2Params::default(),
            confirm_samples: DEFAULT_CONFIRM_SAMPLES,
            weights: EventWeights::default(),
        }
    }
}

impl EventAnalyzer {
    pub fn assess(
        &self,
        norad_id: u64,
        samples: &[RsrpSample],
        serving: &ServingLink,
    ) -> EventAssessment {
        let a4 = evaluate(&self.a4, samples, serving, self.confirm_samples);
        let a5 = evaluate(&self.a5, samples, serving, self.confirm_samples);
        let d2 = evaluate(&self.d2, samples, serving, self.confirm_samples);

        let total = self.weights.total();
        let event_potential = if total > 0.0 {
            ((self.weights.a4 * a4.score + self.weights.a5 * a5.score + self.weights.d2 * d2.score)
                / total)
                .clamp(0.0, 1.0)
        } else {
            0.0
        };

        log::debug!(
            "satellite {}: A4 {}/{} A5 {}/{} D2 {}/{} potential {:.3}",
            norad_id,
            a4.triggered_samples,
            a4.evaluated_samples,
            a5.triggered_samples,
            a5.evaluated_samples,
            d2.triggered_samples,
            d2.evaluated_samples,
            event_potential
        );

        EventAssessment {
            norad_id,
            a4,
            a5,
            d2,
            event_potential,
        }
    }
}

/// Run one event's state machine over the sample series. The machine starts
/// over at every pass boundary.
pub fn evaluate<C: EventCondition>(
    condition: &C,
    samples: &[RsrpSample],
    serving: &ServingLink,
    confirm_samples: u32,
) -> EventOutcome {
    let mut machine = EventStateMachine::new(confirm_samples);
    let mut segment = samples.first().map(|s| s.segment);
    let mut trigger_count = 0;
    let mut triggered_samples = 0;
    let mut first_trigger = None;

    for sample in samples {
        if segment != Some(sample.segment) {
            machine.reset();
            segment = Some(sample.segment);
        }

        let reference = serving.at(sample.grid_index);
        let fired = machine.step(
            condition.entering(sample, &reference),
            condition.leaving(sample, &reference),
        );
        if fired {
            trigger_count += 1;
            if first_trigger.is_none() {
                first_trigger = Some(condition.snapshot(sample, &reference));
            }
        }
        if machine.is_triggered() {
            triggered_samples += 1;
        }
    }

    let snapshot = first_trigger.or_else(|| {
        samples
            .last()
            .map(|last| condition.snapshot(last, &serving.at(last.grid_index)))
    });
    let evaluated_samples = samples.len();
    let score = if evaluated_samples == 0 {
        0.0
    } else {
        triggered_samples as f64 / evaluated_samples as f64
    };

    EventOutcome {
        kind: condition.kind(),
        triggered: trigger_count > 0,
        trigger_count,
        triggered_samples,
        evaluated_samples,
        score,
        snapshot,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::state::EventState;
    use chrono::{Duration, TimeZone, Utc};
    use proptest::prelude::*;

    fn samples(rsrp: &[f64], range_km: f64) -> Vec<RsrpSample> {
        let epoch = Utc.with_ymd_and_hms(2024, 4, 9, 12, 0, 0).unwrap();
        rsrp.iter()
            .enumerate()
            .map(|(i, &rsrp_dbm)| RsrpSample {
                timestamp: epoch + Duration::seconds(30 * i as i64),
                offset_seconds: 30.0 * i as f64,
                elevation_deg: 40.0,
                slant_range_km: range_km,
                rsrp_dbm,
                grid_index: i,
                segment: 0,
            })
            .collect()
    }

    #[test]
    fn test_a4_triggers_after_confirmation() {
        let series = samples(&[-95.0, -85.0, -84.0, -83.0, -89.0, -93.0], 800.0);
        let outcome = evaluate(&A4Params::default(), &series, &ServingLink::default(), 2);

        assert!(outcome.triggered);
        assert_eq!(outcome.trigger_count, 1);
        // Triggers at index 2, holds through -89 (inside the band), leaves at -93.
        assert_eq!(outcome.triggered_samples, 3);
        assert_eq!(outcome.evaluated_samples, 6);
        assert!((outcome.score - 0.5).abs() < 1e-12);

        let snapshot = outcome.snapshot.unwrap();
        assert_eq!(snapshot.measured, -84.0);
        assert_eq!(snapshot.offset_seconds, 60.0);
    }

    #[test]
    fn test_a5_needs_weak_serving() {
        let series = samples(&[-85.0, -85.0, -85.0], 800.0);
        let strong = ServingLink::Fixed(ServingSample {
            rsrp_dbm: -95.0,
            distance_km: 2000.0,
        });
        let weak = ServingLink::Fixed(ServingSample {
            rsrp_dbm: -105.0,
            distance_km: 2000.0,
        });

        assert!(!evaluate(&A5Params::default(), &series, &strong, 2).triggered);
        let outcome = evaluate(&A5Params::default(), &series, &weak, 2);
        assert!(outcome.triggered);
        assert_eq!(outcome.snapshot.unwrap().serving_measured, Some(-105.0));
    }

    #[test]
    fn test_cell_offsets_bias_neighbour() {
        let series = samples(&[-91.0, -91.0, -91.0], 800.0);
        assert!(!evaluate(&A4Params::default(), &series, &ServingLink::default(), 2).triggered);

        let biased = A4Params {
            ofn_db: 2.0,
            ocn_db: 2.0,
            ..A4Params::default()
        };
        let outcome = evaluate(&biased, &series, &ServingLink::default(), 2);
        assert!(outcome.triggered);
        let snapshot = outcome.snapshot.unwrap();
        assert_eq!(snapshot.measured, -91.0);
        assert_eq!(snapshot.offset, 4.0);

        let weak = ServingLink::Fixed(ServingSample {
            rsrp_dbm: -105.0,
            distance_km: 2000.0,
        });
        let penalised = A5Params {
            ocn_db: -10.0,
            ..A5Params::default()
        };
        let strong = samples(&[-85.0, -85.0, -85.0], 800.0);
        assert!(evaluate(&A5Params::default(), &strong, &weak, 2).triggered);
        assert!(!evaluate(&penalised, &strong, &weak, 2).triggered);
    }

    #[test]
    fn test_d2_uses_distances() {
        let near = samples(&[-100.0; 4], 900.0);
        let far = samples(&[-100.0; 4], 1300.0);
        let serving = ServingLink::default();

        assert_eq!(evaluate(&D2Params::default(), &near, &serving, 2).triggered_samples, 3);
        assert!(!evaluate(&D2Params::default(), &far, &serving, 2).triggered);
    }

    #[test]
    fn test_pass_boundary_resets_confirmation() {
        let mut series = samples(&[-80.0, -80.0, -80.0], 800.0);
        series[1].segment = 1;
        series[2].segment = 2;
        let outcome = evaluate(&A4Params::default(), &series, &ServingLink::default(), 2);
        assert!(!outcome.triggered);
    }

    #[test]
    fn test_potential_is_weighted_mean() {
        let analyzer = EventAnalyzer {
            weights: EventWeights {
                a4: 1.0,
                a5: 0.0,
                d2: 0.0,
            },
            ..EventAnalyzer::default()
        };
        let series = samples(&[-80.0, -80.0, -80.0, -80.0], 1300.0);
        let assessment = analyzer.assess(5, &series, &ServingLink::default());

        assert_eq!(assessment.a4.score, 0.75);
        assert_eq!(assessment.event_potential, 0.75);
    }

    #[test]
    fn test_empty_series_scores_zero() {
        let assessment = EventAnalyzer::default().assess(5, &[], &ServingLink::default());
        assert_eq!(assessment.event_potential, 0.0);
        assert!(assessment.outcomes().iter().all(|o| o.snapshot.is_none()));
    }

    #[derive(Clone, Copy, PartialEq)]
    enum Band {
        Low,
        High,
    }

    proptest! {
        #[test]
        fn prop_a4_changes_bounded_by_band_crossings(
            rsrp in prop::collection::vec(-110.0f64..-70.0, 0..200),
            confirm in 1u32..4,
        ) {
            let params = A4Params::default();
            let series = samples(&rsrp, 800.0);
            let serving = ServingSample::default();

            let mut machine = EventStateMachine::new(confirm);
            let mut changes = 0;
            for sample in &series {
                let before = machine.state() == EventState::Triggered;
                machine.step(params.entering(sample, &serving), params.leaving(sample, &serving));
                if before != machine.is_triggered() {
                    changes += 1;
                }
            }

            let mut band = Band::Low;
            let mut crossings = 0;
            for &value in &rsrp {
                let region = if value > params.threshold_dbm + params.hysteresis_db {
                    Some(Band::High)
                } else if value < params.threshold_dbm - params.hysteresis_db {
                    Some(Band::Low)
                } else {
                    None
                };
                if let Some(region) = region {
                    if region != band {
                        crossings += 1;
                        band = region;
                    }
                }
            }

            prop_assert!(changes <= crossings, "{} changes, {} crossings", changes, crossings);
        }
    }
}
