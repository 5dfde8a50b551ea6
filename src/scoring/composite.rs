use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::scoring::handover::{rank_cmp, HandoverScore};
use crate::signal::SignalGrade;

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositeWeights {
    pub signal: f64,
    pub event: f64,
    pub handover: f64,
    pub geographic: f64,
}

impl Default for CompositeWeights {
    fn default() -> Self {
        Self {
            signal: 0.4,
            event: 0.3,
            handover: 0.2,
            geographic: 0.1,
        }
    }
}

impl CompositeWeights {
    pub fn validate(&self) -> Result<(), String> {
        let all = [self.signal, self.event, self.handover, self.geographic];
        if all.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err("weights must be finite and non-negative".to_string());
        }
        let sum: f64 = all.iter().sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(format!("weights sum to {}, expected 1", sum));
        }
        Ok(())
    }

    pub fn combine(&self, sub: &SubScores) -> f64 {
        (self.signal * sub.signal
            + self.event * sub.event
            + self.handover * sub.handover
            + self.geographic * sub.geographic)
            .clamp(0.0, 1.0)
    }
}

/// Normalised inputs to the composite, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SubScores {
    pub signal: f64,
    pub event: f64,
    pub handover: f64,
    pub geographic: f64,
}

impl SubScores {
    /// Handover and geographic scores arrive on a 0-100 scale.
    pub fn new(signal: f64, event: f64, handover_percent: f64, geographic_percent: f64) -> Self {
        Self {
            signal: signal.clamp(0.0, 1.0),
            event: event.clamp(0.0, 1.0),
            handover: (handover_percent / 100.0).clamp(0.0, 1.0),
            geographic: (geographic_percent / 100.0).clamp(0.0, 1.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompositeScore {
    pub norad_id: u64,
    pub name: String,
    pub constellation: String,
    pub score: f64,
    pub sub_scores: SubScores,
    pub signal_grade: SignalGrade,
    pub handover: HandoverScore,
    pub epoch: DateTime<Utc>,
}

/// Score descending, then NORAD id ascending.
pub fn composite_cmp(a: &CompositeScore, b: &CompositeScore) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.norad_id.cmp(&b.norad_id))
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionPolicy {
    pub top_n: Option<usize>,
    pub score_floor: Option<f64>,
    pub handover_ready_score: f64,
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self {
            top_n: None,
            score_floor: None,
            handover_ready_score: 0.6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PoolQuality {
    VeryPoor,
    Poor,
    Fair,
    Good,
    Excellent,
}

impl PoolQuality {
    pub fn assess(mean_score: f64) -> Self {
        if mean_score >= 0.8 {
            PoolQuality::Excellent
        } else if mean_score >= 0.6 {
            PoolQuality::Good
        } else if mean_score >= 0.4 {
            PoolQuality::Fair
        } else if mean_score >= 0.2 {
            PoolQuality::Poor
        } else {
            PoolQuality::VeryPoor
        }
    }
}

/// Satellites surviving each stage. Never increases stage to stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StageCounts {
    /// Records framed from the input text.
    pub input: usize,
    pub parsed: usize,
    pub sampled: usize,
    pub propagated: usize,
    pub visible: usize,
    pub scored: usize,
    pub selected: usize,
}

impl StageCounts {
    pub fn is_monotonic(&self) -> bool {
        let chain = [
            self.input,
            self.parsed,
            self.sampled,
            self.propagated,
            self.visible,
            self.scored,
            self.selected,
        ];
        chain.windows(2).all(|w| w[1] <= w[0])
    }

    pub fn add(&mut self, other: &StageCounts) {
        self.input += other.input;
        self.parsed += other.parsed;
        self.sampled += other.sampled;
        self.propagated += other.propagated;
        self.visible += other.visible;
        self.scored += other.scored;
        self.selected += other.selected;
    }
}

/// `1 - retained / input`, zero for an empty input.
pub fn filtering_rate(input: usize, retained: usize) -> f64 {
    if input == 0 {
        0.0
    } else {
        1.0 - retained as f64 / input as f64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionResult {
    pub constellation: String,
    pub selected: Vec<CompositeScore>,
    pub input_count: usize,
    pub retained_count: usize,
    pub filtering_rate: f64,
    pub stage_counts: StageCounts,
    /// Mean composite over every ranked candidate.
    pub mean_score: f64,
    pub pool_quality: PoolQuality,
    pub handover_ready: usize,
    /// Selected NORAD ids ordered by pass geometry alone.
    pub handover_order: Vec<u64>,
    /// Latest TLE epoch among ranked candidates.
    pub calculation_base_time: Option<DateTime<Utc>>,
    pub earliest_epoch: Option<DateTime<Utc>>,
}

impl SelectionResult {
    pub fn filtering_rate_percent(&self) -> f64 {
        self.filtering_rate * 100.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ranker {
    pub policy: SelectionPolicy,
}

impl Ranker {
    /// Order the candidates and apply top-N and score-floor selection.
    /// `top_n` overrides the policy's global value.
    pub fn select(
        &self,
        constellation: &str,
        mut candidates: Vec<CompositeScore>,
        top_n: Option<usize>,
        mut stage_counts: StageCounts,
    ) -> SelectionResult {
        candidates.sort_by(composite_cmp);

        let mean_score = if candidates.is_empty() {
            0.0
        } else {
            candidates.iter().map(|c| c.score).sum::<f64>() / candidates.len() as f64
        };
        let calculation_base_time = candidates.iter().map(|c| c.epoch).max();
        let earliest_epoch = candidates.iter().map(|c| c.epoch).min();

        if let Some(n) = top_n.or(self.policy.top_n) {
            candidates.truncate(n);
        }
        if let Some(floor) = self.policy.score_floor {
            candidates.retain(|c| c.score >= floor);
        }

        let handover_ready = candidates
            .iter()
            .filter(|c| c.score >= self.policy.handover_ready_score)
            .count();
        let mut by_handover: Vec<&HandoverScore> = candidates.iter().map(|c| &c.handover).collect();
        by_handover.sort_by(|a, b| rank_cmp(a, b));
        let handover_order = by_handover.iter().map(|h| h.norad_id).collect();

        let retained_count = candidates.len();
        stage_counts.selected = retained_count;
        let input_count = stage_counts.input;

        log::info!(
            "{}: selected {} of {} (filtered {:.1}%), pool {}",
            constellation,
            retained_count,
            input_count,
            filtering_rate(input_count, retained_count) * 100.0,
            PoolQuality::assess(mean_score)
        );

        SelectionResult {
            constellation: constellation.to_string(),
            selected: candidates,
            input_count,
            retained_count,
            filtering_rate: filtering_rate(input_count, retained_count),
            stage_counts,
            mean_score,
            pool_quality: PoolQuality::assess(mean_score),
            handover_ready,
            handover_order,
            calculation_base_time,
            earliest_epoch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::Suitability;
    use chrono::TimeZone;

    fn candidate(norad_id: u64, score: f64) -> CompositeScore {
        candidate_with_pass(norad_id, score, score * 100.0, 300.0)
    }

    fn candidate_with_pass(
        norad_id: u64,
        score: f64,
        handover_score: f64,
        duration_seconds: f64,
    ) -> CompositeScore {
        CompositeScore {
            norad_id,
            name: format!("SAT-{}", norad_id),
            constellation: "starlink".to_string(),
            score,
            sub_scores: SubScores::new(score, score, score * 100.0, score * 100.0),
            signal_grade: SignalGrade::Good,
            handover: HandoverScore {
                norad_id,
                score: handover_score,
                peak_component: 0.5,
                duration_component: 0.5,
                urgency_component: 0.5,
                peak_elevation_deg: 45.0,
                total_duration_seconds: duration_seconds,
                suitability: Suitability::Suitable,
            },
            epoch: Utc.with_ymd_and_hms(2024, 4, 9, 0, 0, 0).unwrap()
                + chrono::Duration::hours(norad_id as i64),
        }
    }

    fn counts(input: usize) -> StageCounts {
        StageCounts {
            input,
            parsed: input,
            sampled: input,
            propagated: input,
            visible: input,
            scored: input,
            selected: 0,
        }
    }

    #[test]
    fn test_perfect_sub_scores_give_one() {
        let weights = CompositeWeights::default();
        assert!(weights.validate().is_ok());
        let score = weights.combine(&SubScores::new(1.0, 1.0, 100.0, 100.0));
        assert!((score - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_weights_validation() {
        let uneven = CompositeWeights {
            signal: 0.5,
            ..CompositeWeights::default()
        };
        assert!(uneven.validate().is_err());
        let negative = CompositeWeights {
            signal: 0.6,
            geographic: -0.1,
            ..CompositeWeights::default()
        };
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_ties_break_on_norad_id() {
        let ranker = Ranker {
            policy: SelectionPolicy::default(),
        };
        let result = ranker.select(
            "starlink",
            vec![candidate(30, 0.5), candidate(10, 0.5), candidate(20, 0.9)],
            None,
            counts(3),
        );
        let order: Vec<u64> = result.selected.iter().map(|c| c.norad_id).collect();
        assert_eq!(order, vec![20, 10, 30]);
        assert_eq!(result.filtering_rate, 0.0);
    }

    #[test]
    fn test_top_n_floor_and_statistics() {
        let ranker = Ranker {
            policy: SelectionPolicy {
                top_n: Some(3),
                score_floor: Some(0.5),
                handover_ready_score: 0.6,
            },
        };
        let pool = vec![
            candidate(1, 0.9),
            candidate(2, 0.7),
            candidate(3, 0.4),
            candidate(4, 0.2),
        ];
        let result = ranker.select("starlink", pool, None, counts(8));

        assert_eq!(result.retained_count, 2);
        assert_eq!(result.stage_counts.selected, 2);
        assert!(result.stage_counts.is_monotonic());
        assert_eq!(result.handover_ready, 2);
        assert!((result.filtering_rate - 0.75).abs() < 1e-12);
        assert!((result.filtering_rate_percent() - 75.0).abs() < 1e-9);
        assert!((result.mean_score - 0.55).abs() < 1e-12);
        assert_eq!(result.pool_quality, PoolQuality::Fair);
        assert_eq!(
            result.calculation_base_time,
            Some(Utc.with_ymd_and_hms(2024, 4, 9, 4, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_handover_order_follows_pass_geometry() {
        let ranker = Ranker {
            policy: SelectionPolicy::default(),
        };
        let pool = vec![
            candidate_with_pass(1, 0.9, 40.0, 300.0),
            candidate_with_pass(2, 0.8, 70.0, 300.0),
            candidate_with_pass(3, 0.7, 70.0, 420.0),
        ];
        let result = ranker.select("starlink", pool, None, counts(3));

        let composite: Vec<u64> = result.selected.iter().map(|c| c.norad_id).collect();
        assert_eq!(composite, vec![1, 2, 3]);
        assert_eq!(result.handover_order, vec![3, 2, 1]);
    }

    #[test]
    fn test_override_top_n() {
        let ranker = Ranker {
            policy: SelectionPolicy {
                top_n: Some(3),
                ..SelectionPolicy::default()
            },
        };
        let pool = (1..=5).map(|i| candidate(i, 0.1 * i as f64)).collect();
        let result = ranker.select("oneweb", pool, Some(1), counts(5));
        assert_eq!(result.selected.len(), 1);
        assert_eq!(result.selected[0].norad_id, 5);
    }

    #[test]
    fn test_empty_input_has_zero_filtering_rate() {
        assert_eq!(filtering_rate(0, 0), 0.0);
        assert_eq!(PoolQuality::assess(0.0), PoolQuality::VeryPoor);
    }
}
