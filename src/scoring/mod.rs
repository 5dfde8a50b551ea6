//! Handover, coverage and composite scoring plus the final ranking.

mod composite;
mod geographic;
mod handover;

pub use composite::{
    composite_cmp, filtering_rate, CompositeScore, CompositeWeights, PoolQuality, Ranker,
    SelectionPolicy, SelectionResult, StageCounts, SubScores,
};
pub use geographic::geographic_score;
pub use handover::{rank_cmp, score_handover, HandoverParams, HandoverScore, Suitability};
