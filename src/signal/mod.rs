//! Downlink RSRP estimation.

mod model;
mod profile;

pub use model::{
    atmospheric_loss_db, free_space_path_loss_db, slant_range_km, Band, LinkBudget, Receiver,
};
pub use profile::{
    GradeThresholds, ReferencePoint, RsrpSample, ScoreRange, SignalEstimator, SignalGrade,
    SignalProfile, DEFAULT_REFERENCE_ELEVATIONS_DEG,
};
