use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum PropagationError {
    #[error("satellite {norad_id}: degenerate elements ({reason})")]
    Degenerate { norad_id: u64, reason: String },
    #[error("satellite {norad_id}: mean motion {mean_motion} rev/day is not a LEO orbit")]
    UnsupportedRegime { norad_id: u64, mean_motion: f64 },
    #[error("satellite {norad_id}: elements rejected by SGP4: {message}")]
    Elements { norad_id: u64, message: String },
    #[error("satellite {norad_id}: propagation diverged at t+{offset_seconds}s: {message}")]
    Diverged {
        norad_id: u64,
        offset_seconds: f64,
        message: String,
    },
    #[error("satellite {norad_id}: radius {radius_km:.1} km at t+{offset_seconds}s is inside the Earth")]
    Decayed {
        norad_id: u64,
        offset_seconds: f64,
        radius_km: f64,
    },
}
