//! Elevation masking and pass detection over a propagated time series.

mod filter;
mod types;

pub use filter::{VisibilityFilter, DEFAULT_MAX_GAP_SECONDS};
pub use types::{PassQuality, PassWindow, VisibilityRecord, VisibilityStats};
