//! Owns one run: parsing, per-satellite processing on a worker pool,
//! exclusion bookkeeping and final ranking.

mod abort;
mod clock;
mod error;
mod runner;
mod types;

pub use abort::{AbortSignal, CancelToken};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::PipelineError;
pub use runner::{Pipeline, ProgressFn};
pub use types::{Exclusion, ExclusionKind, PipelineInput, RunMetadata, RunOutput};
