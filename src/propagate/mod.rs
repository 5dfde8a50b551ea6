mod error;
mod propagator;
mod types;

pub use error::PropagationError;
pub use propagator::{propagate, MIN_LEO_MEAN_MOTION};
pub use types::{ReferenceFrame, StateVector, TimeGrid};
