//! 3GPP NTN measurement events (A4, A5, D2) with hysteresis.

mod analyzer;
mod state;
mod types;

pub use analyzer::{evaluate, EventAnalyzer, EventCondition, DEFAULT_CONFIRM_SAMPLES};
pub use state::{EventState, EventStateMachine};
pub use types::{
    A4Params, A5Params, ConditionSnapshot, D2Params, EventAssessment, EventKind, EventOutcome,
    EventWeights, ServingLink, ServingSample,
};
