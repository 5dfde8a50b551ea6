use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared flag checked before each satellite starts. Cloning shares the flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Recorded when a run stopped before every satellite was processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AbortSignal {
    /// Satellites that finished before cancellation.
    pub completed: usize,
    /// Satellites never started.
    pub pending: usize,
    pub reason: String,
}
