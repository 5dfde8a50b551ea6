use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EventState {
    Monitoring,
    ConditionMet { consecutive: u32 },
    Triggered,
}

/// Entry needs `confirm_samples` consecutive entering samples; exit needs the
/// leaving condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventStateMachine {
    state: EventState,
    confirm_samples: u32,
}

impl EventStateMachine {
    pub fn new(confirm_samples: u32) -> Self {
        Self {
            state: EventState::Monitoring,
            confirm_samples: confirm_samples.max(1),
        }
    }

    pub fn state(&self) -> EventState {
        self.state
    }

    pub fn is_triggered(&self) -> bool {
        self.state == EventState::Triggered
    }

    pub fn reset(&mut self) {
        self.state = EventState::Monitoring;
    }

    /// Advance by one sample. Returns true when this sample triggers.
    pub fn step(&mut self, entering: bool, leaving: bool) -> bool {
        let (next, fired) = match self.state {
            EventState::Monitoring if entering => self.count(1),
            EventState::Monitoring => (EventState::Monitoring, false),
            EventState::ConditionMet { consecutive } if entering => self.count(consecutive + 1),
            EventState::ConditionMet { .. } => (EventState::Monitoring, false),
            EventState::Triggered if leaving => (EventState::Monitoring, false),
            EventState::Triggered => (EventState::Triggered, false),
        };
        self.state = next;
        fired
    }

    fn count(&self, consecutive: u32) -> (EventState, bool) {
        if consecutive >= self.confirm_samples {
            (EventState::Triggered, true)
        } else {
            (EventState::ConditionMet { consecutive }, false)
        }
    }
}
