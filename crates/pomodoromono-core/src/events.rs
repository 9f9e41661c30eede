use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::progress::ProgressSnapshot;
use crate::timer::TimerState;

/// Every state change in the engine produces an Event.
/// The presentation layer prints or forwards them; listeners get the
/// lighter [`crate::timer::TimerStatus`] instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TimerStarted {
        total_secs: u64,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerResumed {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    /// Countdown rewound to the full duration and running again.
    TimerRestarted {
        total_secs: u64,
        at: DateTime<Utc>,
    },
    /// A tick exhausted the remaining time.
    TimerCompleted {
        total_secs: u64,
        at: DateTime<Utc>,
    },
    TimerReset {
        total_secs: u64,
        at: DateTime<Utc>,
    },
    DurationChanged {
        minutes: u32,
        total_secs: u64,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        state: TimerState,
        remaining_secs: u64,
        total_secs: u64,
        is_running: bool,
        has_finished: bool,
        clock: String,
        progress: ProgressSnapshot,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// Whether this event leaves the countdown running.
    pub fn starts_countdown(&self) -> bool {
        matches!(
            self,
            Event::TimerStarted { .. } | Event::TimerResumed { .. } | Event::TimerRestarted { .. }
        )
    }
}
