use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::task::Task;
use crate::timer::{Settings, TimerMode, TimerState};

/// Every state change in the system produces an Event.
/// The CLI prints them; the interactive loop renders from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TimerStarted {
        mode: TimerMode,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        mode: TimerMode,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerReset {
        mode: TimerMode,
        total_secs: u64,
        at: DateTime<Utc>,
    },
    TimerSkipped {
        from: TimerMode,
        to: TimerMode,
        at: DateTime<Utc>,
    },
    ModeSwitched {
        from: TimerMode,
        to: TimerMode,
        total_secs: u64,
        at: DateTime<Utc>,
    },
    /// `at` is the instant the countdown reached zero, which may be earlier
    /// than the tick that observed it.
    SessionCompleted {
        mode: TimerMode,
        next_mode: TimerMode,
        completed_sessions: u32,
        total_focus_secs: u64,
        at: DateTime<Utc>,
    },
    SettingsChanged {
        settings: Settings,
    },
    TaskAdded {
        task: Task,
    },
    TaskToggled {
        id: i64,
        completed: bool,
    },
    TaskDeleted {
        id: i64,
    },
    StateSnapshot {
        state: TimerState,
        mode: TimerMode,
        label: String,
        remaining_secs: u64,
        total_secs: u64,
        display: String,
        progress: f64,
        completed_sessions: u32,
        current_streak: u32,
        total_focus: String,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// Whether the timer record changed and should be persisted.
    pub fn touches_timer_record(&self) -> bool {
        matches!(
            self,
            Event::TimerPaused { .. }
                | Event::TimerSkipped { .. }
                | Event::ModeSwitched { .. }
                | Event::SessionCompleted { .. }
                | Event::SettingsChanged { .. }
        )
    }
}
