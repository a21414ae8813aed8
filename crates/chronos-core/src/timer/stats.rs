//! Session counters and the persisted timer record.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::settings::Settings;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerStats {
    pub completed_sessions: u32,
    pub current_streak: u32,
    /// Cumulative focus time in seconds.
    pub total_focus_secs: u64,
}

impl TimerStats {
    pub fn record_focus(&mut self, focus_secs: u64) {
        self.completed_sessions += 1;
        self.current_streak += 1;
        self.total_focus_secs += focus_secs;
    }

    /// `"{h}h {m}m"` as shown next to the counters.
    pub fn total_focus_display(&self) -> String {
        let hours = self.total_focus_secs / 3600;
        let minutes = (self.total_focus_secs % 3600) / 60;
        format!("{hours}h {minutes}m")
    }
}

/// Timer document as stored locally and remotely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerRecord {
    #[serde(default)]
    pub completed_sessions: u32,
    #[serde(default)]
    pub current_streak: u32,
    /// Seconds.
    #[serde(default)]
    pub total_focus_time: u64,
    #[serde(default)]
    pub settings: Settings,
    pub last_save_date: NaiveDate,
}

impl TimerRecord {
    pub fn new(stats: TimerStats, settings: Settings, last_save_date: NaiveDate) -> Self {
        Self {
            completed_sessions: stats.completed_sessions,
            current_streak: stats.current_streak,
            total_focus_time: stats.total_focus_secs,
            settings,
            last_save_date,
        }
    }

    /// Counters to adopt on load. A record saved on another day starts the
    /// day from zero.
    pub fn stats_for(&self, today: NaiveDate) -> TimerStats {
        if self.last_save_date != today {
            return TimerStats::default();
        }
        TimerStats {
            completed_sessions: self.completed_sessions,
            current_streak: self.current_streak,
            total_focus_secs: self.total_focus_time,
        }
    }
}
