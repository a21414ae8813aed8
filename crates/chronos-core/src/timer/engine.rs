//! Timer engine implementation.
//!
//! The timer engine is a wall-clock-based state machine. It does not use
//! internal threads or read the clock - every command takes `now` and the
//! caller is responsible for calling `tick()` (or `poll()`) periodically.
//!
//! Remaining time is derived from the instant the countdown was last
//! started and the time banked at that moment, so a missed tick (hidden
//! window, suspended laptop, a CLI invoked an hour later) never causes
//! drift: the next evaluation simply sees more elapsed time.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running -> (Paused | Completed) -> Idle (next mode) -> Running
//! ```

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::mode::TimerMode;
use super::settings::{SettingKey, Settings};
use super::stats::{TimerRecord, TimerStats};
use crate::error::ValidationError;
use crate::events::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    Idle,
    Running,
    Paused,
    /// Countdown reached zero; the switch to the next mode is pending.
    Completed,
}

/// Fixed timing rules that are not user settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerPolicy {
    /// Delay between completion and the automatic mode switch.
    pub advance_delay_ms: u64,
    /// Delay between the mode switch and the auto-start (when enabled).
    pub auto_start_delay_ms: u64,
    pub long_break_interval: u32,
}

impl Default for TimerPolicy {
    fn default() -> Self {
        Self {
            advance_delay_ms: 1000,
            auto_start_delay_ms: 500,
            long_break_interval: 4,
        }
    }
}

/// Countdown state. Persisted locally so a later process can resume it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerRuntime {
    pub mode: TimerMode,
    pub state: TimerState,
    pub total_ms: u64,
    /// Remaining time at `started_at` (or now, when not running).
    pub remaining_ms: u64,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub advance_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub auto_start_at: Option<DateTime<Utc>>,
}

impl TimerRuntime {
    fn fresh(mode: TimerMode, settings: &Settings) -> Self {
        // Never zero: every cycle must consume wall-clock time.
        let total_ms = settings.duration_ms(mode).max(1000);
        Self {
            mode,
            state: TimerState::Idle,
            total_ms,
            remaining_ms: total_ms,
            started_at: None,
            advance_at: None,
            auto_start_at: None,
        }
    }
}

/// Core timer engine.
#[derive(Debug, Clone)]
pub struct TimerEngine {
    settings: Settings,
    stats: TimerStats,
    policy: TimerPolicy,
    rt: TimerRuntime,
}

impl TimerEngine {
    /// Create a new engine in focus mode, idle, with a full countdown.
    pub fn new(settings: Settings, policy: TimerPolicy) -> Self {
        let rt = TimerRuntime::fresh(TimerMode::Focus, &settings);
        Self {
            settings,
            stats: TimerStats::default(),
            policy,
            rt,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn mode(&self) -> TimerMode {
        self.rt.mode
    }

    pub fn state(&self) -> TimerState {
        self.rt.state
    }

    pub fn is_running(&self) -> bool {
        self.rt.state == TimerState::Running
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn stats(&self) -> TimerStats {
        self.stats
    }

    pub fn runtime(&self) -> &TimerRuntime {
        &self.rt
    }

    pub fn total_ms(&self) -> u64 {
        self.rt.total_ms
    }

    pub fn remaining_ms(&self, now: DateTime<Utc>) -> u64 {
        match (self.rt.state, self.rt.started_at) {
            (TimerState::Running, Some(since)) => {
                let elapsed = (now - since).num_milliseconds().max(0) as u64;
                self.rt.remaining_ms.saturating_sub(elapsed)
            }
            _ => self.rt.remaining_ms,
        }
    }

    /// Whole seconds left, rounded up so a fresh 25:00 reads 25:00.
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> u64 {
        self.remaining_ms(now).div_ceil(1000)
    }

    /// 0.0 .. 1.0 progress within the current mode.
    pub fn progress(&self, now: DateTime<Utc>) -> f64 {
        if self.rt.total_ms == 0 {
            return 0.0;
        }
        1.0 - (self.remaining_ms(now) as f64 / self.rt.total_ms as f64)
    }

    pub fn label(&self) -> String {
        match self.rt.mode {
            TimerMode::Focus => format!("Session {}", self.stats.completed_sessions + 1),
            TimerMode::ShortBreak => "Short Break".to_string(),
            TimerMode::LongBreak => "Long Break".to_string(),
        }
    }

    /// The mode a skip or completion would switch to.
    pub fn next_mode(&self) -> TimerMode {
        self.rt
            .mode
            .next(self.stats.completed_sessions, self.policy.long_break_interval)
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self, now: DateTime<Utc>) -> Event {
        let remaining_secs = self.remaining_secs(now);
        Event::StateSnapshot {
            state: self.rt.state,
            mode: self.rt.mode,
            label: self.label(),
            remaining_secs,
            total_secs: self.rt.total_ms / 1000,
            display: format_clock(remaining_secs),
            progress: self.progress(now),
            completed_sessions: self.stats.completed_sessions,
            current_streak: self.stats.current_streak,
            total_focus: self.stats.total_focus_display(),
            at: now,
        }
    }

    /// The persisted form of counters and settings.
    pub fn record(&self, today: NaiveDate) -> TimerRecord {
        TimerRecord::new(self.stats, self.settings.clone(), today)
    }

    // ── Loading ──────────────────────────────────────────────────────

    /// Adopt a stored timer record. Counters from an earlier day are
    /// dropped; settings are always kept.
    pub fn apply_record(&mut self, record: &TimerRecord, today: NaiveDate) {
        self.stats = record.stats_for(today);
        self.settings = record.settings.clone().sanitized();
        if self.rt.state == TimerState::Idle {
            let pending = self.rt.auto_start_at;
            self.rt = TimerRuntime::fresh(self.rt.mode, &self.settings);
            self.rt.auto_start_at = pending;
        }
    }

    /// Resume a countdown saved by an earlier process.
    pub fn restore_runtime(&mut self, mut rt: TimerRuntime, now: DateTime<Utc>) {
        rt.total_ms = rt.total_ms.max(1000);
        rt.remaining_ms = rt.remaining_ms.min(rt.total_ms);
        match rt.state {
            TimerState::Running if rt.started_at.is_none() => rt.state = TimerState::Paused,
            TimerState::Completed if rt.advance_at.is_none() => rt.advance_at = Some(now),
            _ => {}
        }
        self.rt = rt;
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self, now: DateTime<Utc>) -> Option<Event> {
        match self.rt.state {
            TimerState::Running => None,
            TimerState::Completed => {
                self.advance(now);
                self.begin(now)
            }
            TimerState::Idle | TimerState::Paused => self.begin(now),
        }
    }

    pub fn pause(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if self.rt.state != TimerState::Running {
            return None;
        }
        let remaining = self.remaining_ms(now);
        if remaining == 0 {
            return self.complete(now);
        }
        self.rt.remaining_ms = remaining;
        self.rt.started_at = None;
        self.rt.state = TimerState::Paused;
        debug!(mode = %self.rt.mode, remaining_ms = remaining, "timer paused");
        Some(Event::TimerPaused {
            mode: self.rt.mode,
            remaining_secs: remaining.div_ceil(1000),
            at: now,
        })
    }

    pub fn toggle(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if self.is_running() {
            self.pause(now)
        } else {
            self.start(now)
        }
    }

    /// Restore the current mode's full duration.
    pub fn reset(&mut self, now: DateTime<Utc>) -> Option<Event> {
        self.halt(now);
        self.rt = TimerRuntime::fresh(self.rt.mode, &self.settings);
        Some(Event::TimerReset {
            mode: self.rt.mode,
            total_secs: self.rt.total_ms / 1000,
            at: now,
        })
    }

    /// Pause any active countdown and load `mode` with its full duration.
    pub fn switch_mode(&mut self, mode: TimerMode, now: DateTime<Utc>) -> Option<Event> {
        let from = self.rt.mode;
        self.halt(now);
        self.rt = TimerRuntime::fresh(mode, &self.settings);
        debug!(%from, to = %mode, "mode switched");
        Some(Event::ModeSwitched {
            from,
            to: mode,
            total_secs: self.rt.total_ms / 1000,
            at: now,
        })
    }

    /// Abandon the current countdown and move to the next mode now.
    pub fn skip(&mut self, now: DateTime<Utc>) -> Option<Event> {
        let from = self.rt.mode;
        self.halt(now);
        let to = self.next_mode();
        self.rt = TimerRuntime::fresh(to, &self.settings);
        self.schedule_auto_start(now);
        Some(Event::TimerSkipped { from, to, at: now })
    }

    /// Change one setting. Durations are given in minutes.
    pub fn update_settings(
        &mut self,
        key: SettingKey,
        value: &str,
    ) -> Result<Event, ValidationError> {
        self.settings.set(key, value)?;
        let idle = matches!(self.rt.state, TimerState::Idle | TimerState::Paused);
        if idle && key.mode() == Some(self.rt.mode) {
            let pending = self.rt.auto_start_at;
            self.rt = TimerRuntime::fresh(self.rt.mode, &self.settings);
            self.rt.auto_start_at = pending;
        }
        Ok(Event::SettingsChanged {
            settings: self.settings.clone(),
        })
    }

    /// Evaluate the timer at `now`. Returns at most one event.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<Event> {
        match self.rt.state {
            TimerState::Running => {
                if self.remaining_ms(now) == 0 {
                    return self.complete(now);
                }
                None
            }
            TimerState::Completed => match self.rt.advance_at {
                Some(at) if at <= now => self.advance(at),
                _ => None,
            },
            TimerState::Idle | TimerState::Paused => match self.rt.auto_start_at {
                Some(at) if at <= now => self.begin(at),
                _ => None,
            },
        }
    }

    /// Tick until nothing more is due at `now`.
    pub fn poll(&mut self, now: DateTime<Utc>) -> Vec<Event> {
        let mut events = Vec::new();
        while let Some(event) = self.tick(now) {
            events.push(event);
        }
        events
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn begin(&mut self, at: DateTime<Utc>) -> Option<Event> {
        if self.rt.remaining_ms == 0 {
            self.rt.remaining_ms = self.rt.total_ms;
        }
        self.rt.state = TimerState::Running;
        self.rt.started_at = Some(at);
        self.rt.advance_at = None;
        self.rt.auto_start_at = None;
        debug!(mode = %self.rt.mode, remaining_ms = self.rt.remaining_ms, "timer started");
        Some(Event::TimerStarted {
            mode: self.rt.mode,
            remaining_secs: self.rt.remaining_ms.div_ceil(1000),
            at,
        })
    }

    /// Stop the countdown without emitting an event.
    fn halt(&mut self, now: DateTime<Utc>) {
        if self.rt.state == TimerState::Running {
            self.rt.remaining_ms = self.remaining_ms(now);
            self.rt.started_at = None;
            self.rt.state = TimerState::Paused;
        }
    }

    fn complete(&mut self, now: DateTime<Utc>) -> Option<Event> {
        let finished_at = self
            .rt
            .started_at
            .map(|since| since + Duration::milliseconds(self.rt.remaining_ms as i64))
            .unwrap_or(now);
        let mode = self.rt.mode;
        if mode == TimerMode::Focus {
            self.stats.record_focus(self.settings.focus);
        }
        self.rt.state = TimerState::Completed;
        self.rt.remaining_ms = 0;
        self.rt.started_at = None;
        self.rt.advance_at =
            Some(finished_at + Duration::milliseconds(self.policy.advance_delay_ms as i64));
        let next_mode = self.next_mode();
        debug!(%mode, %next_mode, completed = self.stats.completed_sessions, "session completed");
        Some(Event::SessionCompleted {
            mode,
            next_mode,
            completed_sessions: self.stats.completed_sessions,
            total_focus_secs: self.stats.total_focus_secs,
            at: finished_at,
        })
    }

    fn advance(&mut self, at: DateTime<Utc>) -> Option<Event> {
        let from = self.rt.mode;
        let to = self.next_mode();
        self.rt = TimerRuntime::fresh(to, &self.settings);
        self.schedule_auto_start(at);
        Some(Event::ModeSwitched {
            from,
            to,
            total_secs: self.rt.total_ms / 1000,
            at,
        })
    }

    fn schedule_auto_start(&mut self, from: DateTime<Utc>) {
        if self.settings.auto_start {
            self.rt.auto_start_at =
                Some(from + Duration::milliseconds(self.policy.auto_start_delay_ms as i64));
        }
    }
}

/// `mm:ss`, minutes unbounded.
pub fn format_clock(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
