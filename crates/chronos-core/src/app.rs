//! Composition root.
//!
//! [`App`] owns the timer engine, the task list and the persistence bridge.
//! Every user-facing operation goes through it: it reads the clock, lets
//! the engine catch up with elapsed time, applies the command and decides
//! what needs saving. The interactive loop and the one-shot CLI commands
//! share this path.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::error::{AuthError, StorageError, ValidationError};
use crate::events::Event;
use crate::shortcuts::Shortcut;
use crate::sync::{MergeSide, PersistenceBridge, SyncStatus};
use crate::task::TaskList;
use crate::timer::{SettingKey, Settings, TimerEngine, TimerMode, TimerPolicy};

pub struct App {
    clock: Arc<dyn Clock>,
    engine: TimerEngine,
    tasks: TaskList,
    bridge: PersistenceBridge,
    hidden: bool,
    input_open: bool,
}

impl App {
    /// Load persisted state: the timer record (remote first when signed
    /// in), the local countdown, and the task list.
    pub async fn load(clock: Arc<dyn Clock>, bridge: PersistenceBridge, policy: TimerPolicy) -> Self {
        let now = clock.now();
        let today = clock.today();

        let mut engine = TimerEngine::new(Settings::default(), policy);
        if let Some(record) = bridge.load_timer().await {
            engine.apply_record(&record, today);
        }
        if let Some(rt) = bridge.cache().load_runtime() {
            engine.restore_runtime(rt, now);
        }
        let tasks = bridge.load_tasks(now).await;
        debug!(
            mode = %engine.mode(),
            state = ?engine.state(),
            tasks = tasks.len(),
            "state loaded"
        );

        Self {
            clock,
            engine,
            tasks,
            bridge,
            hidden: false,
            input_open: false,
        }
    }

    pub fn engine(&self) -> &TimerEngine {
        &self.engine
    }

    pub fn tasks(&self) -> &TaskList {
        &self.tasks
    }

    pub fn bridge(&self) -> &PersistenceBridge {
        &self.bridge
    }

    pub fn sync_status(&self) -> SyncStatus {
        self.bridge.status()
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// Whether the next line of input is task text.
    pub fn input_open(&self) -> bool {
        self.input_open
    }

    pub fn snapshot(&self) -> Event {
        self.engine.snapshot(self.clock.now())
    }

    // ── Timer ────────────────────────────────────────────────────────

    /// Catch up with elapsed time, then run `command`.
    fn timer_command<F>(&mut self, command: F) -> Vec<Event>
    where
        F: FnOnce(&mut TimerEngine, chrono::DateTime<chrono::Utc>) -> Option<Event>,
    {
        let now = self.clock.now();
        let mut events = self.engine.poll(now);
        events.extend(command(&mut self.engine, now));
        self.persist(&events);
        events
    }

    pub fn toggle(&mut self) -> Vec<Event> {
        self.timer_command(TimerEngine::toggle)
    }

    pub fn start(&mut self) -> Vec<Event> {
        self.timer_command(TimerEngine::start)
    }

    pub fn pause(&mut self) -> Vec<Event> {
        self.timer_command(TimerEngine::pause)
    }

    pub fn reset(&mut self) -> Vec<Event> {
        self.timer_command(TimerEngine::reset)
    }

    pub fn skip(&mut self) -> Vec<Event> {
        self.timer_command(TimerEngine::skip)
    }

    pub fn switch_mode(&mut self, mode: TimerMode) -> Vec<Event> {
        self.timer_command(|engine, now| engine.switch_mode(mode, now))
    }

    /// One interval tick. Nothing happens while hidden.
    pub fn tick(&mut self) -> Vec<Event> {
        if self.hidden {
            return Vec::new();
        }
        self.timer_command(|_, _| None)
    }

    /// Visibility change. Becoming visible reconciles the time spent hidden.
    pub fn set_hidden(&mut self, hidden: bool) -> Vec<Event> {
        let was_hidden = std::mem::replace(&mut self.hidden, hidden);
        if was_hidden && !hidden {
            return self.timer_command(|_, _| None);
        }
        Vec::new()
    }

    pub fn update_setting(&mut self, key: &str, value: &str) -> Result<Event, ValidationError> {
        let key = SettingKey::parse(key)?;
        let now = self.clock.now();
        let mut events = self.engine.poll(now);
        let changed = self.engine.update_settings(key, value)?;
        events.push(changed.clone());
        self.persist(&events);
        Ok(changed)
    }

    // ── Tasks ────────────────────────────────────────────────────────

    pub fn add_task(&mut self, text: &str) -> Option<Event> {
        let now = self.clock.now();
        let task = self.tasks.add(text, now)?.clone();
        let event = Event::TaskAdded { task };
        self.persist(std::slice::from_ref(&event));
        Some(event)
    }

    pub fn toggle_task(&mut self, id: i64) -> Option<Event> {
        let completed = self.tasks.toggle(id, self.clock.now())?;
        let event = Event::TaskToggled { id, completed };
        self.persist(std::slice::from_ref(&event));
        Some(event)
    }

    pub fn delete_task(&mut self, id: i64) -> Option<Event> {
        if !self.tasks.delete(id) {
            return None;
        }
        let event = Event::TaskDeleted { id };
        self.persist(std::slice::from_ref(&event));
        Some(event)
    }

    // ── Keyboard ─────────────────────────────────────────────────────

    /// Handle one key, or one line of task text after the add-task key.
    pub fn handle_key(&mut self, key: &str) -> Vec<Event> {
        if self.input_open {
            self.input_open = false;
            return self.add_task(key).into_iter().collect();
        }
        match Shortcut::from_key(key, false) {
            Some(Shortcut::ToggleRun) => self.toggle(),
            Some(Shortcut::Reset) => self.reset(),
            Some(Shortcut::Skip) => self.skip(),
            Some(Shortcut::SwitchMode(mode)) => self.switch_mode(mode),
            Some(Shortcut::AddTask) => {
                self.input_open = true;
                Vec::new()
            }
            None => Vec::new(),
        }
    }

    /// Close the task input without adding anything.
    pub fn cancel_input(&mut self) {
        self.input_open = false;
    }

    // ── Account ──────────────────────────────────────────────────────

    /// Merge local state with the account just signed in to and adopt the
    /// result. Returns which timer record won, or `None` when nothing was
    /// merged (signed out, or the account could not be read).
    pub async fn on_sign_in(&mut self) -> Result<Option<MergeSide>, StorageError> {
        let now = self.clock.now();
        let today = self.clock.today();
        let caught_up = self.engine.poll(now);
        self.persist(&caught_up);
        let local = self.engine.record(today);

        let Some(merged) = self
            .bridge
            .reconcile_on_sign_in(&local, &self.tasks, now)
            .await?
        else {
            return Ok(None);
        };
        self.engine.apply_record(&merged.timer, today);
        self.tasks.replace(merged.tasks);
        if let Err(e) = self.bridge.cache().save_runtime(self.engine.runtime()) {
            warn!(error = %e, "could not save countdown");
        }
        Ok(Some(merged.timer_from))
    }

    pub async fn sign_out(&mut self) -> Result<(), AuthError> {
        self.bridge.sign_out().await
    }

    /// Push the current timer record and task list to the account and wait
    /// for the result.
    pub async fn sync_now(&mut self) -> SyncStatus {
        let now = self.clock.now();
        if let Err(e) = self.bridge.save_timer(&self.engine.record(self.clock.today())) {
            warn!(error = %e, "could not save timer record");
        }
        if let Err(e) = self.bridge.save_tasks(&self.tasks, now) {
            warn!(error = %e, "could not save tasks");
        }
        self.bridge.flush().await;
        self.bridge.status()
    }

    /// Wait for pending remote writes. Call before exiting.
    pub async fn flush(&self) {
        self.bridge.flush().await;
    }

    // ── Persistence ──────────────────────────────────────────────────

    fn persist(&self, events: &[Event]) {
        if events.is_empty() {
            return;
        }
        let now = self.clock.now();

        let timer_changed = events.iter().any(|e| {
            matches!(
                e,
                Event::TimerStarted { .. }
                    | Event::TimerPaused { .. }
                    | Event::TimerReset { .. }
                    | Event::TimerSkipped { .. }
                    | Event::ModeSwitched { .. }
                    | Event::SessionCompleted { .. }
                    | Event::SettingsChanged { .. }
            )
        });
        if timer_changed {
            if let Err(e) = self.bridge.cache().save_runtime(self.engine.runtime()) {
                warn!(error = %e, "could not save countdown");
            }
        }

        if events.iter().any(Event::touches_timer_record) {
            if let Err(e) = self.bridge.save_timer(&self.engine.record(self.clock.today())) {
                warn!(error = %e, "could not save timer record");
            }
        }

        let tasks_changed = events.iter().any(|e| {
            matches!(
                e,
                Event::TaskAdded { .. } | Event::TaskToggled { .. } | Event::TaskDeleted { .. }
            )
        });
        if tasks_changed {
            if let Err(e) = self.bridge.save_tasks(&self.tasks, now) {
                warn!(error = %e, "could not save tasks");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::LocalCache;
    use crate::timer::TimerState;
    use chrono::{Duration, TimeZone, Utc};

    async fn app() -> (App, ManualClock) {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap());
        let bridge = PersistenceBridge::local_only(LocalCache::open_memory().unwrap());
        let app = App::load(Arc::new(clock.clone()), bridge, TimerPolicy::default()).await;
        (app, clock)
    }

    #[tokio::test]
    async fn add_task_key_captures_next_line() {
        let (mut app, _clock) = app().await;
        assert!(app.handle_key("t").is_empty());
        assert!(app.input_open());

        // Shortcut keys are task text while the input is open.
        let events = app.handle_key("s");
        assert!(matches!(events.as_slice(), [Event::TaskAdded { task }] if task.text == "s"));
        assert!(!app.input_open());
        assert_eq!(app.engine().mode(), TimerMode::Focus);
    }

    #[tokio::test]
    async fn cancelled_input_restores_shortcuts() {
        let (mut app, _clock) = app().await;
        app.handle_key("t");
        app.cancel_input();
        assert!(!app.input_open());
        assert!(app.tasks().is_empty());

        app.handle_key("k");
        assert_eq!(app.engine().state(), TimerState::Running);
    }

    #[tokio::test]
    async fn hidden_window_does_not_tick_but_catches_up() {
        let (mut app, clock) = app().await;
        app.toggle();
        app.set_hidden(true);
        clock.advance(Duration::seconds(1600));
        assert!(app.tick().is_empty());
        assert_eq!(app.engine().state(), TimerState::Running);

        let events = app.set_hidden(false);
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::SessionCompleted { .. })));
        assert_eq!(app.engine().mode(), TimerMode::ShortBreak);
        assert_eq!(app.engine().stats().completed_sessions, 1);
    }

    #[tokio::test]
    async fn unknown_ids_and_blank_text_change_nothing() {
        let (mut app, _clock) = app().await;
        assert!(app.add_task("   ").is_none());
        assert!(app.toggle_task(42).is_none());
        assert!(app.delete_task(42).is_none());
        assert!(app.tasks().is_empty());
    }

    #[tokio::test]
    async fn settings_update_persists_record() {
        let (mut app, _clock) = app().await;
        app.update_setting("focus", "50").unwrap();
        assert_eq!(app.engine().remaining_secs(Utc::now()), 50 * 60);
        let stored = app.bridge().cache().load_timer().unwrap();
        assert_eq!(stored.settings.focus, 50 * 60);
        assert!(app.update_setting("volume", "3").is_err());
    }
}
