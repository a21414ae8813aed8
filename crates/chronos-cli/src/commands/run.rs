//! Interactive timer.
//!
//! Full-screen view driven by single keys: space or `k` starts and pauses,
//! `r` resets, `s` skips, `1`/`2`/`3` switch mode and `t` opens the task
//! input (Enter adds, Esc cancels). Up/Down select a task, `x` toggles it,
//! `d` deletes it. `h` hides and shows the timer, `q` quits.

use chronos_core::{App, Event, RemoteStore, Session, TimerMode};
use crossterm::cursor;
use crossterm::event::{
    Event as TermEvent, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use futures_util::StreamExt;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Gauge, List, ListItem, ListState, Paragraph};
use std::io::{self, Stdout};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::warn;
use uuid::Uuid;

use super::{open_app, CmdResult};

type Term = Terminal<CrosstermBackend<Stdout>>;

const HELP: &str =
    " space/k start-pause  r reset  s skip  1/2/3 mode  t add task  x done  d delete  h hide  q quit";

/// Raw mode plus the alternate screen. Restored on drop, so every way out
/// of the loop (quit, error, panic unwinding) leaves a usable terminal.
struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> io::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        if let Err(e) = execute!(stdout, EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(e);
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let mut stdout = io::stdout();
        let _ = execute!(stdout, LeaveAlternateScreen, cursor::Show);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Quit,
    ToggleHidden,
    SelectPrev,
    SelectNext,
    ToggleSelected,
    DeleteSelected,
    /// A shortcut key, routed through the app.
    Key(char),
    Type(char),
    Backspace,
    Submit,
    Cancel,
    Ignore,
}

enum Flow {
    Continue,
    Quit,
}

/// Loop-local view state.
#[derive(Debug, Default)]
struct View {
    input: String,
    selected: usize,
    message: Option<String>,
}

impl View {
    fn note(&mut self, events: &[Event]) {
        if let Some(text) = events.iter().rev().find_map(describe) {
            self.message = Some(text);
        }
    }
}

pub async fn run() -> CmdResult {
    let mut app = open_app().await?;

    let result = {
        let _guard = TerminalGuard::enter()?;
        let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
        run_loop(&mut terminal, &mut app).await
    };

    app.flush().await;
    result
}

async fn run_loop(terminal: &mut Term, app: &mut App) -> CmdResult {
    let mut auth = app.bridge().remote().map(|r| r.subscribe());
    let mut generation = app.bridge().session().map(|s| s.generation);

    let mut keys = EventStream::new();
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut view = View::default();

    loop {
        terminal.draw(|frame| draw(frame, app, &view))?;

        tokio::select! {
            _ = ticker.tick() => {
                let events = app.tick();
                view.note(&events);
            }
            event = keys.next() => match event {
                Some(Ok(TermEvent::Key(key))) if key.kind == KeyEventKind::Press => {
                    let action = action_for(key, app.input_open());
                    if let Flow::Quit = apply(app, &mut view, action) {
                        break;
                    }
                }
                // Resize and the like: redraw on the next pass.
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => break,
            },
            session = auth_changed(&mut auth) => {
                on_auth_change(app, &mut view, &mut generation, session).await;
            }
        }
    }
    Ok(())
}

fn action_for(key: KeyEvent, input_open: bool) -> Action {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Action::Quit;
    }
    if input_open {
        return match key.code {
            KeyCode::Enter => Action::Submit,
            KeyCode::Esc => Action::Cancel,
            KeyCode::Backspace => Action::Backspace,
            KeyCode::Char(c) => Action::Type(c),
            _ => Action::Ignore,
        };
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
        KeyCode::Char('h') => Action::ToggleHidden,
        KeyCode::Up => Action::SelectPrev,
        KeyCode::Down => Action::SelectNext,
        KeyCode::Char('x') | KeyCode::Enter => Action::ToggleSelected,
        KeyCode::Char('d') | KeyCode::Delete => Action::DeleteSelected,
        KeyCode::Char(c) => Action::Key(c),
        _ => Action::Ignore,
    }
}

fn apply(app: &mut App, view: &mut View, action: Action) -> Flow {
    let events = match action {
        Action::Quit => return Flow::Quit,
        Action::Ignore => return Flow::Continue,
        Action::ToggleHidden => {
            let hidden = !app.is_hidden();
            app.set_hidden(hidden)
        }
        Action::SelectPrev => {
            view.selected = view.selected.saturating_sub(1);
            return Flow::Continue;
        }
        Action::SelectNext => {
            if view.selected + 1 < app.tasks().len() {
                view.selected += 1;
            }
            return Flow::Continue;
        }
        Action::ToggleSelected => {
            let id = selected_id(app, view);
            id.and_then(|id| app.toggle_task(id)).into_iter().collect()
        }
        Action::DeleteSelected => {
            let id = selected_id(app, view);
            let events: Vec<Event> = id.and_then(|id| app.delete_task(id)).into_iter().collect();
            view.selected = view.selected.min(app.tasks().len().saturating_sub(1));
            events
        }
        Action::Key(c) => {
            let events = app.handle_key(&c.to_string());
            if app.input_open() {
                view.input.clear();
            }
            events
        }
        Action::Type(c) => {
            view.input.push(c);
            return Flow::Continue;
        }
        Action::Backspace => {
            view.input.pop();
            return Flow::Continue;
        }
        Action::Submit => {
            let text = std::mem::take(&mut view.input);
            let events = app.handle_key(&text);
            if events.is_empty() {
                view.message = Some("Empty task ignored".into());
            } else {
                view.selected = 0;
            }
            events
        }
        Action::Cancel => {
            view.input.clear();
            app.cancel_input();
            return Flow::Continue;
        }
    };
    view.note(&events);
    Flow::Continue
}

fn selected_id(app: &App, view: &View) -> Option<i64> {
    app.tasks().tasks().get(view.selected).map(|t| t.id)
}

/// Resolves on the next auth change; never, without a remote store.
async fn auth_changed(rx: &mut Option<watch::Receiver<Option<Session>>>) -> Option<Session> {
    let Some(rx) = rx else {
        return std::future::pending().await;
    };
    if rx.changed().await.is_err() {
        // Store dropped; stop listening.
        return std::future::pending().await;
    }
    rx.borrow_and_update().clone()
}

async fn on_auth_change(
    app: &mut App,
    view: &mut View,
    generation: &mut Option<Uuid>,
    session: Option<Session>,
) {
    let next = session.as_ref().map(|s| s.generation);
    if next == *generation {
        // Token refresh.
        return;
    }
    *generation = next;
    match session {
        Some(session) => {
            let who = session.email.as_deref().unwrap_or(&session.uid);
            view.message = Some(format!("Signed in as {who}"));
            if let Err(e) = app.on_sign_in().await {
                warn!(error = %e, "sign-in merge failed");
            }
        }
        None => view.message = Some("Signed out".into()),
    }
}

fn describe(event: &Event) -> Option<String> {
    let text = match event {
        Event::SessionCompleted { mode, .. } => completion_message(*mode).to_string(),
        Event::TaskAdded { task } => format!("Added: {}", task.text),
        Event::TaskToggled { completed, .. } => {
            if *completed { "Task done" } else { "Task reopened" }.to_string()
        }
        Event::TaskDeleted { .. } => "Task deleted".to_string(),
        Event::TimerSkipped { to, .. } => format!("Skipped to {to}"),
        Event::ModeSwitched { to, .. } => format!("Mode: {to}"),
        _ => return None,
    };
    Some(text)
}

fn completion_message(mode: TimerMode) -> &'static str {
    match mode {
        TimerMode::Focus => "Great work! Time for a break.",
        TimerMode::ShortBreak => "Break over! Ready to focus?",
        TimerMode::LongBreak => "Long break complete! Let's get back to it.",
    }
}

// ── Rendering ────────────────────────────────────────────────────────

fn draw(frame: &mut Frame, app: &App, view: &View) {
    let [timer_area, stats_area, tasks_area, input_area, help_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(1),
        Constraint::Min(3),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    draw_timer(frame, app, timer_area, stats_area);
    draw_tasks(frame, app, view, tasks_area);
    draw_input(frame, app, view, input_area);
    frame.render_widget(
        Paragraph::new(HELP).style(Style::default().fg(Color::DarkGray)),
        help_area,
    );
}

fn draw_timer(frame: &mut Frame, app: &App, timer_area: Rect, stats_area: Rect) {
    if app.is_hidden() {
        frame.render_widget(
            Paragraph::new("Timer hidden (h to show)").block(Block::bordered()),
            timer_area,
        );
        return;
    }

    let Event::StateSnapshot {
        state,
        mode,
        label,
        display,
        progress,
        completed_sessions,
        current_streak,
        total_focus,
        ..
    } = app.snapshot()
    else {
        return;
    };

    let color = match mode {
        TimerMode::Focus => Color::Red,
        TimerMode::ShortBreak => Color::Green,
        TimerMode::LongBreak => Color::Blue,
    };
    let state = format!("{state:?}").to_lowercase();
    let gauge = Gauge::default()
        .block(Block::bordered().title(format!(" {label} - {state} ")))
        .gauge_style(Style::default().fg(color))
        .ratio(progress.clamp(0.0, 1.0))
        .label(display);
    frame.render_widget(gauge, timer_area);

    let stats = format!(
        " Sessions {completed_sessions}  Streak {current_streak}  Focus {total_focus}  Sync: {}",
        app.sync_status().label()
    );
    frame.render_widget(Paragraph::new(stats), stats_area);
}

fn draw_tasks(frame: &mut Frame, app: &App, view: &View, area: Rect) {
    let block = Block::bordered().title(" Tasks ");
    let tasks = app.tasks().tasks();
    if tasks.is_empty() {
        frame.render_widget(
            Paragraph::new("No tasks yet. Add one to get started!").block(block),
            area,
        );
        return;
    }

    let items: Vec<ListItem> = tasks
        .iter()
        .map(|task| {
            if task.completed {
                ListItem::new(format!("[x] {}", task.text)).style(
                    Style::default()
                        .fg(Color::DarkGray)
                        .add_modifier(Modifier::CROSSED_OUT),
                )
            } else {
                ListItem::new(format!("[ ] {}", task.text))
            }
        })
        .collect();
    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");
    let mut state = ListState::default().with_selected(Some(view.selected.min(tasks.len() - 1)));
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_input(frame: &mut Frame, app: &App, view: &View, area: Rect) {
    if app.input_open() {
        let input = Paragraph::new(view.input.as_str())
            .block(Block::bordered().title(" New task (Enter adds, Esc cancels) "));
        frame.render_widget(input, area);
        let typed = u16::try_from(view.input.chars().count()).unwrap_or(u16::MAX);
        frame.set_cursor_position((area.x + 1 + typed.min(area.width.saturating_sub(2)), area.y + 1));
    } else {
        let message = view.message.as_deref().unwrap_or("");
        frame.render_widget(Paragraph::new(message).block(Block::bordered()), area);
    }
}
