use chronos_core::TimerMode;
use clap::Subcommand;

use super::{open_app, print_events, CmdResult};

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start or resume the countdown
    Start,
    /// Pause the countdown
    Pause,
    /// Start when stopped, pause when running
    Toggle,
    /// Restore the current mode's full duration
    Reset,
    /// Abandon the current session and move to the next mode
    Skip,
    /// Switch to a mode (focus, short-break, long-break)
    Mode { mode: TimerMode },
    /// Print current timer state as JSON
    Status,
}

pub async fn run(action: TimerAction) -> CmdResult {
    let mut app = open_app().await?;

    let events = match action {
        TimerAction::Start => app.start(),
        TimerAction::Pause => app.pause(),
        TimerAction::Toggle => app.toggle(),
        TimerAction::Reset => app.reset(),
        TimerAction::Skip => app.skip(),
        TimerAction::Mode { mode } => app.switch_mode(mode),
        // Catch up with the time since the last invocation.
        TimerAction::Status => app.tick(),
    };

    print_events(&events)?;
    println!("{}", serde_json::to_string_pretty(&app.snapshot())?);
    app.flush().await;
    Ok(())
}
