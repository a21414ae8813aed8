use clap::Subcommand;

use super::{open_app, print_events, CmdResult};

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Print current settings as JSON
    Show,
    /// Change a setting. Durations are in minutes.
    Set {
        /// focus, shortBreak, longBreak, autoStart or soundEnabled
        key: String,
        /// New value
        value: String,
    },
}

pub async fn run(action: SettingsAction) -> CmdResult {
    let mut app = open_app().await?;

    match action {
        SettingsAction::Show => {
            println!("{}", serde_json::to_string_pretty(app.engine().settings())?);
        }
        SettingsAction::Set { key, value } => {
            let event = app.update_setting(&key, &value)?;
            print_events(&[event])?;
        }
    }

    app.flush().await;
    Ok(())
}
