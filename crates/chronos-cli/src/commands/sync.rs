//! Sync subcommand: push local state to the signed-in account.

use clap::Subcommand;
use serde_json::json;

use super::{open_app, CmdResult};

#[derive(Subcommand)]
pub enum SyncAction {
    /// Upload the timer record and task list now
    Now,
    /// Show the sync state
    Status,
}

pub async fn run(action: SyncAction) -> CmdResult {
    let mut app = open_app().await?;

    match action {
        SyncAction::Now => {
            if app.bridge().session().is_none() {
                return Err("not signed in".into());
            }
            let status = app.sync_now().await;
            println!("{}", status.label());
        }
        SyncAction::Status => {
            let out = json!({
                "signedIn": app.bridge().session().is_some(),
                "status": app.sync_status(),
                "label": app.sync_status().label(),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }

    app.flush().await;
    Ok(())
}
