pub mod auth;
pub mod config;
pub mod run;
pub mod settings;
pub mod sync;
pub mod task;
pub mod timer;

use chronos_core::remote::credentials;
use chronos_core::{
    App, Config, Event, FirebaseStore, LocalCache, PersistenceBridge, RemoteStore, SystemClock,
};
use std::error::Error;
use std::sync::Arc;
use tracing::{debug, warn};

pub type CmdResult = Result<(), Box<dyn Error>>;

/// Build the remote store from config and resume the saved sign-in.
/// `None` when no remote is configured.
pub async fn connect(config: &Config) -> Option<Arc<dyn RemoteStore>> {
    if !config.remote.is_configured() {
        debug!("remote not configured, running local-only");
        return None;
    }
    let store = FirebaseStore::new(config.remote.clone());

    match credentials::load_session() {
        Ok(Some(saved)) => match store.restore_session(saved).await {
            // Keep the refreshed tokens for the next invocation.
            Ok(session) => {
                if let Err(e) = credentials::save_session(&session) {
                    warn!(error = %e, "could not save refreshed session");
                }
            }
            Err(e) => {
                warn!(error = %e, "saved session rejected, signing out");
                if let Err(e) = credentials::clear_session() {
                    warn!(error = %e, "could not clear saved session");
                }
            }
        },
        Ok(None) => {}
        Err(e) => warn!(error = %e, "could not read saved session"),
    }

    Some(Arc::new(store))
}

/// Load config, cache and remote, then the app state.
pub async fn open_app() -> Result<App, Box<dyn Error>> {
    let config = Config::load()?;
    let cache = LocalCache::open()?;
    let remote = connect(&config).await;
    let bridge = PersistenceBridge::new(cache, remote);
    Ok(App::load(Arc::new(SystemClock), bridge, config.timer.policy()).await)
}

pub fn print_events(events: &[Event]) -> CmdResult {
    for event in events {
        println!("{}", serde_json::to_string_pretty(event)?);
    }
    Ok(())
}
