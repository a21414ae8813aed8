mod cache;
mod config;

pub use cache::{LocalCache, RUNTIME_KEY, TASKS_KEY, TIMER_KEY};
pub use config::{Config, RemoteConfig, TimerConfig};

use std::path::PathBuf;

/// Returns `~/.config/chronos[-dev]/` based on CHRONOS_ENV.
///
/// Set CHRONOS_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, std::io::Error> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("CHRONOS_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("chronos-dev")
    } else {
        base_dir.join("chronos")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
