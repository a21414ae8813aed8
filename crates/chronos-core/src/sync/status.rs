use serde::{Deserialize, Serialize};
use std::fmt;

/// Progress of remote writes, as shown next to the account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Nothing sent yet (or local-only).
    #[default]
    Idle,
    Syncing,
    Synced,
    Failed,
}

impl SyncStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SyncStatus::Idle => "idle",
            SyncStatus::Syncing => "syncing",
            SyncStatus::Synced => "synced",
            SyncStatus::Failed => "failed",
        }
    }

    /// Indicator text.
    pub fn label(self) -> &'static str {
        match self {
            SyncStatus::Idle => "Not synced",
            SyncStatus::Syncing => "Syncing...",
            SyncStatus::Synced => "Synced",
            SyncStatus::Failed => "Sync failed",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
