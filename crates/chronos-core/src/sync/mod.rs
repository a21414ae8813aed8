//! Persistence and synchronization.
//!
//! Keeps the local cache and the remote account in step: local writes are
//! authoritative and immediate, remote writes follow in the background,
//! and signing in merges whatever each side has.

mod bridge;
pub mod merge;
mod status;

pub use bridge::{Merged, PersistenceBridge};
pub use merge::{merge_tasks, merge_timer, pick_timer, MergeSide};
pub use status::SyncStatus;
