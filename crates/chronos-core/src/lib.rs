//! # Chronos Core Library
//!
//! This library provides the core logic for the Chronos focus timer: timed
//! focus/break cycles, a small task list, and persistence to a local cache
//! with optional mirroring to a remote account store. The `chronos` CLI is
//! a thin surface over the same library.
//!
//! ## Architecture
//!
//! - **Timer Engine**: A wall-clock-based state machine; callers pass `now`
//!   into every command and call `tick()`/`poll()` to let it catch up
//! - **Task List**: Newest-first to-do items with a daily cleanup
//! - **Persistence Bridge**: SQLite key/value cache, remote mirror, merge on
//!   sign-in
//! - **Remote Store**: Authentication and per-user documents behind a trait
//!   (Firebase REST, or in-memory)
//!
//! ## Key Components
//!
//! - [`App`]: Composition root used by every front end
//! - [`TimerEngine`]: Core timer state machine
//! - [`PersistenceBridge`]: Local-first storage with remote mirroring
//! - [`RemoteStore`]: Trait for account stores
//! - [`Config`]: Application configuration management

pub mod app;
pub mod clock;
pub mod error;
pub mod events;
pub mod remote;
pub mod shortcuts;
pub mod storage;
pub mod sync;
pub mod task;
pub mod timer;

pub use app::App;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{AuthError, ConfigError, CoreError, ParseError, StorageError, ValidationError};
pub use events::Event;
pub use remote::{FirebaseStore, MemoryStore, RemoteStore, Session};
pub use shortcuts::Shortcut;
pub use storage::{Config, LocalCache};
pub use sync::{PersistenceBridge, SyncStatus};
pub use task::{Task, TaskList, TaskRecord};
pub use timer::{
    format_clock, Settings, TimerEngine, TimerMode, TimerPolicy, TimerRecord, TimerState,
    TimerStats,
};
