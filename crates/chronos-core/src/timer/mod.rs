mod engine;
mod mode;
mod settings;
mod stats;

pub use engine::{format_clock, TimerEngine, TimerPolicy, TimerRuntime, TimerState};
pub use mode::TimerMode;
pub use settings::{SettingKey, Settings};
pub use stats::{TimerRecord, TimerStats};
