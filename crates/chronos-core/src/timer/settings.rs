//! User-owned timer settings.
//!
//! Persisted inside the timer record (not in `config.toml`) so they follow
//! the account across devices. Field names match the stored document.

use serde::{Deserialize, Serialize};

use super::mode::TimerMode;
use crate::error::ValidationError;

const MIN_DURATION_SECS: u64 = 60;
const MAX_DURATION_MIN: u64 = 24 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Seconds.
    pub focus: u64,
    /// Seconds.
    pub short_break: u64,
    /// Seconds.
    pub long_break: u64,
    pub auto_start: bool,
    pub sound_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            focus: 25 * 60,
            short_break: 5 * 60,
            long_break: 15 * 60,
            auto_start: false,
            sound_enabled: true,
        }
    }
}

/// A settable field, named as in the stored document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKey {
    Focus,
    ShortBreak,
    LongBreak,
    AutoStart,
    SoundEnabled,
}

impl SettingKey {
    pub fn parse(key: &str) -> Result<Self, ValidationError> {
        match key {
            "focus" => Ok(SettingKey::Focus),
            "shortBreak" | "short-break" | "short_break" => Ok(SettingKey::ShortBreak),
            "longBreak" | "long-break" | "long_break" => Ok(SettingKey::LongBreak),
            "autoStart" | "auto-start" | "auto_start" => Ok(SettingKey::AutoStart),
            "soundEnabled" | "sound-enabled" | "sound_enabled" => Ok(SettingKey::SoundEnabled),
            other => Err(ValidationError::UnknownSetting(other.to_string())),
        }
    }

    /// The mode whose duration this key controls, if any.
    pub fn mode(self) -> Option<TimerMode> {
        match self {
            SettingKey::Focus => Some(TimerMode::Focus),
            SettingKey::ShortBreak => Some(TimerMode::ShortBreak),
            SettingKey::LongBreak => Some(TimerMode::LongBreak),
            SettingKey::AutoStart | SettingKey::SoundEnabled => None,
        }
    }
}

impl Settings {
    pub fn duration_secs(&self, mode: TimerMode) -> u64 {
        match mode {
            TimerMode::Focus => self.focus,
            TimerMode::ShortBreak => self.short_break,
            TimerMode::LongBreak => self.long_break,
        }
    }

    pub fn duration_ms(&self, mode: TimerMode) -> u64 {
        self.duration_secs(mode) * 1000
    }

    /// Apply a textual value. Durations are given in whole minutes.
    pub fn set(&mut self, key: SettingKey, value: &str) -> Result<(), ValidationError> {
        let invalid = |message: &str| ValidationError::InvalidValue {
            field: format!("{key:?}"),
            message: message.to_string(),
        };
        match key {
            SettingKey::AutoStart | SettingKey::SoundEnabled => {
                let flag = value
                    .trim()
                    .parse::<bool>()
                    .map_err(|_| invalid("expected true or false"))?;
                if key == SettingKey::AutoStart {
                    self.auto_start = flag;
                } else {
                    self.sound_enabled = flag;
                }
            }
            SettingKey::Focus | SettingKey::ShortBreak | SettingKey::LongBreak => {
                let minutes = value
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| invalid("expected whole minutes"))?;
                if minutes == 0 || minutes > MAX_DURATION_MIN {
                    return Err(invalid("minutes must be between 1 and 1440"));
                }
                let secs = minutes * 60;
                match key {
                    SettingKey::Focus => self.focus = secs,
                    SettingKey::ShortBreak => self.short_break = secs,
                    _ => self.long_break = secs,
                }
            }
        }
        Ok(())
    }

    /// Clamp durations loaded from storage to the supported range.
    pub fn sanitized(mut self) -> Self {
        for d in [&mut self.focus, &mut self.short_break, &mut self.long_break] {
            *d = (*d).clamp(MIN_DURATION_SECS, MAX_DURATION_MIN * 60);
        }
        self
    }
}
