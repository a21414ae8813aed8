//! Keyboard shortcuts.

use crate::timer::TimerMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shortcut {
    ToggleRun,
    Reset,
    Skip,
    SwitchMode(TimerMode),
    /// Open the task input.
    AddTask,
}

impl Shortcut {
    /// Map a key to its shortcut. Keys are case-insensitive; nothing fires
    /// while a text input has focus.
    pub fn from_key(key: &str, input_focused: bool) -> Option<Self> {
        if input_focused {
            return None;
        }
        let shortcut = match key.to_ascii_lowercase().as_str() {
            " " | "space" | "k" => Shortcut::ToggleRun,
            "r" => Shortcut::Reset,
            "s" => Shortcut::Skip,
            "1" => Shortcut::SwitchMode(TimerMode::Focus),
            "2" => Shortcut::SwitchMode(TimerMode::ShortBreak),
            "3" => Shortcut::SwitchMode(TimerMode::LongBreak),
            "t" => Shortcut::AddTask,
            _ => return None,
        };
        Some(shortcut)
    }
}
