use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimerMode {
    Focus,
    ShortBreak,
    LongBreak,
}

impl TimerMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerMode::Focus => "focus",
            TimerMode::ShortBreak => "short-break",
            TimerMode::LongBreak => "long-break",
        }
    }

    pub fn is_break(&self) -> bool {
        !matches!(self, TimerMode::Focus)
    }

    /// Mode that follows this one.
    ///
    /// `completed_sessions` is the focus count after the session that just
    /// ended (or the unchanged count when skipping). Long breaks come after
    /// every `long_break_interval`-th completed focus session.
    pub fn next(&self, completed_sessions: u32, long_break_interval: u32) -> TimerMode {
        match self {
            TimerMode::Focus => {
                let interval = long_break_interval.max(1);
                if completed_sessions > 0 && completed_sessions % interval == 0 {
                    TimerMode::LongBreak
                } else {
                    TimerMode::ShortBreak
                }
            }
            TimerMode::ShortBreak | TimerMode::LongBreak => TimerMode::Focus,
        }
    }
}

impl fmt::Display for TimerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "focus" => Ok(TimerMode::Focus),
            "short-break" | "short" | "shortBreak" => Ok(TimerMode::ShortBreak),
            "long-break" | "long" | "longBreak" => Ok(TimerMode::LongBreak),
            other => Err(format!("unknown mode: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_fourth_focus_routes_to_long_break() {
        for n in 1..=12u32 {
            let expected = if n % 4 == 0 {
                TimerMode::LongBreak
            } else {
                TimerMode::ShortBreak
            };
            assert_eq!(TimerMode::Focus.next(n, 4), expected, "after {n} sessions");
        }
    }

    #[test]
    fn skipping_first_focus_goes_to_short_break() {
        assert_eq!(TimerMode::Focus.next(0, 4), TimerMode::ShortBreak);
    }

    #[test]
    fn breaks_route_to_focus() {
        assert_eq!(TimerMode::ShortBreak.next(3, 4), TimerMode::Focus);
        assert_eq!(TimerMode::LongBreak.next(4, 4), TimerMode::Focus);
    }

    #[test]
    fn serde_uses_kebab_case() {
        assert_eq!(
            serde_json::to_string(&TimerMode::ShortBreak).unwrap(),
            "\"short-break\""
        );
        assert_eq!("long-break".parse::<TimerMode>().unwrap(), TimerMode::LongBreak);
    }
}
