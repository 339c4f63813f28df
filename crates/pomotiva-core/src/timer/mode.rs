use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A long break follows every `LONG_BREAK_INTERVAL`-th completed work session.
pub const LONG_BREAK_INTERVAL: u32 = 4;

const MIN_DURATION_MIN: u32 = 1;

/// A configured duration category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mode {
    Work,
    ShortBreak,
    LongBreak,
}

impl Mode {
    /// Break that follows the work session which brought the counter to `cycle_count`.
    pub fn break_after(cycle_count: u32) -> Mode {
        if cycle_count % LONG_BREAK_INTERVAL == 0 {
            Mode::LongBreak
        } else {
            Mode::ShortBreak
        }
    }

    pub fn is_break(self) -> bool {
        !matches!(self, Mode::Work)
    }

    /// Storage/wire name, e.g. `SHORT_BREAK`.
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Work => "WORK",
            Mode::ShortBreak => "SHORT_BREAK",
            Mode::LongBreak => "LONG_BREAK",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Mode::Work => "Focus",
            Mode::ShortBreak => "Short break",
            Mode::LongBreak => "Long break",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "work" | "focus" => Ok(Mode::Work),
            "short" | "short_break" | "short-break" => Ok(Mode::ShortBreak),
            "long" | "long_break" | "long-break" => Ok(Mode::LongBreak),
            other => Err(format!("unknown mode '{other}' (expected work, short or long)")),
        }
    }
}

/// Observable engine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    Idle,
    Work,
    ShortBreak,
    LongBreak,
    Paused,
}

impl SessionState {
    /// The mode this state represents, if any.
    pub fn mode(self) -> Option<Mode> {
        match self {
            SessionState::Work => Some(Mode::Work),
            SessionState::ShortBreak => Some(Mode::ShortBreak),
            SessionState::LongBreak => Some(Mode::LongBreak),
            SessionState::Idle | SessionState::Paused => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SessionState::Idle => "Idle",
            SessionState::Paused => "Paused",
            SessionState::Work => Mode::Work.label(),
            SessionState::ShortBreak => Mode::ShortBreak.label(),
            SessionState::LongBreak => Mode::LongBreak.label(),
        }
    }
}

impl From<Mode> for SessionState {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Work => SessionState::Work,
            Mode::ShortBreak => SessionState::ShortBreak,
            Mode::LongBreak => SessionState::LongBreak,
        }
    }
}

/// Session lengths in minutes.
///
/// Every value is clamped to at least one minute on construction and again
/// on conversion, so a deserialized zero never produces an empty session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Durations {
    work_min: u32,
    short_break_min: u32,
    long_break_min: u32,
}

impl Durations {
    pub fn new(work_min: u32, short_break_min: u32, long_break_min: u32) -> Self {
        Self {
            work_min: work_min.max(MIN_DURATION_MIN),
            short_break_min: short_break_min.max(MIN_DURATION_MIN),
            long_break_min: long_break_min.max(MIN_DURATION_MIN),
        }
    }

    pub fn work_min(&self) -> u32 {
        self.work_min.max(MIN_DURATION_MIN)
    }

    pub fn short_break_min(&self) -> u32 {
        self.short_break_min.max(MIN_DURATION_MIN)
    }

    pub fn long_break_min(&self) -> u32 {
        self.long_break_min.max(MIN_DURATION_MIN)
    }

    pub fn minutes(&self, mode: Mode) -> u32 {
        match mode {
            Mode::Work => self.work_min(),
            Mode::ShortBreak => self.short_break_min(),
            Mode::LongBreak => self.long_break_min(),
        }
    }

    /// Session length for `mode` in milliseconds.
    pub fn millis(&self, mode: Mode) -> u64 {
        u64::from(self.minutes(mode))
            .saturating_mul(60)
            .saturating_mul(1000)
    }
}

impl Default for Durations {
    fn default() -> Self {
        Self::new(25, 5, 15)
    }
}
