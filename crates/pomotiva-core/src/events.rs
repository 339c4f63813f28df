use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::{Durations, Mode, SessionState};

/// Every engine transition produces one or more Events.
/// The owning context drains them; stats and logging react to them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// A mode was shown without starting its countdown.
    ModeSelected {
        mode: Mode,
        total_ms: u64,
        at: DateTime<Utc>,
    },
    SessionStarted {
        mode: Mode,
        duration_ms: u64,
        at: DateTime<Utc>,
    },
    SessionPaused {
        mode: Mode,
        remaining_ms: u64,
        at: DateTime<Utc>,
    },
    SessionResumed {
        mode: Mode,
        remaining_ms: u64,
        at: DateTime<Utc>,
    },
    /// Countdown reached zero on its own.
    SessionFinished {
        mode: Mode,
        duration_ms: u64,
        started_at: DateTime<Utc>,
        at: DateTime<Utc>,
    },
    /// Manual advance via `next()`.
    SessionSkipped {
        from: SessionState,
        to: Mode,
        at: DateTime<Utc>,
    },
    /// A work session counted towards the cycle counter.
    CycleCompleted {
        cycle_count: u32,
        /// `false` when the work session was skipped rather than finished.
        natural: bool,
        at: DateTime<Utc>,
    },
    DurationsChanged {
        durations: Durations,
        at: DateTime<Utc>,
    },
    TimerReset {
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Event::ModeSelected { at, .. }
            | Event::SessionStarted { at, .. }
            | Event::SessionPaused { at, .. }
            | Event::SessionResumed { at, .. }
            | Event::SessionFinished { at, .. }
            | Event::SessionSkipped { at, .. }
            | Event::CycleCompleted { at, .. }
            | Event::DurationsChanged { at, .. }
            | Event::TimerReset { at } => *at,
        }
    }
}
