//! # Pomotiva Core Library
//!
//! Core logic for the Pomotiva pomodoro timer. The CLI is a thin layer over
//! this crate.
//!
//! ## Architecture
//!
//! - **Timer Engine**: an event-driven state machine over Work, Short break
//!   and Long break sessions. A [`timer::Clock`] delivers ticks and the
//!   finish signal; the engine owns at most one countdown at a time.
//! - **Runner**: [`EngineRunner`] gives the engine a single async owner and
//!   funnels commands and clock signals through it.
//! - **Notifications**: [`NotificationScheduler`] keeps one pending
//!   end-of-session alert in step with the engine's observable state.
//! - **Storage**: SQLite session log, daily stats and goals, plus TOML
//!   configuration.
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: Core timer state machine
//! - [`Database`]: Session and statistics persistence
//! - [`Config`]: Application configuration management
//! - [`StatsRecorder`]: Persists finished sessions from engine events

pub mod error;
pub mod events;
pub mod notify;
pub mod stats;
pub mod storage;
pub mod timer;

pub use error::{ConfigError, CoreError, DatabaseError};
pub use events::Event;
pub use notify::{Alert, NotificationScheduler, Notifier};
pub use stats::StatsRecorder;
pub use storage::{Config, DailyStats, Database, Goals, Period, PeriodGoal};
pub use timer::{
    Command, Durations, EngineHandle, EngineRunner, Mode, Preset, SessionState, Snapshot,
    TimerEngine,
};
