mod clock;
mod engine;
mod mode;
mod observe;
mod preset;
mod runner;

pub use clock::{
    Clock, ClockSignal, CountdownHandle, CountdownId, ManualClock, TokioClock, TICK_RESOLUTION,
};
pub use engine::{Command, TimerEngine};
pub use mode::{Durations, Mode, SessionState, LONG_BREAK_INTERVAL};
pub use observe::{Observers, Snapshot};
pub use preset::Preset;
pub use runner::{EngineHandle, EngineRunner};
