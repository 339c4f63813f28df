//! Async owner for a [`TimerEngine`].
//!
//! The runner is the engine's single execution context: UI commands and
//! clock signals are funnelled through channels and applied one at a time,
//! so the engine never needs a lock.

use tokio::sync::mpsc;
use tracing::debug;

use super::clock::{ClockSignal, TokioClock};
use super::engine::{Command, TimerEngine};
use super::mode::Durations;
use super::observe::{Observers, Snapshot};
use crate::events::Event;

/// Cloneable command sender for a running [`EngineRunner`].
#[derive(Debug, Clone)]
pub struct EngineHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl EngineHandle {
    /// Queue a command. Returns `false` once the runner has stopped.
    pub fn send(&self, command: Command) -> bool {
        self.commands.send(command).is_ok()
    }

    pub fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown);
    }
}

pub struct EngineRunner {
    engine: TimerEngine,
    signals: mpsc::UnboundedReceiver<ClockSignal>,
    commands: mpsc::UnboundedReceiver<Command>,
}

impl EngineRunner {
    /// Build an engine on a [`TokioClock`]. Must be called inside a tokio runtime
    /// before the first `start`.
    pub fn new(durations: Durations) -> (Self, EngineHandle) {
        let (clock, signals) = TokioClock::new();
        Self::with_clock(TimerEngine::new(durations, clock), signals)
    }

    /// Wrap an already-built engine whose clock reports on `signals`.
    pub fn with_clock(
        engine: TimerEngine,
        signals: mpsc::UnboundedReceiver<ClockSignal>,
    ) -> (Self, EngineHandle) {
        let (tx, commands) = mpsc::unbounded_channel();
        (
            Self {
                engine,
                signals,
                commands,
            },
            EngineHandle { commands: tx },
        )
    }

    pub fn observers(&self) -> Observers {
        self.engine.subscribe()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.engine.snapshot()
    }

    /// Process commands and clock signals until shut down.
    ///
    /// Every event is handed to `on_event` before the next input is
    /// processed. Returns the engine state at shutdown.
    pub async fn run<F>(mut self, mut on_event: F) -> Snapshot
    where
        F: FnMut(&Event),
    {
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => {
                        debug!(?command, "command");
                        self.engine.apply(command);
                    }
                },
                Some(signal) = self.signals.recv() => self.engine.handle_signal(signal),
            }
            for event in self.engine.take_events() {
                on_event(&event);
            }
        }

        self.engine.shutdown();
        for event in self.engine.take_events() {
            on_event(&event);
        }
        self.engine.snapshot()
    }
}
