//! Observable engine fields.
//!
//! Each field lives in its own `watch` cell: the engine is the only writer,
//! any number of observers may subscribe to any subset of fields.
//! `finished` counts natural session completions and is not part of
//! [`Snapshot`].

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use super::mode::SessionState;

/// Point-in-time view of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub state: SessionState,
    pub remaining_ms: u64,
    pub total_ms: u64,
    pub running: bool,
    pub cycle_count: u32,
}

impl Snapshot {
    /// Fraction of the current session already elapsed, in `0.0..=1.0`.
    pub fn progress(&self) -> f64 {
        if self.total_ms == 0 {
            return 0.0;
        }
        let done = self.total_ms.saturating_sub(self.remaining_ms);
        (done as f64 / self.total_ms as f64).clamp(0.0, 1.0)
    }

    /// `MM:SS` rendering of the remaining time.
    pub fn clock_face(&self) -> String {
        let total_secs = self.remaining_ms / 1000;
        format!("{:02}:{:02}", total_secs / 60, total_secs % 60)
    }
}

/// Writer side, owned by the engine.
#[derive(Debug)]
pub(crate) struct Cells {
    state: watch::Sender<SessionState>,
    remaining_ms: watch::Sender<u64>,
    total_ms: watch::Sender<u64>,
    running: watch::Sender<bool>,
    cycle_count: watch::Sender<u32>,
    finished: watch::Sender<u64>,
}

impl Cells {
    pub(crate) fn new(initial: Snapshot) -> Self {
        Self {
            state: watch::Sender::new(initial.state),
            remaining_ms: watch::Sender::new(initial.remaining_ms),
            total_ms: watch::Sender::new(initial.total_ms),
            running: watch::Sender::new(initial.running),
            cycle_count: watch::Sender::new(initial.cycle_count),
            finished: watch::Sender::new(0),
        }
    }

    /// Push a snapshot; only cells whose value changed notify their readers.
    pub(crate) fn publish(&self, snap: Snapshot) {
        set(&self.state, snap.state);
        set(&self.total_ms, snap.total_ms);
        set(&self.remaining_ms, snap.remaining_ms);
        set(&self.cycle_count, snap.cycle_count);
        set(&self.running, snap.running);
    }

    /// Count a countdown that ran out on its own.
    pub(crate) fn mark_finished(&self) {
        self.finished.send_modify(|n| *n += 1);
    }

    pub(crate) fn subscribe(&self) -> Observers {
        Observers {
            state: self.state.subscribe(),
            remaining_ms: self.remaining_ms.subscribe(),
            total_ms: self.total_ms.subscribe(),
            running: self.running.subscribe(),
            cycle_count: self.cycle_count.subscribe(),
            finished: self.finished.subscribe(),
        }
    }

    pub(crate) fn state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub(crate) fn remaining_ms(&self) -> watch::Receiver<u64> {
        self.remaining_ms.subscribe()
    }

    pub(crate) fn total_ms(&self) -> watch::Receiver<u64> {
        self.total_ms.subscribe()
    }

    pub(crate) fn running(&self) -> watch::Receiver<bool> {
        self.running.subscribe()
    }

    pub(crate) fn cycle_count(&self) -> watch::Receiver<u32> {
        self.cycle_count.subscribe()
    }
}

fn set<T: PartialEq>(cell: &watch::Sender<T>, value: T) {
    cell.send_if_modified(|current| {
        if *current == value {
            false
        } else {
            *current = value;
            true
        }
    });
}

/// Reader side: one receiver per observable field.
#[derive(Debug, Clone)]
pub struct Observers {
    pub state: watch::Receiver<SessionState>,
    pub remaining_ms: watch::Receiver<u64>,
    pub total_ms: watch::Receiver<u64>,
    pub running: watch::Receiver<bool>,
    pub cycle_count: watch::Receiver<u32>,
    pub finished: watch::Receiver<u64>,
}

impl Observers {
    /// Current values of every cell.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            state: *self.state.borrow(),
            remaining_ms: *self.remaining_ms.borrow(),
            total_ms: *self.total_ms.borrow(),
            running: *self.running.borrow(),
            cycle_count: *self.cycle_count.borrow(),
        }
    }
}
