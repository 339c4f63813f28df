//! Countdown sources driving the engine.
//!
//! A [`Clock`] starts countdowns on behalf of the engine and reports back
//! through [`ClockSignal`]s: one `Tick` per resolution step while time
//! remains, then exactly one `Finish`. The engine owns the returned
//! [`CountdownHandle`]; dropping or cancelling it stops the countdown.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};

use super::engine::TimerEngine;

/// Default tick resolution.
pub const TICK_RESOLUTION: Duration = Duration::from_secs(1);

/// Engine-assigned countdown identity, strictly increasing per engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CountdownId(pub u64);

impl fmt::Display for CountdownId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "countdown#{}", self.0)
    }
}

/// Callback delivered by a clock to the owning context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockSignal {
    Tick { id: CountdownId, remaining_ms: u64 },
    Finish { id: CountdownId },
}

type Canceller = Box<dyn FnOnce() + Send>;

/// Owned handle to a live countdown. Cancels on drop unless released.
pub struct CountdownHandle {
    id: CountdownId,
    canceller: Option<Canceller>,
}

impl CountdownHandle {
    pub fn new(id: CountdownId, cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            id,
            canceller: Some(Box::new(cancel)),
        }
    }

    pub fn id(&self) -> CountdownId {
        self.id
    }

    /// Stop the countdown; no further signals will be produced for it.
    pub fn cancel(mut self) {
        if let Some(cancel) = self.canceller.take() {
            cancel();
        }
    }

    /// Disarm after the countdown finished on its own.
    pub fn release(mut self) {
        self.canceller = None;
    }
}

impl Drop for CountdownHandle {
    fn drop(&mut self) {
        if let Some(cancel) = self.canceller.take() {
            cancel();
        }
    }
}

impl fmt::Debug for CountdownHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CountdownHandle")
            .field("id", &self.id)
            .field("armed", &self.canceller.is_some())
            .finish()
    }
}

/// Platform timer facility as seen by the engine.
pub trait Clock: Send {
    fn start_countdown(&mut self, id: CountdownId, duration_ms: u64) -> CountdownHandle;
}

// ── Tokio clock ─────────────────────────────────────────────────────

/// Real-time clock backed by one tokio task per countdown.
///
/// Must be used from within a tokio runtime. Signals arrive on the
/// receiver returned by [`TokioClock::new`].
pub struct TokioClock {
    signals: mpsc::UnboundedSender<ClockSignal>,
    resolution: Duration,
}

impl TokioClock {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ClockSignal>) {
        Self::with_resolution(TICK_RESOLUTION)
    }

    pub fn with_resolution(resolution: Duration) -> (Self, mpsc::UnboundedReceiver<ClockSignal>) {
        let (signals, rx) = mpsc::unbounded_channel();
        let resolution = resolution.max(Duration::from_millis(1));
        (Self { signals, resolution }, rx)
    }
}

impl Clock for TokioClock {
    fn start_countdown(&mut self, id: CountdownId, duration_ms: u64) -> CountdownHandle {
        let signals = self.signals.clone();
        let resolution = self.resolution;

        let task = tokio::spawn(async move {
            let started = Instant::now();
            let deadline = started + Duration::from_millis(duration_ms);
            let mut step: u32 = 1;
            loop {
                let next = started
                    .checked_add(resolution.saturating_mul(step))
                    .map_or(deadline, |at| at.min(deadline));
                sleep_until(next).await;

                let remaining = deadline.saturating_duration_since(Instant::now());
                let signal = if remaining.is_zero() {
                    ClockSignal::Finish { id }
                } else {
                    ClockSignal::Tick {
                        id,
                        remaining_ms: remaining.as_millis() as u64,
                    }
                };
                let finished = matches!(signal, ClockSignal::Finish { .. });
                if signals.send(signal).is_err() || finished {
                    break;
                }
                step = step.saturating_add(1);
            }
        });

        CountdownHandle::new(id, move || task.abort())
    }
}

// ── Manual clock ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Live,
    Cancelled,
    Finished,
}

#[derive(Debug)]
struct Countdown {
    duration_ms: u64,
    remaining_ms: u64,
    /// Time spent towards the next signal.
    carried_ms: u64,
    status: Status,
}

#[derive(Debug, Default)]
struct Ledger {
    countdowns: BTreeMap<CountdownId, Countdown>,
}

impl Ledger {
    fn live_mut(&mut self) -> Option<(CountdownId, &mut Countdown)> {
        self.countdowns
            .iter_mut()
            .rev()
            .find(|(_, c)| c.status == Status::Live)
            .map(|(id, c)| (*id, c))
    }
}

/// Deterministic clock: time only moves when the caller says so.
///
/// Clones share the same ledger, so a test can keep one clone while the
/// engine owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    ledger: Arc<Mutex<Ledger>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    fn ledger(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Every countdown ever started, with its requested length.
    pub fn started(&self) -> Vec<(CountdownId, u64)> {
        self.ledger()
            .countdowns
            .iter()
            .map(|(id, c)| (*id, c.duration_ms))
            .collect()
    }

    pub fn cancelled(&self) -> Vec<CountdownId> {
        self.with_status(Status::Cancelled)
    }

    pub fn finished(&self) -> Vec<CountdownId> {
        self.with_status(Status::Finished)
    }

    /// Countdowns neither cancelled nor finished.
    pub fn live(&self) -> Vec<CountdownId> {
        self.with_status(Status::Live)
    }

    fn with_status(&self, status: Status) -> Vec<CountdownId> {
        self.ledger()
            .countdowns
            .iter()
            .filter(|(_, c)| c.status == status)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Let `ms` of time pass, delivering every tick and finish that falls
    /// inside the window to `engine`, including those of countdowns the
    /// engine starts along the way.
    pub fn advance(&self, engine: &mut TimerEngine, mut ms: u64) {
        loop {
            // The ledger lock is released before the engine reacts, since the
            // engine may start a new countdown on this same clock.
            let signal = {
                let mut ledger = self.ledger();
                let Some((id, countdown)) = ledger.live_mut() else {
                    break;
                };
                let step = countdown.remaining_ms.min(TICK_RESOLUTION.as_millis() as u64);
                let until_signal = step - countdown.carried_ms;
                if ms < until_signal {
                    countdown.carried_ms += ms;
                    break;
                }
                ms -= until_signal;
                countdown.carried_ms = 0;
                countdown.remaining_ms -= step;
                if countdown.remaining_ms == 0 {
                    countdown.status = Status::Finished;
                    ClockSignal::Finish { id }
                } else {
                    ClockSignal::Tick {
                        id,
                        remaining_ms: countdown.remaining_ms,
                    }
                }
            };
            engine.handle_signal(signal);
        }
    }

    /// Run the current countdown to its natural end (delivering all ticks).
    pub fn run_to_end(&self, engine: &mut TimerEngine) {
        let left = {
            let mut ledger = self.ledger();
            match ledger.live_mut() {
                Some((_, c)) => c.remaining_ms - c.carried_ms,
                None => return,
            }
        };
        self.advance(engine, left);
    }
}

impl Clock for ManualClock {
    fn start_countdown(&mut self, id: CountdownId, duration_ms: u64) -> CountdownHandle {
        self.ledger().countdowns.insert(
            id,
            Countdown {
                duration_ms,
                remaining_ms: duration_ms,
                carried_ms: 0,
                status: Status::Live,
            },
        );

        let ledger = Arc::clone(&self.ledger);
        CountdownHandle::new(id, move || {
            let mut ledger = ledger.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Some(c) = ledger.countdowns.get_mut(&id) {
                if c.status == Status::Live {
                    c.status = Status::Cancelled;
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dropping_a_handle_cancels_it() {
        let mut clock = ManualClock::new();
        let handle = clock.start_countdown(CountdownId(1), 5_000);
        assert_eq!(clock.live(), vec![CountdownId(1)]);
        drop(handle);
        assert_eq!(clock.cancelled(), vec![CountdownId(1)]);
        assert!(clock.live().is_empty());
    }

    #[test]
    fn released_handle_does_not_cancel() {
        let mut clock = ManualClock::new();
        let handle = clock.start_countdown(CountdownId(7), 1_000);
        handle.release();
        assert!(clock.cancelled().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_clock_ticks_each_second_then_finishes_once() {
        let (mut clock, mut rx) = TokioClock::new();
        let _handle = clock.start_countdown(CountdownId(1), 3_500);

        let mut received = Vec::new();
        while let Some(signal) = rx.recv().await {
            let done = matches!(signal, ClockSignal::Finish { .. });
            received.push(signal);
            if done {
                break;
            }
        }

        assert_eq!(
            received,
            vec![
                ClockSignal::Tick { id: CountdownId(1), remaining_ms: 2_500 },
                ClockSignal::Tick { id: CountdownId(1), remaining_ms: 1_500 },
                ClockSignal::Tick { id: CountdownId(1), remaining_ms: 500 },
                ClockSignal::Finish { id: CountdownId(1) },
            ]
        );

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_tokio_countdown_goes_quiet() {
        let (mut clock, mut rx) = TokioClock::new();
        let handle = clock.start_countdown(CountdownId(2), 10_000);

        let first = rx.recv().await;
        assert_eq!(
            first,
            Some(ClockSignal::Tick { id: CountdownId(2), remaining_ms: 9_000 })
        );

        handle.cancel();
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert!(rx.try_recv().is_err());
    }
}
