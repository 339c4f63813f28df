//! Timer engine implementation.
//!
//! The engine is a single-owner state machine. It never blocks and never
//! spawns anything itself: countdowns come from a [`Clock`], and the owning
//! context feeds the resulting [`ClockSignal`]s back through
//! [`TimerEngine::handle_signal`].
//!
//! ## State Transitions
//!
//! ```text
//! Idle ──select──▶ Ready(m) ──start──▶ Running(m) ──pause──▶ Paused(m)
//!                                     ▲    │ finish              │
//!                                     │    ▼                     │
//!                                     └ Running(next) ◀─resume───┘
//! ```
//!
//! At most one countdown is alive per engine: every transition that leaves
//! `Running` cancels the owned handle before touching the session, and
//! signals carrying any other countdown id are dropped.
//!
//! ## Usage
//!
//! ```ignore
//! let (clock, mut signals) = TokioClock::new();
//! let mut engine = TimerEngine::new(Durations::default(), clock);
//! engine.start(Mode::Work);
//! while let Some(signal) = signals.recv().await {
//!     engine.handle_signal(signal);
//! }
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{debug, info, trace};

use super::clock::{Clock, ClockSignal, CountdownHandle, CountdownId};
use super::mode::{Durations, Mode, SessionState};
use super::observe::{Cells, Observers, Snapshot};
use crate::events::Event;

/// Inbound commands, as sent by a UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SelectMode(Mode),
    Start(Mode),
    Pause,
    Resume,
    ToggleStartPause,
    Next,
    Reset,
    SetDurations(Durations),
    /// Stop the countdown for good; the owning context is going away.
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Session {
    Idle,
    /// Mode shown, countdown not started.
    Ready {
        mode: Mode,
        remaining_ms: u64,
        total_ms: u64,
    },
    Running {
        mode: Mode,
        remaining_ms: u64,
        total_ms: u64,
        started_at: DateTime<Utc>,
    },
    Paused {
        mode: Mode,
        remaining_ms: u64,
        total_ms: u64,
        started_at: DateTime<Utc>,
    },
}

/// Core pomodoro timer engine.
pub struct TimerEngine {
    session: Session,
    durations: Durations,
    cycle_count: u32,
    countdown: Option<CountdownHandle>,
    clock: Box<dyn Clock>,
    last_countdown_id: u64,
    cells: Cells,
    events: Vec<Event>,
}

impl TimerEngine {
    /// Create an idle engine showing a full work session.
    pub fn new(durations: Durations, clock: impl Clock + 'static) -> Self {
        let work_ms = durations.millis(Mode::Work);
        let cells = Cells::new(Snapshot {
            state: SessionState::Idle,
            remaining_ms: work_ms,
            total_ms: work_ms,
            running: false,
            cycle_count: 0,
        });
        Self {
            session: Session::Idle,
            durations,
            cycle_count: 0,
            countdown: None,
            clock: Box::new(clock),
            last_countdown_id: 0,
            cells,
            events: Vec::new(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> SessionState {
        match self.session {
            Session::Idle => SessionState::Idle,
            Session::Ready { mode, .. } | Session::Running { mode, .. } => mode.into(),
            Session::Paused { .. } => SessionState::Paused,
        }
    }

    pub fn remaining_ms(&self) -> u64 {
        match self.session {
            Session::Idle => self.durations.millis(Mode::Work),
            Session::Ready { remaining_ms, .. }
            | Session::Running { remaining_ms, .. }
            | Session::Paused { remaining_ms, .. } => remaining_ms,
        }
    }

    pub fn total_ms(&self) -> u64 {
        match self.session {
            Session::Idle => self.durations.millis(Mode::Work),
            Session::Ready { total_ms, .. }
            | Session::Running { total_ms, .. }
            | Session::Paused { total_ms, .. } => total_ms,
        }
    }

    pub fn running(&self) -> bool {
        matches!(self.session, Session::Running { .. })
    }

    pub fn cycle_count(&self) -> u32 {
        self.cycle_count
    }

    /// Mode a pause would resume into; while paused, the interrupted mode.
    pub fn last_active_mode(&self) -> Option<Mode> {
        match self.session {
            Session::Idle => None,
            Session::Ready { mode, .. }
            | Session::Running { mode, .. }
            | Session::Paused { mode, .. } => Some(mode),
        }
    }

    pub fn durations(&self) -> Durations {
        self.durations
    }

    /// Id of the countdown currently owned by the engine.
    pub fn active_countdown(&self) -> Option<CountdownId> {
        self.countdown.as_ref().map(CountdownHandle::id)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            state: self.state(),
            remaining_ms: self.remaining_ms(),
            total_ms: self.total_ms(),
            running: self.running(),
            cycle_count: self.cycle_count,
        }
    }

    /// 0.0 ..= 1.0 progress within the current session.
    pub fn progress(&self) -> f64 {
        self.snapshot().progress()
    }

    // ── Observation ──────────────────────────────────────────────────

    pub fn subscribe(&self) -> Observers {
        self.cells.subscribe()
    }

    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.cells.state()
    }

    pub fn watch_remaining_ms(&self) -> watch::Receiver<u64> {
        self.cells.remaining_ms()
    }

    pub fn watch_total_ms(&self) -> watch::Receiver<u64> {
        self.cells.total_ms()
    }

    pub fn watch_running(&self) -> watch::Receiver<bool> {
        self.cells.running()
    }

    pub fn watch_cycle_count(&self) -> watch::Receiver<u32> {
        self.cells.cycle_count()
    }

    /// Drain the events produced since the last call, oldest first.
    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn apply(&mut self, command: Command) {
        match command {
            Command::SelectMode(mode) => self.select_mode(mode),
            Command::Start(mode) => self.start(mode),
            Command::Pause => self.pause(),
            Command::Resume => self.resume(),
            Command::ToggleStartPause => self.toggle_start_pause(),
            Command::Next => self.next(),
            Command::Reset => self.reset(),
            Command::SetDurations(durations) => self.apply_durations(durations),
            Command::Shutdown => self.shutdown(),
        }
    }

    /// Show `mode` without starting it. Any countdown is dropped.
    pub fn select_mode(&mut self, mode: Mode) {
        self.cancel_countdown();
        let total_ms = self.durations.millis(mode);
        self.session = Session::Ready {
            mode,
            remaining_ms: total_ms,
            total_ms,
        };
        debug!(%mode, total_ms, "mode selected");
        self.emit(Event::ModeSelected {
            mode,
            total_ms,
            at: Utc::now(),
        });
        self.publish();
    }

    /// Start a fresh `mode` session at its full configured length.
    pub fn start(&mut self, mode: Mode) {
        let duration_ms = self.durations.millis(mode);
        let now = Utc::now();
        self.run_countdown(mode, duration_ms, duration_ms, now);
        debug!(%mode, duration_ms, "session started");
        self.emit(Event::SessionStarted {
            mode,
            duration_ms,
            at: now,
        });
        self.publish();
    }

    pub fn pause(&mut self) {
        let Session::Running {
            mode,
            remaining_ms,
            total_ms,
            started_at,
        } = self.session
        else {
            trace!(state = ?self.state(), "pause ignored");
            return;
        };
        self.cancel_countdown();
        self.session = Session::Paused {
            mode,
            remaining_ms,
            total_ms,
            started_at,
        };
        debug!(%mode, remaining_ms, "session paused");
        self.emit(Event::SessionPaused {
            mode,
            remaining_ms,
            at: Utc::now(),
        });
        self.publish();
    }

    /// Continue a paused session from where it stopped; `total` is kept.
    pub fn resume(&mut self) {
        let Session::Paused {
            mode,
            remaining_ms,
            total_ms,
            started_at,
        } = self.session
        else {
            trace!(state = ?self.state(), "resume ignored");
            return;
        };
        self.run_countdown(mode, remaining_ms, total_ms, started_at);
        debug!(%mode, remaining_ms, "session resumed");
        self.emit(Event::SessionResumed {
            mode,
            remaining_ms,
            at: Utc::now(),
        });
        self.publish();
    }

    pub fn toggle_start_pause(&mut self) {
        match self.session {
            Session::Running { .. } => self.pause(),
            Session::Paused { .. } => self.resume(),
            Session::Ready { mode, .. } => self.start(mode),
            Session::Idle => self.start(Mode::Work),
        }
    }

    /// Manual skip. Leaving work counts a cycle exactly like a natural
    /// finish, but the following session is only shown, not started.
    pub fn next(&mut self) {
        self.cancel_countdown();
        let from = self.state();
        let now = Utc::now();
        let to = match self.session {
            Session::Running {
                mode: Mode::Work, ..
            }
            | Session::Ready {
                mode: Mode::Work, ..
            } => {
                let cycle = self.complete_cycle(false, now);
                Mode::break_after(cycle)
            }
            _ => Mode::Work,
        };
        let total_ms = self.durations.millis(to);
        self.session = Session::Ready {
            mode: to,
            remaining_ms: total_ms,
            total_ms,
        };
        debug!(?from, %to, "skipped");
        self.emit(Event::SessionSkipped { from, to, at: now });
        self.publish();
    }

    /// Back to idle. The cycle counter is kept.
    pub fn reset(&mut self) {
        self.cancel_countdown();
        self.session = Session::Idle;
        debug!("timer reset");
        self.emit(Event::TimerReset { at: Utc::now() });
        self.publish();
    }

    /// Reconfigure from raw minute counts; values below one minute are clamped.
    pub fn set_durations(&mut self, work_min: u32, short_break_min: u32, long_break_min: u32) {
        self.apply_durations(Durations::new(work_min, short_break_min, long_break_min));
    }

    /// Install new durations. A running or paused session restarts at the
    /// new length of its mode; an idle one is only redisplayed.
    pub fn apply_durations(&mut self, durations: Durations) {
        self.durations = durations;
        debug!(?durations, "durations changed");
        self.emit(Event::DurationsChanged {
            durations,
            at: Utc::now(),
        });

        match self.session {
            Session::Running { mode, .. } | Session::Paused { mode, .. } => {
                self.start(mode);
                return;
            }
            Session::Ready { mode, .. } => {
                let total_ms = durations.millis(mode);
                self.session = Session::Ready {
                    mode,
                    remaining_ms: total_ms,
                    total_ms,
                };
            }
            Session::Idle => {}
        }
        self.publish();
    }

    /// Tear down: cancel the countdown, keeping a running session as paused.
    pub fn shutdown(&mut self) {
        if self.running() {
            self.pause();
        }
        self.cancel_countdown();
    }

    // ── Clock callbacks ──────────────────────────────────────────────

    pub fn handle_signal(&mut self, signal: ClockSignal) {
        match signal {
            ClockSignal::Tick { id, remaining_ms } => self.on_tick(id, remaining_ms),
            ClockSignal::Finish { id } => self.on_finish(id),
        }
    }

    pub fn on_tick(&mut self, id: CountdownId, remaining_ms: u64) {
        if !self.is_active(id) {
            trace!(%id, remaining_ms, "stale tick dropped");
            return;
        }
        if let Session::Running {
            remaining_ms: current,
            total_ms,
            ..
        } = &mut self.session
        {
            *current = remaining_ms.min(*current).min(*total_ms);
        }
        self.publish();
    }

    /// Natural end of the active countdown.
    ///
    /// The next session starts in the same step, so observers go straight
    /// from the last tick to the next session's full length and never see
    /// `remaining_ms == 0`. The completion itself is carried by
    /// [`Event::SessionFinished`] and the `finished` observer cell, which is
    /// bumped before the next session is published.
    pub fn on_finish(&mut self, id: CountdownId) {
        if !self.is_active(id) {
            trace!(%id, "stale finish dropped");
            return;
        }
        let Session::Running {
            mode,
            total_ms,
            started_at,
            ..
        } = self.session
        else {
            return;
        };
        if let Some(handle) = self.countdown.take() {
            handle.release();
        }
        self.cells.mark_finished();

        let now = Utc::now();
        info!(%mode, duration_ms = total_ms, "session finished");
        self.session = Session::Running {
            mode,
            remaining_ms: 0,
            total_ms,
            started_at,
        };
        self.emit(Event::SessionFinished {
            mode,
            duration_ms: total_ms,
            started_at,
            at: now,
        });

        let next = match mode {
            Mode::Work => {
                let cycle = self.complete_cycle(true, now);
                Mode::break_after(cycle)
            }
            Mode::ShortBreak | Mode::LongBreak => Mode::Work,
        };
        self.start(next);
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn is_active(&self, id: CountdownId) -> bool {
        self.running() && self.active_countdown() == Some(id)
    }

    fn run_countdown(
        &mut self,
        mode: Mode,
        remaining_ms: u64,
        total_ms: u64,
        started_at: DateTime<Utc>,
    ) {
        self.cancel_countdown();
        self.last_countdown_id += 1;
        let id = CountdownId(self.last_countdown_id);
        self.countdown = Some(self.clock.start_countdown(id, remaining_ms));
        self.session = Session::Running {
            mode,
            remaining_ms,
            total_ms,
            started_at,
        };
    }

    fn cancel_countdown(&mut self) {
        if let Some(handle) = self.countdown.take() {
            trace!(id = %handle.id(), "countdown cancelled");
            handle.cancel();
        }
    }

    fn complete_cycle(&mut self, natural: bool, at: DateTime<Utc>) -> u32 {
        self.cycle_count = self.cycle_count.saturating_add(1);
        info!(cycle_count = self.cycle_count, natural, "cycle completed");
        self.emit(Event::CycleCompleted {
            cycle_count: self.cycle_count,
            natural,
            at,
        });
        self.cycle_count
    }

    fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    fn publish(&self) {
        let snap = self.snapshot();
        debug_assert!(snap.remaining_ms <= snap.total_ms);
        debug_assert_eq!(snap.running, self.countdown.is_some());
        self.cells.publish(snap);
    }
}

impl Drop for TimerEngine {
    fn drop(&mut self) {
        self.cancel_countdown();
    }
}

impl fmt::Debug for TimerEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerEngine")
            .field("session", &self.session)
            .field("durations", &self.durations)
            .field("cycle_count", &self.cycle_count)
            .field("countdown", &self.countdown)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::clock::ManualClock;

    fn engine() -> (TimerEngine, ManualClock) {
        let clock = ManualClock::new();
        (TimerEngine::new(Durations::default(), clock.clone()), clock)
    }

    #[test]
    fn new_engine_is_idle_showing_work() {
        let (engine, _) = engine();
        assert_eq!(engine.state(), SessionState::Idle);
        assert_eq!(engine.remaining_ms(), 1_500_000);
        assert_eq!(engine.total_ms(), 1_500_000);
        assert!(!engine.running());
        assert_eq!(engine.cycle_count(), 0);
        assert_eq!(engine.last_active_mode(), None);
    }

    #[test]
    fn select_mode_shows_without_starting() {
        let (mut engine, clock) = engine();
        engine.select_mode(Mode::LongBreak);
        assert_eq!(engine.state(), SessionState::LongBreak);
        assert_eq!(engine.total_ms(), 900_000);
        assert_eq!(engine.remaining_ms(), 900_000);
        assert!(!engine.running());
        assert!(clock.started().is_empty());
    }

    #[test]
    fn select_mode_while_running_cancels_countdown() {
        let (mut engine, clock) = engine();
        engine.start(Mode::Work);
        engine.select_mode(Mode::ShortBreak);
        assert!(!engine.running());
        assert!(clock.live().is_empty());
        assert_eq!(clock.cancelled().len(), 1);
    }

    #[test]
    fn start_runs_a_full_countdown() {
        let (mut engine, clock) = engine();
        engine.start(Mode::Work);
        assert_eq!(engine.state(), SessionState::Work);
        assert!(engine.running());
        assert_eq!(engine.last_active_mode(), Some(Mode::Work));
        assert_eq!(clock.started(), vec![(CountdownId(1), 1_500_000)]);
    }

    #[test]
    fn restart_replaces_the_countdown() {
        let (mut engine, clock) = engine();
        engine.start(Mode::Work);
        engine.start(Mode::Work);
        assert_eq!(clock.live(), vec![CountdownId(2)]);
        assert_eq!(clock.cancelled(), vec![CountdownId(1)]);
    }

    #[test]
    fn pause_then_resume_continues_from_remaining() {
        let (mut engine, clock) = engine();
        engine.start(Mode::Work);
        clock.advance(&mut engine, 100_000);
        assert_eq!(engine.remaining_ms(), 1_400_000);

        engine.pause();
        assert_eq!(engine.state(), SessionState::Paused);
        assert!(!engine.running());
        assert_eq!(engine.remaining_ms(), 1_400_000);
        assert_eq!(engine.last_active_mode(), Some(Mode::Work));
        assert!(clock.live().is_empty());

        engine.resume();
        assert_eq!(engine.state(), SessionState::Work);
        assert!(engine.running());
        assert_eq!(engine.total_ms(), 1_500_000);
        assert_eq!(engine.remaining_ms(), 1_400_000);
        assert_eq!(clock.started().last(), Some(&(CountdownId(2), 1_400_000)));

        clock.advance(&mut engine, 1_399_000);
        assert_eq!(engine.remaining_ms(), 1_000);
        assert_eq!(engine.total_ms(), 1_500_000);
        clock.advance(&mut engine, 1_000);
        assert_eq!(engine.state(), SessionState::ShortBreak);
        assert_eq!(engine.cycle_count(), 1);
    }

    #[test]
    fn resume_returns_to_the_interrupted_break() {
        let (mut engine, clock) = engine();
        engine.start(Mode::LongBreak);
        clock.advance(&mut engine, 60_000);
        engine.pause();
        assert_eq!(engine.last_active_mode(), Some(Mode::LongBreak));
        engine.resume();
        assert_eq!(engine.state(), SessionState::LongBreak);
        assert_eq!(engine.remaining_ms(), 840_000);
    }

    #[test]
    fn pause_and_resume_are_noops_out_of_place() {
        let (mut engine, clock) = engine();
        engine.pause();
        assert_eq!(engine.state(), SessionState::Idle);
        engine.resume();
        assert_eq!(engine.state(), SessionState::Idle);
        assert!(clock.started().is_empty());
        assert!(engine.take_events().is_empty());
    }

    #[test]
    fn work_finish_auto_starts_short_break() {
        let (mut engine, clock) = engine();
        engine.start(Mode::Work);
        clock.run_to_end(&mut engine);
        assert_eq!(engine.cycle_count(), 1);
        assert_eq!(engine.state(), SessionState::ShortBreak);
        assert!(engine.running());
        assert_eq!(engine.total_ms(), 300_000);
        assert_eq!(engine.remaining_ms(), 300_000);
    }

    #[test]
    fn break_finish_auto_starts_work() {
        let (mut engine, clock) = engine();
        engine.start(Mode::ShortBreak);
        clock.run_to_end(&mut engine);
        assert_eq!(engine.state(), SessionState::Work);
        assert!(engine.running());
        assert_eq!(engine.cycle_count(), 0);
    }

    #[test]
    fn next_from_work_counts_cycle_without_starting() {
        let (mut engine, clock) = engine();
        engine.start(Mode::Work);
        engine.next();
        assert_eq!(engine.cycle_count(), 1);
        assert_eq!(engine.state(), SessionState::ShortBreak);
        assert!(!engine.running());
        assert_eq!(engine.total_ms(), 300_000);
        assert_eq!(engine.remaining_ms(), 300_000);
        assert!(clock.live().is_empty());
    }

    #[test]
    fn next_cadence_reaches_long_break_on_fourth_cycle() {
        let (mut engine, _) = engine();
        let mut seen = Vec::new();
        for _ in 0..8 {
            engine.select_mode(Mode::Work);
            engine.next();
            seen.push(engine.state());
        }
        assert_eq!(seen[3], SessionState::LongBreak);
        assert_eq!(seen[7], SessionState::LongBreak);
        assert_eq!(
            seen.iter().filter(|s| **s == SessionState::ShortBreak).count(),
            6
        );
    }

    #[test]
    fn next_from_break_idle_or_paused_moves_to_work() {
        let (mut engine, _) = engine();
        engine.next();
        assert_eq!(engine.state(), SessionState::Work);

        engine.start(Mode::ShortBreak);
        engine.next();
        assert_eq!(engine.state(), SessionState::Work);

        engine.start(Mode::Work);
        engine.pause();
        engine.next();
        assert_eq!(engine.state(), SessionState::Work);
        assert!(!engine.running());
        assert_eq!(engine.cycle_count(), 0);
    }

    #[test]
    fn reset_returns_to_idle_and_keeps_cycles() {
        let (mut engine, clock) = engine();
        engine.start(Mode::Work);
        clock.run_to_end(&mut engine);
        engine.reset();
        assert_eq!(engine.state(), SessionState::Idle);
        assert_eq!(engine.remaining_ms(), 1_500_000);
        assert_eq!(engine.total_ms(), 1_500_000);
        assert!(!engine.running());
        assert_eq!(engine.cycle_count(), 1);
        assert!(clock.live().is_empty());
    }

    #[test]
    fn durations_change_restarts_running_session() {
        let (mut engine, clock) = engine();
        engine.start(Mode::Work);
        clock.advance(&mut engine, 30_000);
        engine.set_durations(10, 5, 15);
        assert_eq!(engine.state(), SessionState::Work);
        assert!(engine.running());
        assert_eq!(engine.total_ms(), 600_000);
        assert_eq!(engine.remaining_ms(), 600_000);
        assert_eq!(clock.live(), vec![CountdownId(2)]);
        assert_eq!(clock.cancelled(), vec![CountdownId(1)]);
    }

    #[test]
    fn durations_change_restarts_paused_session_running() {
        let (mut engine, clock) = engine();
        engine.start(Mode::ShortBreak);
        clock.advance(&mut engine, 10_000);
        engine.pause();
        engine.set_durations(25, 8, 15);
        assert_eq!(engine.state(), SessionState::ShortBreak);
        assert!(engine.running());
        assert_eq!(engine.remaining_ms(), 480_000);
        assert_eq!(engine.total_ms(), 480_000);
    }

    #[test]
    fn durations_change_while_idle_only_redisplays() {
        let (mut engine, clock) = engine();
        engine.set_durations(50, 10, 30);
        assert_eq!(engine.state(), SessionState::Idle);
        assert_eq!(engine.total_ms(), 3_000_000);
        assert!(!engine.running());

        engine.select_mode(Mode::LongBreak);
        engine.set_durations(50, 10, 20);
        assert_eq!(engine.remaining_ms(), 1_200_000);
        assert!(!engine.running());
        assert!(clock.started().is_empty());
    }

    #[test]
    fn durations_below_one_minute_are_clamped() {
        let (mut engine, _) = engine();
        engine.set_durations(0, 0, 0);
        assert_eq!(engine.durations(), Durations::new(1, 1, 1));
        assert_eq!(engine.total_ms(), 60_000);
    }

    #[test]
    fn double_toggle_from_idle_leaves_one_cancelled_countdown() {
        let (mut engine, clock) = engine();
        engine.toggle_start_pause();
        engine.toggle_start_pause();
        assert!(!engine.running());
        assert_eq!(engine.state(), SessionState::Paused);
        assert_eq!(clock.started().len(), 1);
        assert_eq!(clock.cancelled(), vec![CountdownId(1)]);
        assert!(clock.live().is_empty());
    }

    #[test]
    fn toggle_starts_the_selected_mode() {
        let (mut engine, _) = engine();
        engine.select_mode(Mode::ShortBreak);
        engine.toggle_start_pause();
        assert_eq!(engine.state(), SessionState::ShortBreak);
        assert!(engine.running());
    }

    #[test]
    fn stale_signals_are_ignored() {
        let (mut engine, _) = engine();
        engine.start(Mode::Work);
        let first = engine.active_countdown().unwrap();
        engine.pause();

        engine.on_tick(first, 10);
        engine.on_finish(first);
        assert_eq!(engine.state(), SessionState::Paused);
        assert_eq!(engine.remaining_ms(), 1_500_000);
        assert_eq!(engine.cycle_count(), 0);

        engine.resume();
        engine.on_finish(first);
        assert_eq!(engine.state(), SessionState::Work);
        assert_eq!(engine.cycle_count(), 0);
    }

    #[test]
    fn late_signals_after_reconfiguration_are_dropped() {
        let (mut engine, clock) = engine();
        engine.start(Mode::Work);
        let old = engine.active_countdown().unwrap();
        engine.set_durations(10, 5, 15);

        engine.on_tick(old, 1);
        engine.on_finish(old);
        assert_eq!(engine.cycle_count(), 0);
        assert_eq!(engine.remaining_ms(), 600_000);
        assert_eq!(engine.state(), SessionState::Work);
        let events = engine.take_events();
        assert!(!events.iter().any(|e| matches!(e, Event::SessionFinished { .. })));
        assert!(clock.finished().is_empty());
        assert_eq!(clock.live(), vec![engine.active_countdown().unwrap()]);
    }

    #[test]
    fn natural_finish_bumps_the_finished_cell() {
        let (mut engine, clock) = engine();
        let mut obs = engine.subscribe();
        engine.start(Mode::ShortBreak);
        assert_eq!(*obs.finished.borrow_and_update(), 0);

        clock.run_to_end(&mut engine);
        assert_eq!(*obs.finished.borrow_and_update(), 1);
        assert_eq!(clock.finished(), vec![CountdownId(1)]);
        assert_eq!(engine.state(), SessionState::Work);
        assert_eq!(obs.snapshot().remaining_ms, 1_500_000);
    }

    #[test]
    fn finish_fires_once_per_countdown() {
        let (mut engine, _) = engine();
        engine.start(Mode::Work);
        let id = engine.active_countdown().unwrap();
        engine.on_finish(id);
        engine.on_finish(id);
        engine.on_tick(id, 1_000);
        assert_eq!(engine.cycle_count(), 1);
        assert_eq!(engine.state(), SessionState::ShortBreak);
        assert_eq!(engine.remaining_ms(), 300_000);
    }

    #[test]
    fn ticks_never_raise_remaining() {
        let (mut engine, _) = engine();
        engine.start(Mode::ShortBreak);
        let id = engine.active_countdown().unwrap();
        engine.on_tick(id, 200_000);
        engine.on_tick(id, 250_000);
        assert_eq!(engine.remaining_ms(), 200_000);
        engine.on_tick(id, 9_999_999);
        assert!(engine.remaining_ms() <= engine.total_ms());
    }

    #[test]
    fn dropping_the_engine_cancels_its_countdown() {
        let (mut engine, clock) = engine();
        engine.start(Mode::Work);
        drop(engine);
        assert!(clock.live().is_empty());
    }

    #[test]
    fn shutdown_keeps_a_running_session_paused() {
        let (mut engine, clock) = engine();
        engine.start(Mode::Work);
        clock.advance(&mut engine, 5_000);
        engine.apply(Command::Shutdown);
        assert_eq!(engine.state(), SessionState::Paused);
        assert_eq!(engine.remaining_ms(), 1_495_000);
        assert!(clock.live().is_empty());
    }

    #[test]
    fn events_are_queued_in_order() {
        let (mut engine, clock) = engine();
        engine.start(Mode::Work);
        engine.pause();
        engine.resume();
        clock.run_to_end(&mut engine);

        let kinds: Vec<&'static str> = engine
            .take_events()
            .iter()
            .map(|e| match e {
                Event::SessionStarted { .. } => "started",
                Event::SessionPaused { .. } => "paused",
                Event::SessionResumed { .. } => "resumed",
                Event::SessionFinished { .. } => "finished",
                Event::CycleCompleted { .. } => "cycle",
                _ => "other",
            })
            .collect();
        assert_eq!(
            kinds,
            vec!["started", "paused", "resumed", "finished", "cycle", "started"]
        );
        assert!(engine.take_events().is_empty());
    }

    #[test]
    fn observers_follow_the_engine() {
        let (mut engine, clock) = engine();
        let obs = engine.subscribe();
        engine.start(Mode::Work);
        clock.advance(&mut engine, 3_000);
        assert_eq!(obs.snapshot(), engine.snapshot());
        assert_eq!(*obs.remaining_ms.borrow(), 1_497_000);
        assert!(*obs.running.borrow());

        clock.run_to_end(&mut engine);
        assert_eq!(*obs.cycle_count.borrow(), 1);
        assert_eq!(*obs.state.borrow(), SessionState::ShortBreak);
    }
}
