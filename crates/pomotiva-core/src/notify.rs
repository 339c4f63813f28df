//! End-of-session alerts.
//!
//! The scheduler keeps at most one pending alert under a fixed identifier:
//! scheduling again replaces it, and it is cancelled as soon as the engine
//! stops running. When the engine reports a natural finish the pending alert
//! is delivered on the spot, however late this observer saw the session
//! start.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, trace};

use crate::timer::{Mode, Observers, SessionState, Snapshot};

/// Identifier shared by every end-of-session alert.
pub const ALERT_ID: &str = "pomodoro_end";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub id: &'static str,
    pub message: String,
}

/// Delivery mechanism for alerts (terminal bell, desktop notification...).
pub trait Notifier: Send + Sync + 'static {
    fn notify(&self, alert: &Alert);
}

/// Alert text for the end of a `mode` session.
pub fn message_for(mode: Mode) -> &'static str {
    if mode.is_break() {
        "Break is over. Back to focus!"
    } else {
        "Focus session complete. Time for a break!"
    }
}

struct Pending {
    task: JoinHandle<()>,
    due_at: Instant,
    alert: Alert,
    /// Set by whichever side delivers first: the timer task or `fire_now`.
    delivered: Arc<AtomicBool>,
}

pub struct NotificationScheduler<N: Notifier> {
    notifier: Arc<N>,
    pending: Option<Pending>,
}

impl<N: Notifier> NotificationScheduler<N> {
    pub fn new(notifier: N) -> Self {
        Self {
            notifier: Arc::new(notifier),
            pending: None,
        }
    }

    /// Schedule the alert `delay_ms` from now, replacing any pending one.
    pub fn schedule(&mut self, delay_ms: u64, message: impl Into<String>) {
        self.clear();
        let alert = Alert {
            id: ALERT_ID,
            message: message.into(),
        };
        let due_at = Instant::now() + Duration::from_millis(delay_ms);
        let delivered = Arc::new(AtomicBool::new(false));
        let notifier = Arc::clone(&self.notifier);
        debug!(delay_ms, "alert scheduled");
        let task = tokio::spawn({
            let alert = alert.clone();
            let delivered = Arc::clone(&delivered);
            async move {
                sleep_until(due_at).await;
                if !delivered.swap(true, Ordering::AcqRel) {
                    notifier.notify(&alert);
                }
            }
        });
        self.pending = Some(Pending {
            task,
            due_at,
            alert,
            delivered,
        });
    }

    /// Deliver the pending alert now instead of at its due time.
    fn fire_now(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        pending.task.abort();
        if !pending.delivered.swap(true, Ordering::AcqRel) {
            debug!("alert delivered at session end");
            self.notifier.notify(&pending.alert);
        }
    }

    pub fn cancel(&mut self) {
        if self.pending.is_some() {
            debug!("alert cancelled");
        }
        self.clear();
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|p| !p.task.is_finished())
    }

    /// An alert already due is left to fire; anything later is aborted.
    fn clear(&mut self) {
        if let Some(pending) = self.pending.take() {
            if pending.due_at > Instant::now() {
                pending.task.abort();
            }
        }
    }

    /// Follow the engine's cells until the engine goes away.
    pub async fn watch(mut self, mut observers: Observers) {
        let mut tracked = Tracked::default();
        loop {
            let snap = observers.snapshot();
            let finished = *observers.finished.borrow_and_update();
            self.reconcile(&snap, finished, &mut tracked);
            let alive = tokio::select! {
                r = observers.finished.changed() => r.is_ok(),
                r = observers.running.changed() => r.is_ok(),
                r = observers.state.changed() => r.is_ok(),
                r = observers.total_ms.changed() => r.is_ok(),
                r = observers.remaining_ms.changed() => r.is_ok(),
            };
            if !alive {
                break;
            }
        }
        self.cancel();
    }

    /// `finished` is the engine's natural-completion count. The engine bumps
    /// it before publishing the next session and it is read after `snap`, so
    /// a snapshot showing the next session always comes with its bump.
    fn reconcile(&mut self, snap: &Snapshot, finished: u64, tracked: &mut Tracked) {
        if tracked.finished.is_some_and(|seen| finished > seen) {
            self.fire_now();
        }
        tracked.finished = Some(finished);

        if snap.running {
            let key = (snap.state, snap.total_ms);
            // A new session shows up as a different key or a jump upward.
            if tracked.session != Some(key) || snap.remaining_ms > tracked.remaining_ms {
                let mode = snap.state.mode().unwrap_or(Mode::Work);
                self.schedule(snap.remaining_ms, message_for(mode));
                tracked.session = Some(key);
            }
        } else if tracked.session.take().is_some() {
            self.cancel();
        } else {
            trace!(state = ?snap.state, "nothing to schedule");
        }
        tracked.remaining_ms = snap.remaining_ms;
    }
}

impl<N: Notifier> Drop for NotificationScheduler<N> {
    fn drop(&mut self) {
        self.clear();
    }
}

#[derive(Debug, Default)]
struct Tracked {
    session: Option<(SessionState, u64)>,
    remaining_ms: u64,
    finished: Option<u64>,
}
