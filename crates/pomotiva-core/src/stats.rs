//! Turns engine events into persisted statistics.

use chrono::Local;
use tracing::debug;

use crate::error::Result;
use crate::events::Event;
use crate::storage::Database;
use crate::timer::Mode;

/// Writes the session log and daily totals as events arrive.
///
/// Daily rows are keyed by the local date the session ended on.
pub struct StatsRecorder<'a> {
    db: &'a Database,
}

impl<'a> StatsRecorder<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub fn record(&self, event: &Event) -> Result<()> {
        match event {
            Event::SessionFinished {
                mode,
                duration_ms,
                started_at,
                at,
            } => {
                self.db.log_session(*mode, *duration_ms, *started_at, *at)?;
                let day = at.with_timezone(&Local).date_naive();
                let stats =
                    self.db
                        .increment_daily_stats(*mode == Mode::Work, *duration_ms, day)?;
                debug!(%mode, cycles = stats.cycles, "session recorded");
            }
            // Skipped work still counts as a cycle, without focus time.
            Event::CycleCompleted {
                natural: false, at, ..
            } => {
                let day = at.with_timezone(&Local).date_naive();
                self.db.increment_daily_stats(true, 0, day)?;
            }
            _ => {}
        }
        Ok(())
    }

    pub fn record_all<'e>(&self, events: impl IntoIterator<Item = &'e Event>) -> Result<()> {
        for event in events {
            self.record(event)?;
        }
        Ok(())
    }
}
