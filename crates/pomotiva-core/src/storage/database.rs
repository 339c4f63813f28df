//! SQLite-based session storage and statistics.
//!
//! Provides persistent storage for:
//! - The session log (one row per finished session)
//! - Daily aggregates keyed by local calendar date
//! - Goals and the key-value store for application state
//!
//! Period goals live in [`super::goals`] on the same connection.

use std::path::Path;

use chrono::{DateTime, Local, NaiveDate, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::{DatabaseError, Result};
use crate::timer::Mode;

const GOALS_KEY: &str = "goals";

/// `YYYY-MM-DD`, the key used for daily rows.
pub fn day_key(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionLog {
    pub id: i64,
    pub mode: Mode,
    pub duration_ms: u64,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
}

/// Per-day totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyStats {
    pub day: NaiveDate,
    pub cycles: u32,
    pub focus_ms: u64,
    pub break_ms: u64,
}

impl DailyStats {
    pub fn empty(day: NaiveDate) -> Self {
        Self {
            day,
            cycles: 0,
            focus_ms: 0,
            break_ms: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goals {
    /// 0 means no cycle goal.
    #[serde(default)]
    pub daily_cycles_target: u32,
    #[serde(default = "default_focus_target")]
    pub daily_focus_ms_target: u64,
}

fn default_focus_target() -> u64 {
    25 * 60_000
}

impl Default for Goals {
    fn default() -> Self {
        Self {
            daily_cycles_target: 0,
            daily_focus_ms_target: default_focus_target(),
        }
    }
}

/// How one day measures up against [`Goals`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalProgress {
    pub day: NaiveDate,
    pub cycles: u32,
    pub cycles_target: u32,
    pub focus_ms: u64,
    pub focus_target_ms: u64,
    pub cycles_met: bool,
    pub focus_met: bool,
    /// Focus time over target, capped at 1.0.
    pub focus_ratio: f64,
}

impl GoalProgress {
    pub fn new(stats: &DailyStats, goals: &Goals) -> Self {
        let focus_ratio = if goals.daily_focus_ms_target == 0 {
            1.0
        } else {
            (stats.focus_ms as f64 / goals.daily_focus_ms_target as f64).min(1.0)
        };
        Self {
            day: stats.day,
            cycles: stats.cycles,
            cycles_target: goals.daily_cycles_target,
            focus_ms: stats.focus_ms,
            focus_target_ms: goals.daily_focus_ms_target,
            cycles_met: stats.cycles >= goals.daily_cycles_target,
            focus_met: stats.focus_ms >= goals.daily_focus_ms_target,
            focus_ratio,
        }
    }
}

/// SQLite database for session storage.
pub struct Database {
    pub(super) conn: Connection,
}

impl Database {
    /// Open the database at `~/.config/pomotiva/pomotiva.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the data directory cannot be created or the
    /// database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("pomotiva.db");
        Ok(Self::open_at(&path)?)
    }

    pub fn open_at(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (tests, dry runs).
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), DatabaseError> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS sessions (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                mode        TEXT NOT NULL,
                duration_ms INTEGER NOT NULL,
                start_at    TEXT NOT NULL,
                end_at      TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS daily_stats (
                day        TEXT PRIMARY KEY,
                cycles     INTEGER NOT NULL DEFAULT 0,
                focus_ms   INTEGER NOT NULL DEFAULT 0,
                break_ms   INTEGER NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS period_goals (
                period        TEXT PRIMARY KEY,
                cycles_target INTEGER NOT NULL DEFAULT 0,
                created_at    TEXT
            );

            CREATE TABLE IF NOT EXISTS period_tasks (
                seq        INTEGER PRIMARY KEY AUTOINCREMENT,
                task_key   TEXT NOT NULL UNIQUE,
                period     TEXT NOT NULL,
                text       TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_end_at ON sessions(end_at);
            CREATE INDEX IF NOT EXISTS idx_period_tasks_period ON period_tasks(period);",
        )?;
        Ok(())
    }

    // ── Session log ─────────────────────────────────────────────────

    /// Append a finished session. Returns the row id.
    pub fn log_session(
        &self,
        mode: Mode,
        duration_ms: u64,
        start_at: DateTime<Utc>,
        end_at: DateTime<Utc>,
    ) -> Result<i64, DatabaseError> {
        self.conn.execute(
            "INSERT INTO sessions (mode, duration_ms, start_at, end_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                mode.as_str(),
                duration_ms,
                timestamp(start_at),
                timestamp(end_at),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Most recent sessions first.
    pub fn recent_sessions(&self, limit: usize) -> Result<Vec<SessionLog>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, mode, duration_ms, start_at, end_at
             FROM sessions ORDER BY end_at DESC, id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, u64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut sessions = Vec::new();
        for row in rows {
            let (id, mode, duration_ms, start_at, end_at) = row?;
            sessions.push(SessionLog {
                id,
                mode: mode.parse::<Mode>().map_err(|message| DatabaseError::CorruptValue {
                    key: format!("sessions.{id}.mode"),
                    message,
                })?,
                duration_ms,
                start_at: parse_timestamp(&start_at, id)?,
                end_at: parse_timestamp(&end_at, id)?,
            });
        }
        Ok(sessions)
    }

    // ── Daily stats ─────────────────────────────────────────────────

    /// Add one session to `day`'s totals in a single transaction.
    ///
    /// Work adds a cycle plus focus time; breaks only add break time.
    pub fn increment_daily_stats(
        &self,
        on_work: bool,
        duration_ms: u64,
        day: NaiveDate,
    ) -> Result<DailyStats, DatabaseError> {
        let (cycles, focus_ms, break_ms) = if on_work {
            (1u32, duration_ms, 0u64)
        } else {
            (0u32, 0u64, duration_ms)
        };

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO daily_stats (day, cycles, focus_ms, break_ms, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(day) DO UPDATE SET
                cycles = cycles + excluded.cycles,
                focus_ms = focus_ms + excluded.focus_ms,
                break_ms = break_ms + excluded.break_ms,
                updated_at = excluded.updated_at",
            params![
                day_key(day),
                cycles,
                focus_ms,
                break_ms,
                timestamp(Utc::now())
            ],
        )?;
        let stats = query_day(&tx, day)?.unwrap_or_else(|| DailyStats::empty(day));
        tx.commit()?;
        Ok(stats)
    }

    /// Totals for `day`; zeros when nothing was recorded.
    pub fn daily_stats(&self, day: NaiveDate) -> Result<DailyStats, DatabaseError> {
        Ok(query_day(&self.conn, day)?.unwrap_or_else(|| DailyStats::empty(day)))
    }

    pub fn daily_stats_today(&self) -> Result<DailyStats, DatabaseError> {
        self.daily_stats(Local::now().date_naive())
    }

    /// Recorded days in `[from, to]`, oldest first. Days without data are skipped.
    pub fn daily_stats_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyStats>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT day, cycles, focus_ms, break_ms FROM daily_stats
             WHERE day BETWEEN ?1 AND ?2 ORDER BY day",
        )?;
        let rows = stmt.query_map(params![day_key(from), day_key(to)], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, u32>(1)?,
                row.get::<_, u64>(2)?,
                row.get::<_, u64>(3)?,
            ))
        })?;

        let mut days = Vec::new();
        for row in rows {
            let (key, cycles, focus_ms, break_ms) = row?;
            let day = NaiveDate::parse_from_str(&key, "%Y-%m-%d").map_err(|e| {
                DatabaseError::CorruptValue {
                    key: format!("daily_stats.{key}"),
                    message: e.to_string(),
                }
            })?;
            days.push(DailyStats {
                day,
                cycles,
                focus_ms,
                break_ms,
            });
        }
        Ok(days)
    }

    // ── Goals ───────────────────────────────────────────────────────

    pub fn goals(&self) -> Result<Goals, DatabaseError> {
        match self.kv_get(GOALS_KEY)? {
            Some(json) => serde_json::from_str(&json).map_err(|e| DatabaseError::CorruptValue {
                key: GOALS_KEY.into(),
                message: e.to_string(),
            }),
            None => Ok(Goals::default()),
        }
    }

    pub fn save_goals(&self, goals: &Goals) -> Result<(), DatabaseError> {
        let json = serde_json::to_string(goals).map_err(|e| DatabaseError::CorruptValue {
            key: GOALS_KEY.into(),
            message: e.to_string(),
        })?;
        self.kv_set(GOALS_KEY, &json)
    }

    pub fn goal_progress(&self, day: NaiveDate) -> Result<GoalProgress, DatabaseError> {
        Ok(GoalProgress::new(&self.daily_stats(day)?, &self.goals()?))
    }

    // ── Key-value store ─────────────────────────────────────────────

    pub fn kv_get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}

fn query_day(conn: &Connection, day: NaiveDate) -> Result<Option<DailyStats>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT cycles, focus_ms, break_ms FROM daily_stats WHERE day = ?1",
            params![day_key(day)],
            |row| {
                Ok(DailyStats {
                    day,
                    cycles: row.get(0)?,
                    focus_ms: row.get(1)?,
                    break_ms: row.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(row)
}

/// Fixed-width so stored timestamps sort lexically.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(raw: &str, id: i64) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| DatabaseError::CorruptValue {
            key: format!("sessions.{id}"),
            message: e.to_string(),
        })
}
