//! Period goals: a cycle target and a task list per day/week/month/year.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};

use super::database::Database;
use crate::error::DatabaseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Period {
    pub const ALL: [Period; 4] = [
        Period::Daily,
        Period::Weekly,
        Period::Monthly,
        Period::Yearly,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Period::Daily => "daily",
            Period::Weekly => "weekly",
            Period::Monthly => "monthly",
            Period::Yearly => "yearly",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" | "day" => Ok(Period::Daily),
            "weekly" | "week" => Ok(Period::Weekly),
            "monthly" | "month" => Ok(Period::Monthly),
            "yearly" | "year" => Ok(Period::Yearly),
            other => Err(format!(
                "unknown period '{other}' (expected daily, weekly, monthly or yearly)"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodTask {
    pub key: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodGoal {
    pub period: Period,
    pub cycles_target: u32,
    pub created_at: Option<DateTime<Utc>>,
    /// In insertion order.
    pub tasks: Vec<PeriodTask>,
}

impl PeriodGoal {
    pub fn empty(period: Period) -> Self {
        Self {
            period,
            cycles_target: 0,
            created_at: None,
            tasks: Vec::new(),
        }
    }
}

impl Database {
    /// Goal for `period`; an untouched period comes back empty.
    pub fn fetch_period(&self, period: Period) -> Result<PeriodGoal, DatabaseError> {
        let row = self
            .conn
            .query_row(
                "SELECT cycles_target, created_at FROM period_goals WHERE period = ?1",
                params![period.as_str()],
                |row| Ok((row.get::<_, u32>(0)?, row.get::<_, Option<String>>(1)?)),
            )
            .optional()?;

        let mut goal = PeriodGoal::empty(period);
        if let Some((cycles_target, created_at)) = row {
            goal.cycles_target = cycles_target;
            goal.created_at = created_at
                .map(|raw| {
                    DateTime::parse_from_rfc3339(&raw)
                        .map(|t| t.with_timezone(&Utc))
                        .map_err(|e| DatabaseError::CorruptValue {
                            key: format!("period_goals.{period}.created_at"),
                            message: e.to_string(),
                        })
                })
                .transpose()?;
        }

        let mut stmt = self
            .conn
            .prepare("SELECT task_key, text FROM period_tasks WHERE period = ?1 ORDER BY seq")?;
        let tasks = stmt.query_map(params![period.as_str()], |row| {
            Ok(PeriodTask {
                key: row.get(0)?,
                text: row.get(1)?,
            })
        })?;
        for task in tasks {
            goal.tasks.push(task?);
        }
        Ok(goal)
    }

    pub fn set_cycles(&self, period: Period, cycles_target: u32) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT INTO period_goals (period, cycles_target) VALUES (?1, ?2)
             ON CONFLICT(period) DO UPDATE SET cycles_target = excluded.cycles_target",
            params![period.as_str(), cycles_target],
        )?;
        Ok(())
    }

    /// Stamp `created_at` the first time a period is used. Later calls keep
    /// the first stamp. Returns the stored value.
    pub fn ensure_created_at(&self, period: Period) -> Result<DateTime<Utc>, DatabaseError> {
        let now = Utc::now();
        self.conn.execute(
            "INSERT INTO period_goals (period, created_at) VALUES (?1, ?2)
             ON CONFLICT(period) DO UPDATE SET
                created_at = COALESCE(created_at, excluded.created_at)",
            params![period.as_str(), now.to_rfc3339()],
        )?;
        Ok(self.fetch_period(period)?.created_at.unwrap_or(now))
    }

    /// Append a task and return its generated key.
    pub fn add_task(&self, period: Period, text: &str) -> Result<String, DatabaseError> {
        let key = uuid::Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO period_tasks (task_key, period, text) VALUES (?1, ?2, ?3)",
            params![key, period.as_str(), text],
        )?;
        Ok(key)
    }

    /// Returns `false` when no task with `key` exists in `period`.
    pub fn update_task(&self, period: Period, key: &str, text: &str) -> Result<bool, DatabaseError> {
        let changed = self.conn.execute(
            "UPDATE period_tasks SET text = ?3 WHERE period = ?1 AND task_key = ?2",
            params![period.as_str(), key, text],
        )?;
        Ok(changed > 0)
    }

    pub fn remove_task(&self, period: Period, key: &str) -> Result<bool, DatabaseError> {
        let removed = self.conn.execute(
            "DELETE FROM period_tasks WHERE period = ?1 AND task_key = ?2",
            params![period.as_str(), key],
        )?;
        Ok(removed > 0)
    }

    /// Drop the target, stamp and every task of `period`.
    pub fn delete_period(&self, period: Period) -> Result<(), DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM period_tasks WHERE period = ?1",
            params![period.as_str()],
        )?;
        tx.execute(
            "DELETE FROM period_goals WHERE period = ?1",
            params![period.as_str()],
        )?;
        tx.commit()?;
        Ok(())
    }
}
