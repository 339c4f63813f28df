use chrono::{Duration, Local, NaiveDate};
use clap::Subcommand;
use pomotiva_core::storage::Database;

#[derive(Subcommand)]
pub enum StatsAction {
    /// Today's totals
    Today,
    /// Totals for one day
    Day {
        /// Date as YYYY-MM-DD
        date: NaiveDate,
    },
    /// Recorded days over the last N days, oldest first
    Range {
        #[arg(long, default_value = "7")]
        days: u32,
    },
    /// Most recent finished sessions
    Sessions {
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// Today's totals against the daily goals
    Progress,
}

pub fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let today = Local::now().date_naive();

    match action {
        StatsAction::Today => {
            let stats = db.daily_stats_today()?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        StatsAction::Day { date } => {
            let stats = db.daily_stats(date)?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        StatsAction::Range { days } => {
            let from = today - Duration::days(i64::from(days.max(1)) - 1);
            let stats = db.daily_stats_range(from, today)?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        StatsAction::Sessions { limit } => {
            let sessions = db.recent_sessions(limit)?;
            println!("{}", serde_json::to_string_pretty(&sessions)?);
        }
        StatsAction::Progress => {
            let progress = db.goal_progress(today)?;
            println!("{}", serde_json::to_string_pretty(&progress)?);
        }
    }
    Ok(())
}
