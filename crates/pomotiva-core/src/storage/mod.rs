mod config;
pub mod database;
pub mod goals;

pub use config::{Config, DurationsConfig, NotificationsConfig};
pub use database::{day_key, DailyStats, Database, GoalProgress, Goals, SessionLog};
pub use goals::{Period, PeriodGoal, PeriodTask};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/pomotiva[-dev]/` based on POMOTIVA_ENV.
///
/// Set POMOTIVA_ENV=dev to use development data directory, or
/// POMOTIVA_DATA_DIR to point somewhere else entirely.
///
/// # Errors
/// Returns an error if creating the data directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("POMOTIVA_DATA_DIR") {
        Some(custom) if !custom.is_empty() => PathBuf::from(custom),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("POMOTIVA_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("pomotiva-dev")
            } else {
                base_dir.join("pomotiva")
            }
        }
    };

    std::fs::create_dir_all(&dir).map_err(|source| ConfigError::DataDir {
        path: dir.clone(),
        source,
    })?;
    Ok(dir)
}
