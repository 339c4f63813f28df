use clap::Subcommand;
use pomotiva_core::storage::Database;

#[derive(Subcommand)]
pub enum GoalsAction {
    /// Print the daily goals
    Show,
    /// Change one or both daily goals
    Set {
        /// Cycles per day (0 disables the goal)
        #[arg(long)]
        cycles: Option<u32>,
        /// Focus minutes per day
        #[arg(long)]
        focus_min: Option<u64>,
    },
}

pub fn run(action: GoalsAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        GoalsAction::Show => {
            let goals = db.goals()?;
            println!("{}", serde_json::to_string_pretty(&goals)?);
        }
        GoalsAction::Set { cycles, focus_min } => {
            if cycles.is_none() && focus_min.is_none() {
                return Err("nothing to set (use --cycles and/or --focus-min)".into());
            }
            let mut goals = db.goals()?;
            if let Some(cycles) = cycles {
                goals.daily_cycles_target = cycles;
            }
            if let Some(minutes) = focus_min {
                goals.daily_focus_ms_target = minutes.saturating_mul(60_000);
            }
            db.save_goals(&goals)?;
            println!("{}", serde_json::to_string_pretty(&goals)?);
        }
    }
    Ok(())
}
