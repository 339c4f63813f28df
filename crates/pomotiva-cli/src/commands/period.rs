use clap::Subcommand;
use pomotiva_core::storage::{Database, Period};

#[derive(Subcommand)]
pub enum PeriodAction {
    /// Print the cycle target and tasks of a period
    Show { period: Period },
    /// Set the cycle target of a period
    SetCycles { period: Period, cycles: u32 },
    /// Add a task; prints its key
    AddTask { period: Period, text: String },
    /// Replace the text of a task
    UpdateTask {
        period: Period,
        key: String,
        text: String,
    },
    /// Remove a task
    RemoveTask { period: Period, key: String },
    /// Remove the target and every task of a period
    Delete { period: Period },
}

pub fn run(action: PeriodAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        PeriodAction::Show { period } => {
            let goal = db.fetch_period(period)?;
            println!("{}", serde_json::to_string_pretty(&goal)?);
        }
        PeriodAction::SetCycles { period, cycles } => {
            db.ensure_created_at(period)?;
            db.set_cycles(period, cycles)?;
            println!("ok");
        }
        PeriodAction::AddTask { period, text } => {
            db.ensure_created_at(period)?;
            let key = db.add_task(period, &text)?;
            println!("{key}");
        }
        PeriodAction::UpdateTask { period, key, text } => {
            if !db.update_task(period, &key, &text)? {
                return Err(format!("no {period} task with key {key}").into());
            }
            println!("ok");
        }
        PeriodAction::RemoveTask { period, key } => {
            if !db.remove_task(period, &key)? {
                return Err(format!("no {period} task with key {key}").into());
            }
            println!("ok");
        }
        PeriodAction::Delete { period } => {
            db.delete_period(period)?;
            println!("{period} goals deleted");
        }
    }
    Ok(())
}
