use clap::Subcommand;
use pomotiva_core::{Config, Preset};

#[derive(Subcommand)]
pub enum PresetAction {
    /// List the built-in presets
    List,
    /// Save a built-in preset as the configured durations
    Apply {
        /// beginner, standard, focus or immersion
        name: Preset,
    },
    /// Save custom work and short-break lengths (long break stays 15 min)
    Custom {
        #[arg(long)]
        work: u32,
        #[arg(long)]
        short: u32,
    },
}

pub fn run(action: PresetAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        PresetAction::List => {
            let current = Config::load()?.durations();
            for preset in Preset::ALL {
                let marker = if preset.durations() == current { "*" } else { " " };
                println!("{marker} {preset}");
            }
        }
        PresetAction::Apply { name } => save(name)?,
        PresetAction::Custom { work, short } => save(Preset::Custom {
            work_min: work,
            short_break_min: short,
        })?,
    }
    Ok(())
}

fn save(preset: Preset) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::load()?;
    config.apply_preset(preset);
    config.save()?;
    println!("durations set to {preset}");
    Ok(())
}
