use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "pomotiva", version, about = "Pomotiva pomodoro timer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the timer in the foreground
    Run(commands::run::RunArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Duration presets
    Preset {
        #[command(subcommand)]
        action: commands::preset::PresetAction,
    },
    /// Session statistics
    Stats {
        #[command(subcommand)]
        action: commands::stats::StatsAction,
    },
    /// Daily goals
    Goals {
        #[command(subcommand)]
        action: commands::goals::GoalsAction,
    },
    /// Daily/weekly/monthly/yearly goals and tasks
    Period {
        #[command(subcommand)]
        action: commands::period::PeriodAction,
    },
}

/// Logs go to stderr so stdout stays clean for JSON output.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("POMOTIVA_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run(args) => commands::run::run(args),
        Commands::Config { action } => commands::config::run(action),
        Commands::Preset { action } => commands::preset::run(action),
        Commands::Stats { action } => commands::stats::run(action),
        Commands::Goals { action } => commands::goals::run(action),
        Commands::Period { action } => commands::period::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
