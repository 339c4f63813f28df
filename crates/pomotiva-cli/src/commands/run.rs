//! Interactive foreground timer.
//!
//! Reads one command per line from stdin and prints a status line whenever
//! the session, its minute or the cycle counter changes.

use std::time::Duration;

use clap::Args;
use pomotiva_core::notify::{Alert, NotificationScheduler, Notifier};
use pomotiva_core::timer::{Command, Durations, EngineHandle, EngineRunner, Mode, Observers};
use pomotiva_core::{Config, Database, Preset, Snapshot, StatsRecorder};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

const HELP: &str = "commands: t (toggle), start [work|short|long], pause, resume, next, \
reset, mode work|short|long, preset NAME, durations W S L, status, help, quit";

#[derive(Args)]
pub struct RunArgs {
    /// Use a built-in preset instead of the configured durations
    #[arg(long, conflicts_with_all = ["work", "short", "long"])]
    preset: Option<Preset>,
    /// Work minutes
    #[arg(long)]
    work: Option<u32>,
    /// Short break minutes
    #[arg(long)]
    short: Option<u32>,
    /// Long break minutes
    #[arg(long)]
    long: Option<u32>,
    /// Disable end-of-session alerts
    #[arg(long)]
    no_notify: bool,
}

/// What a line of input asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Input {
    Engine(Command),
    Status,
    Help,
    Quit,
}

fn parse_mode(word: Option<&str>) -> Result<Mode, String> {
    word.ok_or_else(|| "missing mode (work, short or long)".to_string())?
        .parse()
}

fn parse_input(line: &str) -> Result<Input, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(Input::Engine(Command::ToggleStartPause));
    };

    let input = match verb.to_ascii_lowercase().as_str() {
        "t" | "toggle" => Input::Engine(Command::ToggleStartPause),
        "start" | "s" => match words.next() {
            Some(word) => Input::Engine(Command::Start(parse_mode(Some(word))?)),
            None => Input::Engine(Command::Start(Mode::Work)),
        },
        "pause" | "p" => Input::Engine(Command::Pause),
        "resume" => Input::Engine(Command::Resume),
        "next" | "n" | "skip" => Input::Engine(Command::Next),
        "reset" | "r" => Input::Engine(Command::Reset),
        "mode" | "m" => Input::Engine(Command::SelectMode(parse_mode(words.next())?)),
        "preset" => {
            let preset: Preset = words.next().ok_or("missing preset name")?.parse()?;
            Input::Engine(Command::SetDurations(preset.durations()))
        }
        "durations" | "d" => {
            let mut minutes = [0u32; 3];
            for slot in &mut minutes {
                let word = words.next().ok_or("usage: durations WORK SHORT LONG")?;
                *slot = word
                    .parse()
                    .map_err(|_| format!("'{word}' is not a number of minutes"))?;
            }
            let [work, short, long] = minutes;
            Input::Engine(Command::SetDurations(Durations::new(work, short, long)))
        }
        "status" => Input::Status,
        "help" | "h" | "?" => Input::Help,
        "quit" | "q" | "exit" => Input::Quit,
        other => return Err(format!("unknown command '{other}' (try 'help')")),
    };

    if words.next().is_some() {
        return Err(format!("too many arguments for '{verb}'"));
    }
    Ok(input)
}

fn render(snap: &Snapshot) -> String {
    format!(
        "[{}] {}  cycle {}",
        snap.state.label().to_uppercase(),
        snap.clock_face(),
        snap.cycle_count
    )
}

fn resolve_durations(config: &Config, args: &RunArgs) -> Durations {
    if let Some(preset) = args.preset {
        return preset.durations();
    }
    let base = config.durations();
    Durations::new(
        args.work.unwrap_or(base.work_min()),
        args.short.unwrap_or(base.short_break_min()),
        args.long.unwrap_or(base.long_break_min()),
    )
}

/// Prints alerts on stdout, optionally ringing the terminal bell.
struct TerminalNotifier {
    bell: bool,
}

impl Notifier for TerminalNotifier {
    fn notify(&self, alert: &Alert) {
        let bell = if self.bell { "\x07" } else { "" };
        println!("{bell}>> {}", alert.message);
    }
}

pub fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let durations = resolve_durations(&config, &args);
    let notify = config.notifications.enabled && !args.no_notify;
    let db = Database::open()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let bell = notify.then_some(config.notifications.bell);
    let result = runtime.block_on(foreground(durations, &db, bell));
    // A pending stdin read would otherwise hold the runtime open.
    runtime.shutdown_timeout(Duration::from_millis(100));
    result
}

async fn foreground(
    durations: Durations,
    db: &Database,
    bell: Option<bool>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (runner, handle) = EngineRunner::new(durations);
    let observers = runner.observers();

    if let Some(bell) = bell {
        let scheduler = NotificationScheduler::new(TerminalNotifier { bell });
        tokio::spawn(scheduler.watch(observers.clone()));
    }
    tokio::spawn(render_loop(observers.clone()));
    tokio::spawn(read_input(handle, observers));

    println!("{HELP}");
    let recorder = StatsRecorder::new(db);
    let last = runner
        .run(|event| {
            debug!(?event, "engine event");
            if let Err(e) = recorder.record(event) {
                warn!(error = %e, "failed to record stats");
            }
        })
        .await;

    println!("stopped at {}", render(&last));
    Ok(())
}

/// Print a line whenever the state, the minute shown or the cycle changes.
async fn render_loop(mut observers: Observers) {
    let mut shown: Option<(Snapshot, u64)> = None;
    loop {
        let snap = observers.snapshot();
        let minute = snap.remaining_ms / 60_000;
        let changed = match shown {
            Some((prev, prev_minute)) => {
                prev.state != snap.state
                    || prev.running != snap.running
                    || prev.cycle_count != snap.cycle_count
                    || prev.total_ms != snap.total_ms
                    || prev_minute != minute
            }
            None => true,
        };
        if changed {
            println!("{}", render(&snap));
            shown = Some((snap, minute));
        }

        let alive = tokio::select! {
            r = observers.state.changed() => r.is_ok(),
            r = observers.running.changed() => r.is_ok(),
            r = observers.remaining_ms.changed() => r.is_ok(),
            r = observers.cycle_count.changed() => r.is_ok(),
            r = observers.total_ms.changed() => r.is_ok(),
        };
        if !alive {
            break;
        }
    }
}

async fn read_input(handle: EngineHandle, observers: Observers) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "stdin closed");
                break;
            }
        };
        match parse_input(&line) {
            Ok(Input::Engine(command)) => {
                if !handle.send(command) {
                    return;
                }
            }
            Ok(Input::Status) => {
                let snap = observers.snapshot();
                println!("{}  ({:.0}%)", render(&snap), snap.progress() * 100.0);
            }
            Ok(Input::Help) => println!("{HELP}"),
            Ok(Input::Quit) => break,
            Err(message) => eprintln!("{message}"),
        }
    }
    handle.shutdown();
}
