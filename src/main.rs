use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::env;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use shakealert::clock::{Clock, SystemClock};
use shakealert::config::{self, Config};
use shakealert::messenger::{self, Messenger};
use shakealert::notifier::{EmergencyNotifier, Notice, NotifyOutcome};
use shakealert::sensor::{ReplaySource, ReplayStats};
use shakealert::store::FileStore;
use shakealert::{detector, phone};

#[derive(Parser)]
#[command(
    name = "shakealert",
    version,
    about = "Send an emergency text message when the device is shaken"
)]
struct Cli {
    /// Config file (defaults to <config dir>/shakealert/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream accelerometer samples (JSON lines) into the shake detector
    Watch {
        /// Sample file, or "-" for stdin
        #[arg(long, short, default_value = "-")]
        input: String,

        /// Pace delivery at the sampling period and debounce on wall-clock time
        #[arg(long)]
        realtime: bool,

        /// Log messages instead of sending them
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate and store the emergency contact number
    SetNumber { number: String },
    /// Print the stored emergency contact number
    ShowNumber,
}

/// One line on stdout per shake event.
#[derive(Debug, Serialize)]
struct ShakeReport {
    shake: u64,
    timestamp: u64,
    outcome: NotifyOutcome,
    #[serde(flatten)]
    notice: Option<Notice>,
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let config = config::load(cli.config.as_deref()).context("failed to load configuration")?;
    let store = FileStore::new(config.storage.resolve_path()?);

    match cli.command {
        Commands::Watch {
            input,
            realtime,
            dry_run,
        } => {
            let reader = open_input(&input)?;
            let source = ReplaySource::new(reader, realtime);
            let clock: Box<dyn Clock> = if realtime {
                Box::new(SystemClock)
            } else {
                Box::new(source.clock())
            };

            let mut messenger_config = config.messenger.clone();
            messenger_config.dry_run |= dry_run;
            let messenger = messenger::from_config(&messenger_config);
            if !messenger.is_available() {
                warn!("no messenger available; shakes will only be reported");
            }

            let notifier = EmergencyNotifier::new(&config.notifier, store, messenger, clock);
            let stats = watch(&config, source, notifier, &mut io::stdout())?;
            info!(
                delivered = stats.delivered,
                skipped = stats.skipped,
                "watch finished"
            );
        }
        Commands::SetNumber { number } => {
            let saved = phone::save_emergency_number(&store, &number)
                .with_context(|| format!("could not set emergency number {number:?}"))?;
            info!(path = %store.path().display(), "emergency number saved");
            println!("{saved}");
        }
        Commands::ShowNumber => match phone::load_emergency_number(&store)? {
            Some(number) => println!("{number}"),
            None => {
                warn!("no emergency number set");
                eprintln!("shakealert: no emergency number set; use `shakealert set-number`");
            }
        },
    }

    Ok(())
}

fn init_logging() {
    let debug_enabled = env::var("SHAKEALERT_DEBUG_LOG")
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false);
    let filter = if debug_enabled {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn open_input(input: &str) -> Result<Box<dyn BufRead + Send>> {
    if input == "-" {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }
    let file = fs_err::File::open(input).context("failed to open sample input")?;
    Ok(Box::new(BufReader::new(file)))
}

/// Run detection over `source` until its input is exhausted, writing one JSON
/// report per shake to `out`.
fn watch(
    config: &Config,
    source: ReplaySource,
    mut notifier: EmergencyNotifier,
    out: &mut impl Write,
) -> Result<ReplayStats> {
    let (tx, rx) = mpsc::channel();
    let sample_clock = source.clock();
    let mut shakes: u64 = 0;

    // Runs on the sensor thread; the listener (and `tx`) is dropped when the
    // input runs out, which ends the loop below.
    let mut subscription = detector::start(source, config.detector.clone(), move || {
        shakes += 1;
        let outcome = notifier.on_shake();
        let _ = tx.send(ShakeReport {
            shake: shakes,
            timestamp: sample_clock.now_ms(),
            outcome,
            notice: outcome.notice(),
        });
    })
    .context("failed to start shake detection")?;

    info!("waiting for shakes... (ctrl+c to quit)");

    while let Ok(report) = rx.recv() {
        serde_json::to_writer(&mut *out, &report)?;
        writeln!(out)?;
        out.flush()?;
    }

    let stats = subscription.source_mut().join().unwrap_or_default();
    subscription.stop();
    Ok(stats)
}
