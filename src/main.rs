//! hostmon - periodic host performance monitor.
//!
//! Samples CPU, memory, disk, network, battery, and temperature metrics
//! from /proc and /sys, computes rates from counter deltas, and renders
//! one report per tick in text, JSON, or newline-delimited JSON.

mod cli;
mod commands;
mod config;
mod priming;
mod probe;
mod rank;
mod rate;
mod render;
mod sampler;
mod snapshot;
mod source;

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::signal;
use tokio::time::interval;
use tracing::{debug, error, info};
use tracing_subscriber::filter::LevelFilter;

use cli::{Args, Commands, LogLevel};
use commands::{command_check, command_config, command_test};
use config::{render_config, resolve_config, validate_effective_config, Config};
use render::render_report;
use sampler::Sampler;
use snapshot::Snapshot;
use source::ProcSource;

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// Report serialization for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
    Ndjson,
}

impl OutputFormat {
    fn from_args(args: &Args) -> Self {
        if args.ndjson {
            OutputFormat::Ndjson
        } else if args.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

/// Writes one rendered report per tick to stdout or a file.
///
/// Continuous-mode file output always appends, so successive runs
/// accumulate into an existing file. A one-shot run truncates and leaves
/// exactly one report.
struct Emitter {
    format: OutputFormat,
    compact: bool,
    clear_screen: bool,
    out: Option<PathBuf>,
    continuous: bool,
    wrote_once: bool,
}

impl Emitter {
    fn new(format: OutputFormat, config: &Config, continuous: bool) -> Self {
        Self {
            format,
            compact: config.compact.unwrap_or(false),
            clear_screen: continuous
                && format == OutputFormat::Text
                && config.clear_screen.unwrap_or(true),
            out: config.out.clone(),
            continuous,
            wrote_once: false,
        }
    }

    fn emit(&mut self, snapshot: &Snapshot) -> Result<()> {
        let body = match self.format {
            OutputFormat::Text => render_report(snapshot, self.compact),
            OutputFormat::Json => {
                let mut s = serde_json::to_string_pretty(snapshot)?;
                s.push('\n');
                s
            }
            OutputFormat::Ndjson => {
                let mut s = serde_json::to_string(snapshot)?;
                s.push('\n');
                s
            }
        };

        match &self.out {
            Some(path) => {
                let mut opts = OpenOptions::new();
                opts.create(true);
                if self.continuous || self.wrote_once {
                    opts.append(true);
                } else {
                    opts.write(true).truncate(true);
                }
                let mut file = opts
                    .open(path)
                    .with_context(|| format!("failed to open output file {}", path.display()))?;
                file.write_all(body.as_bytes())?;
            }
            None => {
                let stdout = std::io::stdout();
                let mut lock = stdout.lock();
                if self.clear_screen {
                    lock.write_all(CLEAR_SCREEN.as_bytes())?;
                }
                lock.write_all(body.as_bytes())?;
                lock.flush()?;
            }
        }
        self.wrote_once = true;
        Ok(())
    }
}

/// Initializes tracing logging subsystem with configured log level
fn setup_logging(args: &Args) {
    let log_level = match args.log_level {
        LogLevel::Off => LevelFilter::OFF,
        LogLevel::Error => LevelFilter::ERROR,
        LogLevel::Warn => LevelFilter::WARN,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Trace => LevelFilter::TRACE,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("Failed to set tracing subscriber");
    }

    debug!("Logging initialized with level: {:?}", args.log_level);
}

/// Resolves when SIGINT or SIGTERM arrives.
async fn shutdown_signal() {
    let ctrl_c = async {
        if signal::ctrl_c().await.is_err() {
            error!("Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), shutting down gracefully...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Early config resolution for show/check modes
    if args.show_config || args.check_config {
        let config = resolve_config(&args)?;

        if args.check_config {
            if let Err(e) = validate_effective_config(&config) {
                eprintln!("❌ Configuration invalid: {}", e);
                std::process::exit(1);
            }
            println!("✅ Configuration is valid");
            return Ok(());
        }

        print!("{}", render_config(&config, args.config_format)?);
        return Ok(());
    }

    // Handle subcommands
    if let Some(command) = &args.command {
        let config = resolve_config(&args)?;
        if let Err(e) = validate_effective_config(&config) {
            eprintln!("❌ Configuration invalid: {}", e);
            std::process::exit(1);
        }

        return match command {
            Commands::Check { proc, sensors, all } => command_check(*proc, *sensors, *all, &config),
            Commands::Config {
                output,
                format,
                commented,
            } => command_config(output.clone(), *format, *commented),
            Commands::Test {
                iterations,
                verbose,
            } => command_test(*iterations, *verbose, &config),
        };
    }

    // Load configuration for sampling mode
    let config = resolve_config(&args)?;
    if let Err(e) = validate_effective_config(&config) {
        eprintln!("❌ Configuration invalid: {}", e);
        std::process::exit(1);
    }

    setup_logging(&args);
    info!("Starting hostmon");

    // Configure parallel processing thread pool if specified
    if let Some(threads) = config.parallelism {
        if threads > 0 {
            rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build_global()
                .unwrap_or_else(|e| error!("Failed to set rayon thread pool: {}", e));
            debug!("Rayon thread pool configured with {} threads", threads);
        }
    }

    let source = ProcSource::new(config.max_processes);
    let mut sampler =
        Sampler::with_tuning(source, config.sampler_options(), config.sampler_tuning());
    let mut emitter = Emitter::new(OutputFormat::from_args(&args), &config, args.continuous);

    if !args.continuous {
        let snapshot = sampler.sample();
        emitter.emit(&snapshot)?;
        return Ok(());
    }

    let tick_every = Duration::from_secs(config.interval_secs());
    let deadline = config
        .duration
        .map(|secs| Instant::now() + Duration::from_secs(secs));
    info!(
        "Sampling every {}s{}",
        config.interval_secs(),
        config
            .duration
            .map(|d| format!(" for {d}s"))
            .unwrap_or_default()
    );

    let mut ticker = interval(tick_every);
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let snapshot = sampler.sample();
                if let Err(e) = emitter.emit(&snapshot) {
                    error!("Failed to emit report: {}", e);
                }
                if let Some(deadline) = deadline {
                    if Instant::now() >= deadline {
                        info!("Configured duration elapsed, stopping");
                        break;
                    }
                }
            }
            _ = &mut shutdown => {
                break;
            }
        }
    }

    Ok(())
}
