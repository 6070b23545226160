//! CLI arguments and subcommands for hostmon.
//!
//! This module defines the command-line interface structure using the clap library,
//! including all flags, options, and subcommands.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::rank::SortKey;

/// Log level options for CLI parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Configuration format options for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "hostmon",
    about = "Periodic host performance monitor with text and JSON reports",
    long_about = "Periodic host performance monitor with text and JSON reports.\n\n\
                  Samples CPU, memory, disk, network, battery, and temperature metrics \
                  from /proc and /sys, computes rates from counter deltas, and renders \
                  one report per tick in text, JSON, or newline-delimited JSON.",
    version = "0.1.0",
    propagate_version = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Emit the report as pretty-printed JSON instead of text
    #[arg(short = 'j', long)]
    pub json: bool,

    /// Emit one JSON object per line (newline-delimited JSON)
    #[arg(long)]
    pub ndjson: bool,

    /// Write reports to this file instead of stdout
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Keep sampling until interrupted
    #[arg(long)]
    pub continuous: bool,

    /// Seconds between samples in continuous mode
    #[arg(short = 'i', long)]
    pub interval: Option<u64>,

    /// Stop continuous mode after this many seconds
    #[arg(long)]
    pub duration: Option<u64>,

    /// Probe CPU temperature (may invoke lm-sensors)
    #[arg(long)]
    pub temps: bool,

    /// Skip the per-process table
    #[arg(long)]
    pub no_processes: bool,

    /// Skip disk I/O counters and rates
    #[arg(long)]
    pub no_disk_io: bool,

    /// Skip the battery section
    #[arg(long)]
    pub no_battery: bool,

    /// Do not clear the terminal between continuous text reports
    #[arg(long)]
    pub no_clear: bool,

    /// Compact process table formatting
    #[arg(long)]
    pub compact: bool,

    /// Number of processes in the ranked view
    #[arg(long)]
    pub top: Option<usize>,

    /// Process ranking metric
    #[arg(long, value_enum)]
    pub sort_by: Option<SortKey>,

    /// Maximum number of processes to scan per tick
    #[arg(long)]
    pub max_processes: Option<usize>,

    /// Parallel processing threads (0 = auto)
    #[arg(long)]
    pub parallelism: Option<usize>,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,
}

/// Subcommands for additional functionality
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate metric sources and system requirements
    Check {
        /// Check /proc and /sys filesystems
        #[arg(long)]
        proc: bool,

        /// Check the temperature probe
        #[arg(long)]
        sensors: bool,

        /// Check all system requirements
        #[arg(long)]
        all: bool,
    },

    /// Generate configuration files
    Config {
        /// Output file path
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: ConfigFormat,

        /// Include comments and examples
        #[arg(long)]
        commented: bool,
    },

    /// Test metrics collection
    Test {
        /// Number of test iterations
        #[arg(short = 'n', long, default_value_t = 3)]
        iterations: usize,

        /// Show each snapshot as it is taken
        #[arg(long)]
        verbose: bool,
    },
}
