//! Configuration loading and resolution.
//!
//! Precedence: CLI flags > config file > built-in defaults. Config files
//! may be YAML, JSON, or TOML; default locations are tried when no path is
//! given.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::cli::Args;
use crate::rank::SortKey;
use crate::sampler::{SamplerOptions, Tuning};

pub const DEFAULT_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_TOP_N: usize = 10;
pub const DEFAULT_TEMP_REFRESH_SECS: u64 = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Sampling loop
    pub interval: Option<u64>,
    pub duration: Option<u64>,

    // Process view
    pub top: Option<usize>,
    #[serde(alias = "sort-by")]
    pub sort_by: Option<String>,
    pub max_processes: Option<usize>,
    pub parallelism: Option<usize>,

    // Section toggles
    #[serde(alias = "enable-processes")]
    pub enable_processes: Option<bool>,
    #[serde(alias = "enable-disk-io")]
    pub enable_disk_io: Option<bool>,
    #[serde(alias = "enable-battery")]
    pub enable_battery: Option<bool>,
    #[serde(alias = "enable-temps")]
    pub enable_temps: Option<bool>,
    #[serde(alias = "temp-refresh-seconds")]
    pub temp_refresh_seconds: Option<u64>,

    // Output
    pub out: Option<PathBuf>,
    pub compact: Option<bool>,
    #[serde(alias = "clear-screen")]
    pub clear_screen: Option<bool>,

    // Logging
    #[serde(alias = "log-level")]
    pub log_level: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interval: Some(DEFAULT_INTERVAL_SECS),
            duration: None,
            top: Some(DEFAULT_TOP_N),
            sort_by: Some("cpu".into()),
            max_processes: None,
            parallelism: None,
            enable_processes: Some(true),
            enable_disk_io: Some(true),
            enable_battery: Some(true),
            enable_temps: Some(false),
            temp_refresh_seconds: Some(DEFAULT_TEMP_REFRESH_SECS),
            out: None,
            compact: Some(false),
            clear_screen: Some(true),
            log_level: Some("info".into()),
        }
    }
}

impl Config {
    pub fn interval_secs(&self) -> u64 {
        self.interval.unwrap_or(DEFAULT_INTERVAL_SECS)
    }

    pub fn top_n(&self) -> usize {
        self.top.unwrap_or(DEFAULT_TOP_N)
    }

    /// Unrecognized selectors fall back to the CPU default.
    pub fn sort_key(&self) -> SortKey {
        self.sort_by
            .as_deref()
            .map(SortKey::parse_or_default)
            .unwrap_or_default()
    }

    pub fn temp_refresh_secs(&self) -> u64 {
        self.temp_refresh_seconds
            .unwrap_or(DEFAULT_TEMP_REFRESH_SECS)
    }

    /// Section toggles and ranking settings for the sampler.
    pub fn sampler_options(&self) -> SamplerOptions {
        SamplerOptions {
            include_processes: self.enable_processes.unwrap_or(true),
            top_n: self.top_n(),
            sort_by: self.sort_key(),
            include_battery: self.enable_battery.unwrap_or(true),
            include_disk_io: self.enable_disk_io.unwrap_or(true),
            enable_temps: self.enable_temps.unwrap_or(false),
        }
    }

    /// Sampler timings with the configured temperature cache TTL applied.
    pub fn sampler_tuning(&self) -> Tuning {
        Tuning {
            temp_ttl: Duration::from_secs(self.temp_refresh_secs()),
            ..Tuning::default()
        }
    }
}

/// Validate effective config (used by --check-config and at startup).
pub fn validate_effective_config(cfg: &Config) -> Result<()> {
    if cfg.interval_secs() == 0 {
        bail!("interval must be at least 1 second");
    }
    if let Some(0) = cfg.duration {
        bail!("duration must be greater than 0 when set");
    }
    if cfg.temp_refresh_secs() == 0 {
        bail!("temp_refresh_seconds must be at least 1");
    }
    Ok(())
}

/// Loads config from an explicit path or the first default location found.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let defaults = [
                "/etc/hostmon/hostmon.yaml",
                "/etc/hostmon/hostmon.yml",
                "/etc/hostmon/hostmon.json",
                "./hostmon.yaml",
                "./hostmon.yml",
                "./hostmon.json",
            ];
            match defaults.iter().find(|p| Path::new(p).exists()) {
                Some(p) => PathBuf::from(p),
                None => return Ok(Config::default()),
            }
        }
    };

    let content = fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;

    let config = match path.extension().and_then(|s| s.to_str()) {
        Some("json") => serde_json::from_str(&content)
            .with_context(|| format!("invalid JSON config {}", path.display()))?,
        Some("toml") => toml::from_str(&content)
            .with_context(|| format!("invalid TOML config {}", path.display()))?,
        _ => serde_yaml::from_str(&content)
            .with_context(|| format!("invalid YAML config {}", path.display()))?,
    };
    info!("Loaded configuration from: {}", path.display());
    Ok(config)
}

/// Merges CLI arguments over the loaded (or default) config.
pub fn resolve_config(args: &Args) -> Result<Config> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };

    if let Some(interval) = args.interval {
        config.interval = Some(interval);
    }
    if let Some(duration) = args.duration {
        config.duration = Some(duration);
    }
    if let Some(top) = args.top {
        config.top = Some(top);
    }
    if let Some(sort_by) = args.sort_by {
        config.sort_by = Some(
            match sort_by {
                SortKey::Cpu => "cpu",
                SortKey::Memory => "memory",
            }
            .into(),
        );
    }
    if let Some(max) = args.max_processes {
        config.max_processes = Some(max);
    }
    if let Some(threads) = args.parallelism {
        config.parallelism = Some(threads);
    }
    if let Some(out) = &args.out {
        config.out = Some(out.clone());
    }

    // Disabling flags only ever tighten the config.
    if args.no_processes {
        config.enable_processes = Some(false);
    }
    if args.no_disk_io {
        config.enable_disk_io = Some(false);
    }
    if args.no_battery {
        config.enable_battery = Some(false);
    }
    if args.temps {
        config.enable_temps = Some(true);
    }
    if args.no_clear {
        config.clear_screen = Some(false);
    }
    if args.compact {
        config.compact = Some(true);
    }

    Ok(config)
}

/// Serializes the effective config in the requested format.
pub fn render_config(config: &Config, format: crate::cli::ConfigFormat) -> Result<String> {
    use crate::cli::ConfigFormat;
    Ok(match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    })
}

/// Adds the explanatory header used by `hostmon config --commented`.
pub fn add_config_comments(yaml: String) -> String {
    let comments = r#"# hostmon configuration
# =====================
#
# Sampling Loop
# -------------
# interval: 5                  # Seconds between samples in continuous mode
# duration: null               # Stop after N seconds (null = run until interrupted)
#
# Process View
# ------------
# top: 10                      # Number of processes in the ranked view
# sort_by: "cpu"               # cpu or memory
# max_processes: null          # Cap on processes scanned per tick
# parallelism: null            # Process-scan threads (null = auto)
#
# Section Toggles
# ---------------
# enable_processes: true       # Collect and rank the process table
# enable_disk_io: true         # Disk I/O totals and rates
# enable_battery: true         # Battery section (absent hardware reports nothing)
# enable_temps: false          # CPU temperature probe (may require lm-sensors)
# temp_refresh_seconds: 5      # Temperature probe cache TTL
#
# Output
# ------
# out: null                    # Write reports to this file (appends in continuous mode)
# compact: false               # Compact process table formatting
# clear_screen: true           # Clear the terminal between continuous text reports
#
# Logging
# -------
# log_level: "info"            # off, error, warn, info, debug, trace
"#;

    format!("{comments}\n{yaml}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_effective_config(&Config::default()).is_ok());
    }

    #[test]
    fn zero_interval_is_rejected() {
        let cfg = Config {
            interval: Some(0),
            ..Default::default()
        };
        assert!(validate_effective_config(&cfg).is_err());
    }

    #[test]
    fn zero_duration_is_rejected() {
        let cfg = Config {
            duration: Some(0),
            ..Default::default()
        };
        assert!(validate_effective_config(&cfg).is_err());
    }

    #[test]
    fn cli_overrides_config_defaults() {
        let args = Args::parse_from([
            "hostmon",
            "--no-config",
            "--interval",
            "2",
            "--top",
            "3",
            "--sort-by",
            "memory",
            "--no-battery",
            "--temps",
        ]);
        let cfg = resolve_config(&args).unwrap();
        assert_eq!(cfg.interval_secs(), 2);
        assert_eq!(cfg.top_n(), 3);
        assert_eq!(cfg.sort_key(), SortKey::Memory);
        assert_eq!(cfg.enable_battery, Some(false));
        assert_eq!(cfg.enable_temps, Some(true));
    }

    #[test]
    fn unrecognized_sort_selector_falls_back_to_cpu() {
        let cfg = Config {
            sort_by: Some("bogus".into()),
            ..Default::default()
        };
        assert_eq!(cfg.sort_key(), SortKey::Cpu);
    }

    #[test]
    fn loads_yaml_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hostmon.yaml");
        fs::write(&path, "interval: 9\nsort-by: memory\ntop: 4\n").unwrap();

        let cfg = load_config(Some(&path)).unwrap();
        assert_eq!(cfg.interval, Some(9));
        assert_eq!(cfg.sort_key(), SortKey::Memory);
        assert_eq!(cfg.top, Some(4));
    }

    #[test]
    fn loads_toml_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hostmon.toml");
        fs::write(&path, "interval = 7\nenable_temps = true\n").unwrap();

        let cfg = load_config(Some(&path)).unwrap();
        assert_eq!(cfg.interval, Some(7));
        assert_eq!(cfg.enable_temps, Some(true));
    }

    #[test]
    fn config_roundtrips_through_all_formats() {
        use crate::cli::ConfigFormat;
        let cfg = Config::default();
        for format in [ConfigFormat::Yaml, ConfigFormat::Json, ConfigFormat::Toml] {
            assert!(!render_config(&cfg, format).unwrap().is_empty());
        }
    }
}
