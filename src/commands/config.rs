//! Config command implementation.
//!
//! Generates configuration files in YAML, JSON, or TOML.

use anyhow::Result;
use std::fs;
use std::path::PathBuf;

use crate::cli::ConfigFormat;
use crate::config::{add_config_comments, render_config, Config};

/// Generates configuration files.
pub fn command_config(output: Option<PathBuf>, format: ConfigFormat, commented: bool) -> Result<()> {
    let config = Config::default();
    let output = match output {
        Some(path) => path,
        None => PathBuf::from("hostmon.yaml"),
    };

    let mut content = render_config(&config, format)?;
    if commented && format == ConfigFormat::Yaml {
        content = add_config_comments(content);
    }

    if output.to_string_lossy() == "-" {
        print!("{}", content);
    } else {
        fs::write(&output, content)?;
        println!("✅ Configuration written to: {}", output.display());
    }

    Ok(())
}
