//! Check command implementation.
//!
//! Validates that the metric sources hostmon reads are accessible on this
//! host before the sampling loop is started for real.

use anyhow::Result;
use std::path::Path;
use std::time::Duration;

use crate::config::{validate_effective_config, Config};
use crate::source::{ProcSource, SnapshotSource};

/// Validates metric sources and configuration.
pub fn command_check(proc: bool, sensors: bool, all: bool, config: &Config) -> Result<()> {
    println!("🔍 hostmon - System Check");
    println!("=========================");

    let mut all_ok = true;
    let source = ProcSource::new(Some(5));

    // Check /proc filesystem
    if proc || all {
        println!("\n📁 Checking /proc filesystem...");
        if Path::new("/proc").exists() {
            println!("   ✅ /proc filesystem accessible");

            if source.uptime_seconds().is_some() {
                println!("   ✅ /proc/uptime readable");
            } else {
                println!("   ❌ Cannot read /proc/uptime");
                all_ok = false;
            }
            if source.cpu_counters().is_some() {
                println!("   ✅ /proc/stat readable");
            } else {
                println!("   ❌ Cannot read /proc/stat");
                all_ok = false;
            }
            if source.memory_counters().is_some() {
                println!("   ✅ /proc/meminfo readable");
            } else {
                println!("   ❌ Cannot read /proc/meminfo");
                all_ok = false;
            }
            match source.net_counters() {
                Some(_) => println!("   ✅ /proc/net/dev readable"),
                None => println!("   ⚠️  Cannot read /proc/net/dev"),
            }
            match source.disk_counters() {
                Some(_) => println!("   ✅ /proc/diskstats readable"),
                None => println!("   ⚠️  Cannot read /proc/diskstats"),
            }
        } else {
            println!("   ❌ /proc filesystem not found");
            all_ok = false;
        }

        println!("\n🔌 Checking /sys filesystem...");
        if Path::new("/sys/class").exists() {
            println!("   ✅ /sys/class accessible");
            if Path::new("/sys/class/power_supply").exists() {
                match source.battery() {
                    Some(state) => println!("   ✅ Battery detected ({}%)", state.percent),
                    None => println!("   ℹ️  No battery detected (fine on desktops/servers)"),
                }
            }
        } else {
            println!("   ⚠️  /sys/class not found, battery and thermal fallback unavailable");
        }
    }

    // Check the temperature probe
    if sensors || all {
        println!("\n🌡️  Checking temperature probe...");
        match source.cpu_temperature(Duration::from_secs(3)) {
            Some(temp) => println!("   ✅ CPU temperature readable: {temp}°C"),
            None => {
                println!("   ⚠️  No CPU temperature source found");
                println!("      (install lm-sensors or expose /sys/class/thermal zones)");
            }
        }
    }

    // Check configuration
    println!("\n⚙️  Checking configuration...");
    match validate_effective_config(config) {
        Ok(_) => {
            println!("   ✅ Configuration is valid");
        }
        Err(e) => {
            println!("   ❌ Configuration invalid: {}", e);
            all_ok = false;
        }
    }

    println!("\n📋 Summary:");
    if all_ok {
        println!("   ✅ All checks passed - system is ready");
        Ok(())
    } else {
        println!("   ❌ Some checks failed - please review warnings");
        std::process::exit(1);
    }
}
