//! Text report rendering.
//!
//! Pure formatting over an assembled [`Snapshot`]; absent sections are
//! simply left out of the report.

use std::fmt::Write;

use crate::snapshot::Snapshot;

const RULE_WIDTH: usize = 70;

/// Renders the sectioned text report for one snapshot.
pub fn render_report(snapshot: &Snapshot, compact: bool) -> String {
    let mut out = String::new();

    let rule = "=".repeat(RULE_WIDTH);
    writeln!(out, "{rule}").ok();
    writeln!(
        out,
        "Host Performance Report - {}",
        snapshot.timestamp.format("%Y-%m-%d %H:%M:%S")
    )
    .ok();
    writeln!(out, "{rule}").ok();

    if let Some(uptime) = &snapshot.uptime {
        writeln!(out, "\n📅 SYSTEM UPTIME").ok();
        writeln!(out, "   Boot Time: {}", uptime.boot_time).ok();
        writeln!(
            out,
            "   Uptime: {}d {}h {}m",
            uptime.uptime_days, uptime.uptime_hours, uptime.uptime_minutes
        )
        .ok();
    }

    if let Some(cpu) = &snapshot.cpu {
        writeln!(out, "\n🖥️  CPU USAGE").ok();
        writeln!(out, "   Overall: {}%", cpu.overall_usage).ok();
        writeln!(
            out,
            "   Cores: {} physical, {} logical",
            cpu.core_count, cpu.thread_count
        )
        .ok();
        if let Some(mhz) = cpu.frequency_mhz {
            writeln!(out, "   Frequency: {mhz:.0} MHz").ok();
        }
    }

    if let Some(mem) = &snapshot.memory {
        writeln!(out, "\n💾 MEMORY USAGE").ok();
        writeln!(
            out,
            "   Used: {} GiB / {} GiB ({}%)",
            mem.used_gib, mem.total_gib, mem.percent
        )
        .ok();
        writeln!(out, "   Available: {} GiB", mem.available_gib).ok();
        if mem.swap_used_gib > 0.0 {
            writeln!(
                out,
                "   Swap: {} GiB / {} GiB ({}%)",
                mem.swap_used_gib, mem.swap_total_gib, mem.swap_percent
            )
            .ok();
        }
    }

    if let Some(disk) = &snapshot.disk {
        writeln!(out, "\n💿 DISK USAGE").ok();
        for partition in &disk.partitions {
            writeln!(
                out,
                "   {}: {} GiB / {} GiB ({}%)",
                partition.mountpoint, partition.used_gib, partition.total_gib, partition.percent
            )
            .ok();
        }
        if let Some(io) = &disk.io_stats {
            writeln!(
                out,
                "   I/O: {} MiB read, {} MiB written",
                io.read_mib, io.write_mib
            )
            .ok();
            writeln!(
                out,
                "        Rates: {} MiB/s read, {} MiB/s write",
                io.read_rate_mib_s, io.write_rate_mib_s
            )
            .ok();
        }
    }

    if let Some(net) = &snapshot.network {
        writeln!(out, "\n🌐 NETWORK").ok();
        writeln!(
            out,
            "   Sent: {} MiB ({} MiB/s)",
            net.bytes_sent_mib, net.send_rate_mib_s
        )
        .ok();
        writeln!(
            out,
            "   Received: {} MiB ({} MiB/s)",
            net.bytes_recv_mib, net.recv_rate_mib_s
        )
        .ok();
    }

    if let Some(battery) = &snapshot.battery {
        writeln!(out, "\n🔋 BATTERY").ok();
        writeln!(
            out,
            "   Level: {}% ({})",
            battery.percent,
            battery.status.label()
        )
        .ok();
        if let Some(minutes) = battery.time_left_minutes {
            writeln!(out, "   Time Remaining: {minutes} minutes").ok();
        }
    }

    if let Some(temp) = &snapshot.temperature {
        writeln!(out, "\n🌡️  TEMPERATURE").ok();
        writeln!(out, "   CPU: {}°C", temp.cpu_temp_c).ok();
    }

    if let Some(processes) = &snapshot.top_processes {
        writeln!(out, "\n🔝 TOP {} PROCESSES", processes.len()).ok();
        if !compact {
            writeln!(
                out,
                "   {:<8} {:<8} {:<8} {:<30} {:<15}",
                "PID", "CPU%", "MEM%", "Name", "User"
            )
            .ok();
            writeln!(out, "   {}", "-".repeat(75)).ok();
        }
        for proc in processes {
            writeln!(
                out,
                "   {:<8} {:<8.1} {:<8.1} {:<30} {:<15}",
                proc.pid,
                proc.cpu_percent,
                proc.memory_percent,
                truncate(&proc.name, 30),
                truncate(&proc.username, 15),
            )
            .ok();
        }
    }

    writeln!(out, "\n{rule}").ok();
    out
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
