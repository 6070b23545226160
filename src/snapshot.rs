//! Assembled per-tick report data.
//!
//! A `Snapshot` is built fresh on every tick by the sampler, never mutated
//! afterwards, and handed off to the output layer. Sections that could not
//! be sampled are `None` rather than an error for the whole tick.

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::rank::ProcessSample;
use crate::source::BatteryStatus;

const MIB: f64 = 1024.0 * 1024.0;
const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Rounds to two decimal places for report output.
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

pub fn bytes_to_mib(v: u64) -> f64 {
    round2(v as f64 / MIB)
}

pub fn bytes_to_gib(v: u64) -> f64 {
    round2(v as f64 / GIB)
}

#[derive(Debug, Clone, Serialize)]
pub struct UptimeReport {
    pub boot_time: String,
    pub uptime_days: u64,
    pub uptime_hours: u64,
    pub uptime_minutes: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CpuReport {
    pub overall_usage: f64,
    pub per_core_usage: Vec<f64>,
    pub core_count: usize,
    pub thread_count: usize,
    pub frequency_mhz: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemoryReport {
    pub total_gib: f64,
    pub available_gib: f64,
    pub used_gib: f64,
    pub percent: f64,
    pub swap_total_gib: f64,
    pub swap_used_gib: f64,
    pub swap_percent: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PartitionReport {
    pub device: String,
    pub mountpoint: String,
    pub fstype: String,
    pub total_gib: f64,
    pub used_gib: f64,
    pub free_gib: f64,
    pub percent: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiskIoReport {
    pub read_mib: f64,
    pub write_mib: f64,
    pub read_rate_mib_s: f64,
    pub write_rate_mib_s: f64,
    pub read_ops_per_s: f64,
    pub write_ops_per_s: f64,
    pub read_count: u64,
    pub write_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiskReport {
    pub partitions: Vec<PartitionReport>,
    pub io_stats: Option<DiskIoReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NetworkReport {
    pub bytes_sent_mib: f64,
    pub bytes_recv_mib: f64,
    pub send_rate_mib_s: f64,
    pub recv_rate_mib_s: f64,
    pub packets_sent: u64,
    pub packets_recv: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatteryReport {
    pub percent: f64,
    pub status: BatteryStatus,
    pub plugged_in: bool,
    pub time_left_minutes: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TemperatureReport {
    pub cpu_temp_c: f64,
}

/// Immutable aggregate of everything sampled in one tick.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub timestamp: DateTime<Local>,
    pub uptime: Option<UptimeReport>,
    pub cpu: Option<CpuReport>,
    pub memory: Option<MemoryReport>,
    pub disk: Option<DiskReport>,
    pub network: Option<NetworkReport>,
    pub temperature: Option<TemperatureReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery: Option<BatteryReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_processes: Option<Vec<ProcessSample>>,
}
