//! Per-tick snapshot assembly.
//!
//! The sampler owns the long-lived session state (rate tracker, probe
//! cache, priming coordinator) and composes one immutable [`Snapshot`] per
//! tick. It performs no I/O of its own beyond what the source encapsulates
//! and has no retry logic: a failed sub-probe surfaces as an absent
//! optional section, never as a failed tick.

use chrono::Local;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::priming::{PrimingCoordinator, PRIME_COOLDOWN, SETTLE_GAP};
use crate::probe::ProbeCache;
use crate::rank::{rank_top, ProcessSample, SortKey};
use crate::rate::{CounterFamily, CounterSnapshot, RateTracker};
use crate::snapshot::{
    bytes_to_gib, bytes_to_mib, round2, BatteryReport, CpuReport, DiskIoReport, DiskReport,
    MemoryReport, NetworkReport, PartitionReport, Snapshot, TemperatureReport, UptimeReport,
};
use crate::source::{CpuTicks, SnapshotSource};

/// How long a temperature reading stays fresh before the probe reruns.
pub const TEMP_PROBE_TTL: Duration = Duration::from_secs(5);

/// Deadline for one temperature probe invocation.
pub const TEMP_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Which sections a tick samples and how the process view is shaped.
#[derive(Debug, Clone)]
pub struct SamplerOptions {
    pub include_processes: bool,
    pub top_n: usize,
    pub sort_by: SortKey,
    pub include_battery: bool,
    pub include_disk_io: bool,
    pub enable_temps: bool,
}

impl Default for SamplerOptions {
    fn default() -> Self {
        Self {
            include_processes: true,
            top_n: 10,
            sort_by: SortKey::Cpu,
            include_battery: true,
            include_disk_io: true,
            enable_temps: false,
        }
    }
}

/// Timing constants, overridable for tests.
#[derive(Debug, Clone)]
pub struct Tuning {
    pub temp_ttl: Duration,
    pub probe_timeout: Duration,
    pub prime_cooldown: Duration,
    pub settle_gap: Duration,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            temp_ttl: TEMP_PROBE_TTL,
            probe_timeout: TEMP_PROBE_TIMEOUT,
            prime_cooldown: PRIME_COOLDOWN,
            settle_gap: SETTLE_GAP,
        }
    }
}

/// Stateful metrics sampler: one instance per monitoring session.
pub struct Sampler<S: SnapshotSource> {
    source: S,
    rates: RateTracker,
    temp_cache: ProbeCache<f64>,
    priming: PrimingCoordinator,
    options: SamplerOptions,
    tuning: Tuning,
}

impl<S: SnapshotSource> Sampler<S> {
    pub fn new(source: S, options: SamplerOptions) -> Self {
        Self::with_tuning(source, options, Tuning::default())
    }

    pub fn with_tuning(source: S, options: SamplerOptions, tuning: Tuning) -> Self {
        Self {
            source,
            rates: RateTracker::new(),
            temp_cache: ProbeCache::new(tuning.temp_ttl),
            priming: PrimingCoordinator::new(tuning.prime_cooldown, tuning.settle_gap),
            options,
            tuning,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Produces the next snapshot for the current tick.
    pub fn sample(&mut self) -> Snapshot {
        let now = Instant::now();

        let uptime = self.source.uptime_seconds().map(build_uptime_report);
        let cpu = self.cpu_report(now);
        let memory = self.source.memory_counters().map(build_memory_report);
        let disk = self.disk_report(now);
        let network = self.network_report(now);
        let battery = if self.options.include_battery {
            self.source.battery().map(|b| BatteryReport {
                percent: b.percent,
                status: b.status,
                plugged_in: b.status.plugged_in(),
                time_left_minutes: b.seconds_left.map(|s| s / 60),
            })
        } else {
            None
        };
        let temperature = self.temperature_report(now);
        let top_processes = if self.options.include_processes {
            Some(self.ranked_processes(now))
        } else {
            None
        };

        debug!(
            "assembled snapshot in {:.2}ms",
            now.elapsed().as_secs_f64() * 1000.0
        );

        Snapshot {
            timestamp: Local::now(),
            uptime,
            cpu,
            memory,
            disk,
            network,
            temperature,
            battery,
            top_processes,
        }
    }

    fn cpu_report(&mut self, now: Instant) -> Option<CpuReport> {
        let counters = self.source.cpu_counters()?;

        let overall = self.cpu_usage_percent(
            CounterFamily::CpuBusyTicks,
            CounterFamily::CpuTotalTicks,
            counters.aggregate,
            now,
        );
        let per_core: Vec<f64> = counters
            .per_core
            .iter()
            .enumerate()
            .map(|(idx, ticks)| {
                let idx = idx as u16;
                self.cpu_usage_percent(
                    CounterFamily::CoreBusyTicks(idx),
                    CounterFamily::CoreTotalTicks(idx),
                    *ticks,
                    now,
                )
            })
            .collect();

        let thread_count = counters.per_core.len().max(1);
        Some(CpuReport {
            overall_usage: overall,
            per_core_usage: per_core,
            core_count: counters.physical_cores.unwrap_or(thread_count),
            thread_count,
            frequency_mhz: counters.frequency_mhz,
        })
    }

    /// Busy-over-total tick ratio across the window since the previous
    /// sample. Both families share the same window, so the ratio is the
    /// usage fraction for exactly that interval.
    fn cpu_usage_percent(
        &mut self,
        busy_family: CounterFamily,
        total_family: CounterFamily,
        ticks: CpuTicks,
        now: Instant,
    ) -> f64 {
        let busy = self
            .rates
            .compute_rate(busy_family, CounterSnapshot::new(ticks.busy, now));
        let total = self
            .rates
            .compute_rate(total_family, CounterSnapshot::new(ticks.total, now));
        if total.rate > 0.0 {
            round2((busy.rate / total.rate * 100.0).clamp(0.0, 100.0))
        } else {
            0.0
        }
    }

    fn disk_report(&mut self, now: Instant) -> Option<DiskReport> {
        let partitions: Vec<PartitionReport> = self
            .source
            .partitions()
            .into_iter()
            .map(|p| PartitionReport {
                total_gib: bytes_to_gib(p.total),
                used_gib: bytes_to_gib(p.used),
                free_gib: bytes_to_gib(p.free),
                percent: if p.total > 0 {
                    round2(p.used as f64 / p.total as f64 * 100.0)
                } else {
                    0.0
                },
                device: p.device,
                mountpoint: p.mountpoint,
                fstype: p.fstype,
            })
            .collect();

        let io_stats = if self.options.include_disk_io {
            self.source.disk_counters().map(|io| {
                let read_rate = self.rates.compute_rate(
                    CounterFamily::DiskBytesRead,
                    CounterSnapshot::new(io.bytes_read, now),
                );
                let write_rate = self.rates.compute_rate(
                    CounterFamily::DiskBytesWritten,
                    CounterSnapshot::new(io.bytes_written, now),
                );
                let read_ops = self.rates.compute_rate(
                    CounterFamily::DiskReadsCompleted,
                    CounterSnapshot::new(io.reads_completed, now),
                );
                let write_ops = self.rates.compute_rate(
                    CounterFamily::DiskWritesCompleted,
                    CounterSnapshot::new(io.writes_completed, now),
                );
                DiskIoReport {
                    read_mib: bytes_to_mib(io.bytes_read),
                    write_mib: bytes_to_mib(io.bytes_written),
                    read_rate_mib_s: round2(read_rate.rate / (1024.0 * 1024.0)),
                    write_rate_mib_s: round2(write_rate.rate / (1024.0 * 1024.0)),
                    read_ops_per_s: round2(read_ops.rate),
                    write_ops_per_s: round2(write_ops.rate),
                    read_count: io.reads_completed,
                    write_count: io.writes_completed,
                }
            })
        } else {
            None
        };

        if partitions.is_empty() && io_stats.is_none() {
            return None;
        }
        Some(DiskReport {
            partitions,
            io_stats,
        })
    }

    fn network_report(&mut self, now: Instant) -> Option<NetworkReport> {
        let net = self.source.net_counters()?;
        let send_rate = self.rates.compute_rate(
            CounterFamily::NetBytesSent,
            CounterSnapshot::new(net.bytes_sent, now),
        );
        let recv_rate = self.rates.compute_rate(
            CounterFamily::NetBytesRecv,
            CounterSnapshot::new(net.bytes_recv, now),
        );
        Some(NetworkReport {
            bytes_sent_mib: bytes_to_mib(net.bytes_sent),
            bytes_recv_mib: bytes_to_mib(net.bytes_recv),
            send_rate_mib_s: round2(send_rate.rate / (1024.0 * 1024.0)),
            recv_rate_mib_s: round2(recv_rate.rate / (1024.0 * 1024.0)),
            packets_sent: net.packets_sent,
            packets_recv: net.packets_recv,
        })
    }

    fn temperature_report(&mut self, now: Instant) -> Option<TemperatureReport> {
        if !self.options.enable_temps {
            return None;
        }
        let Self {
            source,
            temp_cache,
            tuning,
            ..
        } = self;
        temp_cache
            .get_or_refresh(now, || source.cpu_temperature(tuning.probe_timeout))
            .map(|cpu_temp_c| TemperatureReport { cpu_temp_c })
    }

    /// Per-process percentages are delta-based: the priming pass must have
    /// happened, with the settle gap elapsed, before the table is read.
    fn ranked_processes(&mut self, now: Instant) -> Vec<ProcessSample> {
        let Self {
            source, priming, ..
        } = self;
        if !priming.ensure_primed(now, || source.prime_processes()) {
            std::thread::sleep(priming.settle_gap());
        }
        let processes = self.source.processes();
        rank_top(processes, self.options.sort_by, self.options.top_n)
    }
}

fn build_uptime_report(uptime_seconds: f64) -> UptimeReport {
    let boot_time = Local::now() - chrono::Duration::milliseconds((uptime_seconds * 1000.0) as i64);
    let secs = uptime_seconds as u64;
    UptimeReport {
        boot_time: boot_time.format("%Y-%m-%d %H:%M:%S").to_string(),
        uptime_days: secs / 86_400,
        uptime_hours: (secs % 86_400) / 3_600,
        uptime_minutes: (secs % 3_600) / 60,
    }
}

fn build_memory_report(mem: crate::source::MemoryCounters) -> MemoryReport {
    let used = mem.total.saturating_sub(mem.available);
    let swap_used = mem.swap_total.saturating_sub(mem.swap_free);
    MemoryReport {
        total_gib: bytes_to_gib(mem.total),
        available_gib: bytes_to_gib(mem.available),
        used_gib: bytes_to_gib(used),
        percent: if mem.total > 0 {
            round2(used as f64 / mem.total as f64 * 100.0)
        } else {
            0.0
        },
        swap_total_gib: bytes_to_gib(mem.swap_total),
        swap_used_gib: bytes_to_gib(swap_used),
        swap_percent: if mem.swap_total > 0 {
            round2(swap_used as f64 / mem.swap_total as f64 * 100.0)
        } else {
            0.0
        },
    }
}
