//! Host counter collection from /proc and /sys.
//!
//! `ProcSource` supplies the raw monotonic counters and instantaneous gauges
//! the sampler consumes. Every reader degrades to `None` (or an empty list)
//! on failure; the sampler turns those gaps into absent report sections.

use ahash::{AHashMap as HashMap, AHashSet as HashSet};
use once_cell::sync::Lazy;
use rayon::prelude::*;
use serde::Serialize;
use std::ffi::CString;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::rank::ProcessSample;
use crate::snapshot::round2;

/// Kernel clock ticks per second, used to convert utime/stime jiffies.
static TICKS_PER_SEC: Lazy<f64> = Lazy::new(|| {
    let v = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
    if v > 0 {
        v as f64
    } else {
        100.0
    }
});

/// Absolute monotonic CPU tick counters from one /proc/stat line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuTicks {
    pub busy: u64,
    pub total: u64,
}

#[derive(Debug, Clone)]
pub struct CpuCounters {
    pub aggregate: CpuTicks,
    pub per_core: Vec<CpuTicks>,
    pub physical_cores: Option<usize>,
    pub frequency_mhz: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryCounters {
    pub total: u64,
    pub available: u64,
    pub swap_total: u64,
    pub swap_free: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiskCounters {
    pub bytes_read: u64,
    pub bytes_written: u64,
    pub reads_completed: u64,
    pub writes_completed: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetCounters {
    pub bytes_sent: u64,
    pub bytes_recv: u64,
    pub packets_sent: u64,
    pub packets_recv: u64,
}

#[derive(Debug, Clone)]
pub struct PartitionUsage {
    pub device: String,
    pub mountpoint: String,
    pub fstype: String,
    pub total: u64,
    pub used: u64,
    pub free: u64,
}

/// Charge state as the kernel reports it. "Not charging" (full enough,
/// on AC) and "Full" are distinct from actively charging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatteryStatus {
    Charging,
    Discharging,
    Full,
    NotCharging,
    Unknown,
}

impl BatteryStatus {
    fn from_sysfs(status: &str) -> Self {
        match status {
            "Charging" => BatteryStatus::Charging,
            "Discharging" => BatteryStatus::Discharging,
            "Full" => BatteryStatus::Full,
            "Not charging" => BatteryStatus::NotCharging,
            _ => BatteryStatus::Unknown,
        }
    }

    pub fn plugged_in(self) -> bool {
        matches!(
            self,
            BatteryStatus::Charging | BatteryStatus::Full | BatteryStatus::NotCharging
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            BatteryStatus::Charging => "Charging",
            BatteryStatus::Discharging => "Discharging",
            BatteryStatus::Full => "Full",
            BatteryStatus::NotCharging => "Not charging",
            BatteryStatus::Unknown => "Unknown",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BatteryState {
    pub percent: f64,
    pub status: BatteryStatus,
    pub seconds_left: Option<u64>,
}

/// Capability the sampler consumes from its host environment.
///
/// Individual reads may fail independently; none of them is fatal for a
/// tick. `prime_processes` establishes per-pid CPU time baselines so a
/// later `processes` call can report meaningful percentages.
pub trait SnapshotSource {
    fn uptime_seconds(&self) -> Option<f64>;
    fn cpu_counters(&self) -> Option<CpuCounters>;
    fn memory_counters(&self) -> Option<MemoryCounters>;
    fn partitions(&self) -> Vec<PartitionUsage>;
    fn disk_counters(&self) -> Option<DiskCounters>;
    fn net_counters(&self) -> Option<NetCounters>;
    fn battery(&self) -> Option<BatteryState>;
    fn cpu_temperature(&self, timeout: Duration) -> Option<f64>;
    fn prime_processes(&mut self);
    fn processes(&mut self) -> Vec<ProcessSample>;
}

/// Per-pid CPU time baseline for delta-based percentages.
#[derive(Debug, Clone, Copy)]
struct CpuBaseline {
    cpu_seconds: f64,
    taken_at: Instant,
}

/// Raw per-process fields read in one pass over /proc/<pid>.
struct RawProc {
    pid: u32,
    name: String,
    uid: u32,
    rss_bytes: u64,
    cpu_seconds: f64,
}

/// Linux implementation of [`SnapshotSource`] backed by /proc and /sys.
pub struct ProcSource {
    proc_root: PathBuf,
    sys_root: PathBuf,
    users: HashMap<u32, String>,
    cpu_baselines: HashMap<u32, CpuBaseline>,
    max_processes: Option<usize>,
}

impl ProcSource {
    pub fn new(max_processes: Option<usize>) -> Self {
        let users = fs::read_to_string("/etc/passwd")
            .map(|content| parse_passwd(&content))
            .unwrap_or_default();
        Self {
            proc_root: PathBuf::from("/proc"),
            sys_root: PathBuf::from("/sys"),
            users,
            cpu_baselines: HashMap::new(),
            max_processes,
        }
    }

    fn read_proc(&self, name: &str) -> Option<String> {
        fs::read_to_string(self.proc_root.join(name)).ok()
    }

    /// Scans the proc root for numeric pid directories.
    fn proc_entries(&self) -> Vec<(u32, PathBuf)> {
        let mut out = Vec::new();
        let Ok(entries) = fs::read_dir(&self.proc_root) else {
            return out;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|s| s.to_str()) else {
                continue;
            };
            if !name.chars().all(|c| c.is_ascii_digit()) {
                continue;
            }
            let Ok(pid) = name.parse::<u32>() else {
                continue;
            };
            out.push((pid, path));
            if let Some(max) = self.max_processes {
                if out.len() >= max {
                    break;
                }
            }
        }
        out
    }
}

impl SnapshotSource for ProcSource {
    fn uptime_seconds(&self) -> Option<f64> {
        parse_uptime(&self.read_proc("uptime")?)
    }

    fn cpu_counters(&self) -> Option<CpuCounters> {
        let (aggregate, per_core) = parse_cpu_ticks(&self.read_proc("stat")?)?;
        let (physical_cores, frequency_mhz) = self
            .read_proc("cpuinfo")
            .map(|content| parse_cpuinfo(&content))
            .unwrap_or((None, None));
        Some(CpuCounters {
            aggregate,
            per_core,
            physical_cores,
            frequency_mhz,
        })
    }

    fn memory_counters(&self) -> Option<MemoryCounters> {
        parse_meminfo(&self.read_proc("meminfo")?)
    }

    fn partitions(&self) -> Vec<PartitionUsage> {
        let Some(content) = self.read_proc("mounts") else {
            return Vec::new();
        };
        parse_mounts(&content)
            .into_iter()
            .filter_map(|(device, mountpoint, fstype)| {
                let (total, used, free) = statvfs_usage(&mountpoint)?;
                Some(PartitionUsage {
                    device,
                    mountpoint,
                    fstype,
                    total,
                    used,
                    free,
                })
            })
            .collect()
    }

    fn disk_counters(&self) -> Option<DiskCounters> {
        Some(parse_diskstats(&self.read_proc("diskstats")?))
    }

    fn net_counters(&self) -> Option<NetCounters> {
        Some(parse_net_dev(&self.read_proc("net/dev")?))
    }

    fn battery(&self) -> Option<BatteryState> {
        read_battery(&self.sys_root.join("class/power_supply"))
    }

    fn cpu_temperature(&self, timeout: Duration) -> Option<f64> {
        run_sensors_probe(timeout)
            .or_else(|| read_thermal_zone(&self.sys_root.join("class/thermal")))
    }

    fn prime_processes(&mut self) {
        let now = Instant::now();
        let baselines: Vec<(u32, f64)> = self
            .proc_entries()
            .par_iter()
            .filter_map(|(pid, path)| {
                let content = fs::read_to_string(path.join("stat")).ok()?;
                let cpu_seconds = parse_pid_stat_cpu_seconds(&content, *TICKS_PER_SEC)?;
                Some((*pid, cpu_seconds))
            })
            .collect();
        debug!("primed CPU baselines for {} processes", baselines.len());
        for (pid, cpu_seconds) in baselines {
            self.cpu_baselines.insert(
                pid,
                CpuBaseline {
                    cpu_seconds,
                    taken_at: now,
                },
            );
        }
    }

    fn processes(&mut self) -> Vec<ProcessSample> {
        let mem_total = self.memory_counters().map(|m| m.total).unwrap_or(0);
        let entries = self.proc_entries();
        let now = Instant::now();

        let raws: Vec<RawProc> = entries
            .par_iter()
            .filter_map(|(pid, path)| read_process_row(*pid, path))
            .collect();

        let mut out = Vec::with_capacity(raws.len());
        let mut seen = HashSet::with_capacity(raws.len());
        for raw in raws {
            let cpu_percent = match self.cpu_baselines.get(&raw.pid) {
                Some(base) => {
                    let dt = now.duration_since(base.taken_at).as_secs_f64();
                    if dt > 0.0 {
                        round2((raw.cpu_seconds - base.cpu_seconds).max(0.0) / dt * 100.0)
                    } else {
                        0.0
                    }
                }
                None => 0.0,
            };
            self.cpu_baselines.insert(
                raw.pid,
                CpuBaseline {
                    cpu_seconds: raw.cpu_seconds,
                    taken_at: now,
                },
            );
            seen.insert(raw.pid);

            let memory_percent = if mem_total > 0 {
                round2(raw.rss_bytes as f64 / mem_total as f64 * 100.0)
            } else {
                0.0
            };
            let username = self
                .users
                .get(&raw.uid)
                .cloned()
                .unwrap_or_else(|| raw.uid.to_string());

            out.push(ProcessSample {
                pid: raw.pid,
                name: raw.name,
                username,
                cpu_percent,
                memory_percent,
            });
        }

        // Drop baselines for pids that no longer exist.
        self.cpu_baselines.retain(|pid, _| seen.contains(pid));
        out
    }
}

/// Reads the per-process fields for one pid. Any missing file means the
/// process vanished mid-enumeration; the row is skipped, not an error.
fn read_process_row(pid: u32, proc_path: &Path) -> Option<RawProc> {
    let name = read_process_name(proc_path)?;
    let status = fs::read_to_string(proc_path.join("status")).ok()?;
    let uid = parse_status_uid(&status)?;
    let rss_bytes = parse_status_vmrss_kb(&status).unwrap_or(0) * 1024;
    let stat = fs::read_to_string(proc_path.join("stat")).ok()?;
    let cpu_seconds = parse_pid_stat_cpu_seconds(&stat, *TICKS_PER_SEC)?;
    Some(RawProc {
        pid,
        name,
        uid,
        rss_bytes,
        cpu_seconds,
    })
}

/// Reads process name from comm, falling back to the cmdline basename.
fn read_process_name(proc_path: &Path) -> Option<String> {
    if let Ok(s) = fs::read_to_string(proc_path.join("comm")) {
        let t = s.trim();
        if !t.is_empty() {
            return Some(t.into());
        }
    }

    let content = fs::read(proc_path.join("cmdline")).ok()?;
    let first = content.split(|&b| b == 0u8).next()?;
    let arg0 = std::str::from_utf8(first).ok()?;
    Path::new(arg0)
        .file_name()
        .and_then(|n| n.to_str())
        .map(|s| s.to_string())
}

/// First field of /proc/uptime: seconds since boot.
fn parse_uptime(content: &str) -> Option<f64> {
    content.split_whitespace().next()?.parse().ok()
}

/// Parses aggregate and per-core tick counters from /proc/stat.
///
/// Busy time excludes idle and iowait; total is busy plus both.
fn parse_cpu_ticks(content: &str) -> Option<(CpuTicks, Vec<CpuTicks>)> {
    let mut aggregate = None;
    let mut per_core = Vec::new();

    for line in content.lines() {
        if !line.starts_with("cpu") {
            continue;
        }
        let mut parts = line.split_whitespace();
        let label = parts.next()?;
        let fields: Vec<u64> = parts.map(|v| v.parse().unwrap_or(0)).collect();
        if fields.len() < 5 {
            continue;
        }

        let user = fields[0];
        let nice = fields[1];
        let system = fields[2];
        let idle = fields[3];
        let iowait = fields[4];
        let irq = *fields.get(5).unwrap_or(&0);
        let softirq = *fields.get(6).unwrap_or(&0);
        let steal = *fields.get(7).unwrap_or(&0);

        let busy = user + nice + system + irq + softirq + steal;
        let ticks = CpuTicks {
            busy,
            total: busy + idle + iowait,
        };

        if label == "cpu" {
            aggregate = Some(ticks);
        } else {
            per_core.push(ticks);
        }
    }

    aggregate.map(|agg| (agg, per_core))
}

/// Extracts physical core count and current frequency from /proc/cpuinfo.
fn parse_cpuinfo(content: &str) -> (Option<usize>, Option<f64>) {
    let mut cores = None;
    let mut mhz = None;
    for line in content.lines() {
        if cores.is_none() && line.starts_with("cpu cores") {
            cores = line
                .split(':')
                .nth(1)
                .and_then(|v| v.trim().parse::<usize>().ok());
        } else if mhz.is_none() && line.starts_with("cpu MHz") {
            mhz = line
                .split(':')
                .nth(1)
                .and_then(|v| v.trim().parse::<f64>().ok());
        }
        if cores.is_some() && mhz.is_some() {
            break;
        }
    }
    (cores, mhz)
}

fn parse_meminfo_kb(line: &str) -> Option<u64> {
    line.split_whitespace().nth(1)?.parse().ok()
}

/// Parses total/available RAM and swap from /proc/meminfo, in bytes.
fn parse_meminfo(content: &str) -> Option<MemoryCounters> {
    let mut total = None;
    let mut available = None;
    let mut swap_total = None;
    let mut swap_free = None;

    for line in content.lines() {
        if line.starts_with("MemTotal:") {
            total = parse_meminfo_kb(line);
        } else if line.starts_with("MemAvailable:") {
            available = parse_meminfo_kb(line);
        } else if line.starts_with("SwapTotal:") {
            swap_total = parse_meminfo_kb(line);
        } else if line.starts_with("SwapFree:") {
            swap_free = parse_meminfo_kb(line);
        }
    }

    Some(MemoryCounters {
        total: total? * 1024,
        available: available? * 1024,
        swap_total: swap_total.unwrap_or(0) * 1024,
        swap_free: swap_free.unwrap_or(0) * 1024,
    })
}

/// Whole physical disks only; partitions and virtual devices would double
/// count the same traffic.
fn is_physical_disk(name: &str) -> bool {
    for prefix in ["loop", "ram", "zram", "dm-", "md", "sr", "fd"] {
        if name.starts_with(prefix) {
            return false;
        }
    }
    if let Some(rest) = name.strip_prefix("nvme") {
        return !rest.contains('p');
    }
    if let Some(rest) = name.strip_prefix("mmcblk") {
        return !rest.contains('p');
    }
    // sda is a disk, sda1 a partition
    !name.ends_with(|c: char| c.is_ascii_digit())
}

/// Sums read/write bytes (sectors are 512 bytes) and completed operations
/// across physical block devices from /proc/diskstats.
fn parse_diskstats(content: &str) -> DiskCounters {
    let mut out = DiskCounters::default();
    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 10 {
            continue;
        }
        let name = parts[2];
        if !is_physical_disk(name) {
            continue;
        }
        out.reads_completed += parts[3].parse::<u64>().unwrap_or(0);
        out.bytes_read += parts[5].parse::<u64>().unwrap_or(0) * 512;
        out.writes_completed += parts[7].parse::<u64>().unwrap_or(0);
        out.bytes_written += parts[9].parse::<u64>().unwrap_or(0) * 512;
    }
    out
}

/// Sums traffic across interfaces from /proc/net/dev, excluding loopback.
fn parse_net_dev(content: &str) -> NetCounters {
    let mut out = NetCounters::default();
    for line in content.lines().skip(2) {
        let Some((iface, rest)) = line.split_once(':') else {
            continue;
        };
        if iface.trim() == "lo" {
            continue;
        }
        let fields: Vec<u64> = rest
            .split_whitespace()
            .map(|v| v.parse().unwrap_or(0))
            .collect();
        if fields.len() < 10 {
            continue;
        }
        out.bytes_recv += fields[0];
        out.packets_recv += fields[1];
        out.bytes_sent += fields[8];
        out.packets_sent += fields[9];
    }
    out
}

/// Filesystem types that do not correspond to a real storage device.
fn is_pseudo_fs(fstype: &str) -> bool {
    matches!(
        fstype,
        "proc"
            | "sysfs"
            | "devtmpfs"
            | "devpts"
            | "tmpfs"
            | "cgroup"
            | "cgroup2"
            | "securityfs"
            | "debugfs"
            | "tracefs"
            | "pstore"
            | "bpf"
            | "autofs"
            | "mqueue"
            | "hugetlbfs"
            | "fusectl"
            | "configfs"
            | "ramfs"
            | "binfmt_misc"
            | "squashfs"
            | "overlay"
            | "nsfs"
            | "rpc_pipefs"
            | "fuse.portal"
    )
}

/// Extracts (device, mountpoint, fstype) triples for real block devices
/// from /proc/mounts, deduplicated by device.
fn parse_mounts(content: &str) -> Vec<(String, String, String)> {
    let mut out: Vec<(String, String, String)> = Vec::new();
    for line in content.lines() {
        let mut parts = line.split_whitespace();
        let (Some(device), Some(mountpoint), Some(fstype)) =
            (parts.next(), parts.next(), parts.next())
        else {
            continue;
        };
        if !device.starts_with("/dev/") || is_pseudo_fs(fstype) {
            continue;
        }
        if out.iter().any(|(d, _, _)| d == device) {
            continue;
        }
        out.push((
            device.to_string(),
            mountpoint.to_string(),
            fstype.to_string(),
        ));
    }
    out
}

/// Queries filesystem usage via statvfs. Returns (total, used, free) bytes.
fn statvfs_usage(mountpoint: &str) -> Option<(u64, u64, u64)> {
    let c_path = CString::new(mountpoint).ok()?;
    let mut vfs: libc::statvfs = unsafe { std::mem::zeroed() };
    if unsafe { libc::statvfs(c_path.as_ptr(), &mut vfs) } != 0 {
        return None;
    }
    let frsize = if vfs.f_frsize > 0 {
        vfs.f_frsize
    } else {
        vfs.f_bsize
    } as u64;
    let total = vfs.f_blocks as u64 * frsize;
    if total == 0 {
        return None;
    }
    let free = vfs.f_bfree as u64 * frsize;
    let avail = vfs.f_bavail as u64 * frsize;
    Some((total, total.saturating_sub(free), avail))
}

/// Maps uid to login name from passwd-format content.
fn parse_passwd(content: &str) -> HashMap<u32, String> {
    let mut out = HashMap::new();
    for line in content.lines() {
        let mut parts = line.split(':');
        let (Some(name), Some(_), Some(uid)) = (parts.next(), parts.next(), parts.next()) else {
            continue;
        };
        if let Ok(uid) = uid.parse::<u32>() {
            out.entry(uid).or_insert_with(|| name.to_string());
        }
    }
    out
}

/// Real uid from the Uid line of /proc/<pid>/status.
fn parse_status_uid(content: &str) -> Option<u32> {
    content
        .lines()
        .find(|l| l.starts_with("Uid:"))?
        .split_whitespace()
        .nth(1)?
        .parse()
        .ok()
}

/// Resident set size in kB from /proc/<pid>/status.
fn parse_status_vmrss_kb(content: &str) -> Option<u64> {
    content
        .lines()
        .find(|l| l.starts_with("VmRSS:"))?
        .split_whitespace()
        .nth(1)?
        .parse()
        .ok()
}

/// Total CPU time (utime+stime) in seconds from /proc/<pid>/stat.
///
/// The comm field may contain spaces, so fields are counted from the
/// closing parenthesis: state is the first field after it, utime and stime
/// the 12th and 13th.
fn parse_pid_stat_cpu_seconds(content: &str, ticks_per_sec: f64) -> Option<f64> {
    let rest = &content[content.rfind(')')? + 1..];
    let fields: Vec<&str> = rest.split_whitespace().collect();
    if fields.len() < 13 {
        return None;
    }
    let utime: u64 = fields[11].parse().ok()?;
    let stime: u64 = fields[12].parse().ok()?;
    Some((utime + stime) as f64 / ticks_per_sec)
}

/// Scans /sys/class/power_supply for the first battery and reads its state.
fn read_battery(power_supply_root: &Path) -> Option<BatteryState> {
    let entries = fs::read_dir(power_supply_root).ok()?;
    for entry in entries.flatten() {
        let path = entry.path();
        let kind = fs::read_to_string(path.join("type")).unwrap_or_default();
        if kind.trim() != "Battery" {
            continue;
        }

        let percent: f64 = fs::read_to_string(path.join("capacity"))
            .ok()?
            .trim()
            .parse()
            .ok()?;
        let raw_status = fs::read_to_string(path.join("status")).unwrap_or_default();
        let status = BatteryStatus::from_sysfs(raw_status.trim());

        let seconds_left = if status == BatteryStatus::Discharging {
            battery_seconds_left(&path)
        } else {
            None
        };

        return Some(BatteryState {
            percent,
            status,
            seconds_left,
        });
    }
    None
}

/// Remaining runtime from energy/power (or charge/current) readings, where
/// the driver exposes them.
fn battery_seconds_left(battery_path: &Path) -> Option<u64> {
    let read_u64 = |name: &str| -> Option<u64> {
        fs::read_to_string(battery_path.join(name))
            .ok()?
            .trim()
            .parse()
            .ok()
    };

    let (stored, drain) = match (read_u64("energy_now"), read_u64("power_now")) {
        (Some(e), Some(p)) => (e, p),
        _ => (read_u64("charge_now")?, read_u64("current_now")?),
    };
    if drain == 0 {
        return None;
    }
    Some(stored * 3600 / drain)
}

/// Runs `sensors -j` with an enforced deadline and extracts a CPU package
/// temperature. Any non-zero exit, timeout, or missing executable is
/// treated as unavailable.
fn run_sensors_probe(timeout: Duration) -> Option<f64> {
    let mut child = Command::new("sensors")
        .arg("-j")
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .stdin(Stdio::null())
        .spawn()
        .ok()?;

    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                if !status.success() {
                    return None;
                }
                let mut out = String::new();
                child.stdout.take()?.read_to_string(&mut out).ok()?;
                let value: serde_json::Value = serde_json::from_str(&out).ok()?;
                return parse_sensors_json(&value);
            }
            Ok(None) => {
                if Instant::now() >= deadline {
                    debug!("sensors probe exceeded {:?} timeout, killing", timeout);
                    let _ = child.kill();
                    let _ = child.wait();
                    return None;
                }
                std::thread::sleep(Duration::from_millis(10));
            }
            Err(_) => return None,
        }
    }
}

/// Picks a CPU temperature out of `sensors -j` output: prefers known CPU
/// chip drivers, then takes the first `*_input` reading under a
/// temperature-looking feature.
fn parse_sensors_json(value: &serde_json::Value) -> Option<f64> {
    let chips = value.as_object()?;

    let is_cpu_chip = |name: &str| {
        let name = name.to_ascii_lowercase();
        ["coretemp", "k10temp", "cpu_thermal", "zenpower"]
            .iter()
            .any(|hint| name.contains(hint))
    };

    let mut fallback = None;
    for (chip_name, features) in chips {
        let Some(features) = features.as_object() else {
            continue;
        };
        for (feature_name, readings) in features {
            let Some(readings) = readings.as_object() else {
                continue;
            };
            let lowered = feature_name.to_ascii_lowercase();
            if !(lowered.contains("package") || lowered.contains("tctl") || lowered.contains("temp"))
            {
                continue;
            }
            for (key, reading) in readings {
                if key.ends_with("_input") {
                    if let Some(temp) = reading.as_f64() {
                        if is_cpu_chip(chip_name) {
                            return Some(temp);
                        }
                        fallback.get_or_insert(temp);
                    }
                }
            }
        }
    }
    fallback
}

/// Fallback: first CPU-looking thermal zone under /sys/class/thermal,
/// reported in millidegrees.
fn read_thermal_zone(thermal_root: &Path) -> Option<f64> {
    let entries = fs::read_dir(thermal_root).ok()?;
    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if !name.starts_with("thermal_zone") {
            continue;
        }
        let zone_type = fs::read_to_string(entry.path().join("type")).unwrap_or_default();
        let zone_type = zone_type.trim().to_ascii_lowercase();
        if !(zone_type.contains("cpu") || zone_type.contains("pkg") || zone_type.contains("x86")) {
            continue;
        }
        if let Ok(raw) = fs::read_to_string(entry.path().join("temp")) {
            if let Ok(milli) = raw.trim().parse::<f64>() {
                return Some(milli / 1000.0);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_uptime() {
        assert_eq!(parse_uptime("12345.67 45678.90\n"), Some(12345.67));
        assert_eq!(parse_uptime("garbage"), None);
    }

    #[test]
    fn parses_cpu_ticks_aggregate_and_cores() {
        let stat = "cpu  100 10 50 800 40 5 5 0 0 0\n\
                    cpu0 50 5 25 400 20 2 3 0 0 0\n\
                    cpu1 50 5 25 400 20 3 2 0 0 0\n\
                    intr 12345\n";
        let (agg, cores) = parse_cpu_ticks(stat).unwrap();
        assert_eq!(agg.busy, 100 + 10 + 50 + 5 + 5);
        assert_eq!(agg.total, agg.busy + 800 + 40);
        assert_eq!(cores.len(), 2);
        assert_eq!(cores[0].busy, 50 + 5 + 25 + 2 + 3);
    }

    #[test]
    fn parses_cpuinfo_cores_and_frequency() {
        let cpuinfo = "processor\t: 0\n\
                       cpu MHz\t\t: 2400.000\n\
                       cpu cores\t: 4\n\
                       processor\t: 1\n\
                       cpu MHz\t\t: 2600.000\n";
        let (cores, mhz) = parse_cpuinfo(cpuinfo);
        assert_eq!(cores, Some(4));
        assert_eq!(mhz, Some(2400.0));
    }

    #[test]
    fn parses_meminfo() {
        let meminfo = "MemTotal:       16384000 kB\n\
                       MemFree:         8192000 kB\n\
                       MemAvailable:   12288000 kB\n\
                       SwapTotal:       4096000 kB\n\
                       SwapFree:        2048000 kB\n";
        let mem = parse_meminfo(meminfo).unwrap();
        assert_eq!(mem.total, 16384000 * 1024);
        assert_eq!(mem.available, 12288000 * 1024);
        assert_eq!(mem.swap_total, 4096000 * 1024);
        assert_eq!(mem.swap_free, 2048000 * 1024);
    }

    #[test]
    fn meminfo_missing_fields_is_none() {
        assert!(parse_meminfo("MemFree: 1 kB\n").is_none());
    }

    #[test]
    fn physical_disk_filter() {
        assert!(is_physical_disk("sda"));
        assert!(is_physical_disk("nvme0n1"));
        assert!(is_physical_disk("vdb"));
        assert!(is_physical_disk("mmcblk0"));
        assert!(!is_physical_disk("sda1"));
        assert!(!is_physical_disk("nvme0n1p2"));
        assert!(!is_physical_disk("mmcblk0p1"));
        assert!(!is_physical_disk("loop0"));
        assert!(!is_physical_disk("dm-0"));
        assert!(!is_physical_disk("ram1"));
    }

    #[test]
    fn parses_diskstats_summing_physical_disks() {
        let diskstats = "   8       0 sda 100 0 2048 500 200 0 4096 900 0 0 0\n\
                            8       1 sda1 90 0 1024 400 150 0 2048 800 0 0 0\n\
                            7       0 loop0 5 0 64 1 0 0 0 0 0 0 0\n\
                          259       0 nvme0n1 300 0 8192 100 400 0 16384 200 0 0 0\n";
        let io = parse_diskstats(diskstats);
        assert_eq!(io.reads_completed, 100 + 300);
        assert_eq!(io.writes_completed, 200 + 400);
        assert_eq!(io.bytes_read, (2048 + 8192) * 512);
        assert_eq!(io.bytes_written, (4096 + 16384) * 512);
    }

    #[test]
    fn parses_net_dev_excluding_loopback() {
        let net_dev = "Inter-|   Receive                                                |  Transmit\n\
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed\n\
    lo: 1000    10    0    0    0     0          0         0     1000    10    0    0    0     0       0          0\n\
  eth0: 5000    50    0    0    0     0          0         0     3000    30    0    0    0     0       0          0\n\
 wlan0: 2000    20    0    0    0     0          0         0     1500    15    0    0    0     0       0          0\n";
        let net = parse_net_dev(net_dev);
        assert_eq!(net.bytes_recv, 7000);
        assert_eq!(net.packets_recv, 70);
        assert_eq!(net.bytes_sent, 4500);
        assert_eq!(net.packets_sent, 45);
    }

    #[test]
    fn parses_mounts_filtering_pseudo_and_duplicates() {
        let mounts = "proc /proc proc rw 0 0\n\
                      /dev/sda1 / ext4 rw 0 0\n\
                      /dev/sda1 /mnt/bind ext4 rw 0 0\n\
                      tmpfs /tmp tmpfs rw 0 0\n\
                      /dev/nvme0n1p2 /home ext4 rw 0 0\n";
        let parts = parse_mounts(mounts);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].1, "/");
        assert_eq!(parts[1].1, "/home");
    }

    #[test]
    fn parses_passwd() {
        let passwd = "root:x:0:0:root:/root:/bin/bash\n\
                      daemon:x:1:1:daemon:/usr/sbin:/usr/sbin/nologin\n\
                      alice:x:1000:1000::/home/alice:/bin/zsh\n";
        let users = parse_passwd(passwd);
        assert_eq!(users.get(&0).map(String::as_str), Some("root"));
        assert_eq!(users.get(&1000).map(String::as_str), Some("alice"));
    }

    #[test]
    fn parses_status_fields() {
        let status = "Name:\tbash\n\
                      Uid:\t1000\t1000\t1000\t1000\n\
                      VmRSS:\t    5120 kB\n";
        assert_eq!(parse_status_uid(status), Some(1000));
        assert_eq!(parse_status_vmrss_kb(status), Some(5120));
    }

    #[test]
    fn parses_pid_stat_with_spaces_in_comm() {
        // comm is "(tmux: server)" - fields must be counted from the last ')'
        let stat = "1234 (tmux: server) S 1 1234 1234 0 -1 4194560 1000 0 0 0 250 150 0 0 20 0 1 0 100 1000000 500 18446744073709551615";
        let secs = parse_pid_stat_cpu_seconds(stat, 100.0).unwrap();
        assert!((secs - 4.0).abs() < 1e-9);
    }

    #[test]
    fn battery_status_maps_sysfs_strings() {
        assert_eq!(
            BatteryStatus::from_sysfs("Charging"),
            BatteryStatus::Charging
        );
        assert_eq!(
            BatteryStatus::from_sysfs("Not charging"),
            BatteryStatus::NotCharging
        );
        assert_eq!(BatteryStatus::from_sysfs("Full"), BatteryStatus::Full);
        assert_eq!(
            BatteryStatus::from_sysfs("something else"),
            BatteryStatus::Unknown
        );

        assert!(BatteryStatus::NotCharging.plugged_in());
        assert!(BatteryStatus::Full.plugged_in());
        assert!(!BatteryStatus::Discharging.plugged_in());
        assert!(!BatteryStatus::Unknown.plugged_in());
    }

    #[test]
    fn sensors_json_prefers_cpu_chip() {
        let json = serde_json::json!({
            "acpitz-acpi-0": {
                "temp1": { "temp1_input": 27.8 }
            },
            "coretemp-isa-0000": {
                "Package id 0": { "temp1_input": 45.0 },
                "Core 0": { "temp2_input": 43.0 }
            }
        });
        assert_eq!(parse_sensors_json(&json), Some(45.0));
    }

    #[test]
    fn sensors_json_falls_back_to_any_temperature() {
        let json = serde_json::json!({
            "acpitz-acpi-0": {
                "temp1": { "temp1_input": 27.8 }
            }
        });
        assert_eq!(parse_sensors_json(&json), Some(27.8));
        assert_eq!(parse_sensors_json(&serde_json::json!({})), None);
    }
}
