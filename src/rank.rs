//! Deterministic Top-N ranking over the live process table.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Metric used to order the ranked process view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Cpu,
    Memory,
}

impl SortKey {
    /// Parses a selector from config text. Unrecognized selectors fall back
    /// to the CPU default rather than failing.
    pub fn parse_or_default(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "mem" => SortKey::Memory,
            _ => SortKey::Cpu,
        }
    }

    fn value_of(self, p: &ProcessSample) -> f64 {
        match self {
            SortKey::Cpu => p.cpu_percent,
            SortKey::Memory => p.memory_percent,
        }
    }
}

/// One successfully read entry of the process table. Processes that vanish
/// mid-enumeration are simply absent from the set handed to the ranker.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessSample {
    pub pid: u32,
    pub name: String,
    pub username: String,
    pub cpu_percent: f64,
    pub memory_percent: f64,
}

/// Sorts descending by the selected metric, breaking ties by ascending pid
/// for determinism, and truncates to the first `n`.
pub fn rank_top(mut processes: Vec<ProcessSample>, key: SortKey, n: usize) -> Vec<ProcessSample> {
    processes.sort_by(|a, b| {
        key.value_of(b)
            .partial_cmp(&key.value_of(a))
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.pid.cmp(&b.pid))
    });
    processes.truncate(n);
    processes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proc(pid: u32, name: &str, cpu: f64, mem: f64) -> ProcessSample {
        ProcessSample {
            pid,
            name: name.to_string(),
            username: "root".to_string(),
            cpu_percent: cpu,
            memory_percent: mem,
        }
    }

    #[test]
    fn sorts_descending_and_truncates() {
        let procs = vec![
            proc(1, "a", 10.0, 1.0),
            proc(2, "b", 30.0, 2.0),
            proc(3, "c", 20.0, 3.0),
        ];
        let ranked = rank_top(procs, SortKey::Cpu, 2);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].pid, 2);
        assert_eq!(ranked[1].pid, 3);
    }

    #[test]
    fn ties_break_by_ascending_pid() {
        let procs = vec![
            proc(1, "a", 10.0, 1.0),
            proc(3, "c", 30.0, 3.0),
            proc(2, "b", 30.0, 2.0),
        ];
        let ranked = rank_top(procs, SortKey::Cpu, 2);
        assert_eq!(ranked[0].pid, 2);
        assert_eq!(ranked[1].pid, 3);
    }

    #[test]
    fn length_is_min_of_n_and_set_size() {
        let procs = vec![proc(1, "a", 1.0, 1.0), proc(2, "b", 2.0, 2.0)];
        assert_eq!(rank_top(procs.clone(), SortKey::Cpu, 10).len(), 2);
        assert_eq!(rank_top(procs.clone(), SortKey::Cpu, 0).len(), 0);
        assert_eq!(rank_top(Vec::new(), SortKey::Cpu, 5).len(), 0);
    }

    #[test]
    fn memory_key_uses_memory_percent() {
        let procs = vec![proc(1, "a", 50.0, 1.0), proc(2, "b", 1.0, 40.0)];
        let ranked = rank_top(procs, SortKey::Memory, 1);
        assert_eq!(ranked[0].pid, 2);
    }

    #[test]
    fn unrecognized_selector_falls_back_to_cpu() {
        assert_eq!(SortKey::parse_or_default("bogus"), SortKey::Cpu);
        assert_eq!(SortKey::parse_or_default("MEMORY"), SortKey::Memory);
        assert_eq!(SortKey::parse_or_default("mem"), SortKey::Memory);
    }

    #[test]
    fn identical_input_yields_identical_output() {
        let procs = vec![
            proc(5, "e", 10.0, 1.0),
            proc(4, "d", 10.0, 1.0),
            proc(6, "f", 10.0, 1.0),
        ];
        let first = rank_top(procs.clone(), SortKey::Cpu, 3);
        let second = rank_top(procs, SortKey::Cpu, 3);
        let pids: Vec<u32> = first.iter().map(|p| p.pid).collect();
        assert_eq!(pids, vec![4, 5, 6]);
        assert_eq!(
            pids,
            second.iter().map(|p| p.pid).collect::<Vec<u32>>()
        );
    }
}
