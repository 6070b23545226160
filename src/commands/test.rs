//! Test command implementation.
//!
//! Takes a handful of samples on the real host and reports timing
//! statistics, so collection problems show up before a long run.

use anyhow::Result;
use std::time::Instant;

use crate::config::Config;
use crate::render::render_report;
use crate::sampler::Sampler;
use crate::source::ProcSource;

/// Tests metrics collection.
pub fn command_test(iterations: usize, verbose: bool, config: &Config) -> Result<()> {
    println!("🧪 hostmon - Test Mode");
    println!("======================");

    let source = ProcSource::new(config.max_processes);
    let mut sampler = Sampler::with_tuning(source, config.sampler_options(), config.sampler_tuning());

    let mut durations_ms = Vec::with_capacity(iterations);

    for iteration in 1..=iterations {
        println!("\n🔄 Iteration {}/{}:", iteration, iterations);

        let start = Instant::now();
        let snapshot = sampler.sample();
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        durations_ms.push(elapsed_ms);

        println!("   ⏱️  Sample duration: {elapsed_ms:.2}ms");
        if let Some(cpu) = &snapshot.cpu {
            println!("   🖥️  CPU: {}% across {} threads", cpu.overall_usage, cpu.thread_count);
        }
        if let Some(mem) = &snapshot.memory {
            println!("   💾 Memory: {}% used", mem.percent);
        }
        if let Some(processes) = &snapshot.top_processes {
            println!("   📊 Ranked {} processes", processes.len());
        }

        if verbose {
            println!("{}", render_report(&snapshot, false));
        }
    }

    if !durations_ms.is_empty() {
        let total: f64 = durations_ms.iter().sum();
        let max = durations_ms.iter().cloned().fold(0.0_f64, f64::max);
        println!("\n📈 Timing:");
        println!("   ├─ Average: {:.2}ms", total / durations_ms.len() as f64);
        println!("   └─ Max: {max:.2}ms");
    }

    println!("\n✅ Test completed successfully");
    Ok(())
}
