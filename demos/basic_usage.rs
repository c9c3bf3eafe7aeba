//! Basic worker harness usage
//!
//! Runs the same workload under every coordination policy and shows how
//! many updates the unsynchronized one loses.
//!
//! Run with: cargo run --example basic_usage

use rust_worker_harness::prelude::*;

fn main() -> Result<()> {
    println!("=== Rust Worker Harness - Basic Usage Example ===\n");

    let workers = 2;
    let iterations = 100_000;

    println!("1. {} workers x {} increments per policy:", workers, iterations);
    for policy in CoordinationPolicy::ALL {
        let config = WorkerPoolConfig::new(workers, iterations).with_policy(policy);
        let pool = WorkerPool::with_config(config)?;
        let report = pool.run_with_report()?;

        println!(
            "   {:<7} final = {:>7} (expected {}, lost {}) in {}ms",
            policy.as_str(),
            report.final_count,
            report.expected,
            report.lost_updates(),
            report.duration_ms()
        );
    }

    println!("\n2. Per-worker statistics (locked, 4 workers):");
    let pool = WorkerPool::with_config(
        WorkerPoolConfig::new(4, 25_000).with_policy(CoordinationPolicy::Locked),
    )?;
    let report = pool.run_with_report()?;
    for stat in &report.worker_stats {
        println!(
            "   Worker {}: {} increments in {}μs",
            stat.worker_id, stat.increments, stat.elapsed_us
        );
    }

    println!("\n3. Running a pool twice:");
    match pool.run() {
        Ok(count) => println!("   unexpectedly ran again: {}", count),
        Err(e) => println!("   {}", e),
    }

    println!("\n=== Example completed successfully! ===");
    Ok(())
}
