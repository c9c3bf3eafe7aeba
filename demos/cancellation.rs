//! Cooperative cancellation and detached workers
//!
//! Run with: cargo run --example cancellation

use rust_worker_harness::prelude::*;
use std::thread;
use std::time::Duration;

fn main() -> Result<()> {
    println!("=== Rust Worker Harness - Cancellation Example ===\n");

    // One increment a second, cancelled after three
    let config = WorkerPoolConfig::new(1, 10)
        .with_iteration_delay(Duration::from_millis(1000))
        .with_cancel_after(Duration::from_millis(3000));
    let pool = WorkerPool::with_config(config)?;

    println!("1. Long task with a 3s timeout...");
    let report = pool.run_with_report()?;
    println!(
        "   stopped after {} of {} increments ({})",
        report.final_count,
        report.expected,
        report
            .cancellation_reason
            .map(|r| r.to_string())
            .unwrap_or_else(|| "not cancelled".to_string())
    );

    println!("\n2. Manual cancellation from another thread...");
    let pool = WorkerPool::with_config(
        WorkerPoolConfig::new(4, 1_000).with_iteration_delay(Duration::from_millis(5)),
    )?;
    let token = pool.cancellation_token();
    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(200));
        token.cancel();
    });
    let count = pool.run()?;
    canceller.join().expect("Canceller panicked");
    println!("   partial count: {}", count);

    println!("\n3. Detached workers...");
    let pool = WorkerPool::with_config(WorkerPoolConfig::new(2, 50_000))?;
    pool.spawn_detached()?;
    println!("   main does not wait; state is {}", pool.state());
    thread::sleep(Duration::from_millis(500));
    println!("   counter observed later: {}", pool.counter().get());

    println!("\n=== Example completed successfully! ===");
    Ok(())
}
