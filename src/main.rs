//! Command line front end for the worker harness
//!
//! Run with: cargo run -- --workers 2 --iterations 100000 --policy unsync

use clap::Parser;
use rust_worker_harness::prelude::*;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "worker-harness")]
#[command(about = "Spawn worker threads that increment a shared counter and print the total")]
#[command(version)]
struct Cli {
    /// Number of worker threads (defaults to the number of CPUs)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Increments performed by each worker
    #[arg(short, long, default_value_t = 100_000)]
    iterations: u64,

    /// Coordination policy: locked, atomic or unsync
    #[arg(short, long, default_value = "atomic")]
    policy: CoordinationPolicy,

    /// Worker thread name prefix
    #[arg(long, default_value = "worker")]
    thread_prefix: String,

    /// Sleep this many milliseconds after every increment
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Yield the CPU after every increment
    #[arg(long = "yield")]
    yield_between: bool,

    /// Cancel the run after this many milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Spawn workers detached and only observe the counter
    #[arg(long)]
    detach: bool,

    /// Print the full run report as JSON
    #[arg(long, conflicts_with = "detach")]
    json: bool,
}

impl Cli {
    fn to_config(&self) -> WorkerPoolConfig {
        let workers = self.workers.unwrap_or_else(num_cpus::get);
        let mut config = WorkerPoolConfig::new(workers, self.iterations)
            .with_policy(self.policy)
            .with_thread_name_prefix(self.thread_prefix.clone())
            .with_yield_between_iterations(self.yield_between);
        if let Some(ms) = self.delay_ms {
            config = config.with_iteration_delay(Duration::from_millis(ms));
        }
        if let Some(ms) = self.timeout_ms {
            config = config.with_cancel_after(Duration::from_millis(ms));
        }
        config
    }
}

fn execute(cli: &Cli) -> Result<()> {
    let pool = WorkerPool::with_config(cli.to_config())?;

    if cli.detach {
        pool.spawn_detached()?;
        // No join handles: watch the statistics until every worker is done
        while !pool.get_stats().iter().all(|s| s.is_finished()) {
            thread::sleep(Duration::from_millis(10));
        }
        println!("{}", pool.counter().get());
        return Ok(());
    }

    let report = pool.run_with_report()?;
    if cli.json {
        println!("{}", report.to_json()?);
    } else {
        println!("{}", report.final_count);
    }

    if report.cancelled {
        log::warn!(
            "run cancelled ({}) after {} of {} increments",
            report
                .cancellation_reason
                .as_ref()
                .map(|r| r.to_string())
                .unwrap_or_else(|| "unknown".to_string()),
            report.final_count,
            report.expected
        );
    } else if report.lost_updates() > 0 {
        log::info!(
            "{} updates lost under the {} policy",
            report.lost_updates(),
            report.policy
        );
    }
    Ok(())
}

/// Process exit status for a failed run: 2 when the OS refused a thread
fn exit_status(err: &ThreadError) -> u8 {
    if err.is_spawn_error() {
        2
    } else {
        1
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    log::debug!("{:?}", cli);

    match execute(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(exit_status(&e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["worker-harness"]);
        assert_eq!(cli.iterations, 100_000);
        assert_eq!(cli.policy, CoordinationPolicy::Atomic);
        assert!(!cli.detach);

        let config = cli.to_config();
        assert_eq!(config.num_workers, num_cpus::get());
        assert!(config.cancel_after.is_none());
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::parse_from([
            "worker-harness",
            "--workers",
            "2",
            "--iterations",
            "500",
            "--policy",
            "unsync",
            "--delay-ms",
            "3",
            "--timeout-ms",
            "250",
            "--yield",
        ]);
        let config = cli.to_config();

        assert_eq!(config.num_workers, 2);
        assert_eq!(config.iterations_per_worker, 500);
        assert_eq!(config.policy, CoordinationPolicy::Unsynchronized);
        assert_eq!(config.iteration_delay, Some(Duration::from_millis(3)));
        assert_eq!(config.cancel_after, Some(Duration::from_millis(250)));
        assert!(config.yield_between_iterations);
    }

    #[test]
    fn test_cli_rejects_unknown_policy() {
        assert!(Cli::try_parse_from(["worker-harness", "--policy", "spin"]).is_err());
    }

    #[test]
    fn test_json_conflicts_with_detach() {
        assert!(Cli::try_parse_from(["worker-harness", "--json", "--detach"]).is_err());
    }

    #[test]
    fn test_exit_status() {
        assert_eq!(exit_status(&ThreadError::spawn(0, "Resource temporarily unavailable")), 2);
        assert_eq!(exit_status(&ThreadError::join(1, "Worker panicked: boom")), 1);
        assert_eq!(exit_status(&ThreadError::invalid_policy("spin")), 1);
    }

    #[test]
    fn test_execute_rejects_invalid_config() {
        let cli = Cli::parse_from(["worker-harness", "--thread-prefix", ""]);
        let err = execute(&cli).unwrap_err();
        assert!(matches!(err, ThreadError::InvalidConfig { .. }));
        assert_eq!(exit_status(&err), 1);
    }

    #[test]
    fn test_execute_runs_joined_and_detached() {
        let joined = Cli::parse_from(["worker-harness", "-w", "2", "-i", "1000", "--json"]);
        assert!(execute(&joined).is_ok());

        let detached = Cli::parse_from(["worker-harness", "-w", "2", "-i", "1000", "--detach"]);
        assert!(execute(&detached).is_ok());
    }
}
