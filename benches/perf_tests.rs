//! Throughput comparison: the fastlog pipeline vs a tracing-appender
//! non-blocking rolling subscriber, both writing the same records.
//!
//! Run with: cargo bench --bench perf_tests

use std::fs;
use std::time::Instant;

use tracing::{info, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use fastlog::{config, init_log, log_info, uninit_log};

const ITERATIONS: usize = 200_000;
const FASTLOG_DIR: &str = "./bench_fastlog";
const TRACING_DIR: &str = "./bench_tracing";

#[derive(Debug)]
struct TestEvent {
    id: i32,
    active: bool,
    large_number: u64,
    description: String,
}

impl std::fmt::Display for TestEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Event[id={}, active={}, large_number={}, desc={}]",
            self.id, self.active, self.large_number, self.description
        )
    }
}

fn test_event() -> TestEvent {
    TestEvent {
        id: 42,
        active: true,
        large_number: u64::MAX,
        description: "This is a longer description that includes some special characters \
                      !@#$%^&*() and provides more context about the event. It also contains \
                      some metrics like CPU: 95%, Memory: 2.5GB, Network: 1.2Gbps"
            .to_string(),
    }
}

fn cleanup() {
    let _ = fs::remove_dir_all(FASTLOG_DIR);
    let _ = fs::remove_dir_all(TRACING_DIR);
}

fn dir_size(dir: &str) -> u64 {
    fs::read_dir(dir)
        .map(|entries| {
            entries
                .flatten()
                .filter_map(|entry| entry.metadata().ok())
                .map(|metadata| metadata.len())
                .sum()
        })
        .unwrap_or(0)
}

fn setup_tracing() -> (impl tracing::Subscriber + Send + Sync, WorkerGuard) {
    let file_appender = tracing_appender::rolling::RollingFileAppender::builder()
        .rotation(tracing_appender::rolling::Rotation::NEVER)
        .filename_prefix("traditional")
        .filename_suffix("log")
        .build(TRACING_DIR)
        .unwrap();

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let subscriber = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_target(false)
                .with_line_number(true)
                .with_file(true)
                .with_level(true),
        )
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()));

    (subscriber, guard)
}

fn run_fastlog(event: &TestEvent) -> f64 {
    config::set_log_dir(FASTLOG_DIR);
    config::set_min_log_level(fastlog::Level::Info);
    config::set_max_log_size(50);
    config::set_log_flush_interval(3);
    config::set_log_stderr(false);
    init_log("bench");

    let start = Instant::now();
    for i in 0..ITERATIONS {
        log_info!("Test perf: iteration={}, event={}", i, event);
    }
    let elapsed = start.elapsed();
    uninit_log();
    elapsed.as_secs_f64() * 1000.0
}

fn run_tracing(event: &TestEvent) -> f64 {
    let (subscriber, guard) = setup_tracing();
    let scope = tracing::subscriber::set_default(subscriber);

    let start = Instant::now();
    for i in 0..ITERATIONS {
        info!(iteration = i, event = %event, "Test perf");
    }
    let elapsed = start.elapsed();
    drop(scope);
    drop(guard);
    elapsed.as_secs_f64() * 1000.0
}

fn calculate_statistics(times: &[f64]) -> (f64, f64, f64, f64) {
    let mean = times.iter().sum::<f64>() / times.len() as f64;
    let variance = times.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / times.len() as f64;
    let std_dev = variance.sqrt();
    let min = times.iter().fold(f64::INFINITY, |a, &b| a.min(b));
    let max = times.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
    (mean, std_dev, min, max)
}

fn main() {
    let single_run = std::env::var("SINGLE_ITERATION").is_ok();
    let num_runs = if single_run { 1 } else { 5 };

    let event = test_event();
    let mut fastlog_times = Vec::with_capacity(num_runs);
    let mut tracing_times = Vec::with_capacity(num_runs);

    println!(
        "\nRunning {} comparison runs ({} records each):\n",
        num_runs, ITERATIONS
    );

    for run in 1..=num_runs {
        cleanup();

        let fastlog_ms = run_fastlog(&event);
        let tracing_ms = run_tracing(&event);

        println!(
            "Run {}: fastlog {:.3} ms, tracing {:.3} ms, speedup {:.2}x",
            run,
            fastlog_ms,
            tracing_ms,
            tracing_ms / fastlog_ms
        );
        println!(
            "        fastlog wrote {:.2} MB, tracing wrote {:.2} MB",
            dir_size(FASTLOG_DIR) as f64 / (1024.0 * 1024.0),
            dir_size(TRACING_DIR) as f64 / (1024.0 * 1024.0)
        );

        fastlog_times.push(fastlog_ms);
        tracing_times.push(tracing_ms);
    }

    let (fl_mean, fl_std, fl_min, fl_max) = calculate_statistics(&fastlog_times);
    let (tr_mean, tr_std, tr_min, tr_max) = calculate_statistics(&tracing_times);

    println!(
        "\nfastlog:  mean {:.3} ms, std {:.3} ms, range {:.3} - {:.3} ms",
        fl_mean, fl_std, fl_min, fl_max
    );
    println!(
        "tracing:  mean {:.3} ms, std {:.3} ms, range {:.3} - {:.3} ms",
        tr_mean, tr_std, tr_min, tr_max
    );
    println!("average speedup: {:.1}x", tr_mean / fl_mean);
    println!(
        "throughput: {:.2} million records/sec",
        ITERATIONS as f64 / (fl_mean / 1000.0) / 1_000_000.0
    );

    cleanup();
}
