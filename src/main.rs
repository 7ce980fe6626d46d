//! Pipelined Prime Sieve CLI
//!
//! Sieves `[2, N]` through a chain of shared-nothing stages and reports
//! the wall-clock comparison against the sequential baseline.
//!
//! # Example
//!
//! ```bash
//! # Sieve up to ten million over four stages
//! sieve-pipeline 10000000 --workers 4
//!
//! # Pin stages to cores and print every prime found
//! sieve-pipeline 1000 -w 2 --pin --print-primes
//! ```

use clap::Parser;
use sieve_pipeline::pipeline::{Pipeline, PipelineConfig, RunMetrics};
use sieve_pipeline::sieve;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Pipelined parallel prime sieve
#[derive(Parser, Debug)]
#[command(name = "sieve-pipeline")]
#[command(version, about, long_about = None)]
struct Args {
    /// Upper bound of the sieved range (inclusive)
    #[arg(value_name = "N")]
    n: u64,

    /// Number of pipeline stages (defaults to the number of CPUs)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Capacity of each inter-stage link
    #[arg(long, default_value_t = 1024)]
    capacity: usize,

    /// Pin each stage thread to a CPU core
    #[arg(long)]
    pin: bool,

    /// Print every prime found, not just the count
    #[arg(long)]
    print_primes: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    if let Err(e) = run(args) {
        eprintln!("sieve-pipeline: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> sieve_pipeline::Result<()> {
    let workers = args.workers.unwrap_or_else(num_cpus::get);

    let baseline_start = Instant::now();
    let baseline = sieve::sequential_primes(args.n);
    let sequential = baseline_start.elapsed();

    let config = PipelineConfig::new()
        .with_workers(workers)
        .with_channel_capacity(args.capacity)
        .with_pinned_stages(args.pin);
    let outcome = Pipeline::new(config)?.run(args.n)?;

    debug_assert_eq!(outcome.primes, baseline);

    let metrics = RunMetrics {
        sequential,
        parallel: outcome.elapsed,
    };

    println!(
        "primes <= {}: {}  ({} composites dropped in-flight)",
        args.n,
        outcome.primes.len(),
        outcome.composites_dropped
    );
    println!(
        "parallel    {:>12.6} s  ({} stages)",
        outcome.elapsed.as_secs_f64(),
        workers
    );
    println!("sequential  {:>12.6} s", sequential.as_secs_f64());
    println!("speedup     {:>12.2}", metrics.speedup());
    println!("efficiency  {:>11.1} %", metrics.efficiency(workers));

    if args.print_primes {
        for prime in &outcome.primes {
            println!("{}", prime);
        }
    }

    Ok(())
}
