//! End-to-end demo: four stages sieving a small range

use sieve_pipeline::pipeline::{Pipeline, PipelineConfig};

fn main() -> sieve_pipeline::Result<()> {
    println!("=== Pipelined Sieve Demo ===\n");

    let n = 10_000;
    let config = PipelineConfig::new()
        .with_workers(4)
        .with_channel_capacity(256);

    let outcome = Pipeline::new(config)?.run(n)?;

    println!("primes <= {}: {}", n, outcome.primes.len());
    println!("first ten: {:?}", &outcome.primes[..10]);
    println!(
        "last ten:  {:?}\n",
        &outcome.primes[outcome.primes.len() - 10..]
    );

    for report in &outcome.reports {
        println!(
            "stage {}: tested {:>5}  dropped {:>5}  forwarded {:>5}",
            report.rank, report.tested, report.dropped, report.forwarded
        );
    }

    println!("\ndrained in {:?}", outcome.elapsed);
    Ok(())
}
