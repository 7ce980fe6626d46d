//! Pipeline orchestration
//!
//! Builds the communication mesh, spawns one shared-nothing stage per
//! rank, distributes the base prime set, brackets the timed region with
//! barriers, and assembles the final result on the coordinating rank.

use crate::channel::{Backend, ChannelConfig};
use crate::comm::{GroupComm, ThreadGroup};
use crate::error::{Error, Result};
use crate::partition::{self, Partition};
use crate::sieve;
use crate::stage::{self, StageReport};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Rank of the coordinating stage: computes the base set, owns the clock,
/// receives the reductions
pub const COORDINATOR: usize = 0;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Number of stages in the chain
    pub workers: usize,

    /// Configuration for every inter-stage link
    pub channel: ChannelConfig,

    /// Pin each stage thread to a CPU core
    pub pin_stages: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: num_cpus::get(),
            channel: ChannelConfig::default(),
            pin_stages: false,
        }
    }
}

impl PipelineConfig {
    /// Create a new pipeline configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of stages
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Set the capacity of each inter-stage link
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel.capacity = capacity;
        self
    }

    /// Set the channel backend for every link
    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.channel.backend = backend;
        self
    }

    /// Enable pinning stage threads to CPU cores
    pub fn with_pinned_stages(mut self, pin: bool) -> Self {
        self.pin_stages = pin;
        self
    }
}

/// The outcome of one full pipeline run
#[derive(Debug, Clone)]
pub struct SieveRun {
    /// Every prime `<= n`: the base set followed by the last stage's
    /// survivors, ascending
    pub primes: Vec<u64>,

    /// Wall-clock time of the barrier-bracketed streaming region
    pub elapsed: Duration,

    /// Candidates proven composite somewhere in the chain, summed across
    /// stages by the closing reduction
    pub composites_dropped: u64,

    /// Per-stage counters, in rank order
    pub reports: Vec<StageReport>,
}

/// Per-rank results carried back through the stage's join handle
struct RankOutcome {
    report: StageReport,
    base: Option<Vec<u64>>,
    elapsed: Option<Duration>,
    dropped_total: Option<u64>,
}

/// A configured sieving pipeline
///
/// One `Pipeline` can run any number of bounds; every run builds a fresh
/// mesh and a fresh set of stage threads.
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Validate the configuration and create the pipeline
    pub fn new(config: PipelineConfig) -> Result<Self> {
        if config.workers == 0 {
            return Err(Error::InvalidConfig(
                "pipeline needs at least one stage".to_string(),
            ));
        }
        Ok(Self { config })
    }

    /// The pipeline's configuration
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Sieve `[2, n]` through the chain and collect the primes
    pub fn run(&self, n: u64) -> Result<SieveRun> {
        let size = self.config.workers;
        info!(n, stages = size, "starting pipelined sieve");

        let members = ThreadGroup::mesh(size, &self.config.channel)?;
        let pin = self.config.pin_stages;

        let mut handles = Vec::with_capacity(size);
        for member in members {
            let rank = member.rank();
            let builder = thread::Builder::new().name(format!("stage-{}", rank));

            let handle = builder
                .spawn(move || {
                    if pin {
                        if let Some(core_ids) = core_affinity::get_core_ids() {
                            if !core_ids.is_empty() {
                                core_affinity::set_for_current(core_ids[rank % core_ids.len()]);
                            }
                        }
                    }

                    drive_stage(&member, n)
                })
                .map_err(|e| Error::Other(format!("failed to spawn stage thread: {}", e)))?;

            handles.push(handle);
        }

        let mut outcomes = Vec::with_capacity(size);
        for handle in handles {
            let outcome = handle
                .join()
                .map_err(|_| Error::StagePanicked("stage thread panicked".to_string()))??;
            outcomes.push(outcome);
        }

        assemble(outcomes)
    }
}

/// The life of one rank: take delivery of a partition, run the stage
/// between the barriers, settle the closing reduction.
fn drive_stage<C: GroupComm>(comm: &C, n: u64) -> Result<RankOutcome> {
    let rank = comm.rank();
    let size = comm.size();

    let (base, padded) = if rank == COORDINATOR {
        let base = sieve::base_primes(sieve::isqrt(n));
        let padded = partition::pad(&base, size);
        (Some(base), Some(padded))
    } else {
        (None, None)
    };

    let chunk_len = comm.broadcast(
        padded.as_ref().map_or(0, |padded| padded.len() / size),
        COORDINATOR,
    )?;
    let block = comm.scatter_blocks(padded.as_deref(), chunk_len, COORDINATOR)?;
    let local = Partition::new(block);
    debug!(rank, slots = local.len(), "partition received");

    comm.barrier();
    let started = (rank == COORDINATOR).then(Instant::now);

    let report = stage::run_stage(comm, &local, sieve::candidates(n))?;

    comm.barrier();
    let elapsed = started.map(|started| started.elapsed());

    let dropped_total = comm.reduce_sum(report.dropped, COORDINATOR)?;

    Ok(RankOutcome {
        report,
        base,
        elapsed,
        dropped_total,
    })
}

/// Merge the per-rank outcomes into the run result
fn assemble(mut outcomes: Vec<RankOutcome>) -> Result<SieveRun> {
    let coordinator = outcomes
        .first_mut()
        .ok_or_else(|| Error::Other("no stages ran".to_string()))?;

    let mut primes = coordinator
        .base
        .take()
        .ok_or_else(|| Error::Other("coordinator produced no base set".to_string()))?;
    let elapsed = coordinator
        .elapsed
        .take()
        .ok_or_else(|| Error::Other("coordinator took no timing".to_string()))?;
    let composites_dropped = coordinator
        .dropped_total
        .take()
        .ok_or_else(|| Error::Other("closing reduction never landed".to_string()))?;

    let reports: Vec<StageReport> = outcomes.into_iter().map(|o| o.report).collect();
    if let Some(last) = reports.last() {
        primes.extend_from_slice(&last.survivors);
    }

    info!(primes = primes.len(), ?elapsed, "pipeline drained");
    Ok(SieveRun {
        primes,
        elapsed,
        composites_dropped,
        reports,
    })
}

/// Wall-clock comparison between the sequential baseline and a pipeline run
#[derive(Debug, Clone, Copy)]
pub struct RunMetrics {
    /// Elapsed time of the trusted sequential sieve
    pub sequential: Duration,

    /// Elapsed time of the pipeline's streaming region
    pub parallel: Duration,
}

impl RunMetrics {
    /// Sequential time divided by parallel time
    pub fn speedup(&self) -> f64 {
        let parallel = self.parallel.as_secs_f64();
        if parallel == 0.0 {
            return 0.0;
        }
        self.sequential.as_secs_f64() / parallel
    }

    /// Speedup divided by the stage count, as a percentage
    pub fn efficiency(&self, workers: usize) -> f64 {
        if workers == 0 {
            return 0.0;
        }
        self.speedup() / workers as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sieve::sequential_primes;

    fn run(n: u64, workers: usize) -> SieveRun {
        let config = PipelineConfig::new().with_workers(workers);
        Pipeline::new(config).unwrap().run(n).unwrap()
    }

    #[test]
    fn test_zero_workers_is_rejected() {
        let result = Pipeline::new(PipelineConfig::new().with_workers(0));
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_single_stage_matches_the_sequential_sieve() {
        let outcome = run(30, 1);

        assert_eq!(outcome.primes, sequential_primes(30));
        assert_eq!(
            outcome.reports[0].survivors,
            vec![7, 11, 13, 17, 19, 23, 29]
        );
    }

    #[test]
    fn test_stage_count_never_changes_the_verdict() {
        let expected = sequential_primes(200);
        for workers in [1, 2, 3, 5, 7] {
            assert_eq!(run(200, workers).primes, expected, "workers = {}", workers);
        }
    }

    #[test]
    fn test_three_stages_with_an_all_padding_tail() {
        // Base primes of 100 are [2, 3, 5, 7]; over three stages the last
        // chunk is pure padding and must drop nothing.
        let outcome = run(100, 3);

        assert_eq!(outcome.primes, sequential_primes(100));
        let last = &outcome.reports[2];
        assert_eq!(last.dropped, 0);
        assert_eq!(last.tested, last.survivors.len() as u64);
    }

    #[test]
    fn test_sentinel_travels_the_chain_exactly_once() {
        let outcome = run(100, 4);

        assert_eq!(outcome.reports.len(), 4);
        for report in &outcome.reports[..3] {
            assert!(report.sentinel_sent, "rank {}", report.rank);
        }
        assert!(!outcome.reports[3].sentinel_sent);
    }

    #[test]
    fn test_dropped_reduction_accounts_for_every_composite() {
        let n = 500;
        let outcome = run(n, 3);

        let candidates = sieve::candidates(n).count() as u64;
        let survived = outcome.reports.last().unwrap().survivors.len() as u64;
        assert_eq!(outcome.composites_dropped, candidates - survived);
    }

    #[test]
    fn test_tiny_bounds() {
        assert_eq!(run(1, 2).primes, Vec::<u64>::new());
        assert_eq!(run(2, 2).primes, vec![2]);
        assert_eq!(run(3, 2).primes, vec![2, 3]);
        assert_eq!(run(4, 3).primes, vec![2, 3]);
    }

    #[test]
    fn test_more_stages_than_base_primes() {
        // Base primes of 30 are [2, 3, 5]; five stages leave two of them
        // with nothing but padding.
        let outcome = run(30, 5);
        assert_eq!(outcome.primes, sequential_primes(30));
    }

    #[test]
    fn test_crossbeam_backed_run() {
        let config = PipelineConfig::new()
            .with_workers(2)
            .with_backend(Backend::Crossbeam);
        let outcome = Pipeline::new(config).unwrap().run(50).unwrap();
        assert_eq!(outcome.primes, sequential_primes(50));
    }

    #[test]
    fn test_metrics_arithmetic() {
        let metrics = RunMetrics {
            sequential: Duration::from_millis(400),
            parallel: Duration::from_millis(100),
        };

        assert!((metrics.speedup() - 4.0).abs() < 1e-9);
        assert!((metrics.efficiency(8) - 50.0).abs() < 1e-9);
    }
}
