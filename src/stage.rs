//! Pipeline stages: per-rank filtering over the candidate stream
//!
//! Rank 0 generates the candidate stream, every later rank consumes its
//! predecessor's survivors, and the last rank collects what nothing could
//! divide. The chain is an explicit linear topology resolved once at
//! startup rather than rank arithmetic scattered through the loops.

use crate::comm::GroupComm;
use crate::error::Result;
use crate::message::{Frame, StageMessage};
use crate::partition::Partition;
use std::ops::RangeInclusive;
use tracing::debug;

#[cfg(feature = "serialization")]
use serde::{Deserialize, Serialize};

/// One stage's neighbours in the chain, fixed for the life of the run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainLinks {
    /// Rank this stage receives from (`None` for the source)
    pub predecessor: Option<usize>,

    /// Rank this stage forwards to (`None` for the collector)
    pub successor: Option<usize>,
}

impl ChainLinks {
    /// Resolve the neighbours of `rank` in a chain of `size` stages
    pub fn resolve(rank: usize, size: usize) -> Self {
        Self {
            predecessor: rank.checked_sub(1),
            successor: (rank + 1 < size).then(|| rank + 1),
        }
    }

    /// True for the stage that generates the candidate stream
    pub fn is_source(&self) -> bool {
        self.predecessor.is_none()
    }

    /// True for the stage where surviving candidates are proven prime
    pub fn is_last(&self) -> bool {
        self.successor.is_none()
    }
}

/// Lifecycle of a filter stage
///
/// `Testing` and `Forwarding` carry the candidate they hold; no stage ever
/// holds more than one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageState {
    /// Blocked on the predecessor link
    AwaitingInput,

    /// Holding a candidate, testing it against the local partition
    Testing(u64),

    /// Holding a survivor, handing it downstream (or collecting it)
    Forwarding(u64),

    /// Sentinel seen; the stage has stopped
    Terminated,
}

/// What one stage did during a run
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub struct StageReport {
    /// The stage's rank in the chain
    pub rank: usize,

    /// Candidates tested against the local partition
    pub tested: u64,

    /// Candidates proven composite here
    pub dropped: u64,

    /// Candidates handed to the successor
    pub forwarded: u64,

    /// Whether this stage put the sentinel on its outgoing link
    pub sentinel_sent: bool,

    /// Proven primes; populated only on the last stage
    pub survivors: Vec<u64>,
}

/// Run this member's stage to completion
///
/// The candidate range is consumed by the source rank only; filter ranks
/// ignore it and drain their predecessor instead. Returns once the
/// sentinel has passed through (or, on the source, once the range is
/// exhausted and the sentinel is sent).
pub fn run_stage<C: GroupComm>(
    comm: &C,
    partition: &Partition,
    candidates: RangeInclusive<u64>,
) -> Result<StageReport> {
    let links = ChainLinks::resolve(comm.rank(), comm.size());
    let mut report = StageReport {
        rank: comm.rank(),
        ..StageReport::default()
    };

    match links.predecessor {
        None => run_source(comm, links, partition, candidates, &mut report)?,
        Some(predecessor) => run_filter(comm, links, predecessor, partition, &mut report)?,
    }

    debug!(
        rank = report.rank,
        tested = report.tested,
        dropped = report.dropped,
        forwarded = report.forwarded,
        "stage drained"
    );
    Ok(report)
}

/// Source role: generate candidates in ascending order, filter them
/// against the local chunk, forward survivors, then inject the sentinel
/// exactly once.
fn run_source<C: GroupComm>(
    comm: &C,
    links: ChainLinks,
    partition: &Partition,
    candidates: RangeInclusive<u64>,
    report: &mut StageReport,
) -> Result<()> {
    for candidate in candidates {
        report.tested += 1;
        if partition.divides(candidate) {
            report.dropped += 1;
            continue;
        }

        match links.successor {
            Some(next) => {
                comm.send(next, Frame::Stage(StageMessage::Candidate(candidate)))?;
                report.forwarded += 1;
            }
            // A one-stage chain: the source is also the collector
            None => report.survivors.push(candidate),
        }
    }

    if let Some(next) = links.successor {
        comm.send(next, Frame::Stage(StageMessage::EndOfStream))?;
        report.sentinel_sent = true;
    }

    Ok(())
}

/// Filter role: the stage state machine
///
/// Candidates arrive in ascending order on the predecessor link; the
/// sentinel is forwarded exactly once and only when a successor exists.
fn run_filter<C: GroupComm>(
    comm: &C,
    links: ChainLinks,
    predecessor: usize,
    partition: &Partition,
    report: &mut StageReport,
) -> Result<()> {
    let mut state = StageState::AwaitingInput;

    loop {
        state = match state {
            StageState::AwaitingInput => match comm.recv(predecessor)?.into_stage()? {
                StageMessage::Candidate(candidate) => StageState::Testing(candidate),
                StageMessage::EndOfStream => {
                    if let Some(next) = links.successor {
                        comm.send(next, Frame::Stage(StageMessage::EndOfStream))?;
                        report.sentinel_sent = true;
                    }
                    StageState::Terminated
                }
            },

            StageState::Testing(candidate) => {
                report.tested += 1;
                if partition.divides(candidate) {
                    report.dropped += 1;
                    StageState::AwaitingInput
                } else {
                    StageState::Forwarding(candidate)
                }
            }

            StageState::Forwarding(candidate) => {
                match links.successor {
                    Some(next) => {
                        comm.send(next, Frame::Stage(StageMessage::Candidate(candidate)))?;
                        report.forwarded += 1;
                    }
                    // Survived every partition in the chain: proven prime
                    None => report.survivors.push(candidate),
                }
                StageState::AwaitingInput
            }

            StageState::Terminated => break,
        };
    }

    Ok(())
}
