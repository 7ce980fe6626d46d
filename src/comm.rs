//! Group communication service
//!
//! [`GroupComm`] abstracts everything the pipeline asks of its messaging
//! runtime: rank and size, blocking point-to-point send/receive, and a
//! barrier. The collectives (broadcast, block scatter, sum reduction) are
//! provided methods built only on those five operations, so any transport
//! that implements the core gets them for free.
//!
//! [`ThreadGroup`] is the in-process transport: one shared-nothing member
//! per OS thread, a dedicated FIFO link for every ordered rank pair, all
//! resolved once at construction time.

use crate::channel::{Channel, ChannelConfig, Receiver, Sender};
use crate::error::{Error, Result};
use crate::message::Frame;
use crate::partition::BaseEntry;
use std::sync::{Arc, Barrier};

/// The operations a pipeline member requires from its messaging runtime
pub trait GroupComm {
    /// This member's rank, `0..size`
    fn rank(&self) -> usize;

    /// Total number of members in the group
    fn size(&self) -> usize;

    /// Send a frame to `to`, blocking while the link is full
    fn send(&self, to: usize, frame: Frame) -> Result<()>;

    /// Receive the next frame from `from`, blocking until one arrives
    fn recv(&self, from: usize) -> Result<Frame>;

    /// Block until every member of the group has arrived
    fn barrier(&self);

    /// Distribute `value` from `root` to every member
    ///
    /// Returns the root's value on every member; the `value` argument of
    /// non-root callers is ignored.
    fn broadcast(&self, value: usize, root: usize) -> Result<usize> {
        if self.rank() == root {
            for peer in 0..self.size() {
                if peer != root {
                    self.send(peer, Frame::Len(value))?;
                }
            }
            Ok(value)
        } else {
            self.recv(root)?.into_len()
        }
    }

    /// Block-distribute `data` from `root`: member `i` receives the
    /// contiguous slice `[i * chunk_len, (i + 1) * chunk_len)`
    ///
    /// Only the root supplies `data`, and its length must be exactly
    /// `chunk_len * size`. Every member, root included, gets its own block
    /// back.
    fn scatter_blocks(
        &self,
        data: Option<&[BaseEntry]>,
        chunk_len: usize,
        root: usize,
    ) -> Result<Vec<BaseEntry>> {
        if self.rank() == root {
            let data = data.ok_or_else(|| {
                Error::InvalidConfig("scatter root must supply the padded set".to_string())
            })?;
            if data.len() != chunk_len * self.size() {
                return Err(Error::InvalidConfig(format!(
                    "scatter of {} entries cannot fill {} blocks of {}",
                    data.len(),
                    self.size(),
                    chunk_len
                )));
            }

            let mut own = Vec::new();
            for peer in 0..self.size() {
                let block = data[peer * chunk_len..(peer + 1) * chunk_len].to_vec();
                if peer == root {
                    own = block;
                } else {
                    self.send(peer, Frame::Block(block))?;
                }
            }
            Ok(own)
        } else {
            self.recv(root)?.into_block()
        }
    }

    /// Sum `value` across the group at `root`
    ///
    /// Returns `Some(total)` on the root and `None` everywhere else.
    fn reduce_sum(&self, value: u64, root: usize) -> Result<Option<u64>> {
        if self.rank() == root {
            let mut total = value;
            for peer in 0..self.size() {
                if peer != root {
                    total += self.recv(peer)?.into_sum()?;
                }
            }
            Ok(Some(total))
        } else {
            self.send(root, Frame::Sum(value))?;
            Ok(None)
        }
    }
}

/// Thread-backed group member over a full mesh of FIFO links
pub struct ThreadGroup {
    rank: usize,
    size: usize,

    /// Outgoing links, indexed by destination rank (`None` for self)
    senders: Vec<Option<Sender<Frame>>>,

    /// Incoming links, indexed by source rank (`None` for self)
    receivers: Vec<Option<Receiver<Frame>>>,

    barrier: Arc<Barrier>,
}

impl ThreadGroup {
    /// Build a group of `size` members with every link resolved up front
    ///
    /// Returns one member per rank, in rank order; each is meant to move
    /// onto its own thread.
    pub fn mesh(size: usize, config: &ChannelConfig) -> Result<Vec<ThreadGroup>> {
        if size == 0 {
            return Err(Error::InvalidConfig(
                "group size must be at least 1".to_string(),
            ));
        }

        let barrier = Arc::new(Barrier::new(size));

        let mut senders: Vec<Vec<Option<Sender<Frame>>>> =
            (0..size).map(|_| (0..size).map(|_| None).collect()).collect();
        let mut receivers: Vec<Vec<Option<Receiver<Frame>>>> =
            (0..size).map(|_| (0..size).map(|_| None).collect()).collect();

        for from in 0..size {
            for to in 0..size {
                if from == to {
                    continue;
                }
                let (tx, rx) = Channel::link(config);
                senders[from][to] = Some(tx);
                receivers[to][from] = Some(rx);
            }
        }

        let members = senders
            .into_iter()
            .zip(receivers)
            .enumerate()
            .map(|(rank, (senders, receivers))| ThreadGroup {
                rank,
                size,
                senders,
                receivers,
                barrier: Arc::clone(&barrier),
            })
            .collect();

        Ok(members)
    }
}

impl GroupComm for ThreadGroup {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn send(&self, to: usize, frame: Frame) -> Result<()> {
        self.senders
            .get(to)
            .and_then(|link| link.as_ref())
            .ok_or_else(|| {
                Error::InvalidConfig(format!("no link from rank {} to rank {}", self.rank, to))
            })?
            .send(frame)
    }

    fn recv(&self, from: usize) -> Result<Frame> {
        self.receivers
            .get(from)
            .and_then(|link| link.as_ref())
            .ok_or_else(|| {
                Error::InvalidConfig(format!("no link from rank {} to rank {}", from, self.rank))
            })?
            .recv()
    }

    fn barrier(&self) {
        self.barrier.wait();
    }
}
