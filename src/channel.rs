//! Point-to-point FIFO links between pipeline stages
//!
//! Every ordered pair of adjacent ranks gets its own single-producer,
//! single-consumer link, so messages are delivered in exactly the order
//! they were sent. Sends and receives block; the pipeline design has no
//! timeout or cancellation mechanism, so none is offered here.

use crate::error::Result;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Cache line size for padding (typically 64 bytes on x86-64)
const CACHE_LINE_SIZE: usize = 64;

/// Which channel crate backs a link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// flume channels (default)
    #[default]
    Flume,

    /// crossbeam channels
    Crossbeam,
}

/// Link configuration
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Buffer capacity for bounded links
    pub capacity: usize,

    /// Whether the link is bounded or unbounded
    pub bounded: bool,

    /// Backing channel implementation
    pub backend: Backend,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            capacity: 1024,
            bounded: true,
            backend: Backend::default(),
        }
    }
}

impl ChannelConfig {
    /// Create a new link configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the capacity
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set whether the link is bounded
    pub fn with_bounded(mut self, bounded: bool) -> Self {
        self.bounded = bounded;
        self
    }

    /// Set the backing channel implementation
    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }
}

/// Traffic counters for one link
#[repr(align(64))] // Align to cache line
#[derive(Debug)]
pub struct ChannelStats {
    /// Number of messages sent
    pub messages_sent: AtomicU64,

    /// Number of messages received
    pub messages_received: AtomicU64,

    _padding: [u8; CACHE_LINE_SIZE - 16], // Pad to cache line
}

impl Default for ChannelStats {
    fn default() -> Self {
        Self {
            messages_sent: AtomicU64::new(0),
            messages_received: AtomicU64::new(0),
            _padding: [0; CACHE_LINE_SIZE - 16],
        }
    }
}

impl ChannelStats {
    /// Get the number of messages sent
    pub fn sent(&self) -> u64 {
        self.messages_sent.load(Ordering::Relaxed)
    }

    /// Get the number of messages received
    pub fn received(&self) -> u64 {
        self.messages_received.load(Ordering::Relaxed)
    }
}

/// Sender half of a link
pub struct Sender<T> {
    inner: SenderInner<T>,
    stats: Arc<ChannelStats>,
}

enum SenderInner<T> {
    Flume(flume::Sender<T>),
    Crossbeam(crossbeam::channel::Sender<T>),
}

impl<T> Sender<T> {
    /// Send a message, blocking while the link is full
    pub fn send(&self, msg: T) -> Result<()> {
        match &self.inner {
            SenderInner::Flume(s) => s.send(msg)?,
            SenderInner::Crossbeam(s) => s.send(msg)?,
        }
        self.stats.messages_sent.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Get link statistics
    pub fn stats(&self) -> Arc<ChannelStats> {
        Arc::clone(&self.stats)
    }
}

/// Receiver half of a link
pub struct Receiver<T> {
    inner: ReceiverInner<T>,
    stats: Arc<ChannelStats>,
}

enum ReceiverInner<T> {
    Flume(flume::Receiver<T>),
    Crossbeam(crossbeam::channel::Receiver<T>),
}

impl<T> Receiver<T> {
    /// Receive the next message, blocking until one is available
    ///
    /// Errors only when the sending side is gone, which in this design
    /// means the upstream stage failed and the run is being torn down.
    pub fn recv(&self) -> Result<T> {
        let msg = match &self.inner {
            ReceiverInner::Flume(r) => r.recv()?,
            ReceiverInner::Crossbeam(r) => r.recv()?,
        };
        self.stats.messages_received.fetch_add(1, Ordering::Relaxed);
        Ok(msg)
    }

    /// Get link statistics
    pub fn stats(&self) -> Arc<ChannelStats> {
        Arc::clone(&self.stats)
    }
}

/// Link factory
pub struct Channel;

impl Channel {
    /// Create a new link with the given configuration
    pub fn link<T>(config: &ChannelConfig) -> (Sender<T>, Receiver<T>) {
        let stats = Arc::new(ChannelStats::default());

        let (sender, receiver) = match config.backend {
            Backend::Flume => {
                let (tx, rx) = if config.bounded {
                    flume::bounded(config.capacity)
                } else {
                    flume::unbounded()
                };
                (SenderInner::Flume(tx), ReceiverInner::Flume(rx))
            }
            Backend::Crossbeam => {
                let (tx, rx) = if config.bounded {
                    crossbeam::channel::bounded(config.capacity)
                } else {
                    crossbeam::channel::unbounded()
                };
                (SenderInner::Crossbeam(tx), ReceiverInner::Crossbeam(rx))
            }
        };

        (
            Sender {
                inner: sender,
                stats: Arc::clone(&stats),
            },
            Receiver {
                inner: receiver,
                stats,
            },
        )
    }

    /// Create a bounded link with the default configuration
    pub fn bounded<T>(capacity: usize) -> (Sender<T>, Receiver<T>) {
        Self::link(&ChannelConfig::new().with_capacity(capacity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let (tx, rx) = Channel::bounded::<u64>(128);

        for i in 0..100 {
            tx.send(i).unwrap();
        }
        for i in 0..100 {
            assert_eq!(rx.recv().unwrap(), i);
        }
    }

    #[test]
    fn test_stats_count_traffic() {
        let (tx, rx) = Channel::bounded::<u64>(8);

        for i in 0..5 {
            tx.send(i).unwrap();
        }
        for _ in 0..5 {
            rx.recv().unwrap();
        }

        assert_eq!(tx.stats().sent(), 5);
        assert_eq!(rx.stats().received(), 5);
    }

    #[test]
    fn test_crossbeam_backend() {
        let config = ChannelConfig::new()
            .with_capacity(4)
            .with_backend(Backend::Crossbeam);
        let (tx, rx) = Channel::link::<&str>(&config);

        tx.send("first").unwrap();
        tx.send("second").unwrap();
        assert_eq!(rx.recv().unwrap(), "first");
        assert_eq!(rx.recv().unwrap(), "second");
    }

    #[test]
    fn test_recv_errors_after_sender_drop() {
        let (tx, rx) = Channel::bounded::<u64>(4);
        tx.send(9).unwrap();
        drop(tx);

        assert_eq!(rx.recv().unwrap(), 9);
        assert!(rx.recv().is_err());
    }
}
