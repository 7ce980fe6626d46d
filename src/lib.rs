//! # Pipelined Parallel Prime Sieve
//!
//! A shared-nothing sieving pipeline for Rust: candidate integers stream
//! through a chain of isolated worker stages, each holding a disjoint
//! slice of the base prime set, and an integer is prime exactly when it
//! survives every stage.
//!
//! ## Key Properties
//!
//! - **Zero-sharing by design**: each stage owns its partition outright
//! - **FIFO message passing**: candidates are tested in ascending order at
//!   every stage
//! - **Tagged sentinels**: stream termination and partition padding are
//!   two distinct enum variants, never a shared magic value
//! - **Pluggable transport**: the stages speak only to the [`GroupComm`]
//!   trait; the bundled transport is a thread-backed link mesh
//! - **CPU affinity**: optional pinning of stages to specific cores
//!
//! ## Architecture
//!
//! ```text
//!               base primes <= sqrt(N), padded and scattered
//!          ┌───────────────┬───────────────┬───────────────┐
//!          ▼               ▼               ▼               ▼
//!    ┌───────────┐   ┌───────────┐   ┌───────────┐   ┌───────────┐
//!    │  Stage 0  │──>│  Stage 1  │──>│  Stage 2  │──>│  Stage 3  │
//!    │ (source)  │   │ (filter)  │   │ (filter)  │   │ (collect) │
//!    └───────────┘   └───────────┘   └───────────┘   └───────────┘
//!     generates       drops local     drops local     survivors are
//!     candidates      composites      composites      proven prime
//!
//!     candidates flow left to right; the end-of-stream sentinel
//!     travels the same path exactly once, last
//! ```

#![warn(missing_docs, rust_2018_idioms)]
#![allow(dead_code)]

pub mod channel;
pub mod comm;
pub mod error;
pub mod message;
pub mod partition;
pub mod pipeline;
pub mod sieve;
pub mod stage;

// Re-exports
pub use channel::{Backend, Channel, ChannelConfig, Receiver, Sender};
pub use comm::{GroupComm, ThreadGroup};
pub use error::{Error, Result};
pub use message::{Frame, StageMessage};
pub use partition::{BaseEntry, Partition};
pub use pipeline::{Pipeline, PipelineConfig, RunMetrics, SieveRun};
pub use stage::{ChainLinks, StageReport, StageState};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::channel::{Channel, ChannelConfig, Receiver, Sender};
    pub use crate::comm::{GroupComm, ThreadGroup};
    pub use crate::error::{Error, Result};
    pub use crate::message::{Frame, StageMessage};
    pub use crate::partition::{BaseEntry, Partition};
    pub use crate::pipeline::{Pipeline, PipelineConfig, SieveRun};
    pub use crate::stage::{ChainLinks, StageReport};
}
