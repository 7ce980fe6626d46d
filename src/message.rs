//! Message types carried between pipeline stages
//!
//! Stream termination and partition padding are deliberately two distinct
//! tagged types ([`StageMessage::EndOfStream`] here,
//! [`crate::partition::BaseEntry::Padding`] in the partition module) rather
//! than a shared reserved integer.

use crate::error::{Error, Result};
use crate::partition::BaseEntry;

#[cfg(feature = "serialization")]
use serde::{Deserialize, Serialize};

/// A message on the candidate stream between two adjacent stages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub enum StageMessage {
    /// An integer whose primality is still undecided
    Candidate(u64),

    /// Sentinel: no more candidates will follow on this link
    EndOfStream,
}

/// A typed payload on a group link
///
/// Every operation of the group service puts exactly one variant on the
/// wire, and every receive site expects exactly one variant. A mismatch is
/// a [`Error::Protocol`] error, never a silent coercion.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub enum Frame {
    /// A broadcast length (per-stage chunk size)
    Len(usize),

    /// One scattered block of the padded base prime set
    Block(Vec<BaseEntry>),

    /// A candidate-stream message
    Stage(StageMessage),

    /// A partial sum for a reduction
    Sum(u64),
}

impl Frame {
    /// Extract a broadcast length
    pub fn into_len(self) -> Result<usize> {
        match self {
            Frame::Len(len) => Ok(len),
            other => Err(Error::Protocol(format!("expected Len frame, got {:?}", other))),
        }
    }

    /// Extract a scattered block
    pub fn into_block(self) -> Result<Vec<BaseEntry>> {
        match self {
            Frame::Block(block) => Ok(block),
            other => Err(Error::Protocol(format!("expected Block frame, got {:?}", other))),
        }
    }

    /// Extract a candidate-stream message
    pub fn into_stage(self) -> Result<StageMessage> {
        match self {
            Frame::Stage(msg) => Ok(msg),
            other => Err(Error::Protocol(format!("expected Stage frame, got {:?}", other))),
        }
    }

    /// Extract a reduction operand
    pub fn into_sum(self) -> Result<u64> {
        match self {
            Frame::Sum(value) => Ok(value),
            other => Err(Error::Protocol(format!("expected Sum frame, got {:?}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_accessors() {
        assert_eq!(Frame::Len(3).into_len().unwrap(), 3);
        assert_eq!(Frame::Sum(41).into_sum().unwrap(), 41);
        assert_eq!(
            Frame::Stage(StageMessage::Candidate(7)).into_stage().unwrap(),
            StageMessage::Candidate(7)
        );
        assert_eq!(
            Frame::Block(vec![BaseEntry::Prime(2), BaseEntry::Padding])
                .into_block()
                .unwrap(),
            vec![BaseEntry::Prime(2), BaseEntry::Padding]
        );
    }

    #[test]
    fn test_frame_mismatch_is_protocol_error() {
        let err = Frame::Len(1).into_stage().unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));

        let err = Frame::Stage(StageMessage::EndOfStream).into_sum().unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[test]
    fn test_sentinel_is_distinct_from_every_candidate() {
        for c in [0, 1, u64::MAX] {
            assert_ne!(StageMessage::Candidate(c), StageMessage::EndOfStream);
        }
    }
}
