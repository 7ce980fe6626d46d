//! Block distribution of the base prime set across pipeline stages
//!
//! The scatter step hands every stage a contiguous, equal-length chunk of
//! the base set. Equal lengths are forced by padding the tail with an
//! explicit [`BaseEntry::Padding`] marker, which the divisibility test
//! treats as "no constraint here".

#[cfg(feature = "serialization")]
use serde::{Deserialize, Serialize};

/// One slot of the padded base prime set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub enum BaseEntry {
    /// A real base prime
    Prime(u64),

    /// Filler that makes the set length divisible by the stage count;
    /// never tested against a candidate and never equal to a real prime
    Padding,
}

/// Per-stage chunk length for `count` primes over `parts` stages: `ceil(count / parts)`.
pub fn chunk_len(count: usize, parts: usize) -> usize {
    debug_assert!(parts > 0);
    count.div_ceil(parts)
}

/// Pad `primes` so its length divides evenly into `parts` contiguous,
/// equal-length blocks.
///
/// The result has length `ceil(C / parts) * parts`; every index `>= C`
/// holds [`BaseEntry::Padding`]. An empty base set pads to length zero and
/// every block comes out empty.
pub fn pad(primes: &[u64], parts: usize) -> Vec<BaseEntry> {
    debug_assert!(parts > 0);

    let padded_len = chunk_len(primes.len(), parts) * parts;
    let mut padded = Vec::with_capacity(padded_len);
    padded.extend(primes.iter().map(|&p| BaseEntry::Prime(p)));
    padded.resize(padded_len, BaseEntry::Padding);
    padded
}

/// One stage's contiguous slice of the padded base prime set
///
/// Immutable after the scatter; exclusively owned by its stage.
#[derive(Debug, Clone, Default)]
pub struct Partition {
    entries: Vec<BaseEntry>,
}

impl Partition {
    /// Wrap a scattered block
    pub fn new(entries: Vec<BaseEntry>) -> Self {
        Self { entries }
    }

    /// Number of slots (padding included)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if this partition holds no slots at all
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The entries of this partition
    pub fn entries(&self) -> &[BaseEntry] {
        &self.entries
    }

    /// True if any base prime in this partition divides `candidate`
    ///
    /// Padding slots are skipped, so an all-padding partition constrains
    /// nothing and every candidate survives it.
    pub fn divides(&self, candidate: u64) -> bool {
        self.entries.iter().any(|entry| match entry {
            BaseEntry::Prime(p) => candidate % p == 0,
            BaseEntry::Padding => false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn primes_of(padded: &[BaseEntry]) -> Vec<u64> {
        padded
            .iter()
            .filter_map(|e| match e {
                BaseEntry::Prime(p) => Some(*p),
                BaseEntry::Padding => None,
            })
            .collect()
    }

    #[test]
    fn test_padded_length_divides_evenly() {
        for (count, parts) in [(0, 1), (0, 3), (1, 1), (3, 5), (4, 3), (7, 2), (10, 10)] {
            let primes: Vec<u64> = (0..count as u64).map(|i| 2 * i + 3).collect();
            let padded = pad(&primes, parts);

            assert_eq!(padded.len() % parts, 0);
            assert!(padded.len() >= count);
            assert_eq!(padded.len(), chunk_len(count, parts) * parts);

            // Real entries first, padding only past the original count
            assert_eq!(primes_of(&padded), primes);
            assert!(padded[count..].iter().all(|e| *e == BaseEntry::Padding));
        }
    }

    #[test]
    fn test_empty_base_set_pads_to_nothing() {
        let padded = pad(&[], 4);
        assert!(padded.is_empty());
        assert_eq!(chunk_len(0, 4), 0);
    }

    #[test]
    fn test_blocks_cover_the_base_set_exactly_once() {
        let primes = vec![2, 3, 5, 7, 11];
        let parts = 3;
        let padded = pad(&primes, parts);
        let chunk = chunk_len(primes.len(), parts);

        let mut recovered = Vec::new();
        for block in padded.chunks(chunk) {
            assert_eq!(block.len(), chunk);
            recovered.extend(primes_of(block));
        }
        assert_eq!(recovered, primes);
    }

    #[test]
    fn test_four_primes_over_three_stages() {
        // Base primes <= 10 split over three stages: chunks of two, the
        // last stage all padding.
        let padded = pad(&[2, 3, 5, 7], 3);
        assert_eq!(
            padded,
            vec![
                BaseEntry::Prime(2),
                BaseEntry::Prime(3),
                BaseEntry::Prime(5),
                BaseEntry::Prime(7),
                BaseEntry::Padding,
                BaseEntry::Padding,
            ]
        );

        let blocks: Vec<Partition> = padded.chunks(2).map(|b| Partition::new(b.to_vec())).collect();
        assert!(blocks[0].divides(6));
        assert!(!blocks[0].divides(35));
        assert!(blocks[1].divides(35));

        // The all-padding stage drops nothing
        for candidate in 2..200 {
            assert!(!blocks[2].divides(candidate));
        }
    }

    #[test]
    fn test_empty_partition_constrains_nothing() {
        let partition = Partition::default();
        assert!(partition.is_empty());
        assert!(!partition.divides(4));
    }
}
