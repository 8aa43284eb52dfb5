//! Deniable dual-payload slot partitioning.
//!
//! The key-independent eligible slot enumeration is shuffled under the
//! partition seed and split down the middle. Each half then gets its own
//! keyed permutation from that payload's steg key, so neither passphrase
//! reveals anything about the other half's ordering. Both sidecars carry the
//! same seed; only `partition_half` differs.

use super::position::shuffle_keyed;
use crate::error::{Result, StegError};

/// Partition seed length in bytes.
pub const PARTITION_SEED_LEN: usize = 32;

/// Split the eligible slot enumeration into two disjoint halves.
///
/// The same seed always produces the same `(H0, H1)` pair, and
/// `H0 ∪ H1 == π(slots)` with `H0 ∩ H1 == ∅`.
pub fn split_slots(mut slots: Vec<usize>, partition_seed: &[u8; 32]) -> (Vec<usize>, Vec<usize>) {
    shuffle_keyed(&mut slots, partition_seed);
    let mid = slots.len() / 2;
    let h1 = slots.split_off(mid);
    (slots, h1)
}

/// The slot sequence for one deniable payload: its partition half, permuted
/// by its own steg key.
pub fn deniable_slots(
    eligible: Vec<usize>,
    key: &[u8; 32],
    partition_seed: &[u8; 32],
    partition_half: u8,
) -> Result<Vec<usize>> {
    let (h0, h1) = split_slots(eligible, partition_seed);
    let mut half = match partition_half {
        0 => h0,
        1 => h1,
        other => {
            return Err(StegError::MalformedSidecar(format!(
                "partition_half must be 0 or 1, got {other}"
            )))
        }
    };
    shuffle_keyed(&mut half, key);
    Ok(half)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn halves_are_disjoint_and_complete() {
        let slots: Vec<usize> = (0..1001).collect();
        let seed = [9u8; 32];
        let (h0, h1) = split_slots(slots.clone(), &seed);

        assert_eq!(h0.len(), 500);
        assert_eq!(h1.len(), 501);

        let s0: HashSet<_> = h0.iter().collect();
        let s1: HashSet<_> = h1.iter().collect();
        assert!(s0.is_disjoint(&s1));
        assert_eq!(s0.len() + s1.len(), slots.len());
    }

    #[test]
    fn split_is_deterministic_per_seed() {
        let slots: Vec<usize> = (0..400).collect();
        let a = split_slots(slots.clone(), &[1u8; 32]);
        let b = split_slots(slots.clone(), &[1u8; 32]);
        let c = split_slots(slots, &[2u8; 32]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn halves_get_independent_keyed_order() {
        let slots: Vec<usize> = (0..600).collect();
        let seed = [3u8; 32];
        let real = deniable_slots(slots.clone(), &[10u8; 32], &seed, 0).unwrap();
        let decoy = deniable_slots(slots.clone(), &[20u8; 32], &seed, 1).unwrap();

        let sr: HashSet<_> = real.iter().collect();
        let sd: HashSet<_> = decoy.iter().collect();
        assert!(sr.is_disjoint(&sd));

        // Same half, same key -> same order.
        let again = deniable_slots(slots, &[10u8; 32], &seed, 0).unwrap();
        assert_eq!(real, again);
    }

    #[test]
    fn bad_half_rejected() {
        let r = deniable_slots(vec![1, 2, 3], &[0u8; 32], &[0u8; 32], 2);
        assert!(matches!(r, Err(StegError::MalformedSidecar(_))));
    }
}
