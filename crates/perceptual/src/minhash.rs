//! MinHash computation over token sets.
//!
//! Each slot `j` gets its own hash function by keying xxh3 with a slot key
//! derived from `(seed, j)`. The slot value is the minimum hash over all
//! tokens, which estimates Jaccard similarity between token sets.

use rayon::prelude::*;
use xxhash_rust::xxh3::xxh3_64_with_seed;

use crate::config::SignatureConfig;

/// Compute `cfg.bit_count` MinHash values (parallel if `cfg.use_parallel`).
///
/// Callers validate the config and reject empty token slices first, as
/// the public `minhash` entry point does.
pub(crate) fn minhash_values<S>(tokens: &[S], cfg: &SignatureConfig) -> Vec<u64>
where
    S: AsRef<str> + Sync,
{
    let m = cfg.bit_count;
    let mut result = Vec::with_capacity(m);

    if cfg.use_parallel {
        (0..m)
            .into_par_iter()
            .map(|j| compute_slot(tokens, j, cfg.seed))
            .collect_into_vec(&mut result);
    } else {
        for j in 0..m {
            result.push(compute_slot(tokens, j, cfg.seed));
        }
    }

    result
}

/// Minimum keyed hash over all tokens for slot `j`.
#[inline]
pub(crate) fn compute_slot<S: AsRef<str>>(tokens: &[S], j: usize, seed: u64) -> u64 {
    let key = slot_key(j, seed);
    let mut minv = u64::MAX;
    for token in tokens {
        let h = token_hash(token.as_ref(), key);
        if h < minv {
            minv = h;
        }
    }
    minv
}

/// Hash key for slot `j`; slots are spaced by the golden-ratio increment.
#[inline]
pub(crate) fn slot_key(j: usize, seed: u64) -> u64 {
    let step = (j as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    splitmix64(seed.wrapping_add(step))
}

#[inline]
pub(crate) fn token_hash(token: &str, key: u64) -> u64 {
    xxh3_64_with_seed(token.as_bytes(), key)
}

#[inline]
pub(crate) fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}
