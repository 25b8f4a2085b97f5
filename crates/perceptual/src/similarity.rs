//! Similarity estimators for re-scoring index candidates.
//!
//! Neither scorer is used by the index itself. Both reject inputs whose
//! length or width does not match the declared `n` instead of truncating
//! or padding them.

use crate::config::PerceptualError;
use crate::signature::Signature;

/// Fraction of slots where two MinHash arrays agree.
///
/// Estimates the Jaccard similarity of the original token sets. Both arrays
/// must have exactly `n` entries.
pub fn minhash_similarity(a: &[u64], b: &[u64], n: usize) -> Result<f64, PerceptualError> {
    if n == 0 {
        return Err(PerceptualError::InvalidBitCount { bit_count: 0 });
    }
    for len in [a.len(), b.len()] {
        if len != n {
            return Err(PerceptualError::WidthMismatch {
                expected: n,
                actual: len,
            });
        }
    }
    let equal = a.iter().zip(b).filter(|(x, y)| x == y).count();
    Ok(equal as f64 / n as f64)
}

/// `1 - hamming_distance / n` for two signatures of width `n`.
pub fn hamming_similarity(a: &Signature, b: &Signature, n: usize) -> Result<f64, PerceptualError> {
    if n == 0 {
        return Err(PerceptualError::InvalidBitCount { bit_count: 0 });
    }
    for width in [a.width(), b.width()] {
        if width != n {
            return Err(PerceptualError::WidthMismatch {
                expected: n,
                actual: width,
            });
        }
    }
    let distance = a.hamming_distance(b)?;
    Ok(1.0 - distance as f64 / n as f64)
}

/// Number of differing bits; both signatures must share a width.
pub fn hamming_distance(a: &Signature, b: &Signature) -> Result<usize, PerceptualError> {
    a.hamming_distance(b)
}
