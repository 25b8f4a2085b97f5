//! # lshdup signature layer
//!
//! This crate turns an ordered sequence of normalized tokens into a compact,
//! fixed-width bit signature whose Hamming distance tracks the Jaccard
//! similarity of the underlying token sets.
//!
//! ## Contract
//!
//! - The signature layer **only** consumes tokens produced upstream. It never
//!   normalizes, splits, or inspects raw documents.
//! - Every function is a pure function of `(tokens, config)`: no I/O, no
//!   clocks feeding the output, no process-wide state.
//!
//! Invariant: for the same token sequence and the same [`SignatureConfig`],
//! the signature is bit identical.
//!
//! ## Pipeline
//!
//! 1.  **MinHashing**: for each slot `j` in `0..bit_count`, every token is
//!     hashed with a slot-specific key and the minimum is kept.
//! 2.  **Bit sampling**: only the least significant bit of each minimum is
//!     retained. Slot 0 becomes the most significant bit of the
//!     [`Signature`].
//!
//! An empty token sequence has no minimum and is rejected with
//! [`PerceptualError::EmptyTokens`].
//!
//! ## Example Usage
//!
//! ```
//! use perceptual::{generate_signature, hamming_similarity};
//!
//! let a = generate_signature(&["the", "quick", "brown", "fox"], 32).unwrap();
//! let b = generate_signature(&["the", "quick", "brown", "fox"], 32).unwrap();
//!
//! assert_eq!(a.width(), 32);
//! assert_eq!(hamming_similarity(&a, &b, 32).unwrap(), 1.0);
//! ```
//!
pub mod config;
mod minhash;
pub mod signature;
mod similarity;

use std::time::Instant;

use tracing::debug;

use crate::minhash::minhash_values;

pub use crate::config::{PerceptualError, SignatureConfig, DEFAULT_BIT_COUNT, DEFAULT_SEED};
pub use crate::signature::Signature;
pub use crate::similarity::{hamming_distance, hamming_similarity, minhash_similarity};

/// Current signature algorithm version for this crate.
pub const SIGNATURE_VERSION: u16 = 1;

/// Human‑readable algorithm identifier.
pub const SIGNATURE_ALGORITHM: &str = "xxh3minhash_lsbsample_v1";

/// Compute the raw MinHash array for `tokens`.
///
/// The config is validated and empty input is rejected, so the result is
/// always a well-defined estimator.
pub fn minhash<S>(tokens: &[S], cfg: &SignatureConfig) -> Result<Vec<u64>, PerceptualError>
where
    S: AsRef<str> + Sync,
{
    cfg.validate()?;
    if tokens.is_empty() {
        return Err(PerceptualError::EmptyTokens);
    }
    Ok(minhash_values(tokens, cfg))
}

/// Pack the least significant bit of each MinHash value into a signature.
///
/// The first value supplies the most significant bit.
pub fn bit_sample(hashes: &[u64]) -> Result<Signature, PerceptualError> {
    let mut sig = Signature::zeroed(hashes.len())?;
    for (i, h) in hashes.iter().enumerate() {
        if h & 1 == 1 {
            sig.set_bit(i);
        }
    }
    Ok(sig)
}

/// Signature of `bit_count` bits using the default seed.
pub fn generate_signature<S>(tokens: &[S], bit_count: usize) -> Result<Signature, PerceptualError>
where
    S: AsRef<str> + Sync,
{
    generate_signature_with(tokens, &SignatureConfig::default().with_bit_count(bit_count))
}

/// Signature of `cfg.bit_count` bits (MinHash → bit sampling).
///
/// The `tokens` slice must contain normalized tokens; duplicates and order
/// do not affect the result because MinHash works over the token set.
pub fn generate_signature_with<S>(
    tokens: &[S],
    cfg: &SignatureConfig,
) -> Result<Signature, PerceptualError>
where
    S: AsRef<str> + Sync,
{
    let start = Instant::now();
    let hashes = minhash(tokens, cfg)?;
    let sig = bit_sample(&hashes)?;
    debug!(
        tokens = tokens.len(),
        bit_count = cfg.bit_count,
        algorithm = SIGNATURE_ALGORITHM,
        ones = sig.count_ones(),
        elapsed_micros = start.elapsed().as_micros() as u64,
        "signature_generated"
    );
    Ok(sig)
}
