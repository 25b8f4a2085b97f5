//! Configuration and error types for signature generation.
//!
//! This module defines the public configuration surface for the signature
//! layer. It is free of any I/O or environment-dependent behavior so that a
//! signature is a pure function of `(tokens, config)`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::SIGNATURE_VERSION;

/// Default seed mixed into every per-slot hash key.
pub const DEFAULT_SEED: u64 = 0xF00D_BAAD_F00D_BAAD;

/// Default signature width in bits.
pub const DEFAULT_BIT_COUNT: usize = 32;

/// Configuration for MinHash bit-sampling signatures.
///
/// The layer **only** works over token sequences produced by an upstream
/// tokenizer; it never normalizes or splits text itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignatureConfig {
    /// Signature algorithm version; must equal [`SIGNATURE_VERSION`].
    ///
    /// Any algorithmic change that can affect the signature bumps this
    /// version, so that stored signatures stay comparable.
    pub version: u32,
    /// Number of independent hash slots, which is also the signature width.
    pub bit_count: usize,
    /// Seed for deterministic hashing.
    ///
    /// Two configs with the same seed and bit count produce bit-identical
    /// signatures for equal token sequences.
    pub seed: u64,
    /// Compute the MinHash slots on the rayon pool.
    pub use_parallel: bool,
}

impl SignatureConfig {
    /// Create a new configuration with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the signature width (number of MinHash slots).
    pub fn with_bit_count(mut self, bit_count: usize) -> Self {
        self.bit_count = bit_count;
        self
    }

    /// Set the hashing seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Enable or disable parallel slot computation.
    pub fn with_parallel(mut self, use_parallel: bool) -> Self {
        self.use_parallel = use_parallel;
        self
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), PerceptualError> {
        if self.version != u32::from(SIGNATURE_VERSION) {
            return Err(PerceptualError::InvalidConfigVersion {
                version: self.version,
            });
        }
        if self.bit_count < 1 {
            return Err(PerceptualError::InvalidBitCount {
                bit_count: self.bit_count,
            });
        }
        Ok(())
    }
}

impl Default for SignatureConfig {
    fn default() -> Self {
        Self {
            version: u32::from(SIGNATURE_VERSION),
            bit_count: DEFAULT_BIT_COUNT,
            seed: DEFAULT_SEED,
            use_parallel: false,
        }
    }
}

/// Errors returned by signature generation and the similarity scorers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PerceptualError {
    #[error("cannot build a signature from an empty token sequence")]
    EmptyTokens,

    #[error("invalid config: bit_count must be >= 1 (got {bit_count})")]
    InvalidBitCount { bit_count: usize },

    #[error("invalid config version {version}; expected {}", SIGNATURE_VERSION)]
    InvalidConfigVersion { version: u32 },

    #[error("width mismatch: expected {expected} bits, got {actual}")]
    WidthMismatch { expected: usize, actual: usize },

    #[error("value {value:#x} does not fit in {width} bits")]
    ValueTooWide { value: u64, width: usize },

    #[error("bit range {start}..{end} out of bounds for width {width}")]
    RangeOutOfBounds {
        start: usize,
        end: usize,
        width: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_default_values() {
        let cfg = SignatureConfig::default();
        assert_eq!(cfg.version, 1);
        assert_eq!(cfg.bit_count, 32);
        assert_eq!(cfg.seed, 0xF00D_BAAD_F00D_BAAD);
        assert!(!cfg.use_parallel);
    }

    #[test]
    fn config_builders_chain() {
        let cfg = SignatureConfig::new()
            .with_bit_count(128)
            .with_seed(7)
            .with_parallel(true);
        assert_eq!(cfg.bit_count, 128);
        assert_eq!(cfg.seed, 7);
        assert!(cfg.use_parallel);
        assert_eq!(cfg.version, 1);
    }

    #[test]
    fn validate_accepts_defaults() {
        assert!(SignatureConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_bit_count() {
        let cfg = SignatureConfig::default().with_bit_count(0);
        assert_eq!(
            cfg.validate(),
            Err(PerceptualError::InvalidBitCount { bit_count: 0 })
        );
    }

    #[test]
    fn validate_rejects_version_zero() {
        let cfg = SignatureConfig {
            version: 0,
            ..Default::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(PerceptualError::InvalidConfigVersion { version: 0 })
        );
    }

    #[test]
    fn validate_rejects_unknown_version() {
        let cfg = SignatureConfig {
            version: 2,
            ..Default::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(PerceptualError::InvalidConfigVersion { version: 2 })
        );
        assert_eq!(
            cfg.validate().unwrap_err().to_string(),
            "invalid config version 2; expected 1"
        );
    }

    #[test]
    fn config_serde_roundtrip() {
        let cfg = SignatureConfig::default().with_bit_count(64).with_seed(99);
        let json = serde_json::to_string(&cfg).unwrap();
        let back: SignatureConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg, back);
    }

    #[test]
    fn error_messages_name_the_problem() {
        let err = PerceptualError::WidthMismatch {
            expected: 32,
            actual: 16,
        };
        assert_eq!(err.to_string(), "width mismatch: expected 32 bits, got 16");
        assert!(PerceptualError::EmptyTokens.to_string().contains("empty"));
    }
}
