//! YAML Configuration File Support for lshdup
//!
//! Loads the signature, index and matcher settings of a
//! [`DuplicateDetector`](crate::DuplicateDetector) from a single YAML file.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! # lshdup configuration
//! version: "1.0"
//! name: "news-articles"
//!
//! signature:
//!   version: 1
//!   bit_count: 64
//!   seed: 17293822569102704557
//!   use_parallel: false
//!
//! index:
//!   radius: 8
//!
//! matcher:
//!   threshold: 0.8
//!   max_results: 10
//! ```
//!
//! The index width is always the signature `bit_count`; only the number of
//! bands (`radius`) is configured separately.

use std::fs;
use std::path::Path;

use index::IndexConfig;
use perceptual::{SignatureConfig, DEFAULT_BIT_COUNT, DEFAULT_SEED, SIGNATURE_VERSION};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when loading YAML configuration files
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

/// Top-level YAML configuration for a duplicate detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DedupConfig {
    /// Configuration format version
    pub version: String,

    /// Optional configuration name/description
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub signature: SignatureYamlConfig,

    #[serde(default)]
    pub index: IndexYamlConfig,

    #[serde(default)]
    pub matcher: MatcherYamlConfig,
}

impl DedupConfig {
    /// Load a YAML configuration file from the given path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: DedupConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize back to YAML.
    pub fn to_yaml(&self) -> Result<String, ConfigLoadError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        self.signature.validate()?;
        self.index.validate(self.signature.bit_count)?;
        self.matcher.validate()?;

        Ok(())
    }

    /// Signature generator settings.
    pub fn signature_config(&self) -> SignatureConfig {
        SignatureConfig {
            version: self.signature.version,
            bit_count: self.signature.bit_count,
            seed: self.signature.seed,
            use_parallel: self.signature.use_parallel,
        }
    }

    /// Table settings; `hash_iter` follows the signature width.
    pub fn index_config(&self) -> IndexConfig {
        IndexConfig::new(self.signature.bit_count, self.index.radius)
    }
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            name: None,
            signature: SignatureYamlConfig::default(),
            index: IndexYamlConfig::default(),
            matcher: MatcherYamlConfig::default(),
        }
    }
}

/// Signature generation YAML configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureYamlConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default = "default_bit_count")]
    pub bit_count: usize,

    #[serde(default = "default_seed")]
    pub seed: u64,

    #[serde(default)]
    pub use_parallel: bool,
}

impl SignatureYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.version != u32::from(SIGNATURE_VERSION) {
            return Err(ConfigLoadError::Validation(format!(
                "signature.version must be {SIGNATURE_VERSION} (got {})",
                self.version
            )));
        }
        if self.bit_count == 0 {
            return Err(ConfigLoadError::Validation(
                "signature.bit_count must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for SignatureYamlConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            bit_count: DEFAULT_BIT_COUNT,
            seed: DEFAULT_SEED,
            use_parallel: false,
        }
    }
}

/// Index YAML configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexYamlConfig {
    /// Number of bands each signature is cut into
    #[serde(default = "default_radius")]
    pub radius: usize,
}

impl IndexYamlConfig {
    fn validate(&self, bit_count: usize) -> Result<(), ConfigLoadError> {
        IndexConfig::new(bit_count, self.radius)
            .validate()
            .map_err(|err| ConfigLoadError::Validation(format!("index: {err}")))
    }
}

impl Default for IndexYamlConfig {
    fn default() -> Self {
        Self {
            radius: default_radius(),
        }
    }
}

/// Matcher YAML configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatcherYamlConfig {
    /// Minimum Hamming similarity for a candidate to be reported
    #[serde(default = "default_threshold")]
    pub threshold: f64,

    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

impl MatcherYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(ConfigLoadError::Validation(format!(
                "matcher.threshold must be within [0, 1] (got {})",
                self.threshold
            )));
        }
        if self.max_results == 0 {
            return Err(ConfigLoadError::Validation(
                "matcher.max_results must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for MatcherYamlConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            max_results: default_max_results(),
        }
    }
}

// Default value functions
fn default_version() -> u32 {
    u32::from(SIGNATURE_VERSION)
}
fn default_bit_count() -> usize {
    DEFAULT_BIT_COUNT
}
fn default_seed() -> u64 {
    DEFAULT_SEED
}
fn default_radius() -> usize {
    4
}
fn default_threshold() -> f64 {
    0.75
}
fn default_max_results() -> usize {
    10
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_valid_yaml() {
        let yaml = r#"
version: "1.0"
name: "test config"
signature:
  bit_count: 64
index:
  radius: 8
"#;

        let config = DedupConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.name, Some("test config".to_string()));
        assert_eq!(config.signature.bit_count, 64);
        assert_eq!(config.signature.seed, DEFAULT_SEED);
        assert_eq!(config.index.radius, 8);
        assert_eq!(config.matcher, MatcherYamlConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let yaml = r#"
version: "1"
matcher:
  threshold: 0.9
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(yaml.as_bytes()).unwrap();

        let config = DedupConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.version, "1");
        assert_eq!(config.matcher.threshold, 0.9);
    }

    #[test]
    fn test_missing_file() {
        let result = DedupConfig::from_file("/nonexistent/lshdup.yaml");
        assert!(matches!(result, Err(ConfigLoadError::FileRead(_))));
    }

    #[test]
    fn test_default_config() {
        let config = DedupConfig::default();
        assert_eq!(config.version, "1.0");
        assert!(config.name.is_none());
        assert!(config.validate().is_ok());
        assert_eq!(config.index_config(), IndexConfig::default());
        assert_eq!(config.signature_config(), SignatureConfig::default());
    }

    #[test]
    fn test_unsupported_version() {
        let result = DedupConfig::from_yaml("version: \"2.0\"\n");
        assert!(matches!(
            result,
            Err(ConfigLoadError::UnsupportedVersion(v)) if v == "2.0"
        ));
    }

    #[test]
    fn test_malformed_yaml() {
        let result = DedupConfig::from_yaml("version: [unterminated");
        assert!(matches!(result, Err(ConfigLoadError::YamlParse(_))));
    }

    #[test]
    fn test_signature_validation() {
        let yaml = r#"
version: "1.0"
signature:
  bit_count: 0
"#;

        let result = DedupConfig::from_yaml(yaml);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("bit_count must be >= 1"));

        let yaml = r#"
version: "1.0"
signature:
  version: 2
"#;
        let result = DedupConfig::from_yaml(yaml);
        assert!(matches!(
            result,
            Err(ConfigLoadError::Validation(msg)) if msg == "signature.version must be 1 (got 2)"
        ));
    }

    #[test]
    fn test_index_validation() {
        let yaml = r#"
version: "1.0"
signature:
  bit_count: 32
index:
  radius: 64
"#;

        let result = DedupConfig::from_yaml(yaml);
        assert!(matches!(result, Err(ConfigLoadError::Validation(msg)) if msg.contains("radius")));

    }

    #[test]
    fn test_wide_bands_are_valid() {
        // 256 bits in 2 bands is a 128-bit chunk
        let yaml = r#"
version: "1.0"
signature:
  bit_count: 256
index:
  radius: 2
"#;
        let config = DedupConfig::from_yaml(yaml).unwrap();
        let idx = config.index_config();
        assert_eq!(idx.hash_iter, 256);
        assert_eq!(idx.radius, 2);
        assert_eq!(idx.validate(), Ok(()));
    }

    #[test]
    fn test_matcher_validation() {
        let yaml = r#"
version: "1.0"
matcher:
  threshold: 1.5
"#;
        let result = DedupConfig::from_yaml(yaml);
        assert!(result.unwrap_err().to_string().contains("threshold"));

        let yaml = r#"
version: "1.0"
matcher:
  max_results: 0
"#;
        let result = DedupConfig::from_yaml(yaml);
        assert!(result.unwrap_err().to_string().contains("max_results"));
    }

    #[test]
    fn test_full_yaml_roundtrip() {
        let yaml = r#"
version: "1.0"
name: "production"
signature:
  version: 1
  bit_count: 128
  seed: 42
  use_parallel: true

index:
  radius: 16

matcher:
  threshold: 0.8
  max_results: 5
"#;

        let config = DedupConfig::from_yaml(yaml).unwrap();
        let again = DedupConfig::from_yaml(&config.to_yaml().unwrap()).unwrap();
        assert_eq!(config, again);

        let sig = config.signature_config();
        assert_eq!(sig.bit_count, 128);
        assert_eq!(sig.seed, 42);
        assert!(sig.use_parallel);

        let idx = config.index_config();
        assert_eq!(idx.hash_iter, 128);
        assert_eq!(idx.radius, 16);
        assert_eq!(config.matcher.max_results, 5);
    }
}
