//! Configuration for the codec and merge operator.
//!
//! All fields have defaults; a JSON override file only needs to name the
//! fields it changes.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{IrError, Result};
use crate::logging::{LogFormat, DEFAULT_FILTER};

/// Master configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IrConfig {
    /// Persisted-form settings.
    pub codec: CodecConfig,
    /// Merge behavior.
    pub merge: MergeConfig,
    /// Subscriber installed by `logging::init_from_config`.
    pub logging: LoggingConfig,
}

impl IrConfig {
    pub fn from_json_str(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(|e| IrError::InvalidConfig(e.to_string()))
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

/// Codec configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Maximum persisted file size accepted by `load`.
    pub max_file_size: u64,
    /// Verify the payload digest on load.
    pub verify_checksum: bool,
    /// Write to a sibling temp file and rename into place on save.
    pub atomic_save: bool,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_file_size: 1024 * 1024 * 1024, // 1GB
            verify_checksum: true,
            atomic_save: true,
        }
    }
}

/// What to do when a merged module's id already exists in the destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollisionPolicy {
    /// Reject the merge
    #[default]
    Fail,
    /// Give the incoming module a fresh random id
    Regenerate,
}

/// Merge configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    pub policy: CollisionPolicy,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// `EnvFilter` directives used when `RUST_LOG` is unset
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            filter: DEFAULT_FILTER.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = IrConfig::default();
        assert_eq!(config.codec.max_file_size, 1024 * 1024 * 1024);
        assert!(config.codec.verify_checksum);
        assert!(config.codec.atomic_save);
        assert_eq!(config.merge.policy, CollisionPolicy::Fail);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.logging.filter, "binlift=info");
    }

    #[test]
    fn test_partial_json_override() {
        let config =
            IrConfig::from_json_str(r#"{"codec": {"max_file_size": 4096}, "merge": {"policy": "Regenerate"}}"#)
                .unwrap();
        assert_eq!(config.codec.max_file_size, 4096);
        assert!(config.codec.verify_checksum);
        assert_eq!(config.merge.policy, CollisionPolicy::Regenerate);

        let logging =
            IrConfig::from_json_str(r#"{"logging": {"format": "json"}}"#).unwrap();
        assert_eq!(logging.logging.format, LogFormat::Json);
        assert_eq!(logging.logging.filter, "binlift=info");

        let empty = IrConfig::from_json_str("{}").unwrap();
        assert_eq!(empty, IrConfig::default());
    }

    #[test]
    fn test_bad_json_rejected() {
        assert!(matches!(
            IrConfig::from_json_str("{not json"),
            Err(IrError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("binlift.json");
        std::fs::write(&path, r#"{"codec": {"atomic_save": false}}"#).unwrap();
        let config = IrConfig::from_json_file(&path).unwrap();
        assert!(!config.codec.atomic_save);
        assert!(matches!(
            IrConfig::from_json_file(dir.path().join("missing.json")),
            Err(IrError::Io(_))
        ));
    }
}
