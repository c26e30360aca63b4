//! Top-level configuration for the guardian SOS core.
//!
//! [`GuardianConfig`] groups the classifier thresholds, dispatch timings and
//! the automatic trigger policy. It is loaded from and saved to JSON; every
//! field has a default, so a partial file only overrides what it names.
//!
//! # Example
//!
//! ```rust
//! use guardian_sos::config::GuardianConfig;
//!
//! let cfg = GuardianConfig::default();
//! cfg.validate().expect("default config is valid");
//! assert_eq!(cfg.dispatch.default_countdown_secs, 5);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::alerting::{DispatchConfig, TriggerPolicy};
use crate::detection::ClassifierConfig;
use crate::error::ConfigError;

/// Complete configuration for one guardian instance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardianConfig {
    /// Motion classifier thresholds
    pub classifier: ClassifierConfig,
    /// Countdown, display and transport timings
    pub dispatch: DispatchConfig,
    /// Which anomalies start a countdown automatically
    pub trigger: TriggerPolicy,
}

impl GuardianConfig {
    /// Load a [`GuardianConfig`] from a JSON file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::FileRead`] if the file cannot be opened and
    /// [`ConfigError::InvalidValue`] if the JSON is malformed or a value
    /// fails validation.
    pub fn from_json(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg: GuardianConfig = serde_json::from_str(&contents)
            .map_err(|e| ConfigError::invalid_value("(file)", e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Write this configuration to `path` as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::FileRead`] if the parent directory cannot be
    /// created or the file cannot be written.
    pub fn to_json(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::FileRead {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::invalid_value("(serialization)", e.to_string()))?;
        std::fs::write(path, json).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Validate every section
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.classifier.validate()?;
        self.dispatch.validate()?;
        self.trigger.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AnomalyKind;
    use tempfile::tempdir;

    #[test]
    fn test_default_is_valid() {
        assert!(GuardianConfig::default().validate().is_ok());
    }

    #[test]
    fn test_json_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("guardian.json");

        let mut cfg = GuardianConfig::default();
        cfg.dispatch.default_countdown_secs = 8;
        cfg.trigger.kinds.push(AnomalyKind::RunningPattern);
        cfg.to_json(&path).unwrap();

        let loaded = GuardianConfig::from_json(&path).unwrap();
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("partial.json");
        std::fs::write(&path, r#"{ "dispatch": { "cancel_grace_ms": 500 } }"#).unwrap();

        let cfg = GuardianConfig::from_json(&path).unwrap();
        assert_eq!(cfg.dispatch.cancel_grace_ms, 500);
        assert_eq!(cfg.dispatch.success_display_ms, 5000);
        assert_eq!(cfg.classifier, ClassifierConfig::default());
    }

    #[test]
    fn test_invalid_value_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{ "dispatch": { "sms_segment_chars": 0 } }"#).unwrap();

        let err = GuardianConfig::from_json(&path).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                field: "sms_segment_chars",
                ..
            }
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = GuardianConfig::from_json(Path::new("/nonexistent/guardian.json")).unwrap_err();
        assert!(matches!(err, ConfigError::FileRead { .. }));
    }
}
