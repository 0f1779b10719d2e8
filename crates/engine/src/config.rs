//! Run-wide configuration object.
//!
//! The configuration is the distinguished service every other component
//! consults: persistence derives artifact paths from it, the loader resolves
//! include paths against it, and links may read analysis metadata from it.
//! It is mutated while a pipeline is being assembled and treated as
//! read-mostly once chains execute.

use std::path::PathBuf;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use linkwork_types::SettingsDoc;

/// Service kind tag under which the configuration object is registered.
pub const CONFIG_SERVICE_KIND: &str = "config";

/// Analysis names become path components of persisted artifacts, so they are
/// restricted to a path-safe alphabet.
static ANALYSIS_NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]*$").expect("analysis name pattern is valid"));

/// Error surfaced when a setting is rejected.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Analysis name contains characters that are unsafe in a path.
    #[error("analysis name '{0}' is not path-safe (allowed: letters, digits, '_', '-', '.')")]
    InvalidAnalysisName(String),
    /// Setting key is not in the recognized set.
    #[error("unrecognized setting '{0}'")]
    UnrecognizedSetting(String),
    /// Setting key is recognized but its value cannot be used.
    #[error("setting '{key}' rejected: {message}")]
    InvalidValue {
        /// The offending setting key.
        key: String,
        /// Why the value was rejected.
        message: String,
    },
}

/// Run-wide settings shared through the `"config"` service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct RunConfig {
    /// Analysis name; first path component of persisted artifacts.
    pub analysis_name: String,
    /// Version namespace for persisted artifacts.
    pub version: u32,
    /// When true, checkpoints write nothing to disk.
    pub do_not_store_results: bool,
    /// Base directory relative include paths resolve against; when unset,
    /// includes resolve against the including document's directory.
    pub pipelines_dir: Option<PathBuf>,
    /// Base directory snapshots are written under.
    pub results_dir: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            analysis_name: "analysis".into(),
            version: 0,
            do_not_store_results: false,
            pipelines_dir: None,
            results_dir: PathBuf::from("results"),
        }
    }
}

impl RunConfig {
    /// Checks that the current analysis name is path-safe.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::validate_analysis_name(&self.analysis_name)
    }

    fn validate_analysis_name(name: &str) -> Result<(), ConfigError> {
        if ANALYSIS_NAME_PATTERN.is_match(name) {
            Ok(())
        } else {
            Err(ConfigError::InvalidAnalysisName(name.to_string()))
        }
    }

    /// Applies a descriptor `settings:` block. Only the keys the block sets
    /// are touched, so documents loaded later can override selectively.
    pub fn apply_settings(&mut self, settings: &SettingsDoc) -> Result<(), ConfigError> {
        if let Some(name) = &settings.analysis_name {
            Self::validate_analysis_name(name)?;
            self.analysis_name = name.clone();
        }
        if let Some(version) = settings.version {
            self.version = version;
        }
        if let Some(flag) = settings.do_not_store_results {
            self.do_not_store_results = flag;
        }
        if let Some(dir) = &settings.pipelines_dir {
            self.pipelines_dir = Some(PathBuf::from(dir));
        }
        if let Some(dir) = &settings.results_dir {
            self.results_dir = PathBuf::from(dir);
        }
        Ok(())
    }

    /// Applies one `key=value` override, e.g. from the command line.
    pub fn apply_override(&mut self, key: &str, raw: &str) -> Result<(), ConfigError> {
        match key {
            "analysis_name" => {
                Self::validate_analysis_name(raw)?;
                self.analysis_name = raw.to_string();
            }
            "version" => {
                self.version = raw.parse::<u32>().map_err(|error| ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: error.to_string(),
                })?;
            }
            "do_not_store_results" => {
                self.do_not_store_results = parse_bool(raw).ok_or_else(|| ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: format!("expected 'true' or 'false', got '{raw}'"),
                })?;
            }
            "pipelines_dir" => {
                self.pipelines_dir = Some(PathBuf::from(raw));
            }
            "results_dir" => {
                self.results_dir = PathBuf::from(raw);
            }
            other => return Err(ConfigError::UnrecognizedSetting(other.to_string())),
        }
        Ok(())
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_apply_only_present_keys() {
        let mut config = RunConfig::default();
        config.version = 3;

        let settings = SettingsDoc {
            analysis_name: Some("wordcount".into()),
            do_not_store_results: Some(true),
            ..Default::default()
        };
        config.apply_settings(&settings).expect("apply settings");

        assert_eq!(config.analysis_name, "wordcount");
        assert_eq!(config.version, 3, "untouched setting keeps prior value");
        assert!(config.do_not_store_results);
    }

    #[test]
    fn path_unsafe_analysis_name_is_rejected() {
        let mut config = RunConfig::default();
        let settings = SettingsDoc {
            analysis_name: Some("../escape".into()),
            ..Default::default()
        };
        let error = config.apply_settings(&settings).expect_err("name should be rejected");
        assert_eq!(error, ConfigError::InvalidAnalysisName("../escape".into()));
        assert_eq!(config.analysis_name, "analysis", "rejected name leaves config untouched");
    }

    #[test]
    fn overrides_cover_every_recognized_key() {
        let mut config = RunConfig::default();
        config.apply_override("analysis_name", "demo").expect("name");
        config.apply_override("version", "7").expect("version");
        config.apply_override("do_not_store_results", "true").expect("flag");
        config.apply_override("pipelines_dir", "defs").expect("pipelines dir");
        config.apply_override("results_dir", "out").expect("results dir");

        assert_eq!(config.analysis_name, "demo");
        assert_eq!(config.version, 7);
        assert!(config.do_not_store_results);
        assert_eq!(config.pipelines_dir.as_deref(), Some(std::path::Path::new("defs")));
        assert_eq!(config.results_dir, PathBuf::from("out"));
    }

    #[test]
    fn unknown_override_key_fails() {
        let mut config = RunConfig::default();
        let error = config.apply_override("analysis", "demo").expect_err("unknown key");
        assert_eq!(error, ConfigError::UnrecognizedSetting("analysis".into()));
    }

    #[test]
    fn bad_override_values_fail() {
        let mut config = RunConfig::default();
        assert!(matches!(
            config.apply_override("version", "not-a-number"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            config.apply_override("do_not_store_results", "yes"),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn config_round_trips_through_json() {
        let mut config = RunConfig::default();
        config.analysis_name = "roundtrip".into();
        config.version = 2;

        let encoded = serde_json::to_string(&config).expect("encode");
        let decoded: RunConfig = serde_json::from_str(&encoded).expect("decode");
        assert_eq!(decoded, config);
    }
}
