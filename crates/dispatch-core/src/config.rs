//! Run configuration, read from an optional TOML file.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::models::CoreError;
use crate::orchestration::DEFAULT_MAX_IN_FLIGHT;
use crate::storage::{
    DEFAULT_COUNTER_FILE, DEFAULT_DERIVATIVE_FILE, DEFAULT_INTEGRAL_FILE, DEFAULT_THESIS_FILE,
    StorageLayout,
};

pub type ConfigResult<T> = Result<T, CoreError>;

/// Missing fields fall back to the defaults below.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DispatchConfig {
    /// Upper bound on tasks evaluating at the same time.
    pub max_in_flight: usize,

    /// Directory holding the ledger and counter files.
    pub data_dir: PathBuf,

    /// Optional bound on a single evaluator call, in milliseconds.
    pub evaluation_timeout_ms: Option<u64>,

    /// Append log output to this file instead of stderr.
    pub log_file: Option<PathBuf>,

    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub log_filter: String,

    pub files: FileNames,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FileNames {
    pub integral: String,
    pub derivative: String,
    pub thesis: String,
    pub counter: String,
}

impl Default for FileNames {
    fn default() -> Self {
        Self {
            integral: DEFAULT_INTEGRAL_FILE.to_string(),
            derivative: DEFAULT_DERIVATIVE_FILE.to_string(),
            thesis: DEFAULT_THESIS_FILE.to_string(),
            counter: DEFAULT_COUNTER_FILE.to_string(),
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            data_dir: PathBuf::from("."),
            evaluation_timeout_ms: None,
            log_file: None,
            log_filter: "info".to_string(),
            files: FileNames::default(),
        }
    }
}

impl DispatchConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_in_flight == 0 {
            return Err(CoreError::invalid_input("max_in_flight must be > 0"));
        }
        if self.evaluation_timeout_ms == Some(0) {
            return Err(CoreError::invalid_input(
                "evaluation_timeout_ms must be > 0 when set",
            ));
        }

        let names = [
            &self.files.integral,
            &self.files.derivative,
            &self.files.thesis,
            &self.files.counter,
        ];
        if names.iter().any(|name| name.trim().is_empty()) {
            return Err(CoreError::invalid_input("file names must not be empty"));
        }
        let unique: HashSet<_> = names.iter().collect();
        if unique.len() != names.len() {
            return Err(CoreError::invalid_input(
                "ledger and counter files must all be distinct",
            ));
        }
        Ok(())
    }

    pub fn evaluation_timeout(&self) -> Option<Duration> {
        self.evaluation_timeout_ms.map(Duration::from_millis)
    }

    pub fn storage_layout(&self) -> StorageLayout {
        StorageLayout {
            dir: self.data_dir.clone(),
            integral: self.files.integral.clone(),
            derivative: self.files.derivative.clone(),
            thesis: self.files.thesis.clone(),
            counter: self.files.counter.clone(),
        }
    }
}

/// Loads config from a TOML file, or the defaults when the file is missing.
pub fn load_config(path: &Path) -> ConfigResult<DispatchConfig> {
    if !path.exists() {
        let config = DispatchConfig::default();
        config.validate()?;
        return Ok(config);
    }
    load_config_file(path)
}

/// Loads config from a TOML file that must exist.
pub fn load_config_file(path: &Path) -> ConfigResult<DispatchConfig> {
    let contents = std::fs::read_to_string(path).map_err(|error| {
        CoreError::storage(format!("read config '{}': {error}", path.display()))
    })?;
    let config: DispatchConfig = toml::from_str(&contents).map_err(|error| {
        CoreError::invalid_input(format!("parse config '{}': {error}", path.display()))
    })?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let path = std::env::temp_dir().join("dispatch-config-that-does-not-exist.toml");
        let config = load_config(&path).expect("load");
        assert_eq!(config, DispatchConfig::default());
        assert_eq!(config.max_in_flight, 3);
    }

    #[test]
    fn load_config_file_requires_the_file() {
        let path = std::env::temp_dir().join("dispatch-config-typo-that-does-not-exist.toml");
        let error = load_config_file(&path).unwrap_err();
        assert_eq!(error.kind, crate::models::CoreErrorKind::StorageFailure);
    }

    #[test]
    fn partial_toml_keeps_defaults_for_missing_fields() {
        let config: DispatchConfig = toml::from_str(
            r#"
max_in_flight = 8
evaluation_timeout_ms = 250

[files]
counter = "words.txt"
"#,
        )
        .expect("parse");

        assert_eq!(config.max_in_flight, 8);
        assert_eq!(config.evaluation_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(config.files.counter, "words.txt");
        assert_eq!(config.files.thesis, DEFAULT_THESIS_FILE);
        assert_eq!(config.log_filter, "info");
        config.validate().expect("valid");
    }

    #[test]
    fn validate_rejects_zero_capacity_and_shared_files() {
        let zero = DispatchConfig {
            max_in_flight: 0,
            ..DispatchConfig::default()
        };
        assert!(zero.validate().is_err());

        let mut shared = DispatchConfig::default();
        shared.files.counter = shared.files.thesis.clone();
        assert!(shared.validate().is_err());

        let no_timeout = DispatchConfig {
            evaluation_timeout_ms: Some(0),
            ..DispatchConfig::default()
        };
        assert!(no_timeout.validate().is_err());
    }

    #[test]
    fn storage_layout_joins_data_dir() {
        let config = DispatchConfig {
            data_dir: PathBuf::from("/var/lib/dispatch"),
            ..DispatchConfig::default()
        };
        let layout = config.storage_layout();
        assert_eq!(
            layout.counter_path(),
            PathBuf::from("/var/lib/dispatch").join(DEFAULT_COUNTER_FILE)
        );
    }
}
