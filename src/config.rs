//! Runtime configuration, loaded from TOML.
//!
//! Every field has a default so a missing file, or a file that only sets a
//! couple of thresholds, is valid.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

const APP_DIR: &str = "shakealert";
const CONFIG_FILE: &str = "config.toml";
const STORAGE_FILE: &str = "storage.json";

/// Shake detector tuning. Times are in milliseconds.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Period requested from the sensor source.
    pub sample_period_ms: u64,
    /// Samples arriving this soon (or sooner) after the last processed one
    /// are ignored.
    pub min_sample_interval_ms: u64,
    /// Motion intensity a sample must exceed to count as a shake.
    pub shake_threshold: f64,
    /// Minimum spacing between qualifying samples of distinct shakes.
    pub time_threshold_ms: u64,
    /// Minimum time between two fired shake events.
    pub cooldown_ms: u64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            sample_period_ms: 100,
            min_sample_interval_ms: 100,
            shake_threshold: 100.0,
            time_threshold_ms: 200,
            cooldown_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct NotifierConfig {
    /// Shake signals within this window of the last admitted one are dropped.
    pub debounce_ms: u64,
    /// Body of the emergency text message.
    pub message: String,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 5000,
            message: "Emergency!".to_string(),
        }
    }
}

/// How the emergency message leaves the machine.
///
/// `command` is an argv list; `{number}` and `{message}` are substituted in
/// each argument. An empty command means messaging is unavailable.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MessengerConfig {
    pub command: Vec<String>,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub path: Option<PathBuf>,
}

impl StorageConfig {
    /// Configured store path, or `<data_dir>/shakealert/storage.json`.
    pub fn resolve_path(&self) -> Result<PathBuf> {
        match &self.path {
            Some(path) => Ok(path.clone()),
            None => dirs::data_dir()
                .map(|d| d.join(APP_DIR).join(STORAGE_FILE))
                .ok_or(Error::NoDefaultPath("storage")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub detector: DetectorConfig,
    pub notifier: NotifierConfig,
    pub messenger: MessengerConfig,
    pub storage: StorageConfig,
}

/// `<config_dir>/shakealert/config.toml`
pub fn default_config_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|d| d.join(APP_DIR).join(CONFIG_FILE))
        .ok_or(Error::NoDefaultPath("config"))
}

/// Loads the config at `path` (or the default location). A missing file
/// yields [`Config::default`].
pub fn load(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => default_config_path()?,
    };

    if !path.exists() {
        return Ok(Config::default());
    }

    let content = fs_err::read_to_string(&path).map_err(|source| Error::ConfigRead {
        path: path.clone(),
        source,
    })?;
    toml::from_str::<Config>(&content).map_err(|err| Error::ConfigMalformed {
        path,
        details: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_defaults_when_file_missing() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = temp_dir.path().join("missing.toml");
        let config = load(Some(&path)).expect("load config");
        assert_eq!(config, Config::default());
        assert_eq!(config.detector.shake_threshold, 100.0);
        assert_eq!(config.detector.cooldown_ms, 2000);
        assert_eq!(config.notifier.debounce_ms, 5000);
    }

    #[test]
    fn load_parses_partial_sections() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = temp_dir.path().join("config.toml");
        fs_err::write(
            &path,
            r#"
[detector]
shake_threshold = 250.0
cooldown_ms = 3000

[messenger]
command = ["termux-sms-send", "-n", "{number}", "{message}"]

[storage]
path = "/tmp/shakealert-test.json"
"#,
        )
        .expect("write config");

        let config = load(Some(&path)).expect("load config");
        assert_eq!(config.detector.shake_threshold, 250.0);
        assert_eq!(config.detector.cooldown_ms, 3000);
        assert_eq!(config.detector.time_threshold_ms, 200);
        assert_eq!(config.notifier, NotifierConfig::default());
        assert_eq!(config.messenger.command.len(), 4);
        assert!(!config.messenger.dry_run);
        assert_eq!(
            config.storage.resolve_path().expect("path"),
            PathBuf::from("/tmp/shakealert-test.json")
        );
    }

    #[test]
    fn load_rejects_malformed_file() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = temp_dir.path().join("config.toml");
        fs_err::write(&path, "[detector]\nshake_threshold = \"loud\"\n").expect("write config");

        let err = load(Some(&path)).unwrap_err();
        assert!(matches!(err, Error::ConfigMalformed { .. }));
    }
}
