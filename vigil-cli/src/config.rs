//! Combined configuration file for the `vigil` binary

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};
use vigil_alarm::AlarmConfig;
use vigil_core::config::{load_config, parse_config};
use vigil_core::{ConfigError, DecisionConfig, HistoryConfig};
use vigil_eye::VisionConfig;

/// Looked up in the working directory when no `--config` is given
pub const DEFAULT_CONFIG_FILE: &str = "vigil.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VigilConfig {
    pub detection: DecisionConfig,
    pub history: HistoryConfig,
    pub vision: VisionConfig,
    pub alarm: AlarmConfig,
}

impl FromStr for VigilConfig {
    type Err = ConfigError;

    fn from_str(content: &str) -> Result<Self, Self::Err> {
        parse_config(content)
    }
}

impl VigilConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        load_config(path)
    }

    /// File (explicit or default), then environment, then validation
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                Self::from_file(path)?
            }
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                info!("Loading configuration from {}", DEFAULT_CONFIG_FILE);
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => {
                debug!("No configuration file, using defaults");
                Self::default()
            }
        };

        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        self.detection.apply_env_from(&lookup);

        if let Some(id) = lookup("VIGIL_CAMERA_ID").and_then(|v| v.trim().parse().ok()) {
            self.vision.camera_id = id;
        }
        if let Some(path) = lookup("VIGIL_MODEL_PATH") {
            self.vision.model_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("VIGIL_ALARM_SOUND") {
            self.alarm.sound_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("VIGIL_HISTORY_PATH") {
            self.history.status_path = PathBuf::from(path);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.detection.validate()?;
        self.history.validate()?;
        self.vision.validate().map_err(ConfigError::Validation)?;
        self.alarm.validate().map_err(ConfigError::Validation)?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}
