// Detection thresholds and history settings

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<ConfigError> for crate::Error {
    fn from(err: ConfigError) -> Self {
        crate::Error::Configuration(err.to_string())
    }
}

/// Parse a configuration document written as JSON, TOML or YAML
pub fn parse_config<T: DeserializeOwned>(content: &str) -> Result<T, ConfigError> {
    // Try JSON first
    if let Ok(config) = serde_json::from_str::<T>(content) {
        return Ok(config);
    }

    // Try TOML
    let toml_err = match toml::from_str::<T>(content) {
        Ok(config) => return Ok(config),
        Err(e) => e,
    };

    // Try YAML
    if let Ok(config) = serde_yaml::from_str::<T>(content) {
        return Ok(config);
    }

    Err(ConfigError::Parse(format!("not valid JSON, TOML or YAML ({})", toml_err)))
}

/// Read and parse a configuration file
pub fn load_config<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
    parse_config(&content)
}

/// Thresholds for the drowsiness decision engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    /// EAR below this counts as a closed-eye frame
    pub ear_threshold: f32,
    /// MAR above this counts as an open mouth
    pub mar_threshold: f32,
    /// Consecutive closed-eye frames before the driver is drowsy
    pub consec_frames: u32,
    /// Yawns inside one window that escalate to a frequent-yawning alarm
    pub yawn_alert_count: u32,
    /// Rolling yawn window in milliseconds
    pub yawn_window_ms: u64,
    /// Consecutive frames without a face before the state decays to Normal
    pub missing_face_frames: u32,
    /// Sound the alarm on every yawn onset, not only on frequent yawning
    pub alarm_on_yawn: bool,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            ear_threshold: 0.25,
            mar_threshold: 0.6,
            consec_frames: 20,
            yawn_alert_count: 6,
            yawn_window_ms: 30_000,
            missing_face_frames: 30,
            alarm_on_yawn: true,
        }
    }
}

impl DecisionConfig {
    pub fn yawn_window(&self) -> Duration {
        Duration::from_millis(self.yawn_window_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.ear_threshold.is_finite() || self.ear_threshold <= 0.0 || self.ear_threshold > 1.0 {
            return Err(ConfigError::Validation(
                "ear_threshold must be in (0, 1]".to_string(),
            ));
        }

        if !self.mar_threshold.is_finite() || self.mar_threshold <= 0.0 || self.mar_threshold > 2.0 {
            return Err(ConfigError::Validation(
                "mar_threshold must be in (0, 2]".to_string(),
            ));
        }

        if self.consec_frames == 0 || self.consec_frames > 10_000 {
            return Err(ConfigError::Validation(
                "consec_frames must be between 1 and 10000".to_string(),
            ));
        }

        if self.yawn_alert_count == 0 {
            return Err(ConfigError::Validation(
                "yawn_alert_count must be > 0".to_string(),
            ));
        }

        if self.yawn_window_ms == 0 {
            return Err(ConfigError::Validation(
                "yawn_window_ms must be > 0".to_string(),
            ));
        }

        if self.missing_face_frames == 0 {
            return Err(ConfigError::Validation(
                "missing_face_frames must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Apply `VIGIL_*` overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any key lookup; unparsable values are ignored
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parsed<T: std::str::FromStr>(value: Option<String>) -> Option<T> {
            value.and_then(|v| v.trim().parse().ok())
        }

        if let Some(v) = parsed(lookup("VIGIL_EAR_THRESHOLD")) {
            self.ear_threshold = v;
        }
        if let Some(v) = parsed(lookup("VIGIL_MAR_THRESHOLD")) {
            self.mar_threshold = v;
        }
        if let Some(v) = parsed(lookup("VIGIL_CONSEC_FRAMES")) {
            self.consec_frames = v;
        }
        if let Some(v) = parsed(lookup("VIGIL_YAWN_ALERT_COUNT")) {
            self.yawn_alert_count = v;
        }
        if let Some(v) = parsed(lookup("VIGIL_YAWN_WINDOW_MS")) {
            self.yawn_window_ms = v;
        }
        if let Some(v) = parsed(lookup("VIGIL_MISSING_FACE_FRAMES")) {
            self.missing_face_frames = v;
        }
        if let Some(v) = parsed(lookup("VIGIL_ALARM_ON_YAWN")) {
            self.alarm_on_yawn = v;
        }
    }
}

/// Where and how the CSV history is written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub enabled: bool,
    /// Per-frame `Timestamp,Status` log
    pub status_path: PathBuf,
    /// `Time,Event,Details` log for alarms and face loss
    pub events_path: PathBuf,
    /// Write a status row for every frame; otherwise only on status changes
    pub every_frame: bool,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            status_path: PathBuf::from("driver_history.csv"),
            events_path: PathBuf::from("driver_events.csv"),
            every_frame: true,
        }
    }
}

impl HistoryConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled && self.status_path == self.events_path {
            return Err(ConfigError::Validation(
                "status_path and events_path must differ".to_string(),
            ));
        }
        Ok(())
    }
}
