//! Configuration for alarm playback

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// How the alarm is made audible
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerKind {
    /// Play `sound_path` through a system audio command (paplay, aplay, afplay, ffplay)
    Command,
    /// Ring the terminal bell
    Bell,
    /// Log only; for headless runs and tests
    Silent,
}

/// Alarm configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlarmConfig {
    pub enabled: bool,
    pub player: PlayerKind,
    /// Sound file played by the command player
    pub sound_path: PathBuf,
    /// Explicit playback program; detected from the known players when unset
    pub command: Option<String>,
    /// How long one alarm sounds
    pub duration_ms: u64,
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            player: PlayerKind::Command,
            sound_path: PathBuf::from("alarm.wav"),
            command: None,
            duration_ms: 2_000,
        }
    }
}

impl AlarmConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.duration_ms == 0 || self.duration_ms > 60_000 {
            return Err("Alarm duration must be between 1 and 60000 ms".to_string());
        }

        if self.player == PlayerKind::Command && self.sound_path.as_os_str().is_empty() {
            return Err("sound_path is required for the command player".to_string());
        }

        if let Some(command) = &self.command {
            if command.trim().is_empty() {
                return Err("command must not be empty".to_string());
            }
            // The program is spawned directly, never through a shell
            if command.contains(|c: char| c.is_whitespace() || matches!(c, ';' | '|' | '&' | '$' | '`')) {
                return Err("command must be a single program name or path".to_string());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = AlarmConfig::default();
        assert!(config.enabled);
        assert_eq!(config.player, PlayerKind::Command);
        assert_eq!(config.duration(), Duration::from_secs(2));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_duration() {
        let mut config = AlarmConfig::default();
        config.duration_ms = 0;
        assert!(config.validate().is_err());
        config.duration_ms = 60_001;
        assert!(config.validate().is_err());
        config.duration_ms = 60_000;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_command() {
        let mut config = AlarmConfig::default();
        config.command = Some("aplay".to_string());
        assert!(config.validate().is_ok());

        config.command = Some("aplay; rm -rf /".to_string());
        assert!(config.validate().is_err());

        config.command = Some("  ".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_sound_path_only_matters_for_command_player() {
        let mut config = AlarmConfig::default();
        config.sound_path = PathBuf::new();
        assert!(config.validate().is_err());
        config.player = PlayerKind::Bell;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_player_kind_lowercase() {
        let kind: PlayerKind = serde_json::from_str("\"silent\"").unwrap();
        assert_eq!(kind, PlayerKind::Silent);
    }
}
