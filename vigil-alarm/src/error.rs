//! Error types for vigil-alarm

use thiserror::Error;
use vigil_core::Error as CoreError;

/// Alarm playback errors
#[derive(Error, Debug)]
pub enum AlarmError {
    #[error("Player error: {0}")]
    Player(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),
}

impl From<AlarmError> for CoreError {
    fn from(err: AlarmError) -> Self {
        CoreError::Configuration(format!("Alarm error: {}", err))
    }
}
