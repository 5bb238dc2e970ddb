//! Alarm player implementations

pub mod command;
pub mod bell;
pub mod silent;

use crate::error::AlarmError;
use async_trait::async_trait;
use std::time::Duration;

pub use bell::BellPlayer;
pub use command::CommandPlayer;
pub use silent::SilentPlayer;

/// Trait for alarm players
#[async_trait]
pub trait AlarmPlayer: Send + Sync {
    /// Sound the alarm for `duration`, returning once playback has stopped
    async fn play(&self, duration: Duration) -> Result<(), AlarmError>;

    /// Check if the player can make sound on this machine
    fn is_available(&self) -> bool;

    /// Get player name
    fn name(&self) -> &str;
}
