use crate::error::AlarmError;
use crate::players::AlarmPlayer;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::time::Duration;
use tracing::info;

/// Waits out the alarm without sound and remembers each play
#[derive(Default)]
pub struct SilentPlayer {
    plays: Mutex<Vec<Duration>>,
}

impl SilentPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Durations of every alarm played so far
    pub fn plays(&self) -> Vec<Duration> {
        self.plays.lock().clone()
    }
}

#[async_trait]
impl AlarmPlayer for SilentPlayer {
    async fn play(&self, duration: Duration) -> Result<(), AlarmError> {
        info!("Alarm (silent) for {:?}", duration);
        self.plays.lock().push(duration);
        tokio::time::sleep(duration).await;
        Ok(())
    }

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "silent"
    }
}
