use crate::error::AlarmError;
use crate::players::AlarmPlayer;
use async_trait::async_trait;
use std::io::Write;
use std::time::Duration;

/// Rings the terminal bell once per second of alarm
pub struct BellPlayer;

#[async_trait]
impl AlarmPlayer for BellPlayer {
    async fn play(&self, duration: Duration) -> Result<(), AlarmError> {
        let rings = duration.as_secs().max(1);
        let pause = duration / rings as u32;
        for _ in 0..rings {
            let mut stderr = std::io::stderr();
            stderr.write_all(b"\x07")?;
            stderr.flush()?;
            tokio::time::sleep(pause).await;
        }
        Ok(())
    }

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "bell"
    }
}
