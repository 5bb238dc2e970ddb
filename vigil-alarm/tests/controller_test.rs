//! Tests for AlarmController with custom and configured players

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use vigil_alarm::{AlarmConfig, AlarmController, AlarmError, AlarmPlayer, PlayerKind};
use vigil_core::{AlarmKind, AlertSink};

/// Counts plays and fails every other one
#[derive(Default)]
struct FlakyPlayer {
    calls: AtomicU32,
}

#[async_trait]
impl AlarmPlayer for FlakyPlayer {
    async fn play(&self, duration: Duration) -> Result<(), AlarmError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(duration).await;
        if call % 2 == 1 {
            return Err(AlarmError::Player("device busy".to_string()));
        }
        Ok(())
    }

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "flaky"
    }
}

#[tokio::test]
async fn test_controller_recovers_after_failed_play() {
    let player = Arc::new(FlakyPlayer::default());
    let controller = AlarmController::with_player(player.clone(), Duration::from_millis(10)).unwrap();
    assert_eq!(controller.player_name(), "flaky");

    for _ in 0..3 {
        assert!(controller.raise(AlarmKind::Drowsiness));
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(!controller.is_playing());
    }
    assert_eq!(player.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_controller_as_alert_sink() {
    let controller: Arc<dyn AlertSink> = Arc::new(
        AlarmController::new(&AlarmConfig {
            player: PlayerKind::Silent,
            duration_ms: 30,
            ..AlarmConfig::default()
        })
        .unwrap(),
    );

    assert!(controller.raise(AlarmKind::FrequentYawning));
    // Still sounding
    assert!(!controller.raise(AlarmKind::Yawn));
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(controller.raise(AlarmKind::Yawn));
}

#[tokio::test]
async fn test_controller_from_json_config() {
    let config: AlarmConfig =
        serde_json::from_str(r#"{"player": "bell", "duration_ms": 1}"#).unwrap();
    assert!(config.enabled);
    assert_eq!(config.player, PlayerKind::Bell);

    let controller = AlarmController::new(&config).unwrap();
    assert_eq!(controller.player_name(), "bell");
    assert!(controller.raise(AlarmKind::Drowsiness));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!controller.is_playing());
}
