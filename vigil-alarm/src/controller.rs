//! Non-blocking alarm controller

use crate::config::{AlarmConfig, PlayerKind};
use crate::error::AlarmError;
use crate::players::{AlarmPlayer, BellPlayer, CommandPlayer, SilentPlayer};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use vigil_core::{AlarmKind, AlertSink};

struct Playback {
    kind: AlarmKind,
    id: u64,
    task: JoinHandle<()>,
}

/// Starts alarm playback in the background so the frame loop never waits on sound
///
/// Only one alarm sounds at a time. A raise while one is playing is dropped
/// unless it outranks the playing alarm (see [`AlarmKind::priority`]), in
/// which case the playing sound is cut off and the new one starts.
pub struct AlarmController {
    player: Arc<dyn AlarmPlayer>,
    duration: Duration,
    enabled: bool,
    current: Arc<Mutex<Option<Playback>>>,
    next_id: AtomicU64,
    runtime: Handle,
}

impl AlarmController {
    /// Create a controller from configuration. Must be called inside a tokio runtime.
    pub fn new(config: &AlarmConfig) -> Result<Self, AlarmError> {
        config.validate().map_err(AlarmError::Config)?;

        let player: Arc<dyn AlarmPlayer> = match config.player {
            PlayerKind::Command => Arc::new(CommandPlayer::new(
                config.command.clone(),
                config.sound_path.clone(),
            )),
            PlayerKind::Bell => Arc::new(BellPlayer),
            PlayerKind::Silent => Arc::new(SilentPlayer::new()),
        };

        let mut controller = Self::with_player(player, config.duration())?;
        controller.enabled = config.enabled;
        Ok(controller)
    }

    /// Create a controller around an existing player. Must be called inside a tokio runtime.
    pub fn with_player(player: Arc<dyn AlarmPlayer>, duration: Duration) -> Result<Self, AlarmError> {
        let runtime = Handle::try_current()
            .map_err(|e| AlarmError::Config(format!("alarm controller needs a tokio runtime: {}", e)))?;

        if !player.is_available() {
            warn!("Alarm player '{}' is not available", player.name());
        }

        Ok(Self {
            player,
            duration,
            enabled: true,
            current: Arc::new(Mutex::new(None)),
            next_id: AtomicU64::new(0),
            runtime,
        })
    }

    /// An alarm is currently sounding
    pub fn is_playing(&self) -> bool {
        self.current.lock().is_some()
    }

    /// Kind of the alarm currently sounding
    pub fn playing_kind(&self) -> Option<AlarmKind> {
        self.current.lock().as_ref().map(|playback| playback.kind)
    }

    pub fn player_name(&self) -> &str {
        self.player.name()
    }
}

impl AlertSink for AlarmController {
    fn raise(&self, kind: AlarmKind) -> bool {
        if !self.enabled {
            info!("{} (alarm disabled)", kind);
            return false;
        }

        // Held until the new playback is registered, so the finishing task
        // of an older playback cannot clear it
        let mut current = self.current.lock();
        if let Some(playing) = current.as_ref() {
            if kind.priority() <= playing.kind.priority() {
                return false;
            }
            info!("{} cuts off {}", kind, playing.kind);
            playing.task.abort();
        }

        info!("{}: sounding alarm for {:?}", kind, self.duration);

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let player = self.player.clone();
        let slot = self.current.clone();
        let duration = self.duration;
        let task = self.runtime.spawn(async move {
            if let Err(e) = player.play(duration).await {
                warn!("Alarm playback failed: {}", e);
            }
            let mut current = slot.lock();
            if current.as_ref().map(|playback| playback.id) == Some(id) {
                *current = None;
            }
        });

        *current = Some(Playback { kind, id, task });
        true
    }
}
