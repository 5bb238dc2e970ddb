//! Sound file playback through a system audio program

use crate::error::AlarmError;
use crate::players::AlarmPlayer;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Known players, in order of preference
const KNOWN_PLAYERS: &[&str] = &["paplay", "aplay", "afplay", "ffplay"];

/// Plays a sound file with an external program, looping it until the alarm duration is spent
pub struct CommandPlayer {
    program: Option<String>,
    sound_path: PathBuf,
}

impl CommandPlayer {
    /// Use `program` when given, otherwise the first known player found on this machine
    pub fn new(program: Option<String>, sound_path: impl Into<PathBuf>) -> Self {
        let program = match program {
            Some(p) => is_installed(&p).then_some(p),
            None => KNOWN_PLAYERS
                .iter()
                .find(|p| is_installed(p))
                .map(|p| p.to_string()),
        };

        match &program {
            Some(p) => info!("Alarm player: {}", p),
            None => warn!("No audio player found; alarms will be logged only"),
        }

        Self {
            program,
            sound_path: sound_path.into(),
        }
    }

    pub fn program(&self) -> Option<&str> {
        self.program.as_deref()
    }

    fn command(&self, program: &str) -> Command {
        let mut cmd = Command::new(program);
        cmd.args(player_args(program, &self.sound_path))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        cmd
    }
}

fn is_installed(program: &str) -> bool {
    // Spawning at all is enough; several players exit non-zero on --version
    std::process::Command::new(program)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok()
}

fn player_args(program: &str, sound: &Path) -> Vec<String> {
    let sound = sound.to_string_lossy().into_owned();
    let name = Path::new(program)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    match name.as_str() {
        "aplay" => vec!["-q".to_string(), sound],
        "ffplay" => vec![
            "-nodisp".to_string(),
            "-autoexit".to_string(),
            "-loglevel".to_string(),
            "quiet".to_string(),
            sound,
        ],
        _ => vec![sound],
    }
}

#[async_trait]
impl AlarmPlayer for CommandPlayer {
    async fn play(&self, duration: Duration) -> Result<(), AlarmError> {
        let program = self
            .program
            .as_deref()
            .ok_or_else(|| AlarmError::Player("no audio player available".to_string()))?;

        if !self.sound_path.exists() {
            return Err(AlarmError::Player(format!(
                "sound file {} not found",
                self.sound_path.display()
            )));
        }

        let deadline = Instant::now() + duration;
        loop {
            let now = Instant::now();
            if now >= deadline {
                break;
            }

            let mut child = self.command(program).spawn()?;
            match tokio::time::timeout(deadline - now, child.wait()).await {
                Ok(status) => {
                    let status = status?;
                    if !status.success() {
                        return Err(AlarmError::Player(format!("{} exited with {}", program, status)));
                    }
                    // Very short clips would otherwise respawn in a tight loop
                    if now.elapsed() < Duration::from_millis(10) {
                        break;
                    }
                }
                Err(_) => {
                    debug!("Alarm duration reached, stopping {}", program);
                    child.kill().await?;
                    break;
                }
            }
        }

        Ok(())
    }

    fn is_available(&self) -> bool {
        self.program.is_some()
    }

    fn name(&self) -> &str {
        "command"
    }
}
