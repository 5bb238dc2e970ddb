// Vigil command line interface
// Driver drowsiness detection from a camera, still images or recordings

mod config;
mod output;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use config::VigilConfig;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use vigil_alarm::{AlarmController, PlayerKind};
use vigil_core::decision::{classify_single, single_frame_confidence};
use vigil_core::{history, replay, RatioSample, RecordKind};
use vigil_eye::{DetectionSession, Detector, Frame, RecordedLandmarks};

#[derive(Parser)]
#[command(name = "vigil")]
#[command(about = "Driver drowsiness detection from eye and mouth aspect ratios", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (JSON, TOML or YAML); defaults to ./vigil.toml when present
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Monitor the driver through the camera
    Watch {
        /// Show the annotated video window
        #[arg(long)]
        display: bool,

        /// Do not play alarm sounds
        #[arg(long)]
        silent: bool,
    },

    /// Analyse one still image
    Image {
        /// Image file
        path: PathBuf,

        /// Use recorded landmarks (JSON) instead of detecting them
        #[arg(long)]
        landmarks: Option<PathBuf>,

        /// Use the image classifier instead of landmarks
        #[arg(long)]
        classifier: bool,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Classify a single pair of ratios
    Simulate {
        /// Eye aspect ratio
        #[arg(long)]
        ear: f32,

        /// Mouth aspect ratio
        #[arg(long)]
        mar: f32,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run recorded `ear,mar` samples through the full detector
    ///
    /// Samples are processed as fast as they can be read, so alarms are
    /// logged and recorded but not played unless --sound is given.
    Replay {
        /// CSV file with one `ear,mar` row per frame
        samples: PathBuf,

        /// Frame rate the samples were recorded at
        #[arg(long, default_value = "30")]
        fps: u32,

        /// Play alarm sounds (only one can sound at a time, later alarms are cut short or dropped)
        #[arg(long)]
        sound: bool,
    },

    /// Run recorded 68-point landmarks through the full detector
    ///
    /// Like replay, alarms are silent unless --sound is given.
    Landmarks {
        /// JSON recording: frames of faces of 68 points
        recording: PathBuf,

        /// Frame rate the landmarks were recorded at
        #[arg(long, default_value = "30")]
        fps: u32,

        /// Play alarm sounds
        #[arg(long)]
        sound: bool,
    },

    /// Show the most recent history rows
    History {
        /// Number of rows to show
        #[arg(long, short, default_value = "20")]
        lines: usize,

        /// Show alarm events instead of per-frame status
        #[arg(long)]
        events: bool,
    },

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the effective configuration as TOML
    Show,
    /// Check the configuration and exit
    Validate,
}

fn init_logging(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.log_json);

    let config = VigilConfig::load(cli.config.as_deref()).context("invalid configuration")?;

    match cli.command {
        Commands::Watch { display, silent } => watch(config, display, silent).await?,
        Commands::Image {
            path,
            landmarks,
            classifier,
            json,
        } => analyse_image(&config, &path, landmarks.as_deref(), classifier, json)?,
        Commands::Simulate { ear, mar, json } => simulate(&config, ear, mar, json)?,
        Commands::Replay {
            samples,
            fps,
            sound,
        } => replay_samples(config, &samples, fps, !sound).await?,
        Commands::Landmarks {
            recording,
            fps,
            sound,
        } => replay_landmarks(config, &recording, fps, !sound).await?,
        Commands::History { lines, events } => show_history(&config, lines, events)?,
        Commands::Config(ConfigCommands::Show) => print!("{}", config.to_toml()?),
        Commands::Config(ConfigCommands::Validate) => println!("Configuration is valid"),
    }

    Ok(())
}

fn frame_interval(fps: u32) -> anyhow::Result<Duration> {
    if fps == 0 || fps > 240 {
        bail!("fps must be between 1 and 240");
    }
    Ok(Duration::from_secs_f64(1.0 / fps as f64))
}

fn alarm_sink(config: &VigilConfig, silent: bool) -> anyhow::Result<Arc<AlarmController>> {
    let mut alarm = config.alarm.clone();
    if silent {
        alarm.player = PlayerKind::Silent;
    }
    let controller = AlarmController::new(&alarm)?;
    info!("Alarm player: {}", controller.player_name());
    Ok(Arc::new(controller))
}

/// Let a sounding alarm finish before the process exits
async fn finish_alarm(controller: &AlarmController) {
    while controller.is_playing() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

/// How a live monitoring loop ended
#[cfg_attr(not(feature = "camera"), allow(dead_code))]
#[derive(Debug)]
enum WatchExit {
    Interrupted,
    Quit,
    /// The camera stopped delivering frames, with the capture thread's reason if it gave one
    StreamEnded(Option<String>),
}

#[cfg_attr(not(feature = "camera"), allow(dead_code))]
impl WatchExit {
    fn into_result(self) -> anyhow::Result<()> {
        match self {
            WatchExit::Interrupted | WatchExit::Quit => Ok(()),
            WatchExit::StreamEnded(Some(reason)) => bail!("camera stream ended: {}", reason),
            WatchExit::StreamEnded(None) => bail!("camera stream ended unexpectedly"),
        }
    }
}

fn simulate(config: &VigilConfig, ear: f32, mar: f32, json: bool) -> anyhow::Result<()> {
    let sample = RatioSample::new(ear, mar)
        .context("ratios must be finite and non-negative")?;
    let status = classify_single(&config.detection, &sample);
    let confidence = single_frame_confidence(&config.detection, &sample);
    output::print_single(&output::SingleResult::from_sample(sample, status, confidence), json)
}

fn analyse_image(
    config: &VigilConfig,
    path: &Path,
    landmarks: Option<&Path>,
    classifier: bool,
    json: bool,
) -> anyhow::Result<()> {
    let frame = Frame::from_path(path)?;

    if classifier {
        let classification = classify_frame(config, &frame)?;
        return output::print_single(&output::SingleResult::from_classification(&classification), json);
    }

    let faces = match landmarks {
        Some(recording) => {
            let mut provider = RecordedLandmarks::from_file(recording)?;
            vigil_eye::LandmarkProvider::detect(&mut provider, &frame)?
        }
        None => detect_landmarks(config, &frame)?,
    };

    let driver = vigil_core::landmarks::select_driver(faces).context("no face found in image")?;
    let sample = driver
        .ratios()
        .context("face landmarks are degenerate, ratios undefined")?;
    let status = classify_single(&config.detection, &sample);
    let confidence = single_frame_confidence(&config.detection, &sample);
    output::print_single(&output::SingleResult::from_sample(sample, status, confidence), json)
}

#[cfg(feature = "camera")]
fn detect_landmarks(config: &VigilConfig, frame: &Frame) -> anyhow::Result<Vec<vigil_core::LandmarkSet>> {
    use vigil_eye::LandmarkProvider;
    let mut provider = vigil_eye::FacemarkProvider::new(&config.vision)?;
    Ok(provider.detect(frame)?)
}

#[cfg(not(feature = "camera"))]
fn detect_landmarks(_config: &VigilConfig, _frame: &Frame) -> anyhow::Result<Vec<vigil_core::LandmarkSet>> {
    bail!("landmark detection needs the `camera` feature; pass --landmarks with a recording instead")
}

#[cfg(feature = "classifier")]
fn classify_frame(config: &VigilConfig, frame: &Frame) -> anyhow::Result<vigil_eye::Classification> {
    use vigil_eye::FrameClassifier;
    let mut classifier = vigil_eye::OnnxClassifier::new(&config.vision.classifier_path())?;
    Ok(classifier.classify(frame)?)
}

#[cfg(not(feature = "classifier"))]
fn classify_frame(_config: &VigilConfig, _frame: &Frame) -> anyhow::Result<vigil_eye::Classification> {
    bail!("the image classifier needs the `classifier` feature")
}

async fn replay_samples(config: VigilConfig, path: &Path, fps: u32, silent: bool) -> anyhow::Result<()> {
    let interval = frame_interval(fps)?;
    let samples = replay::read_samples(path)
        .with_context(|| format!("failed to read samples from {}", path.display()))?;
    info!("Replaying {} samples from {}", samples.len(), path.display());

    let alarm = alarm_sink(&config, silent)?;
    let mut session = DetectionSession::new(config.detection.clone(), alarm.clone())
        .with_history(&config.history)?;

    for (i, sample) in samples.into_iter().enumerate() {
        let report = session.process_sample(sample, i as u64, interval * i as u32);
        output::print_report(&report);
    }

    output::print_summary(session.summary());
    finish_alarm(&alarm).await;
    Ok(())
}

async fn replay_landmarks(config: VigilConfig, path: &Path, fps: u32, silent: bool) -> anyhow::Result<()> {
    let interval = frame_interval(fps)?;
    let provider = RecordedLandmarks::from_file(path)?;
    let total = provider.len();

    let alarm = alarm_sink(&config, silent)?;
    let mut session = DetectionSession::new(config.detection.clone(), alarm.clone())
        .with_detector(Detector::Landmarks(Box::new(provider)))
        .with_history(&config.history)?;

    let (tx, rx) = mpsc::channel(32);
    tokio::spawn(async move {
        for i in 0..total {
            // Recorded landmarks carry no pixels
            let frame = Frame::blank(1, 1, i as u64, interval * i as u32);
            if tx.send(frame).await.is_err() {
                break;
            }
        }
    });

    let summary = session
        .run(rx, |report| {
            output::print_report(report);
            true
        })
        .await;
    output::print_summary(&summary);
    finish_alarm(&alarm).await;
    Ok(())
}

#[cfg(feature = "camera")]
async fn watch(config: VigilConfig, display: bool, silent: bool) -> anyhow::Result<()> {
    use vigil_eye::{CameraManager, DetectorMode, DisplayWindow, FacemarkProvider, SnapshotSink};

    let detector = match config.vision.mode {
        DetectorMode::Landmarks => Detector::Landmarks(Box::new(FacemarkProvider::new(&config.vision)?)),
        DetectorMode::Classifier => classifier_detector(&config)?,
    };

    let mut session = DetectionSession::new(config.detection.clone(), alarm_sink(&config, silent)?)
        .with_detector(detector)
        .with_history(&config.history)?;
    if config.vision.snapshot.enabled {
        session = session.with_snapshots(SnapshotSink::from_config(&config.vision.snapshot));
    }

    let camera = CameraManager::new(Arc::new(config.vision.clone()));
    let mut frames = camera.start_stream()?;
    let window = if display || config.vision.display {
        Some(DisplayWindow::open("vigil")?)
    } else {
        None
    };

    info!("Monitoring driver, press Ctrl-C{} to stop", if window.is_some() { " or q" } else { "" });

    let exit = loop {
        let frame = tokio::select! {
            frame = frames.recv() => match frame {
                Some(frame) => frame,
                None => break WatchExit::StreamEnded(camera.failure()),
            },
            _ = tokio::signal::ctrl_c() => break WatchExit::Interrupted,
        };

        let report = match session.process(&frame) {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!("Frame {} skipped: {}", frame.sequence, e);
                continue;
            }
        };

        if let Some(window) = &window {
            if !window.show(&frame, &report)? {
                break WatchExit::Quit;
            }
        }
    };

    camera.stop();
    output::print_summary(session.summary());
    exit.into_result()
}

#[cfg(all(feature = "camera", feature = "classifier"))]
fn classifier_detector(config: &VigilConfig) -> anyhow::Result<Detector> {
    let classifier = vigil_eye::OnnxClassifier::new(&config.vision.classifier_path())?;
    Ok(Detector::Classifier(Box::new(classifier)))
}

#[cfg(all(feature = "camera", not(feature = "classifier")))]
fn classifier_detector(_config: &VigilConfig) -> anyhow::Result<Detector> {
    bail!("classifier mode needs the `classifier` feature")
}

#[cfg(not(feature = "camera"))]
async fn watch(_config: VigilConfig, _display: bool, _silent: bool) -> anyhow::Result<()> {
    bail!("live monitoring needs the `camera` feature (build with --features camera)")
}

fn show_history(config: &VigilConfig, lines: usize, events: bool) -> anyhow::Result<()> {
    let (path, kind) = if events {
        (&config.history.events_path, RecordKind::Event)
    } else {
        (&config.history.status_path, RecordKind::Status)
    };

    if !path.exists() {
        println!("No history at {}", path.display());
        return Ok(());
    }

    let rows = history::read_rows(path)
        .with_context(|| format!("failed to read history from {}", path.display()))?;
    let start = rows.len().saturating_sub(lines);
    println!("{}", kind.header().join("\t"));
    for row in &rows[start..] {
        println!("{}", row.join("\t"));
    }
    Ok(())
}
