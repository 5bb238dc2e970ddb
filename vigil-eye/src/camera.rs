//! USB webcam capture

use crate::config::VisionConfig;
use crate::cv::mat_to_image;
use crate::error::VisionError;
use crate::frame::Frame;
use opencv::{
    core::Mat,
    prelude::*,
    videoio::{VideoCapture, CAP_ANY, CAP_PROP_FPS, CAP_PROP_FRAME_HEIGHT, CAP_PROP_FRAME_WIDTH},
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Frames buffered between capture and processing (~1 second at 30fps)
const FRAME_BUFFER_SIZE: usize = 30;
const MAX_READ_FAILURES: u32 = 10;
/// Consecutive failed reads before the device is closed and opened again
const REOPEN_AFTER_FAILURES: u32 = 3;

/// Exponential backoff after a failed read: 200ms, 400ms, ... capped at 5s
fn read_backoff(failures: u32) -> Duration {
    Duration::from_millis((100u64 << failures.min(6)).min(5_000))
}

fn reopen_due(failures: u32) -> bool {
    failures > 0 && failures % REOPEN_AFTER_FAILURES == 0
}

/// Camera manager for USB webcam capture
pub struct CameraManager {
    config: Arc<VisionConfig>,
    capture: Arc<Mutex<Option<VideoCapture>>>,
    is_running: Arc<AtomicBool>,
    // Why the capture thread gave up, if it did
    failure: Arc<Mutex<Option<String>>>,
}

fn open_capture(config: &VisionConfig) -> Result<VideoCapture, VisionError> {
    let mut capture = VideoCapture::new(config.camera_id as i32, CAP_ANY)
        .map_err(|e| VisionError::Camera(format!("Failed to open camera {}: {}", config.camera_id, e)))?;

    if !capture
        .is_opened()
        .map_err(|e| VisionError::Camera(format!("Camera {} not opened: {}", config.camera_id, e)))?
    {
        return Err(VisionError::Camera(format!("Camera {} failed to open", config.camera_id)));
    }

    capture
        .set(CAP_PROP_FRAME_WIDTH, config.resolution.0 as f64)
        .map_err(|e| VisionError::Camera(format!("Failed to set width: {}", e)))?;
    capture
        .set(CAP_PROP_FRAME_HEIGHT, config.resolution.1 as f64)
        .map_err(|e| VisionError::Camera(format!("Failed to set height: {}", e)))?;
    capture
        .set(CAP_PROP_FPS, config.frame_rate as f64)
        .map_err(|e| VisionError::Camera(format!("Failed to set FPS: {}", e)))?;

    Ok(capture)
}

fn read_mat(capture: &Mutex<Option<VideoCapture>>) -> Result<Mat, VisionError> {
    let mut guard = capture.lock();
    let cap = guard
        .as_mut()
        .ok_or_else(|| VisionError::Camera("Camera not initialized".to_string()))?;

    let mut mat = Mat::default();
    if !cap.read(&mut mat)? {
        return Err(VisionError::Camera("Camera returned no frame".to_string()));
    }
    Ok(mat)
}

impl CameraManager {
    pub fn new(config: Arc<VisionConfig>) -> Self {
        Self {
            config,
            capture: Arc::new(Mutex::new(None)),
            is_running: Arc::new(AtomicBool::new(false)),
            failure: Arc::new(Mutex::new(None)),
        }
    }

    /// Open the device at the configured resolution and frame rate
    pub fn initialize(&self) -> Result<(), VisionError> {
        let mut guard = self.capture.lock();
        if guard.is_some() {
            return Ok(());
        }

        *guard = Some(open_capture(&self.config)?);
        info!(
            "Camera {} initialized at {}x{} @ {}fps",
            self.config.camera_id, self.config.resolution.0, self.config.resolution.1, self.config.frame_rate
        );
        Ok(())
    }

    /// Start capturing on a blocking thread; frames arrive on the returned channel
    pub fn start_stream(&self) -> Result<mpsc::Receiver<Frame>, VisionError> {
        if self.is_running.swap(true, Ordering::AcqRel) {
            return Err(VisionError::Camera("Camera stream already running".to_string()));
        }

        if let Err(e) = self.initialize() {
            self.is_running.store(false, Ordering::Release);
            return Err(e);
        }

        *self.failure.lock() = None;
        let (tx, rx) = mpsc::channel(FRAME_BUFFER_SIZE);
        let config = self.config.clone();
        let capture = self.capture.clone();
        let is_running = self.is_running.clone();
        let failure = self.failure.clone();

        tokio::task::spawn_blocking(move || {
            let frame_interval = config.frame_interval();
            let started = Instant::now();
            let mut sequence = 0u64;
            let mut failures = 0u32;

            while is_running.load(Ordering::Acquire) {
                let tick = Instant::now();

                match read_mat(&capture).and_then(|mat| mat_to_image(&mat)) {
                    Ok(image) => {
                        failures = 0;
                        let frame = Frame::new(image, sequence, started.elapsed());
                        sequence += 1;
                        if tx.blocking_send(frame).is_err() {
                            warn!("Frame receiver dropped, stopping camera stream");
                            break;
                        }
                    }
                    Err(e) => {
                        failures += 1;
                        error!("Camera read error: {}", e);
                        if failures > MAX_READ_FAILURES {
                            error!("Too many camera read errors ({}), stopping stream", failures);
                            *failure.lock() = Some(format!("{} consecutive read errors, last: {}", failures, e));
                            break;
                        }

                        std::thread::sleep(read_backoff(failures));

                        if reopen_due(failures) {
                            let mut guard = capture.lock();
                            // stop() clears the flag before taking this lock
                            if !is_running.load(Ordering::Acquire) {
                                break;
                            }
                            warn!("Reopening camera {} after {} failed reads", config.camera_id, failures);
                            *guard = None;
                            match open_capture(&config) {
                                Ok(reopened) => *guard = Some(reopened),
                                Err(e) => error!("Failed to reinitialize camera: {}", e),
                            }
                        }
                        continue;
                    }
                }

                let elapsed = tick.elapsed();
                if elapsed < frame_interval {
                    std::thread::sleep(frame_interval - elapsed);
                }
            }

            is_running.store(false, Ordering::Release);
            info!("Camera stream stopped after {} frames", sequence);
        });

        info!("Camera stream started");
        Ok(rx)
    }

    /// Capture a single frame
    pub fn capture_frame(&self) -> Result<Frame, VisionError> {
        self.initialize()?;
        let mat = read_mat(&self.capture)?;
        Ok(Frame::new(mat_to_image(&mat)?, 0, Duration::ZERO))
    }

    /// Stop the stream and release the device
    pub fn stop(&self) {
        self.is_running.store(false, Ordering::Release);
        *self.capture.lock() = None;
        info!("Camera stopped");
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Acquire)
    }

    /// Why the last stream stopped on its own, `None` after a clean stop
    pub fn failure(&self) -> Option<String> {
        self.failure.lock().clone()
    }
}

impl Drop for CameraManager {
    fn drop(&mut self) {
        self.stop();
    }
}
