//! Configuration for vigil-eye

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// How faces are turned into observations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectorMode {
    /// 68-point landmarks, EAR and MAR thresholds
    Landmarks,
    /// Whole-frame image classifier
    Classifier,
}

/// Where non-Normal frames are saved for later review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    pub enabled: bool,
    pub dir: PathBuf,
    /// Minimum time between two snapshots of the same status
    pub min_interval_ms: u64,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: PathBuf::from("personalized_data"),
            min_interval_ms: 1_000,
        }
    }
}

impl SnapshotConfig {
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }
}

/// Vision system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    /// USB camera device index (0, 1, 2, etc.)
    pub camera_id: u32,
    /// Target frame rate (frames per second)
    pub frame_rate: u32,
    /// Camera resolution (width, height)
    pub resolution: (u32, u32),
    pub mode: DetectorMode,
    /// Directory holding the model files below
    pub model_path: PathBuf,
    /// Haar cascade for face boxes
    pub cascade_file: String,
    /// LBF facemark model
    pub facemark_file: String,
    /// ONNX eye/yawn classifier
    pub classifier_file: String,
    /// Smallest face edge in pixels passed to the cascade
    pub min_face_size: u32,
    /// Show a window with the annotated frame
    pub display: bool,
    pub snapshot: SnapshotConfig,
}

impl Default for VisionConfig {
    fn default() -> Self {
        let model_path = dirs::home_dir()
            .map(|mut p| {
                p.push(".vigil");
                p.push("models");
                p
            })
            .unwrap_or_else(|| PathBuf::from("./models"));

        Self {
            camera_id: 0,
            frame_rate: 30,
            resolution: (640, 480),
            mode: DetectorMode::Landmarks,
            model_path,
            cascade_file: "haarcascade_frontalface_default.xml".to_string(),
            facemark_file: "lbfmodel.yaml".to_string(),
            classifier_file: "drowsiness_classifier.onnx".to_string(),
            min_face_size: 80,
            display: false,
            snapshot: SnapshotConfig::default(),
        }
    }
}

impl VisionConfig {
    pub fn cascade_path(&self) -> PathBuf {
        self.model_path.join(&self.cascade_file)
    }

    pub fn facemark_path(&self) -> PathBuf {
        self.model_path.join(&self.facemark_file)
    }

    pub fn classifier_path(&self) -> PathBuf {
        self.model_path.join(&self.classifier_file)
    }

    /// Time between frames at the configured rate
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.frame_rate.max(1) as f64)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.frame_rate == 0 || self.frame_rate > 120 {
            return Err("Frame rate must be between 1 and 120".to_string());
        }

        if self.resolution.0 == 0 || self.resolution.1 == 0 {
            return Err("Resolution must be non-zero".to_string());
        }

        if self.resolution.0 > 7680 || self.resolution.1 > 4320 {
            return Err("Resolution too large (max 8K)".to_string());
        }

        if self.camera_id > 100 {
            return Err("Camera ID too large (max 100)".to_string());
        }

        if self.min_face_size == 0 || self.min_face_size > self.resolution.0.min(self.resolution.1) {
            return Err("min_face_size must be between 1 and the smaller frame edge".to_string());
        }

        for (name, file) in [
            ("cascade_file", &self.cascade_file),
            ("facemark_file", &self.facemark_file),
            ("classifier_file", &self.classifier_file),
        ] {
            if file.trim().is_empty() {
                return Err(format!("{} must not be empty", name));
            }
        }

        if self.snapshot.enabled && self.snapshot.dir.as_os_str().is_empty() {
            return Err("snapshot.dir must be set when snapshots are enabled".to_string());
        }

        Ok(())
    }
}
