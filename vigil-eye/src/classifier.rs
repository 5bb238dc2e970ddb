//! Whole-frame eye/yawn classifier
//!
//! The model takes one 224x224 RGB image in NHWC layout with channels scaled
//! to [0, 1] and returns four scores in the order of [`ClassifierLabel::ALL`].

use crate::error::VisionError;
use crate::frame::Frame;
use image::imageops::{self, FilterType};
use image::RgbImage;
use serde::Serialize;
use std::fmt;
use vigil_core::Observation;

/// Model input edge in pixels
pub const INPUT_SIZE: u32 = 224;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierLabel {
    ClosedEyes,
    NoYawn,
    OpenEyes,
    Yawn,
}

impl ClassifierLabel {
    /// Labels in model output order
    pub const ALL: [ClassifierLabel; 4] = [
        ClassifierLabel::ClosedEyes,
        ClassifierLabel::NoYawn,
        ClassifierLabel::OpenEyes,
        ClassifierLabel::Yawn,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClassifierLabel::ClosedEyes => "closed_eyes",
            ClassifierLabel::NoYawn => "no_yawn",
            ClassifierLabel::OpenEyes => "open_eyes",
            ClassifierLabel::Yawn => "yawn",
        }
    }

    /// What the label says about the driver's face
    pub fn observation(&self) -> Observation {
        Observation {
            eyes_closed: *self == ClassifierLabel::ClosedEyes,
            mouth_open: *self == ClassifierLabel::Yawn,
        }
    }
}

impl fmt::Display for ClassifierLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of classifying one frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub label: ClassifierLabel,
    pub confidence: f32,
    /// Probabilities in label order
    pub scores: [f32; 4],
}

impl Classification {
    /// Build from raw model output, normalising logits when they are not already probabilities
    pub fn from_scores(raw: &[f32]) -> Result<Self, VisionError> {
        if raw.len() != ClassifierLabel::ALL.len() {
            return Err(VisionError::Model(format!(
                "expected {} classifier outputs, got {}",
                ClassifierLabel::ALL.len(),
                raw.len()
            )));
        }
        if raw.iter().any(|v| !v.is_finite()) {
            return Err(VisionError::Model("classifier output is not finite".to_string()));
        }

        let scores: [f32; 4] = if is_distribution(raw) {
            std::array::from_fn(|i| raw[i])
        } else {
            let probs = softmax(raw);
            std::array::from_fn(|i| probs[i])
        };

        let best = argmax(&scores);
        Ok(Self {
            label: ClassifierLabel::ALL[best],
            confidence: scores[best],
            scores,
        })
    }
}

fn is_distribution(values: &[f32]) -> bool {
    let sum: f32 = values.iter().sum();
    values.iter().all(|v| (0.0..=1.0).contains(v)) && (sum - 1.0).abs() < 1e-3
}

pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|v| v / sum).collect()
}

/// Index of the largest value; the first one wins ties
pub fn argmax(values: &[f32]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |(best, best_v), (i, &v)| {
            if v > best_v {
                (i, v)
            } else {
                (best, best_v)
            }
        })
        .0
}

/// Resize to the model input and flatten to NHWC floats in [0, 1]
pub fn preprocess(image: &RgbImage) -> Vec<f32> {
    let resized = imageops::resize(image, INPUT_SIZE, INPUT_SIZE, FilterType::Triangle);
    resized
        .as_raw()
        .iter()
        .map(|&v| v as f32 / 255.0)
        .collect()
}

/// Classifies whole frames into eye/yawn labels
pub trait FrameClassifier: Send {
    fn name(&self) -> &str;

    fn classify(&mut self, frame: &Frame) -> Result<Classification, VisionError>;
}

#[cfg(feature = "classifier")]
pub use onnx::OnnxClassifier;

#[cfg(feature = "classifier")]
mod onnx {
    use super::*;
    use ort::session::Session;
    use ort::value::Tensor;
    use std::path::Path;
    use tracing::{debug, info};

    /// Classifier backed by an ONNX Runtime session
    pub struct OnnxClassifier {
        session: Session,
    }

    impl OnnxClassifier {
        pub fn new(model_path: &Path) -> Result<Self, VisionError> {
            if !model_path.exists() {
                return Err(VisionError::Model(format!(
                    "classifier model not found at {}",
                    model_path.display()
                )));
            }

            let session = Session::builder()
                .and_then(|builder| builder.commit_from_file(model_path))
                .map_err(|e| VisionError::Ort(format!("Failed to load classifier: {}", e)))?;

            info!("Classifier loaded from {:?}", model_path);
            Ok(Self { session })
        }
    }

    impl FrameClassifier for OnnxClassifier {
        fn name(&self) -> &str {
            "onnx"
        }

        fn classify(&mut self, frame: &Frame) -> Result<Classification, VisionError> {
            let input = preprocess(&frame.image);
            let size = INPUT_SIZE as usize;
            let tensor = Tensor::from_array(([1usize, size, size, 3], input))
                .map_err(|e| VisionError::Ort(format!("Failed to create input tensor: {}", e)))?;

            let outputs = self
                .session
                .run(ort::inputs![tensor])
                .map_err(|e| VisionError::Ort(format!("Classifier inference failed: {}", e)))?;

            let (shape, scores) = outputs[0]
                .try_extract_tensor::<f32>()
                .map_err(|e| VisionError::Ort(format!("Failed to extract output tensor: {}", e)))?;
            debug!("Classifier output shape: {:?}", shape);

            Classification::from_scores(scores)
        }
    }
}
