//! Face landmark providers

use crate::error::VisionError;
use crate::frame::Frame;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};
use vigil_core::LandmarkSet;

/// Finds the 68-point landmarks of every face in a frame
pub trait LandmarkProvider: Send {
    fn name(&self) -> &str;

    /// All faces in the frame; empty when no face was found
    fn detect(&mut self, frame: &Frame) -> Result<Vec<LandmarkSet>, VisionError>;
}

/// File layout: `{"frames": [[face, ...], ...]}` or just the outer array, with
/// each face a list of 68 points
#[derive(Deserialize)]
#[serde(untagged)]
enum Recording {
    Wrapped { frames: Vec<Vec<LandmarkSet>> },
    Bare(Vec<Vec<LandmarkSet>>),
}

/// Replays landmarks recorded earlier, indexed by frame sequence
pub struct RecordedLandmarks {
    frames: Vec<Vec<LandmarkSet>>,
}

impl RecordedLandmarks {
    pub fn new(frames: Vec<Vec<LandmarkSet>>) -> Self {
        Self { frames }
    }

    pub fn from_json(content: &str) -> Result<Self, VisionError> {
        let recording: Recording = serde_json::from_str(content)
            .map_err(|e| VisionError::Processing(format!("Invalid landmark recording: {}", e)))?;
        let frames = match recording {
            Recording::Wrapped { frames } | Recording::Bare(frames) => frames,
        };
        Ok(Self::new(frames))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, VisionError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let recording = Self::from_json(&content)?;
        info!(
            "Loaded {} recorded frames from {}",
            recording.len(),
            path.display()
        );
        Ok(recording)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl LandmarkProvider for RecordedLandmarks {
    fn name(&self) -> &str {
        "recorded"
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<LandmarkSet>, VisionError> {
        let faces = usize::try_from(frame.sequence)
            .ok()
            .and_then(|idx| self.frames.get(idx))
            .cloned();

        match faces {
            Some(faces) => Ok(faces),
            None => {
                debug!("No recorded landmarks for frame {}", frame.sequence);
                Ok(Vec::new())
            }
        }
    }
}
