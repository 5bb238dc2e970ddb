//! vigil-eye: the vision side of driver monitoring
//!
//! Turns frames into observations for the decision engine, either through
//! 68-point face landmarks (EAR/MAR) or through a whole-frame classifier,
//! and runs them through a [`DetectionSession`] that writes history, saves
//! snapshots and raises alarms.
//!
//! OpenCV capture, landmark fitting and the display window need the `camera`
//! feature; the ONNX classifier needs the `classifier` feature.

pub mod classifier;
pub mod config;
pub mod error;
pub mod frame;
pub mod landmarks;
pub mod overlay;
pub mod session;
pub mod snapshot;

#[cfg(feature = "camera")]
pub mod camera;
#[cfg(feature = "camera")]
mod cv;
#[cfg(feature = "camera")]
pub mod display;
#[cfg(feature = "camera")]
pub mod facemark;

pub use classifier::{Classification, ClassifierLabel, FrameClassifier};
pub use config::{DetectorMode, SnapshotConfig, VisionConfig};
pub use error::VisionError;
pub use frame::Frame;
pub use landmarks::{LandmarkProvider, RecordedLandmarks};
pub use session::{DetectionSession, Detector, FrameAnalysis, FrameReport, SessionSummary};
pub use snapshot::SnapshotSink;

#[cfg(feature = "camera")]
pub use camera::CameraManager;
#[cfg(feature = "camera")]
pub use display::DisplayWindow;
#[cfg(feature = "camera")]
pub use facemark::FacemarkProvider;
#[cfg(feature = "classifier")]
pub use classifier::OnnxClassifier;
