//! vigil-core: geometry and decision logic for driver drowsiness detection
//!
//! Turns 68-point facial landmarks into eye and mouth aspect ratios and feeds
//! them through a debounced state machine that decides when the driver is
//! drowsy or yawning. Everything here is synchronous and free of native
//! dependencies; capture, inference and sound live in the sibling crates.

pub mod error;
pub mod geometry;
pub mod landmarks;
pub mod ratios;
pub mod decision;
pub mod alert;
pub mod config;
pub mod csv;
pub mod history;
pub mod replay;

pub use error::{Error, Result};
pub use geometry::Point;
pub use landmarks::LandmarkSet;
pub use ratios::{eye_aspect_ratio, mouth_aspect_ratio, RatioSample};
pub use decision::{
    AlarmKind, Decision, DecisionEngine, DecisionState, DriverStatus, Observation,
};
pub use alert::AlertSink;
pub use config::{ConfigError, DecisionConfig, HistoryConfig};
pub use history::{HistoryLog, HistoryRecord, RecordKind};
