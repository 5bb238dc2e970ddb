//! vigil-alarm: audible alarms for drowsiness alerts
//!
//! An [`AlarmController`] implements [`vigil_core::AlertSink`]: raising an
//! alarm returns immediately while a background task plays the sound for a
//! fixed duration.

pub mod config;
pub mod controller;
pub mod error;
pub mod players;

pub use config::{AlarmConfig, PlayerKind};
pub use controller::AlarmController;
pub use error::AlarmError;
pub use players::{AlarmPlayer, BellPlayer, CommandPlayer, SilentPlayer};
