//! JPEG snapshots of frames where the driver is drowsy or yawning

use crate::config::SnapshotConfig;
use crate::error::VisionError;
use crate::frame::Frame;
use chrono::{DateTime, Local};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use vigil_core::DriverStatus;

/// Saves `<Status>_<YYYY-mm-dd HH-MM-SS>.jpg` files, at most one per status per interval
///
/// A name already taken within the same wall-clock second gets the frame
/// sequence appended, so an earlier snapshot is never overwritten.
pub struct SnapshotSink {
    dir: PathBuf,
    min_interval: Duration,
    // Session time of the last snapshot per status
    last_saved: HashMap<DriverStatus, Duration>,
}

impl SnapshotSink {
    pub fn new(dir: impl Into<PathBuf>, min_interval: Duration) -> Self {
        Self {
            dir: dir.into(),
            min_interval,
            last_saved: HashMap::new(),
        }
    }

    pub fn from_config(config: &SnapshotConfig) -> Self {
        Self::new(config.dir.clone(), config.min_interval())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name for a snapshot taken at `at`
    pub fn file_name(status: DriverStatus, at: &DateTime<Local>) -> String {
        // Colons are not portable in file names
        format!("{}_{}.jpg", status, at.format("%Y-%m-%d %H-%M-%S"))
    }

    /// File name used when [`SnapshotSink::file_name`] is already taken
    pub fn sequenced_file_name(status: DriverStatus, at: &DateTime<Local>, sequence: u64) -> String {
        format!("{}_{}_{}.jpg", status, at.format("%Y-%m-%d %H-%M-%S"), sequence)
    }

    /// Save the frame unless this status was saved less than one interval ago
    pub fn save(
        &mut self,
        frame: &Frame,
        status: DriverStatus,
        at: &DateTime<Local>,
    ) -> Result<Option<PathBuf>, VisionError> {
        if let Some(last) = self.last_saved.get(&status) {
            if frame.captured_at.saturating_sub(*last) < self.min_interval {
                return Ok(None);
            }
        }

        std::fs::create_dir_all(&self.dir)?;
        let mut path = self.dir.join(Self::file_name(status, at));
        if path.exists() {
            path = self.dir.join(Self::sequenced_file_name(status, at, frame.sequence));
        }
        frame.image.save(&path)?;
        self.last_saved.insert(status, frame.captured_at);

        debug!("Saved snapshot {}", path.display());
        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn at() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 5, 17, 8, 30, 12).unwrap()
    }

    fn frame(ms: u64) -> Frame {
        Frame::blank(16, 16, ms / 33, Duration::from_millis(ms))
    }

    #[test]
    fn test_file_name_has_no_colons() {
        let name = SnapshotSink::file_name(DriverStatus::Drowsy, &at());
        assert_eq!(name, "Drowsy_2024-05-17 08-30-12.jpg");
    }

    #[test]
    fn test_save_writes_jpeg() {
        let dir = TempDir::new().unwrap();
        let mut sink = SnapshotSink::new(dir.path().join("snaps"), Duration::from_secs(1));
        let path = sink
            .save(&frame(0), DriverStatus::Yawning, &at())
            .unwrap()
            .unwrap();
        assert!(path.exists());
        assert!(image::open(&path).is_ok());
    }

    #[test]
    fn test_same_second_does_not_overwrite() {
        let dir = TempDir::new().unwrap();
        let mut sink = SnapshotSink::new(dir.path(), Duration::ZERO);

        let first = sink.save(&frame(0), DriverStatus::Drowsy, &at()).unwrap().unwrap();
        let second = sink.save(&frame(66), DriverStatus::Drowsy, &at()).unwrap().unwrap();

        assert_ne!(first, second);
        assert!(first.ends_with("Drowsy_2024-05-17 08-30-12.jpg"));
        assert!(second.ends_with("Drowsy_2024-05-17 08-30-12_2.jpg"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn test_rate_limited_per_status() {
        let dir = TempDir::new().unwrap();
        let mut sink = SnapshotSink::new(dir.path(), Duration::from_secs(1));

        assert!(sink.save(&frame(0), DriverStatus::Drowsy, &at()).unwrap().is_some());
        assert!(sink.save(&frame(500), DriverStatus::Drowsy, &at()).unwrap().is_none());
        // Another status has its own budget
        assert!(sink.save(&frame(500), DriverStatus::Yawning, &at()).unwrap().is_some());
        assert!(sink.save(&frame(1_000), DriverStatus::Drowsy, &at()).unwrap().is_some());
    }
}
