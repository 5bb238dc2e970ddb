//! Append-only CSV history of driver status and alarm events
//!
//! Two file layouts exist: a per-frame status log with columns
//! `Timestamp,Status` and an event log with `Time,Event,Details`. A file
//! receives its header only when it is created or empty, so restarting a
//! session keeps appending to the same history.

use crate::csv::{format_row, split_line};
use crate::decision::DriverStatus;
use crate::error::{Error, Result};
use chrono::{DateTime, Local};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Timestamp layout used in every history row
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn format_timestamp(at: &DateTime<Local>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Which layout a history file uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Status,
    Event,
}

impl RecordKind {
    pub fn header(&self) -> &'static [&'static str] {
        match self {
            RecordKind::Status => &["Timestamp", "Status"],
            RecordKind::Event => &["Time", "Event", "Details"],
        }
    }
}

/// One history row
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryRecord {
    Status {
        timestamp: DateTime<Local>,
        status: DriverStatus,
    },
    Event {
        time: DateTime<Local>,
        event: String,
        details: String,
    },
}

impl HistoryRecord {
    pub fn status(status: DriverStatus) -> Self {
        HistoryRecord::Status {
            timestamp: Local::now(),
            status,
        }
    }

    pub fn event(event: impl Into<String>, details: impl Into<String>) -> Self {
        HistoryRecord::Event {
            time: Local::now(),
            event: event.into(),
            details: details.into(),
        }
    }

    pub fn kind(&self) -> RecordKind {
        match self {
            HistoryRecord::Status { .. } => RecordKind::Status,
            HistoryRecord::Event { .. } => RecordKind::Event,
        }
    }

    fn fields(&self) -> Vec<String> {
        match self {
            HistoryRecord::Status { timestamp, status } => {
                vec![format_timestamp(timestamp), status.to_string()]
            }
            HistoryRecord::Event {
                time,
                event,
                details,
            } => vec![format_timestamp(time), event.clone(), details.clone()],
        }
    }
}

/// An open history file
#[derive(Debug)]
pub struct HistoryLog {
    path: PathBuf,
    kind: RecordKind,
    file: File,
}

impl HistoryLog {
    /// Open `path` for appending, creating parent directories and the header as needed
    pub fn open(path: impl AsRef<Path>, kind: RecordKind) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let needs_header = match fs::metadata(&path) {
            Ok(meta) => meta.len() == 0,
            Err(_) => true,
        };

        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;

        if needs_header {
            writeln!(file, "{}", format_row(kind.header()))?;
            file.flush()?;
            debug!("Created history file {}", path.display());
        }

        Ok(Self { path, kind, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    /// Append and flush one row
    pub fn append(&mut self, record: &HistoryRecord) -> Result<()> {
        if record.kind() != self.kind {
            return Err(Error::History(format!(
                "{:?} record written to {:?} history {}",
                record.kind(),
                self.kind,
                self.path.display()
            )));
        }

        writeln!(self.file, "{}", format_row(&record.fields()))?;
        self.file.flush()?;
        Ok(())
    }
}

/// Read every data row of a history file, header excluded
pub fn read_rows(path: impl AsRef<Path>) -> Result<Vec<Vec<String>>> {
    let file = File::open(path.as_ref())?;
    let mut rows = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if idx == 0 || line.trim().is_empty() {
            continue;
        }
        rows.push(split_line(&line));
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn fixed_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap()
    }

    #[test]
    fn test_header_written_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.csv");

        {
            let mut log = HistoryLog::open(&path, RecordKind::Status).unwrap();
            log.append(&HistoryRecord::Status {
                timestamp: fixed_time(),
                status: DriverStatus::Normal,
            })
            .unwrap();
        }
        {
            let mut log = HistoryLog::open(&path, RecordKind::Status).unwrap();
            log.append(&HistoryRecord::Status {
                timestamp: fixed_time(),
                status: DriverStatus::Drowsy,
            })
            .unwrap();
        }

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Timestamp,Status",
                "2024-03-09 14:05:07,Normal",
                "2024-03-09 14:05:07,Drowsy"
            ]
        );
    }

    #[test]
    fn test_empty_file_gets_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("events.csv");
        File::create(&path).unwrap();

        HistoryLog::open(&path, RecordKind::Event).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "Time,Event,Details\n");
    }

    #[test]
    fn test_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs/2024/history.csv");
        let log = HistoryLog::open(&path, RecordKind::Status).unwrap();
        assert_eq!(log.path(), path.as_path());
        assert!(path.exists());
    }

    #[test]
    fn test_event_details_are_quoted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("events.csv");
        let mut log = HistoryLog::open(&path, RecordKind::Event).unwrap();
        log.append(&HistoryRecord::Event {
            time: fixed_time(),
            event: "DrowsinessAlarm".to_string(),
            details: "ear=0.180, closed_frames=20".to_string(),
        })
        .unwrap();

        let rows = read_rows(&path).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][1], "DrowsinessAlarm");
        assert_eq!(rows[0][2], "ear=0.180, closed_frames=20");
    }

    #[test]
    fn test_rejects_mismatched_record() {
        let dir = TempDir::new().unwrap();
        let mut log = HistoryLog::open(dir.path().join("h.csv"), RecordKind::Status).unwrap();
        let err = log
            .append(&HistoryRecord::event("FaceLost", ""))
            .unwrap_err();
        assert!(matches!(err, Error::History(_)));
    }

    #[test]
    fn test_read_rows_missing_file() {
        assert!(read_rows("/nonexistent/history.csv").is_err());
    }
}
