//! Recorded ratio streams
//!
//! A replay file is CSV with one frame per line: `ear,mar`. An optional
//! header row is skipped, and an empty line (or empty fields) marks a
//! frame in which no face was found.

use crate::csv::split_line;
use crate::error::{Error, Result};
use crate::ratios::RatioSample;
use std::path::Path;

/// Parse replay content into per-frame samples
pub fn parse_samples(content: &str) -> Result<Vec<Option<RatioSample>>> {
    let mut samples = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        let fields = split_line(line);
        let fields: Vec<&str> = fields.iter().map(|f| f.trim()).collect();

        if fields.iter().all(|f| f.is_empty()) {
            samples.push(None);
            continue;
        }

        if fields.len() < 2 {
            return Err(Error::Parse(format!(
                "line {}: expected ear,mar",
                idx + 1
            )));
        }

        let parsed = (fields[0].parse::<f32>(), fields[1].parse::<f32>());
        let (ear, mar) = match parsed {
            (Ok(ear), Ok(mar)) => (ear, mar),
            // A leading non-numeric row is a header
            _ if idx == 0 => continue,
            _ => {
                return Err(Error::Parse(format!(
                    "line {}: invalid ratios '{}'",
                    idx + 1,
                    line.trim()
                )))
            }
        };

        let sample = RatioSample::new(ear, mar).ok_or_else(|| {
            Error::Parse(format!(
                "line {}: ratios must be finite and non-negative",
                idx + 1
            ))
        })?;
        samples.push(Some(sample));
    }

    Ok(samples)
}

/// Read a replay file
pub fn read_samples(path: impl AsRef<Path>) -> Result<Vec<Option<RatioSample>>> {
    let content = std::fs::read_to_string(path.as_ref())?;
    parse_samples(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_header_and_gaps() {
        let samples = parse_samples("ear,mar\n0.30,0.20\n\n0.18,0.70\n").unwrap();
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0], RatioSample::new(0.30, 0.20));
        assert_eq!(samples[1], None);
        assert_eq!(samples[2], RatioSample::new(0.18, 0.70));
    }

    #[test]
    fn test_parse_without_header() {
        let samples = parse_samples("0.25,0.5\n").unwrap();
        assert_eq!(samples, vec![RatioSample::new(0.25, 0.5)]);
    }

    #[test]
    fn test_empty_fields_mean_no_face() {
        let samples = parse_samples("0.3,0.2\n,\n").unwrap();
        assert_eq!(samples[1], None);
    }

    #[test]
    fn test_rejects_bad_rows() {
        assert!(parse_samples("0.3,0.2\nabc,0.2\n").is_err());
        assert!(parse_samples("0.3\n").is_err());
        assert!(parse_samples("0.3,-1.0\n").is_err());
    }

    #[test]
    fn test_read_missing_file() {
        assert!(read_samples("/nonexistent/samples.csv").is_err());
    }
}
