//! Append-only results file.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::bing::CellResult;

const SEPARATOR: &str = "   ";

pub const HEADER: &str =
    "OriginIndex   DestinationIndex    Date   Time   TravelDistance   TravelDuration";

/// Results sink tagged with the run's fixed date.
///
/// The file is never truncated; the header goes in only while it is empty.
#[derive(Debug, Clone)]
pub struct OutputFile {
    path: PathBuf,
    date_label: String,
}

impl OutputFile {
    pub fn new(path: impl Into<PathBuf>, date: NaiveDate) -> Self {
        Self {
            path: path.into(),
            date_label: date.format("%-d-%-m-%Y").to_string(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one line per non-self-pair cell. Returns the number of lines
    /// written.
    pub fn append(&self, time_label: &str, cells: &[CellResult]) -> io::Result<usize> {
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;

        let mut buf = String::new();
        if file.metadata()?.len() == 0 {
            buf.push_str(HEADER);
            buf.push('\n');
        }

        let mut written = 0;
        for cell in cells.iter().filter(|cell| !cell.is_self_pair()) {
            let distance = cell.travel_distance.to_string();
            let duration = cell.travel_duration.to_string();
            let fields = [
                cell.origin.as_str(),
                cell.destination.as_str(),
                self.date_label.as_str(),
                time_label,
                distance.as_str(),
                duration.as_str(),
            ];
            buf.push_str(&fields.join(SEPARATOR));
            buf.push('\n');
            written += 1;
        }

        file.write_all(buf.as_bytes())?;
        file.flush()?;
        Ok(written)
    }
}
