//! Persisted run cursor.
//!
//! File format, one integer per line: row position, column position, time
//! index, key index. A missing file means a fresh start; so does a file that
//! cannot be parsed.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::planner::RunCursor;

#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The saved cursor, or `None` when there is nothing usable to resume.
    pub fn load(&self) -> Option<RunCursor> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return None,
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "unreadable checkpoint, starting fresh");
                return None;
            }
        };

        match parse_cursor(&text) {
            Some(cursor) => {
                info!(path = %self.path.display(), ?cursor, "retrieved saved state");
                Some(cursor)
            }
            None => {
                warn!(path = %self.path.display(), "corrupt checkpoint, starting fresh");
                None
            }
        }
    }

    /// Replace the checkpoint in one step: write a sibling temp file, then
    /// rename it over the old one.
    pub fn save(&self, cursor: &RunCursor) -> io::Result<()> {
        let tmp_path = self.path.with_extension("tmp");
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(format_cursor(cursor).as_bytes())?;
        file.sync_all()?;
        fs::rename(tmp_path, &self.path)?;
        Ok(())
    }

    /// Remove the checkpoint once all work is done.
    pub fn clear(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err),
            _ => Ok(()),
        }
    }
}

fn format_cursor(cursor: &RunCursor) -> String {
    format!(
        "{}\n{}\n{}\n{}\n",
        cursor.row_position, cursor.col_position, cursor.time_index, cursor.key_index
    )
}

fn parse_cursor(text: &str) -> Option<RunCursor> {
    let values = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| line.parse::<usize>().ok())
        .collect::<Option<Vec<_>>>()?;

    match values.as_slice() {
        &[row_position, col_position, time_index, key_index] => Some(RunCursor {
            time_index,
            row_position,
            col_position,
            key_index,
        }),
        _ => None,
    }
}
