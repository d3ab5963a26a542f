//! Run configuration.

use std::path::PathBuf;

use chrono::NaiveDate;

use crate::bing::BingConfig;

/// Largest origins x destinations product the provider accepts per call
/// when a start time is given.
pub const DEFAULT_CELL_LIMIT: usize = 10;

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub coords_path: PathBuf,
    pub times_path: PathBuf,
    pub keys_path: PathBuf,
    pub state_path: PathBuf,
    pub output_path: PathBuf,
    /// The single date all requests are made for.
    pub date: NaiveDate,
    /// UTC offset appended to every start time, e.g. `-07:00`.
    pub timezone: String,
    pub row_width: usize,
    pub col_width: usize,
    pub cell_limit: usize,
    pub provider: BingConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            coords_path: PathBuf::from("sample-input.txt"),
            times_path: PathBuf::from("times.txt"),
            keys_path: PathBuf::from("keys.txt"),
            state_path: PathBuf::from("state.txt"),
            output_path: PathBuf::from("output.txt"),
            date: NaiveDate::from_ymd_opt(2019, 8, 5).unwrap_or_default(),
            timezone: "-07:00".to_string(),
            row_width: 1,
            col_width: 9,
            cell_limit: DEFAULT_CELL_LIMIT,
            provider: BingConfig::default(),
        }
    }
}

impl RunConfig {
    /// Request timestamp for a time-of-day label, e.g.
    /// `2019-08-05T08:00:00-07:00`.
    pub fn start_time(&self, time: &str) -> String {
        format!("{}T{}{}", self.date.format("%Y-%m-%d"), time, self.timezone)
    }
}

/// Validate a `+HH:MM` / `-HH:MM` UTC offset.
pub fn parse_timezone(value: &str) -> Result<String, String> {
    let bytes = value.as_bytes();
    let well_formed = bytes.len() == 6
        && matches!(bytes[0], b'+' | b'-')
        && bytes[1].is_ascii_digit()
        && bytes[2].is_ascii_digit()
        && bytes[3] == b':'
        && bytes[4].is_ascii_digit()
        && bytes[5].is_ascii_digit();
    if well_formed {
        Ok(value.to_string())
    } else {
        Err(format!("expected an offset like -07:00, got {value:?}"))
    }
}
