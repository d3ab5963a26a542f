//! Coordinate loading and lookup.
//!
//! Each coordinate keeps the latitude/longitude text exactly as supplied, so
//! requests echo the caller's precision. Lookups from provider responses go
//! through a normalized `lat,lon` key instead.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::InputError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coordinate {
    pub identifier: String,
    pub latitude: String,
    pub longitude: String,
}

impl Coordinate {
    pub fn new(
        identifier: impl Into<String>,
        latitude: impl Into<String>,
        longitude: impl Into<String>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            latitude: latitude.into(),
            longitude: longitude.into(),
        }
    }

    /// `lat,lon` as sent to the provider.
    pub fn pair(&self) -> String {
        format!("{},{}", self.latitude, self.longitude)
    }
}

/// Ordinal-ordered coordinates plus a location -> identifier lookup.
///
/// Built once per run and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct CoordinateIndex {
    coords: Vec<Coordinate>,
    by_location: HashMap<String, usize>,
}

impl CoordinateIndex {
    /// Index coordinates in the given order. Ordinal position is the
    /// position in `coords`.
    pub fn new(coords: Vec<Coordinate>) -> Result<Self, InputError> {
        let mut by_location = HashMap::new();
        let mut seen_ids = HashMap::new();

        for (ordinal, coord) in coords.iter().enumerate() {
            if seen_ids.insert(coord.identifier.clone(), ordinal).is_some() {
                return Err(InputError::DuplicateIdentifier(coord.identifier.clone()));
            }
            let lat = parse_number(&coord.latitude, ordinal + 1)?;
            let lon = parse_number(&coord.longitude, ordinal + 1)?;
            by_location.entry(location_key(lat, lon)).or_insert(ordinal);
        }

        Ok(Self { coords, by_location })
    }

    /// Parse `identifier latitude longitude` records, one per line.
    pub fn parse(text: &str) -> Result<Self, InputError> {
        let mut coords = Vec::new();
        for (line_no, line) in text.lines().enumerate() {
            let fields: Vec<&str> = line.split_whitespace().collect();
            match fields.as_slice() {
                [] => continue,
                [id, lat, lon] => {
                    parse_number(lat, line_no + 1)?;
                    parse_number(lon, line_no + 1)?;
                    coords.push(Coordinate::new(*id, *lat, *lon));
                }
                _ => {
                    return Err(InputError::MalformedCoordinate {
                        line: line_no + 1,
                        content: line.to_string(),
                    });
                }
            }
        }
        Self::new(coords)
    }

    pub fn load(path: &Path) -> Result<Self, InputError> {
        Self::parse(&read_file(path)?)
    }

    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    pub fn get(&self, ordinal: usize) -> Option<&Coordinate> {
        self.coords.get(ordinal)
    }

    /// Up to `width` coordinates starting at `start`, clamped to the end.
    pub fn slice(&self, start: usize, width: usize) -> &[Coordinate] {
        let start = start.min(self.coords.len());
        let end = start.saturating_add(width).min(self.coords.len());
        &self.coords[start..end]
    }

    /// Translate a provider-echoed location back to the caller's identifier.
    pub fn identifier_at(&self, latitude: f64, longitude: f64) -> Option<&str> {
        self.by_location
            .get(&location_key(latitude, longitude))
            .and_then(|&ordinal| self.coords.get(ordinal))
            .map(|coord| coord.identifier.as_str())
    }
}

/// Read a one-value-per-line list, trimming and skipping blank lines.
pub fn read_list(path: &Path) -> Result<Vec<String>, InputError> {
    Ok(read_file(path)?
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Time-of-day labels; at least one is required.
pub fn load_times(path: &Path) -> Result<Vec<String>, InputError> {
    let times = read_list(path)?;
    if times.is_empty() {
        return Err(InputError::NoTimes(path.to_path_buf()));
    }
    Ok(times)
}

/// API keys in rotation order; at least one is required.
pub fn load_keys(path: &Path) -> Result<Vec<String>, InputError> {
    let keys = read_list(path)?;
    if keys.is_empty() {
        return Err(InputError::NoKeys(path.to_path_buf()));
    }
    Ok(keys)
}

fn read_file(path: &Path) -> Result<String, InputError> {
    fs::read_to_string(path).map_err(|source| InputError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_number(value: &str, line: usize) -> Result<f64, InputError> {
    value.parse::<f64>().map_err(|_| InputError::InvalidNumber {
        line,
        value: value.to_string(),
    })
}

fn location_key(latitude: f64, longitude: f64) -> String {
    format!("{:.6},{:.6}", latitude, longitude)
}
