//! Test fixtures for matrix-harvest.
//!
//! Provides:
//! - A scripted provider with per-key quotas and a call log
//! - A temp workspace holding the input files a run reads

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::json;

use matrix_harvest::bing::MatrixResponse;
use matrix_harvest::config::RunConfig;
use matrix_harvest::coords::Coordinate;
use matrix_harvest::error::ProviderError;
use matrix_harvest::traits::{DistanceMatrixProvider, MatrixRequest};

/// One recorded `fetch` call.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub key: String,
    pub origins: Vec<String>,
    pub destinations: Vec<String>,
    pub start_time: String,
}

/// Provider double. Keys succeed until their quota runs out; unknown keys
/// always fail with status 401.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    quotas: RefCell<HashMap<String, usize>>,
    calls: RefCell<Vec<Call>>,
    served: Cell<usize>,
    interrupt: Option<(usize, Arc<AtomicBool>)>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// `key` answers `successes` requests, then starts failing.
    pub fn with_key(self, key: &str, successes: usize) -> Self {
        self.quotas.borrow_mut().insert(key.to_string(), successes);
        self
    }

    /// Raise `flag` during the `call_number`-th successful call (1-based).
    pub fn interrupt_on(mut self, call_number: usize, flag: Arc<AtomicBool>) -> Self {
        self.interrupt = Some((call_number, flag));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn served(&self) -> usize {
        self.served.get()
    }
}

impl DistanceMatrixProvider for ScriptedProvider {
    fn fetch(&self, request: &MatrixRequest<'_>, key: &str) -> Result<MatrixResponse, ProviderError> {
        self.calls.borrow_mut().push(Call {
            key: key.to_string(),
            origins: request.origins.iter().map(|c| c.identifier.clone()).collect(),
            destinations: request.destinations.iter().map(|c| c.identifier.clone()).collect(),
            start_time: request.start_time.to_string(),
        });

        let mut quotas = self.quotas.borrow_mut();
        match quotas.get_mut(key) {
            Some(remaining) if *remaining > 0 => *remaining -= 1,
            _ => return Ok(status_only(401)),
        }
        drop(quotas);

        self.served.set(self.served.get() + 1);
        if let Some((call_number, flag)) = &self.interrupt {
            if self.served.get() == *call_number {
                flag.store(true, Ordering::SeqCst);
            }
        }

        Ok(full_matrix(request.origins, request.destinations))
    }
}

fn location(coord: &Coordinate) -> serde_json::Value {
    json!({
        "latitude": coord.latitude.parse::<f64>().unwrap(),
        "longitude": coord.longitude.parse::<f64>().unwrap(),
    })
}

pub fn status_only(code: u16) -> MatrixResponse {
    serde_json::from_value(json!({ "statusCode": code, "resourceSets": [] })).unwrap()
}

/// Successful response with one cell per origin x destination pair.
pub fn full_matrix(origins: &[Coordinate], destinations: &[Coordinate]) -> MatrixResponse {
    let mut results = Vec::new();
    for o in 0..origins.len() {
        for d in 0..destinations.len() {
            results.push(json!({
                "originIndex": o,
                "destinationIndex": d,
                "travelDuration": (o * 10 + d) as f64 + 0.5,
                "totalWalkDuration": 0,
                "travelDistance": 1.25,
            }));
        }
    }
    serde_json::from_value(json!({
        "statusCode": 200,
        "resourceSets": [{
            "resources": [{
                "origins": origins.iter().map(location).collect::<Vec<_>>(),
                "destinations": destinations.iter().map(location).collect::<Vec<_>>(),
                "results": results,
            }]
        }]
    }))
    .unwrap()
}

/// Temp directory pre-populated with coordinate, time and key files.
pub struct Workspace {
    pub dir: tempfile::TempDir,
    pub config: RunConfig,
}

impl Workspace {
    pub fn new(coordinates: usize, times: &[&str], keys: &[&str]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = |name: &str| -> PathBuf { dir.path().join(name) };

        let coords: String = (0..coordinates)
            .map(|i| format!("p{i} 47.{:04} -122.{:04}\n", i + 1, i + 1))
            .collect();
        fs::write(path("coords.txt"), coords).unwrap();
        fs::write(path("times.txt"), times.join("\n")).unwrap();
        fs::write(path("keys.txt"), keys.join("\n")).unwrap();

        let config = RunConfig {
            coords_path: path("coords.txt"),
            times_path: path("times.txt"),
            keys_path: path("keys.txt"),
            state_path: path("state.txt"),
            output_path: path("output.txt"),
            ..RunConfig::default()
        };
        Self { dir, config }
    }

    pub fn output_lines(&self) -> Vec<String> {
        fs::read_to_string(&self.config.output_path)
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn checkpoint(&self) -> Option<String> {
        fs::read_to_string(&self.config.state_path).ok()
    }
}
