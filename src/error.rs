//! Error types shared across the harvester.

use std::io;
use std::path::PathBuf;

/// Failures while loading the plain-text inputs.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("line {line}: expected `identifier latitude longitude`, got {content:?}")]
    MalformedCoordinate { line: usize, content: String },
    #[error("line {line}: {value:?} is not a number")]
    InvalidNumber { line: usize, value: String },
    #[error("duplicate coordinate identifier {0:?}")]
    DuplicateIdentifier(String),
    #[error("no API keys found in {}", .0.display())]
    NoKeys(PathBuf),
    #[error("no times found in {}", .0.display())]
    NoTimes(PathBuf),
}

/// Invalid batch geometry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    #[error("row and column widths must be at least 1 (got {row_width}x{col_width})")]
    ZeroWidth { row_width: usize, col_width: usize },
    #[error("{row_width}x{col_width} batches exceed the provider limit of {limit} cells")]
    TooManyCells {
        row_width: usize,
        col_width: usize,
        limit: usize,
    },
}

/// A single failed provider call. Every variant counts as a failure for key
/// rotation.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("request timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("provider returned status code {0}")]
    Status(u16),
    #[error("undecodable response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout
        } else if err.is_decode() {
            ProviderError::Decode(err.to_string())
        } else {
            ProviderError::Transport(err.to_string())
        }
    }
}

/// Errors that abort a run. Provider failures are absorbed by key rotation
/// and never show up here.
#[derive(Debug, thiserror::Error)]
pub enum HarvestError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error("failed to write output {}: {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to persist checkpoint {}: {source}", path.display())]
    Checkpoint {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}
