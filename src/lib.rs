//! matrix-harvest core
//!
//! Batched, resumable collection of pairwise travel times from a
//! cell-limited distance matrix API.

pub mod traits;
pub mod error;
pub mod config;
pub mod coords;
pub mod planner;
pub mod keys;
pub mod bing;
pub mod checkpoint;
pub mod output;
pub mod run;
pub mod logging;
