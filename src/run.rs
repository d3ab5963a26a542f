//! The run loop: plan, fetch through key rotation, write, checkpoint.
//!
//! Batches run strictly one after another. The checkpoint only moves past a
//! batch once its results are in the output file, so a crash at any point
//! either repeats nothing or loses nothing.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, error, info, warn};

use crate::bing::{MatrixResponse, decode};
use crate::checkpoint::CheckpointStore;
use crate::config::RunConfig;
use crate::coords::{self, CoordinateIndex};
use crate::error::{HarvestError, InputError};
use crate::keys::{Attempt, KeyRotator};
use crate::output::OutputFile;
use crate::planner::{BatchPlanner, RunCursor};
use crate::traits::{DistanceMatrixProvider, MatrixRequest};

/// Terminal state of one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every descriptor completed; the checkpoint has been removed.
    Finished { batches: usize },
    /// Every key failed for one descriptor. `cursor` points at that
    /// descriptor with the key index reset to 0.
    Suspended { cursor: RunCursor },
    /// Shutdown was requested between batches; `cursor` is the next unit of
    /// work.
    Interrupted { cursor: RunCursor },
}

#[derive(Debug)]
pub struct Harvester {
    config: RunConfig,
    index: CoordinateIndex,
    times: Vec<String>,
    keys: Vec<String>,
    planner: BatchPlanner,
    store: CheckpointStore,
    output: OutputFile,
    shutdown: Option<Arc<AtomicBool>>,
}

impl Harvester {
    /// Read coordinates, times and keys from the paths in `config`.
    pub fn load(config: RunConfig) -> Result<Self, HarvestError> {
        let index = CoordinateIndex::load(&config.coords_path)?;
        let times = coords::load_times(&config.times_path)?;
        let keys = coords::load_keys(&config.keys_path)?;
        info!(
            coordinates = index.len(),
            times = times.len(),
            keys = keys.len(),
            "inputs loaded"
        );
        Self::new(config, index, times, keys)
    }

    pub fn new(
        config: RunConfig,
        index: CoordinateIndex,
        times: Vec<String>,
        keys: Vec<String>,
    ) -> Result<Self, HarvestError> {
        if keys.is_empty() {
            return Err(InputError::NoKeys(config.keys_path.clone()).into());
        }
        let planner = BatchPlanner::new(
            index.len(),
            times.len(),
            config.row_width,
            config.col_width,
            config.cell_limit,
        )?;
        let store = CheckpointStore::new(&config.state_path);
        let output = OutputFile::new(&config.output_path, config.date);

        Ok(Self {
            config,
            index,
            times,
            keys,
            planner,
            store,
            output,
            shutdown: None,
        })
    }

    /// Stop cleanly before the next batch once `flag` is set.
    pub fn with_shutdown(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown = Some(flag);
        self
    }

    /// Resume from the saved cursor (or the beginning) and work until the
    /// sequence is done, every key fails, or shutdown is requested.
    pub fn run<P: DistanceMatrixProvider>(&self, provider: &P) -> Result<RunOutcome, HarvestError> {
        let start = self.starting_cursor();
        let mut rotator = KeyRotator::starting_at(self.keys.clone(), start.key_index);
        let mut cursor = RunCursor {
            key_index: rotator.current_index(),
            ..start
        };

        info!(
            time_index = start.time_index,
            row = start.row_position,
            col = start.col_position,
            key_index = cursor.key_index,
            total_batches = self.planner.total_batches(),
            "starting run"
        );

        let mut completed = 0;
        for descriptor in self.planner.resume(&start) {
            if self.shutdown_requested() {
                warn!(?cursor, "shutdown requested, saving state");
                self.save(&cursor)?;
                return Ok(RunOutcome::Interrupted { cursor });
            }

            let time = &self.times[descriptor.time_index];
            let start_time = self.config.start_time(time);
            let request = MatrixRequest {
                origins: self.index.slice(descriptor.row_start, descriptor.row_width),
                destinations: self.index.slice(descriptor.col_start, descriptor.col_width),
                start_time: &start_time,
            };

            let attempt = rotator.attempt(|key| {
                provider
                    .fetch(&request, key)
                    .and_then(MatrixResponse::into_success)
            });

            match attempt {
                Attempt::Success { value, key_index } => {
                    let cells = decode(&value, &self.index);
                    let written = self.output.append(time, &cells).map_err(|source| {
                        HarvestError::Output {
                            path: self.output.path().to_path_buf(),
                            source,
                        }
                    })?;
                    cursor = self.planner.cursor_after(&descriptor, key_index);
                    self.save(&cursor)?;
                    completed += 1;
                    debug!(
                        time = %time,
                        row = descriptor.row_start,
                        col = descriptor.col_start,
                        key_index,
                        cells = cells.len(),
                        written,
                        "batch complete"
                    );
                }
                Attempt::Exhausted => {
                    error!(
                        keys = rotator.len(),
                        "all API keys are returning errors, daily rates are likely exhausted"
                    );
                    // Assumes quotas refresh before the next invocation, so the
                    // retry starts from the first key again.
                    rotator.reset();
                    let cursor = RunCursor::at(&descriptor, rotator.current_index());
                    self.save(&cursor)?;
                    return Ok(RunOutcome::Suspended { cursor });
                }
            }
        }

        self.store.clear().map_err(|source| HarvestError::Checkpoint {
            path: self.store.path().to_path_buf(),
            source,
        })?;
        info!(batches = completed, "finished processing input");
        Ok(RunOutcome::Finished { batches: completed })
    }

    /// The saved cursor, if it names a point this run's batch sequence can
    /// reach. Anything else (times file shortened, coordinates removed,
    /// hand-edited positions off the batch grid) restarts from zero.
    fn starting_cursor(&self) -> RunCursor {
        match self.store.load() {
            Some(cursor) if self.planner.is_reachable(&cursor) => cursor,
            Some(cursor) => {
                warn!(?cursor, "saved cursor does not match the current inputs, starting fresh");
                RunCursor::default()
            }
            None => RunCursor::default(),
        }
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    fn save(&self, cursor: &RunCursor) -> Result<(), HarvestError> {
        self.store.save(cursor).map_err(|source| HarvestError::Checkpoint {
            path: self.store.path().to_path_buf(),
            source,
        })
    }
}
