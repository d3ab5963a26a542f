//! Batch decomposition of the N x N matrix across times of day.
//!
//! The full work sequence is time-major, then row-major: for each time index,
//! for each row start (step `row_width`), for each column start (step
//! `col_width`). A [`RunCursor`] names a position in that sequence and
//! [`BatchPlanner::resume`] replays the suffix from it.

use crate::error::PlanError;

/// A rectangular origin-rows x destination-columns sub-matrix at one time.
///
/// Widths are the run's fixed widths; the last row/column batch may extend
/// past N and is clamped when coordinates are sliced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchDescriptor {
    pub time_index: usize,
    pub row_start: usize,
    pub col_start: usize,
    pub row_width: usize,
    pub col_width: usize,
}

/// Minimal persisted state from which the remaining work is regenerated.
///
/// Positions name the start of the next unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunCursor {
    pub time_index: usize,
    pub row_position: usize,
    pub col_position: usize,
    pub key_index: usize,
}

impl RunCursor {
    /// Cursor pointing at the start of `descriptor`.
    pub fn at(descriptor: &BatchDescriptor, key_index: usize) -> Self {
        Self {
            time_index: descriptor.time_index,
            row_position: descriptor.row_start,
            col_position: descriptor.col_start,
            key_index,
        }
    }
}

/// Fixed batch geometry for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPlanner {
    size: usize,
    time_count: usize,
    row_width: usize,
    col_width: usize,
}

impl BatchPlanner {
    pub fn new(
        size: usize,
        time_count: usize,
        row_width: usize,
        col_width: usize,
        cell_limit: usize,
    ) -> Result<Self, PlanError> {
        if row_width == 0 || col_width == 0 {
            return Err(PlanError::ZeroWidth { row_width, col_width });
        }
        if row_width.saturating_mul(col_width) > cell_limit {
            return Err(PlanError::TooManyCells {
                row_width,
                col_width,
                limit: cell_limit,
            });
        }
        Ok(Self {
            size,
            time_count,
            row_width,
            col_width,
        })
    }

    /// Number of descriptors in the full sequence.
    pub fn total_batches(&self) -> usize {
        self.time_count * self.size.div_ceil(self.row_width) * self.size.div_ceil(self.col_width)
    }

    /// Whether `cursor` names a point this planner can actually reach: a
    /// batch start on the row/column grid (a column at exactly N is allowed
    /// and falls through), or the end of the sequence.
    pub fn is_reachable(&self, cursor: &RunCursor) -> bool {
        let n = self.size;
        if cursor.time_index == self.time_count {
            return cursor.row_position == 0 && cursor.col_position == 0;
        }
        if cursor.time_index > self.time_count {
            return false;
        }
        if n == 0 {
            return cursor.row_position == 0 && cursor.col_position == 0;
        }
        let row_ok = cursor.row_position < n && cursor.row_position % self.row_width == 0;
        let col_ok = cursor.col_position == n
            || (cursor.col_position < n && cursor.col_position % self.col_width == 0);
        row_ok && col_ok
    }

    /// Lazily enumerate the descriptors remaining from `cursor`.
    ///
    /// Only the first time slice starts at `cursor.row_position`, and only
    /// its first row starts at `cursor.col_position`; everything after that
    /// restarts at zero. A position at or past N falls through to the next
    /// row or time slice without emitting anything.
    pub fn resume(&self, cursor: &RunCursor) -> Batches {
        Batches {
            planner: *self,
            time_index: cursor.time_index,
            row: cursor.row_position,
            col: cursor.col_position,
        }
    }

    /// Normalized cursor for the unit of work following `descriptor`.
    ///
    /// When `descriptor` was the last one, the result lies past the final
    /// time index and resumes to an empty sequence.
    pub fn cursor_after(&self, descriptor: &BatchDescriptor, key_index: usize) -> RunCursor {
        let mut batches = Batches {
            planner: *self,
            time_index: descriptor.time_index,
            row: descriptor.row_start,
            col: descriptor.col_start + self.col_width,
        };
        batches.settle();
        RunCursor {
            time_index: batches.time_index,
            row_position: batches.row,
            col_position: batches.col,
            key_index,
        }
    }
}

/// Single-pass descriptor sequence produced by [`BatchPlanner::resume`].
#[derive(Debug, Clone)]
pub struct Batches {
    planner: BatchPlanner,
    time_index: usize,
    row: usize,
    col: usize,
}

impl Batches {
    /// Advance past exhausted rows and time slices until the position names
    /// a real descriptor or the sequence is over.
    fn settle(&mut self) {
        let n = self.planner.size;
        loop {
            if self.time_index >= self.planner.time_count {
                self.row = 0;
                self.col = 0;
                return;
            }
            if self.row >= n {
                self.time_index += 1;
                self.row = 0;
                self.col = 0;
                continue;
            }
            if self.col >= n {
                self.row += self.planner.row_width;
                self.col = 0;
                continue;
            }
            return;
        }
    }
}

impl Iterator for Batches {
    type Item = BatchDescriptor;

    fn next(&mut self) -> Option<BatchDescriptor> {
        self.settle();
        if self.time_index >= self.planner.time_count {
            return None;
        }
        let descriptor = BatchDescriptor {
            time_index: self.time_index,
            row_start: self.row,
            col_start: self.col,
            row_width: self.planner.row_width,
            col_width: self.planner.col_width,
        };
        self.col += self.planner.col_width;
        Some(descriptor)
    }
}
