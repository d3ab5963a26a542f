//! Sequential failover across an ordered list of API keys.

use std::fmt::Display;

use tracing::warn;

/// Result of one [`KeyRotator::attempt`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt<T> {
    Success { value: T, key_index: usize },
    /// Every key from the starting index onwards failed for this call.
    Exhausted,
}

/// Ordered credentials plus the index of the key to try next.
///
/// The index is only ever advanced, never rewound, within a run: a later
/// batch starts from whichever key last succeeded. Keys that failed are
/// assumed to stay failed until the caller calls [`KeyRotator::reset`].
#[derive(Debug, Clone)]
pub struct KeyRotator {
    keys: Vec<String>,
    current: usize,
}

impl KeyRotator {
    pub fn new(keys: Vec<String>) -> Self {
        Self { keys, current: 0 }
    }

    /// Start from a previously persisted index. An index outside the key
    /// list (stale checkpoint, shorter key file) restarts at 0.
    pub fn starting_at(keys: Vec<String>, index: usize) -> Self {
        let current = if index < keys.len() {
            index
        } else {
            if index != 0 {
                warn!(index, keys = keys.len(), "saved key index out of range, starting from first key");
            }
            0
        };
        Self { keys, current }
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Start the next attempt cycle from the first key.
    pub fn reset(&mut self) {
        self.current = 0;
    }

    /// Run `call` with the current key, advancing to the next key on every
    /// failure until one succeeds or the list runs out.
    ///
    /// On exhaustion the index is left one past the last key.
    pub fn attempt<T, E, F>(&mut self, mut call: F) -> Attempt<T>
    where
        E: Display,
        F: FnMut(&str) -> Result<T, E>,
    {
        while let Some(key) = self.keys.get(self.current) {
            match call(key) {
                Ok(value) => {
                    return Attempt::Success {
                        value,
                        key_index: self.current,
                    };
                }
                Err(err) => {
                    warn!(key_index = self.current, error = %err, "provider call failed, rotating key");
                    self.current += 1;
                }
            }
        }
        Attempt::Exhausted
    }
}
