//! Bounded record of what an adapter has seen.

use std::collections::VecDeque;

/// Entries kept when no explicit limit is given.
pub const DEFAULT_HISTORY: usize = 256;

/// Keeps the most recent `limit` entries, dropping the oldest first.
#[derive(Debug, Clone)]
pub(crate) struct History<T> {
    entries: VecDeque<T>,
    limit: usize,
}

impl<T: Clone> History<T> {
    pub(crate) fn with_limit(limit: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(limit.min(DEFAULT_HISTORY)),
            limit,
        }
    }

    pub(crate) fn push(&mut self, entry: T) {
        if self.limit == 0 {
            return;
        }
        if self.entries.len() == self.limit {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Oldest first.
    pub(crate) fn to_vec(&self) -> Vec<T> {
        self.entries.iter().cloned().collect()
    }
}

impl<T: Clone> Default for History<T> {
    fn default() -> Self {
        Self::with_limit(DEFAULT_HISTORY)
    }
}
