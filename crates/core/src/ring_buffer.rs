// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixed-capacity output store with FIFO eviction.

use crate::log::LogLine;
use std::collections::VecDeque;

/// Capacity used for the supervised agent's output when nothing is configured.
pub const DEFAULT_LOG_CAPACITY: usize = 1000;

/// Bounded, insertion-ordered buffer.
///
/// Appending at capacity evicts the oldest entry. A capacity of zero retains
/// nothing. Readers only ever get copies via [`snapshot`](Self::snapshot).
#[derive(Debug, Clone)]
pub struct OutputRingBuffer<T = LogLine> {
    entries: VecDeque<T>,
    capacity: usize,
}

impl<T: Clone> OutputRingBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            // Don't preallocate huge buffers for large configured capacities
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    /// Append an entry, evicting the oldest when full.
    pub fn append(&mut self, entry: T) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Copy of the current contents, oldest first.
    pub fn snapshot(&self) -> Vec<T> {
        self.entries.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T: Clone> Default for OutputRingBuffer<T> {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

#[cfg(test)]
#[path = "ring_buffer_tests.rs"]
mod tests;
