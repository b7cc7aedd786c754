//! Bounded history of recent samples
//!
//! This module provides the HistoryCache which keeps the most recent samples
//! of one metric in insertion order and drops the oldest ones once the
//! configured capacity is exceeded.

use crate::error::HistoryError;
use log::debug;
use serde::Serialize;
use std::collections::VecDeque;

/// Default number of retained entries
pub const DEFAULT_MAX_ENTRIES: usize = 20;

/// Insertion-ordered, capacity-bounded buffer
///
/// Index 0 is the oldest retained entry. After every `push`/`add` the cache
/// holds at most `max_entries` entries, which are the most recently added ones.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryCache<T> {
    /// Retained entries, oldest first
    entries: VecDeque<T>,
    /// Maximum number of entries kept after an add
    max_entries: usize,
}

impl<T> HistoryCache<T> {
    /// Create an empty cache with the specified capacity
    ///
    /// # Examples
    ///
    /// ```
    /// use devprobe::history::HistoryCache;
    ///
    /// let mut history = HistoryCache::new(2);
    /// history.push(1);
    /// history.push(2);
    /// history.push(3);
    /// assert_eq!(history.iter().copied().collect::<Vec<_>>(), vec![2, 3]);
    /// ```
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(max_entries.min(1024)),
            max_entries,
        }
    }

    /// Append an entry, evicting the oldest ones beyond capacity
    pub fn push(&mut self, entry: T) {
        self.entries.push_back(entry);
        self.enforce_capacity();
    }

    /// Append an entry that may be absent
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::NullEntry` when `entry` is `None`; the cache is
    /// left unchanged.
    pub fn add(&mut self, entry: Option<T>) -> Result<(), HistoryError> {
        let entry = entry.ok_or(HistoryError::NullEntry)?;
        self.push(entry);
        Ok(())
    }

    /// Entry at `index`, 0 being the oldest
    pub fn get(&self, index: usize) -> Result<&T, HistoryError> {
        self.entries.get(index).ok_or(HistoryError::IndexOutOfRange {
            index,
            size: self.entries.len(),
        })
    }

    /// Remove the entry at `index`, shifting later entries left
    pub fn remove(&mut self, index: usize) -> Result<T, HistoryError> {
        let size = self.entries.len();
        self.entries
            .remove(index)
            .ok_or(HistoryError::IndexOutOfRange { index, size })
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Change the capacity
    ///
    /// Lowering the capacity does not evict anything until the next add.
    pub fn set_max_entries(&mut self, max_entries: usize) {
        self.max_entries = max_entries;
    }

    /// Most recently added entry
    pub fn latest(&self) -> Option<&T> {
        self.entries.back()
    }

    /// Entries from oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Drop entries from the front until the capacity holds
    fn enforce_capacity(&mut self) {
        let excess = self.entries.len().saturating_sub(self.max_entries);
        if excess > 0 {
            debug!("Evicting {} history entries", excess);
            self.entries.drain(..excess);
        }
    }
}

impl<T> Default for HistoryCache<T> {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}
