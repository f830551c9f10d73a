//! Shared in-memory state: the file registry and the inverted index
//!
//! [`Storage`] owns one [`FileRegistry`] and one [`InvertedIndex`]. Each has
//! its own lock and no method here holds both at once, so the two can be used
//! from any number of tasks without a lock-ordering rule.
//!
//! The index is a cache, not a verified fact base: entries are never removed
//! when files disappear, and the same file may appear more than once under a
//! word if it reached the index through both indexing and a live scan.

use std::collections::{HashMap, HashSet};

use parking_lot::{Mutex, RwLock};

use crate::models::StorageStats;

/// Ordered, append-only list of registered file identifiers
#[derive(Debug, Default)]
pub struct FileRegistry {
    files: Mutex<Vec<String>>,
}

impl FileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a file identifier (duplicates are kept)
    pub fn register(&self, file_id: impl Into<String>) {
        self.files.lock().push(file_id.into());
    }

    /// Owned copy of the current registry contents
    pub fn snapshot(&self) -> Vec<String> {
        self.files.lock().clone()
    }

    /// Remove every registered file
    pub fn clear(&self) {
        self.files.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.files.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.lock().is_empty()
    }
}

/// Word → files cache
///
/// Lookups take a shared lock; `append_entry` and `merge_file` take the
/// exclusive lock for their whole update.
#[derive(Debug, Default)]
pub struct InvertedIndex {
    entries: RwLock<HashMap<String, Vec<String>>>,
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Files cached for `word`, or `None` when there is no usable entry
    pub fn lookup(&self, word: &str) -> Option<Vec<String>> {
        self.entries
            .read()
            .get(word)
            .filter(|files| !files.is_empty())
            .cloned()
    }

    /// Replace the entry for `word` with exactly `file_ids`
    ///
    /// An empty list is ignored so a present key never maps to nothing.
    pub fn append_entry(&self, word: impl Into<String>, file_ids: Vec<String>) {
        if file_ids.is_empty() {
            return;
        }
        self.entries.write().insert(word.into(), file_ids);
    }

    /// Add `file_id` under every word of one file's word set
    pub fn merge_file(&self, file_id: &str, words: HashSet<String>) {
        if words.is_empty() {
            return;
        }

        let mut entries = self.entries.write();
        for word in words {
            entries.entry(word).or_default().push(file_id.to_string());
        }
    }

    /// Number of distinct words with an entry
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

/// Aggregate root handed to every component that touches shared state
#[derive(Debug, Default)]
pub struct Storage {
    registry: FileRegistry,
    index: InvertedIndex,
}

impl Storage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self) -> &FileRegistry {
        &self.registry
    }

    pub fn index(&self) -> &InvertedIndex {
        &self.index
    }

    /// Add a file that already exists on disk to the registry
    pub fn register_file(&self, file_id: impl Into<String>) {
        let file_id = file_id.into();
        log::debug!("Registering file {}", file_id);
        self.registry.register(file_id);
    }

    pub fn stats(&self) -> StorageStats {
        StorageStats {
            registered_files: self.registry.len(),
            indexed_words: self.index.len(),
        }
    }
}
