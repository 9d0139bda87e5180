//! Per-run cache of parsed test-data files.

use super::TestData;
use std::collections::HashMap;
use std::sync::Arc;

/// Key-value store of parsed test-data files, keyed by normalized file name.
///
/// A store belongs to one loader (and so to one run context). It is never
/// shared between tests, which keeps parallel test threads from seeing each
/// other's cache state.
#[derive(Debug, Default)]
pub struct DataStore {
    entries: HashMap<String, Arc<TestData>>,
    disk_reads: usize,
}

impl DataStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached entry for a key
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Arc<TestData>> {
        self.entries.get(key).cloned()
    }

    /// Insert a freshly read entry and count the read
    pub fn insert(&mut self, key: impl Into<String>, data: TestData) -> Arc<TestData> {
        let data = Arc::new(data);
        let _ = self.entries.insert(key.into(), Arc::clone(&data));
        self.disk_reads += 1;
        data
    }

    /// Whether a key is cached
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Cached keys, sorted
    #[must_use]
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Number of cached files
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is cached
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of files read from disk since the store was created
    #[must_use]
    pub fn disk_reads(&self) -> usize {
        self.disk_reads
    }

    /// Drop every cached entry
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
