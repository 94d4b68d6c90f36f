//! In-memory cache backend for testing.

use super::{CacheEntry, CacheStore};
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::sync::{Arc, PoisonError, RwLock};

/// Cache backend keeping entries in a shared vector
///
/// Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCacheStore {
    entries: Arc<RwLock<Vec<CacheEntry>>>,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStore for InMemoryCacheStore {
    fn write(&self, entry: &CacheEntry) -> Result<()> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|e| e.id != entry.id);
        entries.push(entry.clone());
        Ok(())
    }

    fn read(&self, id: &str) -> Result<Option<CacheEntry>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.iter().find(|e| e.id == id).cloned())
    }

    fn latest(&self) -> Result<Option<CacheEntry>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        // max_by_key keeps the last of equal timestamps, i.e. the newest write
        Ok(entries.iter().max_by_key(|e| e.created_at).cloned())
    }

    fn purge_created_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|e| e.created_at > cutoff);
        Ok(before - entries.len())
    }
}
