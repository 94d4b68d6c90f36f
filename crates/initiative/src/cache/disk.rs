//! Disk cache backend.
//!
//! One pretty-printed JSON file per entry, `<id>.json`, written through
//! `<id>.json.tmp` and renamed so readers never see a partial entry.

use super::{CacheEntry, CacheStore};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::warn;
use uuid::Uuid;

/// Cache backend storing entries as JSON files in a directory
#[derive(Debug, Clone)]
pub struct DiskCacheStore {
    root: PathBuf,
}

impl DiskCacheStore {
    /// Open (and create if needed) a cache directory.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create cache directory {}", root.display()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, id: &str) -> PathBuf {
        self.root.join(format!("{}.json", id))
    }

    fn read_entry(&self, path: &Path) -> Result<CacheEntry> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;
        serde_json::from_str(&contents).context("Failed to deserialize cache entry")
    }

    /// Completed entry files; `.json.tmp` files are never listed.
    fn entry_files(&self) -> Result<Vec<PathBuf>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.root).context("Failed to read cache directory")? {
            let path = entry.context("Failed to read directory entry")?.path();
            if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("json") {
                files.push(path);
            }
        }
        Ok(files)
    }

    /// Entries that parse, skipping (and logging) unreadable files
    fn readable_entries(&self) -> Result<Vec<(PathBuf, CacheEntry)>> {
        let mut entries = Vec::new();
        for path in self.entry_files()? {
            match self.read_entry(&path) {
                Ok(entry) => entries.push((path, entry)),
                Err(e) => warn!("Ignoring unreadable cache file {}: {:#}", path.display(), e),
            }
        }
        Ok(entries)
    }
}

impl CacheStore for DiskCacheStore {
    fn write(&self, entry: &CacheEntry) -> Result<()> {
        let json = serde_json::to_string_pretty(entry).context("Failed to serialize cache entry")?;

        // Atomic write: write to temp file, then rename
        let path = self.entry_path(&entry.id);
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, json).context("Failed to write temporary file")?;
        fs::rename(&temp_path, &path).context("Failed to rename temporary file")?;

        Ok(())
    }

    fn read(&self, id: &str) -> Result<Option<CacheEntry>> {
        // Ids double as file names
        if Uuid::parse_str(id).is_err() {
            return Ok(None);
        }
        let path = self.entry_path(id);
        if !path.exists() {
            return Ok(None);
        }
        match self.read_entry(&path) {
            Ok(entry) => Ok(Some(entry)),
            Err(e) => {
                warn!("Ignoring unreadable cache file {}: {:#}", path.display(), e);
                Ok(None)
            }
        }
    }

    fn latest(&self) -> Result<Option<CacheEntry>> {
        Ok(self
            .readable_entries()?
            .into_iter()
            .map(|(_, entry)| entry)
            // equal timestamps resolve to the greatest id, i.e. file name
            .max_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id))))
    }

    fn purge_created_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let mut removed = 0;
        for (path, entry) in self.readable_entries()? {
            if entry.created_at <= cutoff {
                match fs::remove_file(&path) {
                    Ok(()) => removed += 1,
                    Err(e) => warn!("Failed to remove cache file {}: {}", path.display(), e),
                }
            }
        }

        let max_age = (Utc::now() - cutoff).to_std().unwrap_or(Duration::ZERO);
        removed += cleanup_orphaned_temp_files(&self.root, max_age)?;
        Ok(removed)
    }
}

/// Remove `.tmp` files older than `max_age` left behind by interrupted writes.
///
/// Individual removal failures are logged, not returned.
pub(crate) fn cleanup_orphaned_temp_files(root: &Path, max_age: Duration) -> Result<usize> {
    if !root.is_dir() {
        return Ok(0);
    }

    let now = SystemTime::now();
    let mut removed = 0;
    for entry in fs::read_dir(root).context("Failed to read cache directory")? {
        let path = entry.context("Failed to read directory entry")?.path();
        if path.extension().and_then(|s| s.to_str()) != Some("tmp") {
            continue;
        }
        let age = fs::metadata(&path)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| now.duration_since(modified).ok());
        if age.is_some_and(|age| age > max_age) {
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => warn!("Failed to remove temp file {}: {}", path.display(), e),
            }
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::AnalysisResult;
    use crate::domain::Hierarchy;
    use std::thread::sleep;
    use tempfile::TempDir;

    fn entry(created_at: DateTime<Utc>) -> CacheEntry {
        CacheEntry {
            id: Uuid::new_v4().to_string(),
            query: "project = X".to_string(),
            created_at,
            result: AnalysisResult::Hierarchy(Hierarchy {
                initiatives: Vec::new(),
                release: "PI-1".to_string(),
                query: "project = X".to_string(),
                limit: None,
                original_count: 0,
            }),
        }
    }

    #[test]
    fn test_write_and_read_entry() {
        let temp = TempDir::new().unwrap();
        let store = DiskCacheStore::open(temp.path()).unwrap();
        let e = entry(Utc::now());
        store.write(&e).unwrap();

        assert!(temp.path().join(format!("{}.json", e.id)).exists());
        assert!(!temp.path().join(format!("{}.json.tmp", e.id)).exists());
        assert_eq!(store.read(&e.id).unwrap(), Some(e));
    }

    #[test]
    fn test_latest_ignores_temp_and_corrupt_files() {
        let temp = TempDir::new().unwrap();
        let store = DiskCacheStore::open(temp.path()).unwrap();
        let e = entry(Utc::now());
        store.write(&e).unwrap();

        fs::write(temp.path().join("partial.json.tmp"), "{\"id\":").unwrap();
        fs::write(temp.path().join("broken.json"), "not json").unwrap();

        assert_eq!(store.latest().unwrap().map(|l| l.id), Some(e.id));
    }

    #[test]
    fn test_read_rejects_non_uuid_ids() {
        let temp = TempDir::new().unwrap();
        let store = DiskCacheStore::open(temp.path()).unwrap();
        assert!(store.read("../etc/passwd").unwrap().is_none());
    }

    #[test]
    fn test_purge_removes_old_entries_and_temp_files() {
        let temp = TempDir::new().unwrap();
        let store = DiskCacheStore::open(temp.path()).unwrap();
        let now = Utc::now();
        let old = entry(now - chrono::Duration::hours(2));
        let fresh = entry(now);
        store.write(&old).unwrap();
        store.write(&fresh).unwrap();
        let orphan = temp.path().join("orphan.json.tmp");
        fs::write(&orphan, "{").unwrap();
        sleep(Duration::from_millis(50));

        let removed = store.purge_created_before(now - chrono::Duration::hours(1)).unwrap();
        assert_eq!(removed, 1);
        assert!(store.read(&old.id).unwrap().is_none());
        assert!(store.read(&fresh.id).unwrap().is_some());

        let removed = cleanup_orphaned_temp_files(temp.path(), Duration::ZERO).unwrap();
        assert_eq!(removed, 1);
        assert!(!orphan.exists());
    }
}
