//! Result cache.
//!
//! Keeps recent analysis results so exports and repeated queries don't hit
//! Jira again. Entries expire after a TTL and only match a lookup when the
//! stored query equals the requested one after trimming.
//!
//! The cache uses a backend abstraction ([`CacheStore`]) so tests run against
//! memory and production against a temp directory.

mod disk;
mod memory;

pub use disk::DiskCacheStore;
pub use memory::InMemoryCacheStore;

use crate::backward_check::BackwardCheckResult;
use crate::domain::Hierarchy;
use crate::errors::ViewerError;
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

/// Analysis mode that produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    Normal,
    BackwardCheck,
}

/// Cached payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "data", rename_all = "snake_case")]
pub enum AnalysisResult {
    Hierarchy(Hierarchy),
    BackwardCheck(BackwardCheckResult),
}

impl AnalysisResult {
    pub fn mode(&self) -> AnalysisMode {
        match self {
            AnalysisResult::Hierarchy(_) => AnalysisMode::Normal,
            AnalysisResult::BackwardCheck(_) => AnalysisMode::BackwardCheck,
        }
    }

    pub fn hierarchy(&self) -> &Hierarchy {
        match self {
            AnalysisResult::Hierarchy(h) => h,
            AnalysisResult::BackwardCheck(r) => &r.hierarchy,
        }
    }

    pub fn backward_check(&self) -> Option<&BackwardCheckResult> {
        match self {
            AnalysisResult::BackwardCheck(r) => Some(r),
            AnalysisResult::Hierarchy(_) => None,
        }
    }
}

/// One stored analysis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub id: String,
    pub query: String,
    pub created_at: DateTime<Utc>,
    pub result: AnalysisResult,
}

/// Storage backend for cache entries.
///
/// `write` must publish the entry atomically: a concurrent `read` or `latest`
/// sees either nothing or the complete entry.
pub trait CacheStore: Send + Sync {
    fn write(&self, entry: &CacheEntry) -> Result<()>;

    /// Entry by id, `None` when unknown.
    fn read(&self, id: &str) -> Result<Option<CacheEntry>>;

    /// Most recently created entry.
    fn latest(&self) -> Result<Option<CacheEntry>>;

    /// Remove entries created at or before `cutoff`, returning how many went.
    fn purge_created_before(&self, cutoff: DateTime<Utc>) -> Result<usize>;
}

/// A cache entry that is still within its TTL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheHit {
    pub id: String,
    pub result: AnalysisResult,
    pub query: String,
    pub age_seconds: i64,
}

/// Stored and requested queries match after trimming surrounding whitespace.
pub fn is_valid(stored_query: &str, requested_query: &str) -> bool {
    stored_query.trim() == requested_query.trim()
}

/// TTL-bound cache over a [`CacheStore`]
pub struct ResultCache<S: CacheStore> {
    store: S,
    ttl: Duration,
}

impl<S: CacheStore> ResultCache<S> {
    pub fn new(store: S, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Store a result, returning its id.
    pub fn put(&self, query: &str, result: AnalysisResult) -> Result<String, ViewerError> {
        self.put_at(query, result, Utc::now())
    }

    pub fn put_at(
        &self,
        query: &str,
        result: AnalysisResult,
        now: DateTime<Utc>,
    ) -> Result<String, ViewerError> {
        let cutoff = now
            .checked_sub_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let purged = self.store.purge_created_before(cutoff)?;
        if purged > 0 {
            info!("Purged {} expired cache entries", purged);
        }

        let entry = CacheEntry {
            id: Uuid::new_v4().to_string(),
            query: query.to_string(),
            created_at: now,
            result,
        };
        self.store.write(&entry)?;
        info!("Cached analysis {}", entry.id);
        Ok(entry.id)
    }

    /// Entry by id, or the latest entry when no id is given.
    pub fn get(&self, id: Option<&str>) -> Result<Option<CacheHit>, ViewerError> {
        self.get_at(id, Utc::now())
    }

    pub fn get_at(
        &self,
        id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Option<CacheHit>, ViewerError> {
        let entry = match id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => self.store.read(id)?,
            None => self.store.latest()?,
        };
        Ok(entry.and_then(|entry| self.fresh(entry, now)))
    }

    /// Latest entry, if it was produced by the same query.
    pub fn lookup(&self, query: &str) -> Result<Option<CacheHit>, ViewerError> {
        self.lookup_at(query, Utc::now())
    }

    pub fn lookup_at(
        &self,
        query: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<CacheHit>, ViewerError> {
        let hit = self
            .store
            .latest()?
            .and_then(|entry| self.fresh(entry, now))
            .filter(|hit| is_valid(&hit.query, query));
        if hit.is_none() {
            debug!("Cache miss for query: {}", query);
        }
        Ok(hit)
    }

    fn fresh(&self, entry: CacheEntry, now: DateTime<Utc>) -> Option<CacheHit> {
        let age = now - entry.created_at;
        if age >= self.ttl {
            debug!("Cache entry {} expired", entry.id);
            return None;
        }
        Some(CacheHit {
            id: entry.id,
            result: entry.result,
            query: entry.query,
            age_seconds: age.num_seconds().max(0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(release: &str) -> AnalysisResult {
        AnalysisResult::Hierarchy(Hierarchy {
            initiatives: Vec::new(),
            release: release.to_string(),
            query: "q".to_string(),
            limit: None,
            original_count: 0,
        })
    }

    fn cache() -> ResultCache<InMemoryCacheStore> {
        ResultCache::new(InMemoryCacheStore::new(), Duration::hours(1))
    }

    #[test]
    fn test_is_valid() {
        assert!(is_valid("project = X", "project = X"));
        assert!(is_valid(" q ", "q"));
        assert!(!is_valid("q1", "q2"));
        assert!(!is_valid("a  b", "a b"));
        assert!(!is_valid("Q", "q"));
    }

    #[test]
    fn test_put_then_get_by_id_and_latest() {
        let cache = cache();
        let t0 = Utc::now();
        let first = cache.put_at("q", result("PI-1"), t0).unwrap();
        let second = cache
            .put_at("q", result("PI-2"), t0 + Duration::seconds(5))
            .unwrap();

        let hit = cache.get_at(Some(&first), t0 + Duration::seconds(10)).unwrap().unwrap();
        assert_eq!(hit.result.hierarchy().release, "PI-1");
        assert_eq!(hit.age_seconds, 10);

        let latest = cache.get_at(None, t0 + Duration::seconds(10)).unwrap().unwrap();
        assert_eq!(latest.id, second);
    }

    #[test]
    fn test_expired_entry_is_a_miss() {
        let cache = cache();
        let t0 = Utc::now();
        cache.put_at("q", result("PI-1"), t0).unwrap();

        let later = t0 + Duration::hours(1) + Duration::seconds(1);
        assert!(cache.lookup_at("q", later).unwrap().is_none());
        assert!(cache.get_at(None, later).unwrap().is_none());
        assert!(cache.lookup_at("q", t0 + Duration::minutes(59)).unwrap().is_some());
    }

    #[test]
    fn test_lookup_requires_matching_query() {
        let cache = cache();
        let t0 = Utc::now();
        cache.put_at("project = X ", result("PI-1"), t0).unwrap();
        assert!(cache.lookup_at("project = X", t0).unwrap().is_some());
        assert!(cache.lookup_at("project = Y", t0).unwrap().is_none());
    }

    #[test]
    fn test_put_purges_expired_entries() {
        let cache = cache();
        let t0 = Utc::now();
        let old = cache.put_at("q", result("PI-1"), t0).unwrap();
        cache
            .put_at("q", result("PI-2"), t0 + Duration::hours(2))
            .unwrap();
        assert!(cache.store().read(&old).unwrap().is_none());
    }

    #[test]
    fn test_huge_ttl_keeps_entries() {
        let cache = ResultCache::new(InMemoryCacheStore::new(), Duration::days(365 * 500_000));
        let t0 = Utc::now();
        let id = cache.put_at("q", result("PI-1"), t0).unwrap();
        cache
            .put_at("q", result("PI-2"), t0 + Duration::days(30))
            .unwrap();
        assert!(cache.store().read(&id).unwrap().is_some());
    }

    #[test]
    fn test_unknown_id_is_a_miss() {
        let cache = cache();
        assert!(cache.get(Some("missing")).unwrap().is_none());
    }
}
