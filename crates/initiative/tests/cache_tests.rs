//! Result cache over the disk store

use chrono::{Duration, TimeZone, Utc};
use initiative::cache::{is_valid, AnalysisMode, CacheStore};
use initiative::{AnalysisResult, DiskCacheStore, Hierarchy, ResultCache};
use proptest::prelude::*;
use std::fs;
use tempfile::TempDir;

fn hierarchy(query: &str) -> AnalysisResult {
    AnalysisResult::Hierarchy(Hierarchy {
        initiatives: Vec::new(),
        release: "PI-2".to_string(),
        query: query.to_string(),
        limit: None,
        original_count: 0,
    })
}

fn setup() -> (TempDir, ResultCache<DiskCacheStore>) {
    let temp = TempDir::new().unwrap();
    let store = DiskCacheStore::open(temp.path().join("cache")).unwrap();
    (temp, ResultCache::new(store, Duration::hours(1)))
}

#[test]
fn test_entries_survive_reopening_the_store() {
    let (temp, cache) = setup();
    let id = cache.put("project = A", hierarchy("project = A")).unwrap();

    let reopened = ResultCache::new(
        DiskCacheStore::open(temp.path().join("cache")).unwrap(),
        Duration::hours(1),
    );
    let hit = reopened.get(Some(&id)).unwrap().expect("entry on disk");
    assert_eq!(hit.query, "project = A");
    assert_eq!(hit.result.mode(), AnalysisMode::Normal);
}

#[test]
fn test_latest_entry_wins_without_id() {
    let (_temp, cache) = setup();
    let t0 = Utc::now() - Duration::minutes(10);
    cache.put_at("first", hierarchy("first"), t0).unwrap();
    let second = cache
        .put_at("second", hierarchy("second"), t0 + Duration::minutes(1))
        .unwrap();

    let hit = cache.get(None).unwrap().unwrap();
    assert_eq!(hit.id, second);
    assert!(cache.lookup("first").unwrap().is_none());
    assert!(cache.lookup(" second ").unwrap().is_some());
}

#[test]
fn test_equal_timestamps_resolve_to_greatest_id() {
    let (_temp, cache) = setup();
    let t0 = Utc::now() - Duration::minutes(5);
    let mut ids = vec![
        cache.put_at("q", hierarchy("q"), t0).unwrap(),
        cache.put_at("q", hierarchy("q"), t0).unwrap(),
        cache.put_at("q", hierarchy("q"), t0).unwrap(),
    ];
    ids.sort();

    for _ in 0..3 {
        let hit = cache.get(None).unwrap().unwrap();
        assert_eq!(&hit.id, ids.last().unwrap());
    }
}

#[test]
fn test_expired_entries_are_not_served_and_get_purged() {
    let (_temp, cache) = setup();
    let t0 = Utc.with_ymd_and_hms(2026, 6, 1, 10, 0, 0).unwrap();
    let old = cache.put_at("q", hierarchy("q"), t0).unwrap();

    let later = t0 + Duration::hours(1);
    assert!(cache.get_at(Some(&old), later).unwrap().is_none());

    cache.put_at("q", hierarchy("q"), later).unwrap();
    assert!(cache.store().read(&old).unwrap().is_none(), "purged on put");
}

#[test]
fn test_unknown_and_malformed_ids_miss() {
    let (_temp, cache) = setup();
    cache.put("q", hierarchy("q")).unwrap();

    assert!(cache.get(Some("00000000-0000-4000-8000-000000000000")).unwrap().is_none());
    assert!(cache.get(Some("../../etc/passwd")).unwrap().is_none());
}

#[test]
fn test_corrupt_files_are_skipped() {
    let (_temp, cache) = setup();
    let id = cache.put("q", hierarchy("q")).unwrap();
    fs::write(cache.store().root().join("garbage.json"), "{ not json").unwrap();

    let hit = cache.get(None).unwrap().unwrap();
    assert_eq!(hit.id, id);
}

#[test]
fn test_no_temp_files_left_after_write() {
    let (_temp, cache) = setup();
    cache.put("q", hierarchy("q")).unwrap();

    let leftovers: Vec<_> = fs::read_dir(cache.store().root())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("tmp"))
        .collect();
    assert!(leftovers.is_empty());
}

proptest! {
    #[test]
    fn prop_is_valid_ignores_surrounding_whitespace(
        query in "[a-zA-Z0-9 =\"]{0,40}",
        lead in "[ \t]{0,3}",
        trail in "[ \t\n]{0,3}",
    ) {
        let padded = format!("{}{}{}", lead, query, trail);
        prop_assert!(is_valid(&padded, &query));
        prop_assert!(is_valid(&query, &padded));
    }

    #[test]
    fn prop_is_valid_rejects_different_queries(a in "[a-z]{1,20}", b in "[a-z]{1,20}") {
        prop_assume!(a != b);
        prop_assert!(!is_valid(&a, &b));
    }
}
