//! Integration tests for the persistent result cache.
//!
//! These tests verify end-to-end caching behavior including:
//! - Content addressing (same bytes, different paths)
//! - Invalidation when a file changes
//! - TTL expiry and maintenance
//! - Recovery from corrupt entries

mod common;

use assert_fs::prelude::*;
use assert_fs::TempDir;
use chrono::{Duration as ChronoDuration, Utc};
use common::{write_page, PixelRecognizer};
use predicates::prelude::*;
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use symbol_sieve::core::batch::{BatchOrchestrator, ExecutionMode};
use symbol_sieve::core::cache::{ContentHash, ResultCache, DEFAULT_TTL};
use symbol_sieve::core::decoder::ImageDecoder;
use symbol_sieve::core::recognizer::SymbolFormat;

fn decoder(recognizer: Arc<PixelRecognizer>) -> ImageDecoder {
    ImageDecoder::new(recognizer, SymbolFormat::Pdf417).unwrap()
}

fn entry_count(dir: &TempDir) -> usize {
    fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().map_or(false, |ext| ext == "json"))
        .count()
}

#[test]
fn identical_files_share_one_entry() {
    let scans = TempDir::new().unwrap();
    let cache_dir = TempDir::new().unwrap();
    let original = scans.child("a-original.png");
    let copy = scans.child("b-copy.png");
    write_page(original.path(), 77);
    fs::copy(original.path(), copy.path()).unwrap();

    let recognizer = Arc::new(PixelRecognizer::new());
    let cache = Arc::new(ResultCache::persistent(cache_dir.path(), DEFAULT_TTL).unwrap());
    let report = BatchOrchestrator::builder()
        .root(scans.path())
        .recognizer(recognizer)
        .mode(ExecutionMode::Sequential)
        .cache(cache)
        .build()
        .unwrap()
        .run()
        .unwrap();

    assert_eq!(report.total_files, 2);
    assert!(!report.outcomes[0].cache_hit());
    assert!(report.outcomes[1].cache_hit());
    assert_eq!(report.outcomes[1].results()[0].payload, "page-77");

    let hash = ContentHash::of_file(original.path()).unwrap();
    cache_dir
        .child(format!("{}.json", hash))
        .assert(predicate::path::is_file());
    assert_eq!(entry_count(&cache_dir), 1);
}

#[test]
fn changed_file_is_decoded_again() {
    let scans = TempDir::new().unwrap();
    let cache_dir = TempDir::new().unwrap();
    let page = scans.child("page.png");
    let recognizer = Arc::new(PixelRecognizer::new());
    let decoder = decoder(recognizer.clone());
    let cache = ResultCache::persistent(cache_dir.path(), DEFAULT_TTL).unwrap();

    write_page(page.path(), 40);
    let before = decoder.decode_file_cached(page.path(), &cache).unwrap();
    write_page(page.path(), 41);
    let after = decoder.decode_file_cached(page.path(), &cache).unwrap();

    assert!(!after.cache_hit);
    assert_eq!(before.detections[0].payload, "page-40");
    assert_eq!(after.detections[0].payload, "page-41");
    assert_eq!(entry_count(&cache_dir), 2);
}

#[test]
fn entries_expire_after_ttl() {
    let scans = TempDir::new().unwrap();
    let cache_dir = TempDir::new().unwrap();
    let page = scans.child("page.png");
    write_page(page.path(), 90);
    let ttl = Duration::from_secs(3600);
    let cache = ResultCache::persistent(cache_dir.path(), ttl).unwrap();
    let stored_at = Utc::now() - ChronoDuration::days(1);
    let results = decoder(Arc::new(PixelRecognizer::new()))
        .decode_file(page.path())
        .unwrap();

    cache.set_at(page.path(), &results, stored_at);

    let just_before = stored_at + ChronoDuration::seconds(3599);
    let just_after = stored_at + ChronoDuration::seconds(3601);
    assert!(cache.get_at(page.path(), just_before).is_some());
    assert!(cache.get_at(page.path(), just_after).is_none());

    // Stale entries stay on disk until maintenance removes them
    let stats = cache.stats_at(just_after);
    assert_eq!(stats.total_entries, 1);
    assert_eq!(stats.expired_entries, 1);
    assert_eq!(cache.clear_expired_at(just_before), 0);
    assert_eq!(cache.clear_expired_at(just_after), 1);
    assert_eq!(entry_count(&cache_dir), 0);
}

#[test]
fn corrupt_entry_is_a_miss_and_gets_replaced() {
    let scans = TempDir::new().unwrap();
    let cache_dir = TempDir::new().unwrap();
    let page = scans.child("page.png");
    write_page(page.path(), 120);
    let hash = ContentHash::of_file(page.path()).unwrap();
    let entry = cache_dir.child(format!("{}.json", hash));
    entry.write_str("{\"timestamp\": 12").unwrap();

    let cache = ResultCache::persistent(cache_dir.path(), DEFAULT_TTL).unwrap();
    assert!(cache.get(page.path()).is_none());

    let decoded = decoder(Arc::new(PixelRecognizer::new()))
        .decode_file_cached(page.path(), &cache)
        .unwrap();

    assert!(!decoded.cache_hit);
    entry.assert(predicate::str::contains("page-120"));
    assert_eq!(cache.stats().valid_entries, 1);
}

#[test]
fn clear_empties_the_directory() {
    let scans = TempDir::new().unwrap();
    let cache_dir = TempDir::new().unwrap();
    let cache = ResultCache::persistent(cache_dir.path(), DEFAULT_TTL).unwrap();
    let decoder = decoder(Arc::new(PixelRecognizer::new()));

    for value in [1u8, 2, 3] {
        let page = scans.child(format!("{}.png", value));
        write_page(page.path(), value);
        decoder.decode_file_cached(page.path(), &cache).unwrap();
    }

    assert_eq!(cache.stats().total_entries, 3);
    assert_eq!(cache.clear(), 3);
    assert_eq!(cache.stats().total_entries, 0);
    cache_dir.assert(predicate::path::is_dir());
}

#[test]
fn disabled_cache_writes_nothing() {
    let scans = TempDir::new().unwrap();
    let page = scans.child("page.png");
    write_page(page.path(), 5);
    let recognizer = Arc::new(PixelRecognizer::new());
    let decoder = decoder(recognizer.clone());
    let cache = ResultCache::disabled();

    let first = decoder.decode_file_cached(page.path(), &cache).unwrap();
    let second = decoder.decode_file_cached(page.path(), &cache).unwrap();

    assert!(!first.cache_hit && !second.cache_hit);
    assert_eq!(recognizer.calls(), 14);
    assert_eq!(cache.stats(), Default::default());
}
