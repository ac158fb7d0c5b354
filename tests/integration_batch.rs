//! Integration tests for batch decoding.
//!
//! These tests verify end-to-end batch behavior including:
//! - One outcome per discovered file, in discovery order
//! - Identical results in sequential and parallel mode
//! - Isolation of per-file failures
//! - Cancellation

mod common;

use common::{write_page, PixelRecognizer};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use symbol_sieve::core::batch::{
    BatchOrchestrator, BatchReport, CancellationToken, ExecutionMode,
};
use symbol_sieve::core::cache::{ResultCache, DEFAULT_TTL};
use symbol_sieve::core::recognizer::SymbolFormat;
use tempfile::TempDir;

/// `count` pages named page-00.png.. with distinct pixel values
fn create_pages(dir: &TempDir, count: u8) -> Vec<PathBuf> {
    (0..count)
        .map(|i| {
            let path = dir.path().join(format!("page-{:02}.png", i));
            write_page(&path, 10 + i * 7);
            path
        })
        .collect()
}

fn run(dir: &TempDir, mode: ExecutionMode, workers: usize) -> BatchReport {
    BatchOrchestrator::builder()
        .root(dir.path())
        .recognizer(Arc::new(PixelRecognizer::new()))
        .mode(mode)
        .workers(workers)
        .build()
        .unwrap()
        .run()
        .unwrap()
}

fn first_payloads(report: &BatchReport) -> Vec<Option<String>> {
    report
        .outcomes
        .iter()
        .map(|o| o.results().first().map(|d| d.payload.clone()))
        .collect()
}

#[test]
fn batch_reports_every_file_in_order() {
    let dir = TempDir::new().unwrap();
    let pages = create_pages(&dir, 12);
    fs::write(dir.path().join("notes.txt"), b"not an image").unwrap();

    let report = run(&dir, ExecutionMode::Parallel, 4);

    let paths: Vec<PathBuf> = report.outcomes.iter().map(|o| o.image_path.clone()).collect();
    assert_eq!(paths, pages);
    assert_eq!(report.total_files, 12);
    assert_eq!(report.succeeded, 12);
    assert_eq!(report.failed, 0);
}

#[test]
fn sequential_and_parallel_agree() {
    let dir = TempDir::new().unwrap();
    create_pages(&dir, 16);

    let sequential = run(&dir, ExecutionMode::Sequential, 1);
    let parallel = run(&dir, ExecutionMode::Parallel, 4);

    assert_eq!(first_payloads(&sequential), first_payloads(&parallel));
    for (a, b) in sequential.outcomes.iter().zip(&parallel.outcomes) {
        assert_eq!(a.image_path, b.image_path);
        assert_eq!(a.results().len(), b.results().len());
    }
    assert_eq!(first_payloads(&parallel)[3].as_deref(), Some("page-31"));
}

#[test]
fn corrupt_file_fails_alone() {
    let dir = TempDir::new().unwrap();
    create_pages(&dir, 4);
    fs::write(dir.path().join("page-02b.png"), b"\x89PNG truncated").unwrap();

    for mode in [ExecutionMode::Sequential, ExecutionMode::Parallel] {
        let report = run(&dir, mode, 3);

        assert_eq!(report.total_files, 5);
        assert_eq!(report.succeeded, 4);
        assert_eq!(report.failed, 1);

        let failed = &report.outcomes[3];
        assert!(failed.image_path.ends_with("page-02b.png"));
        assert!(failed.error().unwrap().contains("page-02b.png"));
        assert!(failed.results().is_empty());
        assert!(report.outcomes[4].succeeded());
    }
}

#[test]
fn recursive_flag_controls_depth() {
    let dir = TempDir::new().unwrap();
    create_pages(&dir, 2);
    let nested = dir.path().join("2024").join("march");
    fs::create_dir_all(&nested).unwrap();
    write_page(&nested.join("receipt.png"), 99);

    let flat = run(&dir, ExecutionMode::Sequential, 1);
    let deep = BatchOrchestrator::builder()
        .root(dir.path())
        .recursive(true)
        .recognizer(Arc::new(PixelRecognizer::new()))
        .build()
        .unwrap()
        .run()
        .unwrap();

    assert_eq!(flat.total_files, 2);
    assert_eq!(deep.total_files, 3);
    assert!(deep.outcomes[0].image_path.ends_with("2024/march/receipt.png"));
}

#[test]
fn sequential_cancellation_stops_after_current_file() {
    let dir = TempDir::new().unwrap();
    create_pages(&dir, 6);
    let token = CancellationToken::new();

    // page-02 has pixel value 24
    let report = BatchOrchestrator::builder()
        .root(dir.path())
        .recognizer(Arc::new(PixelRecognizer::cancelling(24, token.clone())))
        .mode(ExecutionMode::Sequential)
        .cancellation(token)
        .build()
        .unwrap()
        .run()
        .unwrap();

    assert_eq!(report.total_files, 6);
    assert_eq!(report.succeeded, 3);
    assert!(report.outcomes[..3].iter().all(|o| o.succeeded()));
    assert!(report.outcomes[3..]
        .iter()
        .all(|o| o.error() == Some("cancelled")));
}

#[test]
fn parallel_cancellation_still_reports_every_file() {
    let dir = TempDir::new().unwrap();
    create_pages(&dir, 20);
    let token = CancellationToken::new();

    let report = BatchOrchestrator::builder()
        .root(dir.path())
        .recognizer(Arc::new(PixelRecognizer::cancelling(10, token.clone())))
        .workers(2)
        .cancellation(token)
        .build()
        .unwrap()
        .run()
        .unwrap();

    let cancelled = report
        .outcomes
        .iter()
        .filter(|o| o.error() == Some("cancelled"))
        .count();
    assert_eq!(report.total_files, 20);
    assert!(report.outcomes[0].succeeded());
    assert!(cancelled >= 10);
    assert_eq!(report.succeeded + cancelled, 20);
}

#[test]
fn repeated_batch_is_served_from_cache() {
    let dir = TempDir::new().unwrap();
    let cache_dir = TempDir::new().unwrap();
    create_pages(&dir, 5);
    let recognizer = Arc::new(PixelRecognizer::new());
    let cache = Arc::new(ResultCache::persistent(cache_dir.path(), DEFAULT_TTL).unwrap());

    let batch = BatchOrchestrator::builder()
        .root(dir.path())
        .recognizer(recognizer.clone())
        .cache(cache)
        .build()
        .unwrap();

    let first = batch.run().unwrap();
    let calls = recognizer.calls();
    let second = batch.run().unwrap();

    assert_eq!(first.cache_hits, 0);
    assert_eq!(second.cache_hits, 5);
    assert_eq!(recognizer.calls(), calls);
    assert_eq!(first_payloads(&first), first_payloads(&second));
}

#[test]
fn unsupported_format_is_a_startup_error() {
    let result = BatchOrchestrator::builder()
        .recognizer(Arc::new(PixelRecognizer::new()))
        .format(SymbolFormat::DataMatrix)
        .build();

    let message = result.unwrap_err().to_string();
    assert!(message.contains("DATAMATRIX"));
}
