//! Batch execution implementation.

use super::pool::{default_workers, map_sequential, WorkerPool};
use super::{BatchFileOutcome, BatchReport};
use crate::core::aggregator::DetectionAggregator;
use crate::core::cache::ResultCache;
use crate::core::decoder::ImageDecoder;
use crate::core::recognizer::{BarcodeRecognizer, SymbolFormat, SymbolRecognizer};
use crate::core::scanner::{ImageScanner, ScanConfig, WalkDirScanner};
use crate::error::{RecognizerError, Result};
use crate::events::{
    null_sender, BatchEvent, BatchSummary, Event, EventSender, FileProgress,
};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Error recorded for files that were never started
const CANCELLED: &str = "cancelled";

/// How files are distributed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// One file at a time on the calling thread
    Sequential,
    /// A fixed pool of worker threads
    #[default]
    Parallel,
}

/// Shared flag for stopping a running batch
///
/// Clones share the flag, so a caller can keep one and hand another to the
/// orchestrator.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop scheduling new files; files already running finish
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Builder for batch configuration
pub struct BatchBuilder {
    root: PathBuf,
    scan_config: ScanConfig,
    mode: ExecutionMode,
    workers: Option<usize>,
    recognizer: Arc<dyn SymbolRecognizer>,
    format: SymbolFormat,
    aggregator: DetectionAggregator,
    cache: Arc<ResultCache>,
    scanner: Option<Box<dyn ImageScanner>>,
    cancel: CancellationToken,
}

impl BatchBuilder {
    pub fn new() -> Self {
        Self {
            root: PathBuf::from("."),
            scan_config: ScanConfig::default(),
            mode: ExecutionMode::default(),
            workers: None,
            recognizer: Arc::new(BarcodeRecognizer::new()),
            format: SymbolFormat::Pdf417,
            aggregator: DetectionAggregator::new(),
            cache: Arc::new(ResultCache::disabled()),
            scanner: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Directory to decode
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Descend into subdirectories
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.scan_config.recursive = recursive;
        self
    }

    /// Include hidden files
    pub fn include_hidden(mut self, include: bool) -> Self {
        self.scan_config.include_hidden = include;
        self
    }

    /// Extensions to decode
    pub fn extensions(mut self, extensions: Vec<String>) -> Self {
        self.scan_config.extensions = extensions;
        self
    }

    pub fn mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Number of worker threads in parallel mode
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    pub fn recognizer(mut self, recognizer: Arc<dyn SymbolRecognizer>) -> Self {
        self.recognizer = recognizer;
        self
    }

    /// Symbol format to look for
    pub fn format(mut self, format: SymbolFormat) -> Self {
        self.format = format;
        self
    }

    pub fn aggregator(mut self, aggregator: DetectionAggregator) -> Self {
        self.aggregator = aggregator;
        self
    }

    /// Set the result cache
    pub fn cache(mut self, cache: Arc<ResultCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Replace directory walking with another discovery strategy
    pub fn scanner(mut self, scanner: Box<dyn ImageScanner>) -> Self {
        self.scanner = Some(scanner);
        self
    }

    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Build the orchestrator
    ///
    /// Fails when the recognizer cannot decode the requested format.
    pub fn build(self) -> std::result::Result<BatchOrchestrator, RecognizerError> {
        let decoder = ImageDecoder::new(self.recognizer, self.format)?
            .with_aggregator(self.aggregator);
        let scan_config = self.scan_config;

        Ok(BatchOrchestrator {
            root: self.root,
            mode: self.mode,
            workers: self.workers.unwrap_or_else(default_workers).max(1),
            decoder,
            cache: self.cache,
            scanner: self
                .scanner
                .unwrap_or_else(|| Box::new(WalkDirScanner::new(scan_config))),
            cancel: self.cancel,
        })
    }
}

impl Default for BatchBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Decodes every image under a directory
pub struct BatchOrchestrator {
    root: PathBuf,
    mode: ExecutionMode,
    workers: usize,
    decoder: ImageDecoder,
    cache: Arc<ResultCache>,
    scanner: Box<dyn ImageScanner>,
    cancel: CancellationToken,
}

impl BatchOrchestrator {
    pub fn builder() -> BatchBuilder {
        BatchBuilder::new()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Worker threads used in parallel mode
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Token that stops this orchestrator when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run the batch without events
    pub fn run(&self) -> Result<BatchReport> {
        self.run_with_events(&null_sender())
    }

    /// Run the batch with event reporting
    ///
    /// Only discovery can fail the whole run; per-file problems end up in the
    /// report.
    pub fn run_with_events(&self, events: &EventSender) -> Result<BatchReport> {
        let start_time = Instant::now();

        let scan = self.scanner.scan_with_events(&self.root, events)?;
        if !scan.errors.is_empty() {
            warn!("{} entries under {} could not be read", scan.errors.len(), self.root.display());
        }

        let files = scan.files;
        let total = files.len();
        let workers = match self.mode {
            ExecutionMode::Sequential => 1,
            ExecutionMode::Parallel => self.workers,
        };

        info!("Decoding {} files with {} worker(s)", total, workers);
        events.send(Event::Batch(BatchEvent::Started {
            total_files: total,
            workers,
        }));

        let completed = AtomicUsize::new(0);
        let stop = || self.cancel.is_cancelled();
        let task = |_: usize, path: &PathBuf| {
            let outcome = self.process_file(path);
            let done = completed.fetch_add(1, Ordering::SeqCst) + 1;

            events.send(Event::Batch(BatchEvent::FileCompleted(FileProgress {
                completed: done,
                total,
                path: path.clone(),
                succeeded: outcome.succeeded(),
                detections: outcome.results().len(),
                cache_hit: outcome.cache_hit(),
            })));

            outcome
        };

        let slots = match self.mode {
            ExecutionMode::Sequential => map_sequential(&files, stop, task),
            ExecutionMode::Parallel => WorkerPool::new(workers).map(&files, stop, task),
        };

        let mut skipped = 0;
        let outcomes: Vec<BatchFileOutcome> = files
            .iter()
            .zip(slots)
            .map(|(path, slot)| {
                slot.unwrap_or_else(|| {
                    skipped += 1;
                    BatchFileOutcome::failed(path, CANCELLED)
                })
            })
            .collect();

        if self.cancel.is_cancelled() {
            info!("Batch cancelled; {} files were not started", skipped);
            events.send(Event::Batch(BatchEvent::Cancelled { skipped }));
        }

        let report = BatchReport::new(outcomes, start_time.elapsed().as_millis() as u64);

        info!(
            "Decoded {}/{} files ({} failed, {} cache hits) in {} ms",
            report.succeeded, report.total_files, report.failed, report.cache_hits, report.duration_ms
        );
        events.send(Event::Batch(BatchEvent::Completed {
            summary: BatchSummary {
                total_files: report.total_files,
                succeeded: report.succeeded,
                failed: report.failed,
                cache_hits: report.cache_hits,
                total_detections: report.total_detections(),
                duration_ms: report.duration_ms,
            },
        }));

        Ok(report)
    }

    /// Decode one file, turning every error and panic into a failed outcome
    fn process_file(&self, path: &Path) -> BatchFileOutcome {
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            self.decoder.decode_file_cached(path, &self.cache)
        }));

        match result {
            Ok(Ok(decoded)) => {
                debug!(
                    "{}: {} symbols{}",
                    path.display(),
                    decoded.detections.len(),
                    if decoded.cache_hit { " (cached)" } else { "" }
                );
                BatchFileOutcome::decoded(path, decoded)
            }
            Ok(Err(e)) => {
                warn!("Failed to decode {}: {}", path.display(), e);
                BatchFileOutcome::failed(path, e.to_string())
            }
            Err(payload) => {
                let message = format!("recognizer panicked: {}", panic_message(payload.as_ref()));
                warn!("Failed to decode {}: {}", path.display(), message);
                BatchFileOutcome::failed(path, message)
            }
        }
    }
}

impl std::fmt::Debug for BatchOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchOrchestrator")
            .field("root", &self.root)
            .field("mode", &self.mode)
            .field("workers", &self.workers)
            .field("decoder", &self.decoder)
            .field("cache", &self.cache)
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}
