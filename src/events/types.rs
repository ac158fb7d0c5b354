//! Event type definitions for progress reporting.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// All events emitted while decoding a batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Discovery phase events
    Scan(ScanEvent),
    /// Decoding phase events
    Batch(BatchEvent),
}

/// Events during file discovery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScanEvent {
    /// Discovery has started
    Started { root: PathBuf },
    /// An image file was found
    FileFound { path: PathBuf },
    /// An entry could not be read but discovery continues
    Error { path: PathBuf, message: String },
    /// Discovery completed
    Completed { total_files: usize },
}

/// Events during the decoding phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BatchEvent {
    /// Decoding has started
    Started { total_files: usize, workers: usize },
    /// One file finished, successfully or not
    FileCompleted(FileProgress),
    /// The batch was cancelled; `skipped` files were never scheduled
    Cancelled { skipped: usize },
    /// Decoding completed
    Completed { summary: BatchSummary },
}

/// Progress information after each file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileProgress {
    /// Number of files finished so far
    pub completed: usize,
    /// Total number of files in the batch
    pub total: usize,
    /// File that just finished
    pub path: PathBuf,
    /// Whether the file decoded without error
    pub succeeded: bool,
    /// Symbols found in the file
    pub detections: usize,
    /// Whether the result came from the cache
    pub cache_hit: bool,
}

/// Summary of batch results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total_files: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cache_hits: usize,
    /// Total symbols across all files
    pub total_detections: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}
