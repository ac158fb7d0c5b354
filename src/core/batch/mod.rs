//! # Batch Module
//!
//! Decodes every image under a directory, one outcome per file.
//!
//! ## Stages
//! 1. **Scan** - Discover image files (sorted, deduplicated)
//! 2. **Decode** - Run the cached single-image pipeline per file
//! 3. **Report** - Collect outcomes in discovery order
//!
//! ## Parallelism
//! Files are spread over a fixed [`WorkerPool`] of OS threads. The outcome
//! list is in discovery order regardless of mode or completion order.
//!
//! A failure in one file (unreadable image, recognizer error, even a
//! recognizer panic) becomes a `Failed` outcome for that file only.

mod executor;
mod pool;

pub use executor::{BatchBuilder, BatchOrchestrator, CancellationToken, ExecutionMode};
pub use pool::{default_workers, map_sequential, WorkerPool};

use crate::core::decoder::Decoded;
use crate::core::detection::Detection;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// What happened to one file
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileStatus {
    Decoded {
        #[serde(rename = "results")]
        detections: Vec<Detection>,
        cache_hit: bool,
    },
    Failed {
        error: String,
    },
}

/// Outcome for one discovered file
#[derive(Debug, Clone, Serialize)]
pub struct BatchFileOutcome {
    pub image_path: PathBuf,
    #[serde(flatten)]
    pub status: FileStatus,
}

impl BatchFileOutcome {
    pub fn decoded(image_path: &Path, decoded: Decoded) -> Self {
        Self {
            image_path: image_path.to_path_buf(),
            status: FileStatus::Decoded {
                detections: decoded.detections,
                cache_hit: decoded.cache_hit,
            },
        }
    }

    pub fn failed(image_path: &Path, error: impl Into<String>) -> Self {
        Self {
            image_path: image_path.to_path_buf(),
            status: FileStatus::Failed {
                error: error.into(),
            },
        }
    }

    pub fn succeeded(&self) -> bool {
        matches!(self.status, FileStatus::Decoded { .. })
    }

    /// Detections for a decoded file; empty for a failed one
    pub fn results(&self) -> &[Detection] {
        match &self.status {
            FileStatus::Decoded { detections, .. } => detections,
            FileStatus::Failed { .. } => &[],
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.status {
            FileStatus::Failed { error } => Some(error),
            FileStatus::Decoded { .. } => None,
        }
    }

    pub fn cache_hit(&self) -> bool {
        matches!(self.status, FileStatus::Decoded { cache_hit: true, .. })
    }
}

/// Result of a batch run
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    /// One outcome per discovered file, in discovery order
    pub outcomes: Vec<BatchFileOutcome>,
    pub total_files: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cache_hits: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl BatchReport {
    pub fn new(outcomes: Vec<BatchFileOutcome>, duration_ms: u64) -> Self {
        let succeeded = outcomes.iter().filter(|o| o.succeeded()).count();
        let cache_hits = outcomes.iter().filter(|o| o.cache_hit()).count();

        Self {
            total_files: outcomes.len(),
            succeeded,
            failed: outcomes.len() - succeeded,
            cache_hits,
            duration_ms,
            outcomes,
        }
    }

    /// Total symbols across all decoded files
    pub fn total_detections(&self) -> usize {
        self.outcomes.iter().map(|o| o.results().len()).sum()
    }
}
