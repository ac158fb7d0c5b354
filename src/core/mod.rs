//! # Core Module
//!
//! The decode pipeline.
//!
//! ## Modules
//! - `preprocess` - Derives the cascade of candidate rasters
//! - `recognizer` - The symbol recognizer seam and its rxing and rqrr backends
//! - `detection` - Detection value types
//! - `aggregator` - Runs the recognizer over the cascade and deduplicates
//! - `decoder` - The single-image pipeline
//! - `cache` - Persists results keyed by file content
//! - `scanner` - Discovers image files in directories
//! - `batch` - Decodes whole directories, sequentially or in parallel

pub mod aggregator;
pub mod batch;
pub mod cache;
pub mod decoder;
pub mod detection;
pub mod preprocess;
pub mod recognizer;
pub mod scanner;

// Re-export commonly used types
pub use batch::{BatchFileOutcome, BatchOrchestrator, BatchReport, CancellationToken, ExecutionMode};
pub use cache::ResultCache;
pub use decoder::ImageDecoder;
pub use detection::{Detection, Point, Rect};
pub use recognizer::{
    BarcodeRecognizer, QrRecognizer, RecognizerKind, SymbolFormat, SymbolRecognizer,
};
