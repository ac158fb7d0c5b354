//! # Scanner Module
//!
//! Discovers image files to decode.
//!
//! ## Supported Formats
//! - JPEG (.jpg, .jpeg)
//! - PNG (.png)
//! - BMP (.bmp)
//! - TIFF (.tiff, .tif)
//!
//! ## Example
//! ```rust,ignore
//! use symbol_sieve::core::scanner::{ImageScanner, ScanConfig, WalkDirScanner};
//!
//! let scanner = WalkDirScanner::new(ScanConfig { recursive: true, ..Default::default() });
//! let found = scanner.scan(Path::new("/scans"))?;
//! ```

mod filter;
mod walker;

pub use filter::{ImageFilter, DEFAULT_EXTENSIONS};
pub use walker::{ScanConfig, WalkDirScanner};

use crate::error::ScanError;
use crate::events::EventSender;
use std::path::{Path, PathBuf};

/// Result of a scan operation
#[derive(Debug, Default)]
pub struct ScanResult {
    /// Discovered files, sorted lexically without duplicates
    pub files: Vec<PathBuf>,
    /// Entries that could not be read (non-fatal)
    pub errors: Vec<ScanError>,
}

/// Trait for image discovery
///
/// Implement this trait to feed the orchestrator from somewhere other than
/// a directory walk (e.g., a fixed list in tests).
pub trait ImageScanner: Send + Sync {
    /// Discover images under `root`
    fn scan(&self, root: &Path) -> Result<ScanResult, ScanError>;

    /// Discover images, reporting progress via events
    fn scan_with_events(&self, root: &Path, events: &EventSender)
        -> Result<ScanResult, ScanError>;
}
