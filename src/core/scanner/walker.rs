//! Directory walking implementation using walkdir.

use super::filter::{is_hidden, ImageFilter, DEFAULT_EXTENSIONS};
use super::{ImageScanner, ScanResult};
use crate::error::ScanError;
use crate::events::{Event, EventSender, ScanEvent};
use std::io;
use std::path::Path;
use tracing::warn;
use walkdir::{DirEntry, WalkDir};

/// Configuration for the directory scanner
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Descend into subdirectories; otherwise only the root's direct children
    pub recursive: bool,
    /// Whether to follow symbolic links
    pub follow_symlinks: bool,
    /// Whether to include hidden files and directories
    pub include_hidden: bool,
    /// Extensions to include, matched case-insensitively
    pub extensions: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            recursive: false,
            follow_symlinks: false,
            include_hidden: false,
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }
}

/// Scanner implementation using the walkdir crate
pub struct WalkDirScanner {
    config: ScanConfig,
    filter: ImageFilter,
}

impl WalkDirScanner {
    pub fn new(config: ScanConfig) -> Self {
        let filter = ImageFilter::new()
            .with_hidden(config.include_hidden)
            .with_extensions(&config.extensions);

        Self { config, filter }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Hidden directories below the root are pruned from the walk
    fn should_descend(&self, entry: &DirEntry) -> bool {
        self.filter.includes_hidden()
            || entry.depth() == 0
            || !entry.file_type().is_dir()
            || !is_hidden(entry.path())
    }

    fn walk_error(err: walkdir::Error) -> ScanError {
        let path = err.path().map(|p| p.to_path_buf()).unwrap_or_default();

        if err.io_error().map(|e| e.kind()) == Some(io::ErrorKind::PermissionDenied) {
            return ScanError::PermissionDenied { path };
        }

        let source = err
            .into_io_error()
            .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "filesystem loop"));
        ScanError::ReadDirectory { path, source }
    }
}

impl Default for WalkDirScanner {
    fn default() -> Self {
        Self::new(ScanConfig::default())
    }
}

impl ImageScanner for WalkDirScanner {
    fn scan(&self, root: &Path) -> Result<ScanResult, ScanError> {
        self.scan_with_events(root, &crate::events::null_sender())
    }

    fn scan_with_events(
        &self,
        root: &Path,
        events: &EventSender,
    ) -> Result<ScanResult, ScanError> {
        if !root.is_dir() {
            return Err(ScanError::DirectoryNotFound {
                path: root.to_path_buf(),
            });
        }

        events.send(Event::Scan(ScanEvent::Started {
            root: root.to_path_buf(),
        }));

        let mut walker = WalkDir::new(root).follow_links(self.config.follow_symlinks);
        if !self.config.recursive {
            walker = walker.max_depth(1);
        }

        let mut result = ScanResult::default();

        for entry in walker.into_iter().filter_entry(|e| self.should_descend(e)) {
            match entry {
                Ok(entry) => {
                    if entry.file_type().is_dir() || !self.filter.should_include(entry.path()) {
                        continue;
                    }

                    events.send(Event::Scan(ScanEvent::FileFound {
                        path: entry.path().to_path_buf(),
                    }));
                    result.files.push(entry.into_path());
                }
                Err(e) => {
                    let path = e.path().map(|p| p.to_path_buf()).unwrap_or_default();
                    let error = Self::walk_error(e);
                    warn!("Skipping unreadable entry: {}", error);

                    events.send(Event::Scan(ScanEvent::Error {
                        path,
                        message: error.to_string(),
                    }));
                    result.errors.push(error);
                }
            }
        }

        // Whole-path order, not per component: "a-b.png" sorts before "a/x.png"
        result.files.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));
        result.files.dedup();

        events.send(Event::Scan(ScanEvent::Completed {
            total_files: result.files.len(),
        }));

        Ok(result)
    }
}
