//! File filtering logic for the scanner.

use std::collections::HashSet;
use std::path::Path;

/// Extensions decoded by default
pub const DEFAULT_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif"];

/// Decides whether a path is an image worth decoding
#[derive(Debug, Clone)]
pub struct ImageFilter {
    /// Lowercase extensions to accept
    extensions: HashSet<String>,
    include_hidden: bool,
}

impl ImageFilter {
    pub fn new() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            include_hidden: false,
        }
    }

    /// Include hidden files (starting with .)
    pub fn with_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    /// Override the extensions to accept; case and a leading dot are ignored
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|e| e.as_ref().trim_start_matches('.').to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        self
    }

    pub fn includes_hidden(&self) -> bool {
        self.include_hidden
    }

    /// Check if a file should be included
    pub fn should_include(&self, path: &Path) -> bool {
        if !self.include_hidden && is_hidden(path) {
            return false;
        }

        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| self.extensions.contains(&ext.to_lowercase()))
            .unwrap_or(false)
    }
}

impl Default for ImageFilter {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether the final component of `path` starts with a dot
pub(crate) fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_matches_extensions_case_insensitively() {
        let filter = ImageFilter::new();
        assert!(filter.should_include(Path::new("/scans/page.jpg")));
        assert!(filter.should_include(Path::new("/scans/page.JPEG")));
        assert!(filter.should_include(Path::new("/scans/page.Tif")));
    }

    #[test]
    fn filter_excludes_non_images() {
        let filter = ImageFilter::new();
        assert!(!filter.should_include(Path::new("/scans/document.pdf")));
        assert!(!filter.should_include(Path::new("/scans/photo.webp")));
    }

    #[test]
    fn filter_excludes_hidden_by_default() {
        let filter = ImageFilter::new();
        assert!(!filter.should_include(Path::new("/scans/.thumb.png")));
    }

    #[test]
    fn filter_can_include_hidden() {
        let filter = ImageFilter::new().with_hidden(true);
        assert!(filter.should_include(Path::new("/scans/.thumb.png")));
    }

    #[test]
    fn filter_handles_no_extension() {
        let filter = ImageFilter::new();
        assert!(!filter.should_include(Path::new("/scans/README")));
    }

    #[test]
    fn custom_extensions_are_normalized() {
        let filter = ImageFilter::new().with_extensions([".WEBP", "gif", ""]);
        assert!(filter.should_include(Path::new("a.webp")));
        assert!(filter.should_include(Path::new("a.GIF")));
        assert!(!filter.should_include(Path::new("a.png")));
    }
}
