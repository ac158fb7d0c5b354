//! # Error Module
//!
//! Error types for the symbol decoding pipeline.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Include context** - paths, file names, what went wrong
//! - **Cache failures stay local** - the cache logs and carries on
//! - **Startup failures are loud** - a missing recognizer stops everything

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum SieveError {
    #[error("Scanning error: {0}")]
    Scan(#[from] ScanError),

    #[error("Decoding error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Recognizer error: {0}")]
    Recognizer(#[from] RecognizerError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors that occur while discovering image files
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("Permission denied accessing: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("Failed to read directory {path}: {source}")]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while decoding a single image
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Image not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Failed to read image file {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not load image {path}: {reason}")]
    InvalidImage { path: PathBuf, reason: String },

    #[error("Recognizer failed on {path}: {source}")]
    Recognizer {
        path: PathBuf,
        #[source]
        source: RecognizerError,
    },
}

/// Errors from the symbol recognition capability
#[derive(Error, Debug, Clone)]
pub enum RecognizerError {
    #[error("Recognizer '{recognizer}' cannot decode {format} symbols. Install a recognizer that supports it.")]
    Unavailable { recognizer: String, format: String },

    #[error("Recognition failed: {0}")]
    Failed(String),
}

/// Errors that occur with the result cache
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Failed to open cache directory at {path}: {reason}")]
    OpenFailed { path: PathBuf, reason: String },

    #[error("Cache I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cache entry at {path} is corrupt ({reason}). Delete this file or run `cache clear`.")]
    Corrupted { path: PathBuf, reason: String },

    #[error("Failed to serialize cache entry: {0}")]
    SerializationFailed(String),
}

/// Errors that occur while loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("Failed to write config file {path}: {reason}")]
    Write { path: PathBuf, reason: String },
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, SieveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_error_includes_path() {
        let error = ScanError::DirectoryNotFound {
            path: PathBuf::from("/scans/invoices"),
        };
        let message = error.to_string();
        assert!(message.contains("/scans/invoices"));
    }

    #[test]
    fn decode_error_includes_path_and_reason() {
        let error = DecodeError::InvalidImage {
            path: PathBuf::from("/scans/broken.jpg"),
            reason: "invalid JPEG".to_string(),
        };
        let message = error.to_string();
        assert!(message.contains("/scans/broken.jpg"));
        assert!(message.contains("invalid JPEG"));
    }

    #[test]
    fn unavailable_recognizer_names_format() {
        let error = RecognizerError::Unavailable {
            recognizer: "rqrr".to_string(),
            format: "PDF417".to_string(),
        };
        let message = error.to_string();
        assert!(message.contains("rqrr"));
        assert!(message.contains("PDF417"));
    }

    #[test]
    fn cache_error_suggests_recovery() {
        let error = CacheError::Corrupted {
            path: PathBuf::from("/cache/abc.json"),
            reason: "EOF while parsing".to_string(),
        };
        let message = error.to_string();
        assert!(message.contains("cache clear"));
    }

    #[test]
    fn top_level_error_wraps_sources() {
        let error: SieveError = RecognizerError::Failed("boom".to_string()).into();
        assert!(error.to_string().contains("boom"));
    }
}
