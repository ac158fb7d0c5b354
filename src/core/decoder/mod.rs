//! # Decoder Module
//!
//! The single-image pipeline: load, cascade, recognize, deduplicate.
//!
//! ## Example
//! ```rust,ignore
//! use symbol_sieve::core::decoder::ImageDecoder;
//! use symbol_sieve::core::recognizer::{BarcodeRecognizer, SymbolFormat};
//!
//! let decoder = ImageDecoder::new(Arc::new(BarcodeRecognizer::new()), SymbolFormat::Pdf417)?;
//! let detections = decoder.decode_file(Path::new("licence.jpg"))?;
//! ```

use crate::core::aggregator::DetectionAggregator;
use crate::core::cache::{ContentHash, ResultCache};
use crate::core::detection::Detection;
use crate::core::preprocess::PreprocessingCascade;
use crate::core::recognizer::{ensure_supported, SymbolFormat, SymbolRecognizer};
use crate::error::{DecodeError, RecognizerError};
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::{self, Cursor};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Results of one decode, and whether they came from the cache
#[derive(Debug, Clone)]
pub struct Decoded {
    pub detections: Vec<Detection>,
    pub cache_hit: bool,
}

/// Decodes symbols from single images
pub struct ImageDecoder {
    recognizer: Arc<dyn SymbolRecognizer>,
    format: SymbolFormat,
    cascade: PreprocessingCascade,
    aggregator: DetectionAggregator,
}

impl ImageDecoder {
    /// Create a decoder for `format`.
    ///
    /// Fails when the recognizer cannot decode `format`; that is a startup
    /// problem, not something to retry per file.
    pub fn new(
        recognizer: Arc<dyn SymbolRecognizer>,
        format: SymbolFormat,
    ) -> Result<Self, RecognizerError> {
        ensure_supported(recognizer.as_ref(), format)?;

        Ok(Self {
            recognizer,
            format,
            cascade: PreprocessingCascade::new(),
            aggregator: DetectionAggregator::new(),
        })
    }

    /// Replace the default aggregator (e.g. to change the dedup tolerance)
    pub fn with_aggregator(mut self, aggregator: DetectionAggregator) -> Self {
        self.aggregator = aggregator;
        self
    }

    pub fn format(&self) -> SymbolFormat {
        self.format
    }

    pub fn recognizer_name(&self) -> &str {
        self.recognizer.name()
    }

    /// Decode an image file, bypassing any cache
    pub fn decode_file(&self, path: &Path) -> Result<Vec<Detection>, DecodeError> {
        let image = load_image(path)?;
        self.decode_image(&image).map_err(|source| DecodeError::Recognizer {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Decode an image already in memory
    pub fn decode_image(&self, image: &DynamicImage) -> Result<Vec<Detection>, RecognizerError> {
        let candidates = self.cascade.apply(image);
        self.aggregator
            .aggregate(self.recognizer.as_ref(), self.format, &candidates)
    }

    /// Decode through `cache`: serve a fresh entry if one exists, otherwise
    /// decode and store the result.
    ///
    /// The file is read once; the cache key and the decoded pixels come from
    /// the same bytes even if the file is rewritten meanwhile. Cache problems
    /// never surface here.
    pub fn decode_file_cached(
        &self,
        path: &Path,
        cache: &ResultCache,
    ) -> Result<Decoded, DecodeError> {
        let bytes = read_file(path)?;
        let hash = cache.is_enabled().then(|| ContentHash::of_bytes(&bytes));

        if let Some(detections) = hash.as_ref().and_then(|h| cache.lookup(h)) {
            return Ok(Decoded {
                detections,
                cache_hit: true,
            });
        }

        let image = decode_bytes(path, &bytes)?;
        let detections = self
            .decode_image(&image)
            .map_err(|source| DecodeError::Recognizer {
                path: path.to_path_buf(),
                source,
            })?;

        if let Some(hash) = &hash {
            cache.store(hash, path, &detections);
        }

        Ok(Decoded {
            detections,
            cache_hit: false,
        })
    }
}

impl std::fmt::Debug for ImageDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageDecoder")
            .field("recognizer", &self.recognizer.name())
            .field("format", &self.format)
            .field("aggregator", &self.aggregator)
            .finish()
    }
}

/// Read and decode an image file
pub fn load_image(path: &Path) -> Result<DynamicImage, DecodeError> {
    let bytes = read_file(path)?;
    decode_bytes(path, &bytes)
}

fn read_file(path: &Path) -> Result<Vec<u8>, DecodeError> {
    std::fs::read(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => DecodeError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => DecodeError::Unreadable {
            path: path.to_path_buf(),
            source,
        },
    })
}

/// Decode image bytes read from `path`. The extension is only a hint; the
/// content decides the format.
fn decode_bytes(path: &Path, bytes: &[u8]) -> Result<DynamicImage, DecodeError> {
    let mut reader = ImageReader::new(Cursor::new(bytes));
    if let Ok(format) = ImageFormat::from_path(path) {
        reader.set_format(format);
    }

    let image = reader
        .with_guessed_format()
        .map_err(|source| DecodeError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?
        .decode()
        .map_err(|e| DecodeError::InvalidImage {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    debug!("Loaded {} ({}x{})", path.display(), image.width(), image.height());
    Ok(image)
}
