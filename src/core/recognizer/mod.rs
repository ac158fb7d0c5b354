//! # Recognizer Module
//!
//! The seam between the pipeline and whatever actually reads symbols.
//!
//! The pipeline treats recognition as an opaque capability: it hands over
//! an 8-bit grayscale raster plus the one symbol format it wants, and gets
//! back raw detections. Anything implementing [`SymbolRecognizer`] can be
//! plugged in.
//!
//! ## Implementations
//! - `BarcodeRecognizer` - every [`SymbolFormat`] via `rxing` (the default)
//! - `QrRecognizer` - QR codes only, via the pure-Rust `rqrr` crate

mod barcode;
mod qr;

pub use barcode::BarcodeRecognizer;
pub use qr::QrRecognizer;

use crate::core::detection::{Point, Rect};
use crate::error::RecognizerError;
use image::GrayImage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Symbol formats a recognizer can be restricted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolFormat {
    Pdf417,
    #[serde(rename = "qr")]
    QrCode,
    DataMatrix,
    Code128,
}

impl SymbolFormat {
    /// Tag stored in `Detection::symbol_kind`
    pub fn tag(&self) -> &'static str {
        match self {
            SymbolFormat::Pdf417 => "PDF417",
            SymbolFormat::QrCode => "QRCODE",
            SymbolFormat::DataMatrix => "DATAMATRIX",
            SymbolFormat::Code128 => "CODE128",
        }
    }
}

impl std::fmt::Display for SymbolFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Built-in recognizer backends, selectable from config and the CLI
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecognizerKind {
    #[default]
    Rxing,
    Rqrr,
}

impl RecognizerKind {
    pub fn build(self) -> Arc<dyn SymbolRecognizer> {
        match self {
            RecognizerKind::Rxing => Arc::new(BarcodeRecognizer::new()),
            RecognizerKind::Rqrr => Arc::new(QrRecognizer::new()),
        }
    }
}

/// One detection as reported by a recognizer, before the pipeline tags it
#[derive(Debug, Clone)]
pub struct RawDetection {
    /// Decoded bytes, not necessarily valid UTF-8
    pub payload: Vec<u8>,
    /// Format tag
    pub symbol_kind: String,
    /// Bounding box
    pub rect: Rect,
    /// Outline, at least four points
    pub polygon: Vec<Point>,
    /// Recognizer-defined confidence
    pub quality: i32,
}

/// Trait for symbol recognizers
///
/// `recognize` must be safe to call from many threads at once; the batch
/// worker pool shares one recognizer across all workers.
pub trait SymbolRecognizer: Send + Sync {
    /// Short name for logs and error messages
    fn name(&self) -> &str;

    /// Whether this recognizer can decode `format` at all
    fn supports(&self, format: SymbolFormat) -> bool;

    /// Find every symbol of `format` in a grayscale raster
    fn recognize(
        &self,
        image: &GrayImage,
        format: SymbolFormat,
    ) -> Result<Vec<RawDetection>, RecognizerError>;
}

/// Fail fast when `recognizer` cannot serve `format`.
pub fn ensure_supported(
    recognizer: &dyn SymbolRecognizer,
    format: SymbolFormat,
) -> Result<(), RecognizerError> {
    if recognizer.supports(format) {
        Ok(())
    } else {
        Err(RecognizerError::Unavailable {
            recognizer: recognizer.name().to_string(),
            format: format.to_string(),
        })
    }
}
