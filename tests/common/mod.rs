//! Helpers shared by the integration tests.

#![allow(dead_code)]

use image::{GrayImage, Luma};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;
use symbol_sieve::core::batch::CancellationToken;
use symbol_sieve::core::detection::{Point, Rect};
use symbol_sieve::core::recognizer::{RawDetection, SymbolFormat, SymbolRecognizer};
use symbol_sieve::error::RecognizerError;

/// Recognizer that "reads" the value of the top-left pixel.
///
/// Every candidate yields one detection whose payload is `page-<value>`, so
/// a file's result depends only on its content. Calls on darker images take
/// longer, which scrambles completion order across workers.
pub struct PixelRecognizer {
    calls: AtomicUsize,
    cancel_on: Option<(u8, CancellationToken)>,
}

impl PixelRecognizer {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            cancel_on: None,
        }
    }

    /// Cancel `token` when an image with top-left pixel `value` is seen
    pub fn cancelling(value: u8, token: CancellationToken) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            cancel_on: Some((value, token)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SymbolRecognizer for PixelRecognizer {
    fn name(&self) -> &str {
        "pixel"
    }

    fn supports(&self, format: SymbolFormat) -> bool {
        format == SymbolFormat::Pdf417
    }

    fn recognize(
        &self,
        image: &GrayImage,
        _format: SymbolFormat,
    ) -> Result<Vec<RawDetection>, RecognizerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let value = image.get_pixel(0, 0)[0];

        if let Some((trigger, token)) = &self.cancel_on {
            if value == *trigger {
                token.cancel();
            }
        }

        thread::sleep(Duration::from_millis(u64::from(255 - value) / 50));

        Ok(vec![RawDetection {
            payload: format!("page-{}", value).into_bytes(),
            symbol_kind: "PDF417".to_string(),
            rect: Rect::new(4, 4, 24, 24),
            polygon: vec![
                Point::new(4, 4),
                Point::new(28, 4),
                Point::new(28, 28),
                Point::new(4, 28),
            ],
            quality: 1,
        }])
    }
}

/// Write a uniform grayscale PNG
pub fn write_page(path: &Path, value: u8) {
    GrayImage::from_pixel(32, 32, Luma([value]))
        .save(path)
        .unwrap();
}
