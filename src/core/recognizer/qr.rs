//! QR code recognizer backed by rqrr.

use super::{RawDetection, SymbolFormat, SymbolRecognizer};
use crate::core::detection::{Point, Rect};
use crate::error::RecognizerError;
use image::GrayImage;
use rqrr::PreparedImage;
use tracing::trace;

/// rqrr does not score detections, so every decoded grid reports this.
const RQRR_QUALITY: i32 = 1;

/// Pure-Rust QR code recognizer
#[derive(Debug, Default, Clone, Copy)]
pub struct QrRecognizer;

impl QrRecognizer {
    pub fn new() -> Self {
        Self
    }
}

impl SymbolRecognizer for QrRecognizer {
    fn name(&self) -> &str {
        "rqrr"
    }

    fn supports(&self, format: SymbolFormat) -> bool {
        format == SymbolFormat::QrCode
    }

    fn recognize(
        &self,
        image: &GrayImage,
        format: SymbolFormat,
    ) -> Result<Vec<RawDetection>, RecognizerError> {
        if !self.supports(format) {
            return Err(RecognizerError::Unavailable {
                recognizer: self.name().to_string(),
                format: format.to_string(),
            });
        }

        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Ok(Vec::new());
        }

        let mut prepared = PreparedImage::prepare_from_greyscale(
            width as usize,
            height as usize,
            |x, y| image.get_pixel(x as u32, y as u32).0[0],
        );

        let mut detections = Vec::new();
        for grid in prepared.detect_grids() {
            let mut payload = Vec::new();
            // A grid that fails to decode is not a symbol, not an error
            if let Err(e) = grid.decode_to(&mut payload) {
                trace!("Skipping undecodable grid: {}", e);
                continue;
            }

            let polygon: Vec<Point> = grid.bounds.iter().map(|p| Point::new(p.x, p.y)).collect();
            let rect = Rect::enclosing(&polygon).unwrap_or(Rect::new(0, 0, 0, 0));

            detections.push(RawDetection {
                payload,
                symbol_kind: format.tag().to_string(),
                rect,
                polygon,
                quality: RQRR_QUALITY,
            });
        }

        Ok(detections)
    }
}
