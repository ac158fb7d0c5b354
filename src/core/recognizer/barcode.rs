//! Multi-format recognizer backed by rxing.
//!
//! rxing is a pure-Rust port of ZXing. It reads every format in
//! [`SymbolFormat`], including the PDF417 stacks printed on driver licences
//! and boarding passes.

use super::{RawDetection, SymbolFormat, SymbolRecognizer};
use crate::core::detection::{Point, Rect};
use crate::error::RecognizerError;
use image::GrayImage;
use rxing::BarcodeFormat;
use tracing::trace;

/// rxing does not score detections either.
const RXING_QUALITY: i32 = 1;

/// Recognizer for PDF417, QR, Data Matrix and Code 128
#[derive(Debug, Default, Clone, Copy)]
pub struct BarcodeRecognizer;

impl BarcodeRecognizer {
    pub fn new() -> Self {
        Self
    }
}

fn rxing_format(format: SymbolFormat) -> BarcodeFormat {
    match format {
        SymbolFormat::Pdf417 => BarcodeFormat::PDF_417,
        SymbolFormat::QrCode => BarcodeFormat::QR_CODE,
        SymbolFormat::DataMatrix => BarcodeFormat::DATA_MATRIX,
        SymbolFormat::Code128 => BarcodeFormat::CODE_128,
    }
}

fn rect_corners(rect: &Rect) -> Vec<Point> {
    let right = rect.left.saturating_add_unsigned(rect.width);
    let bottom = rect.top.saturating_add_unsigned(rect.height);
    vec![
        Point::new(rect.left, rect.top),
        Point::new(right, rect.top),
        Point::new(right, bottom),
        Point::new(rect.left, bottom),
    ]
}

impl SymbolRecognizer for BarcodeRecognizer {
    fn name(&self) -> &str {
        "rxing"
    }

    fn supports(&self, _format: SymbolFormat) -> bool {
        true
    }

    fn recognize(
        &self,
        image: &GrayImage,
        format: SymbolFormat,
    ) -> Result<Vec<RawDetection>, RecognizerError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Ok(Vec::new());
        }

        // rxing reports "nothing found" as an error; a page without a
        // readable symbol is an empty result here
        let results =
            match rxing::helpers::detect_multiple_in_luma(image.as_raw().clone(), width, height) {
                Ok(results) => results,
                Err(e) => {
                    trace!("rxing found nothing: {}", e);
                    return Ok(Vec::new());
                }
            };

        let wanted = rxing_format(format);
        let detections = results
            .iter()
            .filter(|result| *result.getBarcodeFormat() == wanted)
            .map(|result| {
                let points: Vec<Point> = result
                    .getPoints()
                    .iter()
                    .map(|p| Point::new(p.x.round() as i32, p.y.round() as i32))
                    .collect();
                let rect = Rect::enclosing(&points).unwrap_or(Rect::new(0, 0, 0, 0));
                // Linear symbols report only their two end points
                let polygon = if points.len() < 4 {
                    rect_corners(&rect)
                } else {
                    points
                };

                RawDetection {
                    payload: result.getText().as_bytes().to_vec(),
                    symbol_kind: format.tag().to_string(),
                    rect,
                    polygon,
                    quality: RXING_QUALITY,
                }
            })
            .collect();

        Ok(detections)
    }
}
