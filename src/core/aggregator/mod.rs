//! # Aggregator Module
//!
//! Runs the recognizer over every cascade candidate and merges the results.
//!
//! ## Deduplication
//! The same physical symbol usually shows up on several candidates. Two
//! detections are the same symbol when their payloads are identical and
//! their top-left corners differ by less than the tolerance on *each* axis
//! (not Euclidean distance). The first one seen wins, so a later duplicate
//! is dropped even when it reports a higher quality.
//!
//! ## Complexity
//! Deduplication compares every raw detection against every accepted one,
//! O(n²) in raw detections. The cascade has a fixed length and documents
//! carry a handful of symbols, so n stays in the low tens.

use crate::core::detection::Detection;
use crate::core::preprocess::Candidate;
use crate::core::recognizer::{SymbolFormat, SymbolRecognizer};
use crate::error::RecognizerError;
use image::{DynamicImage, GrayImage};
use std::borrow::Cow;
use tracing::debug;

/// Per-axis pixel tolerance under which two detections are one symbol
pub const DEFAULT_POSITION_TOLERANCE: u32 = 20;

/// Collects and deduplicates detections across cascade candidates
#[derive(Debug, Clone)]
pub struct DetectionAggregator {
    tolerance: u32,
}

impl DetectionAggregator {
    /// Create an aggregator with the default 20px tolerance
    pub fn new() -> Self {
        Self {
            tolerance: DEFAULT_POSITION_TOLERANCE,
        }
    }

    /// Use a different per-axis tolerance
    pub fn with_tolerance(mut self, tolerance: u32) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Recognize every candidate and return the deduplicated detections.
    ///
    /// A recognizer failure on any candidate aborts the whole call; results
    /// from other candidates are not returned in that case.
    pub fn aggregate(
        &self,
        recognizer: &dyn SymbolRecognizer,
        format: SymbolFormat,
        candidates: &[Candidate],
    ) -> Result<Vec<Detection>, RecognizerError> {
        let raw = self.collect(recognizer, format, candidates)?;
        Ok(self.deduplicate(raw))
    }

    /// Run the recognizer on each candidate in cascade order and tag the
    /// detections with the candidate's method index.
    pub fn collect(
        &self,
        recognizer: &dyn SymbolRecognizer,
        format: SymbolFormat,
        candidates: &[Candidate],
    ) -> Result<Vec<Detection>, RecognizerError> {
        let mut detections = Vec::new();

        for candidate in candidates {
            let gray = as_gray(&candidate.image);
            let found = recognizer.recognize(&gray, format)?;
            let method_index = candidate.method.index();

            debug!("{} found {} symbol(s) on {}", recognizer.name(), found.len(), candidate.method);

            detections.extend(
                found
                    .into_iter()
                    .map(|raw| Detection::from_raw(raw, method_index)),
            );
        }

        Ok(detections)
    }

    /// Drop detections of a symbol already accepted earlier in the list.
    ///
    /// Order of the survivors is the input order. Running this on its own
    /// output is a no-op.
    pub fn deduplicate(&self, detections: Vec<Detection>) -> Vec<Detection> {
        let mut unique: Vec<Detection> = Vec::with_capacity(detections.len());

        for detection in detections {
            let seen = unique
                .iter()
                .any(|accepted| accepted.is_same_symbol(&detection, self.tolerance));
            if !seen {
                unique.push(detection);
            }
        }

        unique
    }
}

impl Default for DetectionAggregator {
    fn default() -> Self {
        Self::new()
    }
}

/// Recognizers only accept single-channel input.
fn as_gray(image: &DynamicImage) -> Cow<'_, GrayImage> {
    match image {
        DynamicImage::ImageLuma8(gray) => Cow::Borrowed(gray),
        other => Cow::Owned(other.to_luma8()),
    }
}
