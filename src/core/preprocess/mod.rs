//! # Preprocess Module
//!
//! Derives a fixed cascade of candidate rasters from one input image.
//!
//! ## Cascade
//! The order is part of the observable contract: a candidate's position is
//! the `method_index` recorded on every detection it yields, and the
//! aggregator keeps the first-seen duplicate.
//!
//! 0. Original image as supplied
//! 1. Grayscale
//! 2. Otsu binary threshold
//! 3. Inverse of (2)
//! 4. Adaptive mean threshold (uneven lighting)
//! 5. Morphological closing of (2) (bridges broken bars)
//! 6. Sharpened grayscale (counteracts blur)
//!
//! Every candidate keeps the input's dimensions, so detection geometry is
//! valid in original-image coordinates.

mod ops;

pub use ops::{adaptive_mean_threshold, sharpen};

use image::{DynamicImage, GrayImage};
use imageproc::contrast::{otsu_level, threshold, ThresholdType};
use imageproc::distance_transform::Norm;
use imageproc::morphology;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Neighbourhood radius of the adaptive threshold (11x11 window)
pub const ADAPTIVE_BLOCK_RADIUS: u32 = 5;
/// Offset subtracted from the local mean before comparing
pub const ADAPTIVE_OFFSET: i32 = 2;
/// Two iterations of a 3x3 square element
pub const CLOSE_RADIUS: u8 = 2;

/// One step of the cascade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PreprocessMethod {
    Original,
    Grayscale,
    OtsuBinary,
    InvertedBinary,
    AdaptiveMean,
    MorphClose,
    Sharpened,
}

impl PreprocessMethod {
    /// All steps, in cascade order
    pub const ALL: [PreprocessMethod; 7] = [
        PreprocessMethod::Original,
        PreprocessMethod::Grayscale,
        PreprocessMethod::OtsuBinary,
        PreprocessMethod::InvertedBinary,
        PreprocessMethod::AdaptiveMean,
        PreprocessMethod::MorphClose,
        PreprocessMethod::Sharpened,
    ];

    /// Position in the cascade
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Look up a step by its cascade position
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            PreprocessMethod::Original => "original image",
            PreprocessMethod::Grayscale => "grayscale",
            PreprocessMethod::OtsuBinary => "Otsu binary threshold",
            PreprocessMethod::InvertedBinary => "inverted binary threshold",
            PreprocessMethod::AdaptiveMean => "adaptive mean threshold",
            PreprocessMethod::MorphClose => "morphological closing",
            PreprocessMethod::Sharpened => "sharpened",
        }
    }
}

impl std::fmt::Display for PreprocessMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "method_{} ({})", self.index(), self.description())
    }
}

/// A derived raster plus the step that produced it
#[derive(Debug, Clone)]
pub struct Candidate {
    pub method: PreprocessMethod,
    pub image: DynamicImage,
}

/// The preprocessing cascade
#[derive(Debug, Clone, Default)]
pub struct PreprocessingCascade;

impl PreprocessingCascade {
    pub fn new() -> Self {
        Self
    }

    /// Derive all candidates, in cascade order.
    ///
    /// Steps run in parallel; the output order never depends on scheduling.
    pub fn apply(&self, image: &DynamicImage) -> Vec<Candidate> {
        let gray = image.to_luma8();
        let binary = threshold(&gray, otsu_level(&gray), ThresholdType::Binary);

        PreprocessMethod::ALL
            .par_iter()
            .map(|&method| Candidate {
                method,
                image: derive(method, image, &gray, &binary),
            })
            .collect()
    }
}

fn derive(
    method: PreprocessMethod,
    original: &DynamicImage,
    gray: &GrayImage,
    binary: &GrayImage,
) -> DynamicImage {
    let raster = match method {
        PreprocessMethod::Original => return original.clone(),
        PreprocessMethod::Grayscale => gray.clone(),
        PreprocessMethod::OtsuBinary => binary.clone(),
        PreprocessMethod::InvertedBinary => {
            let mut inverted = binary.clone();
            image::imageops::invert(&mut inverted);
            inverted
        }
        PreprocessMethod::AdaptiveMean => {
            adaptive_mean_threshold(gray, ADAPTIVE_BLOCK_RADIUS, ADAPTIVE_OFFSET)
        }
        PreprocessMethod::MorphClose => morphology::close(binary, Norm::LInf, CLOSE_RADIUS),
        PreprocessMethod::Sharpened => sharpen(gray),
    };
    DynamicImage::ImageLuma8(raster)
}
