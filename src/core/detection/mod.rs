//! # Detection Module
//!
//! Value types shared by every stage of the pipeline.
//!
//! A [`Detection`] is one symbol found on one cascade candidate. Geometry is
//! always expressed in the coordinate space of the original image, since
//! every cascade step preserves dimensions.

use crate::core::recognizer::RawDetection;
use imageproc::geometry::convex_hull;
use imageproc::point::Point as HullPoint;
use serde::{Deserialize, Serialize};

/// An integer point on a symbol outline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned bounding rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(left: i32, top: i32, width: u32, height: u32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Smallest rectangle enclosing all points, or `None` for an empty slice
    pub fn enclosing(points: &[Point]) -> Option<Self> {
        let first = points.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in &points[1..] {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(Self {
            left: min_x,
            top: min_y,
            width: (max_x - min_x) as u32,
            height: (max_y - min_y) as u32,
        })
    }
}

impl std::fmt::Display for Rect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Rect(left={}, top={}, width={}, height={})",
            self.left, self.top, self.width, self.height
        )
    }
}

/// One symbol found by the recognizer on one cascade candidate.
///
/// Serializes field-for-field into the cache entry format. There is
/// deliberately no `PartialEq`: symbol identity is decided by
/// [`Detection::is_same_symbol`], which ignores `method_index`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    /// Decoded text
    #[serde(rename = "data")]
    pub payload: String,
    /// Symbol format tag reported by the recognizer
    #[serde(rename = "type")]
    pub symbol_kind: String,
    /// Recognizer confidence, carried through unchanged
    pub quality: i32,
    /// Cascade candidate that produced this detection
    #[serde(rename = "preprocess_method", with = "method_tag")]
    pub method_index: usize,
    /// Bounding box in original-image pixels
    pub rect: Rect,
    /// Symbol outline, at least four points
    pub polygon: Vec<Point>,
}

impl Detection {
    /// Build a detection from recognizer output produced on cascade
    /// candidate `method_index`.
    pub fn from_raw(raw: RawDetection, method_index: usize) -> Self {
        Self {
            payload: payload_text(&raw.payload),
            symbol_kind: raw.symbol_kind,
            quality: raw.quality,
            method_index,
            rect: raw.rect,
            polygon: reduce_outline(raw.polygon),
        }
    }

    /// Same payload and top-left corners within `tolerance` on both axes.
    pub fn is_same_symbol(&self, other: &Detection, tolerance: u32) -> bool {
        self.payload == other.payload
            && self.rect.left.abs_diff(other.rect.left) < tolerance
            && self.rect.top.abs_diff(other.rect.top) < tolerance
    }
}

/// Interpret recognizer bytes as UTF-8, dropping invalid sequences.
pub fn payload_text(bytes: &[u8]) -> String {
    let mut text = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        text.push_str(chunk.valid());
    }
    text
}

/// Reduce outlines with more than four points to their convex hull.
///
/// A hull with fewer than four vertices (collinear outlines) would break the
/// four-point minimum, so the raw outline is kept in that case.
pub fn reduce_outline(polygon: Vec<Point>) -> Vec<Point> {
    if polygon.len() <= 4 {
        return polygon;
    }

    let points: Vec<HullPoint<i32>> = polygon.iter().map(|p| HullPoint::new(p.x, p.y)).collect();
    let hull = convex_hull(points.as_slice());

    if hull.len() < 4 {
        return polygon;
    }

    hull.into_iter().map(|p| Point::new(p.x, p.y)).collect()
}

/// Serde adapter for the `"method_<index>"` tag.
mod method_tag {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    const PREFIX: &str = "method_";

    pub fn serialize<S: Serializer>(index: &usize, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{PREFIX}{index}"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<usize, D::Error> {
        let tag = String::deserialize(deserializer)?;
        tag.strip_prefix(PREFIX)
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| D::Error::custom(format!("invalid preprocess method tag: {tag}")))
    }
}
