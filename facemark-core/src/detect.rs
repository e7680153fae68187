//! Face detector adapters.
//!
//! The embedding pipeline treats face detection as a black box: given a
//! grayscale frame, a detector returns zero or one face region. The only
//! requirement is determinism for identical pixel input.
//!
//! Two reference detectors are provided, plus a blanket implementation for
//! closures so callers can plug in any external model:
//!
//! ```
//! use facemark_core::detect::{FaceDetector, FaceRegion};
//! use image::GrayImage;
//!
//! let detector = |_frame: &GrayImage| Some(FaceRegion::new(40, 40, 48, 48));
//! let frame = GrayImage::new(128, 128);
//! assert_eq!(detector.detect(&frame), Some(FaceRegion::new(40, 40, 48, 48)));
//! ```

use std::fmt;

use image::GrayImage;
use serde::{Deserialize, Serialize};

/// Axis-aligned face bounding box in frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl FaceRegion {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Clip the region to a `width`×`height` frame.
    ///
    /// Returns `None` when nothing of the region remains inside the frame.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<Self> {
        if self.x >= width || self.y >= height {
            return None;
        }
        let w = self.width.min(width - self.x);
        let h = self.height.min(height - self.y);
        if w == 0 || h == 0 {
            return None;
        }
        Some(Self::new(self.x, self.y, w, h))
    }

    /// Whether the two regions share at least one pixel.
    pub fn intersects(&self, other: &Self) -> bool {
        let self_right = u64::from(self.x) + u64::from(self.width);
        let self_bottom = u64::from(self.y) + u64::from(self.height);
        let other_right = u64::from(other.x) + u64::from(other.width);
        let other_bottom = u64::from(other.y) + u64::from(other.height);

        self.width > 0
            && self.height > 0
            && other.width > 0
            && other.height > 0
            && u64::from(self.x) < other_right
            && u64::from(other.x) < self_right
            && u64::from(self.y) < other_bottom
            && u64::from(other.y) < self_bottom
    }
}

impl fmt::Display for FaceRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

/// Source of face bounding boxes.
///
/// Implementations must be deterministic: the same frame always yields the
/// same region. Detectors are passed explicitly to every operation; nothing
/// is cached between calls.
pub trait FaceDetector {
    /// Detect at most one face in a grayscale frame.
    fn detect(&self, frame: &GrayImage) -> Option<FaceRegion>;
}

impl<F> FaceDetector for F
where
    F: Fn(&GrayImage) -> Option<FaceRegion>,
{
    fn detect(&self, frame: &GrayImage) -> Option<FaceRegion> {
        self(frame)
    }
}

/// Detector that always reports the same region, clipped to the frame.
///
/// Useful for footage where the subject is framed by the capture setup
/// (kiosks, fixed webcams).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedRegionDetector {
    region: FaceRegion,
}

impl FixedRegionDetector {
    pub fn new(region: FaceRegion) -> Self {
        Self { region }
    }

    pub fn region(&self) -> FaceRegion {
        self.region
    }
}

impl FaceDetector for FixedRegionDetector {
    fn detect(&self, frame: &GrayImage) -> Option<FaceRegion> {
        self.region.clamp_to(frame.width(), frame.height())
    }
}

/// Detector reporting a centered square whose side is `scale` times the
/// shorter frame edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CenteredDetector {
    scale: f32,
}

/// Default side of the centered square relative to the shorter edge.
pub const DEFAULT_CENTER_SCALE: f32 = 0.5;

impl CenteredDetector {
    /// Create a detector; `scale` is clamped to `(0, 1]`.
    pub fn new(scale: f32) -> Self {
        let scale = if scale.is_finite() && scale > 0.0 {
            scale.min(1.0)
        } else {
            DEFAULT_CENTER_SCALE
        };
        Self { scale }
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }
}

impl Default for CenteredDetector {
    fn default() -> Self {
        Self::new(DEFAULT_CENTER_SCALE)
    }
}

impl FaceDetector for CenteredDetector {
    fn detect(&self, frame: &GrayImage) -> Option<FaceRegion> {
        let (width, height) = frame.dimensions();
        let shorter = width.min(height);
        let side = ((shorter as f32) * self.scale).round() as u32;
        if side == 0 {
            return None;
        }
        let x = (width - side) / 2;
        let y = (height - side) / 2;
        Some(FaceRegion::new(x, y, side, side))
    }
}
