use nalgebra::{Point2, Point3};
use serde::{Deserialize, Serialize};

/// Estimated physical location relative to the camera, in meters.
///
/// `x` grows to the right of the optical axis, `y` grows downwards (image
/// convention) and `z` is the depth along the optical axis.
pub type Position3D = Point3<f32>;

/// Axis-aligned bounding box in image pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub w: u32,
    pub h: u32,
}

impl PixelRect {
    pub fn new(x: i32, y: i32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    /// Width over height, with the height clamped to at least one pixel.
    #[inline]
    pub fn aspect_ratio(&self) -> f32 {
        self.w as f32 / self.h.max(1) as f32
    }

    /// Average of width and height, used as the apparent diameter.
    #[inline]
    pub fn apparent_diameter(&self) -> f32 {
        0.5 * (self.w as f32 + self.h as f32)
    }

    #[inline]
    pub fn area(&self) -> u32 {
        self.w.saturating_mul(self.h)
    }
}

/// One blob extracted from a frame by the vision collaborator.
///
/// The core never builds these from pixels; it only reads them. `roundness`
/// and `elongation` are expected in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectedRegion {
    pub bbox: PixelRect,
    pub centroid: Point2<f32>,
    /// Number of pixels that passed the intensity threshold.
    pub pixel_count: u32,
    pub roundness: f32,
    pub elongation: f32,
    /// Region area as reported by the collaborator (bounding-box area for
    /// the usual blob finders).
    pub area: u32,
}

impl DetectedRegion {
    /// Build a region whose centroid is the box center and whose area is the
    /// box area.
    pub fn from_rect(bbox: PixelRect, pixel_count: u32, roundness: f32, elongation: f32) -> Self {
        Self {
            bbox,
            centroid: Point2::new(
                bbox.x as f32 + 0.5 * bbox.w as f32,
                bbox.y as f32 + 0.5 * bbox.h as f32,
            ),
            pixel_count,
            roundness,
            elongation,
            area: bbox.area(),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateRole {
    Ball,
    Hole,
}

/// A region picked as the ball or the hole for the current frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub region: DetectedRegion,
    pub role: CandidateRole,
    /// Ranking value the selector used (ball score or hole area).
    pub score: f32,
}
