//! Pinhole distance estimation from apparent size.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::geometry::{Candidate, CandidateRole, Position3D};

/// Calibrated camera and the physical sizes of the objects it looks at.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraParams {
    /// Focal length in pixels, from a one-time calibration shot.
    pub focal_px: f32,
    pub image_width: u32,
    pub image_height: u32,
    /// Regulation golf ball diameter.
    pub ball_diameter_m: f32,
    /// Regulation cup diameter.
    pub hole_diameter_m: f32,
}

impl Default for CameraParams {
    fn default() -> Self {
        Self {
            focal_px: 146.0,
            image_width: 320,
            image_height: 240,
            ball_diameter_m: 0.04267,
            hole_diameter_m: 0.108,
        }
    }
}

impl CameraParams {
    /// Principal point, assumed at the image center.
    pub fn image_center(&self) -> Point2<f32> {
        Point2::new(
            0.5 * self.image_width as f32,
            0.5 * self.image_height as f32,
        )
    }

    pub fn real_diameter(&self, role: CandidateRole) -> f32 {
        match role {
            CandidateRole::Ball => self.ball_diameter_m,
            CandidateRole::Hole => self.hole_diameter_m,
        }
    }
}

/// Ball and hole positions plus the distance between them.
///
/// Positions are kept even when the other one is missing, so a caller can
/// still report the single estimate it has.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BallHoleEstimate {
    pub ball: Option<Position3D>,
    pub hole: Option<Position3D>,
    pub distance_m: Option<f32>,
}

#[derive(Clone, Debug, Default)]
pub struct DistanceEstimator {
    camera: CameraParams,
}

impl DistanceEstimator {
    pub fn new(camera: CameraParams) -> Self {
        Self { camera }
    }

    #[inline]
    pub fn camera(&self) -> &CameraParams {
        &self.camera
    }

    /// Back-project an apparent diameter and image position into camera space.
    ///
    /// Returns `None` if the apparent diameter, focal length or real diameter
    /// is not positive, or if the result is not finite.
    pub fn position_from_apparent(
        &self,
        apparent_diameter_px: f32,
        centroid: Point2<f32>,
        real_diameter_m: f32,
    ) -> Option<Position3D> {
        let f = self.camera.focal_px;
        if !(apparent_diameter_px > 0.0 && f > 0.0 && real_diameter_m > 0.0) {
            return None;
        }
        let c0 = self.camera.image_center();
        let z = f * real_diameter_m / apparent_diameter_px;
        let x = z * (centroid.x - c0.x) / f;
        let y = z * (centroid.y - c0.y) / f;
        let p = Position3D::new(x, y, z);
        p.coords.iter().all(|v| v.is_finite()).then_some(p)
    }

    /// Position of a selected candidate, using the real diameter for its role.
    pub fn estimate(&self, candidate: &Candidate) -> Option<Position3D> {
        self.position_from_apparent(
            candidate.region.bbox.apparent_diameter(),
            candidate.region.centroid,
            self.camera.real_diameter(candidate.role),
        )
    }

    /// Estimate both positions and, if both exist, the distance between them.
    pub fn ball_to_hole(
        &self,
        ball: Option<&Candidate>,
        hole: Option<&Candidate>,
    ) -> BallHoleEstimate {
        let ball = ball.and_then(|c| self.estimate(c));
        let hole = hole.and_then(|c| self.estimate(c));
        BallHoleEstimate {
            ball,
            hole,
            distance_m: distance_between(ball, hole),
        }
    }
}

/// Euclidean distance between two optional estimates; symmetric in its arguments.
pub fn distance_between(a: Option<Position3D>, b: Option<Position3D>) -> Option<f32> {
    match (a, b) {
        (Some(a), Some(b)) => Some((a - b).norm()),
        _ => None,
    }
}
