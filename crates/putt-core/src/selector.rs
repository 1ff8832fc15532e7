//! Ball and hole candidate selection over one frame's regions.
//!
//! The ball is the brightest round thing of reasonable size; the hole is seen
//! at a low angle, so it shows up as a wide, shallow, elongated dark ellipse.

use log::debug;
use serde::{Deserialize, Serialize};
#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::geometry::{Candidate, CandidateRole, DetectedRegion};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorParams {
    /// Ball regions with fewer pixels are discarded.
    pub ball_min_pixels: u32,
    pub roundness_weight: f32,
    pub elongation_weight: f32,
    pub pixel_weight: f32,
    /// Hole regions must have an area strictly above this.
    pub hole_min_area: u32,
    /// Hole regions must have `w / max(1, h)` strictly above this.
    pub hole_min_aspect: f32,
    /// Hole regions must have elongation strictly above this.
    pub hole_min_elongation: f32,
}

impl Default for SelectorParams {
    fn default() -> Self {
        Self {
            ball_min_pixels: 225,
            roundness_weight: 2.0,
            elongation_weight: 1.0,
            pixel_weight: 0.002,
            hole_min_area: 300,
            hole_min_aspect: 1.3,
            hole_min_elongation: 0.7,
        }
    }
}

/// Best ball and hole for a single frame. Each role is independent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub ball: Option<Candidate>,
    pub hole: Option<Candidate>,
}

impl Selection {
    pub fn is_complete(&self) -> bool {
        self.ball.is_some() && self.hole.is_some()
    }
}

/// Stateless selector; holds only its thresholds.
#[derive(Clone, Debug, Default)]
pub struct CandidateSelector {
    params: SelectorParams,
}

impl CandidateSelector {
    pub fn new(params: SelectorParams) -> Self {
        Self { params }
    }

    #[inline]
    pub fn params(&self) -> &SelectorParams {
        &self.params
    }

    /// `2·roundness − 1·elongation + 0.002·pixel_count` with the default weights.
    pub fn ball_score(&self, region: &DetectedRegion) -> f32 {
        self.params.roundness_weight * region.roundness
            - self.params.elongation_weight * region.elongation
            + self.params.pixel_weight * region.pixel_count as f32
    }

    pub fn is_hole_shaped(&self, region: &DetectedRegion) -> bool {
        region.area > self.params.hole_min_area
            && region.bbox.aspect_ratio() > self.params.hole_min_aspect
            && region.elongation > self.params.hole_min_elongation
    }

    /// Pick the highest-scoring bright region. Ties keep the earliest region.
    pub fn select_ball(&self, regions: &[DetectedRegion]) -> Option<Candidate> {
        let best = first_max_by(
            regions
                .iter()
                .filter(|r| r.pixel_count >= self.params.ball_min_pixels)
                .map(|r| (r, self.ball_score(r))),
        )?;
        Some(Candidate {
            region: *best.0,
            role: CandidateRole::Ball,
            score: best.1,
        })
    }

    /// Pick the largest hole-shaped dark region. Ties keep the earliest region.
    pub fn select_hole(&self, regions: &[DetectedRegion]) -> Option<Candidate> {
        let best = first_max_by(
            regions
                .iter()
                .filter(|r| self.is_hole_shaped(r))
                .map(|r| (r, r.area as f32)),
        )?;
        Some(Candidate {
            region: *best.0,
            role: CandidateRole::Hole,
            score: best.1,
        })
    }

    /// Select both roles from the bright and dark segmentations of one frame.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, bright, dark), fields(bright = bright.len(), dark = dark.len()))
    )]
    pub fn select(&self, bright: &[DetectedRegion], dark: &[DetectedRegion]) -> Selection {
        let selection = Selection {
            ball: self.select_ball(bright),
            hole: self.select_hole(dark),
        };
        debug!(
            "selection: {} bright / {} dark regions -> ball={} hole={}",
            bright.len(),
            dark.len(),
            selection.ball.is_some(),
            selection.hole.is_some()
        );
        selection
    }
}

/// `Iterator::max_by` keeps the *last* maximum; selection needs the first.
/// Non-finite scores never compete.
fn first_max_by<'a, I>(items: I) -> Option<(&'a DetectedRegion, f32)>
where
    I: Iterator<Item = (&'a DetectedRegion, f32)>,
{
    let mut best: Option<(&'a DetectedRegion, f32)> = None;
    for (region, score) in items.filter(|(_, s)| s.is_finite()) {
        if best.map(|(_, s)| score > s).unwrap_or(true) {
            best = Some((region, score));
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::PixelRect;

    fn ball(pixels: u32, roundness: f32, elongation: f32) -> DetectedRegion {
        DetectedRegion::from_rect(PixelRect::new(0, 0, 20, 20), pixels, roundness, elongation)
    }

    fn hole(w: u32, h: u32, elongation: f32) -> DetectedRegion {
        DetectedRegion::from_rect(PixelRect::new(50, 120, w, h), w * h / 2, 0.3, elongation)
    }

    #[test]
    fn small_ball_regions_are_never_selected() {
        let selector = CandidateSelector::default();
        let regions = [ball(224, 1.0, 0.0), ball(10, 1.0, 0.0), ball(0, 1.0, 0.0)];
        assert!(selector.select_ball(&regions).is_none());

        let regions = [ball(224, 1.0, 0.0), ball(225, 0.1, 0.9)];
        let picked = selector.select_ball(&regions).expect("one qualifying region");
        assert_eq!(picked.region.pixel_count, 225);
        assert_eq!(picked.role, CandidateRole::Ball);
    }

    #[test]
    fn rounder_ball_wins() {
        let selector = CandidateSelector::default();
        let regions = [ball(400, 0.6, 0.2), ball(400, 0.9, 0.2)];
        let picked = selector.select_ball(&regions).expect("ball");
        assert_eq!(picked.region.roundness, 0.9);
    }

    #[test]
    fn ball_score_uses_all_terms() {
        let selector = CandidateSelector::default();
        let score = selector.ball_score(&ball(500, 0.8, 0.1));
        assert!((score - (1.6 - 0.1 + 1.0)).abs() < 1e-5);
    }

    #[test]
    fn ball_ties_keep_first_region() {
        let selector = CandidateSelector::default();
        let mut a = ball(300, 0.8, 0.1);
        a.centroid.x = 1.0;
        let mut b = a;
        b.centroid.x = 2.0;
        let picked = selector.select_ball(&[a, b]).expect("ball");
        assert_eq!(picked.region.centroid.x, 1.0);
    }

    #[test]
    fn nan_scored_region_does_not_hide_a_valid_ball() {
        let selector = CandidateSelector::default();
        let broken = ball(400, f32::NAN, 0.1);
        let good = ball(300, 0.9, 0.1);
        let picked = selector.select_ball(&[broken, good]).expect("ball");
        assert_eq!(picked.region.pixel_count, 300);
        assert!(picked.score.is_finite());

        let inf = ball(400, f32::INFINITY, 0.1);
        let picked = selector.select_ball(&[good, inf]).expect("ball");
        assert_eq!(picked.region.pixel_count, 300);

        assert!(selector.select_ball(&[broken]).is_none());
    }

    #[test]
    fn hole_ties_keep_first_region() {
        let selector = CandidateSelector::default();
        let mut a = hole(60, 20, 0.8);
        a.centroid.x = 1.0;
        let mut b = a;
        b.centroid.x = 2.0;
        let picked = selector.select_hole(&[a, b]).expect("hole");
        assert_eq!(picked.region.centroid.x, 1.0);
        assert_eq!(picked.region.area, b.area);
    }

    #[test]
    fn larger_hole_wins() {
        let selector = CandidateSelector::default();
        let regions = [hole(40, 20, 0.8), hole(60, 30, 0.8)];
        let picked = selector.select_hole(&regions).expect("hole");
        assert_eq!(picked.region.area, 1800);
        assert_eq!(picked.role, CandidateRole::Hole);
    }

    #[test]
    fn hole_shape_filters_apply() {
        let selector = CandidateSelector::default();
        // Too small: 20 * 15 = 300 is not above the minimum.
        assert!(!selector.is_hole_shaped(&hole(20, 15, 0.9)));
        // Too square.
        assert!(!selector.is_hole_shaped(&hole(30, 30, 0.9)));
        // Aspect exactly at the limit is rejected.
        assert!(!selector.is_hole_shaped(&hole(39, 30, 0.9)));
        // Not elongated enough.
        assert!(!selector.is_hole_shaped(&hole(60, 20, 0.7)));
        assert!(selector.is_hole_shaped(&hole(60, 20, 0.75)));
    }

    #[test]
    fn empty_inputs_select_nothing() {
        let selector = CandidateSelector::default();
        let selection = selector.select(&[], &[]);
        assert_eq!(selection, Selection::default());
        assert!(!selection.is_complete());
    }

    #[test]
    fn roles_are_independent() {
        let selector = CandidateSelector::default();
        let selection = selector.select(&[ball(300, 0.9, 0.1)], &[hole(10, 10, 0.1)]);
        assert!(selection.ball.is_some());
        assert!(selection.hole.is_none());
    }
}
