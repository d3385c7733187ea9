use std::time::Duration;

use image::GrayImage;
use kolam_core::{
    crop_padded, find_contours, runtime, simplify_polygon, Budget, CropOffset, OrientedPath,
    PixelPoint,
};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::binarize::{clean_mask, has_contrast, otsu_stroke_mask, stroke_mask};
use crate::params::TracerParams;
use crate::segments::detect_segments;
use crate::stitch::stitch_paths;
use crate::thinning::{morphological_skeleton, zhang_suen, ThinningError};

/// Traces drawn strokes into polylines in the coordinates of the input image.
///
/// The stroke mask (Otsu ∪ adaptive, inverted, closed) is cropped to its
/// foreground, thinned to centerlines, and read out twice: as simplified
/// skeleton contours, and, if time allows, as straight Hough segments. All
/// pieces are then stitched at their endpoints.
#[derive(Clone, Debug, Default)]
pub struct SkeletonTracer {
    params: TracerParams,
}

impl SkeletonTracer {
    pub fn new(params: TracerParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &TracerParams {
        &self.params
    }

    /// Trace with a fresh budget of `params.budget_secs`.
    pub fn trace(&self, gray: &GrayImage) -> Vec<OrientedPath> {
        self.trace_with_budget(gray, &Budget::from_secs_f32(self.params.budget_secs))
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, gray, budget), fields(width = gray.width(), height = gray.height()))
    )]
    pub fn trace_with_budget(&self, gray: &GrayImage, budget: &Budget) -> Vec<OrientedPath> {
        let budget = budget.child(Duration::from_secs_f32(self.params.budget_secs.max(0.0)));

        let mask = clean_mask(&stroke_mask(gray, &self.params), &self.params);
        let (roi, offset) = crop_padded(&mask, self.params.crop_pad);
        let skeleton = self.skeletonize(&roi, &budget);

        let mut fragments = self.contour_paths(&skeleton, offset, &budget);
        let from_contours = fragments.len();

        if budget.remaining_fraction() > self.params.segment_budget_fraction {
            let (dx, dy) = (offset.x as i32, offset.y as i32);
            fragments.extend(
                detect_segments(&skeleton, &self.params.segments, &budget)
                    .into_iter()
                    .map(|s| vec![s.start.translated(dx, dy), s.end.translated(dx, dy)]),
            );
        } else {
            log::debug!("skipping segment detection, {:?} left", budget.remaining());
        }
        let from_segments = fragments.len() - from_contours;

        let paths = stitch_paths(fragments, &self.params.stitch);
        log::debug!(
            "traced {from_contours} contour and {from_segments} segment fragments into {} paths",
            paths.len()
        );
        if budget.is_exhausted() {
            log::warn!(
                "tracing exceeded its {:.1}s budget",
                budget.limit().as_secs_f32()
            );
        }
        paths
    }

    /// Contours of the plain inverted Otsu mask, stitched.
    ///
    /// Used when the skeleton tracer finds nothing. An image with a single
    /// intensity has no strokes and yields an empty list.
    pub fn trace_fallback(&self, gray: &GrayImage) -> Vec<OrientedPath> {
        self.trace_fallback_with_budget(gray, &Budget::from_secs_f32(self.params.budget_secs))
    }

    #[cfg_attr(feature = "tracing", instrument(level = "info", skip_all))]
    pub fn trace_fallback_with_budget(&self, gray: &GrayImage, budget: &Budget) -> Vec<OrientedPath> {
        if !has_contrast(gray) {
            return Vec::new();
        }
        let budget = budget.child(Duration::from_secs_f32(self.params.budget_secs.max(0.0)));
        let mask = otsu_stroke_mask(gray);
        let fragments = self.contour_paths(&mask, CropOffset::default(), &budget);
        let paths = stitch_paths(fragments, &self.params.stitch);
        log::debug!("fallback traced {} paths", paths.len());
        paths
    }

    fn skeletonize(&self, roi: &GrayImage, budget: &Budget) -> GrayImage {
        let thinned = if runtime().optimized {
            zhang_suen(roi, self.params.max_thinning_iterations, budget)
        } else {
            Err(ThinningError::Disabled)
        };
        match thinned {
            Ok(skeleton) => skeleton,
            Err(err) => {
                log::debug!("{err}; using morphological skeleton");
                morphological_skeleton(roi, budget)
            }
        }
    }

    /// The largest contours of `mask`, simplified and moved back to
    /// full-frame coordinates.
    ///
    /// Every path is closed: its first point is repeated at the end, so the
    /// last edge of the outline is kept and a segment touching the outline's
    /// start extends it instead of doubling back.
    fn contour_paths(&self, mask: &GrayImage, offset: CropOffset, budget: &Budget) -> Vec<Vec<PixelPoint>> {
        let mut contours = find_contours(mask);
        contours.sort_by(|a, b| b.area().total_cmp(&a.area()));
        contours.truncate(self.params.max_contours);

        let (dx, dy) = (offset.x as i32, offset.y as i32);
        let mut out = Vec::with_capacity(contours.len());
        for contour in contours {
            if budget.is_exhausted() {
                break;
            }
            let eps = self.params.simplify_tolerance * contour.perimeter();
            let mut points = simplify_polygon(&contour.points, eps, true);
            if points.len() < 2 {
                continue;
            }
            points.push(points[0]);
            out.push(points.into_iter().map(|p| p.translated(dx, dy)).collect());
        }
        out
    }
}
