use std::time::Duration;

use image::GrayImage;
use kiddo::{KdTree, SquaredEuclidean};
use kolam_core::{Budget, Dot, DotSet, DotSource, PixelPoint};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::blobs::blob_candidates;
use crate::hough::ScaleLevel;
use crate::params::DotDetectorParams;
use crate::sweep::SweepPlan;

/// Accepted dots plus a spatial index for proximity checks.
struct DotAcceptor {
    dots: DotSet,
    tree: KdTree<f32, 2>,
    cap: usize,
}

impl DotAcceptor {
    fn new(cap: usize) -> Self {
        Self {
            dots: DotSet::new(),
            tree: KdTree::new(),
            cap,
        }
    }

    #[inline]
    fn is_full(&self) -> bool {
        self.dots.len() >= self.cap
    }

    /// Accept `dot` unless an accepted dot lies strictly closer than
    /// `separation`, or the cap is reached.
    fn try_accept(&mut self, dot: Dot, separation: f32) -> bool {
        if self.is_full() {
            return false;
        }
        let q = [dot.center.x as f32, dot.center.y as f32];
        if !self.dots.is_empty() {
            let nearest = self.tree.nearest_one::<SquaredEuclidean>(&q);
            if nearest.distance < separation * separation {
                return false;
            }
        }
        self.tree.add(&q, self.dots.len() as u64);
        self.dots.push(dot);
        true
    }
}

/// Two-method anchor-dot detector.
///
/// Method A sweeps a gradient circle accumulator over a grid of scales,
/// minimal distances and sensitivities. Method B then adds round external
/// contours of the Otsu mask that are not near any dot found so far. Both
/// share one wall-clock budget and one dot cap; running out of either is not
/// an error, the dots found so far are returned.
#[derive(Clone, Debug, Default)]
pub struct DotDetector {
    params: DotDetectorParams,
}

impl DotDetector {
    pub fn new(params: DotDetectorParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &DotDetectorParams {
        &self.params
    }

    /// Detect with a fresh budget of `params.budget_secs`.
    pub fn detect(&self, gray: &GrayImage) -> DotSet {
        let budget = Budget::from_secs_f32(self.params.budget_secs);
        self.detect_with_budget(gray, &budget)
    }

    /// Detect under `budget`, additionally capped by `params.budget_secs`.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, gray, budget), fields(width = gray.width(), height = gray.height()))
    )]
    pub fn detect_with_budget(&self, gray: &GrayImage, budget: &Budget) -> DotSet {
        let budget = budget.child(Duration::from_secs_f32(self.params.budget_secs.max(0.0)));
        let mut acc = DotAcceptor::new(self.params.max_dots);

        self.sweep_circles(gray, &budget, &mut acc);
        let from_circles = acc.dots.len();

        if !budget.is_exhausted() && !acc.is_full() {
            self.add_blobs(gray, &budget, &mut acc);
        }
        log::debug!(
            "dots: {} from circles, {} from blobs",
            from_circles,
            acc.dots.len() - from_circles
        );
        if budget.is_exhausted() {
            log::warn!(
                "dot detection stopped after {:.2}s budget with {} dots",
                budget.limit().as_secs_f32(),
                acc.dots.len()
            );
        }
        acc.dots
    }

    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip_all))]
    fn sweep_circles(&self, gray: &GrayImage, budget: &Budget, acc: &mut DotAcceptor) {
        let params = &self.params.circles;
        let plan = SweepPlan::new(params);
        let floor = plan.sensitivity_floor();
        let mut levels: Vec<Option<ScaleLevel>> = (0..params.scales.len()).map(|_| None).collect();

        for cand in plan {
            if budget.is_exhausted() || acc.is_full() {
                break;
            }
            let level = levels[cand.scale_index]
                .get_or_insert_with(|| ScaleLevel::build(gray, cand.scale, params, floor));
            if level.scale() <= 0.0 {
                continue;
            }
            let inv = 1.0 / level.scale();
            for hit in level.circles(cand.min_distance, cand.sensitivity) {
                let center = PixelPoint::new(
                    (hit.center.x * inv).round() as i32,
                    (hit.center.y * inv).round() as i32,
                );
                acc.try_accept(
                    Dot {
                        center,
                        radius: hit.radius * inv,
                        source: DotSource::Circle,
                    },
                    params.dedup_distance,
                );
                if acc.is_full() {
                    break;
                }
            }
        }
    }

    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip_all))]
    fn add_blobs(&self, gray: &GrayImage, budget: &Budget, acc: &mut DotAcceptor) {
        let params = &self.params.blobs;
        for blob in blob_candidates(gray, params) {
            if budget.is_exhausted() || acc.is_full() {
                break;
            }
            acc.try_accept(
                Dot {
                    center: blob.center,
                    radius: params.marker_radius,
                    source: DotSource::Blob,
                },
                params.dedup_distance,
            );
        }
    }
}
