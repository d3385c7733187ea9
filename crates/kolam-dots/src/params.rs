use serde::{Deserialize, Serialize};

/// Circle-accumulator sweep (Method A).
///
/// Every combination of `scales × min_distances × sensitivities` is tried, in
/// that nesting order.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CircleSweepParams {
    /// Resampling factors applied to the input before voting.
    pub scales: Vec<f32>,
    /// Minimal center separation within a single accumulator readout, in
    /// pixels of the rescaled image.
    pub min_distances: Vec<f32>,
    /// Accumulator vote thresholds.
    pub sensitivities: Vec<u32>,
    pub canny_low: f32,
    pub canny_high: f32,
    pub min_radius: u32,
    pub max_radius: u32,
    /// Edge pixels in the best two-pixel distance band must number at least
    /// this share of `2π·r`.
    pub min_ring_fraction: f32,
    /// Share of the 16 angular sectors around a peak that ring pixels must
    /// touch.
    pub min_arc_coverage: f32,
    /// Minimal absolute gray-level difference between the inner disc and the
    /// band just outside the ring.
    pub min_contrast: f32,
    /// A hit closer than this to an accepted dot is dropped.
    pub dedup_distance: f32,
}

impl Default for CircleSweepParams {
    fn default() -> Self {
        Self {
            scales: vec![0.8, 1.0, 1.2],
            min_distances: vec![10.0, 15.0, 20.0, 25.0],
            sensitivities: vec![10, 15, 20, 25, 30],
            canny_low: 15.0,
            canny_high: 30.0,
            min_radius: 2,
            max_radius: 40,
            min_ring_fraction: 0.5,
            min_arc_coverage: 0.75,
            min_contrast: 30.0,
            dedup_distance: 8.0,
        }
    }
}

/// Contour blob pass (Method B).
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BlobParams {
    /// Exclusive lower area bound, px².
    pub min_area: f64,
    /// Exclusive upper area bound, px².
    pub max_area: f64,
    /// `4π·area / perimeter²` must reach this.
    pub min_circularity: f64,
    pub dedup_distance: f32,
    /// Radius recorded for blob dots (annotation only).
    pub marker_radius: f32,
}

impl Default for BlobParams {
    fn default() -> Self {
        Self {
            min_area: 10.0,
            max_area: 800.0,
            min_circularity: 0.6,
            dedup_distance: 12.0,
            marker_radius: 4.0,
        }
    }
}

/// Parameters of the two-method dot detector.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DotDetectorParams {
    /// Wall-clock budget for both methods together, in seconds.
    pub budget_secs: f32,
    /// Hard cap on accepted dots.
    pub max_dots: usize,
    pub circles: CircleSweepParams,
    pub blobs: BlobParams,
}

impl Default for DotDetectorParams {
    fn default() -> Self {
        Self {
            budget_secs: 8.0,
            max_dots: 150,
            circles: CircleSweepParams::default(),
            blobs: BlobParams::default(),
        }
    }
}
