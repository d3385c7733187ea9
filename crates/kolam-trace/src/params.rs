use serde::{Deserialize, Serialize};

/// Endpoint merging.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StitchParams {
    /// Endpoints strictly closer than this are joined, in pixels.
    pub threshold: f32,
}

impl Default for StitchParams {
    fn default() -> Self {
        Self { threshold: 5.0 }
    }
}

/// Progressive probabilistic line-segment transform.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SegmentParams {
    /// Accumulator votes needed before a line is followed.
    pub threshold: u32,
    /// Shortest accepted segment, measured along its dominant axis.
    pub min_length: u32,
    /// Longest run of unset pixels bridged while following a line.
    pub max_gap: u32,
    /// Distance resolution in pixels.
    pub rho: f32,
    /// Angle resolution in degrees.
    pub theta_deg: f32,
    /// Seed of the pixel visiting order.
    pub seed: u64,
    /// Stop after this many segments.
    pub max_segments: usize,
}

impl Default for SegmentParams {
    fn default() -> Self {
        Self {
            threshold: 10,
            min_length: 5,
            max_gap: 2,
            rho: 1.0,
            theta_deg: 1.0,
            seed: 0x6b6f_6c61,
            max_segments: 4096,
        }
    }
}

/// Skeleton tracer configuration.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TracerParams {
    /// Wall-clock budget of one trace, in seconds.
    pub budget_secs: f32,
    /// Adaptive threshold window (odd).
    pub adaptive_block: u32,
    /// Constant subtracted from the local mean.
    pub adaptive_c: f32,
    /// Closing radius (3×3 square at `1`), `0` disables.
    pub close_radius: u8,
    /// Opening radius, `0` disables.
    pub open_radius: u8,
    /// Drop foreground pixels without any 8-neighbor.
    pub despeckle: bool,
    /// Padding around the foreground box before thinning.
    pub crop_pad: u32,
    /// Zhang-Suen passes before thinning is considered failed.
    pub max_thinning_iterations: usize,
    /// Contours kept after sorting by area.
    pub max_contours: usize,
    /// Polygon tolerance as a fraction of the contour perimeter.
    pub simplify_tolerance: f64,
    /// Segments run only while this share of the budget remains.
    pub segment_budget_fraction: f32,
    pub segments: SegmentParams,
    pub stitch: StitchParams,
}

impl Default for TracerParams {
    fn default() -> Self {
        Self {
            budget_secs: 20.0,
            adaptive_block: 11,
            adaptive_c: 2.0,
            close_radius: 1,
            open_radius: 0,
            despeckle: true,
            crop_pad: 8,
            max_thinning_iterations: 256,
            max_contours: 100,
            simplify_tolerance: 0.001,
            segment_budget_fraction: 0.2,
            segments: SegmentParams::default(),
            stitch: StitchParams::default(),
        }
    }
}
