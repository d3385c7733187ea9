//! Stroke tracing for dot-grid drawings.
//!
//! Pipeline of [`SkeletonTracer::trace`]:
//! 1. Union of Otsu and adaptive masks, inverted so strokes are foreground.
//! 2. Close, then clean isolated noise.
//! 3. Crop to the padded foreground box.
//! 4. Zhang-Suen thinning, or an erosion skeleton when thinning is disabled
//!    or fails.
//! 5. Largest skeleton contours, simplified to polygons.
//! 6. Straight segments from a progressive probabilistic Hough transform,
//!    when enough of the budget is left.
//! 7. Endpoint stitching ([`stitch_paths`]).

mod binarize;
mod params;
mod segments;
mod stitch;
mod thinning;
mod tracer;

pub use binarize::{clean_mask, despeckle, has_contrast, otsu_stroke_mask, stroke_mask};
pub use params::{SegmentParams, StitchParams, TracerParams};
pub use segments::{detect_segments, LineSegment};
pub use stitch::{restitch, stitch_paths};
pub use thinning::{morphological_skeleton, zhang_suen, ThinningError};
pub use tracer::SkeletonTracer;
