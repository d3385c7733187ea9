//! Anchor-dot detection and grid-size inference built on `kolam-core`.
//!
//! Detection runs two methods under one time budget:
//! 1. Method A: gradient circle accumulator swept over scales, minimal
//!    distances and sensitivities (`SweepPlan`); hits within 8 px of an
//!    accepted dot are dropped.
//! 2. Method B: round external contours of the Otsu mask, dropped within
//!    12 px of any accepted dot.
//!
//! The grid estimator clusters dot coordinates per axis and returns the larger
//! cluster count, clamped into `[3, 15]`.

mod blobs;
mod detector;
mod grid;
mod hough;
mod params;
mod sweep;

pub use blobs::{blob_candidates, circularity, BlobCandidate};
pub use detector::DotDetector;
pub use grid::{estimate_grid, estimate_grid_size, GridEstimate, CLUSTER_TOLERANCE_FACTOR};
pub use hough::{CircleAccumulator, CircleHit, EdgeField, Peak, ScaleLevel};
pub use params::{BlobParams, CircleSweepParams, DotDetectorParams};
pub use sweep::{SweepCandidate, SweepPlan};
