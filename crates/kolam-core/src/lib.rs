//! Core types and utilities for dot-grid pattern reconstruction.
//!
//! This crate is intentionally small. It holds the value types shared by the
//! detector, tracer and renderer crates (pixel points, dot sets, oriented
//! paths), the cooperative time budget, binary raster helpers and the
//! process-wide runtime configuration.

mod budget;
mod contour;
mod geometry;
mod logger;
mod mask;
mod path;
mod runtime;
mod threshold;

pub use budget::Budget;
pub use contour::{
    find_contours, polygon_area, polygon_centroid, polygon_perimeter, simplify_polygon, Contour,
};
pub use geometry::{BoundingBox, Dot, DotSet, DotSource, GridSize, PixelPoint};
pub use mask::{crop_padded, foreground_bbox, invert, union, CropOffset, ForegroundBox};
pub use path::{OrientedPath, PathEnd, Splice};
pub use runtime::{init_runtime, runtime, RuntimeConfig};
pub use threshold::{adaptive_threshold_gaussian, otsu_level, threshold_binary};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_from_env, init_with_level, LOG_ENV};
