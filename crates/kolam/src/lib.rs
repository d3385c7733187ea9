//! Reconstruct hand-drawn dot-grid drawings (kolam) from photographs.
//!
//! This crate ties the workspace together:
//! - re-exports of the stage crates (`core`, `dots`, `trace`, `render`)
//! - image preprocessing (`preprocess`)
//! - the end-to-end [`KolamPipeline`] producing a [`KolamAnalysis`]
//! - PNG helpers for the digitized and custom-grid renderings
//!
//! ## Quickstart
//!
//! ```no_run
//! use kolam::{analyze_bytes, digitize, KolamParams};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let bytes = std::fs::read("kolam.jpg")?;
//! let params = KolamParams::default();
//! let analysis = analyze_bytes(&bytes, &params)?;
//! println!("grid {} with {} dots", analysis.grid_size().get(), analysis.dots.len());
//! std::fs::write("digitized.png", digitize(&analysis, &params, Some("ocean"))?)?;
//! # Ok(())
//! # }
//! ```
//!
//! Coordinates in the analysis refer to the working raster, which is the
//! decoded input downscaled to at most 1000 px on its longer side.

pub use kolam_core as core;
pub use kolam_dots as dots;
pub use kolam_render as render;
pub use kolam_trace as trace;

mod annotate;
mod error;
mod params;
mod pipeline;
pub mod preprocess;

pub use annotate::{annotate, DOT_COLOR, PATH_COLOR};
pub use error::KolamError;
pub use kolam_core::{DotSet, GridSize, OrientedPath, PixelPoint, RuntimeConfig};
pub use kolam_render::{Theme, RenderedPattern};
pub use params::KolamParams;
pub use pipeline::{analyze_bytes, custom_grid, digitize, AnalysisReport, KolamAnalysis, KolamPipeline};
pub use preprocess::{PreparedImage, PreprocessParams};
