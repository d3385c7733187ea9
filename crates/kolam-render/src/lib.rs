//! Canonical re-rendering of traced dot-grid drawings.
//!
//! Traced paths live in detected-image pixels. [`Digitizer`] maps them onto a
//! 500×500 canvas whose synthetic anchor grid is inset by 50 px, draws them
//! in a [`Theme`], and returns the raster with the mapped geometry.

mod digitizer;
mod theme;

pub use digitizer::{
    map_point, DigitizeMode, DigitizeParams, Digitizer, RenderError, RenderedPattern, StrokeRule,
};
pub use theme::Theme;
