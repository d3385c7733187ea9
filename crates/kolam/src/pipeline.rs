use std::io::Cursor;
use std::time::Duration;

use image::{GrayImage, ImageFormat, RgbImage};
use kolam_core::{init_runtime, Budget, DotSet, GridSize, OrientedPath, PixelPoint};
use kolam_dots::{estimate_grid, DotDetector, GridEstimate};
use kolam_render::{Digitizer, RenderError, RenderedPattern};
use kolam_trace::SkeletonTracer;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::annotate::annotate;
use crate::error::KolamError;
use crate::params::KolamParams;
use crate::preprocess::{prepare_bytes, PreparedImage};

/// Everything learned from one input image.
///
/// All coordinates are in the working raster of [`PreparedImage`].
#[derive(Clone, Debug)]
pub struct KolamAnalysis {
    pub grid: GridEstimate,
    pub dots: DotSet,
    pub paths: Vec<OrientedPath>,
    /// Working color raster with dots and paths drawn on top.
    pub annotated: RgbImage,
    pub scale: f32,
    pub original_width: u32,
    pub original_height: u32,
    /// True when the stroke list came from the plain-threshold fallback.
    pub used_fallback: bool,
}

/// Serializable summary of a [`KolamAnalysis`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub grid_size: GridSize,
    pub rows: usize,
    pub cols: usize,
    pub spacing: f32,
    pub dots: Vec<PixelPoint>,
    pub paths: Vec<Vec<PixelPoint>>,
    pub width: u32,
    pub height: u32,
    pub scale: f32,
    pub original_width: u32,
    pub original_height: u32,
    pub used_fallback: bool,
}

impl KolamAnalysis {
    #[inline]
    pub fn grid_size(&self) -> GridSize {
        self.grid.size
    }

    pub fn report(&self) -> AnalysisReport {
        AnalysisReport {
            grid_size: self.grid.size,
            rows: self.grid.rows,
            cols: self.grid.cols,
            spacing: self.grid.spacing,
            dots: self.dots.centers(),
            paths: self.paths.iter().map(|p| p.points().to_vec()).collect(),
            width: self.annotated.width(),
            height: self.annotated.height(),
            scale: self.scale,
            original_width: self.original_width,
            original_height: self.original_height,
            used_fallback: self.used_fallback,
        }
    }

    pub fn annotated_png(&self) -> Result<Vec<u8>, KolamError> {
        let mut bytes = Vec::new();
        self.annotated
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(RenderError::Encode)?;
        Ok(bytes)
    }

    /// Re-render the strokes on a square grid of the estimated size.
    pub fn digitized(&self, digitizer: &Digitizer, theme: Option<&str>) -> Result<RenderedPattern, KolamError> {
        Ok(digitizer.digitize(&self.dots, &self.paths, self.grid.size.get(), theme)?)
    }

    /// Re-render the strokes on a caller-chosen `rows × cols` grid.
    pub fn custom_grid(
        &self,
        digitizer: &Digitizer,
        rows: u32,
        cols: u32,
        theme: Option<&str>,
    ) -> Result<RenderedPattern, KolamError> {
        if GridSize::new(rows).is_none() || GridSize::new(cols).is_none() {
            return Err(KolamError::InvalidGrid {
                rows,
                cols,
                min: GridSize::MIN,
                max: GridSize::MAX,
            });
        }
        Ok(digitizer.custom_grid(&self.dots, &self.paths, rows, cols, theme)?)
    }
}

/// End-to-end analysis: preprocess, detect dots, trace strokes, estimate the
/// grid.
///
/// The overall budget is advisory. Dot detection and tracing poll it and stop
/// early; grid estimation and rendering always run on whatever was found.
#[derive(Clone, Debug, Default)]
pub struct KolamPipeline {
    params: KolamParams,
}

impl KolamPipeline {
    /// Create a pipeline and install `params.runtime` as the process-wide
    /// runtime configuration (first caller wins).
    pub fn new(params: KolamParams) -> Self {
        let active = init_runtime(params.runtime);
        if active != params.runtime {
            log::warn!("runtime config already initialized as {active:?}; ignoring {:?}", params.runtime);
        }
        Self { params }
    }

    pub fn params(&self) -> &KolamParams {
        &self.params
    }

    pub fn digitizer(&self) -> Digitizer {
        Digitizer::new(self.params.digitize.clone())
    }

    pub fn analyze_bytes(&self, bytes: &[u8]) -> Result<KolamAnalysis, KolamError> {
        let prepared = prepare_bytes(bytes, &self.params.preprocess)?;
        Ok(self.analyze_prepared(&prepared))
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "info",
            skip(self, prepared),
            fields(width = prepared.gray.width(), height = prepared.gray.height())
        )
    )]
    pub fn analyze_prepared(&self, prepared: &PreparedImage) -> KolamAnalysis {
        let budget = Budget::start(Duration::from_secs_f32(self.params.budget_secs.max(0.0)));

        let dots = DotDetector::new(self.params.detector.clone()).detect_with_budget(&prepared.gray, &budget);
        let (paths, used_fallback) = self.trace(&prepared.gray, || prepared.plain_gray(), &budget);
        let grid = estimate_grid(&dots);

        log::info!(
            "found {} dots and {} paths, grid {} ({} rows x {} cols)",
            dots.len(),
            paths.len(),
            grid.size.get(),
            grid.rows,
            grid.cols
        );
        if budget.is_exhausted() {
            log::warn!(
                "analysis ran past its {:.0}s budget ({:.1}s)",
                budget.limit().as_secs_f32(),
                budget.elapsed().as_secs_f32()
            );
        }

        KolamAnalysis {
            annotated: annotate(&prepared.color, &dots, &paths),
            grid,
            dots,
            paths,
            scale: prepared.scale,
            original_width: prepared.original_width,
            original_height: prepared.original_height,
            used_fallback,
        }
    }

    fn trace(
        &self,
        enhanced: &GrayImage,
        plain: impl FnOnce() -> GrayImage,
        budget: &Budget,
    ) -> (Vec<OrientedPath>, bool) {
        if budget.is_exhausted() {
            log::warn!("no budget left for tracing");
            return (Vec::new(), false);
        }
        let tracer = SkeletonTracer::new(self.params.tracer.clone());
        let paths = tracer.trace_with_budget(enhanced, budget);
        if !paths.is_empty() || budget.is_exhausted() {
            return (paths, false);
        }
        log::debug!("skeleton tracer found nothing, trying threshold fallback");
        let paths = tracer.trace_fallback_with_budget(&plain(), budget);
        let used = !paths.is_empty();
        (paths, used)
    }
}

/// Analyze encoded image bytes with the given parameters.
pub fn analyze_bytes(bytes: &[u8], params: &KolamParams) -> Result<KolamAnalysis, KolamError> {
    KolamPipeline::new(params.clone()).analyze_bytes(bytes)
}

/// PNG of the strokes re-rendered on the estimated grid.
pub fn digitize(analysis: &KolamAnalysis, params: &KolamParams, theme: Option<&str>) -> Result<Vec<u8>, KolamError> {
    let digitizer = Digitizer::new(params.digitize.clone());
    Ok(analysis.digitized(&digitizer, theme)?.encode_png()?)
}

/// PNG of the strokes re-rendered on a `rows × cols` grid, both in `[3, 15]`.
pub fn custom_grid(
    analysis: &KolamAnalysis,
    params: &KolamParams,
    rows: u32,
    cols: u32,
    theme: Option<&str>,
) -> Result<Vec<u8>, KolamError> {
    let digitizer = Digitizer::new(params.digitize.clone());
    Ok(analysis.custom_grid(&digitizer, rows, cols, theme)?.encode_png()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb};
    use kolam_core::{DotSource, PixelPoint};

    fn analysis(dots: DotSet, paths: Vec<OrientedPath>) -> KolamAnalysis {
        KolamAnalysis {
            grid: estimate_grid(&dots),
            annotated: RgbImage::from_pixel(10, 10, Rgb([255, 255, 255])),
            dots,
            paths,
            scale: 1.0,
            original_width: 10,
            original_height: 10,
            used_fallback: false,
        }
    }

    #[test]
    fn custom_grid_rejects_out_of_range_sizes() {
        let a = analysis(DotSet::new(), Vec::new());
        let d = Digitizer::default();
        for (rows, cols) in [(2, 5), (5, 16), (0, 0)] {
            let err = a.custom_grid(&d, rows, cols, None).unwrap_err();
            assert!(matches!(err, KolamError::InvalidGrid { .. }), "{err}");
        }
        assert!(a.custom_grid(&d, 3, 15, None).is_ok());
    }

    #[test]
    fn report_mirrors_analysis() {
        let dots = DotSet::from_centers([PixelPoint::new(1, 2), PixelPoint::new(40, 2)]);
        let path = OrientedPath::new(vec![PixelPoint::new(0, 0), PixelPoint::new(3, 4)]).unwrap();
        let report = analysis(dots, vec![path]).report();
        assert_eq!(report.grid_size.get(), 3);
        assert_eq!(report.dots, vec![PixelPoint::new(1, 2), PixelPoint::new(40, 2)]);
        assert_eq!(report.paths, vec![vec![PixelPoint::new(0, 0), PixelPoint::new(3, 4)]]);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["dots"][1], serde_json::json!([40, 2]));
        assert_eq!(json["grid_size"], serde_json::json!(3));
    }

    #[test]
    fn exhausted_budget_still_estimates_grid() {
        let params = KolamParams {
            budget_secs: 0.0,
            ..KolamParams::default()
        };
        let gray = GrayImage::from_pixel(50, 50, Luma([255]));
        let prepared = PreparedImage {
            color: RgbImage::from_pixel(50, 50, Rgb([255, 255, 255])),
            gray,
            scale: 1.0,
            original_width: 50,
            original_height: 50,
        };
        let out = KolamPipeline::new(params).analyze_prepared(&prepared);
        assert!(out.dots.is_empty());
        assert!(out.paths.is_empty());
        assert_eq!(out.grid_size().get(), 3);
        assert_eq!(out.dots.by_source(DotSource::Blob).count(), 0);
    }
}
