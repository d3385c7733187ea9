use std::io::Cursor;

use image::{ImageFormat, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut, draw_polygon_mut};
use imageproc::point::Point;
use kolam_core::{BoundingBox, DotSet, GridSize, PixelPoint};
use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::theme::Theme;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to encode PNG: {0}")]
    Encode(#[from] image::ImageError),
    #[error("grid {rows}x{cols} outside [{min}, {max}] per side")]
    InvalidGrid { rows: u32, cols: u32, min: u32, max: u32 },
}

/// How traced coordinates are fitted onto the canonical grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DigitizeMode {
    /// Grid from the estimator; mapped points may leave the grid box.
    Digitized,
    /// Caller-chosen grid; mapped points are clamped into the grid box and
    /// strokes get round joins.
    CustomGrid,
}

/// Integer stroke width `clamp(numerator / (rows·cols), min, max)`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StrokeRule {
    pub numerator: u32,
    pub min: u32,
    pub max: u32,
}

impl StrokeRule {
    pub fn width(&self, rows: u32, cols: u32) -> u32 {
        let cells = rows.saturating_mul(cols).max(1);
        (self.numerator / cells).clamp(self.min, self.max)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DigitizeParams {
    /// Side of the square output canvas.
    pub canvas_size: u32,
    /// Inset of the anchor grid from every canvas edge.
    pub padding: f32,
    pub digitized_stroke: StrokeRule,
    pub custom_stroke: StrokeRule,
}

impl Default for DigitizeParams {
    fn default() -> Self {
        Self {
            canvas_size: 500,
            padding: 50.0,
            digitized_stroke: StrokeRule {
                numerator: 200,
                min: 1,
                max: 3,
            },
            custom_stroke: StrokeRule {
                numerator: 400,
                min: 2,
                max: 4,
            },
        }
    }
}

/// A canonical rendering and the geometry behind it.
#[derive(Clone, Debug)]
pub struct RenderedPattern {
    pub image: RgbImage,
    /// Every drawn path in canvas coordinates.
    pub mapped_paths: Vec<Vec<Point2<f32>>>,
    /// Synthetic anchors, row-major; they bound the drawing but are not drawn.
    pub anchors: Vec<Point2<f32>>,
    pub destination: BoundingBox,
    pub stroke_width: u32,
    pub theme: Theme,
    pub mode: DigitizeMode,
}

impl RenderedPattern {
    pub fn encode_png(&self) -> Result<Vec<u8>, RenderError> {
        let mut bytes = Vec::new();
        self.image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(bytes)
    }
}

/// Re-renders traced strokes on an evenly spaced synthetic dot grid.
///
/// Points are normalized against the bounding box of the detected dots and
/// stretched onto the bounding box of the synthetic anchors. An axis along
/// which the detected dots have no extent (or no dots at all) maps to the
/// middle of the grid.
#[derive(Clone, Debug, Default)]
pub struct Digitizer {
    params: DigitizeParams,
}

impl Digitizer {
    pub fn new(params: DigitizeParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &DigitizeParams {
        &self.params
    }

    /// `rows × cols` anchors, row-major, inset by the padding. A single
    /// row or column sits on the padding line.
    pub fn anchor_grid(&self, rows: u32, cols: u32) -> Vec<Point2<f32>> {
        let span = self.params.canvas_size as f32 - 2.0 * self.params.padding;
        let step = |n: u32| if n > 1 { span / (n - 1) as f32 } else { 0.0 };
        let (sx, sy) = (step(cols), step(rows));
        (0..rows)
            .flat_map(|r| {
                (0..cols).map(move |c| {
                    Point2::new(
                        self.params.padding + c as f32 * sx,
                        self.params.padding + r as f32 * sy,
                    )
                })
            })
            .collect()
    }

    /// Digitized mode: square grid of `grid` anchors per side.
    pub fn digitize<P: AsRef<[PixelPoint]>>(
        &self,
        dots: &DotSet,
        paths: &[P],
        grid: u32,
        theme: Option<&str>,
    ) -> Result<RenderedPattern, RenderError> {
        self.render(dots, paths, grid, grid, DigitizeMode::Digitized, theme)
    }

    /// Custom-grid mode: `rows × cols` anchors, strokes clamped into the grid.
    pub fn custom_grid<P: AsRef<[PixelPoint]>>(
        &self,
        dots: &DotSet,
        paths: &[P],
        rows: u32,
        cols: u32,
        theme: Option<&str>,
    ) -> Result<RenderedPattern, RenderError> {
        self.render(dots, paths, rows, cols, DigitizeMode::CustomGrid, theme)
    }

    /// Render on a `rows × cols` anchor grid; both sides must lie within
    /// `[GridSize::MIN, GridSize::MAX]`.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, dots, paths, theme), fields(paths = paths.len()))
    )]
    pub fn render<P: AsRef<[PixelPoint]>>(
        &self,
        dots: &DotSet,
        paths: &[P],
        rows: u32,
        cols: u32,
        mode: DigitizeMode,
        theme: Option<&str>,
    ) -> Result<RenderedPattern, RenderError> {
        if GridSize::new(rows).is_none() || GridSize::new(cols).is_none() {
            return Err(RenderError::InvalidGrid {
                rows,
                cols,
                min: GridSize::MIN,
                max: GridSize::MAX,
            });
        }
        let theme = Theme::by_name(theme);
        let size = self.params.canvas_size;
        let mut image = RgbImage::from_pixel(size, size, theme.background_rgb());

        let anchors = self.anchor_grid(rows, cols);
        let destination = BoundingBox::from_points(anchors.iter().copied()).unwrap_or(BoundingBox {
            min: Point2::new(self.params.padding, self.params.padding),
            max: Point2::new(self.params.padding, self.params.padding),
        });
        let stroke_width = match mode {
            DigitizeMode::Digitized => self.params.digitized_stroke.width(rows, cols),
            DigitizeMode::CustomGrid => self.params.custom_stroke.width(rows, cols),
        };

        let source = dots.bounds();
        let mapped_paths: Vec<Vec<Point2<f32>>> = paths
            .iter()
            .map(AsRef::as_ref)
            .filter(|p| p.len() >= 2)
            .map(|p| {
                p.iter()
                    .map(|&q| {
                        let m = map_point(q, source.as_ref(), &destination);
                        match mode {
                            DigitizeMode::Digitized => m,
                            DigitizeMode::CustomGrid => destination.clamp(m),
                        }
                    })
                    .collect()
            })
            .collect();

        let color = theme.stroke_rgb();
        let round_joins = mode == DigitizeMode::CustomGrid;
        for path in &mapped_paths {
            draw_polyline(&mut image, path, stroke_width, color, round_joins);
        }
        log::debug!(
            "rendered {} paths on a {rows}×{cols} grid ({mode:?}, width {stroke_width}, theme {})",
            mapped_paths.len(),
            theme.name
        );

        Ok(RenderedPattern {
            image,
            mapped_paths,
            anchors,
            destination,
            stroke_width,
            theme,
            mode,
        })
    }
}

/// Normalize `p` into `[0, 1]` per axis against `source` and stretch it onto
/// `dest`. A missing source box or a zero-extent axis normalizes to `0.5`.
pub fn map_point(p: PixelPoint, source: Option<&BoundingBox>, dest: &BoundingBox) -> Point2<f32> {
    let norm = |v: f32, lo: Option<f32>, extent: Option<f32>| match (lo, extent) {
        (Some(lo), Some(e)) if e > 0.0 => (v - lo) / e,
        _ => 0.5,
    };
    let nx = norm(p.x as f32, source.map(|s| s.min.x), source.map(BoundingBox::width));
    let ny = norm(p.y as f32, source.map(|s| s.min.y), source.map(BoundingBox::height));
    Point2::new(dest.min.x + nx * dest.width(), dest.min.y + ny * dest.height())
}

fn draw_polyline(img: &mut RgbImage, path: &[Point2<f32>], width: u32, color: Rgb<u8>, round_joins: bool) {
    for seg in path.windows(2) {
        draw_thick_segment(img, seg[0], seg[1], width, color);
    }
    if round_joins && width > 1 {
        let r = (width as f32 * 0.5).round() as i32;
        for p in path {
            draw_filled_circle_mut(img, (p.x.round() as i32, p.y.round() as i32), r, color);
        }
    }
}

fn draw_thick_segment(img: &mut RgbImage, a: Point2<f32>, b: Point2<f32>, width: u32, color: Rgb<u8>) {
    let d: Vector2<f32> = b - a;
    let len = d.norm();
    if width <= 1 || len < 1e-3 {
        draw_line_segment_mut(img, (a.x, a.y), (b.x, b.y), color);
        return;
    }
    let n = Vector2::new(-d.y, d.x) * (width as f32 * 0.5 / len);
    let corners = [a + n, b + n, b - n, a - n].map(|c| Point::new(c.x.round() as i32, c.y.round() as i32));
    if corners[0] == corners[3] || corners[1] == corners[2] {
        draw_line_segment_mut(img, (a.x, a.y), (b.x, b.y), color);
        return;
    }
    draw_polygon_mut(img, &corners, color);
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn pts(raw: &[(i32, i32)]) -> Vec<PixelPoint> {
        raw.iter().copied().map(PixelPoint::from).collect()
    }

    fn square_dots() -> DotSet {
        DotSet::from_centers(pts(&[(100, 100), (300, 100), (100, 300), (300, 300)]))
    }

    #[test]
    fn anchor_grid_spans_padding_box() {
        let d = Digitizer::default();
        let grid = d.anchor_grid(5, 5);
        assert_eq!(grid.len(), 25);
        assert_eq!(grid[0], Point2::new(50.0, 50.0));
        assert_eq!(grid[24], Point2::new(450.0, 450.0));
        assert_relative_eq!(grid[1].x, 150.0);
        let line = d.anchor_grid(1, 3);
        assert!(line.iter().all(|p| p.y == 50.0));
    }

    #[test]
    fn stroke_widths_follow_grid_size() {
        let p = DigitizeParams::default();
        assert_eq!(p.digitized_stroke.width(3, 3), 3);
        assert_eq!(p.digitized_stroke.width(9, 9), 2);
        assert_eq!(p.digitized_stroke.width(15, 15), 1);
        assert_eq!(p.custom_stroke.width(3, 3), 4);
        assert_eq!(p.custom_stroke.width(10, 10), 4);
        assert_eq!(p.custom_stroke.width(15, 15), 2);
    }

    #[test]
    fn dot_box_maps_onto_anchor_box() {
        let paths = vec![pts(&[(100, 100), (300, 300), (200, 100)])];
        let out = Digitizer::default().digitize(&square_dots(), &paths, 5, None).unwrap();
        let p = &out.mapped_paths[0];
        assert_eq!(p[0], Point2::new(50.0, 50.0));
        assert_eq!(p[1], Point2::new(450.0, 450.0));
        assert_eq!(p[2], Point2::new(250.0, 50.0));
        assert_eq!(*out.image.get_pixel(250, 250), Rgb([0, 0, 0]));
    }

    #[test]
    fn digitized_mode_does_not_clamp() {
        let paths = vec![pts(&[(0, 200), (400, 200)])];
        let out = Digitizer::default().digitize(&square_dots(), &paths, 5, None).unwrap();
        assert!(out.mapped_paths[0][0].x < 50.0);
        assert!(out.mapped_paths[0][1].x > 450.0);
    }

    #[test]
    fn custom_mode_stays_inside_grid_box() {
        let paths = vec![
            pts(&[(-500, -500), (2000, 40), (150, 9000)]),
            pts(&[(0, 0), (1, 1)]),
        ];
        let out = Digitizer::default().custom_grid(&square_dots(), &paths, 4, 7, Some("forest")).unwrap();
        for p in out.mapped_paths.iter().flatten() {
            assert!(out.destination.contains(*p), "{p:?}");
        }
        assert_eq!(out.stroke_width, 4);
        assert_eq!(out.theme, Theme::FOREST);
    }

    #[test]
    fn coincident_dots_map_to_center() {
        let dots = DotSet::from_centers(pts(&[(70, 70), (70, 70)]));
        let paths = vec![pts(&[(0, 0), (500, 900)])];
        let out = Digitizer::default().digitize(&dots, &paths, 3, None).unwrap();
        for p in &out.mapped_paths[0] {
            assert_eq!(*p, Point2::new(250.0, 250.0));
        }
    }

    #[test]
    fn no_dots_maps_to_center() {
        let paths = vec![pts(&[(3, 4), (10, 20)])];
        let out = Digitizer::default().digitize(&DotSet::new(), &paths, 3, None).unwrap();
        assert!(out.mapped_paths[0].iter().all(|p| *p == Point2::new(250.0, 250.0)));
    }

    #[test]
    fn one_flat_axis_keeps_the_other() {
        let dots = DotSet::from_centers(pts(&[(100, 50), (300, 50)]));
        let paths = vec![pts(&[(100, 10), (300, 90)])];
        let out = Digitizer::default().digitize(&dots, &paths, 3, None).unwrap();
        assert_eq!(out.mapped_paths[0][0], Point2::new(50.0, 250.0));
        assert_eq!(out.mapped_paths[0][1], Point2::new(450.0, 250.0));
    }

    #[test]
    fn empty_paths_give_blank_canvas() {
        let paths: Vec<Vec<PixelPoint>> = Vec::new();
        let out = Digitizer::default().digitize(&square_dots(), &paths, 5, Some("ocean")).unwrap();
        assert!(out.mapped_paths.is_empty());
        assert_eq!(out.image.dimensions(), (500, 500));
        assert!(out.image.pixels().all(|p| *p == Rgb([0xe3, 0xf2, 0xfd])));
    }

    #[test]
    fn png_round_trip_keeps_size() {
        let paths = vec![pts(&[(100, 100), (300, 300)])];
        let out = Digitizer::default().digitize(&square_dots(), &paths, 3, Some("sunset")).unwrap();
        let png = out.encode_png().unwrap();
        let back = image::load_from_memory(&png).unwrap();
        assert_eq!((back.width(), back.height()), (500, 500));
    }

    #[test]
    fn render_rejects_degenerate_grids() {
        let paths = vec![pts(&[(100, 100), (300, 300)])];
        let d = Digitizer::default();
        for (rows, cols) in [(0, 5), (5, 0), (2, 2), (16, 3), (u32::MAX, u32::MAX)] {
            let err = d
                .render(&square_dots(), &paths, rows, cols, DigitizeMode::CustomGrid, None)
                .unwrap_err();
            assert!(matches!(err, RenderError::InvalidGrid { .. }), "{err}");
        }
    }

    #[test]
    fn stroke_width_saturates_on_huge_grids() {
        let rule = DigitizeParams::default().custom_stroke;
        assert_eq!(rule.width(u32::MAX, u32::MAX), 2);
        assert_eq!(rule.width(0, 0), 4);
    }

    #[test]
    fn params_accept_partial_json() {
        let p: DigitizeParams =
            serde_json::from_str(r#"{"canvas_size": 320, "custom_stroke": {"numerator": 90, "min": 1, "max": 2}}"#)
                .unwrap();
        assert_eq!(p.canvas_size, 320);
        assert_relative_eq!(p.padding, 50.0);
        assert_eq!(p.custom_stroke.width(3, 3), 2);
        assert_eq!(p.digitized_stroke, DigitizeParams::default().digitized_stroke);
        let mode: DigitizeMode = serde_json::from_str(r#""custom_grid""#).unwrap();
        assert_eq!(mode, DigitizeMode::CustomGrid);
    }
}
