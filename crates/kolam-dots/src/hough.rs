//! Gradient circle accumulator.
//!
//! Every Canny edge pixel votes along both directions of its gradient for
//! each integer radius in `[min_radius, max_radius]`. Filled dots produce a
//! peak at their center because their boundary gradients converge radially.
//!
//! Votes from several neighbouring dots also meet between them, so a peak
//! only becomes a circle when its ring is actually there: edge pixels at a
//! common distance must number a fixed share of the circumference and cover
//! most directions around the peak, and the disc inside the ring must differ
//! in brightness from the band just outside it.

use std::f32::consts::{PI, TAU};

use image::GrayImage;
use imageproc::edges::canny;
use imageproc::gradients::{horizontal_sobel, vertical_sobel};
use nalgebra::Point2;

use crate::params::CircleSweepParams;

#[derive(Clone, Copy, Debug)]
struct EdgePixel {
    x: i32,
    y: i32,
    dx: f32,
    dy: f32,
}

/// Canny edges with unit gradient directions, bucketed by row.
#[derive(Clone, Debug)]
pub struct EdgeField {
    width: u32,
    height: u32,
    pixels: Vec<EdgePixel>,
    row_start: Vec<usize>,
}

impl EdgeField {
    pub fn compute(img: &GrayImage, low: f32, high: f32) -> Self {
        let (w, h) = img.dimensions();
        let edges = canny(img, low, high);
        let gx = horizontal_sobel(img);
        let gy = vertical_sobel(img);

        let mut pixels = Vec::new();
        let mut row_start = Vec::with_capacity(h as usize + 1);
        for y in 0..h {
            row_start.push(pixels.len());
            for x in 0..w {
                if edges.get_pixel(x, y)[0] == 0 {
                    continue;
                }
                let gxv = gx.get_pixel(x, y)[0] as f32;
                let gyv = gy.get_pixel(x, y)[0] as f32;
                let mag = (gxv * gxv + gyv * gyv).sqrt();
                if mag < 1e-6 {
                    continue;
                }
                pixels.push(EdgePixel {
                    x: x as i32,
                    y: y as i32,
                    dx: gxv / mag,
                    dy: gyv / mag,
                });
            }
        }
        row_start.push(pixels.len());

        Self {
            width: w,
            height: h,
            pixels,
            row_start,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Edge pixels with `y0 <= y <= y1`, clipped to the frame.
    fn rows(&self, y0: i32, y1: i32) -> &[EdgePixel] {
        let h = self.height as i32;
        let y0 = y0.clamp(0, h);
        let y1 = (y1 + 1).clamp(0, h);
        if y0 >= y1 {
            return &[];
        }
        &self.pixels[self.row_start[y0 as usize]..self.row_start[y1 as usize]]
    }
}

/// Local maximum of the accumulator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Peak {
    pub x: i32,
    pub y: i32,
    pub votes: u32,
    /// Vote-weighted centroid of the 3×3 neighborhood.
    pub center: Point2<f32>,
}

/// Integer vote grid with the same size as the voting image.
#[derive(Clone, Debug)]
pub struct CircleAccumulator {
    width: u32,
    height: u32,
    votes: Vec<u32>,
}

impl CircleAccumulator {
    pub fn vote(field: &EdgeField, min_radius: u32, max_radius: u32) -> Self {
        let (w, h) = (field.width as i32, field.height as i32);
        let mut votes = vec![0u32; field.width as usize * field.height as usize];

        for e in &field.pixels {
            for sign in [1.0f32, -1.0] {
                for r in min_radius..=max_radius {
                    let r = r as f32 * sign;
                    let cx = (e.x as f32 + e.dx * r).round() as i32;
                    let cy = (e.y as f32 + e.dy * r).round() as i32;
                    if cx < 0 || cy < 0 || cx >= w || cy >= h {
                        break;
                    }
                    votes[(cy * w + cx) as usize] += 1;
                }
            }
        }

        Self {
            width: field.width,
            height: field.height,
            votes,
        }
    }

    #[inline]
    pub fn get(&self, x: i32, y: i32) -> u32 {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return 0;
        }
        self.votes[(y * self.width as i32 + x) as usize]
    }

    /// Local maxima with more than `floor` votes, strongest first.
    ///
    /// A cell must beat its left and upper neighbors and at least tie its
    /// right and lower ones, so plateaus yield a single peak.
    pub fn peaks(&self, floor: u32) -> Vec<Peak> {
        let mut out = Vec::new();
        for y in 0..self.height as i32 {
            for x in 0..self.width as i32 {
                let v = self.get(x, y);
                if v <= floor {
                    continue;
                }
                if v > self.get(x - 1, y)
                    && v >= self.get(x + 1, y)
                    && v > self.get(x, y - 1)
                    && v >= self.get(x, y + 1)
                {
                    out.push(Peak {
                        x,
                        y,
                        votes: v,
                        center: self.refine(x, y),
                    });
                }
            }
        }
        // Stable sort keeps raster order among equal votes.
        out.sort_by(|a, b| b.votes.cmp(&a.votes));
        out
    }

    fn refine(&self, x: i32, y: i32) -> Point2<f32> {
        let mut sw = 0.0f32;
        let mut sx = 0.0f32;
        let mut sy = 0.0f32;
        for dy in -1..=1 {
            for dx in -1..=1 {
                let v = self.get(x + dx, y + dy) as f32;
                sw += v;
                sx += v * (x + dx) as f32;
                sy += v * (y + dy) as f32;
            }
        }
        if sw <= 0.0 {
            return Point2::new(x as f32, y as f32);
        }
        Point2::new(sx / sw, sy / sw)
    }
}

/// One circle read out of an accumulator, in the coordinates of the image
/// that was voted on.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CircleHit {
    pub center: Point2<f32>,
    pub radius: f32,
    pub votes: u32,
}

/// Angular sectors used to measure how much of a ring is present.
const RING_SECTORS: u32 = 16;

#[derive(Clone, Copy, Debug, PartialEq)]
struct RadiusSupport {
    count: u32,
    radius: f32,
}

/// Acceptance thresholds for a ring around a peak.
#[derive(Clone, Copy, Debug)]
struct RingRules {
    min_fraction: f32,
    min_coverage: f32,
    min_contrast: f32,
}

/// Per-scale state shared by all sweep candidates at that scale.
#[derive(Debug)]
pub struct ScaleLevel {
    scale: f32,
    gray: GrayImage,
    field: EdgeField,
    peaks: Vec<Peak>,
    /// Lazily evaluated ring support per peak; `Some(None)` marks a rejected peak.
    support: Vec<Option<Option<RadiusSupport>>>,
    min_radius: u32,
    max_radius: u32,
    rules: RingRules,
}

impl ScaleLevel {
    /// Edge map, accumulator and peak list for `gray` resampled by `scale`.
    ///
    /// Only peaks above `floor` votes are kept.
    pub fn build(gray: &GrayImage, scale: f32, params: &CircleSweepParams, floor: u32) -> Self {
        let gray = if (scale - 1.0).abs() < f32::EPSILON {
            gray.clone()
        } else {
            let w = ((gray.width() as f32 * scale).round() as u32).max(1);
            let h = ((gray.height() as f32 * scale).round() as u32).max(1);
            image::imageops::resize(gray, w, h, image::imageops::FilterType::Triangle)
        };
        let field = EdgeField::compute(&gray, params.canny_low, params.canny_high);
        let min_radius = params.min_radius.min(params.max_radius);
        let max_radius = params.max_radius;
        let peaks = if field.is_empty() {
            Vec::new()
        } else {
            CircleAccumulator::vote(&field, min_radius, max_radius).peaks(floor)
        };
        log::debug!(
            "scale {scale:.2}: {} edge pixels, {} peaks above {floor}",
            field.len(),
            peaks.len()
        );
        let support = vec![None; peaks.len()];
        Self {
            scale,
            gray,
            field,
            peaks,
            support,
            min_radius,
            max_radius,
            rules: RingRules {
                min_fraction: params.min_ring_fraction,
                min_coverage: params.min_arc_coverage,
                min_contrast: params.min_contrast,
            },
        }
    }

    #[inline]
    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn peaks(&self) -> &[Peak] {
        &self.peaks
    }

    /// Circles with more than `sensitivity` votes and more than `sensitivity`
    /// supporting ring pixels, no two closer than `min_distance`, strongest
    /// first.
    pub fn circles(&mut self, min_distance: f32, sensitivity: u32) -> Vec<CircleHit> {
        let min_dist_sq = min_distance * min_distance;
        let mut hits: Vec<CircleHit> = Vec::new();
        for i in 0..self.peaks.len() {
            let peak = self.peaks[i];
            if peak.votes <= sensitivity {
                break;
            }
            let crowded = hits.iter().any(|h| {
                let dx = h.center.x - peak.center.x;
                let dy = h.center.y - peak.center.y;
                dx * dx + dy * dy < min_dist_sq
            });
            if crowded {
                continue;
            }
            let support = match self.support[i] {
                Some(s) => s,
                None => {
                    let s = self.radius_support(&peak);
                    self.support[i] = Some(s);
                    s
                }
            };
            let Some(support) = support else {
                continue;
            };
            if support.count <= sensitivity {
                continue;
            }
            hits.push(CircleHit {
                center: peak.center,
                radius: support.radius,
                votes: peak.votes,
            });
        }
        hits
    }

    /// Most populated two-pixel distance band of edge pixels around `peak`
    /// that forms a plausible ring, or `None` when no band does.
    fn radius_support(&self, peak: &Peak) -> Option<RadiusSupport> {
        let r_min = self.min_radius as i32;
        let r_max = self.max_radius as i32;
        let bins = (r_max - r_min + 1).max(1) as usize;
        let mut hist = vec![0u32; bins];
        let mut sectors = vec![0u32; bins];

        for e in self.field.rows(peak.y - r_max - 1, peak.y + r_max + 1) {
            let dx = (e.x - peak.x) as f32;
            if dx.abs() > (r_max + 1) as f32 {
                continue;
            }
            let dy = (e.y - peak.y) as f32;
            let d = (dx * dx + dy * dy).sqrt();
            let b = d.floor() as i32 - r_min;
            if b < 0 || b as usize >= bins {
                continue;
            }
            hist[b as usize] += 1;
            sectors[b as usize] |= 1 << sector_of(dx, dy);
        }

        let min_sectors = (self.rules.min_coverage * RING_SECTORS as f32).ceil() as u32;
        let mut best: Option<RadiusSupport> = None;
        for b in 0..bins {
            let count = hist[b] + hist.get(b + 1).copied().unwrap_or(0);
            let covered = sectors[b] | sectors.get(b + 1).copied().unwrap_or(0);
            let radius = (r_min + b as i32) as f32 + 1.0;
            if (count as f32) < self.rules.min_fraction * TAU * radius
                || covered.count_ones() < min_sectors
            {
                continue;
            }
            if best.is_none_or(|s| count > s.count) {
                best = Some(RadiusSupport { count, radius });
            }
        }

        let best = best?;
        let contrast = ring_contrast(&self.gray, peak.x, peak.y, best.radius);
        if contrast < self.rules.min_contrast {
            log::trace!(
                "peak ({}, {}) r={:.1}: contrast {contrast:.1} too low",
                peak.x,
                peak.y,
                best.radius
            );
            return None;
        }
        Some(best)
    }
}

#[inline]
fn sector_of(dx: f32, dy: f32) -> u32 {
    let t = (dy.atan2(dx) + PI) / TAU;
    ((t * RING_SECTORS as f32) as u32).min(RING_SECTORS - 1)
}

/// Absolute difference between the mean intensity of the inner half of a
/// circle of `radius` around `(cx, cy)` and that of the band two to four
/// pixels outside it. Zero when either region falls entirely off the image.
fn ring_contrast(gray: &GrayImage, cx: i32, cy: i32, radius: f32) -> f32 {
    let inner = (radius * 0.5).max(1.0);
    let (lo, hi) = (radius + 2.0, radius + 4.0);
    let reach = hi.ceil() as i32;
    let (w, h) = (gray.width() as i32, gray.height() as i32);

    let (mut in_sum, mut in_n, mut out_sum, mut out_n) = (0u64, 0u32, 0u64, 0u32);
    for y in (cy - reach).max(0)..=(cy + reach).min(h - 1) {
        for x in (cx - reach).max(0)..=(cx + reach).min(w - 1) {
            let (dx, dy) = ((x - cx) as f32, (y - cy) as f32);
            let d = (dx * dx + dy * dy).sqrt();
            let v = gray.get_pixel(x as u32, y as u32)[0] as u64;
            if d <= inner {
                in_sum += v;
                in_n += 1;
            } else if (lo..=hi).contains(&d) {
                out_sum += v;
                out_n += 1;
            }
        }
    }
    if in_n == 0 || out_n == 0 {
        return 0.0;
    }
    (in_sum as f32 / in_n as f32 - out_sum as f32 / out_n as f32).abs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use image::Luma;
    use imageproc::drawing::draw_filled_circle_mut;

    fn dot_image(w: u32, h: u32, centers: &[(i32, i32)], r: i32) -> GrayImage {
        let mut img = GrayImage::from_pixel(w, h, Luma([255]));
        for &c in centers {
            draw_filled_circle_mut(&mut img, c, r, Luma([0]));
        }
        img
    }

    #[test]
    fn flat_image_has_no_edges() {
        let img = GrayImage::from_pixel(64, 64, Luma([200]));
        let field = EdgeField::compute(&img, 15.0, 30.0);
        assert!(field.is_empty());
    }

    #[test]
    fn accumulator_peaks_at_dot_center() {
        let img = dot_image(80, 80, &[(40, 36)], 8);
        let field = EdgeField::compute(&img, 15.0, 30.0);
        assert!(!field.is_empty());
        let acc = CircleAccumulator::vote(&field, 2, 40);
        let peaks = acc.peaks(5);
        assert!(!peaks.is_empty());
        let best = peaks[0];
        assert!((best.center.x - 40.0).abs() <= 1.5, "{best:?}");
        assert!((best.center.y - 36.0).abs() <= 1.5, "{best:?}");
    }

    #[test]
    fn readout_recovers_radius_and_respects_min_distance() {
        let params = CircleSweepParams::default();
        let img = dot_image(120, 60, &[(30, 30), (90, 30)], 7);
        let mut level = ScaleLevel::build(&img, 1.0, &params, 10);
        let hits = level.circles(10.0, 10);
        assert_eq!(hits.len(), 2, "{hits:?}");
        for h in &hits {
            assert_abs_diff_eq!(h.radius, 7.0, epsilon = 2.0);
        }
        let far = level.circles(100.0, 10);
        assert_eq!(far.len(), 1);
    }

    #[test]
    fn rescaled_level_reports_scaled_coordinates() {
        let params = CircleSweepParams::default();
        let img = dot_image(100, 100, &[(50, 50)], 8);
        let mut level = ScaleLevel::build(&img, 1.2, &params, 10);
        let hits = level.circles(10.0, 10);
        assert!(!hits.is_empty());
        assert!((hits[0].center.x / level.scale() - 50.0).abs() <= 2.0);
    }

    fn five_by_five() -> (GrayImage, Vec<(i32, i32)>) {
        let centers: Vec<_> = (0..5)
            .flat_map(|j| (0..5).map(move |i| (25 + 50 * i, 25 + 50 * j)))
            .collect();
        (dot_image(300, 300, &centers, 6), centers)
    }

    fn peak_at(x: i32, y: i32) -> Peak {
        Peak {
            x,
            y,
            votes: u32::MAX,
            center: Point2::new(x as f32, y as f32),
        }
    }

    #[test]
    fn gaps_between_grid_dots_have_no_ring() {
        let (img, _) = five_by_five();
        let level = ScaleLevel::build(&img, 1.0, &CircleSweepParams::default(), 10);
        for (x, y) in [(44, 44), (94, 44), (55, 55), (50, 50), (50, 25), (194, 194)] {
            assert_eq!(level.radius_support(&peak_at(x, y)), None, "({x}, {y})");
        }
        let real = level.radius_support(&peak_at(75, 75)).expect("ring at a dot");
        assert_abs_diff_eq!(real.radius, 6.5, epsilon = 1.5);
    }

    #[test]
    fn every_scale_reads_out_only_real_dots() {
        let (img, centers) = five_by_five();
        let params = CircleSweepParams::default();
        for &scale in &params.scales {
            let mut level = ScaleLevel::build(&img, scale, &params, 10);
            let hits = level.circles(10.0, 10);
            assert!(hits.len() <= 25, "scale {scale}: {hits:?}");
            if scale == 1.0 {
                assert_eq!(hits.len(), 25, "{hits:?}");
            }
            for h in &hits {
                let (x, y) = (h.center.x / scale, h.center.y / scale);
                assert!(
                    centers.iter().any(|&(cx, cy)| {
                        (x - cx as f32).hypot(y - cy as f32) <= 3.0
                    }),
                    "scale {scale}: stray hit {h:?}"
                );
            }
        }
    }

    #[test]
    fn contrast_is_zero_on_flat_ground_and_full_on_a_dot() {
        let flat = GrayImage::from_pixel(40, 40, Luma([128]));
        assert_abs_diff_eq!(ring_contrast(&flat, 20, 20, 6.0), 0.0);
        let dot = dot_image(40, 40, &[(20, 20)], 6);
        assert_abs_diff_eq!(ring_contrast(&dot, 20, 20, 6.0), 255.0);
    }

    #[test]
    fn sectors_cover_the_full_turn() {
        let mut mask = 0u32;
        for k in 0..64 {
            let a = k as f32 / 64.0 * TAU;
            mask |= 1 << sector_of(a.cos(), a.sin());
        }
        assert_eq!(mask.count_ones(), RING_SECTORS);
        assert_eq!(sector_of(-1.0, 0.0), RING_SECTORS - 1);
    }
}
