//! Contour extraction and polygon measurements.
//!
//! Border following is delegated to `imageproc`; everything here speaks
//! `PixelPoint`.

use image::GrayImage;
use imageproc::contours::BorderType;
use imageproc::point::Point;
use nalgebra::Point2;

use crate::geometry::PixelPoint;

/// One border of a binary mask.
#[derive(Clone, Debug, PartialEq)]
pub struct Contour {
    pub points: Vec<PixelPoint>,
    /// Outer border of a foreground component (as opposed to a hole).
    pub is_outer: bool,
    /// Index of the enclosing border in the same contour list.
    pub parent: Option<usize>,
}

impl Contour {
    /// Outer border with no enclosing border.
    #[inline]
    pub fn is_external(&self) -> bool {
        self.is_outer && self.parent.is_none()
    }

    pub fn area(&self) -> f64 {
        polygon_area(&self.points)
    }

    pub fn perimeter(&self) -> f64 {
        polygon_perimeter(&self.points, true)
    }
}

/// Full border hierarchy of the non-zero pixels in `mask`.
pub fn find_contours(mask: &GrayImage) -> Vec<Contour> {
    imageproc::contours::find_contours::<i32>(mask)
        .into_iter()
        .map(|c| Contour {
            points: c.points.iter().map(|p| PixelPoint::new(p.x, p.y)).collect(),
            is_outer: matches!(c.border_type, BorderType::Outer),
            parent: c.parent,
        })
        .collect()
}

/// Absolute shoelace area of a closed polygon.
pub fn polygon_area(points: &[PixelPoint]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut twice = 0i64;
    for (i, p) in points.iter().enumerate() {
        let q = points[(i + 1) % points.len()];
        twice += p.x as i64 * q.y as i64 - q.x as i64 * p.y as i64;
    }
    (twice as f64 * 0.5).abs()
}

/// Polyline length, including the closing edge when `closed`.
pub fn polygon_perimeter(points: &[PixelPoint], closed: bool) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    imageproc::geometry::arc_length(&to_imageproc(points), closed)
}

/// Centroid from the polygon's zeroth and first area moments.
///
/// Returns `None` for degenerate (zero-area) polygons.
pub fn polygon_centroid(points: &[PixelPoint]) -> Option<Point2<f64>> {
    if points.len() < 3 {
        return None;
    }
    let mut m00 = 0.0f64;
    let mut m10 = 0.0f64;
    let mut m01 = 0.0f64;
    for (i, p) in points.iter().enumerate() {
        let q = points[(i + 1) % points.len()];
        let (x0, y0, x1, y1) = (p.x as f64, p.y as f64, q.x as f64, q.y as f64);
        let cross = x0 * y1 - x1 * y0;
        m00 += cross;
        m10 += (x0 + x1) * cross;
        m01 += (y0 + y1) * cross;
    }
    m00 *= 0.5;
    if m00.abs() < f64::EPSILON {
        return None;
    }
    Some(Point2::new(m10 / (6.0 * m00), m01 / (6.0 * m00)))
}

/// Douglas-Peucker simplification.
///
/// Closed curves are split at the point farthest from the first one and both
/// halves are simplified as open chains, so degenerate loops (a one-pixel
/// wide line traced there and back) keep both extremes. The closing point is
/// not repeated in the output.
pub fn simplify_polygon(points: &[PixelPoint], epsilon: f64, closed: bool) -> Vec<PixelPoint> {
    if points.len() < 3 || epsilon <= 0.0 {
        return points.to_vec();
    }
    let mut out = Vec::new();
    if !closed {
        dp_chain(points, epsilon, &mut out);
        out.push(points[points.len() - 1]);
        return out;
    }

    let origin = points[0];
    let far = (1..points.len())
        .max_by(|&a, &b| {
            let da = points[a].distance_sq(origin);
            let db = points[b].distance_sq(origin);
            da.total_cmp(&db).then(b.cmp(&a))
        })
        .unwrap_or(0);
    if far == 0 || points[far] == origin {
        return vec![origin];
    }
    dp_chain(&points[..=far], epsilon, &mut out);
    let mut back: Vec<PixelPoint> = points[far..].to_vec();
    back.push(origin);
    dp_chain(&back, epsilon, &mut out);
    out
}

/// Append the simplified chain without its last point.
fn dp_chain(chain: &[PixelPoint], epsilon: f64, out: &mut Vec<PixelPoint>) {
    let n = chain.len();
    if n < 3 {
        out.push(chain[0]);
        return;
    }
    let (a, b) = (chain[0], chain[n - 1]);
    let mut split = 0;
    let mut dmax = 0.0;
    for (i, &p) in chain.iter().enumerate().take(n - 1).skip(1) {
        let d = distance_to_line(p, a, b);
        if d > dmax {
            dmax = d;
            split = i;
        }
    }
    if dmax > epsilon {
        dp_chain(&chain[..=split], epsilon, out);
        dp_chain(&chain[split..], epsilon, out);
    } else {
        out.push(a);
    }
}

/// Distance from `p` to the line through `a` and `b` (to `a` if they coincide).
fn distance_to_line(p: PixelPoint, a: PixelPoint, b: PixelPoint) -> f64 {
    let (dx, dy) = ((b.x - a.x) as f64, (b.y - a.y) as f64);
    let len = dx.hypot(dy);
    if len < f64::EPSILON {
        return (p.distance_sq(a) as f64).sqrt();
    }
    ((p.x - a.x) as f64 * dy - (p.y - a.y) as f64 * dx).abs() / len
}

fn to_imageproc(points: &[PixelPoint]) -> Vec<Point<i32>> {
    points.iter().map(|p| Point::new(p.x, p.y)).collect()
}
