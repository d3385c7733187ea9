//! Progressive probabilistic Hough transform for straight segments.
//!
//! Foreground pixels are visited in a seeded pseudo-random order. Each visit
//! adds the pixel's votes to a (θ, ρ) accumulator; once the strongest line
//! through it reaches the threshold, the line is followed in both directions
//! across gaps of at most `max_gap` pixels. The followed pixels are removed
//! from the mask (and from the accumulator if the segment is long enough), so
//! every pixel contributes to at most one segment.

use image::GrayImage;
use kolam_core::{Budget, PixelPoint};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::params::SegmentParams;

/// Straight segment between two foreground pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LineSegment {
    pub start: PixelPoint,
    pub end: PixelPoint,
}

const SHIFT: i32 = 16;

struct Accumulator {
    trig: Vec<(f32, f32)>,
    num_rho: usize,
    votes: Vec<i32>,
}

impl Accumulator {
    fn new(width: u32, height: u32, params: &SegmentParams) -> Self {
        let rho = params.rho.max(f32::EPSILON);
        let theta = params.theta_deg.max(f32::EPSILON).to_radians();
        let num_angle = ((std::f32::consts::PI / theta).round() as usize).max(1);
        let num_rho = (((width + height) * 2 + 1) as f32 / rho).round() as usize;
        let trig = (0..num_angle)
            .map(|n| {
                let t = n as f32 * theta;
                (t.cos() / rho, t.sin() / rho)
            })
            .collect();
        Self {
            trig,
            num_rho,
            votes: vec![0; num_angle * num_rho],
        }
    }

    #[inline]
    fn rho_index(&self, n: usize, x: i32, y: i32) -> usize {
        let (c, s) = self.trig[n];
        let r = (x as f32 * c + y as f32 * s).round() as i64 + (self.num_rho as i64 - 1) / 2;
        r.clamp(0, self.num_rho as i64 - 1) as usize
    }

    /// Add the votes of `(x, y)`; returns the strongest angle and its count.
    fn vote(&mut self, x: i32, y: i32) -> (usize, i32) {
        let mut best = (0usize, 0i32);
        for n in 0..self.trig.len() {
            let idx = n * self.num_rho + self.rho_index(n, x, y);
            self.votes[idx] += 1;
            if self.votes[idx] > best.1 {
                best = (n, self.votes[idx]);
            }
        }
        best
    }

    fn unvote(&mut self, x: i32, y: i32) {
        for n in 0..self.trig.len() {
            let idx = n * self.num_rho + self.rho_index(n, x, y);
            self.votes[idx] -= 1;
        }
    }
}

/// Fixed-point walker along the line direction of angle index `n`.
#[derive(Clone, Copy)]
struct Walk {
    x0: i32,
    y0: i32,
    dx0: i32,
    dy0: i32,
    x_major: bool,
}

impl Walk {
    fn new(acc: &Accumulator, n: usize, x: i32, y: i32) -> Self {
        let (c, s) = acc.trig[n];
        let a = -s;
        let b = c;
        if a.abs() > b.abs() {
            Walk {
                x0: x,
                y0: (y << SHIFT) + (1 << (SHIFT - 1)),
                dx0: if a > 0.0 { 1 } else { -1 },
                dy0: (b * (1 << SHIFT) as f32 / a.abs()).round() as i32,
                x_major: true,
            }
        } else {
            Walk {
                x0: (x << SHIFT) + (1 << (SHIFT - 1)),
                y0: y,
                dx0: (a * (1 << SHIFT) as f32 / b.abs()).round() as i32,
                dy0: if b > 0.0 { 1 } else { -1 },
                x_major: false,
            }
        }
    }

    /// Pixel positions from the seed outward in direction `k` (0 or 1).
    fn steps(self, k: usize) -> impl Iterator<Item = (i32, i32)> {
        let (dx, dy) = if k == 0 {
            (self.dx0, self.dy0)
        } else {
            (-self.dx0, -self.dy0)
        };
        let x_major = self.x_major;
        (0i64..).map(move |i| {
            let x = self.x0 as i64 + i * dx as i64;
            let y = self.y0 as i64 + i * dy as i64;
            if x_major {
                (x as i32, (y >> SHIFT) as i32)
            } else {
                ((x >> SHIFT) as i32, y as i32)
            }
        })
    }
}

/// Detect straight segments among the non-zero pixels of `mask`.
///
/// Stops early when `budget` trips; segments found so far are returned.
pub fn detect_segments(mask: &GrayImage, params: &SegmentParams, budget: &Budget) -> Vec<LineSegment> {
    let (w, h) = mask.dimensions();
    let (wi, hi) = (w as i32, h as i32);
    let mut on: Vec<bool> = mask.as_raw().iter().map(|&v| v != 0).collect();
    let mut order: Vec<(i32, i32)> = mask
        .enumerate_pixels()
        .filter(|(_, _, p)| p.0[0] != 0)
        .map(|(x, y, _)| (x as i32, y as i32))
        .collect();
    if order.is_empty() {
        return Vec::new();
    }
    order.shuffle(&mut StdRng::seed_from_u64(params.seed));

    let mut acc = Accumulator::new(w, h, params);
    let inside = |x: i32, y: i32| x >= 0 && y >= 0 && x < wi && y < hi;
    let threshold = params.threshold as i32;
    let mut segments = Vec::new();

    for &(x, y) in &order {
        if budget.is_exhausted() {
            log::warn!("segment detection stopped by budget with {} segments", segments.len());
            break;
        }
        if !on[(y * wi + x) as usize] {
            continue;
        }
        let (n, votes) = acc.vote(x, y);
        if votes < threshold {
            continue;
        }

        let walk = Walk::new(&acc, n, x, y);
        let mut ends = [(x, y); 2];
        for (k, end) in ends.iter_mut().enumerate() {
            let mut gap = 0;
            for (px, py) in walk.steps(k) {
                if !inside(px, py) {
                    break;
                }
                if on[(py * wi + px) as usize] {
                    gap = 0;
                    *end = (px, py);
                } else {
                    gap += 1;
                    if gap > params.max_gap {
                        break;
                    }
                }
            }
        }

        let min_len = params.min_length as i32;
        let good = (ends[1].0 - ends[0].0).abs() >= min_len || (ends[1].1 - ends[0].1).abs() >= min_len;

        for (k, &end) in ends.iter().enumerate() {
            for (px, py) in walk.steps(k) {
                if !inside(px, py) {
                    break;
                }
                let idx = (py * wi + px) as usize;
                if on[idx] {
                    if good {
                        acc.unvote(px, py);
                    }
                    on[idx] = false;
                }
                if (px, py) == end {
                    break;
                }
            }
        }

        if good {
            segments.push(LineSegment {
                start: PixelPoint::new(ends[0].0, ends[0].1),
                end: PixelPoint::new(ends[1].0, ends[1].1),
            });
            if segments.len() >= params.max_segments {
                break;
            }
        }
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use imageproc::drawing::draw_line_segment_mut;
    use std::time::Duration;

    fn budget() -> Budget {
        Budget::start(Duration::from_secs(10))
    }

    fn span(s: &LineSegment) -> (i32, i32) {
        (s.start.x.min(s.end.x), s.start.x.max(s.end.x))
    }

    #[test]
    fn horizontal_line_yields_one_long_segment() {
        let mut mask = GrayImage::new(120, 40);
        for x in 10..110 {
            mask.put_pixel(x, 20, Luma([255]));
        }
        let segs = detect_segments(&mask, &SegmentParams::default(), &budget());
        assert!(!segs.is_empty());
        let longest = segs.iter().max_by_key(|s| span(s).1 - span(s).0).unwrap();
        let (lo, hi) = span(longest);
        assert!(lo <= 12 && hi >= 107, "{longest:?}");
        assert_eq!(longest.start.y, 20);
        assert_eq!(longest.end.y, 20);
    }

    #[test]
    fn small_gaps_are_bridged() {
        let mut mask = GrayImage::new(100, 20);
        for x in (10..90).filter(|x| x % 20 != 0) {
            mask.put_pixel(x, 10, Luma([255]));
        }
        let segs = detect_segments(&mask, &SegmentParams::default(), &budget());
        let (lo, hi) = segs.iter().map(span).max_by_key(|(a, b)| b - a).unwrap();
        assert!(lo <= 12 && hi >= 87, "{segs:?}");
    }

    #[test]
    fn diagonal_line_is_found() {
        let mut mask = GrayImage::new(100, 100);
        draw_line_segment_mut(&mut mask, (10.0, 10.0), (80.0, 80.0), Luma([255]));
        let segs = detect_segments(&mask, &SegmentParams::default(), &budget());
        assert!(segs
            .iter()
            .any(|s| (s.end.x - s.start.x).abs() >= 50 && (s.end.y - s.start.y).abs() >= 50));
    }

    #[test]
    fn sparse_noise_yields_nothing() {
        let mut mask = GrayImage::new(50, 50);
        for i in 0..5 {
            mask.put_pixel(i * 9 + 2, (i * 17 + 5) % 50, Luma([255]));
        }
        assert!(detect_segments(&mask, &SegmentParams::default(), &budget()).is_empty());
    }

    #[test]
    fn same_seed_same_result() {
        let mut mask = GrayImage::new(80, 80);
        draw_line_segment_mut(&mut mask, (5.0, 70.0), (75.0, 10.0), Luma([255]));
        draw_line_segment_mut(&mut mask, (5.0, 40.0), (75.0, 40.0), Luma([255]));
        let a = detect_segments(&mask, &SegmentParams::default(), &budget());
        let b = detect_segments(&mask, &SegmentParams::default(), &budget());
        assert_eq!(a, b);
    }
}
