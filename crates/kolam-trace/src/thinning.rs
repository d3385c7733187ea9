//! Centerline extraction.
//!
//! [`zhang_suen`] is the primary thinning primitive. When it is unavailable
//! or gives up, [`morphological_skeleton`] produces a coarser skeleton by
//! repeated erosion.

use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::morphology::{erode, open};
use kolam_core::Budget;
use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ThinningError {
    #[error("thinning disabled by runtime configuration")]
    Disabled,
    #[error("thinning did not converge within {0} iterations")]
    IterationLimit(usize),
    #[error("thinning ran out of time after {0} iterations")]
    BudgetExhausted(usize),
}

/// Zhang-Suen thinning of the non-zero pixels of `mask`.
///
/// Pixels outside the frame count as background. Fails when the mask still
/// changes after `max_iterations` passes or when `budget` trips.
pub fn zhang_suen(
    mask: &GrayImage,
    max_iterations: usize,
    budget: &Budget,
) -> Result<GrayImage, ThinningError> {
    let (w, h) = mask.dimensions();
    let (w, h) = (w as usize, h as usize);
    let mut px: Vec<u8> = mask.as_raw().iter().map(|&v| u8::from(v != 0)).collect();
    let mut marked: Vec<usize> = Vec::new();

    let at = |px: &[u8], x: isize, y: isize| -> u8 {
        if x < 0 || y < 0 || x >= w as isize || y >= h as isize {
            0
        } else {
            px[y as usize * w + x as usize]
        }
    };

    for iteration in 0..max_iterations {
        if budget.is_exhausted() {
            return Err(ThinningError::BudgetExhausted(iteration));
        }
        let mut changed = false;
        for step in 0..2 {
            marked.clear();
            for y in 0..h {
                for x in 0..w {
                    if px[y * w + x] == 0 {
                        continue;
                    }
                    let (xi, yi) = (x as isize, y as isize);
                    // P2..P9 clockwise from north.
                    let n = [
                        at(&px, xi, yi - 1),
                        at(&px, xi + 1, yi - 1),
                        at(&px, xi + 1, yi),
                        at(&px, xi + 1, yi + 1),
                        at(&px, xi, yi + 1),
                        at(&px, xi - 1, yi + 1),
                        at(&px, xi - 1, yi),
                        at(&px, xi - 1, yi - 1),
                    ];
                    let b: u8 = n.iter().sum();
                    if !(2..=6).contains(&b) {
                        continue;
                    }
                    let a = (0..8).filter(|&i| n[i] == 0 && n[(i + 1) % 8] == 1).count();
                    if a != 1 {
                        continue;
                    }
                    let (p2, p4, p6, p8) = (n[0], n[2], n[4], n[6]);
                    let keep = if step == 0 {
                        p2 * p4 * p6 != 0 || p4 * p6 * p8 != 0
                    } else {
                        p2 * p4 * p8 != 0 || p2 * p6 * p8 != 0
                    };
                    if !keep {
                        marked.push(y * w + x);
                    }
                }
            }
            for &i in &marked {
                px[i] = 0;
            }
            changed |= !marked.is_empty();
        }
        if !changed {
            return Ok(GrayImage::from_fn(w as u32, h as u32, |x, y| {
                Luma([px[y as usize * w + x as usize] * 255])
            }));
        }
    }
    Err(ThinningError::IterationLimit(max_iterations))
}

/// Union of `erode^k(mask) - open(erode^k(mask))` over k >= 1, using a 3×3
/// cross element.
///
/// Stops once the eroded mask is empty or `budget` trips; at least one
/// level is always produced.
pub fn morphological_skeleton(mask: &GrayImage, budget: &Budget) -> GrayImage {
    let (w, h) = mask.dimensions();
    let mut skel = GrayImage::new(w, h);
    let mut eroded = mask.clone();
    loop {
        eroded = erode(&eroded, Norm::L1, 1);
        let opened = open(&eroded, Norm::L1, 1);
        let mut any = false;
        for ((s, e), o) in skel.pixels_mut().zip(eroded.pixels()).zip(opened.pixels()) {
            if e.0[0] != 0 {
                any = true;
                if o.0[0] == 0 {
                    *s = Luma([255]);
                }
            }
        }
        if !any || budget.is_exhausted() {
            break;
        }
    }
    skel
}
