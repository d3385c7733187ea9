//! Stroke masks: strokes are foreground (`255`), paper is background.

use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::morphology::{close, open};
use kolam_core::{adaptive_threshold_gaussian, invert, otsu_level, threshold_binary, union};

use crate::params::TracerParams;

/// Whether the image has more than one intensity level.
pub fn has_contrast(gray: &GrayImage) -> bool {
    let mut it = gray.pixels();
    match it.next() {
        Some(first) => it.any(|p| p.0[0] != first.0[0]),
        None => false,
    }
}

/// Union of the Otsu and adaptive-Gaussian paper masks, inverted.
///
/// The global level picks up bold strokes and the local one faint strokes;
/// a pixel is stroke only if both call it dark.
pub fn stroke_mask(gray: &GrayImage, params: &TracerParams) -> GrayImage {
    let global = threshold_binary(gray, otsu_level(gray));
    let local = adaptive_threshold_gaussian(gray, params.adaptive_block, params.adaptive_c);
    invert(&union(&global, &local))
}

/// Plain inverted Otsu mask.
pub fn otsu_stroke_mask(gray: &GrayImage) -> GrayImage {
    invert(&threshold_binary(gray, otsu_level(gray)))
}

/// Close small gaps, then remove noise.
pub fn clean_mask(mask: &GrayImage, params: &TracerParams) -> GrayImage {
    let mut out = if params.close_radius > 0 {
        close(mask, Norm::LInf, params.close_radius)
    } else {
        mask.clone()
    };
    if params.open_radius > 0 {
        out = open(&out, Norm::LInf, params.open_radius);
    }
    if params.despeckle {
        out = despeckle(&out);
    }
    out
}

/// Clear foreground pixels that have no foreground 8-neighbor.
pub fn despeckle(mask: &GrayImage) -> GrayImage {
    let (w, h) = mask.dimensions();
    let on = |x: i64, y: i64| -> bool {
        x >= 0 && y >= 0 && x < w as i64 && y < h as i64 && mask.get_pixel(x as u32, y as u32).0[0] != 0
    };
    GrayImage::from_fn(w, h, |x, y| {
        let (xi, yi) = (x as i64, y as i64);
        if !on(xi, yi) {
            return Luma([0]);
        }
        let lonely = (-1..=1)
            .flat_map(|dy| (-1..=1).map(move |dx| (dx, dy)))
            .filter(|&(dx, dy)| dx != 0 || dy != 0)
            .all(|(dx, dy)| !on(xi + dx, yi + dy));
        Luma([if lonely { 0 } else { 255 }])
    })
}
