//! Global and local binarization.
//!
//! Outputs are `0`/`255` masks; a pixel is set when its value is strictly
//! greater than the threshold.

use image::{GrayImage, ImageBuffer, Luma};

/// Otsu threshold over the full intensity histogram.
///
/// Uniform images return their single value, so `threshold_binary` with the
/// result clears every pixel.
pub fn otsu_level(img: &GrayImage) -> u8 {
    let samples = img.as_raw();
    if samples.is_empty() {
        return 127;
    }

    let mut hist = [0u64; 256];
    let mut min_v = 255u8;
    let mut max_v = 0u8;
    for &v in samples {
        hist[v as usize] += 1;
        min_v = min_v.min(v);
        max_v = max_v.max(v);
    }
    if min_v == max_v {
        return min_v;
    }

    let total = samples.len() as f64;
    let sum_total: f64 = hist
        .iter()
        .enumerate()
        .map(|(i, &h)| i as f64 * h as f64)
        .sum();

    let mut sum_b = 0f64;
    let mut w_b = 0f64;
    let mut best_var = -1f64;
    let mut best_t = min_v;

    for (t, &h) in hist.iter().enumerate() {
        w_b += h as f64;
        if w_b < 1.0 {
            continue;
        }
        let w_f = total - w_b;
        if w_f < 1.0 {
            break;
        }

        sum_b += t as f64 * h as f64;
        let m_b = sum_b / w_b;
        let m_f = (sum_total - sum_b) / w_f;

        let var_between = w_b * w_f * (m_b - m_f) * (m_b - m_f);
        if var_between > best_var {
            best_var = var_between;
            best_t = t as u8;
        }
    }

    best_t
}

/// `255` where `value > thresh`, else `0`.
pub fn threshold_binary(img: &GrayImage, thresh: u8) -> GrayImage {
    let mut out = img.clone();
    for p in out.pixels_mut() {
        p.0[0] = if p.0[0] > thresh { 255 } else { 0 };
    }
    out
}

/// Gaussian-weighted adaptive threshold.
///
/// A pixel is set when it exceeds its local weighted mean minus `c`. The
/// window is `block_size` pixels wide (odd, >= 3); the Gaussian sigma follows
/// the usual `0.3 * ((block - 1) / 2 - 1) + 0.8` rule.
pub fn adaptive_threshold_gaussian(img: &GrayImage, block_size: u32, c: f32) -> GrayImage {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return img.clone();
    }
    let block = block_size.max(3) | 1;
    let sigma = 0.3 * ((block as f32 - 1.0) * 0.5 - 1.0) + 0.8;

    let as_f32: ImageBuffer<Luma<f32>, Vec<f32>> =
        ImageBuffer::from_fn(w, h, |x, y| Luma([img.get_pixel(x, y).0[0] as f32]));
    let mean = imageproc::filter::gaussian_blur_f32(&as_f32, sigma);

    GrayImage::from_fn(w, h, |x, y| {
        let v = img.get_pixel(x, y).0[0] as f32;
        let m = mean.get_pixel(x, y).0[0];
        Luma([if v > m - c { 255 } else { 0 }])
    })
}
