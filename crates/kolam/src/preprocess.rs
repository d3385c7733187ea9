//! Decode and enhance input photos before detection.
//!
//! The working raster is bounded to a longer side of `max_dim` pixels. Every
//! coordinate the pipeline reports lives in that working space; nothing is
//! scaled back to the resolution of the uploaded file.

use image::{imageops, GrayImage, RgbImage};
use imageproc::filter::gaussian_blur_f32;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::error::KolamError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessParams {
    /// Longer side of the working raster; larger inputs are area-downscaled.
    pub max_dim: u32,
    pub clahe_clip_limit: f32,
    /// CLAHE tiles per axis.
    pub clahe_tiles: u32,
    pub bilateral_diameter: u32,
    pub bilateral_sigma_color: f32,
    pub bilateral_sigma_space: f32,
    /// Inputs whose original longer side exceeds this get a Gaussian blur
    /// instead of the bilateral filter.
    pub large_input_dim: u32,
    pub blur_sigma: f32,
}

impl Default for PreprocessParams {
    fn default() -> Self {
        Self {
            max_dim: 1000,
            clahe_clip_limit: 3.0,
            clahe_tiles: 8,
            bilateral_diameter: 9,
            bilateral_sigma_color: 75.0,
            bilateral_sigma_space: 75.0,
            large_input_dim: 2000,
            // 3x3 kernel equivalent
            blur_sigma: 0.8,
        }
    }
}

/// Output of [`prepare`].
#[derive(Clone, Debug)]
pub struct PreparedImage {
    /// Working-resolution color raster, used for annotation.
    pub color: RgbImage,
    /// Contrast-enhanced, denoised grayscale raster fed to the detectors.
    pub gray: GrayImage,
    /// Factor applied to the decoded image (`1.0` when not downscaled).
    pub scale: f32,
    pub original_width: u32,
    pub original_height: u32,
}

impl PreparedImage {
    /// Unenhanced grayscale view of [`PreparedImage::color`].
    pub fn plain_gray(&self) -> GrayImage {
        imageops::grayscale(&self.color)
    }
}

/// Decode `bytes` and run [`prepare`].
pub fn prepare_bytes(bytes: &[u8], params: &PreprocessParams) -> Result<PreparedImage, KolamError> {
    let decoded = image::load_from_memory(bytes).map_err(KolamError::ImageDecode)?;
    Ok(prepare(decoded.to_rgb8(), params))
}

/// Bound the resolution, equalize locally and smooth.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(rgb, params), fields(width = rgb.width(), height = rgb.height()))
)]
pub fn prepare(rgb: RgbImage, params: &PreprocessParams) -> PreparedImage {
    let (original_width, original_height) = rgb.dimensions();
    let longest = original_width.max(original_height);

    let (color, scale) = if longest > params.max_dim && params.max_dim > 0 {
        let scale = params.max_dim as f32 / longest as f32;
        let w = ((original_width as f32 * scale).round() as u32).max(1);
        let h = ((original_height as f32 * scale).round() as u32).max(1);
        (imageops::thumbnail(&rgb, w, h), scale)
    } else {
        (rgb, 1.0)
    };

    let gray = imageops::grayscale(&color);
    let enhanced = clahe(&gray, params.clahe_clip_limit, params.clahe_tiles);
    let gray = if longest > params.large_input_dim {
        if params.blur_sigma > 0.0 {
            gaussian_blur_f32(&enhanced, params.blur_sigma)
        } else {
            enhanced
        }
    } else {
        bilateral_filter(
            &enhanced,
            params.bilateral_diameter,
            params.bilateral_sigma_color,
            params.bilateral_sigma_space,
        )
    };

    log::info!(
        "prepared {}x{} input at scale {scale:.3} ({}x{})",
        original_width,
        original_height,
        color.width(),
        color.height()
    );

    PreparedImage {
        color,
        gray,
        scale,
        original_width,
        original_height,
    }
}

/// Contrast-limited adaptive histogram equalization.
///
/// The image is split into `tiles × tiles` regions; each gets a clipped
/// histogram mapping, and pixels blend the mappings of the four nearest tile
/// centers bilinearly.
pub fn clahe(gray: &GrayImage, clip_limit: f32, tiles: u32) -> GrayImage {
    let (w, h) = gray.dimensions();
    if w == 0 || h == 0 || tiles == 0 {
        return gray.clone();
    }
    let tiles_x = tiles.min(w) as usize;
    let tiles_y = tiles.min(h) as usize;
    let (wu, hu) = (w as usize, h as usize);
    let bounds_x: Vec<usize> = (0..=tiles_x).map(|i| i * wu / tiles_x).collect();
    let bounds_y: Vec<usize> = (0..=tiles_y).map(|i| i * hu / tiles_y).collect();

    let mut luts = Vec::with_capacity(tiles_x * tiles_y);
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let mut hist = [0u32; 256];
            for y in bounds_y[ty]..bounds_y[ty + 1] {
                for x in bounds_x[tx]..bounds_x[tx + 1] {
                    hist[gray.get_pixel(x as u32, y as u32)[0] as usize] += 1;
                }
            }
            let area = ((bounds_x[tx + 1] - bounds_x[tx]) * (bounds_y[ty + 1] - bounds_y[ty])) as u32;
            luts.push(tile_lut(&mut hist, area, clip_limit));
        }
    }

    let tile_w = w as f32 / tiles_x as f32;
    let tile_h = h as f32 / tiles_y as f32;
    let neighbors = |f: f32, n: usize| {
        let lo = f.floor();
        let i0 = (lo as i64).clamp(0, n as i64 - 1) as usize;
        let i1 = (lo as i64 + 1).clamp(0, n as i64 - 1) as usize;
        (i0, i1, f - lo)
    };

    GrayImage::from_fn(w, h, |x, y| {
        let v = gray.get_pixel(x, y)[0] as usize;
        let (x0, x1, ax) = neighbors((x as f32 + 0.5) / tile_w - 0.5, tiles_x);
        let (y0, y1, ay) = neighbors((y as f32 + 0.5) / tile_h - 0.5, tiles_y);
        let at = |tx: usize, ty: usize| luts[ty * tiles_x + tx][v] as f32;
        let top = at(x0, y0) * (1.0 - ax) + at(x1, y0) * ax;
        let bottom = at(x0, y1) * (1.0 - ax) + at(x1, y1) * ax;
        let out = top * (1.0 - ay) + bottom * ay;
        image::Luma([out.round().clamp(0.0, 255.0) as u8])
    })
}

fn tile_lut(hist: &mut [u32; 256], area: u32, clip_limit: f32) -> [u8; 256] {
    let mut lut = [0u8; 256];
    if area == 0 {
        return lut;
    }
    if clip_limit > 0.0 {
        let clip = ((clip_limit * area as f32 / 256.0) as u32).max(1);
        let mut excess = 0u32;
        for bin in hist.iter_mut() {
            if *bin > clip {
                excess += *bin - clip;
                *bin = clip;
            }
        }
        let per_bin = excess / 256;
        let residual = (excess % 256) as usize;
        for bin in hist.iter_mut() {
            *bin += per_bin;
        }
        if residual > 0 {
            let step = (256 / residual).max(1);
            for i in (0..256).step_by(step).take(residual) {
                hist[i] += 1;
            }
        }
    }

    let scale = 255.0 / area as f32;
    let mut cdf = 0u32;
    for (out, &count) in lut.iter_mut().zip(hist.iter()) {
        cdf += count;
        *out = (cdf as f32 * scale).round().min(255.0) as u8;
    }
    lut
}

/// Edge-preserving smoothing over a disc of `diameter` pixels.
///
/// Neighbors are weighted by spatial distance and by intensity difference;
/// borders replicate the edge pixels.
pub fn bilateral_filter(gray: &GrayImage, diameter: u32, sigma_color: f32, sigma_space: f32) -> GrayImage {
    let radius = (diameter / 2) as i32;
    if radius == 0 || sigma_color <= 0.0 || sigma_space <= 0.0 {
        return gray.clone();
    }
    let (w, h) = gray.dimensions();

    let color_coeff = -0.5 / (sigma_color * sigma_color);
    let color_weight: Vec<f32> = (0..256)
        .map(|d| ((d * d) as f32 * color_coeff).exp())
        .collect();
    let space_coeff = -0.5 / (sigma_space * sigma_space);
    let window: Vec<(i32, i32, f32)> = (-radius..=radius)
        .flat_map(|dy| (-radius..=radius).map(move |dx| (dx, dy)))
        .filter(|(dx, dy)| dx * dx + dy * dy <= radius * radius)
        .map(|(dx, dy)| (dx, dy, ((dx * dx + dy * dy) as f32 * space_coeff).exp()))
        .collect();

    let (wi, hi) = (w as i32, h as i32);
    GrayImage::from_fn(w, h, |x, y| {
        let center = gray.get_pixel(x, y)[0];
        let mut sum = 0.0f32;
        let mut norm = 0.0f32;
        for &(dx, dy, ws) in &window {
            let nx = (x as i32 + dx).clamp(0, wi - 1) as u32;
            let ny = (y as i32 + dy).clamp(0, hi - 1) as u32;
            let v = gray.get_pixel(nx, ny)[0];
            let wgt = ws * color_weight[v.abs_diff(center) as usize];
            sum += wgt * v as f32;
            norm += wgt;
        }
        image::Luma([(sum / norm).round().clamp(0.0, 255.0) as u8])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Luma, Rgb};
    use std::io::Cursor;

    fn png_bytes(img: &RgbImage) -> Vec<u8> {
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .unwrap();
        out
    }

    #[test]
    fn large_inputs_are_bounded() {
        let img = RgbImage::from_pixel(1600, 800, Rgb([200, 200, 200]));
        let prepared = prepare(img, &PreprocessParams::default());
        assert_eq!(prepared.color.dimensions(), (1000, 500));
        assert_eq!(prepared.gray.dimensions(), (1000, 500));
        assert!((prepared.scale - 0.625).abs() < 1e-6);
        assert_eq!((prepared.original_width, prepared.original_height), (1600, 800));
    }

    #[test]
    fn small_inputs_keep_their_size() {
        let img = RgbImage::from_pixel(300, 200, Rgb([255, 255, 255]));
        let prepared = prepare(img, &PreprocessParams::default());
        assert_eq!(prepared.gray.dimensions(), (300, 200));
        assert_eq!(prepared.scale, 1.0);
    }

    #[test]
    fn corrupt_bytes_fail_to_decode() {
        let err = prepare_bytes(b"definitely not an image", &PreprocessParams::default());
        assert!(matches!(err, Err(KolamError::ImageDecode(_))));
    }

    #[test]
    fn decodes_png_bytes() {
        let img = RgbImage::from_pixel(40, 30, Rgb([10, 20, 30]));
        let prepared = prepare_bytes(&png_bytes(&img), &PreprocessParams::default()).unwrap();
        assert_eq!(prepared.color.dimensions(), (40, 30));
    }

    #[test]
    fn clahe_keeps_uniform_white_white() {
        let img = GrayImage::from_pixel(64, 48, Luma([255]));
        let out = clahe(&img, 3.0, 8);
        assert!(out.pixels().all(|p| p[0] == 255));
    }

    #[test]
    fn clahe_keeps_dark_marks_dark() {
        let mut img = GrayImage::from_pixel(80, 80, Luma([255]));
        for y in 30..40 {
            for x in 30..40 {
                img.put_pixel(x, y, Luma([0]));
            }
        }
        let out = clahe(&img, 3.0, 8);
        assert!(out.get_pixel(35, 35)[0] < 64);
        assert_eq!(out.get_pixel(5, 5)[0], 255);
    }

    #[test]
    fn bilateral_preserves_hard_edges() {
        let img = GrayImage::from_fn(40, 20, |x, _| Luma([if x < 20 { 0 } else { 255 }]));
        let out = bilateral_filter(&img, 9, 75.0, 75.0);
        assert!(out.get_pixel(18, 10)[0] < 10);
        assert!(out.get_pixel(21, 10)[0] > 245);
    }

    #[test]
    fn bilateral_smooths_small_noise() {
        let img = GrayImage::from_fn(20, 20, |x, y| Luma([if (x + y) % 2 == 0 { 120 } else { 130 }]));
        let out = bilateral_filter(&img, 9, 75.0, 75.0);
        let v = out.get_pixel(10, 10)[0];
        assert!((123..=127).contains(&v), "{v}");
    }
}
