//! Binary mask helpers. Masks are `GrayImage`s with `0`/`255` pixels;
//! anything non-zero counts as foreground.

use image::{GrayImage, Luma};

/// Offset of a cropped mask inside the full frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CropOffset {
    pub x: u32,
    pub y: u32,
}

/// Inclusive bounding box of foreground pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ForegroundBox {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

pub fn invert(mask: &GrayImage) -> GrayImage {
    let mut out = mask.clone();
    for p in out.pixels_mut() {
        p.0[0] = 255 - p.0[0];
    }
    out
}

/// Pixel-wise OR of two masks of equal size.
pub fn union(a: &GrayImage, b: &GrayImage) -> GrayImage {
    debug_assert_eq!(a.dimensions(), b.dimensions());
    GrayImage::from_fn(a.width(), a.height(), |x, y| {
        let on = a.get_pixel(x, y).0[0] != 0 || b.get_pixel(x, y).0[0] != 0;
        Luma([if on { 255 } else { 0 }])
    })
}

/// Bounding box of all non-zero pixels, `None` for an empty mask.
pub fn foreground_bbox(mask: &GrayImage) -> Option<ForegroundBox> {
    let mut bbox: Option<ForegroundBox> = None;
    for (x, y, p) in mask.enumerate_pixels() {
        if p.0[0] == 0 {
            continue;
        }
        let b = bbox.get_or_insert(ForegroundBox {
            x0: x,
            y0: y,
            x1: x,
            y1: y,
        });
        b.x0 = b.x0.min(x);
        b.y0 = b.y0.min(y);
        b.x1 = b.x1.max(x);
        b.y1 = b.y1.max(y);
    }
    bbox
}

/// Crop to the foreground bounding box grown by `pad` pixels on every side
/// (clipped to the frame).
///
/// An empty mask is returned unchanged with a zero offset.
pub fn crop_padded(mask: &GrayImage, pad: u32) -> (GrayImage, CropOffset) {
    let Some(bbox) = foreground_bbox(mask) else {
        return (mask.clone(), CropOffset::default());
    };
    let (w, h) = mask.dimensions();
    let x0 = bbox.x0.saturating_sub(pad);
    let y0 = bbox.y0.saturating_sub(pad);
    let x1 = (bbox.x1 + 1 + pad).min(w);
    let y1 = (bbox.y1 + 1 + pad).min(h);
    let roi = image::imageops::crop_imm(mask, x0, y0, x1 - x0, y1 - y0).to_image();
    (roi, CropOffset { x: x0, y: y0 })
}
