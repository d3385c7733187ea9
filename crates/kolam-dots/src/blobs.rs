//! Circular blob candidates from external contours of the Otsu mask.

use image::GrayImage;
use kolam_core::{find_contours, otsu_level, polygon_centroid, threshold_binary, PixelPoint};

use crate::params::BlobParams;

/// A roundish foreground component.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlobCandidate {
    pub center: PixelPoint,
    pub area: f64,
    pub circularity: f64,
}

/// `4π·area / perimeter²`; `0` for a zero perimeter.
pub fn circularity(area: f64, perimeter: f64) -> f64 {
    if perimeter <= 0.0 {
        return 0.0;
    }
    4.0 * std::f64::consts::PI * area / (perimeter * perimeter)
}

/// External contours of the Otsu foreground that pass the area and
/// circularity gates, in contour order.
pub fn blob_candidates(gray: &GrayImage, params: &BlobParams) -> Vec<BlobCandidate> {
    let mask = threshold_binary(gray, otsu_level(gray));
    find_contours(&mask)
        .into_iter()
        .filter(|c| c.is_external())
        .filter_map(|c| {
            let area = c.area();
            if area <= params.min_area || area >= params.max_area {
                return None;
            }
            let circ = circularity(area, c.perimeter());
            if circ < params.min_circularity {
                return None;
            }
            let centroid = polygon_centroid(&c.points)?;
            Some(BlobCandidate {
                center: PixelPoint::new(centroid.x.round() as i32, centroid.y.round() as i32),
                area,
                circularity: circ,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut};
    use imageproc::rect::Rect;

    #[test]
    fn circularity_of_disk_and_sliver() {
        let r = 5.0f64;
        let disk = circularity(std::f64::consts::PI * r * r, 2.0 * std::f64::consts::PI * r);
        assert!((disk - 1.0).abs() < 1e-9);
        assert!(circularity(40.0, 84.0) < 0.1);
        assert_eq!(circularity(10.0, 0.0), 0.0);
    }

    #[test]
    fn bright_dots_on_dark_are_found() {
        let mut img = GrayImage::from_pixel(120, 80, Luma([20]));
        draw_filled_circle_mut(&mut img, (30, 40), 6, Luma([230]));
        draw_filled_circle_mut(&mut img, (80, 40), 6, Luma([230]));
        let blobs = blob_candidates(&img, &BlobParams::default());
        assert_eq!(blobs.len(), 2);
        for b in &blobs {
            assert_eq!(b.center.y, 40);
            assert!(b.circularity >= 0.6);
        }
    }

    #[test]
    fn elongated_and_oversized_shapes_are_rejected() {
        let mut img = GrayImage::from_pixel(200, 100, Luma([20]));
        draw_filled_rect_mut(&mut img, Rect::at(10, 10).of_size(60, 3), Luma([230]));
        draw_filled_circle_mut(&mut img, (140, 50), 25, Luma([230]));
        assert!(blob_candidates(&img, &BlobParams::default()).is_empty());
    }

    #[test]
    fn dark_dots_on_white_yield_no_blobs() {
        let mut img = GrayImage::from_pixel(100, 100, Luma([255]));
        draw_filled_circle_mut(&mut img, (50, 50), 6, Luma([0]));
        assert!(blob_candidates(&img, &BlobParams::default()).is_empty());
    }
}
