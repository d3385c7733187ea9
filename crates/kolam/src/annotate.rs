use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_circle_mut, draw_line_segment_mut};
use kolam_core::{DotSet, OrientedPath};

pub const DOT_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const PATH_COLOR: Rgb<u8> = Rgb([0, 0, 255]);

/// Draw detections over the working-resolution color raster: each dot as a
/// 2 px green ring of its detected radius, each path as a 1 px blue polyline.
pub fn annotate(color: &RgbImage, dots: &DotSet, paths: &[OrientedPath]) -> RgbImage {
    let mut out = color.clone();
    for dot in dots.iter() {
        let r = dot.radius.round().max(1.0) as i32;
        let c = (dot.center.x, dot.center.y);
        draw_hollow_circle_mut(&mut out, c, r, DOT_COLOR);
        draw_hollow_circle_mut(&mut out, c, r + 1, DOT_COLOR);
    }
    for path in paths {
        for seg in path.points().windows(2) {
            draw_line_segment_mut(
                &mut out,
                (seg[0].x as f32, seg[0].y as f32),
                (seg[1].x as f32, seg[1].y as f32),
                PATH_COLOR,
            );
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use kolam_core::{Dot, DotSource, PixelPoint};

    #[test]
    fn marks_dots_and_paths() {
        let img = RgbImage::from_pixel(60, 60, Rgb([255, 255, 255]));
        let dots = DotSet::from_dots(vec![Dot {
            center: PixelPoint::new(20, 20),
            radius: 5.0,
            source: DotSource::Blob,
        }]);
        let path = OrientedPath::new(vec![PixelPoint::new(5, 50), PixelPoint::new(55, 50)]).unwrap();
        let out = annotate(&img, &dots, &[path]);
        assert_eq!(*out.get_pixel(25, 20), DOT_COLOR);
        assert_eq!(*out.get_pixel(20, 20), Rgb([255, 255, 255]));
        assert_eq!(*out.get_pixel(30, 50), PATH_COLOR);
        assert_eq!(*img.get_pixel(30, 50), Rgb([255, 255, 255]));
    }
}
