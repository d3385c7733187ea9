use std::io::Cursor;

use approx::assert_relative_eq;
use image::{GrayImage, ImageFormat, Luma, Rgb};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut};
use imageproc::rect::Rect;
use kolam::render::{map_point, Digitizer};
use kolam::{analyze_bytes, custom_grid, digitize, KolamError, KolamParams, PixelPoint};

fn png(img: &GrayImage) -> Vec<u8> {
    let mut out = Vec::new();
    img.write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
        .expect("encode png");
    out
}

fn dot_grid(n: i32, spacing: i32, offset: i32, radius: i32) -> (GrayImage, Vec<PixelPoint>) {
    let mut img = GrayImage::from_pixel(300, 300, Luma([255]));
    let mut centers = Vec::new();
    for j in 0..n {
        for i in 0..n {
            let c = (offset + i * spacing, offset + j * spacing);
            draw_filled_circle_mut(&mut img, c, radius, Luma([0]));
            centers.push(PixelPoint::new(c.0, c.1));
        }
    }
    (img, centers)
}

fn horizontal_line() -> GrayImage {
    let mut img = GrayImage::from_pixel(300, 300, Luma([255]));
    draw_filled_rect_mut(&mut img, Rect::at(50, 149).of_size(200, 3), Luma([0]));
    img
}

#[test]
fn regular_five_by_five_grid() {
    let (img, truth) = dot_grid(5, 50, 25, 6);
    let analysis = analyze_bytes(&png(&img), &KolamParams::default()).expect("analysis");

    assert_eq!(analysis.dots.len(), 25, "{:?}", analysis.dots.centers());
    for c in &truth {
        let nearest = analysis
            .dots
            .iter()
            .map(|d| d.center.distance(*c))
            .fold(f32::INFINITY, f32::min);
        assert!(nearest <= 3.0, "no dot near {c:?}");
    }
    assert_eq!(analysis.grid_size().get(), 5);
}

#[test]
fn blank_image_yields_empty_analysis() {
    let img = GrayImage::from_pixel(300, 300, Luma([255]));
    let params = KolamParams::default();
    let analysis = analyze_bytes(&png(&img), &params).expect("analysis");

    assert!(analysis.dots.is_empty());
    assert!(analysis.paths.is_empty());
    assert_eq!(analysis.grid_size().get(), 3);

    let rendered = image::load_from_memory(&digitize(&analysis, &params, None).unwrap())
        .unwrap()
        .to_rgb8();
    assert_eq!(rendered.dimensions(), (500, 500));
    assert!(rendered.pixels().all(|p| *p == Rgb([255, 255, 255])));
}

#[test]
fn straight_line_is_traced_end_to_end() {
    let analysis = analyze_bytes(&png(&horizontal_line()), &KolamParams::default()).expect("analysis");
    let (left, right) = (PixelPoint::new(50, 150), PixelPoint::new(249, 150));
    let spans = analysis.paths.iter().any(|p| {
        let (s, e) = (p.start(), p.end());
        (s.distance(left) <= 5.0 && e.distance(right) <= 5.0)
            || (s.distance(right) <= 5.0 && e.distance(left) <= 5.0)
    });
    assert!(spans, "{:?}", analysis.paths);
}

#[test]
fn custom_grid_validates_and_renders() {
    let params = KolamParams::default();
    let analysis = analyze_bytes(&png(&horizontal_line()), &params).expect("analysis");

    assert!(matches!(
        custom_grid(&analysis, &params, 2, 5, None),
        Err(KolamError::InvalidGrid { rows: 2, cols: 5, .. })
    ));

    let bytes = custom_grid(&analysis, &params, 4, 6, Some("golden")).expect("render");
    let img = image::load_from_memory(&bytes).unwrap().to_rgb8();
    assert_eq!(img.dimensions(), (500, 500));
    assert_eq!(*img.get_pixel(0, 0), Rgb([0xff, 0xf8, 0xe1]));
}

#[test]
fn custom_grid_keeps_strokes_beyond_the_dots_inside_the_grid() {
    let (mut img, _) = dot_grid(3, 50, 100, 6);
    draw_filled_rect_mut(&mut img, Rect::at(20, 38).of_size(260, 4), Luma([0]));
    let params = KolamParams::default();
    let analysis = analyze_bytes(&png(&img), &params).expect("analysis");
    let digitizer = Digitizer::new(params.digitize.clone());

    let rendered = analysis
        .custom_grid(&digitizer, 3, 9, None)
        .expect("3x9 is a valid grid");
    assert_relative_eq!(rendered.destination.min.x, 50.0);
    assert_relative_eq!(rendered.destination.max.y, 450.0);

    let source = analysis.dots.bounds();
    let escapes = analysis
        .paths
        .iter()
        .flat_map(|p| p.points())
        .any(|&q| !rendered.destination.contains(map_point(q, source.as_ref(), &rendered.destination)));
    assert!(escapes, "expected a stroke outside the dot box: {:?}", analysis.paths);

    assert!(!rendered.mapped_paths.is_empty());
    for p in rendered.mapped_paths.iter().flatten() {
        assert!(rendered.destination.contains(*p), "{p:?}");
    }
    let margin = rendered.stroke_width as f32 + 1.0;
    let background = rendered.theme.background_rgb();
    for (x, y, px) in rendered.image.enumerate_pixels() {
        if *px == background {
            continue;
        }
        let (x, y) = (x as f32, y as f32);
        assert!(
            x >= rendered.destination.min.x - margin
                && x <= rendered.destination.max.x + margin
                && y >= rendered.destination.min.y - margin
                && y <= rendered.destination.max.y + margin,
            "ink at ({x}, {y}) outside the grid box"
        );
    }

    for (rows, cols) in [(0, 5), (5, 0), (0, 0)] {
        assert!(matches!(
            analysis.custom_grid(&digitizer, rows, cols, None),
            Err(KolamError::InvalidGrid { .. })
        ));
        assert!(custom_grid(&analysis, &params, rows, cols, None).is_err());
    }
}

#[test]
fn corrupt_input_is_a_decode_error() {
    let err = analyze_bytes(b"\x89PNG\r\n\x1a\nbroken", &KolamParams::default()).unwrap_err();
    assert!(matches!(err, KolamError::ImageDecode(_)), "{err}");
}

#[test]
fn large_inputs_report_working_coordinates() {
    let mut img = GrayImage::from_pixel(2400, 1200, Luma([255]));
    draw_filled_rect_mut(&mut img, Rect::at(400, 590).of_size(1600, 20), Luma([0]));
    let mut params = KolamParams::default();
    params.detector.budget_secs = 2.0;
    let analysis = analyze_bytes(&png(&img), &params).expect("analysis");

    let report = analysis.report();
    assert_eq!((report.width, report.height), (1000, 500));
    assert_eq!((report.original_width, report.original_height), (2400, 1200));
    for p in report.paths.iter().flatten() {
        assert!(p.x < 1000 && p.y < 500, "{p:?}");
    }
}
