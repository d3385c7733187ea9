use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Integer pixel coordinate in the space of one specific raster.
///
/// Serialized as a `[x, y]` pair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[i32; 2]", into = "[i32; 2]")]
pub struct PixelPoint {
    pub x: i32,
    pub y: i32,
}

impl PixelPoint {
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn distance_sq(self, other: PixelPoint) -> f32 {
        let dx = (self.x - other.x) as f32;
        let dy = (self.y - other.y) as f32;
        dx * dx + dy * dy
    }

    #[inline]
    pub fn distance(self, other: PixelPoint) -> f32 {
        self.distance_sq(other).sqrt()
    }

    #[inline]
    pub fn translated(self, dx: i32, dy: i32) -> PixelPoint {
        PixelPoint::new(self.x + dx, self.y + dy)
    }

    #[inline]
    pub fn to_point2(self) -> Point2<f32> {
        Point2::new(self.x as f32, self.y as f32)
    }
}

impl From<[i32; 2]> for PixelPoint {
    fn from([x, y]: [i32; 2]) -> Self {
        Self { x, y }
    }
}

impl From<PixelPoint> for [i32; 2] {
    fn from(p: PixelPoint) -> Self {
        [p.x, p.y]
    }
}

impl From<(i32, i32)> for PixelPoint {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned bounding box in `f32` coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Point2<f32>,
    pub max: Point2<f32>,
}

impl BoundingBox {
    /// Smallest box containing all `points`, or `None` for an empty input.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Point2<f32>>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bbox = BoundingBox {
            min: first,
            max: first,
        };
        for p in iter {
            bbox.min.x = bbox.min.x.min(p.x);
            bbox.min.y = bbox.min.y.min(p.y);
            bbox.max.x = bbox.max.x.max(p.x);
            bbox.max.y = bbox.max.y.max(p.y);
        }
        Some(bbox)
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    /// Clamp a point into the box (inclusive on both ends).
    #[inline]
    pub fn clamp(&self, p: Point2<f32>) -> Point2<f32> {
        Point2::new(
            p.x.clamp(self.min.x, self.max.x),
            p.y.clamp(self.min.y, self.max.y),
        )
    }

    #[inline]
    pub fn contains(&self, p: Point2<f32>) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }
}

/// Which detection method accepted a dot.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DotSource {
    /// Circle-accumulator transform (Method A).
    Circle,
    /// Circular contour blob (Method B).
    Blob,
}

/// One detected anchor dot in detected-image space.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Dot {
    pub center: PixelPoint,
    /// Radius estimate in pixels, used for annotation only.
    pub radius: f32,
    pub source: DotSource,
}

/// Deduplicated collection of dots.
///
/// Deduplication is the detector's job; this type only stores the result
/// in acceptance order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DotSet {
    dots: Vec<Dot>,
}

impl DotSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_dots(dots: Vec<Dot>) -> Self {
        Self { dots }
    }

    /// Build a set from bare centers, tagged as circle hits with zero radius.
    pub fn from_centers<I>(centers: I) -> Self
    where
        I: IntoIterator<Item = PixelPoint>,
    {
        Self {
            dots: centers
                .into_iter()
                .map(|center| Dot {
                    center,
                    radius: 0.0,
                    source: DotSource::Circle,
                })
                .collect(),
        }
    }

    pub fn push(&mut self, dot: Dot) {
        self.dots.push(dot);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.dots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dots.is_empty()
    }

    pub fn dots(&self) -> &[Dot] {
        &self.dots
    }

    pub fn iter(&self) -> impl Iterator<Item = &Dot> {
        self.dots.iter()
    }

    pub fn centers(&self) -> Vec<PixelPoint> {
        self.dots.iter().map(|d| d.center).collect()
    }

    pub fn by_source(&self, source: DotSource) -> impl Iterator<Item = &Dot> {
        self.dots.iter().filter(move |d| d.source == source)
    }

    /// Min/max of dot centers per axis.
    pub fn bounds(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(self.dots.iter().map(|d| d.center.to_point2()))
    }
}

/// Inferred square grid size, always within `[GridSize::MIN, GridSize::MAX]`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct GridSize(u32);

impl GridSize {
    pub const MIN: u32 = 3;
    pub const MAX: u32 = 15;

    /// Clamp any count into the valid range.
    pub fn clamped(n: usize) -> Self {
        let n = n.clamp(Self::MIN as usize, Self::MAX as usize);
        Self(n as u32)
    }

    /// Validate an explicit size without clamping.
    pub fn new(n: u32) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&n).then_some(Self(n))
    }

    #[inline]
    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for GridSize {
    fn default() -> Self {
        Self(Self::MIN)
    }
}

impl TryFrom<u32> for GridSize {
    type Error = String;

    fn try_from(n: u32) -> Result<Self, Self::Error> {
        GridSize::new(n).ok_or_else(|| {
            format!(
                "grid size {n} outside [{}, {}]",
                GridSize::MIN,
                GridSize::MAX
            )
        })
    }
}

impl From<GridSize> for u32 {
    fn from(g: GridSize) -> Self {
        g.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_point_serializes_as_pair() {
        let p = PixelPoint::new(3, -4);
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, "[3,-4]");
        let back: PixelPoint = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn bounds_of_empty_set_is_none() {
        assert!(DotSet::new().bounds().is_none());
    }

    #[test]
    fn bounds_cover_all_centers() {
        let set = DotSet::from_centers([
            PixelPoint::new(10, 40),
            PixelPoint::new(-2, 5),
            PixelPoint::new(7, 90),
        ]);
        let b = set.bounds().unwrap();
        assert_eq!(b.min, Point2::new(-2.0, 5.0));
        assert_eq!(b.max, Point2::new(10.0, 90.0));
    }

    #[test]
    fn grid_size_clamps_and_validates() {
        assert_eq!(GridSize::clamped(0).get(), 3);
        assert_eq!(GridSize::clamped(8).get(), 8);
        assert_eq!(GridSize::clamped(40).get(), 15);
        assert!(GridSize::new(2).is_none());
        assert!(GridSize::new(16).is_none());
        assert_eq!(GridSize::new(4).map(GridSize::get), Some(4));
        assert!(serde_json::from_str::<GridSize>("20").is_err());
    }
}
