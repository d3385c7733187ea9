//! Polylines with explicit orientation provenance.

use serde::{Deserialize, Serialize};

use crate::geometry::PixelPoint;

/// One end of a polyline.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathEnd {
    Start,
    End,
}

/// Record of one fragment merged into an [`OrientedPath`].
///
/// `fragment` indexes the input list of the stitch call that built the path.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Splice {
    pub fragment: usize,
    /// Fragment was reversed before joining.
    pub reversed: bool,
    /// Side of the accumulated path the fragment was attached to.
    pub attached_at: PathEnd,
}

/// Ordered polyline of at least two points in detected-image space.
#[derive(Clone, Debug, PartialEq)]
pub struct OrientedPath {
    points: Vec<PixelPoint>,
    provenance: Vec<Splice>,
}

impl OrientedPath {
    /// Wrap `points` as a fresh path with no provenance.
    ///
    /// Returns `None` for fewer than two points.
    pub fn new(points: Vec<PixelPoint>) -> Option<Self> {
        (points.len() >= 2).then_some(Self {
            points,
            provenance: Vec::new(),
        })
    }

    /// Start an accumulator from input fragment `fragment`.
    pub fn seed(fragment: usize, points: Vec<PixelPoint>) -> Self {
        Self {
            points,
            provenance: vec![Splice {
                fragment,
                reversed: false,
                attached_at: PathEnd::End,
            }],
        }
    }

    #[inline]
    pub fn points(&self) -> &[PixelPoint] {
        &self.points
    }

    pub fn into_points(self) -> Vec<PixelPoint> {
        self.points
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn start(&self) -> PixelPoint {
        self.points[0]
    }

    pub fn end(&self) -> PixelPoint {
        self.points[self.points.len() - 1]
    }

    pub fn endpoint(&self, end: PathEnd) -> PixelPoint {
        match end {
            PathEnd::Start => self.start(),
            PathEnd::End => self.end(),
        }
    }

    /// Fragments merged into this path, in splice order.
    pub fn provenance(&self) -> &[Splice] {
        &self.provenance
    }

    /// Whether input fragment `fragment` was reversed while building this path.
    pub fn was_reversed(&self, fragment: usize) -> Option<bool> {
        self.provenance
            .iter()
            .find(|s| s.fragment == fragment)
            .map(|s| s.reversed)
    }

    /// The same polyline walked backwards; provenance is kept as is.
    pub fn reversed(&self) -> Self {
        let mut points = self.points.clone();
        points.reverse();
        Self {
            points,
            provenance: self.provenance.clone(),
        }
    }

    /// Join `points` (input fragment `fragment`) so that its `candidate_end`
    /// touches this path's `at` end.
    ///
    /// The fragment is reversed when both ends are of the same kind, which
    /// keeps the combined point order continuous.
    pub fn splice(
        &mut self,
        at: PathEnd,
        candidate_end: PathEnd,
        fragment: usize,
        mut points: Vec<PixelPoint>,
    ) {
        let reversed = at == candidate_end;
        if reversed {
            points.reverse();
        }
        match at {
            PathEnd::Start => {
                points.extend_from_slice(&self.points);
                self.points = points;
            }
            PathEnd::End => self.points.extend(points),
        }
        self.provenance.push(Splice {
            fragment,
            reversed,
            attached_at: at,
        });
    }

    /// Shift every point by `(dx, dy)`.
    pub fn translate(&mut self, dx: i32, dy: i32) {
        for p in &mut self.points {
            *p = p.translated(dx, dy);
        }
    }
}

impl AsRef<[PixelPoint]> for OrientedPath {
    fn as_ref(&self) -> &[PixelPoint] {
        &self.points
    }
}
