//! Greedy endpoint stitching of path fragments.

use kolam_core::{OrientedPath, PathEnd, PixelPoint};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::params::StitchParams;

const ENDS: [PathEnd; 2] = [PathEnd::Start, PathEnd::End];

/// Closest endpoint pair of `acc` and `candidate` strictly within `threshold`,
/// as `(accumulator end, candidate end)`.
///
/// Ties go to the first pair in `start/start, start/end, end/start, end/end`
/// order.
fn closest_join(acc: &OrientedPath, candidate: &[PixelPoint], threshold: f32) -> Option<(PathEnd, PathEnd)> {
    let (first, last) = (candidate.first()?, candidate.last()?);
    let limit = threshold * threshold;
    let mut best: Option<(f32, PathEnd, PathEnd)> = None;
    for a in ENDS {
        let p = acc.endpoint(a);
        for c in ENDS {
            let q = match c {
                PathEnd::Start => *first,
                PathEnd::End => *last,
            };
            let d = p.distance_sq(q);
            if d < limit && best.is_none_or(|(bd, _, _)| d < bd) {
                best = Some((d, a, c));
            }
        }
    }
    best.map(|(_, a, c)| (a, c))
}

/// Merge fragments whose endpoints are within `params.threshold` pixels.
///
/// Fragments are taken as seeds in input order. Each seed absorbs, one at a
/// time, the first unconsumed fragment (in input order) that has an endpoint
/// near one of its current endpoints, joining at the closest endpoint pair
/// and reversing the fragment when needed to keep the point order
/// continuous. A seed is emitted when nothing else qualifies. Fragments with
/// fewer than two points are dropped.
///
/// The result is order dependent but stable: stitching it again changes
/// nothing.
#[cfg_attr(feature = "tracing", instrument(level = "debug", skip_all, fields(fragments = fragments.len())))]
pub fn stitch_paths(fragments: Vec<Vec<PixelPoint>>, params: &StitchParams) -> Vec<OrientedPath> {
    let mut pool: Vec<Option<Vec<PixelPoint>>> = fragments
        .into_iter()
        .map(|f| (f.len() >= 2).then_some(f))
        .collect();
    let mut out = Vec::new();

    for seed in 0..pool.len() {
        let Some(points) = pool[seed].take() else {
            continue;
        };
        let mut acc = OrientedPath::seed(seed, points);
        loop {
            let next = pool.iter().enumerate().find_map(|(j, cand)| {
                let cand = cand.as_ref()?;
                closest_join(&acc, cand, params.threshold).map(|join| (j, join))
            });
            let Some((j, (at, cand_end))) = next else {
                break;
            };
            if let Some(points) = pool[j].take() {
                acc.splice(at, cand_end, j, points);
            }
        }
        out.push(acc);
    }
    out
}

/// Stitch already oriented paths again; their provenance is replaced.
pub fn restitch(paths: Vec<OrientedPath>, params: &StitchParams) -> Vec<OrientedPath> {
    stitch_paths(paths.into_iter().map(OrientedPath::into_points).collect(), params)
}
