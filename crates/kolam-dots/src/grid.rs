//! Grid-size inference from the spatial clustering of dot centers.

use kolam_core::{DotSet, GridSize};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Gap tolerance as a fraction of the median pairwise dot distance.
pub const CLUSTER_TOLERANCE_FACTOR: f32 = 0.3;

/// Grid size with the per-axis evidence it was derived from.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridEstimate {
    pub size: GridSize,
    /// Clusters of y coordinates.
    pub rows: usize,
    /// Clusters of x coordinates.
    pub cols: usize,
    /// Median pairwise center distance, `0` with fewer than two dots.
    pub spacing: f32,
}

/// Square grid size in `[3, 15]` inferred from `dots`.
pub fn estimate_grid_size(dots: &DotSet) -> GridSize {
    estimate_grid(dots).size
}

/// Cluster sorted x and y coordinates with a gap tolerance of
/// `0.3 × median pairwise distance`; the grid size is the larger cluster
/// count, clamped into range. Fewer than two dots give the minimal grid.
#[cfg_attr(feature = "tracing", instrument(level = "debug", skip(dots), fields(dots = dots.len())))]
pub fn estimate_grid(dots: &DotSet) -> GridEstimate {
    if dots.len() < 2 {
        return GridEstimate {
            size: GridSize::default(),
            rows: dots.len(),
            cols: dots.len(),
            spacing: 0.0,
        };
    }

    let centers = dots.centers();
    let mut dists = Vec::with_capacity(centers.len() * (centers.len() - 1) / 2);
    for (i, a) in centers.iter().enumerate() {
        for b in &centers[i + 1..] {
            dists.push(a.distance(*b));
        }
    }
    let spacing = median(&mut dists);
    let tolerance = spacing * CLUSTER_TOLERANCE_FACTOR;

    let cols = count_clusters(centers.iter().map(|p| p.x as f32).collect(), tolerance);
    let rows = count_clusters(centers.iter().map(|p| p.y as f32).collect(), tolerance);
    let size = GridSize::clamped(rows.max(cols));
    log::debug!(
        "grid: {rows} rows × {cols} cols, spacing {spacing:.1}px -> {}",
        size.get()
    );
    GridEstimate {
        size,
        rows,
        cols,
        spacing,
    }
}

/// Midpoint-averaged median; `values` must be non-empty.
fn median(values: &mut [f32]) -> f32 {
    values.sort_by(f32::total_cmp);
    let n = values.len();
    if n % 2 == 1 {
        values[n / 2]
    } else {
        0.5 * (values[n / 2 - 1] + values[n / 2])
    }
}

/// Greedy 1D clustering: a value joins the current cluster while its gap to
/// the previous value is below `tolerance`.
fn count_clusters(mut values: Vec<f32>, tolerance: f32) -> usize {
    if values.is_empty() {
        return 0;
    }
    values.sort_by(f32::total_cmp);
    let mut count = 1;
    for w in values.windows(2) {
        if w[1] - w[0] >= tolerance {
            count += 1;
        }
    }
    count
}
