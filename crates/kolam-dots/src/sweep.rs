//! Flat iteration over the circle-sweep parameter grid.

use crate::params::CircleSweepParams;

/// One `(scale, min_distance, sensitivity)` combination.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SweepCandidate {
    /// Index into `CircleSweepParams::scales`; candidates sharing it can
    /// share per-scale precomputation.
    pub scale_index: usize,
    pub scale: f32,
    pub min_distance: f32,
    pub sensitivity: u32,
}

/// Lazily enumerates sweep candidates, scale-major, then min-distance, then
/// sensitivity, each in the order given in the parameters.
#[derive(Clone, Debug)]
pub struct SweepPlan<'a> {
    params: &'a CircleSweepParams,
    next: usize,
}

impl<'a> SweepPlan<'a> {
    pub fn new(params: &'a CircleSweepParams) -> Self {
        Self { params, next: 0 }
    }

    /// Total number of candidates, including already yielded ones.
    pub fn total(&self) -> usize {
        self.params.scales.len() * self.params.min_distances.len() * self.params.sensitivities.len()
    }

    /// Lowest sensitivity in the plan; no readout accepts a peak at or below it.
    pub fn sensitivity_floor(&self) -> u32 {
        self.params.sensitivities.iter().copied().min().unwrap_or(0)
    }
}

impl Iterator for SweepPlan<'_> {
    type Item = SweepCandidate;

    fn next(&mut self) -> Option<SweepCandidate> {
        if self.next >= self.total() {
            return None;
        }
        let n_sens = self.params.sensitivities.len();
        let n_dist = self.params.min_distances.len();
        let i = self.next;
        self.next += 1;

        let sens_i = i % n_sens;
        let dist_i = (i / n_sens) % n_dist;
        let scale_i = i / (n_sens * n_dist);
        Some(SweepCandidate {
            scale_index: scale_i,
            scale: self.params.scales[scale_i],
            min_distance: self.params.min_distances[dist_i],
            sensitivity: self.params.sensitivities[sens_i],
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.total().saturating_sub(self.next);
        (left, Some(left))
    }
}
