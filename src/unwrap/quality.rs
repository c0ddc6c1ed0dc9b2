use std::ops::RangeInclusive;

use ndarray::{Array2, ArrayView2};

use super::{
    Diagnostics, NEIGHBOR_OFFSETS, UnwrapError, UnwrapParams, Unwrapped, Unwrapper, WRAP_PERIOD,
    neighbor, wrap,
};
use crate::mask::Mask;

/// Accepted bucket counts of the edge queue
pub const QUALITY_BINS: RangeInclusive<usize> = 2..=65_536;

/// Region growing along the smoothest edges first.
///
/// Edge quality falls linearly with the wrapped phase difference across
/// the edge. Regions that cannot be reached from the seed are grown from
/// their own seeds and counted as extra pieces.
///
/// Diagnostics: `[processed pixels, pieces]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct QualityGuided;

impl Unwrapper for QualityGuided {
    fn default_params(&self) -> UnwrapParams {
        UnwrapParams::QualityGuided(Default::default())
    }

    fn validate_params(&self, params: &UnwrapParams) -> Result<(), String> {
        match params {
            UnwrapParams::QualityGuided(p) if !QUALITY_BINS.contains(&p.quality_bins) => Err(format!(
                "quality_bins must lie in {}..={}, got {}",
                QUALITY_BINS.start(),
                QUALITY_BINS.end(),
                p.quality_bins
            )),
            UnwrapParams::QualityGuided(_) => Ok(()),
            other => Err(format!(
                "expected quality-guided parameters, got {}",
                other.kind()
            )),
        }
    }

    fn unwrap(
        &self,
        grid: ArrayView2<'_, f32>,
        mask: &Mask,
        params: &UnwrapParams,
    ) -> Result<Unwrapped, UnwrapError> {
        let UnwrapParams::QualityGuided(params) = params else {
            return Err(UnwrapError::UnexpectedParams(params.kind()));
        };

        let seed = match params.seed {
            Some((r, c)) if mask.is_valid(r, c) => Some((r, c)),
            Some(seed) => return Err(UnwrapError::InvalidSeed(seed)),
            None => central_pixel(mask),
        };

        let shape = grid.dim();
        let mut unwrapped = grid.to_owned();
        let mut visited = Array2::from_elem(shape, false);
        let mut queue = BucketQueue::new(params.quality_bins);
        let mut processed = 0usize;
        let mut pieces = 0usize;

        let remaining_seeds = mask
            .view()
            .indexed_iter()
            .filter(|&(_, &valid)| valid)
            .map(|(pixel, _)| pixel)
            .collect::<Vec<_>>();

        for start in seed.into_iter().chain(remaining_seeds) {
            if visited[start] {
                continue;
            }
            pieces += 1;
            visited[start] = true;
            processed += 1;
            push_edges(&mut queue, grid, mask, &visited, start, params.quality_bins);

            while let Some((target, reference)) = queue.pop() {
                if visited[target] {
                    continue;
                }
                unwrapped[target] = unwrapped[reference] + wrap(grid[target] - grid[reference]);
                visited[target] = true;
                processed += 1;
                push_edges(&mut queue, grid, mask, &visited, target, params.quality_bins);
            }
        }

        Ok(Unwrapped {
            grid: unwrapped,
            diagnostics: Diagnostics::new(vec![processed as f64, pieces as f64]),
        })
    }
}

type Edge = ((usize, usize), (usize, usize));

fn push_edges(
    queue: &mut BucketQueue<Edge>,
    grid: ArrayView2<'_, f32>,
    mask: &Mask,
    visited: &Array2<bool>,
    pixel: (usize, usize),
    bins: usize,
) {
    for offset in NEIGHBOR_OFFSETS {
        let Some(next) = neighbor(pixel, offset, grid.dim()) else {
            continue;
        };
        if visited[next] || !mask.is_valid(next.0, next.1) {
            continue;
        }
        let quality = 1.0 - 2.0 * wrap(grid[next] - grid[pixel]).abs() / WRAP_PERIOD;
        let priority = (quality.clamp(0.0, 1.0) * (bins - 1) as f32).round() as usize;
        queue.push(priority, (next, pixel));
    }
}

fn central_pixel(mask: &Mask) -> Option<(usize, usize)> {
    let (height, width) = mask.dim();
    let (cy, cx) = (height / 2, width / 2);
    mask.view()
        .indexed_iter()
        .filter(|&(_, &valid)| valid)
        .min_by_key(|&((r, c), _)| r.abs_diff(cy) + c.abs_diff(cx))
        .map(|(pixel, _)| pixel)
}

/// Bucket-based priority queue with O(1) push and amortized O(1) pop.
///
/// Higher priority is popped first.
struct BucketQueue<T> {
    bins: Vec<Vec<T>>,
    current_priority: isize,
    count: usize,
}

impl<T> BucketQueue<T> {
    fn new(n_bins: usize) -> Self {
        Self {
            bins: (0..n_bins).map(|_| Vec::new()).collect(),
            current_priority: -1,
            count: 0,
        }
    }

    fn push(&mut self, priority: usize, item: T) {
        let priority = priority.min(self.bins.len() - 1);
        self.bins[priority].push(item);
        self.count += 1;
        if priority as isize > self.current_priority {
            self.current_priority = priority as isize;
        }
    }

    fn pop(&mut self) -> Option<T> {
        if self.count == 0 {
            return None;
        }
        while self.current_priority >= 0 && self.bins[self.current_priority as usize].is_empty() {
            self.current_priority -= 1;
        }
        if self.current_priority < 0 {
            return None;
        }
        self.count -= 1;
        self.bins[self.current_priority as usize].pop()
    }
}
