use std::collections::VecDeque;

use ndarray::{Array2, ArrayView2};

use super::{
    Diagnostics, NEIGHBOR_OFFSETS, UnwrapError, UnwrapParams, Unwrapped, Unwrapper, WRAP_PERIOD,
    neighbor, wrap,
};
use crate::mask::Mask;

/// Branch-cut unwrapping after Goldstein, Zebker and Werner.
///
/// Residues are balanced by cuts to the nearest residues of opposite
/// charge or to the border, then every region bounded by cuts is flood
/// filled on its own.
///
/// Diagnostics: `[residues, cut pixels, pieces]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Goldstein;

impl Unwrapper for Goldstein {
    fn default_params(&self) -> UnwrapParams {
        UnwrapParams::Goldstein(Default::default())
    }

    fn validate_params(&self, params: &UnwrapParams) -> Result<(), String> {
        match params {
            UnwrapParams::Goldstein(p) if p.max_box_radius == 0 => {
                Err("max_box_radius must be at least 1".to_owned())
            }
            UnwrapParams::Goldstein(_) => Ok(()),
            other => Err(format!("expected goldstein parameters, got {}", other.kind())),
        }
    }

    fn unwrap(
        &self,
        grid: ArrayView2<'_, f32>,
        mask: &Mask,
        params: &UnwrapParams,
    ) -> Result<Unwrapped, UnwrapError> {
        let UnwrapParams::Goldstein(params) = params else {
            return Err(UnwrapError::UnexpectedParams(params.kind()));
        };

        let residues = residues(grid, mask);
        let residue_count = residues.iter().filter(|&&charge| charge != 0).count();
        let cuts = branch_cuts(&residues, grid.dim(), params.max_box_radius);
        let cut_count = cuts.iter().filter(|&&cut| cut).count();

        let (grid, pieces) = flood_fill(grid, mask, &cuts);

        Ok(Unwrapped {
            grid,
            diagnostics: Diagnostics::new(vec![
                residue_count as f64,
                cut_count as f64,
                pieces as f64,
            ]),
        })
    }
}

/// Charge of every 2x2 loop whose corners are all valid, indexed by the
/// loop's top-left pixel.
fn residues(grid: ArrayView2<'_, f32>, mask: &Mask) -> Array2<i8> {
    let (height, width) = grid.dim();
    let loops = (height.saturating_sub(1), width.saturating_sub(1));

    Array2::from_shape_fn(loops, |(r, c)| {
        let corners = [(r, c), (r, c + 1), (r + 1, c + 1), (r + 1, c)];
        if !corners.iter().all(|&(y, x)| mask.is_valid(y, x)) {
            return 0;
        }
        let circulation: f32 = (0..4)
            .map(|i| wrap(grid[corners[(i + 1) % 4]] - grid[corners[i]]))
            .sum();
        (circulation / WRAP_PERIOD).round() as i8
    })
}

fn branch_cuts(residues: &Array2<i8>, shape: (usize, usize), max_radius: usize) -> Array2<bool> {
    let mut cuts = Array2::from_elem(shape, false);
    let mut balanced = Array2::from_elem(residues.dim(), false);
    let (rows, cols) = residues.dim();

    for ((r, c), &charge) in residues.indexed_iter() {
        if charge == 0 || balanced[(r, c)] {
            continue;
        }
        balanced[(r, c)] = true;
        cuts[(r, c)] = true;
        let mut total = i32::from(charge);

        for radius in 1..=max_radius {
            for (rr, cc) in ring((r, c), radius) {
                if total == 0 {
                    break;
                }
                if rr >= rows || cc >= cols {
                    continue;
                }
                let other = residues[(rr, cc)];
                if other != 0 && !balanced[(rr, cc)] {
                    balanced[(rr, cc)] = true;
                    total += i32::from(other);
                    draw_cut(&mut cuts, (r, c), (rr, cc));
                }
            }
            if total == 0 {
                break;
            }
            if r < radius || c < radius || r + radius >= rows || c + radius >= cols {
                draw_cut(&mut cuts, (r, c), nearest_border((r, c), shape));
                total = 0;
                break;
            }
        }

        if total != 0 {
            draw_cut(&mut cuts, (r, c), nearest_border((r, c), shape));
        }
    }

    cuts
}

/// Pixels on the perimeter of the box of half-width `radius` around `center`.
fn ring(center: (usize, usize), radius: usize) -> impl Iterator<Item = (usize, usize)> {
    let radius = radius as isize;
    (-radius..=radius)
        .flat_map(move |dr| (-radius..=radius).map(move |dc| (dr, dc)))
        .filter(move |&(dr, dc)| dr.abs() == radius || dc.abs() == radius)
        .filter_map(move |(dr, dc)| {
            Some((
                center.0.checked_add_signed(dr)?,
                center.1.checked_add_signed(dc)?,
            ))
        })
}

fn nearest_border((r, c): (usize, usize), (height, width): (usize, usize)) -> (usize, usize) {
    let candidates = [
        (r, (r, c)),
        (height - 1 - r, (height - 1, c)),
        (c, (r, 0)),
        (width - 1 - c, (r, width - 1)),
    ];
    candidates
        .into_iter()
        .min_by_key(|&(distance, _)| distance)
        .map(|(_, point)| point)
        .unwrap_or((r, c))
}

fn draw_cut(cuts: &mut Array2<bool>, from: (usize, usize), to: (usize, usize)) {
    let (r0, c0) = (from.0 as f32, from.1 as f32);
    let (dr, dc) = (to.0 as f32 - r0, to.1 as f32 - c0);
    let steps = dr.abs().max(dc.abs()) as usize;

    for step in 0..=steps {
        let t = if steps == 0 { 0.0 } else { step as f32 / steps as f32 };
        let point = ((r0 + t * dr).round() as usize, (c0 + t * dc).round() as usize);
        if let Some(cut) = cuts.get_mut(point) {
            *cut = true;
        }
    }
}

/// Unwraps every cut-free region independently, then attaches the cut
/// pixels to an already unwrapped neighbor. Returns the grid and the
/// number of regions.
fn flood_fill(grid: ArrayView2<'_, f32>, mask: &Mask, cuts: &Array2<bool>) -> (Array2<f32>, usize) {
    let shape = grid.dim();
    let mut unwrapped = grid.to_owned();
    let mut visited = Array2::from_elem(shape, false);
    let mut queue = VecDeque::new();
    let mut pieces = 0;

    for ((r, c), &cut) in cuts.indexed_iter() {
        if cut || visited[(r, c)] || !mask.is_valid(r, c) {
            continue;
        }
        pieces += 1;
        visited[(r, c)] = true;
        queue.push_back((r, c));

        while let Some(pixel) = queue.pop_front() {
            for offset in NEIGHBOR_OFFSETS {
                let Some(next) = neighbor(pixel, offset, shape) else {
                    continue;
                };
                if visited[next] || cuts[next] || !mask.is_valid(next.0, next.1) {
                    continue;
                }
                unwrapped[next] = unwrapped[pixel] + wrap(grid[next] - grid[pixel]);
                visited[next] = true;
                queue.push_back(next);
            }
        }
    }

    loop {
        let mut changed = false;
        for ((r, c), &cut) in cuts.indexed_iter() {
            if !cut || visited[(r, c)] || !mask.is_valid(r, c) {
                continue;
            }
            let reference = NEIGHBOR_OFFSETS
                .iter()
                .filter_map(|&offset| neighbor((r, c), offset, shape))
                .find(|&n| visited[n]);
            if let Some(n) = reference {
                unwrapped[(r, c)] = unwrapped[n] + wrap(grid[(r, c)] - grid[n]);
                visited[(r, c)] = true;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    (unwrapped, pieces)
}
