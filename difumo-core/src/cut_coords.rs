//! Cut coordinates for displaying a component
//!
//! The strongest voxels of a map (top 20% of non-zero magnitudes) are
//! reduced to their largest 6-connected blob. When more than
//! [`MIN_REFINED_VOXELS`] voxels of that blob exceed its mean magnitude, the
//! blob is narrowed to the largest connected set of those. The weighted
//! centre of mass of what remains gives the world position used to centre
//! slices.

use crate::grid::Volume;
use std::collections::VecDeque;

/// Fraction of non-zero magnitudes below the selection threshold
const PERCENTILE: f64 = 0.8;

/// Voxels needed above the blob mean before the blob is narrowed
const MIN_REFINED_VOXELS: usize = 50;

/// World coordinates `[x, y, z]` on which to centre views of `volume`
pub fn find_xyz_cut_coords(volume: &Volume) -> [f64; 3] {
    let grid = volume.grid();
    let magnitudes: Vec<f64> = volume.data().iter().map(|v| v.abs()).collect();

    let mut nonzero: Vec<f64> = magnitudes.iter().copied().filter(|&v| v > 0.0).collect();
    if nonzero.is_empty() {
        let centre = grid.shape.map(|n| n.saturating_sub(1) as f64 / 2.0);
        return grid.affine.apply(centre);
    }

    nonzero.sort_by(|a, b| a.total_cmp(b));
    let threshold = nonzero[((nonzero.len() - 1) as f64 * PERCENTILE).floor() as usize];

    let selected: Vec<bool> = magnitudes.iter().map(|&v| v > 0.0 && v >= threshold).collect();
    let mut blob = largest_component(&selected, grid.shape);

    let mean = blob.iter().map(|&index| magnitudes[index]).sum::<f64>() / blob.len() as f64;
    let mut strong = vec![false; magnitudes.len()];
    let mut n_strong = 0;
    for &index in &blob {
        if magnitudes[index] > mean {
            strong[index] = true;
            n_strong += 1;
        }
    }
    if n_strong > MIN_REFINED_VOXELS {
        blob = largest_component(&strong, grid.shape);
    }

    let mut total = 0.0;
    let mut centre = [0.0; 3];
    for index in blob {
        let weight = magnitudes[index];
        let [i, j, k] = grid.unflatten(index);
        centre[0] += weight * i as f64;
        centre[1] += weight * j as f64;
        centre[2] += weight * k as f64;
        total += weight;
    }

    grid.affine.apply(centre.map(|c| c / total))
}

/// Flat indices of the largest 6-connected set of selected voxels
///
/// Ties go to the component found first in flat order.
fn largest_component(selected: &[bool], shape: [usize; 3]) -> Vec<usize> {
    let mut visited = vec![false; selected.len()];
    let mut best: Vec<usize> = Vec::new();
    let mut queue = VecDeque::new();

    for start in 0..selected.len() {
        if !selected[start] || visited[start] {
            continue;
        }

        let mut component = Vec::new();
        visited[start] = true;
        queue.push_back(start);

        while let Some(index) = queue.pop_front() {
            component.push(index);
            for neighbour in neighbours(index, shape) {
                if selected[neighbour] && !visited[neighbour] {
                    visited[neighbour] = true;
                    queue.push_back(neighbour);
                }
            }
        }

        if component.len() > best.len() {
            best = component;
        }
    }

    best
}

fn neighbours(index: usize, shape: [usize; 3]) -> impl Iterator<Item = usize> {
    let [nx, ny, nz] = shape;
    let i = index % nx;
    let j = (index / nx) % ny;
    let k = index / (nx * ny);
    let plane = nx * ny;

    [
        (i > 0).then(|| index - 1),
        (i + 1 < nx).then(|| index + 1),
        (j > 0).then(|| index - nx),
        (j + 1 < ny).then(|| index + nx),
        (k > 0).then(|| index - plane),
        (k + 1 < nz).then(|| index + plane),
    ]
    .into_iter()
    .flatten()
}
