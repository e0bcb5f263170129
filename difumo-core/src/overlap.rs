//! Overlap engine
//!
//! Compares a set of query regions against a set of target regions. The
//! intersection of two regions is the dot product of their weight rows; the
//! overlap proportion divides it by the target's total weight, floored at 1
//! so empty targets never produce NaN.

use crate::error::{CoreError, Result};
use crate::region_map::RegionMap;
use std::cmp::Ordering;

/// Row-major dense matrix of `f64`
#[derive(Debug, Clone, PartialEq)]
pub struct DenseMatrix {
    n_rows: usize,
    n_cols: usize,
    data: Vec<f64>,
}

impl DenseMatrix {
    /// Create a zero-filled matrix
    pub fn zeros(n_rows: usize, n_cols: usize) -> Self {
        Self {
            n_rows,
            n_cols,
            data: vec![0.0; n_rows * n_cols],
        }
    }

    /// Assemble a matrix from equally sized rows
    pub fn from_rows(rows: Vec<Vec<f64>>, n_cols: usize) -> Result<Self> {
        let n_rows = rows.len();
        let mut data = Vec::with_capacity(n_rows * n_cols);
        for row in rows {
            if row.len() != n_cols {
                return Err(CoreError::LengthMismatch {
                    what: "matrix row",
                    expected: n_cols,
                    actual: row.len(),
                });
            }
            data.extend(row);
        }
        Ok(Self {
            n_rows,
            n_cols,
            data,
        })
    }

    /// Number of rows
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Number of columns
    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    /// Value at `(row, col)`
    ///
    /// # Panics
    ///
    /// Panics if the position is out of bounds.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        assert!(row < self.n_rows && col < self.n_cols, "index out of bounds");
        self.data[row * self.n_cols + col]
    }

    /// Borrow one row
    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.n_cols..(row + 1) * self.n_cols]
    }
}

/// One ranked hit: a target region and the value attached to it
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RankedOverlap {
    /// Index of the target region
    pub target: usize,
    /// Proportion or raw intersection, depending on the list
    pub value: f64,
}

/// Result of comparing queries against targets
#[derive(Debug, Clone, PartialEq)]
pub struct OverlapReport {
    /// `n_queries x n_targets` dot products
    pub intersection: DenseMatrix,
    /// Total weight of each target region
    pub target_size: Vec<f64>,
    /// Per query, non-zero proportions sorted descending
    pub overlap_proportion: Vec<Vec<RankedOverlap>>,
    /// Per query, non-zero raw intersections sorted descending
    pub overlap_size: Vec<Vec<RankedOverlap>>,
}

impl OverlapReport {
    /// Number of query regions
    pub fn n_queries(&self) -> usize {
        self.intersection.n_rows()
    }

    /// Number of target regions
    pub fn n_targets(&self) -> usize {
        self.intersection.n_cols()
    }

    /// Strongest proportion hit for a query, if it overlaps anything
    pub fn best(&self, query: usize) -> Option<RankedOverlap> {
        self.overlap_proportion
            .get(query)
            .and_then(|hits| hits.first().copied())
    }

    /// Up to `n` strongest proportion hits for a query
    pub fn top(&self, query: usize, n: usize) -> &[RankedOverlap] {
        match self.overlap_proportion.get(query) {
            Some(hits) => &hits[..hits.len().min(n)],
            None => &[],
        }
    }
}

/// Compute overlaps between `queries` and `targets`
///
/// When `targets` is `None` the queries are compared with themselves.
/// Ties in the rankings are broken by ascending target index.
pub fn overlaps(queries: &RegionMap, targets: Option<&RegionMap>) -> Result<OverlapReport> {
    let targets = targets.unwrap_or(queries);
    if queries.n_voxels() != targets.n_voxels() {
        return Err(CoreError::ShapeMismatch {
            queries: queries.n_voxels(),
            targets: targets.n_voxels(),
        });
    }

    let n_targets = targets.n_regions();
    let target_size = targets.row_sums();
    let by_voxel = targets.by_voxel();

    let rows = intersection_rows(queries, &by_voxel, n_targets);

    let mut overlap_size = Vec::with_capacity(rows.len());
    let mut overlap_proportion = Vec::with_capacity(rows.len());
    for row in &rows {
        overlap_size.push(rank(row.iter().copied().enumerate()));
        overlap_proportion.push(rank(
            row.iter()
                .zip(&target_size)
                .map(|(&value, &size)| value / size.max(1.0))
                .enumerate(),
        ));
    }

    Ok(OverlapReport {
        intersection: DenseMatrix::from_rows(rows, n_targets)?,
        target_size,
        overlap_proportion,
        overlap_size,
    })
}

/// Dot products of one query row against every target
fn intersection_row(
    queries: &RegionMap,
    query: usize,
    by_voxel: &[Vec<(usize, f64)>],
    n_targets: usize,
) -> Vec<f64> {
    let mut acc = vec![0.0; n_targets];
    for (voxel, weight) in queries.row(query).iter() {
        for &(target, target_weight) in &by_voxel[voxel] {
            acc[target] += weight * target_weight;
        }
    }
    acc
}

#[cfg(feature = "parallel")]
fn intersection_rows(
    queries: &RegionMap,
    by_voxel: &[Vec<(usize, f64)>],
    n_targets: usize,
) -> Vec<Vec<f64>> {
    use rayon::prelude::*;

    (0..queries.n_regions())
        .into_par_iter()
        .map(|query| intersection_row(queries, query, by_voxel, n_targets))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn intersection_rows(
    queries: &RegionMap,
    by_voxel: &[Vec<(usize, f64)>],
    n_targets: usize,
) -> Vec<Vec<f64>> {
    (0..queries.n_regions())
        .map(|query| intersection_row(queries, query, by_voxel, n_targets))
        .collect()
}

/// Keep non-zero entries and sort them descending, ties by target index
fn rank<I>(entries: I) -> Vec<RankedOverlap>
where
    I: Iterator<Item = (usize, f64)>,
{
    let mut ranked: Vec<RankedOverlap> = entries
        .filter(|&(_, value)| value != 0.0)
        .map(|(target, value)| RankedOverlap { target, value })
        .collect();

    ranked.sort_by(|a, b| match b.value.total_cmp(&a.value) {
        Ordering::Equal => a.target.cmp(&b.target),
        other => other,
    });
    ranked
}
