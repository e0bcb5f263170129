//! Sparse region maps
//!
//! A region map is an `n_regions x n_voxels` matrix of non-negative weights.
//! Rows are stored compressed: for each region only the voxels with a
//! non-zero weight are kept, in ascending voxel order.

use crate::error::{CoreError, Result};

/// Row-compressed matrix of per-voxel region weights
#[derive(Debug, Clone, PartialEq)]
pub struct RegionMap {
    n_voxels: usize,
    /// `row_offsets[r]..row_offsets[r + 1]` spans the entries of region `r`
    row_offsets: Vec<usize>,
    voxels: Vec<usize>,
    weights: Vec<f64>,
}

/// Borrowed view of one region
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionRow<'a> {
    /// Sorted voxel indices with a non-zero weight
    pub voxels: &'a [usize],
    /// Weights aligned with `voxels`
    pub weights: &'a [f64],
}

impl<'a> RegionRow<'a> {
    /// Iterate over `(voxel, weight)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + 'a {
        let (voxels, weights) = (self.voxels, self.weights);
        voxels.iter().copied().zip(weights.iter().copied())
    }

    /// Total weight of the region
    pub fn sum(&self) -> f64 {
        self.weights.iter().sum()
    }

    /// Number of voxels with a non-zero weight
    pub fn nnz(&self) -> usize {
        self.voxels.len()
    }
}

impl RegionMap {
    /// Create a map with no regions over `n_voxels` voxels
    pub fn empty(n_voxels: usize) -> Self {
        Self {
            n_voxels,
            row_offsets: vec![0],
            voxels: Vec::new(),
            weights: Vec::new(),
        }
    }

    /// Build a map from dense rows, all of the same length
    pub fn from_dense_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self> {
        let n_voxels = rows.first().map(|row| row.as_ref().len()).unwrap_or(0);
        let mut map = Self::empty(n_voxels);

        for row in rows {
            map.push_dense_row(row.as_ref())?;
        }

        Ok(map)
    }

    /// Build a map from a row-major dense buffer
    pub fn from_dense(data: &[f64], n_regions: usize, n_voxels: usize) -> Result<Self> {
        let expected = n_regions * n_voxels;
        if data.len() != expected {
            return Err(CoreError::LengthMismatch {
                what: "dense region map",
                expected,
                actual: data.len(),
            });
        }

        let mut map = Self::empty(n_voxels);
        if n_voxels > 0 {
            for row in data.chunks(n_voxels) {
                map.push_dense_row(row)?;
            }
        } else {
            for _ in 0..n_regions {
                map.push_sparse_row(std::iter::empty())?;
            }
        }

        Ok(map)
    }

    /// Append a region given as a dense weight vector
    pub fn push_dense_row(&mut self, row: &[f64]) -> Result<()> {
        if row.len() != self.n_voxels {
            return Err(CoreError::LengthMismatch {
                what: "region row",
                expected: self.n_voxels,
                actual: row.len(),
            });
        }

        self.push_sparse_row(row.iter().copied().enumerate())
    }

    /// Append a region given as `(voxel, weight)` entries
    ///
    /// Entries may come in any order; duplicates are summed and zero
    /// weights dropped.
    pub fn push_sparse_row<I>(&mut self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (usize, f64)>,
    {
        let row = self.n_regions();
        let mut collected: Vec<(usize, f64)> = Vec::new();

        for (voxel, weight) in entries {
            if voxel >= self.n_voxels {
                return Err(CoreError::VoxelOutOfRange {
                    row,
                    voxel,
                    n_voxels: self.n_voxels,
                });
            }
            if !weight.is_finite() {
                return Err(CoreError::NonFiniteWeight { row, voxel });
            }
            if weight != 0.0 {
                collected.push((voxel, weight));
            }
        }

        collected.sort_by_key(|&(voxel, _)| voxel);

        let mut last: Option<usize> = None;
        for (voxel, weight) in collected {
            if last == Some(voxel) {
                if let Some(w) = self.weights.last_mut() {
                    *w += weight;
                }
            } else {
                self.voxels.push(voxel);
                self.weights.push(weight);
                last = Some(voxel);
            }
        }

        self.row_offsets.push(self.voxels.len());
        Ok(())
    }

    /// Number of regions (rows)
    pub fn n_regions(&self) -> usize {
        self.row_offsets.len() - 1
    }

    /// Number of voxels (columns)
    pub fn n_voxels(&self) -> usize {
        self.n_voxels
    }

    /// Number of stored non-zero weights
    pub fn nnz(&self) -> usize {
        self.weights.len()
    }

    /// Borrow one region
    ///
    /// # Panics
    ///
    /// Panics if `index >= n_regions()`.
    pub fn row(&self, index: usize) -> RegionRow<'_> {
        let span = self.row_offsets[index]..self.row_offsets[index + 1];
        RegionRow {
            voxels: &self.voxels[span.clone()],
            weights: &self.weights[span],
        }
    }

    /// Iterate over all regions in order
    pub fn rows(&self) -> impl Iterator<Item = RegionRow<'_>> {
        (0..self.n_regions()).map(move |index| self.row(index))
    }

    /// Total weight of every region
    pub fn row_sums(&self) -> Vec<f64> {
        self.rows().map(|row| row.sum()).collect()
    }

    /// Expand one region back to a dense vector
    pub fn dense_row(&self, index: usize) -> Vec<f64> {
        let mut dense = vec![0.0; self.n_voxels];
        for (voxel, weight) in self.row(index).iter() {
            dense[voxel] = weight;
        }
        dense
    }

    /// Voxel-major view: for each voxel, the regions covering it
    pub(crate) fn by_voxel(&self) -> Vec<Vec<(usize, f64)>> {
        let mut columns: Vec<Vec<(usize, f64)>> = vec![Vec::new(); self.n_voxels];
        for (region, row) in self.rows().enumerate() {
            for (voxel, weight) in row.iter() {
                columns[voxel].push((region, weight));
            }
        }
        columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_dense_rows_drops_zeros() {
        let map = RegionMap::from_dense_rows(&[vec![0.0, 2.0, 0.0], vec![1.0, 0.0, 3.0]]).unwrap();

        assert_eq!(map.n_regions(), 2);
        assert_eq!(map.n_voxels(), 3);
        assert_eq!(map.nnz(), 3);
        assert_eq!(map.row(0).voxels, &[1]);
        assert_eq!(map.row(1).voxels, &[0, 2]);
        assert_eq!(map.row_sums(), vec![2.0, 4.0]);
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let result = RegionMap::from_dense_rows(&[vec![1.0, 0.0], vec![1.0]]);
        assert!(matches!(
            result,
            Err(CoreError::LengthMismatch {
                what: "region row",
                expected: 2,
                actual: 1,
            })
        ));
    }

    #[test]
    fn test_sparse_row_sorted_and_merged() {
        let mut map = RegionMap::empty(5);
        map.push_sparse_row(vec![(4, 1.0), (1, 0.5), (4, 2.0), (2, 0.0)])
            .unwrap();

        let row = map.row(0);
        assert_eq!(row.voxels, &[1, 4]);
        assert_eq!(row.weights, &[0.5, 3.0]);
    }

    #[test]
    fn test_sparse_row_out_of_range() {
        let mut map = RegionMap::empty(3);
        let err = map.push_sparse_row(vec![(3, 1.0)]).unwrap_err();
        assert_eq!(
            err,
            CoreError::VoxelOutOfRange {
                row: 0,
                voxel: 3,
                n_voxels: 3
            }
        );
    }

    #[test]
    fn test_non_finite_weight_rejected() {
        let result = RegionMap::from_dense_rows(&[vec![1.0, f64::NAN]]);
        assert_eq!(
            result.unwrap_err(),
            CoreError::NonFiniteWeight { row: 0, voxel: 1 }
        );
    }

    #[test]
    fn test_from_dense_length_check() {
        let result = RegionMap::from_dense(&[1.0, 2.0, 3.0], 2, 2);
        assert!(matches!(result, Err(CoreError::LengthMismatch { .. })));

        let map = RegionMap::from_dense(&[1.0, 0.0, 0.0, 4.0], 2, 2).unwrap();
        assert_eq!(map.dense_row(1), vec![0.0, 4.0]);
    }

    #[test]
    fn test_by_voxel_lists_covering_regions() {
        let map = RegionMap::from_dense_rows(&[vec![1.0, 1.0], vec![0.0, 2.0]]).unwrap();
        let columns = map.by_voxel();

        assert_eq!(columns[0], vec![(0, 1.0)]);
        assert_eq!(columns[1], vec![(0, 1.0), (1, 2.0)]);
    }

    #[test]
    fn test_empty_map() {
        let map = RegionMap::from_dense_rows::<Vec<f64>>(&[]).unwrap();
        assert_eq!(map.n_regions(), 0);
        assert_eq!(map.n_voxels(), 0);
        assert!(map.row_sums().is_empty());
    }
}
