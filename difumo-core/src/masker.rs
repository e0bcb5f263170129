//! Masker: maps volumes to in-mask voxel vectors
//!
//! Region maps only hold voxels inside a mask. The masker remembers which
//! flat grid indices those are, so that every atlas transformed through the
//! same masker shares its columns.

use crate::error::{CoreError, Result};
use crate::grid::{Volume, VolumeStack, VoxelGrid};
use crate::region_map::RegionMap;

/// Grid plus the ordered set of voxels inside the mask
#[derive(Debug, Clone, PartialEq)]
pub struct Masker {
    grid: VoxelGrid,
    voxels: Vec<usize>,
}

impl Masker {
    /// Keep every voxel of `grid`
    pub fn full(grid: VoxelGrid) -> Self {
        Self {
            voxels: (0..grid.n_voxels()).collect(),
            grid,
        }
    }

    /// Keep voxels where `mask` is non-zero
    pub fn from_volume(mask: &Volume) -> Self {
        let voxels = mask
            .data()
            .iter()
            .enumerate()
            .filter(|&(_, &value)| value != 0.0)
            .map(|(index, _)| index)
            .collect();
        Self {
            grid: *mask.grid(),
            voxels,
        }
    }

    /// Keep voxels of `grid` where any volume of any stack is non-zero
    ///
    /// Every stack must already lie on `grid`.
    pub fn from_stacks_support(grid: VoxelGrid, stacks: &[&VolumeStack]) -> Result<Self> {
        let mut support = vec![false; grid.n_voxels()];
        for stack in stacks {
            if !grid.matches(stack.grid()) {
                return Err(CoreError::GridMismatch {
                    expected: grid.shape,
                    actual: stack.grid().shape,
                });
            }
            for volume in stack.iter_volumes() {
                for (index, &value) in volume.iter().enumerate() {
                    if value != 0.0 {
                        support[index] = true;
                    }
                }
            }
        }
        Ok(Self {
            grid,
            voxels: support
                .iter()
                .enumerate()
                .filter(|&(_, &inside)| inside)
                .map(|(index, _)| index)
                .collect(),
        })
    }

    /// Grid the mask is defined on
    pub fn grid(&self) -> &VoxelGrid {
        &self.grid
    }

    /// Flat grid indices of in-mask voxels, ascending
    pub fn voxels(&self) -> &[usize] {
        &self.voxels
    }

    /// Number of in-mask voxels
    pub fn n_voxels(&self) -> usize {
        self.voxels.len()
    }

    fn check_grid(&self, grid: &VoxelGrid) -> Result<()> {
        if !self.grid.matches(grid) {
            return Err(CoreError::GridMismatch {
                expected: self.grid.shape,
                actual: grid.shape,
            });
        }
        Ok(())
    }

    /// Extract the in-mask samples of a volume
    pub fn transform(&self, volume: &Volume) -> Result<Vec<f64>> {
        self.check_grid(volume.grid())?;
        Ok(self.gather(volume.data()))
    }

    /// Turn every volume of a stack into one region map row
    pub fn transform_stack(&self, stack: &VolumeStack) -> Result<RegionMap> {
        self.check_grid(stack.grid())?;
        let mut map = RegionMap::empty(self.n_voxels());
        for volume in stack.iter_volumes() {
            map.push_sparse_row(
                self.voxels
                    .iter()
                    .enumerate()
                    .map(|(column, &index)| (column, volume[index])),
            )?;
        }
        Ok(map)
    }

    /// Scatter in-mask samples back into a full volume (zeros elsewhere)
    pub fn inverse_transform(&self, values: &[f64]) -> Result<Volume> {
        if values.len() != self.n_voxels() {
            return Err(CoreError::LengthMismatch {
                what: "masked samples",
                expected: self.n_voxels(),
                actual: values.len(),
            });
        }
        let mut data = vec![0.0; self.grid.n_voxels()];
        for (&index, &value) in self.voxels.iter().zip(values) {
            data[index] = value;
        }
        Volume::new(self.grid, data)
    }

    fn gather(&self, data: &[f64]) -> Vec<f64> {
        self.voxels.iter().map(|&index| data[index]).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Affine;

    fn grid() -> VoxelGrid {
        VoxelGrid::new([2, 2, 1], Affine::identity())
    }

    #[test]
    fn test_mask_from_volume() {
        let mask = Volume::new(grid(), vec![0.0, 1.0, 1.0, 0.0]).unwrap();
        let masker = Masker::from_volume(&mask);

        assert_eq!(masker.voxels(), &[1, 2]);
        let data = Volume::new(grid(), vec![9.0, 8.0, 7.0, 6.0]).unwrap();
        assert_eq!(masker.transform(&data).unwrap(), vec![8.0, 7.0]);
    }

    #[test]
    fn test_transform_rejects_other_grid() {
        let masker = Masker::full(grid());
        let other = Volume::new(VoxelGrid::new([4, 1, 1], Affine::identity()), vec![0.0; 4]).unwrap();
        assert!(matches!(
            masker.transform(&other),
            Err(CoreError::GridMismatch { .. })
        ));
    }

    #[test]
    fn test_stack_support_and_transform() {
        let stack = VolumeStack::new(
            grid(),
            2,
            vec![0.0, 0.5, 0.0, 0.0, 0.0, 0.0, 0.0, 2.0],
        )
        .unwrap();
        let masker = Masker::from_stacks_support(grid(), &[&stack]).unwrap();
        assert_eq!(masker.voxels(), &[1, 3]);

        let map = masker.transform_stack(&stack).unwrap();
        assert_eq!(map.n_regions(), 2);
        assert_eq!(map.n_voxels(), 2);
        assert_eq!(map.dense_row(0), vec![0.5, 0.0]);
        assert_eq!(map.dense_row(1), vec![0.0, 2.0]);
    }

    #[test]
    fn test_support_is_union_of_stacks() {
        let narrow = VolumeStack::new(grid(), 1, vec![1.0, 0.0, 0.0, 0.0]).unwrap();
        let wide = VolumeStack::new(grid(), 1, vec![0.0, 0.0, -1.0, 3.0]).unwrap();

        let masker = Masker::from_stacks_support(grid(), &[&narrow, &wide]).unwrap();
        assert_eq!(masker.voxels(), &[0, 2, 3]);

        let elsewhere = VolumeStack::new(
            VoxelGrid::new([4, 1, 1], Affine::identity()),
            1,
            vec![1.0; 4],
        )
        .unwrap();
        assert!(matches!(
            Masker::from_stacks_support(grid(), &[&narrow, &elsewhere]),
            Err(CoreError::GridMismatch { .. })
        ));
    }

    #[test]
    fn test_inverse_transform() {
        let mask = Volume::new(grid(), vec![1.0, 0.0, 0.0, 1.0]).unwrap();
        let masker = Masker::from_volume(&mask);
        let volume = masker.inverse_transform(&[3.0, 4.0]).unwrap();
        assert_eq!(volume.data(), &[3.0, 0.0, 0.0, 4.0]);
        assert!(masker.inverse_transform(&[1.0]).is_err());
    }
}
