//! One-hot encoding of integer label images
//!
//! Reference atlases come as a single volume of integer labels. To compare
//! them with probabilistic maps, each distinct non-background label becomes
//! one binary row of a [`RegionMap`].

use crate::error::{CoreError, Result};
use crate::grid::{resample, Interpolation, Volume};
use crate::masker::Masker;
use crate::region_map::RegionMap;
use std::collections::BTreeMap;

/// Binary region map built from a label image
#[derive(Debug, Clone, PartialEq)]
pub struct BinarizedLabels {
    /// One binary row per label value present in the mask
    pub regions: RegionMap,
    /// Label value of each row, ascending
    pub values: Vec<i64>,
    /// Name of each row, taken from the label table
    pub names: Vec<String>,
}

impl BinarizedLabels {
    /// Name of a row, if it exists
    pub fn name(&self, row: usize) -> Option<&str> {
        self.names.get(row).map(String::as_str)
    }
}

/// Convert a label image into binary masks aligned with `masker`
///
/// The image is resampled onto the masker grid with nearest-neighbour
/// interpolation, flattened through the mask and one-hot encoded. Value 0
/// is background and produces no row. `names[v]` names label value `v`.
pub fn labels_img_to_binary(
    labels_img: &Volume,
    names: &[String],
    masker: &Masker,
) -> Result<BinarizedLabels> {
    let resampled = resample(labels_img, masker.grid(), Interpolation::Nearest)?;
    let labels = masker.transform(&resampled)?;

    let mut members: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (column, value) in labels.iter().enumerate() {
        let value = value.round() as i64;
        if value != 0 {
            members.entry(value).or_default().push(column);
        }
    }

    let mut regions = RegionMap::empty(masker.n_voxels());
    let mut values = Vec::with_capacity(members.len());
    let mut row_names = Vec::with_capacity(members.len());

    for (value, columns) in members {
        let name = usize::try_from(value)
            .ok()
            .and_then(|index| names.get(index))
            .ok_or(CoreError::MissingLabelName {
                value,
                available: names.len(),
            })?;

        regions.push_sparse_row(columns.into_iter().map(|column| (column, 1.0)))?;
        values.push(value);
        row_names.push(name.clone());
    }

    Ok(BinarizedLabels {
        regions,
        values,
        names: row_names,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Affine, VoxelGrid};

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_one_hot_rows_in_value_order() {
        let grid = VoxelGrid::new([4, 1, 1], Affine::identity());
        let img = Volume::new(grid, vec![2.0, 0.0, 1.0, 2.0]).unwrap();
        let masker = Masker::full(grid);

        let binary =
            labels_img_to_binary(&img, &names(&["Background", "Frontal", "Occipital"]), &masker)
                .unwrap();

        assert_eq!(binary.values, vec![1, 2]);
        assert_eq!(binary.names, names(&["Frontal", "Occipital"]));
        assert_eq!(binary.regions.dense_row(0), vec![0.0, 0.0, 1.0, 0.0]);
        assert_eq!(binary.regions.dense_row(1), vec![1.0, 0.0, 0.0, 1.0]);
        assert_eq!(binary.name(1), Some("Occipital"));
    }

    #[test]
    fn test_labels_outside_mask_are_dropped() {
        let grid = VoxelGrid::new([3, 1, 1], Affine::identity());
        let img = Volume::new(grid, vec![1.0, 2.0, 0.0]).unwrap();
        let mask = Volume::new(grid, vec![1.0, 0.0, 1.0]).unwrap();
        let masker = Masker::from_volume(&mask);

        let binary = labels_img_to_binary(&img, &names(&["bg", "a", "b"]), &masker).unwrap();
        assert_eq!(binary.values, vec![1]);
        assert_eq!(binary.regions.n_voxels(), 2);
    }

    #[test]
    fn test_resampled_onto_masker_grid() {
        // Labels at 1mm, masker at 2mm
        let fine = VoxelGrid::new([4, 1, 1], Affine::identity());
        let img = Volume::new(fine, vec![1.0, 1.0, 2.0, 2.0]).unwrap();
        let coarse = VoxelGrid::new([2, 1, 1], Affine::diagonal([2.0, 1.0, 1.0], [0.0; 3]));
        let masker = Masker::full(coarse);

        let binary = labels_img_to_binary(&img, &names(&["bg", "a", "b"]), &masker).unwrap();
        assert_eq!(binary.values, vec![1, 2]);
        assert_eq!(binary.regions.dense_row(1), vec![0.0, 1.0]);
    }

    #[test]
    fn test_missing_name_is_error() {
        let grid = VoxelGrid::new([1, 1, 1], Affine::identity());
        let img = Volume::new(grid, vec![5.0]).unwrap();
        let masker = Masker::full(grid);

        let err = labels_img_to_binary(&img, &names(&["bg"]), &masker).unwrap_err();
        assert_eq!(
            err,
            CoreError::MissingLabelName {
                value: 5,
                available: 1
            }
        );
    }
}
