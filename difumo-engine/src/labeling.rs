//! Labeling pipelines
//!
//! Each pipeline turns DiFuMo maps into one of the overlap tables:
//! best-matching reference labels, related components across dimensions,
//! and tissue composition.

use crate::error::{EngineError, Result};
use crate::fetcher::DifumoFiles;
use crate::label_table::{read_difumo_labels, DifumoLabels};
use crate::nifti;
use crate::reference::LoadedReference;
use crate::tables::{LabelRow, LabelsTable, RelatedRow, RelatedTable, TissueRow, TissueTable, NO_LABEL};
use difumo_core::{
    find_xyz_cut_coords, labels_img_to_binary, overlaps, resample, resample_nearest, Interpolation,
    Masker, RegionMap, Volume, VolumeStack, VoxelGrid,
};
use std::borrow::Cow;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Related components listed per target dimension
pub const RELATED_PER_DIMENSION: usize = 5;

/// DiFuMo maps of one dimension with their names
#[derive(Debug, Clone)]
pub struct DifumoAtlas {
    /// Number of components
    pub dimension: u32,
    /// One volume per component
    pub maps: VolumeStack,
    /// Component names
    pub labels: DifumoLabels,
}

impl DifumoAtlas {
    /// Pair maps with labels, checking they agree in length
    pub fn new(dimension: u32, maps: VolumeStack, labels: DifumoLabels) -> Result<Self> {
        if maps.n_volumes() != labels.len() {
            return Err(EngineError::InvalidInput(format!(
                "DiFuMo {dimension}: {} maps but {} labels",
                maps.n_volumes(),
                labels.len()
            )));
        }
        Ok(Self {
            dimension,
            maps,
            labels,
        })
    }

    /// Read the files of a fetched dictionary
    pub fn load(files: &DifumoFiles) -> Result<Self> {
        let maps = nifti::read_stack(&files.maps)?;
        let labels = read_difumo_labels(&files.labels)?;
        log::info!(
            "loaded DiFuMo {}: {} components on a {:?} grid",
            files.dimension,
            maps.n_volumes(),
            maps.grid().shape
        );
        Self::new(files.dimension, maps, labels)
    }

    /// Number of components
    pub fn n_components(&self) -> usize {
        self.maps.n_volumes()
    }

    /// Name of 0-based component `index`
    pub fn name(&self, index: usize) -> &str {
        self.labels.name(index).unwrap_or_default()
    }

    /// Maps on `grid`, linearly resampled when they lie elsewhere
    pub fn maps_on(&self, grid: &VoxelGrid) -> Result<Cow<'_, VolumeStack>> {
        if self.maps.grid().matches(grid) {
            return Ok(Cow::Borrowed(&self.maps));
        }

        log::debug!("resampling DiFuMo {} onto a {:?} grid", self.dimension, grid.shape);
        let mut data = Vec::with_capacity(grid.n_voxels() * self.n_components());
        for index in 0..self.n_components() {
            let volume = resample(&self.maps.volume(index)?, grid, Interpolation::Linear)?;
            data.extend(volume.into_data());
        }
        Ok(Cow::Owned(VolumeStack::new(*grid, self.n_components(), data)?))
    }

    /// Components as region-map rows over `masker`'s voxels
    pub fn regions(&self, masker: &Masker) -> Result<RegionMap> {
        let maps = self.maps_on(masker.grid())?;
        Ok(masker.transform_stack(&maps)?)
    }

    /// Cut coordinates of every component
    pub fn cut_coords(&self) -> Result<Vec<[f64; 3]>> {
        (0..self.n_components())
            .map(|index| -> Result<[f64; 3]> { Ok(find_xyz_cut_coords(&self.maps.volume(index)?)) })
            .collect()
    }
}

/// Masker shared by `atlases`, on the grid of the first one
///
/// An explicit mask is resampled onto that grid. Without one, the mask is
/// the union of the supports of every atlas, so that no component loses
/// voxels its neighbours do not cover.
pub fn masker_for(atlases: &[&DifumoAtlas], mask: Option<&Volume>) -> Result<Masker> {
    let first = atlases
        .first()
        .ok_or_else(|| EngineError::InvalidInput("masker needs at least one atlas".to_string()))?;
    let grid = *first.maps.grid();

    let masker = match mask {
        Some(mask) => Masker::from_volume(&resample_nearest(mask, &grid)?),
        None => {
            let maps = atlases
                .iter()
                .map(|atlas| atlas.maps_on(&grid))
                .collect::<Result<Vec<_>>>()?;
            let stacks: Vec<&VolumeStack> = maps.iter().map(|maps| maps.as_ref()).collect();
            Masker::from_stacks_support(grid, &stacks)?
        }
    };
    log::debug!("masker keeps {} voxels", masker.n_voxels());
    Ok(masker)
}

/// Best label of each component in one reference atlas
fn best_labels(queries: &RegionMap, masker: &Masker, reference: &LoadedReference) -> Result<Vec<String>> {
    let binary = labels_img_to_binary(&reference.labels_img, &reference.names, masker)?;
    let report = overlaps(queries, Some(&binary.regions))?;
    log::info!(
        "{}: {} regions compared with {} components",
        reference.atlas,
        binary.values.len(),
        queries.n_regions()
    );

    Ok((0..report.n_queries())
        .map(|q| {
            report
                .best(q)
                .and_then(|hit| binary.name(hit.target))
                .unwrap_or(NO_LABEL)
                .to_string()
        })
        .collect())
}

/// Best-matching label per reference atlas for every component
pub fn label_regions(
    atlas: &DifumoAtlas,
    masker: &Masker,
    references: &[LoadedReference],
) -> Result<LabelsTable> {
    let queries = atlas.regions(masker)?;

    #[cfg(feature = "parallel")]
    let columns: Vec<Vec<String>> = references
        .par_iter()
        .map(|reference| best_labels(&queries, masker, reference))
        .collect::<Result<_>>()?;

    #[cfg(not(feature = "parallel"))]
    let columns: Vec<Vec<String>> = references
        .iter()
        .map(|reference| best_labels(&queries, masker, reference))
        .collect::<Result<_>>()?;

    let cut_coords = atlas.cut_coords()?;
    let rows = cut_coords
        .into_iter()
        .enumerate()
        .map(|(component, cut_coords)| LabelRow {
            component,
            labels: columns.iter().map(|column| column[component].clone()).collect(),
            cut_coords,
        })
        .collect();

    Ok(LabelsTable {
        atlases: references.iter().map(|r| r.atlas).collect(),
        rows,
    })
}

/// Components of `targets` most related to each component of `query`
///
/// Up to `per_dimension` components per target dimension, ranked by overlap
/// proportion. A component is never listed as related to itself.
pub fn relate_dimensions(
    query: &DifumoAtlas,
    targets: &[&DifumoAtlas],
    masker: &Masker,
    per_dimension: usize,
) -> Result<RelatedTable> {
    let queries = query.regions(masker)?;

    let mut reports = Vec::with_capacity(targets.len());
    for target in targets {
        let report = if target.dimension == query.dimension {
            overlaps(&queries, None)?
        } else {
            overlaps(&queries, Some(&target.regions(masker)?))?
        };
        reports.push(report);
    }

    let mut rows = Vec::new();
    for component in 0..query.n_components() {
        for (target, report) in targets.iter().zip(&reports) {
            let same_dimension = target.dimension == query.dimension;
            let related = report.overlap_proportion[component]
                .iter()
                .filter(|hit| !(same_dimension && hit.target == component))
                .take(per_dimension);

            rows.extend(related.map(|hit| RelatedRow {
                dimension: query.dimension,
                component: component + 1,
                identified: hit.target + 1,
                overlap_against: target.dimension,
                label: target.name(hit.target).to_string(),
            }));
        }
    }

    log::info!(
        "DiFuMo {}: {} related components across {} dimensions",
        query.dimension,
        rows.len(),
        targets.len()
    );
    Ok(RelatedTable { rows })
}

/// Grey matter, white matter and CSF overlap of every component
///
/// Tissue maps are linearly resampled onto the DiFuMo grid; each value is the
/// dot product of a component with a tissue map over the whole grid.
pub fn tissue_composition(atlas: &DifumoAtlas, gm: &Volume, wm: &Volume, csf: &Volume) -> Result<TissueTable> {
    let grid = atlas.maps.grid();
    let tissues = [gm, wm, csf]
        .into_iter()
        .map(|map| resample(map, grid, Interpolation::Linear))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let dot = |component: &[f64], tissue: &Volume| -> f64 {
        component
            .iter()
            .zip(tissue.data())
            .map(|(a, b)| a * b)
            .sum()
    };

    let rows = (0..atlas.n_components())
        .map(|index| -> Result<TissueRow> {
            let component = atlas.maps.volume_data(index)?;
            Ok(TissueRow {
                component: index + 1,
                name: atlas.name(index).to_string(),
                gm: dot(component, &tissues[0]),
                wm: dot(component, &tissues[1]),
                csf: dot(component, &tissues[2]),
            })
        })
        .collect::<Result<_>>()?;

    Ok(TissueTable { rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::ReferenceAtlas;
    use difumo_core::{Affine, VoxelGrid};

    fn grid() -> VoxelGrid {
        VoxelGrid::new([4, 1, 1], Affine::identity())
    }

    fn atlas(dimension: u32, rows: &[[f64; 4]], names: &[&str]) -> DifumoAtlas {
        let data = rows.iter().flatten().copied().collect();
        let maps = VolumeStack::new(grid(), rows.len(), data).unwrap();
        let labels = DifumoLabels::from_names(names.iter().map(|s| s.to_string()).collect());
        DifumoAtlas::new(dimension, maps, labels).unwrap()
    }

    fn reference(values: [f64; 4], names: &[&str]) -> LoadedReference {
        LoadedReference {
            atlas: ReferenceAtlas::Jhu,
            labels_img: Volume::new(grid(), values.to_vec()).unwrap(),
            names: names.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_label_count_must_match_maps() {
        let maps = VolumeStack::new(grid(), 1, vec![0.0; 4]).unwrap();
        let err = DifumoAtlas::new(64, maps, DifumoLabels::default()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }

    #[test]
    fn test_label_regions_best_and_none() {
        let difumo = atlas(
            2,
            &[[1.0, 0.5, 0.0, 0.0], [0.0, 0.0, 0.0, 2.0]],
            &["Left", "Right"],
        );
        let masker = Masker::full(grid());
        let refs = [reference([1.0, 1.0, 2.0, 0.0], &["Background", "A", "B"])];

        let table = label_regions(&difumo, &masker, &refs).unwrap();
        assert_eq!(table.atlases, vec![ReferenceAtlas::Jhu]);
        assert_eq!(table.rows[0].labels, vec!["A"]);
        assert_eq!(table.rows[1].labels, vec![NO_LABEL]);
        assert_eq!(table.rows[1].cut_coords, [3.0, 0.0, 0.0]);
    }

    #[test]
    fn test_masker_from_explicit_mask() {
        let difumo = atlas(1, &[[1.0, 1.0, 1.0, 1.0]], &["All"]);
        let mask = Volume::new(grid(), vec![0.0, 1.0, 1.0, 0.0]).unwrap();

        assert_eq!(masker_for(&[&difumo], Some(&mask)).unwrap().n_voxels(), 2);
        assert_eq!(masker_for(&[&difumo], None).unwrap().n_voxels(), 4);
        assert!(matches!(masker_for(&[], None), Err(EngineError::InvalidInput(_))));
    }

    #[test]
    fn test_wide_target_keeps_full_size() {
        let query = atlas(1, &[[1.0, 0.0, 0.0, 0.0]], &["q"]);
        let targets = atlas(
            2,
            &[[1.0, 1.0, 1.0, 1.0], [1.0, 0.0, 0.0, 0.0]],
            &["wide", "narrow"],
        );

        let masker = masker_for(&[&query, &targets], None).unwrap();
        assert_eq!(masker.n_voxels(), 4);
        assert_eq!(targets.regions(&masker).unwrap().row_sums(), vec![4.0, 1.0]);

        let table = relate_dimensions(&query, &[&targets], &masker, 5).unwrap();
        let order: Vec<_> = table.for_component(1).map(|r| r.label.as_str()).collect();
        assert_eq!(order, vec!["narrow", "wide"]);
    }

    #[test]
    fn test_maps_on_other_grid_are_resampled() {
        let difumo = atlas(1, &[[1.0, 1.0, 1.0, 1.0]], &["All"]);
        let coarse = VoxelGrid::new([2, 1, 1], Affine::identity());

        let maps = difumo.maps_on(&coarse).unwrap();
        assert!(matches!(maps, Cow::Owned(_)));
        assert_eq!(maps.grid().shape, [2, 1, 1]);
        assert!(matches!(difumo.maps_on(&grid()).unwrap(), Cow::Borrowed(_)));
    }

    #[test]
    fn test_relate_skips_self_only_within_dimension() {
        let small = atlas(
            2,
            &[[1.0, 1.0, 0.0, 0.0], [0.0, 1.0, 1.0, 0.0]],
            &["a", "b"],
        );
        let large = atlas(
            3,
            &[[1.0, 0.0, 0.0, 0.0], [0.0, 0.0, 1.0, 1.0], [0.0, 1.0, 0.0, 0.0]],
            &["x", "y", "z"],
        );
        let masker = Masker::full(grid());

        let table = relate_dimensions(&small, &[&small, &large], &masker, 5).unwrap();
        let first: Vec<_> = table
            .for_component(1)
            .map(|r| (r.overlap_against, r.identified))
            .collect();
        // Within 2: only b. Against 3: x and z tie at 1.0, index order.
        assert_eq!(first, vec![(2, 2), (3, 1), (3, 3)]);
        assert!(table.rows.iter().all(|r| r.dimension == 2));
        assert_eq!(table.rows[1].label, "x");
    }

    #[test]
    fn test_relate_limits_per_dimension() {
        let dense = atlas(
            4,
            &[[1.0; 4], [1.0; 4], [1.0; 4], [1.0; 4]],
            &["a", "b", "c", "d"],
        );
        let masker = Masker::full(grid());

        let table = relate_dimensions(&dense, &[&dense], &masker, 2).unwrap();
        assert_eq!(table.for_component(1).count(), 2);
        assert_eq!(table.rows.len(), 8);
    }

    #[test]
    fn test_tissue_dot_products() {
        let difumo = atlas(1, &[[1.0, 2.0, 0.0, 0.0]], &["Insula"]);
        let gm = Volume::new(grid(), vec![1.0, 1.0, 0.0, 0.0]).unwrap();
        let wm = Volume::new(grid(), vec![0.0, 0.5, 1.0, 0.0]).unwrap();
        let csf = Volume::new(grid(), vec![0.0; 4]).unwrap();

        let table = tissue_composition(&difumo, &gm, &wm, &csf).unwrap();
        assert_eq!(table.rows[0].component, 1);
        assert_eq!(table.rows[0].name, "Insula");
        assert_eq!((table.rows[0].gm, table.rows[0].wm, table.rows[0].csf), (3.0, 1.0, 0.0));
    }
}
