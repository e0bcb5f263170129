//! Voxel grids, volumes and resampling
//!
//! Volumes are stored in NIfTI order: the x index varies fastest, so the
//! flat index of voxel `(i, j, k)` is `i + nx * (j + ny * k)`. A 4-D stack
//! keeps its volumes one after another.

use crate::error::{CoreError, Result};

/// Tolerance used when comparing affines of two grids
const AFFINE_TOLERANCE: f64 = 1e-4;

/// Voxel-to-world transform (top three rows of a 4x4 homogeneous matrix)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine {
    rows: [[f64; 4]; 3],
}

impl Default for Affine {
    fn default() -> Self {
        Self::identity()
    }
}

impl Affine {
    /// Identity transform
    pub fn identity() -> Self {
        Self::diagonal([1.0; 3], [0.0; 3])
    }

    /// Build from the three rows of the 4x4 matrix
    pub fn from_rows(rows: [[f64; 4]; 3]) -> Self {
        Self { rows }
    }

    /// Axis-aligned transform with the given voxel sizes and origin
    pub fn diagonal(zooms: [f64; 3], origin: [f64; 3]) -> Self {
        let mut rows = [[0.0; 4]; 3];
        for axis in 0..3 {
            rows[axis][axis] = zooms[axis];
            rows[axis][3] = origin[axis];
        }
        Self { rows }
    }

    /// The three stored rows
    pub fn rows(&self) -> [[f64; 4]; 3] {
        self.rows
    }

    /// Map a (possibly fractional) voxel position to world coordinates
    pub fn apply(&self, point: [f64; 3]) -> [f64; 3] {
        let mut out = [0.0; 3];
        for (axis, row) in self.rows.iter().enumerate() {
            out[axis] = row[0] * point[0] + row[1] * point[1] + row[2] * point[2] + row[3];
        }
        out
    }

    /// Determinant of the linear 3x3 part
    pub fn determinant(&self) -> f64 {
        let m = &self.rows;
        m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
            - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
            + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
    }

    /// Inverse transform (world to voxel)
    pub fn inverse(&self) -> Result<Self> {
        let det = self.determinant();
        if det.abs() < 1e-12 || !det.is_finite() {
            return Err(CoreError::SingularAffine { determinant: det });
        }

        let m = &self.rows;
        let mut inv = [[0.0; 4]; 3];
        inv[0][0] = (m[1][1] * m[2][2] - m[1][2] * m[2][1]) / det;
        inv[0][1] = (m[0][2] * m[2][1] - m[0][1] * m[2][2]) / det;
        inv[0][2] = (m[0][1] * m[1][2] - m[0][2] * m[1][1]) / det;
        inv[1][0] = (m[1][2] * m[2][0] - m[1][0] * m[2][2]) / det;
        inv[1][1] = (m[0][0] * m[2][2] - m[0][2] * m[2][0]) / det;
        inv[1][2] = (m[0][2] * m[1][0] - m[0][0] * m[1][2]) / det;
        inv[2][0] = (m[1][0] * m[2][1] - m[1][1] * m[2][0]) / det;
        inv[2][1] = (m[0][1] * m[2][0] - m[0][0] * m[2][1]) / det;
        inv[2][2] = (m[0][0] * m[1][1] - m[0][1] * m[1][0]) / det;

        for axis in 0..3 {
            inv[axis][3] =
                -(inv[axis][0] * m[0][3] + inv[axis][1] * m[1][3] + inv[axis][2] * m[2][3]);
        }

        Ok(Self { rows: inv })
    }

    /// Compose `self` after `other` (`self * other`)
    pub fn then(&self, other: &Affine) -> Self {
        let a = &self.rows;
        let b = &other.rows;
        let mut out = [[0.0; 4]; 3];
        for r in 0..3 {
            for c in 0..4 {
                let mut value = a[r][0] * b[0][c] + a[r][1] * b[1][c] + a[r][2] * b[2][c];
                if c == 3 {
                    value += a[r][3];
                }
                out[r][c] = value;
            }
        }
        Self { rows: out }
    }

    /// Element-wise comparison within `tolerance`
    pub fn approx_eq(&self, other: &Affine, tolerance: f64) -> bool {
        self.rows
            .iter()
            .flatten()
            .zip(other.rows.iter().flatten())
            .all(|(a, b)| (a - b).abs() <= tolerance)
    }
}

/// Shape and placement of a 3-D voxel grid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoxelGrid {
    /// Number of voxels along x, y and z
    pub shape: [usize; 3],
    /// Voxel-to-world transform
    pub affine: Affine,
}

impl VoxelGrid {
    /// Create a grid
    pub fn new(shape: [usize; 3], affine: Affine) -> Self {
        Self { shape, affine }
    }

    /// Total number of voxels
    pub fn n_voxels(&self) -> usize {
        self.shape[0] * self.shape[1] * self.shape[2]
    }

    /// Flat index of voxel `(i, j, k)`
    pub fn flat_index(&self, ijk: [usize; 3]) -> usize {
        ijk[0] + self.shape[0] * (ijk[1] + self.shape[1] * ijk[2])
    }

    /// Voxel coordinates of a flat index
    pub fn unflatten(&self, index: usize) -> [usize; 3] {
        let i = index % self.shape[0];
        let rest = index / self.shape[0];
        [i, rest % self.shape[1], rest / self.shape[1]]
    }

    /// World coordinates of a voxel centre
    pub fn world(&self, index: usize) -> [f64; 3] {
        let [i, j, k] = self.unflatten(index);
        self.affine.apply([i as f64, j as f64, k as f64])
    }

    /// Whether two grids have the same shape and (nearly) the same affine
    pub fn matches(&self, other: &VoxelGrid) -> bool {
        self.shape == other.shape && self.affine.approx_eq(&other.affine, AFFINE_TOLERANCE)
    }

    fn check_len(&self, what: &'static str, len: usize) -> Result<()> {
        if len != self.n_voxels() {
            return Err(CoreError::LengthMismatch {
                what,
                expected: self.n_voxels(),
                actual: len,
            });
        }
        Ok(())
    }
}

/// A single 3-D image
#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    grid: VoxelGrid,
    data: Vec<f64>,
}

impl Volume {
    /// Wrap samples laid out on `grid`
    pub fn new(grid: VoxelGrid, data: Vec<f64>) -> Result<Self> {
        grid.check_len("volume", data.len())?;
        Ok(Self { grid, data })
    }

    /// Grid the samples live on
    pub fn grid(&self) -> &VoxelGrid {
        &self.grid
    }

    /// Samples in flat order
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Consume the volume, returning its samples
    pub fn into_data(self) -> Vec<f64> {
        self.data
    }

    /// Sample at integer voxel coordinates
    pub fn at(&self, ijk: [usize; 3]) -> f64 {
        self.data[self.grid.flat_index(ijk)]
    }
}

/// A 4-D image: `n_volumes` volumes sharing a grid
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeStack {
    grid: VoxelGrid,
    n_volumes: usize,
    data: Vec<f64>,
}

impl VolumeStack {
    /// Wrap samples for `n_volumes` volumes laid out one after another
    pub fn new(grid: VoxelGrid, n_volumes: usize, data: Vec<f64>) -> Result<Self> {
        let expected = grid.n_voxels() * n_volumes;
        if data.len() != expected {
            return Err(CoreError::LengthMismatch {
                what: "volume stack",
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            grid,
            n_volumes,
            data,
        })
    }

    /// Grid shared by every volume
    pub fn grid(&self) -> &VoxelGrid {
        &self.grid
    }

    /// Number of volumes
    pub fn n_volumes(&self) -> usize {
        self.n_volumes
    }

    /// Samples of one volume
    pub fn volume_data(&self, index: usize) -> Result<&[f64]> {
        if index >= self.n_volumes {
            return Err(CoreError::VolumeOutOfRange {
                index,
                n_volumes: self.n_volumes,
            });
        }
        let n = self.grid.n_voxels();
        Ok(&self.data[index * n..(index + 1) * n])
    }

    /// Copy one volume out of the stack
    pub fn volume(&self, index: usize) -> Result<Volume> {
        let data = self.volume_data(index)?.to_vec();
        Volume::new(self.grid, data)
    }

    /// Iterate over the volumes' samples
    pub fn iter_volumes(&self) -> impl Iterator<Item = &[f64]> {
        let n = self.grid.n_voxels().max(1);
        self.data.chunks(n).take(self.n_volumes)
    }
}

impl From<Volume> for VolumeStack {
    fn from(volume: Volume) -> Self {
        Self {
            grid: volume.grid,
            n_volumes: 1,
            data: volume.data,
        }
    }
}

/// Interpolation used when resampling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    /// Nearest neighbour, keeps discrete label identities
    #[default]
    Nearest,
    /// Trilinear, for continuous (probabilistic) maps
    Linear,
}

/// Resample with nearest-neighbour interpolation
pub fn resample_nearest(volume: &Volume, target: &VoxelGrid) -> Result<Volume> {
    resample(volume, target, Interpolation::Nearest)
}

/// Resample `volume` onto `target`
///
/// Target voxels that map outside the source grid get 0.
pub fn resample(volume: &Volume, target: &VoxelGrid, interpolation: Interpolation) -> Result<Volume> {
    if volume.grid.matches(target) {
        return Volume::new(*target, volume.data.clone());
    }

    // target voxel -> world -> source voxel
    let to_source = volume.grid.affine.inverse()?.then(&target.affine);
    let mut data = Vec::with_capacity(target.n_voxels());

    for k in 0..target.shape[2] {
        for j in 0..target.shape[1] {
            for i in 0..target.shape[0] {
                let p = to_source.apply([i as f64, j as f64, k as f64]);
                let value = match interpolation {
                    Interpolation::Nearest => sample_nearest(volume, p),
                    Interpolation::Linear => sample_linear(volume, p),
                };
                data.push(value);
            }
        }
    }

    Volume::new(*target, data)
}

fn voxel_in_bounds(shape: &[usize; 3], ijk: [i64; 3]) -> Option<[usize; 3]> {
    let mut out = [0usize; 3];
    for axis in 0..3 {
        if ijk[axis] < 0 || ijk[axis] as usize >= shape[axis] {
            return None;
        }
        out[axis] = ijk[axis] as usize;
    }
    Some(out)
}

fn sample_nearest(volume: &Volume, p: [f64; 3]) -> f64 {
    let ijk = [p[0].round() as i64, p[1].round() as i64, p[2].round() as i64];
    voxel_in_bounds(&volume.grid.shape, ijk)
        .map(|ijk| volume.at(ijk))
        .unwrap_or(0.0)
}

fn sample_linear(volume: &Volume, p: [f64; 3]) -> f64 {
    let base = [p[0].floor(), p[1].floor(), p[2].floor()];
    let frac = [p[0] - base[0], p[1] - base[1], p[2] - base[2]];
    let mut value = 0.0;

    for corner in 0..8 {
        let offset = [corner & 1, (corner >> 1) & 1, (corner >> 2) & 1];
        let mut weight = 1.0;
        let mut ijk = [0i64; 3];
        for axis in 0..3 {
            ijk[axis] = base[axis] as i64 + offset[axis] as i64;
            weight *= if offset[axis] == 1 {
                frac[axis]
            } else {
                1.0 - frac[axis]
            };
        }
        if weight == 0.0 {
            continue;
        }
        if let Some(ijk) = voxel_in_bounds(&volume.grid.shape, ijk) {
            value += weight * volume.at(ijk);
        }
    }

    value
}
