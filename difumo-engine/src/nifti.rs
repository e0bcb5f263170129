//! NIfTI-1 codec
//!
//! Reads single-file NIfTI-1 images (`.nii`, optionally gzip-compressed) into
//! [`Volume`]s and [`VolumeStack`]s, and writes float32 images. Only what the
//! atlas pipeline needs is supported: 3-D and 4-D images, the common scalar
//! datatypes, intensity scaling, and sform/qform orientation.

use byteorder::{BigEndian, ByteOrder, LittleEndian, WriteBytesExt};
use difumo_core::{Affine, CoreError, Volume, VolumeStack, VoxelGrid};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

const HEADER_SIZE: usize = 348;
const DATA_OFFSET: usize = 352;
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Errors raised while decoding or encoding NIfTI images
#[derive(Error, Debug)]
pub enum NiftiError {
    /// The file could not be read or written
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File being accessed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// The header is not a NIfTI-1 header
    #[error("invalid NIfTI header: {0}")]
    InvalidHeader(String),

    /// The datatype code is not supported
    #[error("unsupported NIfTI datatype code {0}")]
    UnsupportedDatatype(i16),

    /// Only 3-D and 4-D images are supported
    #[error("unsupported number of dimensions: {0}")]
    UnsupportedDimensions(i16),

    /// The file ends before all voxels were read
    #[error("truncated image data: expected {expected} bytes, found {actual}")]
    Truncated {
        /// Bytes needed for the voxel data
        expected: usize,
        /// Bytes available after the header
        actual: usize,
    },

    /// The image holds several volumes where one was expected
    #[error("expected a 3-D image, found {0} volumes")]
    NotSingleVolume(usize),

    /// Shape bookkeeping failed
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type for NIfTI operations
pub type Result<T> = std::result::Result<T, NiftiError>;

/// Voxel datatypes understood by the reader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Datatype {
    /// Unsigned 8-bit
    Uint8,
    /// Signed 8-bit
    Int8,
    /// Signed 16-bit
    Int16,
    /// Unsigned 16-bit
    Uint16,
    /// Signed 32-bit
    Int32,
    /// Unsigned 32-bit
    Uint32,
    /// Signed 64-bit
    Int64,
    /// 32-bit float
    Float32,
    /// 64-bit float
    Float64,
}

impl Datatype {
    /// Decode the header datatype code
    pub fn from_code(code: i16) -> Result<Self> {
        Ok(match code {
            2 => Datatype::Uint8,
            4 => Datatype::Int16,
            8 => Datatype::Int32,
            16 => Datatype::Float32,
            64 => Datatype::Float64,
            256 => Datatype::Int8,
            512 => Datatype::Uint16,
            768 => Datatype::Uint32,
            1024 => Datatype::Int64,
            other => return Err(NiftiError::UnsupportedDatatype(other)),
        })
    }

    /// Header datatype code
    pub fn code(&self) -> i16 {
        match self {
            Datatype::Uint8 => 2,
            Datatype::Int16 => 4,
            Datatype::Int32 => 8,
            Datatype::Float32 => 16,
            Datatype::Float64 => 64,
            Datatype::Int8 => 256,
            Datatype::Uint16 => 512,
            Datatype::Uint32 => 768,
            Datatype::Int64 => 1024,
        }
    }

    /// Bytes per voxel
    pub fn size(&self) -> usize {
        match self {
            Datatype::Uint8 | Datatype::Int8 => 1,
            Datatype::Int16 | Datatype::Uint16 => 2,
            Datatype::Int32 | Datatype::Uint32 | Datatype::Float32 => 4,
            Datatype::Int64 | Datatype::Float64 => 8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endian {
    Little,
    Big,
}

impl Endian {
    fn i16(self, buf: &[u8]) -> i16 {
        match self {
            Endian::Little => LittleEndian::read_i16(buf),
            Endian::Big => BigEndian::read_i16(buf),
        }
    }

    fn i32(self, buf: &[u8]) -> i32 {
        match self {
            Endian::Little => LittleEndian::read_i32(buf),
            Endian::Big => BigEndian::read_i32(buf),
        }
    }

    fn f32(self, buf: &[u8]) -> f32 {
        match self {
            Endian::Little => LittleEndian::read_f32(buf),
            Endian::Big => BigEndian::read_f32(buf),
        }
    }

    fn sample(self, datatype: Datatype, buf: &[u8]) -> f64 {
        match (datatype, self) {
            (Datatype::Uint8, _) => buf[0] as f64,
            (Datatype::Int8, _) => buf[0] as i8 as f64,
            (Datatype::Int16, _) => self.i16(buf) as f64,
            (Datatype::Uint16, Endian::Little) => LittleEndian::read_u16(buf) as f64,
            (Datatype::Uint16, Endian::Big) => BigEndian::read_u16(buf) as f64,
            (Datatype::Int32, _) => self.i32(buf) as f64,
            (Datatype::Uint32, Endian::Little) => LittleEndian::read_u32(buf) as f64,
            (Datatype::Uint32, Endian::Big) => BigEndian::read_u32(buf) as f64,
            (Datatype::Int64, Endian::Little) => LittleEndian::read_i64(buf) as f64,
            (Datatype::Int64, Endian::Big) => BigEndian::read_i64(buf) as f64,
            (Datatype::Float32, _) => self.f32(buf) as f64,
            (Datatype::Float64, Endian::Little) => LittleEndian::read_f64(buf),
            (Datatype::Float64, Endian::Big) => BigEndian::read_f64(buf),
        }
    }
}

/// Header fields the pipeline uses
#[derive(Debug, Clone, PartialEq)]
pub struct NiftiHeader {
    /// `dim[1..=ndim]`
    pub dims: Vec<usize>,
    /// Voxel datatype
    pub datatype: Datatype,
    /// `pixdim[0..8]`
    pub pixdim: [f32; 8],
    /// Offset of the voxel data in the file
    pub vox_offset: usize,
    /// Intensity scaling slope (0 means no scaling)
    pub scl_slope: f32,
    /// Intensity scaling intercept
    pub scl_inter: f32,
    /// Voxel-to-world transform chosen from sform, qform or pixdim
    pub affine: Affine,
}

impl NiftiHeader {
    fn parse(bytes: &[u8]) -> Result<(Self, Endian)> {
        if bytes.len() < HEADER_SIZE {
            return Err(NiftiError::InvalidHeader(format!(
                "file has {} bytes, header needs {}",
                bytes.len(),
                HEADER_SIZE
            )));
        }

        let endian = if LittleEndian::read_i32(&bytes[0..4]) == HEADER_SIZE as i32 {
            Endian::Little
        } else if BigEndian::read_i32(&bytes[0..4]) == HEADER_SIZE as i32 {
            Endian::Big
        } else {
            return Err(NiftiError::InvalidHeader("sizeof_hdr is not 348".to_string()));
        };

        let magic = &bytes[344..348];
        if magic != b"n+1\0" && magic != b"ni1\0" {
            return Err(NiftiError::InvalidHeader(
                "missing NIfTI-1 magic string".to_string(),
            ));
        }

        let ndim = endian.i16(&bytes[40..42]);
        if !(1..=7).contains(&ndim) {
            return Err(NiftiError::UnsupportedDimensions(ndim));
        }
        let mut dims = Vec::with_capacity(ndim as usize);
        for axis in 1..=ndim as usize {
            let offset = 40 + 2 * axis;
            let size = endian.i16(&bytes[offset..offset + 2]);
            if size < 1 {
                return Err(NiftiError::InvalidHeader(format!(
                    "dim[{axis}] is {size}"
                )));
            }
            dims.push(size as usize);
        }

        let datatype = Datatype::from_code(endian.i16(&bytes[70..72]))?;
        data_len(&dims, datatype.size()).ok_or_else(|| {
            NiftiError::InvalidHeader(format!("dimensions {dims:?} do not fit in memory"))
        })?;

        let mut pixdim = [0.0f32; 8];
        for (axis, value) in pixdim.iter_mut().enumerate() {
            let offset = 76 + 4 * axis;
            *value = endian.f32(&bytes[offset..offset + 4]);
        }

        let vox_offset = endian.f32(&bytes[108..112]).max(DATA_OFFSET as f32) as usize;
        let scl_slope = endian.f32(&bytes[112..116]);
        let scl_inter = endian.f32(&bytes[116..120]);

        let qform_code = endian.i16(&bytes[252..254]);
        let sform_code = endian.i16(&bytes[254..256]);

        let affine = if sform_code > 0 {
            let mut rows = [[0.0f64; 4]; 3];
            for (r, row) in rows.iter_mut().enumerate() {
                for (c, value) in row.iter_mut().enumerate() {
                    let offset = 280 + 16 * r + 4 * c;
                    *value = endian.f32(&bytes[offset..offset + 4]) as f64;
                }
            }
            Affine::from_rows(rows)
        } else if qform_code > 0 {
            let read = |offset: usize| endian.f32(&bytes[offset..offset + 4]) as f64;
            qform_affine(
                [read(256), read(260), read(264)],
                [read(268), read(272), read(276)],
                &pixdim,
            )
        } else {
            Affine::diagonal(
                [
                    nonzero_or_one(pixdim[1]),
                    nonzero_or_one(pixdim[2]),
                    nonzero_or_one(pixdim[3]),
                ],
                [0.0; 3],
            )
        };

        Ok((
            Self {
                dims,
                datatype,
                pixdim,
                vox_offset,
                scl_slope,
                scl_inter,
                affine,
            },
            endian,
        ))
    }

    /// Spatial grid of the image
    pub fn grid(&self) -> Result<VoxelGrid> {
        let mut shape = [1usize; 3];
        for (axis, size) in self.dims.iter().take(3).enumerate() {
            shape[axis] = *size;
        }
        Ok(VoxelGrid::new(shape, self.affine))
    }

    /// Number of 3-D volumes (product of dims past the third)
    pub fn n_volumes(&self) -> usize {
        self.dims.iter().skip(3).product()
    }

    fn scaling(&self) -> Option<(f64, f64)> {
        let slope = self.scl_slope as f64;
        let inter = self.scl_inter as f64;
        if slope == 0.0 || !slope.is_finite() || (slope == 1.0 && inter == 0.0) {
            None
        } else {
            Some((slope, if inter.is_finite() { inter } else { 0.0 }))
        }
    }
}

fn nonzero_or_one(value: f32) -> f64 {
    if value == 0.0 || !value.is_finite() {
        1.0
    } else {
        value.abs() as f64
    }
}

/// Rotation from the qform quaternion, scaled by pixdim
fn qform_affine(quatern: [f64; 3], offset: [f64; 3], pixdim: &[f32; 8]) -> Affine {
    let [b, c, d] = quatern;
    let a = (1.0 - (b * b + c * c + d * d)).max(0.0).sqrt();
    let qfac = if pixdim[0] < 0.0 { -1.0 } else { 1.0 };

    let rotation = [
        [a * a + b * b - c * c - d * d, 2.0 * (b * c - a * d), 2.0 * (b * d + a * c)],
        [2.0 * (b * c + a * d), a * a + c * c - b * b - d * d, 2.0 * (c * d - a * b)],
        [2.0 * (b * d - a * c), 2.0 * (c * d + a * b), a * a + d * d - c * c - b * b],
    ];
    let zooms = [
        nonzero_or_one(pixdim[1]),
        nonzero_or_one(pixdim[2]),
        nonzero_or_one(pixdim[3]) * qfac,
    ];

    let mut rows = [[0.0; 4]; 3];
    for r in 0..3 {
        for col in 0..3 {
            rows[r][col] = rotation[r][col] * zooms[col];
        }
        rows[r][3] = offset[r];
    }
    Affine::from_rows(rows)
}

/// A decoded image: header plus samples for every volume
#[derive(Debug, Clone)]
pub struct NiftiImage {
    /// Parsed header
    pub header: NiftiHeader,
    stack: VolumeStack,
}

impl NiftiImage {
    /// Samples as a 4-D stack (a 3-D image is a stack of one)
    pub fn into_stack(self) -> VolumeStack {
        self.stack
    }

    /// Samples as a single volume
    pub fn into_volume(self) -> Result<Volume> {
        if self.stack.n_volumes() != 1 {
            return Err(NiftiError::NotSingleVolume(self.stack.n_volumes()));
        }
        Ok(self.stack.volume(0)?)
    }

    /// Grid of the image
    pub fn grid(&self) -> &VoxelGrid {
        self.stack.grid()
    }
}

/// Bytes of voxel data for `dims`, `None` on overflow
fn data_len(dims: &[usize], width: usize) -> Option<usize> {
    dims.iter().try_fold(width, |len, &size| len.checked_mul(size))
}

/// Header `dim` field, rejecting sizes NIfTI-1 cannot store
fn dim_field(what: &str, size: usize) -> Result<i16> {
    i16::try_from(size).map_err(|_| {
        NiftiError::InvalidHeader(format!(
            "{what} is {size}, above the NIfTI-1 limit of {}",
            i16::MAX
        ))
    })
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> NiftiError + '_ {
    move |source| NiftiError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Read a `.nii` or `.nii.gz` file
pub fn read_image(path: &Path) -> Result<NiftiImage> {
    let mut raw = Vec::new();
    File::open(path)
        .and_then(|mut file| file.read_to_end(&mut raw))
        .map_err(io_error(path))?;

    let bytes = if raw.starts_with(&GZIP_MAGIC) {
        let mut decoded = Vec::new();
        GzDecoder::new(raw.as_slice())
            .read_to_end(&mut decoded)
            .map_err(io_error(path))?;
        decoded
    } else {
        raw
    };

    log::debug!("decoding NIfTI image {} ({} bytes)", path.display(), bytes.len());
    decode(&bytes)
}

/// Decode an in-memory (uncompressed) NIfTI-1 file
pub fn decode(bytes: &[u8]) -> Result<NiftiImage> {
    let (header, endian) = NiftiHeader::parse(bytes)?;
    let grid = header.grid()?;
    let n_volumes = header.n_volumes();
    let width = header.datatype.size();

    let expected = data_len(&header.dims, width)
        .ok_or_else(|| NiftiError::InvalidHeader("image size overflows".to_string()))?;
    let available = bytes.len().saturating_sub(header.vox_offset);
    if available < expected {
        return Err(NiftiError::Truncated {
            expected,
            actual: available,
        });
    }

    let payload = &bytes[header.vox_offset..header.vox_offset + expected];
    let scaling = header.scaling();
    let data: Vec<f64> = payload
        .chunks_exact(width)
        .map(|chunk| {
            let value = endian.sample(header.datatype, chunk);
            match scaling {
                Some((slope, inter)) => value * slope + inter,
                None => value,
            }
        })
        .collect();

    let stack = VolumeStack::new(grid, n_volumes, data)?;
    Ok(NiftiImage { header, stack })
}

/// Read a file expected to hold a single 3-D volume
pub fn read_volume(path: &Path) -> Result<Volume> {
    read_image(path)?.into_volume()
}

/// Read a file as a stack of volumes
pub fn read_stack(path: &Path) -> Result<VolumeStack> {
    Ok(read_image(path)?.into_stack())
}

/// Encode a stack as an uncompressed little-endian float32 NIfTI-1 file
///
/// Fails when a grid axis or the volume count exceeds what a NIfTI-1 header
/// can hold.
pub fn encode(stack: &VolumeStack) -> Result<Vec<u8>> {
    let grid = stack.grid();
    let rows = grid.affine.rows();
    let n_volumes = stack.n_volumes();

    let mut header = vec![0u8; DATA_OFFSET];
    LittleEndian::write_i32(&mut header[0..4], HEADER_SIZE as i32);

    let ndim: i16 = if n_volumes > 1 { 4 } else { 3 };
    let dims = [
        ndim,
        dim_field("dim[1]", grid.shape[0])?,
        dim_field("dim[2]", grid.shape[1])?,
        dim_field("dim[3]", grid.shape[2])?,
        dim_field("volume count", n_volumes)?,
        1,
        1,
        1,
    ];
    for (axis, value) in dims.iter().enumerate() {
        LittleEndian::write_i16(&mut header[40 + 2 * axis..42 + 2 * axis], *value);
    }

    LittleEndian::write_i16(&mut header[70..72], Datatype::Float32.code());
    LittleEndian::write_i16(&mut header[72..74], 32);

    let mut pixdim = [1.0f32; 8];
    for axis in 0..3 {
        let column_norm = (0..3)
            .map(|r| rows[r][axis] * rows[r][axis])
            .sum::<f64>()
            .sqrt();
        pixdim[axis + 1] = column_norm as f32;
    }
    for (axis, value) in pixdim.iter().enumerate() {
        LittleEndian::write_f32(&mut header[76 + 4 * axis..80 + 4 * axis], *value);
    }

    LittleEndian::write_f32(&mut header[108..112], DATA_OFFSET as f32);
    LittleEndian::write_f32(&mut header[112..116], 1.0);
    LittleEndian::write_i16(&mut header[254..256], 1);
    for (r, row) in rows.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            let offset = 280 + 16 * r + 4 * c;
            LittleEndian::write_f32(&mut header[offset..offset + 4], *value as f32);
        }
    }
    header[344..348].copy_from_slice(b"n+1\0");

    let mut out = header;
    out.reserve(grid.n_voxels() * n_volumes * 4);
    for volume in stack.iter_volumes() {
        for &value in volume {
            // Writing into a Vec cannot fail
            let _ = out.write_f32::<LittleEndian>(value as f32);
        }
    }
    Ok(out)
}

/// Write a stack to disk, gzip-compressed when the path ends in `.gz`
pub fn write_image(path: &Path, stack: &VolumeStack) -> Result<()> {
    let bytes = encode(stack)?;
    let file = File::create(path).map_err(io_error(path))?;
    let mut writer = BufWriter::new(file);

    let compressed = path
        .file_name()
        .map(|name| name.to_string_lossy().ends_with(".gz"))
        .unwrap_or(false);

    if compressed {
        let mut encoder = GzEncoder::new(writer, Compression::default());
        encoder.write_all(&bytes).map_err(io_error(path))?;
        encoder
            .finish()
            .and_then(|mut inner| inner.flush())
            .map_err(io_error(path))?;
    } else {
        writer.write_all(&bytes).map_err(io_error(path))?;
        writer.flush().map_err(io_error(path))?;
    }

    log::debug!("wrote NIfTI image {}", path.display());
    Ok(())
}
