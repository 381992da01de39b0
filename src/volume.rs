//! NIfTI volumes: loading, geometry and writing
//!
//! A [`Volume`] keeps the header it was read with untouched. Geometry lives in
//! the [`Affine`] and the voxel buffer; the header is only adjusted on the way
//! out, in [`Volume::save`], so that the file on disk describes the grid that
//! is actually stored.

use crate::error::{PrepError, Result};
use crate::geometry::Affine;
use crate::types::Resolution;
use nalgebra::{Matrix3, Vector3};
use ndarray::{Array3, ArrayD, Axis, Ix3};
use nifti::writer::WriterOptions;
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, NiftiType, ReaderOptions};
use num_traits::{Bounded, Zero};
use std::path::Path;
use tracing::debug;

/// NIfTI sform/qform code for "aligned to another file"
const XFORM_ALIGNED: i16 = 2;

/// A 3D scalar volume with its voxel-to-world transform and original header
#[derive(Debug, Clone)]
pub struct Volume {
    header: NiftiHeader,
    affine: Affine,
    data: Array3<f32>,
}

impl Volume {
    /// Assemble a volume from parts
    pub fn new(header: NiftiHeader, affine: Affine, data: Array3<f32>) -> Self {
        Self {
            header,
            affine,
            data,
        }
    }

    /// Read a `.nii` or `.nii.gz` file.
    ///
    /// Intensities are converted to `f32` with the header's slope and
    /// intercept applied. Trailing singleton dimensions are dropped; anything
    /// that is not 3D after that is rejected.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let object = ReaderOptions::new().read_file(path)?;
        let header = object.header().clone();
        let data = squeeze_to_3d(object.into_volume().into_ndarray::<f32>()?)?;

        let (nx, ny, nz) = data.dim();
        let affine = header_affine(&header, [nx, ny, nz]);
        debug!(
            "Loaded {} ({}x{}x{}, spacing {})",
            path.display(),
            nx,
            ny,
            nz,
            affine.voxel_spacing()
        );

        Ok(Self {
            header,
            affine,
            data,
        })
    }

    /// Same header, new sampling grid
    pub fn with_grid(&self, data: Array3<f32>, affine: Affine) -> Volume {
        Self {
            header: self.header.clone(),
            affine,
            data,
        }
    }

    /// Header exactly as it was read
    pub fn header(&self) -> &NiftiHeader {
        &self.header
    }

    pub fn affine(&self) -> &Affine {
        &self.affine
    }

    pub fn data(&self) -> &Array3<f32> {
        &self.data
    }

    pub fn shape(&self) -> [usize; 3] {
        let (nx, ny, nz) = self.data.dim();
        [nx, ny, nz]
    }

    pub fn voxel_spacing(&self) -> Resolution {
        self.affine.voxel_spacing()
    }

    /// Write the volume; the file is gzipped when `path` ends in `.gz`.
    ///
    /// Voxels are stored in the header's datatype. Integer types get the
    /// intensities rounded and clamped to their range; a missing or
    /// non-scalar datatype is stored as `f32`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let header = self.header_for_write();
        let options = WriterOptions::new(path).reference_header(&header);

        let datatype = self.storage_type();
        match datatype {
            NiftiType::Uint8 => options.write_nifti(&cast_rounded::<u8>(&self.data)),
            NiftiType::Int8 => options.write_nifti(&cast_rounded::<i8>(&self.data)),
            NiftiType::Uint16 => options.write_nifti(&cast_rounded::<u16>(&self.data)),
            NiftiType::Int16 => options.write_nifti(&cast_rounded::<i16>(&self.data)),
            NiftiType::Uint32 => options.write_nifti(&cast_rounded::<u32>(&self.data)),
            NiftiType::Int32 => options.write_nifti(&cast_rounded::<i32>(&self.data)),
            NiftiType::Uint64 => options.write_nifti(&cast_rounded::<u64>(&self.data)),
            NiftiType::Int64 => options.write_nifti(&cast_rounded::<i64>(&self.data)),
            NiftiType::Float64 => options.write_nifti(&self.data.mapv(f64::from)),
            _ => options.write_nifti(&self.data),
        }?;
        debug!("Wrote {} as {:?}", path.display(), datatype);
        Ok(())
    }

    /// Element type written by [`Volume::save`]
    pub fn storage_type(&self) -> NiftiType {
        match self.header.data_type() {
            Ok(
                datatype @ (NiftiType::Uint8
                | NiftiType::Int8
                | NiftiType::Uint16
                | NiftiType::Int16
                | NiftiType::Uint32
                | NiftiType::Int32
                | NiftiType::Uint64
                | NiftiType::Int64
                | NiftiType::Float32
                | NiftiType::Float64),
            ) => datatype,
            _ => NiftiType::Float32,
        }
    }

    /// Header to put on disk: the original header with grid fields brought in
    /// line with the current affine.
    ///
    /// Stored values are the intensities themselves, so the scaling is reset
    /// to identity. `datatype` and `bitpix` are filled in by the writer from
    /// [`Volume::storage_type`].
    ///
    /// The qform rotation is kept as is. Scaling columns by positive factors
    /// does not change their directions, so only the zooms need updating.
    pub fn header_for_write(&self) -> NiftiHeader {
        let mut header = self.header.clone();
        let spacing = self.affine.voxel_spacing();

        for axis in 0..3 {
            header.pixdim[axis + 1] = spacing.get(axis) as f32;
        }

        if header.sform_code <= 0 && header.qform_code <= 0 {
            header.sform_code = XFORM_ALIGNED;
        }
        if header.sform_code > 0 {
            let rows = self.affine.rows();
            header.srow_x = rows[0].map(|v| v as f32);
            header.srow_y = rows[1].map(|v| v as f32);
            header.srow_z = rows[2].map(|v| v as f32);
        }

        header.scl_slope = 1.0;
        header.scl_inter = 0.0;
        header
    }
}

/// Round `data` into an integer type, saturating at its bounds; NaN maps to 0
fn cast_rounded<T>(data: &Array3<f32>) -> Array3<T>
where
    T: Bounded + num_traits::NumCast + Zero + Copy,
{
    data.mapv(|v| {
        if v.is_nan() {
            return T::zero();
        }
        let v = v.round();
        num_traits::NumCast::from(v).unwrap_or(if v > 0.0 {
            T::max_value()
        } else {
            T::min_value()
        })
    })
}

/// Drop trailing length-1 axes and check the result is 3D
fn squeeze_to_3d(mut data: ArrayD<f32>) -> Result<Array3<f32>> {
    while data.ndim() > 3 {
        let last = data.ndim() - 1;
        if data.shape()[last] != 1 {
            return Err(PrepError::InvalidDimensions(format!(
                "expected a 3D volume, got shape {:?}",
                data.shape()
            )));
        }
        data = data.index_axis_move(Axis(last), 0);
    }

    if data.ndim() != 3 {
        return Err(PrepError::InvalidDimensions(format!(
            "expected a 3D volume, got {}D",
            data.ndim()
        )));
    }

    Ok(data.into_dimensionality::<Ix3>()?)
}

/// Voxel-to-world transform described by a header.
///
/// The sform wins when its code is set, then the qform, and failing both the
/// Analyze-style transform built from `pixdim` with x flipped and the origin
/// at the grid centre.
pub fn header_affine(header: &NiftiHeader, shape: [usize; 3]) -> Affine {
    if header.sform_code > 0 {
        Affine::from_rows([
            header.srow_x.map(f64::from),
            header.srow_y.map(f64::from),
            header.srow_z.map(f64::from),
        ])
    } else if header.qform_code > 0 {
        qform_affine(header)
    } else {
        base_affine(header, shape)
    }
}

fn qform_affine(header: &NiftiHeader) -> Affine {
    let b = f64::from(header.quatern_b);
    let c = f64::from(header.quatern_c);
    let d = f64::from(header.quatern_d);
    let a = (1.0 - (b * b + c * c + d * d)).max(0.0).sqrt();

    #[rustfmt::skip]
    let rotation = Matrix3::new(
        a * a + b * b - c * c - d * d, 2.0 * (b * c - a * d),         2.0 * (b * d + a * c),
        2.0 * (b * c + a * d),         a * a + c * c - b * b - d * d, 2.0 * (c * d - a * b),
        2.0 * (b * d - a * c),         2.0 * (c * d + a * b),         a * a + d * d - b * b - c * c,
    );

    let qfac = if header.pixdim[0] < 0.0 { -1.0 } else { 1.0 };
    let zooms = Vector3::new(
        f64::from(header.pixdim[1]),
        f64::from(header.pixdim[2]),
        f64::from(header.pixdim[3]) * qfac,
    );

    Affine::from_parts(
        rotation * Matrix3::from_diagonal(&zooms),
        Vector3::new(
            f64::from(header.quatern_x),
            f64::from(header.quatern_y),
            f64::from(header.quatern_z),
        ),
    )
}

fn base_affine(header: &NiftiHeader, shape: [usize; 3]) -> Affine {
    let step = [
        -f64::from(header.pixdim[1]),
        f64::from(header.pixdim[2]),
        f64::from(header.pixdim[3]),
    ];
    let mut origin = [0.0; 3];
    for axis in 0..3 {
        let centre = shape[axis].saturating_sub(1) as f64 / 2.0;
        origin[axis] = -step[axis] * centre;
    }
    Affine::axis_aligned(step, origin)
}
