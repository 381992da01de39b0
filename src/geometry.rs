//! Voxel-to-world geometry
//!
//! An [`Affine`] maps integer voxel indices `(i, j, k)` to millimetre
//! coordinates. Its upper-left 3x3 block holds orientation and spacing, the
//! last column holds the world position of voxel `(0, 0, 0)`.

use crate::error::{PrepError, Result};
use crate::types::Resolution;
use nalgebra::{Matrix3, Matrix4, Vector3};

/// 4x4 homogeneous voxel-to-world transform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine(Matrix4<f64>);

impl Affine {
    /// Wrap a homogeneous matrix
    pub fn new(matrix: Matrix4<f64>) -> Self {
        Self(matrix)
    }

    /// Build from a 3x3 linear block and a translation
    pub fn from_parts(linear: Matrix3<f64>, translation: Vector3<f64>) -> Self {
        let mut m = Matrix4::identity();
        for r in 0..3 {
            for c in 0..3 {
                m[(r, c)] = linear[(r, c)];
            }
            m[(r, 3)] = translation[r];
        }
        Self(m)
    }

    /// Build from the first three rows, as stored in a NIfTI sform
    pub fn from_rows(rows: [[f64; 4]; 3]) -> Self {
        let mut m = Matrix4::identity();
        for (r, row) in rows.iter().enumerate() {
            for (c, v) in row.iter().enumerate() {
                m[(r, c)] = *v;
            }
        }
        Self(m)
    }

    /// Axis-aligned transform with the given spacing and origin
    pub fn axis_aligned(spacing: [f64; 3], origin: [f64; 3]) -> Self {
        Self::from_parts(
            Matrix3::from_diagonal(&Vector3::from(spacing)),
            Vector3::from(origin),
        )
    }

    pub fn matrix(&self) -> &Matrix4<f64> {
        &self.0
    }

    /// Upper-left 3x3 block
    pub fn linear(&self) -> Matrix3<f64> {
        Matrix3::from_fn(|r, c| self.0[(r, c)])
    }

    pub fn translation(&self) -> Vector3<f64> {
        Vector3::new(self.0[(0, 3)], self.0[(1, 3)], self.0[(2, 3)])
    }

    /// First three rows, for writing back into a NIfTI sform
    pub fn rows(&self) -> [[f64; 4]; 3] {
        let mut rows = [[0.0; 4]; 3];
        for (r, row) in rows.iter_mut().enumerate() {
            for (c, v) in row.iter_mut().enumerate() {
                *v = self.0[(r, c)];
            }
        }
        rows
    }

    /// Physical length of one step along each grid axis.
    ///
    /// This is the Euclidean norm of each column of the linear block, so it
    /// does not depend on how the grid is rotated or sheared in world space.
    pub fn voxel_spacing(&self) -> Resolution {
        let linear = self.linear();
        Resolution::new(
            linear.column(0).norm(),
            linear.column(1).norm(),
            linear.column(2).norm(),
        )
    }

    /// Right-multiply the linear block by `diag(scale)`, keeping the translation
    pub fn scale_axes(&self, scale: [f64; 3]) -> Affine {
        let linear = self.linear() * Matrix3::from_diagonal(&Vector3::from(scale));
        Self::from_parts(linear, self.translation())
    }

    /// Inverse transform (world to voxel)
    pub fn inverse(&self) -> Result<Affine> {
        let inv_linear = self.linear().try_inverse().ok_or_else(|| {
            PrepError::InvalidGeometry("affine linear block is singular".to_string())
        })?;
        let inv_translation = -(inv_linear * self.translation());
        Ok(Self::from_parts(inv_linear, inv_translation))
    }

    /// `self * other`: apply `other` first, then `self`
    pub fn then_from(&self, other: &Affine) -> Affine {
        Self(self.0 * other.0)
    }

    pub fn transform_point(&self, point: Vector3<f64>) -> Vector3<f64> {
        self.linear() * point + self.translation()
    }
}

/// Per-axis `(min, max)` of the corners of a voxel grid after `transform`
pub fn grid_bounds(shape: [usize; 3], transform: &Affine) -> [(f64, f64); 3] {
    let mut bounds = [(f64::INFINITY, f64::NEG_INFINITY); 3];
    let extent = shape.map(|n| n.saturating_sub(1) as f64);

    for corner in 0..8 {
        let p = Vector3::new(
            if corner & 1 != 0 { extent[0] } else { 0.0 },
            if corner & 2 != 0 { extent[1] } else { 0.0 },
            if corner & 4 != 0 { extent[2] } else { 0.0 },
        );
        let q = transform.transform_point(p);
        for (axis, (lo, hi)) in bounds.iter_mut().enumerate() {
            *lo = lo.min(q[axis]);
            *hi = hi.max(q[axis]);
        }
    }

    bounds
}
