//! Resampling of 3D voxel grids onto a new affine

use crate::error::{PrepError, Result};
use crate::geometry::{grid_bounds, Affine};
use nalgebra::Vector3;
use ndarray::Array3;
use num_traits::Float;

/// Slack for round-off when deciding whether a point lies on the grid
const GRID_TOLERANCE: f64 = 1e-6;

/// Shape of the target grid that covers the whole source field of view.
///
/// The source corners are mapped into target voxel space and the upper bound
/// along each axis gives the last target index. The target origin is kept, so
/// anything at negative target indices is cropped.
pub fn covering_shape(
    source_shape: [usize; 3],
    source_affine: &Affine,
    target_affine: &Affine,
) -> Result<[usize; 3]> {
    let to_target = target_affine.inverse()?.then_from(source_affine);
    let bounds = grid_bounds(source_shape, &to_target);

    let mut shape = [1usize; 3];
    for (n, (_, hi)) in shape.iter_mut().zip(bounds.iter()) {
        if !hi.is_finite() {
            return Err(PrepError::InvalidGeometry(
                "target grid bounds are not finite".to_string(),
            ));
        }
        *n = (hi - GRID_TOLERANCE).ceil().max(0.0) as usize + 1;
    }
    Ok(shape)
}

/// Resample `data` (on `source_affine`) onto `target_affine` with `shape`.
///
/// Values are interpolated trilinearly. Target voxels whose centre falls
/// outside the source grid are set to zero.
pub fn resample<T: Float>(
    data: &Array3<T>,
    source_affine: &Affine,
    target_affine: &Affine,
    shape: [usize; 3],
) -> Result<Array3<T>> {
    if data.is_empty() {
        return Err(PrepError::InvalidDimensions(
            "cannot resample an empty volume".to_string(),
        ));
    }

    let to_source = source_affine.inverse()?.then_from(target_affine);

    Ok(Array3::from_shape_fn(
        (shape[0], shape[1], shape[2]),
        |(i, j, k)| {
            let p = to_source.transform_point(Vector3::new(i as f64, j as f64, k as f64));
            trilinear(data, [p[0], p[1], p[2]])
        },
    ))
}

/// Trilinear sample of `data` at continuous voxel coordinate `p`
pub fn trilinear<T: Float>(data: &Array3<T>, p: [f64; 3]) -> T {
    let dims = data.dim();
    let dims = [dims.0, dims.1, dims.2];

    let mut lo = [0usize; 3];
    let mut hi = [0usize; 3];
    let mut frac = [0.0f64; 3];

    for axis in 0..3 {
        let last = (dims[axis] - 1) as f64;
        let c = p[axis];
        if !(c >= -GRID_TOLERANCE && c <= last + GRID_TOLERANCE) {
            return T::zero();
        }
        let c = c.clamp(0.0, last);
        let i0 = c.floor() as usize;
        lo[axis] = i0;
        hi[axis] = (i0 + 1).min(dims[axis] - 1);
        frac[axis] = c - i0 as f64;
    }

    let mut acc = 0.0f64;
    for corner in 0..8 {
        let mut weight = 1.0;
        let mut idx = [0usize; 3];
        for axis in 0..3 {
            if corner & (1 << axis) != 0 {
                weight *= frac[axis];
                idx[axis] = hi[axis];
            } else {
                weight *= 1.0 - frac[axis];
                idx[axis] = lo[axis];
            }
        }
        if weight == 0.0 {
            continue;
        }
        let value = data[[idx[0], idx[1], idx[2]]].to_f64().unwrap_or(0.0);
        acc += weight * value;
    }

    num_traits::cast(acc).unwrap_or_else(T::zero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ramp(shape: [usize; 3]) -> Array3<f64> {
        Array3::from_shape_fn((shape[0], shape[1], shape[2]), |(i, j, k)| {
            i as f64 + 10.0 * j as f64 + 100.0 * k as f64
        })
    }

    #[test]
    fn test_trilinear_on_grid_points() {
        let data = ramp([4, 3, 2]);
        assert_relative_eq!(trilinear(&data, [0.0, 0.0, 0.0]), 0.0);
        assert_relative_eq!(trilinear(&data, [3.0, 2.0, 1.0]), 123.0);
    }

    #[test]
    fn test_trilinear_reproduces_linear_field() {
        let data = ramp([4, 3, 2]);
        assert_relative_eq!(trilinear(&data, [1.5, 0.25, 0.5]), 54.0, epsilon = 1e-12);
    }

    #[test]
    fn test_trilinear_outside_is_zero() {
        let data = ramp([4, 3, 2]);
        assert_eq!(trilinear(&data, [-0.5, 0.0, 0.0]), 0.0);
        assert_eq!(trilinear(&data, [0.0, 2.5, 0.0]), 0.0);
        // round-off at the far edge is still inside
        assert_relative_eq!(trilinear(&data, [3.0 + 1e-9, 0.0, 0.0]), 3.0);
    }

    #[test]
    fn test_covering_shape_mixed_axes() {
        let source = Affine::axis_aligned([0.3, 0.3, 1.0], [0.0; 3]);
        let target = source.scale_axes([0.5 / 0.3, 0.5 / 0.3, 1.0]);
        let shape = covering_shape([10, 10, 4], &source, &target).unwrap();
        // 9 * 0.3 / 0.5 = 5.4 -> indices 0..=6
        assert_eq!(shape, [7, 7, 4]);
    }

    #[test]
    fn test_covering_shape_exact_multiple() {
        let source = Affine::axis_aligned([0.25, 1.0, 1.0], [0.0; 3]);
        let target = source.scale_axes([2.0, 1.0, 1.0]);
        let shape = covering_shape([9, 2, 1], &source, &target).unwrap();
        assert_eq!(shape, [5, 2, 1]);
    }

    #[test]
    fn test_resample_downscales_ramp() {
        let data = ramp([9, 2, 1]);
        let source = Affine::axis_aligned([0.25, 1.0, 1.0], [3.0, -1.0, 0.0]);
        let target = source.scale_axes([2.0, 1.0, 1.0]);
        let shape = covering_shape([9, 2, 1], &source, &target).unwrap();
        let out = resample(&data, &source, &target, shape).unwrap();

        assert_eq!(out.dim(), (5, 2, 1));
        for i in 0..5 {
            assert_relative_eq!(out[[i, 1, 0]], 2.0 * i as f64 + 10.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_resample_flipped_axis() {
        // x runs towards negative world coordinates
        let data = ramp([5, 1, 1]);
        let source = Affine::axis_aligned([-0.4, 1.0, 1.0], [0.0; 3]);
        let target = source.scale_axes([1.25, 1.0, 1.0]);
        let shape = covering_shape([5, 1, 1], &source, &target).unwrap();
        let out = resample(&data, &source, &target, shape).unwrap();

        // 4 * 0.4 / 0.5 = 3.2, so the last target voxel is past the source edge
        assert_eq!(out.dim(), (5, 1, 1));
        assert_relative_eq!(out[[1, 0, 0]], 1.25, epsilon = 1e-9);
        assert_relative_eq!(out[[3, 0, 0]], 3.75, epsilon = 1e-9);
        assert_eq!(out[[4, 0, 0]], 0.0);
    }

    #[test]
    fn test_resample_f32() {
        let data = Array3::<f32>::from_elem((6, 6, 6), 7.0);
        let source = Affine::axis_aligned([0.2, 0.2, 0.2], [0.0; 3]);
        let target = source.scale_axes([2.5, 2.5, 2.5]);
        let shape = covering_shape([6, 6, 6], &source, &target).unwrap();
        let out = resample(&data, &source, &target, shape).unwrap();
        assert_eq!(out.dim(), (3, 3, 3));
        assert!(out.iter().all(|v| (*v - 7.0).abs() < 1e-5));
    }
}
