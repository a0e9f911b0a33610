// Local transforms for product structure nodes.
//
// Exported CAD assemblies store placements as a flat row-major 3x4 affine
// matrix (three rotation/scale columns plus a translation column, with an
// implicit last row of 0 0 0 1). glam is column-major, so the rows are
// transposed before decomposition. Placements stay in f64: millimeter
// coordinates of a large assembly do not fit f32 precision.

use glam::{DMat4, DQuat, DVec3};
use thiserror::Error;

/// Number of elements in a flat 3x4 affine matrix.
pub const AFFINE_3X4_LEN: usize = 12;

/// Errors produced when decoding a flat affine matrix.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformError {
    #[error("affine matrix must have {expected} elements, got {actual}")]
    WrongLength { expected: usize, actual: usize },

    #[error("affine matrix element {index} is not a finite number")]
    NonFinite { index: usize },
}

/// Transform components that can be composed into a matrix.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    /// Translation
    pub translation: DVec3,

    /// Rotation (as quaternion)
    pub rotation: DQuat,

    /// Scale
    pub scale: DVec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: DVec3::ZERO,
        rotation: DQuat::IDENTITY,
        scale: DVec3::ONE,
    };

    /// Create a new transform with only translation.
    pub fn from_translation(translation: DVec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    /// Create a new transform with only a uniform scale.
    pub fn from_uniform_scale(scale: f64) -> Self {
        Self {
            scale: DVec3::splat(scale),
            ..Self::IDENTITY
        }
    }

    /// Create a new transform from a 4x4 matrix.
    ///
    /// Decomposes the matrix into translation, rotation, and scale.
    pub fn from_matrix(matrix: DMat4) -> Self {
        let (scale, rotation, translation) = matrix.to_scale_rotation_translation();
        Self {
            translation,
            rotation,
            scale,
        }
    }

    /// Decode a flat row-major 3x4 affine matrix. See [`decode_affine_3x4`].
    pub fn from_affine_3x4(data: &[f64]) -> Result<Self, TransformError> {
        decode_affine_3x4(data)
    }

    /// Convert to a 4x4 transformation matrix.
    ///
    /// Order: Scale -> Rotate -> Translate (SRT)
    pub fn to_matrix(&self) -> DMat4 {
        DMat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    /// Compose `self` (parent) with `local` (child), returning the child's
    /// transform expressed in the parent's space.
    pub fn mul(&self, local: &Transform) -> Transform {
        Transform::from_matrix(self.to_matrix() * local.to_matrix())
    }

    /// Transform a point from local space into the space this transform maps to.
    pub fn transform_point(&self, point: DVec3) -> DVec3 {
        self.to_matrix().transform_point3(point)
    }
}

/// Decode a flat row-major 3x4 affine matrix into a [`Transform`].
///
/// The input is read as rows `[d0 d1 d2 d3] [d4 d5 d6 d7] [d8 d9 d10 d11]`
/// with an implicit `[0 0 0 1]` last row, so the translation is
/// `(d3, d7, d11)`. No homogeneous divide is performed.
pub fn decode_affine_3x4(data: &[f64]) -> Result<Transform, TransformError> {
    if data.len() != AFFINE_3X4_LEN {
        return Err(TransformError::WrongLength {
            expected: AFFINE_3X4_LEN,
            actual: data.len(),
        });
    }
    if let Some(index) = data.iter().position(|v| !v.is_finite()) {
        return Err(TransformError::NonFinite { index });
    }

    // Loaded as columns, then transposed so each input row becomes a matrix row.
    let mut cols = [0.0; 16];
    cols[..AFFINE_3X4_LEN].copy_from_slice(data);
    cols[15] = 1.0;
    let matrix = DMat4::from_cols_array(&cols).transpose();

    Ok(Transform::from_matrix(matrix))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-6;

    #[test]
    fn test_decode_translation_only() {
        let data = [
            1.0, 0.0, 0.0, 12.5, //
            0.0, 1.0, 0.0, -3.0, //
            0.0, 0.0, 1.0, 250.0,
        ];
        let transform = decode_affine_3x4(&data).unwrap();

        assert!((transform.translation - DVec3::new(12.5, -3.0, 250.0)).length() < EPS);
        assert!((transform.rotation * DVec3::X - DVec3::X).length() < EPS);
        assert!((transform.rotation * DVec3::Y - DVec3::Y).length() < EPS);
        assert!((transform.scale - DVec3::ONE).length() < EPS);
    }

    #[test]
    fn test_decode_keeps_millimeter_precision() {
        let data = [
            1.0, 0.0, 0.0, 1234.5678, //
            0.0, 1.0, 0.0, -987.6543, //
            0.0, 0.0, 1.0, 0.1,
        ];
        let transform = decode_affine_3x4(&data).unwrap();
        let expected = DVec3::new(1234.5678, -987.6543, 0.1);

        let error = (transform.translation - expected).abs();
        assert!(error.max_element() < 1e-6, "error {error:?}");
    }

    #[test]
    fn test_decode_identity() {
        let data = [
            1.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0,
        ];
        let transform = decode_affine_3x4(&data).unwrap();
        assert!(transform.to_matrix().abs_diff_eq(DMat4::IDENTITY, EPS));
    }

    #[test]
    fn test_decode_rotation_about_z() {
        // 90 degrees about Z: x axis maps to y.
        let data = [
            0.0, -1.0, 0.0, 1.0, //
            1.0, 0.0, 0.0, 2.0, //
            0.0, 0.0, 1.0, 3.0,
        ];
        let transform = decode_affine_3x4(&data).unwrap();
        let rotated = transform.rotation * DVec3::X;

        assert!((rotated - DVec3::Y).length() < 1e-5);
        assert!((transform.translation - DVec3::new(1.0, 2.0, 3.0)).length() < EPS);

        let mapped = transform.transform_point(DVec3::X);
        assert!((mapped - DVec3::new(1.0, 3.0, 3.0)).length() < 1e-5);
    }

    #[test]
    fn test_decode_scale() {
        let data = [
            2.0, 0.0, 0.0, 0.0, //
            0.0, 3.0, 0.0, 0.0, //
            0.0, 0.0, 4.0, 0.0,
        ];
        let transform = decode_affine_3x4(&data).unwrap();
        assert!((transform.scale - DVec3::new(2.0, 3.0, 4.0)).length() < EPS);
    }

    #[test]
    fn test_decode_does_not_mutate_input() {
        let data = vec![1.0, 0.0, 0.0, 5.0, 0.0, 1.0, 0.0, 6.0, 0.0, 0.0, 1.0, 7.0];
        let copy = data.clone();
        let _ = Transform::from_affine_3x4(&data).unwrap();
        assert_eq!(data, copy);
    }

    #[test]
    fn test_decode_wrong_length() {
        let err = decode_affine_3x4(&[1.0, 0.0, 0.0]).unwrap_err();
        assert_eq!(
            err,
            TransformError::WrongLength {
                expected: 12,
                actual: 3
            }
        );

        let err = decode_affine_3x4(&[0.0; 16]).unwrap_err();
        assert!(matches!(err, TransformError::WrongLength { actual: 16, .. }));
    }

    #[test]
    fn test_decode_non_finite() {
        let mut data = [0.0; 12];
        data[7] = f64::NAN;
        assert_eq!(
            decode_affine_3x4(&data).unwrap_err(),
            TransformError::NonFinite { index: 7 }
        );
    }

    #[test]
    fn test_transform_matrix_roundtrip() {
        let transform = Transform {
            translation: DVec3::new(1.0, 2.0, 3.0),
            rotation: DQuat::from_rotation_y(std::f64::consts::FRAC_PI_4),
            scale: DVec3::new(2.0, 2.0, 2.0),
        };

        let recovered = Transform::from_matrix(transform.to_matrix());

        assert!((recovered.translation - transform.translation).length() < 0.001);
        assert!((recovered.scale - transform.scale).length() < 0.001);
    }

    #[test]
    fn test_mul_applies_parent_scale_to_child_translation() {
        let parent = Transform::from_uniform_scale(0.001);
        let child = Transform::from_translation(DVec3::new(1000.0, 0.0, 0.0));

        let world = parent.mul(&child);
        assert!((world.translation - DVec3::new(1.0, 0.0, 0.0)).length() < 1e-5);
        assert!((world.scale - DVec3::splat(0.001)).length() < 1e-7);
    }
}
