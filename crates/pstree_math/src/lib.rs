// Re-export glam for convenience
pub use glam::*;

// pstree math types
mod transform;
pub use transform::{decode_affine_3x4, Transform, TransformError, AFFINE_3X4_LEN};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glam_reexport() {
        let v = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(v + Vec3::ONE, Vec3::new(2.0, 3.0, 4.0));
    }
}
