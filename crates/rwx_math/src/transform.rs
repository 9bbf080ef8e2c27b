// Transform utilities for DMat4
//
// Matrices follow glam's column-vector convention: a point is transformed as
// `m * p`, translation lives in the last column, and `a * b` applies `b` first.

use glam::{DMat4, DVec3, DVec4};

use crate::Aabb;

/// Extension trait for DMat4 with helpers used when placing imported geometry.
pub trait DMat4Ext {
    /// Transform an axis-aligned bounding box.
    /// Computes the bounding box of all 8 transformed corners.
    fn transform_aabb(&self, aabb: &Aabb) -> Aabb;

    /// Returns true when the bottom row is exactly `(0, 0, 0, 1)`.
    fn is_affine(&self) -> bool;
}

impl DMat4Ext for DMat4 {
    fn transform_aabb(&self, aabb: &Aabb) -> Aabb {
        if aabb.is_empty() {
            return Aabb::empty();
        }
        Aabb::enclosing(aabb.corners().iter().map(|&c| self.transform_point3(c)))
    }

    fn is_affine(&self) -> bool {
        self.row(3) == DVec4::W
    }
}

/// Rotation of `degrees` about `axis` (right-handed, counter-clockwise when
/// looking down the axis towards the origin).
///
/// Returns `None` when the axis has zero length or is not finite.
pub fn rotation_degrees(axis: DVec3, degrees: f64) -> Option<DMat4> {
    let axis = axis.try_normalize()?;
    Some(DMat4::from_axis_angle(axis, degrees.to_radians()))
}

/// Build the matrix for a 16-value `transform` command.
///
/// The values are read as four rows of a row-vector matrix with the translation
/// in values 12..15. The fourth value of every row is discarded and replaced by
/// the affine identity, so any projective component is lost.
pub fn affine_from_row_major(values: &[f64; 16]) -> DMat4 {
    // A row of the row-vector matrix is a column of the column-vector one.
    let col = |row: usize| DVec4::new(values[row * 4], values[row * 4 + 1], values[row * 4 + 2], 0.0);
    DMat4::from_cols(col(0), col(1), col(2), col(3) + DVec4::W)
}

/// Converts RWX's Y-up axis convention to a Z-up host: rotate -180 degrees
/// about Y, then 90 degrees about X.
pub fn axis_correction() -> DMat4 {
    DMat4::from_rotation_x(90f64.to_radians()) * DMat4::from_rotation_y((-180f64).to_radians())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: DVec3, b: DVec3) {
        assert!((a - b).length() < 1e-9, "{a:?} != {b:?}");
    }

    #[test]
    fn test_rotation_degrees_about_z() {
        let mat = rotation_degrees(DVec3::Z, 90.0).unwrap();
        assert_close(mat.transform_point3(DVec3::X), DVec3::Y);
    }

    #[test]
    fn test_rotation_axis_is_normalized() {
        let mat = rotation_degrees(DVec3::new(0.0, 0.0, 5.0), 90.0).unwrap();
        assert_close(mat.transform_point3(DVec3::X), DVec3::Y);
    }

    #[test]
    fn test_rotation_zero_axis_rejected() {
        assert!(rotation_degrees(DVec3::ZERO, 45.0).is_none());
    }

    #[test]
    fn test_affine_from_row_major_translation() {
        let values = [
            1.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            4.0, 5.0, 6.0, 1.0,
        ];
        let mat = affine_from_row_major(&values);

        assert_close(mat.transform_point3(DVec3::ZERO), DVec3::new(4.0, 5.0, 6.0));
        assert!(mat.is_affine());
    }

    #[test]
    fn test_affine_from_row_major_drops_projective_terms() {
        let values = [
            2.0, 0.0, 0.0, 7.0, //
            0.0, 3.0, 0.0, 8.0, //
            0.0, 0.0, 4.0, 9.0, //
            1.0, 1.0, 1.0, 5.0,
        ];
        let mat = affine_from_row_major(&values);

        assert!(mat.is_affine());
        assert_close(mat.transform_point3(DVec3::ONE), DVec3::new(3.0, 4.0, 5.0));
    }

    #[test]
    fn test_affine_from_row_major_rows_are_basis_images() {
        // First row is where the X axis goes.
        let values = [
            0.0, 1.0, 0.0, 0.0, //
            -1.0, 0.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ];
        let mat = affine_from_row_major(&values);

        assert_close(mat.transform_vector3(DVec3::X), DVec3::Y);
        assert_close(mat.transform_vector3(DVec3::Y), -DVec3::X);
    }

    #[test]
    fn test_axis_correction_maps_y_up_to_z_up() {
        let up = axis_correction().transform_vector3(DVec3::Y);
        assert_close(up, DVec3::Z);
    }

    #[test]
    fn test_transform_aabb_translation() {
        let mat = DMat4::from_translation(DVec3::splat(5.0));
        let aabb = Aabb::from_points(DVec3::ZERO, DVec3::ONE);
        let transformed = mat.transform_aabb(&aabb);

        assert_close(transformed.min(), DVec3::splat(5.0));
        assert_close(transformed.max(), DVec3::splat(6.0));
    }
}
