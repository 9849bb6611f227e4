use glam::{DMat3, DMat4, DVec3};
use nalgebra::{Matrix3, Matrix4, Vector3};

/// Convert a glam 3x3 matrix into a nalgebra matrix.
pub fn mat3_to_na(m: &DMat3) -> Matrix3<f64> {
    // both are column-major
    Matrix3::from_column_slice(&m.to_cols_array())
}

/// Convert a nalgebra 3x3 matrix into a glam matrix.
pub fn mat3_from_na(m: &Matrix3<f64>) -> DMat3 {
    let mut cols = [0.0; 9];
    cols.copy_from_slice(m.as_slice());
    DMat3::from_cols_array(&cols)
}

/// Convert a glam 4x4 matrix into a nalgebra matrix.
pub fn mat4_to_na(m: &DMat4) -> Matrix4<f64> {
    Matrix4::from_column_slice(&m.to_cols_array())
}

/// Convert a glam vector into a nalgebra vector.
pub fn vec3_to_na(v: DVec3) -> Vector3<f64> {
    Vector3::new(v.x, v.y, v.z)
}

/// Convert a nalgebra vector into a glam vector.
pub fn vec3_from_na(v: &Vector3<f64>) -> DVec3 {
    DVec3::new(v.x, v.y, v.z)
}

/// Build a glam matrix from row-major nested arrays.
pub fn mat3_from_rows(rows: &[[f64; 3]; 3]) -> DMat3 {
    DMat3::from_cols_array_2d(rows).transpose()
}

/// Row-major nested arrays of a glam matrix.
pub fn mat3_to_rows(m: &DMat3) -> [[f64; 3]; 3] {
    m.transpose().to_cols_array_2d()
}

/// Build a glam matrix from row-major nested arrays.
pub fn mat4_from_rows(rows: &[[f64; 4]; 4]) -> DMat4 {
    DMat4::from_cols_array_2d(rows).transpose()
}

/// Row-major nested arrays of a glam matrix.
pub fn mat4_to_rows(m: &DMat4) -> [[f64; 4]; 4] {
    m.transpose().to_cols_array_2d()
}

/// Element `(row, col)` of a glam matrix.
#[inline]
pub fn mat3_at(m: &DMat3, row: usize, col: usize) -> f64 {
    m.col(col)[row]
}

/// Transform a set of points using a rotation and translation.
///
/// # Arguments
///
/// * `src_points` - A set of points to be transformed.
/// * `dst_r_src` - A rotation matrix.
/// * `dst_t_src` - A translation vector.
///
/// Example:
///
/// ```
/// use glam::{DMat3, DVec3};
/// use recon_3d::linalg::transform_points;
///
/// let src_points = vec![DVec3::new(2.0, 2.0, 2.0), DVec3::new(3.0, 4.0, 5.0)];
/// let dst_points = transform_points(&src_points, &DMat3::IDENTITY, DVec3::new(1.0, 0.0, 0.0));
/// assert_eq!(dst_points[0], DVec3::new(3.0, 2.0, 2.0));
/// ```
pub fn transform_points(src_points: &[DVec3], dst_r_src: &DMat3, dst_t_src: DVec3) -> Vec<DVec3> {
    src_points
        .iter()
        .map(|p| *dst_r_src * *p + dst_t_src)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_major_roundtrip() {
        let rows = [[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]];
        let m = mat3_from_rows(&rows);
        assert_eq!(mat3_at(&m, 0, 2), 3.0);
        assert_eq!(mat3_at(&m, 2, 0), 7.0);
        assert_eq!(mat3_to_rows(&m), rows);

        let na = mat3_to_na(&m);
        assert_eq!(na[(0, 2)], 3.0);
        assert_eq!(na[(2, 0)], 7.0);
        assert_eq!(mat3_from_na(&na), m);
    }

    #[test]
    fn test_mat4_rows() {
        let rows = [
            [1.0, 0.0, 0.0, 4.0],
            [0.0, 1.0, 0.0, 5.0],
            [0.0, 0.0, 1.0, 6.0],
            [0.0, 0.0, 0.0, 1.0],
        ];
        let m = mat4_from_rows(&rows);
        assert_eq!(m.w_axis.x, 4.0);
        assert_eq!(mat4_to_rows(&m), rows);
        assert_eq!(mat4_to_na(&m)[(1, 3)], 5.0);
    }

    #[test]
    fn test_transform_points() {
        let rotation = DMat3::from_rotation_z(std::f64::consts::FRAC_PI_2);
        let points = transform_points(&[DVec3::X], &rotation, DVec3::ZERO);
        approx::assert_abs_diff_eq!(points[0].y, 1.0, epsilon = 1e-12);
        approx::assert_abs_diff_eq!(points[0].x, 0.0, epsilon = 1e-12);
    }
}
