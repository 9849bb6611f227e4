use glam::{DMat3, DQuat, DVec3};

use crate::linalg::mat3_at;
use crate::pose::PoseError;

const EPS: f64 = 1e-12;

/// Convert degrees to radians.
#[inline]
pub fn degrees_to_radians(degrees: f64) -> f64 {
    degrees * std::f64::consts::PI / 180.0
}

/// Convert radians to degrees.
#[inline]
pub fn radians_to_degrees(radians: f64) -> f64 {
    radians * 180.0 / std::f64::consts::PI
}

/// Compute the rotation matrix from an axis-angle (Rodrigues) vector.
///
/// The direction of `rvec` is the rotation axis and its norm the angle in radians.
///
/// Example:
///
/// ```
/// use glam::DVec3;
/// use recon_3d::transforms::axis_angle_to_rotation_matrix;
///
/// let rotation = axis_angle_to_rotation_matrix(DVec3::new(0.0, 0.0, std::f64::consts::FRAC_PI_2));
/// let x = rotation * DVec3::X;
/// assert!((x - DVec3::Y).length() < 1e-12);
/// ```
pub fn axis_angle_to_rotation_matrix(rvec: DVec3) -> DMat3 {
    let angle = rvec.length();
    if angle < EPS {
        return DMat3::IDENTITY;
    }
    DMat3::from_axis_angle(rvec / angle, angle)
}

/// Compute the axis-angle (Rodrigues) vector of a rotation matrix.
///
/// The returned angle lies in `[0, pi]`.
pub fn rotation_matrix_to_axis_angle(rotation: &DMat3) -> DVec3 {
    let [w, x, y, z] = rotation_matrix_to_quaternion(rotation);
    // keep the scalar part positive so the angle stays in [0, pi]
    let (w, v) = if w < 0.0 {
        (-w, DVec3::new(-x, -y, -z))
    } else {
        (w, DVec3::new(x, y, z))
    };
    let sin_half = v.length();
    if sin_half < EPS {
        return 2.0 * v;
    }
    let angle = 2.0 * sin_half.atan2(w);
    v / sin_half * angle
}

/// Normalize a `[w, x, y, z]` quaternion to unit length.
///
/// # Errors
///
/// Returns an error for a zero (or non-finite) quaternion.
pub fn normalize_quaternion(quaternion: [f64; 4]) -> Result<[f64; 4], PoseError> {
    let norm = quaternion.iter().map(|v| v * v).sum::<f64>().sqrt();
    if !(norm > EPS) || !norm.is_finite() {
        return Err(PoseError::DegenerateQuaternion(quaternion));
    }
    Ok(quaternion.map(|v| v / norm))
}

/// Rotation matrix of a `[w, x, y, z]` quaternion; the input is normalized first.
pub fn quaternion_to_rotation_matrix(quaternion: [f64; 4]) -> Result<DMat3, PoseError> {
    let [w, x, y, z] = normalize_quaternion(quaternion)?;
    Ok(DMat3::from_quat(DQuat::from_xyzw(x, y, z, w)))
}

/// Unit `[w, x, y, z]` quaternion of a rotation matrix.
///
/// Uses the trace when it is positive and otherwise the largest diagonal element, so the
/// divisor never gets close to zero.
pub fn rotation_matrix_to_quaternion(rotation: &DMat3) -> [f64; 4] {
    let m = |r, c| mat3_at(rotation, r, c);
    let trace = m(0, 0) + m(1, 1) + m(2, 2);

    if trace > 0.0 {
        let s = 0.5 / (trace + 1.0).sqrt();
        [
            0.25 / s,
            (m(2, 1) - m(1, 2)) * s,
            (m(0, 2) - m(2, 0)) * s,
            (m(1, 0) - m(0, 1)) * s,
        ]
    } else if m(0, 0) > m(1, 1) && m(0, 0) > m(2, 2) {
        let s = 2.0 * (1.0 + m(0, 0) - m(1, 1) - m(2, 2)).sqrt();
        [
            (m(2, 1) - m(1, 2)) / s,
            0.25 * s,
            (m(0, 1) + m(1, 0)) / s,
            (m(0, 2) + m(2, 0)) / s,
        ]
    } else if m(1, 1) > m(2, 2) {
        let s = 2.0 * (1.0 + m(1, 1) - m(0, 0) - m(2, 2)).sqrt();
        [
            (m(0, 2) - m(2, 0)) / s,
            (m(0, 1) + m(1, 0)) / s,
            0.25 * s,
            (m(1, 2) + m(2, 1)) / s,
        ]
    } else {
        let s = 2.0 * (1.0 + m(2, 2) - m(0, 0) - m(1, 1)).sqrt();
        [
            (m(1, 0) - m(0, 1)) / s,
            (m(0, 2) + m(2, 0)) / s,
            (m(1, 2) + m(2, 1)) / s,
            0.25 * s,
        ]
    }
}

/// Rotation matrix `Rz * Ry * Rx` from Euler angles `[x, y, z]` in degrees.
pub fn euler_to_rotation_matrix(angles: [f64; 3]) -> DMat3 {
    let [x, y, z] = angles.map(degrees_to_radians);
    DMat3::from_rotation_z(z) * DMat3::from_rotation_y(y) * DMat3::from_rotation_x(x)
}

/// Euler angles `[x, y, z]` in degrees of a rotation `Rz * Ry * Rx`.
///
/// Close to gimbal lock (`cos(y) < 1e-6`) the z angle is set to zero and x absorbs the
/// remaining rotation.
pub fn rotation_matrix_to_euler(rotation: &DMat3) -> [f64; 3] {
    let m = |r, c| mat3_at(rotation, r, c);
    let sy = (m(0, 0) * m(0, 0) + m(1, 0) * m(1, 0)).sqrt();

    let (x, y, z) = if sy < 1e-6 {
        ((-m(1, 2)).atan2(m(1, 1)), (-m(2, 0)).atan2(sy), 0.0)
    } else {
        (
            m(2, 1).atan2(m(2, 2)),
            (-m(2, 0)).atan2(sy),
            m(1, 0).atan2(m(0, 0)),
        )
    };

    [x, y, z].map(radians_to_degrees)
}

/// Rotate a point (or direction) without translating it.
#[inline]
pub fn rotate_point(rotation: &DMat3, point: DVec3) -> DVec3 {
    *rotation * point
}

/// Scale a vector to unit length.
///
/// # Errors
///
/// Returns an error for a zero-length vector.
pub fn normalize_vector(vector: DVec3) -> Result<DVec3, PoseError> {
    let magnitude = vector.length();
    if !(magnitude > EPS) || !magnitude.is_finite() {
        return Err(PoseError::ZeroLengthVector);
    }
    Ok(vector / magnitude)
}

/// The rotation that takes `old_normal` onto `new_normal`.
///
/// Returns the identity when both normals point the same way and a half turn about an
/// axis orthogonal to `old_normal` when they are opposite.
///
/// # Errors
///
/// Returns an error when either normal has zero length.
pub fn orientation_rotation(new_normal: DVec3, old_normal: DVec3) -> Result<DMat3, PoseError> {
    let new_normal = normalize_vector(new_normal)?;
    let old_normal = normalize_vector(old_normal)?;

    let axis = old_normal.cross(new_normal);
    let cos_angle = old_normal.dot(new_normal).clamp(-1.0, 1.0);

    if axis.length() < EPS {
        if cos_angle > 0.0 {
            return Ok(DMat3::IDENTITY);
        }
        let axis = normalize_vector(old_normal.any_orthonormal_vector())?;
        return Ok(DMat3::from_axis_angle(axis, std::f64::consts::PI));
    }

    Ok(DMat3::from_axis_angle(
        normalize_vector(axis)?,
        cos_angle.acos(),
    ))
}

/// Distance from `point` to the infinite line through `start` with direction `gradient`.
pub fn line_point_distance(start: DVec3, gradient: DVec3, point: DVec3) -> Result<f64, PoseError> {
    let direction = normalize_vector(gradient)?;
    Ok((point - start).cross(direction).length())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn assert_mat_eq(a: &DMat3, b: &DMat3, epsilon: f64) {
        for (x, y) in a.to_cols_array().iter().zip(b.to_cols_array()) {
            assert_relative_eq!(*x, y, epsilon = epsilon);
        }
    }

    #[test]
    fn test_degree_radian() {
        assert_relative_eq!(degrees_to_radians(180.0), std::f64::consts::PI);
        assert_relative_eq!(radians_to_degrees(std::f64::consts::FRAC_PI_2), 90.0);
    }

    #[test]
    fn test_axis_angle_roundtrip() {
        for rvec in [
            DVec3::new(0.1, -0.2, 0.3),
            DVec3::new(0.0, 0.0, 3.0),
            DVec3::new(1e-15, 0.0, 0.0),
            DVec3::new(-2.0, 1.0, 0.5),
        ] {
            let rotation = axis_angle_to_rotation_matrix(rvec);
            let back = rotation_matrix_to_axis_angle(&rotation);
            assert_mat_eq(&axis_angle_to_rotation_matrix(back), &rotation, 1e-10);
        }
        let rvec = DVec3::new(0.1, -0.2, 0.3);
        let back = rotation_matrix_to_axis_angle(&axis_angle_to_rotation_matrix(rvec));
        assert_relative_eq!(back.x, rvec.x, epsilon = 1e-12);
        assert_relative_eq!(back.y, rvec.y, epsilon = 1e-12);
        assert_relative_eq!(back.z, rvec.z, epsilon = 1e-12);
    }

    #[test]
    fn test_quaternion_roundtrip() -> Result<(), PoseError> {
        let quaternion = normalize_quaternion([1.0, 2.0, 3.0, 4.0])?;
        let rotation = quaternion_to_rotation_matrix(quaternion)?;
        let back = rotation_matrix_to_quaternion(&rotation);
        for (a, b) in quaternion.iter().zip(back) {
            assert_relative_eq!(*a, b, epsilon = 1e-8);
        }
        Ok(())
    }

    #[test]
    fn test_quaternion_all_branches() -> Result<(), PoseError> {
        // each input makes a different diagonal term dominate
        for quaternion in [
            [0.9, 0.1, 0.2, 0.3],
            [0.1, 0.9, 0.2, 0.3],
            [0.1, 0.2, 0.9, 0.3],
            [0.1, 0.2, 0.3, 0.9],
        ] {
            let quaternion = normalize_quaternion(quaternion)?;
            let rotation = quaternion_to_rotation_matrix(quaternion)?;
            let back = rotation_matrix_to_quaternion(&rotation);
            for (a, b) in quaternion.iter().zip(back) {
                assert_relative_eq!(*a, b, epsilon = 1e-8);
            }
        }
        Ok(())
    }

    #[test]
    fn test_zero_quaternion() {
        assert!(normalize_quaternion([0.0; 4]).is_err());
        assert!(quaternion_to_rotation_matrix([0.0; 4]).is_err());
    }

    #[test]
    fn test_euler_roundtrip() {
        let angles = [40.0, -20.0, 10.0];
        let rotation = euler_to_rotation_matrix(angles);
        let back = rotation_matrix_to_euler(&rotation);
        for (a, b) in angles.iter().zip(back) {
            assert_relative_eq!(*a, b, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_euler_gimbal_lock() {
        let rotation = euler_to_rotation_matrix([30.0, 90.0, 0.0]);
        let back = rotation_matrix_to_euler(&rotation);
        assert_relative_eq!(back[1], 90.0, epsilon = 1e-4);
        assert_eq!(back[2], 0.0);
        // the recovered angles still describe the same rotation
        assert_mat_eq(&euler_to_rotation_matrix(back), &rotation, 1e-6);
    }

    #[test]
    fn test_orientation_rotation() -> Result<(), PoseError> {
        let old = DVec3::new(0.0, 0.0, 1.0);
        let new = DVec3::new(1.0, 1.0, 0.0);
        let rotation = orientation_rotation(new, old)?;
        let rotated = rotation * old;
        let expected = new.normalize();
        assert_relative_eq!(rotated.x, expected.x, epsilon = 1e-12);
        assert_relative_eq!(rotated.y, expected.y, epsilon = 1e-12);
        assert_relative_eq!(rotated.z, expected.z, epsilon = 1e-12);

        assert_eq!(orientation_rotation(old, old)?, DMat3::IDENTITY);

        let flipped = orientation_rotation(-old, old)? * old;
        assert_relative_eq!(flipped.z, -1.0, epsilon = 1e-12);

        assert_eq!(
            orientation_rotation(DVec3::ZERO, old),
            Err(PoseError::ZeroLengthVector)
        );
        Ok(())
    }

    #[test]
    fn test_line_point_distance() -> Result<(), PoseError> {
        let distance = line_point_distance(
            DVec3::new(1.0, 0.0, 0.0),
            DVec3::new(0.0, 0.0, 5.0),
            DVec3::new(1.0, 3.0, 7.0),
        )?;
        assert_relative_eq!(distance, 3.0);
        assert!(line_point_distance(DVec3::ZERO, DVec3::ZERO, DVec3::ONE).is_err());
        Ok(())
    }

    #[test]
    fn test_rotate_point() {
        let rotation = euler_to_rotation_matrix([0.0, 0.0, 90.0]);
        let point = rotate_point(&rotation, DVec3::X);
        assert_relative_eq!(point.y, 1.0, epsilon = 1e-12);
    }
}
