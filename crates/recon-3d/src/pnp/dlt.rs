use glam::{DVec2, DVec3};
use nalgebra::{DMatrix, Matrix3, SymmetricEigen, Vector3};

use super::{ops, PnPError, PnPResult};
use crate::camera::PinholeCamera;
use crate::linalg::{mat3_from_na, vec3_from_na};
use crate::transforms::rotation_matrix_to_axis_angle;

/// Minimum number of correspondences of the DLT solver.
pub const DLT_MIN_CORRESPONDENCES: usize = 6;

/// Solve PnP with the Direct Linear Transform.
///
/// Estimates the 3x4 projection matrix in normalized camera coordinates from at least six
/// correspondences, then projects its left 3x3 block onto the closest rotation.
///
/// # Arguments
///
/// * `world` - 3D points in the world frame.
/// * `image` - Corresponding pixel coordinates.
/// * `camera` - The camera intrinsics.
pub fn solve_pnp_dlt(
    world: &[DVec3],
    image: &[DVec2],
    camera: &PinholeCamera,
) -> Result<PnPResult, PnPError> {
    ops::check_correspondences(world, image, DLT_MIN_CORRESPONDENCES)?;
    let n = world.len();

    // condition the world points: zero centroid, mean distance sqrt(3)
    let centroid = world.iter().fold(DVec3::ZERO, |acc, p| acc + *p) / n as f64;
    let mean_dist = world.iter().map(|p| p.distance(centroid)).sum::<f64>() / n as f64;
    if mean_dist <= 1e-12 {
        return Err(PnPError::DegenerateConfiguration(
            "world points are coincident".to_string(),
        ));
    }
    let scale = 3f64.sqrt() / mean_dist;

    let mut a = DMatrix::<f64>::zeros(2 * n, 12);
    for (i, (pw, pix)) in world.iter().zip(image).enumerate() {
        let xn = (pix.x - camera.cx()) / camera.fx();
        let yn = (pix.y - camera.cy()) / camera.fy();
        let pw = (*pw - centroid) * scale;
        let (xw, yw, zw) = (pw.x, pw.y, pw.z);

        let r0 = 2 * i;
        let r1 = r0 + 1;

        a[(r0, 0)] = xw;
        a[(r0, 1)] = yw;
        a[(r0, 2)] = zw;
        a[(r0, 3)] = 1.0;
        a[(r0, 8)] = -xn * xw;
        a[(r0, 9)] = -xn * yw;
        a[(r0, 10)] = -xn * zw;
        a[(r0, 11)] = -xn;

        a[(r1, 4)] = xw;
        a[(r1, 5)] = yw;
        a[(r1, 6)] = zw;
        a[(r1, 7)] = 1.0;
        a[(r1, 8)] = -yn * xw;
        a[(r1, 9)] = -yn * yw;
        a[(r1, 10)] = -yn * zw;
        a[(r1, 11)] = -yn;
    }

    // null vector of A from the smallest eigenvalue of A^T A
    let eigen = SymmetricEigen::new(a.transpose() * &a);
    let p = eigen.eigenvectors.column(eigen.eigenvalues.imin());

    #[rustfmt::skip]
    let m_cond = Matrix3::new(
        p[0], p[1], p[2],
        p[4], p[5], p[6],
        p[8], p[9], p[10],
    );
    let t_cond = Vector3::new(p[3], p[7], p[11]);

    // undo the conditioning: P [X; 1] = s M' X + (t' - s M' c)
    let c = Vector3::new(centroid.x, centroid.y, centroid.z);
    let mut m = m_cond * scale;
    let mut t = t_cond - m * c;

    // points must end up in front of the camera
    if m.determinant() < 0.0 {
        m = -m;
        t = -t;
    }

    let svd_m = m.svd(true, true);
    let u = svd_m
        .u
        .ok_or_else(|| PnPError::SvdFailed("U missing in solve_pnp_dlt".to_string()))?;
    let v_t = svd_m
        .v_t
        .ok_or_else(|| PnPError::SvdFailed("V^T missing in solve_pnp_dlt".to_string()))?;

    let r = u * v_t;
    let s = svd_m.singular_values.sum() / 3.0;
    if s.abs() < 1e-12 || !s.is_finite() {
        return Err(PnPError::DegenerateConfiguration(
            "projection matrix has zero scale".to_string(),
        ));
    }
    let t = t / s;

    let rotation = mat3_from_na(&r);
    let translation = vec3_from_na(&t);
    let rmse = ops::reprojection_rmse(camera, &rotation, translation, world, image, 0..n);

    Ok(PnPResult {
        rotation,
        translation,
        rvec: rotation_matrix_to_axis_angle(&rotation),
        reproj_rmse: Some(rmse),
        num_iterations: None,
        converged: None,
    })
}
