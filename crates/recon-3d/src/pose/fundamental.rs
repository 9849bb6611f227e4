use glam::{DMat3, DVec2, DVec3};
use nalgebra::{DMatrix, Matrix3, SymmetricEigen};
use rand::{rngs::StdRng, SeedableRng};

use crate::linalg::mat3_from_na;

/// Number of correspondences in a minimal sample of the 8-point solver.
pub const FUNDAMENTAL_SAMPLE_SIZE: usize = 8;

/// Fewest correspondences a fundamental matrix can be fitted to (the 7-point solver).
pub const FUNDAMENTAL_MIN_CORRESPONDENCES: usize = 7;

/// Error types for fundamental matrix estimation.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum FundamentalError {
    /// Not enough correspondences for the solver.
    #[error("Fundamental estimation requires at least {required} correspondences, got {actual}")]
    InsufficientCorrespondences {
        /// Minimum number of correspondences.
        required: usize,
        /// Number of correspondences provided.
        actual: usize,
    },

    /// The two point sets have different lengths.
    #[error("Mismatched correspondence lengths: {0} != {1}")]
    MismatchedLengths(usize, usize),

    /// The points do not constrain the model (e.g. all coincident).
    #[error("Degenerate point configuration")]
    DegenerateConfiguration,

    /// Singular value decomposition failed.
    #[error("SVD computation failed")]
    SvdFailed,
}

/// Parameters of the least-median-of-squares fundamental matrix fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LmedsParams {
    /// Minimum inlier distance in pixels to the epipolar line.
    pub threshold: f64,
    /// Desired probability that at least one sample is outlier-free.
    pub confidence: f64,
    /// Upper bound on the number of samples.
    pub max_iterations: usize,
    /// Optional fixed seed for reproducible sampling.
    pub random_seed: Option<u64>,
}

impl Default for LmedsParams {
    fn default() -> Self {
        Self {
            threshold: 1.0,
            confidence: 0.8,
            max_iterations: 2000,
            random_seed: Some(0),
        }
    }
}

/// Result of a robust fundamental matrix fit.
#[derive(Debug, Clone)]
pub struct FundamentalResult {
    /// Estimated fundamental matrix, `x2^T F x1 = 0`.
    pub model: DMat3,
    /// Per-correspondence inlier mask.
    pub inliers: Vec<bool>,
    /// Number of inliers in the mask.
    pub inlier_count: usize,
    /// Median of the residuals of the selected model.
    pub median_error: f64,
}

// Similarity transform moving the centroid to the origin with mean distance sqrt(2).
fn normalize_points_2d(points: &[DVec2]) -> Result<(Vec<DVec2>, Matrix3<f64>), FundamentalError> {
    let n = points.len() as f64;
    let mean = points.iter().fold(DVec2::ZERO, |acc, p| acc + *p) / n;
    let mean_dist = points.iter().map(|p| p.distance(mean)).sum::<f64>() / n;
    if mean_dist <= 1e-12 {
        return Err(FundamentalError::DegenerateConfiguration);
    }

    let scale = std::f64::consts::SQRT_2 / mean_dist;
    let normalized = points.iter().map(|p| (*p - mean) * scale).collect();

    #[rustfmt::skip]
    let t = Matrix3::new(
        scale, 0.0, -scale * mean.x,
        0.0, scale, -scale * mean.y,
        0.0, 0.0, 1.0,
    );

    Ok((normalized, t))
}

fn enforce_rank2(f: &Matrix3<f64>) -> Result<Matrix3<f64>, FundamentalError> {
    let svd = f.svd(true, true);
    let u = svd.u.ok_or(FundamentalError::SvdFailed)?;
    let v_t = svd.v_t.ok_or(FundamentalError::SvdFailed)?;
    let mut singular_values = svd.singular_values;
    let imin = singular_values.imin();
    singular_values[imin] = 0.0;
    Ok(u * Matrix3::from_diagonal(&singular_values) * v_t)
}

/// Estimate the fundamental matrix using the normalized 8-point algorithm.
///
/// - `x1`: points in image 1 (length >= 8)
/// - `x2`: corresponding points in image 2 (same length)
///
/// The solution satisfies `x2^T F x1 = 0`, has rank two and unit Frobenius norm.
pub fn fundamental_8point(x1: &[DVec2], x2: &[DVec2]) -> Result<DMat3, FundamentalError> {
    if x1.len() != x2.len() {
        return Err(FundamentalError::MismatchedLengths(x1.len(), x2.len()));
    }
    if x1.len() < FUNDAMENTAL_SAMPLE_SIZE {
        return Err(FundamentalError::InsufficientCorrespondences {
            required: FUNDAMENTAL_SAMPLE_SIZE,
            actual: x1.len(),
        });
    }

    let (x1n, t1) = normalize_points_2d(x1)?;
    let (x2n, t2) = normalize_points_2d(x2)?;

    // the null vector of A is the eigenvector of A^T A with the smallest eigenvalue
    let null_space = null_vectors(&x1n, &x2n, 1)?;

    // Denormalize: F = T2^T * F * T1
    denormalize(&enforce_rank2(&null_space[0])?, &t1, &t2)
}

// Design matrix A (N x 9) of x2' * F * x1 = 0, with F read row-major.
fn design_matrix(x1: &[DVec2], x2: &[DVec2]) -> DMatrix<f64> {
    let mut a = DMatrix::<f64>::zeros(x1.len(), 9);
    for (i, (p1, p2)) in x1.iter().zip(x2).enumerate() {
        let (x, y) = (p1.x, p1.y);
        let (xp, yp) = (p2.x, p2.y);
        let row = [xp * x, xp * y, xp, yp * x, yp * y, yp, x, y, 1.0];
        for (j, v) in row.into_iter().enumerate() {
            a[(i, j)] = v;
        }
    }
    a
}

// The `count` eigenvectors of A^T A with the smallest eigenvalues, as 3x3 matrices.
fn null_vectors(
    x1: &[DVec2],
    x2: &[DVec2],
    count: usize,
) -> Result<Vec<Matrix3<f64>>, FundamentalError> {
    let a = design_matrix(x1, x2);
    let eigen = SymmetricEigen::new(a.transpose() * &a);

    let mut order: Vec<usize> = (0..eigen.eigenvalues.len()).collect();
    order.sort_by(|&i, &j| eigen.eigenvalues[i].total_cmp(&eigen.eigenvalues[j]));

    order
        .into_iter()
        .take(count)
        .map(|i| {
            let fvec = eigen.eigenvectors.column(i);
            if fvec.iter().any(|v| !v.is_finite()) {
                return Err(FundamentalError::SvdFailed);
            }
            Ok(Matrix3::from_row_iterator(fvec.iter().copied()))
        })
        .collect()
}

fn denormalize(
    f: &Matrix3<f64>,
    t1: &Matrix3<f64>,
    t2: &Matrix3<f64>,
) -> Result<DMat3, FundamentalError> {
    let f = t2.transpose() * f * t1;
    let norm = f.norm();
    if norm <= f64::EPSILON {
        return Err(FundamentalError::DegenerateConfiguration);
    }
    Ok(mat3_from_na(&(f / norm)))
}

// Real roots of c[3] a^3 + c[2] a^2 + c[1] a + c[0].
fn solve_cubic_real(c: [f64; 4]) -> Vec<f64> {
    const EPS: f64 = 1e-12;
    let scale = c.iter().fold(0.0f64, |m, v| m.max(v.abs()));
    if scale <= f64::MIN_POSITIVE {
        return Vec::new();
    }
    let [c0, c1, c2, c3] = c.map(|v| v / scale);

    if c3.abs() < EPS {
        if c2.abs() < EPS {
            if c1.abs() < EPS {
                return Vec::new();
            }
            return vec![-c0 / c1];
        }
        let disc = c1 * c1 - 4.0 * c2 * c0;
        if disc < 0.0 {
            return Vec::new();
        }
        let sq = disc.sqrt();
        return vec![(-c1 + sq) / (2.0 * c2), (-c1 - sq) / (2.0 * c2)];
    }

    // depressed cubic t^3 + p t + q with a = t - b / 3
    let (b, c, d) = (c2 / c3, c1 / c3, c0 / c3);
    let p = c - b * b / 3.0;
    let q = 2.0 * b * b * b / 27.0 - b * c / 3.0 + d;
    let shift = b / 3.0;

    let disc = (q / 2.0).powi(2) + (p / 3.0).powi(3);
    if disc > 0.0 {
        let sq = disc.sqrt();
        let t = (-q / 2.0 + sq).cbrt() + (-q / 2.0 - sq).cbrt();
        return vec![t - shift];
    }
    if p.abs() < EPS {
        return vec![-shift];
    }

    let r = (-p / 3.0).sqrt();
    let phi = (-q / (2.0 * r * r * r)).clamp(-1.0, 1.0).acos();
    (0..3)
        .map(|k| {
            2.0 * r * ((phi - 2.0 * std::f64::consts::PI * k as f64) / 3.0).cos() - shift
        })
        .collect()
}

/// Estimate the fundamental matrices through exactly seven correspondences.
///
/// The two-dimensional null space `a F1 + (1 - a) F2` is constrained by `det(F) = 0`, a
/// cubic in `a`; every real root gives one rank-two solution, so up to three models are
/// returned, each with unit Frobenius norm.
///
/// - `x1`: 7 points in image 1
/// - `x2`: the corresponding 7 points in image 2
pub fn fundamental_7point(x1: &[DVec2], x2: &[DVec2]) -> Result<Vec<DMat3>, FundamentalError> {
    if x1.len() != x2.len() {
        return Err(FundamentalError::MismatchedLengths(x1.len(), x2.len()));
    }
    if x1.len() != FUNDAMENTAL_MIN_CORRESPONDENCES {
        return Err(FundamentalError::InsufficientCorrespondences {
            required: FUNDAMENTAL_MIN_CORRESPONDENCES,
            actual: x1.len(),
        });
    }

    let (x1n, t1) = normalize_points_2d(x1)?;
    let (x2n, t2) = normalize_points_2d(x2)?;

    let null_space = null_vectors(&x1n, &x2n, 2)?;
    let (f1, f2) = (null_space[0], null_space[1]);
    let diff = f1 - f2;

    // det(F2 + a (F1 - F2)) sampled at a = 0, 1, -1, 2 fixes the cubic coefficients
    let det_at = |a: f64| (f2 + diff * a).determinant();
    let (d0, d1, dm1, d2) = (det_at(0.0), det_at(1.0), det_at(-1.0), det_at(2.0));
    let c2 = (d1 + dm1) / 2.0 - d0;
    let odd = (d1 - dm1) / 2.0;
    let c3 = (d2 - d0 - 4.0 * c2 - 2.0 * odd) / 6.0;
    let c1 = odd - c3;
    let coeffs = [d0, c1, c2, c3];

    // every member of the pencil is singular: any of them is a solution
    let roots = if coeffs.iter().all(|c| c.abs() < 1e-12) {
        vec![0.0]
    } else {
        solve_cubic_real(coeffs)
    };

    let models: Vec<DMat3> = roots
        .into_iter()
        .filter(|a| a.is_finite())
        .filter_map(|a| denormalize(&(f2 + diff * a), &t1, &t2).ok())
        .collect();

    if models.is_empty() {
        return Err(FundamentalError::DegenerateConfiguration);
    }
    Ok(models)
}

/// Squared distance of the correspondence to its epipolar lines.
///
/// Returns the larger of the squared distance of `x2` to the line `F x1` and of `x1` to the
/// line `F^T x2`; infinite when a line is undefined.
pub fn epipolar_distance(f: &DMat3, x1: DVec2, x2: DVec2) -> f64 {
    let p1 = DVec3::new(x1.x, x1.y, 1.0);
    let p2 = DVec3::new(x2.x, x2.y, 1.0);

    let l2 = *f * p1;
    let l1 = f.transpose() * p2;
    let algebraic = p2.dot(l2);

    let n2 = l2.x * l2.x + l2.y * l2.y;
    let n1 = l1.x * l1.x + l1.y * l1.y;
    if n1 <= f64::EPSILON || n2 <= f64::EPSILON {
        return f64::INFINITY;
    }

    let d2 = algebraic * algebraic / n2;
    let d1 = algebraic * algebraic / n1;
    d1.max(d2)
}

// Number of samples needed to draw an outlier-free sample with the given confidence,
// assuming the default 45% outlier ratio of a least-median fit.
fn lmeds_iterations(confidence: f64, max_iterations: usize) -> usize {
    const OUTLIER_RATIO: f64 = 0.45;
    let inlier_prob = (1.0 - OUTLIER_RATIO).powi(FUNDAMENTAL_SAMPLE_SIZE as i32);
    let num = (1.0 - confidence.clamp(0.0, 1.0)).max(f64::MIN_POSITIVE).ln();
    let denom = (1.0 - inlier_prob).ln();
    if !(denom < 0.0) {
        return max_iterations;
    }
    ((num / denom).round() as usize).clamp(3, max_iterations.max(3))
}

fn median(values: &mut [f64]) -> f64 {
    let mid = values.len() / 2;
    let (_, m, _) = values.select_nth_unstable_by(mid, |a, b| a.total_cmp(b));
    *m
}

/// Robustly fit a fundamental matrix with least-median-of-squares over random 8-point samples.
///
/// The model with the smallest median residual wins. Its inliers are the correspondences whose
/// epipolar distance is within `max(threshold, 2.5 sigma)` where sigma is the robust standard
/// deviation derived from the median residual. Exactly seven correspondences are solved
/// with [`fundamental_7point`] and the best of its candidate models is kept.
///
/// # Errors
///
/// Returns an error for mismatched inputs, fewer than 7 correspondences, or when no sample
/// produced a model.
pub fn find_fundamental_lmeds(
    x1: &[DVec2],
    x2: &[DVec2],
    params: &LmedsParams,
) -> Result<FundamentalResult, FundamentalError> {
    if x1.len() != x2.len() {
        return Err(FundamentalError::MismatchedLengths(x1.len(), x2.len()));
    }
    let n = x1.len();
    if n < FUNDAMENTAL_MIN_CORRESPONDENCES {
        return Err(FundamentalError::InsufficientCorrespondences {
            required: FUNDAMENTAL_MIN_CORRESPONDENCES,
            actual: n,
        });
    }

    let mut best: Option<(DMat3, f64)> = None;
    let mut errors = vec![0.0; n];
    let mut consider = |model: DMat3| {
        for (err, (p1, p2)) in errors.iter_mut().zip(x1.iter().zip(x2)) {
            *err = epipolar_distance(&model, *p1, *p2);
        }
        let med = median(&mut errors);

        match best {
            Some((_, best_med)) if best_med <= med => {}
            _ => best = Some((model, med)),
        }
    };

    let iterations = if n == FUNDAMENTAL_MIN_CORRESPONDENCES {
        for model in fundamental_7point(x1, x2)? {
            consider(model);
        }
        1
    } else {
        let mut rng: StdRng = match params.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        // with exactly 8 points every sample is the full set
        let iterations = if n == FUNDAMENTAL_SAMPLE_SIZE {
            1
        } else {
            lmeds_iterations(params.confidence, params.max_iterations)
        };

        let mut s1 = [DVec2::ZERO; FUNDAMENTAL_SAMPLE_SIZE];
        let mut s2 = [DVec2::ZERO; FUNDAMENTAL_SAMPLE_SIZE];
        for _ in 0..iterations {
            let sample = rand::seq::index::sample(&mut rng, n, FUNDAMENTAL_SAMPLE_SIZE);
            for (k, idx) in sample.iter().enumerate() {
                s1[k] = x1[idx];
                s2[k] = x2[idx];
            }

            if let Ok(model) = fundamental_8point(&s1, &s2) {
                consider(model);
            }
        }
        iterations
    };

    let Some((model, median_error)) = best else {
        log::warn!("fundamental lmeds: no sample produced a model");
        return Err(FundamentalError::DegenerateConfiguration);
    };

    let dof = n.saturating_sub(FUNDAMENTAL_SAMPLE_SIZE).max(1) as f64;
    let sigma = 2.5 * 1.4826 * (1.0 + 5.0 / dof) * median_error.sqrt();
    let threshold = params.threshold.max(sigma);
    let threshold_sq = threshold * threshold;

    let inliers: Vec<bool> = x1
        .iter()
        .zip(x2)
        .map(|(p1, p2)| epipolar_distance(&model, *p1, *p2) <= threshold_sq)
        .collect();
    let inlier_count = inliers.iter().filter(|&&b| b).count();

    log::debug!(
        "fundamental lmeds: {inlier_count}/{n} inliers after {iterations} samples, median {median_error:.3e}"
    );

    Ok(FundamentalResult {
        model,
        inliers,
        inlier_count,
        median_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::PinholeCamera;
    use crate::pose::Pose;
    use rand::Rng;

    fn synthetic_views(n: usize, seed: u64) -> (Vec<DVec2>, Vec<DVec2>) {
        let camera = PinholeCamera::new(500.0, 500.0, 320.0, 240.0).unwrap();
        let pose = Pose::from_vectors(DVec3::new(0.02, -0.1, 0.01), DVec3::new(0.5, 0.05, 0.1));
        let mut rng = StdRng::seed_from_u64(seed);
        let mut x1 = Vec::with_capacity(n);
        let mut x2 = Vec::with_capacity(n);
        for _ in 0..n {
            let p = DVec3::new(
                rng.random_range(-2.0..2.0),
                rng.random_range(-1.5..1.5),
                rng.random_range(4.0..10.0),
            );
            x1.push(camera.project(p));
            x2.push(camera.project(pose.transform_point(p)));
        }
        (x1, x2)
    }

    #[test]
    fn test_fundamental_8point_epipolar_constraint() -> Result<(), FundamentalError> {
        let (x1, x2) = synthetic_views(20, 1);
        let f = fundamental_8point(&x1, &x2)?;
        for (p1, p2) in x1.iter().zip(&x2) {
            assert!(epipolar_distance(&f, *p1, *p2) < 1e-6);
        }
        assert!(f.determinant().abs() < 1e-10);
        Ok(())
    }

    #[test]
    fn test_fundamental_8point_minimal() -> Result<(), FundamentalError> {
        let (x1, x2) = synthetic_views(8, 2);
        let f = fundamental_8point(&x1, &x2)?;
        for (p1, p2) in x1.iter().zip(&x2) {
            assert!(epipolar_distance(&f, *p1, *p2) < 1e-4);
        }
        Ok(())
    }

    #[test]
    fn test_fundamental_invalid_input() {
        let (x1, x2) = synthetic_views(7, 3);
        assert_eq!(
            fundamental_8point(&x1, &x2),
            Err(FundamentalError::InsufficientCorrespondences {
                required: 8,
                actual: 7
            })
        );
        assert_eq!(
            fundamental_8point(&x1, &x2[..6]),
            Err(FundamentalError::MismatchedLengths(7, 6))
        );
        let same = vec![DVec2::new(3.0, 3.0); 8];
        assert_eq!(
            fundamental_8point(&same, &same),
            Err(FundamentalError::DegenerateConfiguration)
        );
    }

    #[test]
    fn test_fundamental_7point() -> Result<(), FundamentalError> {
        let (x1, x2) = synthetic_views(7, 3);
        let models = fundamental_7point(&x1, &x2)?;
        assert!(!models.is_empty() && models.len() <= 3);
        for f in &models {
            assert!(f.determinant().abs() < 1e-6);
            for (p1, p2) in x1.iter().zip(&x2) {
                assert!(epipolar_distance(f, *p1, *p2) < 1e-4);
            }
        }

        assert_eq!(
            fundamental_7point(&x1[..6], &x2[..6]),
            Err(FundamentalError::InsufficientCorrespondences {
                required: 7,
                actual: 6
            })
        );
        Ok(())
    }

    #[test]
    fn test_solve_cubic_real() {
        // (a - 1)(a - 2)(a + 3) = a^3 - 7a + 6
        let mut roots = solve_cubic_real([6.0, -7.0, 0.0, 1.0]);
        roots.sort_by(f64::total_cmp);
        assert_eq!(roots.len(), 3);
        for (r, e) in roots.iter().zip([-3.0, 1.0, 2.0]) {
            assert!((r - e).abs() < 1e-9);
        }

        // a^3 + a + 10 = (a + 2)(a^2 - 2a + 5)
        let roots = solve_cubic_real([10.0, 1.0, 0.0, 1.0]);
        assert_eq!(roots.len(), 1);
        assert!((roots[0] + 2.0).abs() < 1e-9);

        // degenerates to 2a - 4
        assert_eq!(solve_cubic_real([-4.0, 2.0, 0.0, 0.0]), vec![2.0]);
    }

    #[test]
    fn test_lmeds_seven_points() -> Result<(), FundamentalError> {
        let (x1, x2) = synthetic_views(7, 6);
        let result = find_fundamental_lmeds(&x1, &x2, &LmedsParams::default())?;
        assert_eq!(result.inlier_count, 7);
        assert!(result.inliers.iter().all(|&b| b));

        assert!(matches!(
            find_fundamental_lmeds(&x1[..6], &x2[..6], &LmedsParams::default()),
            Err(FundamentalError::InsufficientCorrespondences {
                required: 7,
                actual: 6
            })
        ));
        Ok(())
    }

    #[test]
    fn test_lmeds_rejects_outliers() -> Result<(), FundamentalError> {
        let (x1, mut x2) = synthetic_views(60, 4);
        // corrupt a few correspondences far off their epipolar lines
        let outliers = [3, 17, 31, 44, 58];
        for &i in &outliers {
            x2[i] += DVec2::new(35.0, -40.0);
        }

        let result = find_fundamental_lmeds(&x1, &x2, &LmedsParams::default())?;
        for (i, inlier) in result.inliers.iter().enumerate() {
            assert_eq!(*inlier, !outliers.contains(&i), "index {i}");
        }
        assert_eq!(result.inlier_count, 55);
        Ok(())
    }

    #[test]
    fn test_lmeds_deterministic_with_seed() -> Result<(), FundamentalError> {
        let (x1, x2) = synthetic_views(30, 5);
        let a = find_fundamental_lmeds(&x1, &x2, &LmedsParams::default())?;
        let b = find_fundamental_lmeds(&x1, &x2, &LmedsParams::default())?;
        assert_eq!(a.model, b.model);
        assert_eq!(a.inliers, b.inliers);
        Ok(())
    }

    #[test]
    fn test_lmeds_iterations() {
        assert_eq!(lmeds_iterations(0.8, 2000), 191);
        assert_eq!(lmeds_iterations(0.99999, 50), 50);
    }
}
