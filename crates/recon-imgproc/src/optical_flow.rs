use crate::{filter::scharr_gradients, interpolation::bilinear_interpolation, pyramid};
use recon_image::{Image, ImageError};

/// Parameters of the pyramidal Lucas-Kanade tracker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpticalFlowParams {
    /// Side of the square integration window in pixels.
    pub window_size: usize,
    /// Index of the coarsest pyramid level; 0 tracks on the input only.
    pub max_level: usize,
    /// Maximum number of Gauss-Newton updates per level.
    pub max_iterations: usize,
    /// Stop when the squared update length falls below this value.
    pub epsilon: f32,
    /// Minimum eigenvalue of the normalized structure tensor for a trackable window.
    pub min_eigen_threshold: f32,
}

impl Default for OpticalFlowParams {
    fn default() -> Self {
        Self {
            window_size: 21,
            max_level: 3,
            max_iterations: 9000,
            epsilon: 1e-8,
            min_eigen_threshold: 1e-4,
        }
    }
}

/// Outcome of tracking one point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowResult {
    /// Estimated location in the second image.
    pub point: [f32; 2],
    /// Whether the flow was found.
    pub status: bool,
    /// Mean absolute intensity difference over the window at the final location.
    pub error: f32,
}

struct PyramidLevel {
    image: Image<f32, 1>,
    dx: Image<f32, 1>,
    dy: Image<f32, 1>,
}

fn to_float(src: &Image<u8, 1>) -> Image<f32, 1> {
    src.map(|&v| v as f32)
}

fn build_levels(src: &Image<u8, 1>, max_level: usize) -> Result<Vec<PyramidLevel>, ImageError> {
    pyramid::build_pyramid(&to_float(src), max_level)?
        .into_iter()
        .map(|image| {
            let mut dx = Image::from_size_val(image.size(), 0.0)?;
            let mut dy = Image::from_size_val(image.size(), 0.0)?;
            scharr_gradients(&image, &mut dx, &mut dy)?;
            Ok(PyramidLevel { image, dx, dy })
        })
        .collect()
}

fn sample(image: &Image<f32, 1>, x: f32, y: f32) -> f32 {
    bilinear_interpolation(image, x, y)[0]
}

fn outside(level: &Image<f32, 1>, p: [f32; 2], half: f32) -> bool {
    p[0] < -half
        || p[1] < -half
        || p[0] > level.cols() as f32 - 1.0 + half
        || p[1] > level.rows() as f32 - 1.0 + half
}

/// Track sparse points from `prev` into `next` with pyramidal Lucas-Kanade optical flow.
///
/// Tracking starts at the coarsest level using the input location as the initial guess and
/// refines the estimate level by level. A point fails when its window leaves the image or its
/// structure tensor is too weak to be inverted.
///
/// # Arguments
///
/// * `prev` - The first grayscale image.
/// * `next` - The second grayscale image, same size as `prev`.
/// * `points` - The pixel locations to track, as `[x, y]`.
/// * `params` - The tracker parameters.
///
/// # Returns
///
/// One [`FlowResult`] per input point, in input order.
pub fn calc_optical_flow_pyr_lk(
    prev: &Image<u8, 1>,
    next: &Image<u8, 1>,
    points: &[[f32; 2]],
    params: &OpticalFlowParams,
) -> Result<Vec<FlowResult>, ImageError> {
    if prev.size() != next.size() {
        return Err(ImageError::InvalidImageSize(
            prev.cols(),
            prev.rows(),
            next.cols(),
            next.rows(),
        ));
    }

    if points.is_empty() || prev.is_empty() {
        return Ok(points
            .iter()
            .map(|&point| FlowResult {
                point,
                status: false,
                error: 0.0,
            })
            .collect());
    }

    let prev_pyramid = build_levels(prev, params.max_level)?;
    let next_pyramid = pyramid::build_pyramid(&to_float(next), params.max_level)?;
    let num_levels = prev_pyramid.len().min(next_pyramid.len());

    let results = points
        .iter()
        .map(|&point| {
            track_point(
                &prev_pyramid[..num_levels],
                &next_pyramid[..num_levels],
                point,
                params,
            )
        })
        .collect::<Vec<_>>();

    log::debug!(
        "optical flow: {} of {} points tracked",
        results.iter().filter(|r| r.status).count(),
        points.len()
    );

    Ok(results)
}

fn track_point(
    prev_pyramid: &[PyramidLevel],
    next_pyramid: &[Image<f32, 1>],
    point: [f32; 2],
    params: &OpticalFlowParams,
) -> FlowResult {
    let win = params.window_size.max(3);
    let half = (win as f32 - 1.0) * 0.5;
    let win_area = (win * win) as f32;

    let top = prev_pyramid.len() - 1;
    let top_scale = 1.0 / (1u32 << top) as f32;
    let mut next_pt = [point[0] * top_scale, point[1] * top_scale];
    let mut status = true;
    let mut error = 0.0;

    let mut patch = vec![0.0f32; win * win];
    let mut grad_x = vec![0.0f32; win * win];
    let mut grad_y = vec![0.0f32; win * win];

    for level in (0..prev_pyramid.len()).rev() {
        let prev_level = &prev_pyramid[level];
        let next_level = &next_pyramid[level];
        let scale = 1.0 / (1u32 << level) as f32;
        let prev_pt = [point[0] * scale, point[1] * scale];

        if outside(&prev_level.image, prev_pt, half) {
            status = false;
            break;
        }

        // sample the template window and its gradients in the first image
        let (mut a11, mut a12, mut a22) = (0.0f32, 0.0f32, 0.0f32);
        for j in 0..win {
            for i in 0..win {
                let x = prev_pt[0] - half + i as f32;
                let y = prev_pt[1] - half + j as f32;
                let k = j * win + i;
                patch[k] = sample(&prev_level.image, x, y);
                grad_x[k] = sample(&prev_level.dx, x, y);
                grad_y[k] = sample(&prev_level.dy, x, y);
                a11 += grad_x[k] * grad_x[k];
                a12 += grad_x[k] * grad_y[k];
                a22 += grad_y[k] * grad_y[k];
            }
        }

        let det = a11 * a22 - a12 * a12;
        let min_eig = (a22 + a11 - ((a11 - a22) * (a11 - a22) + 4.0 * a12 * a12).sqrt())
            / (2.0 * win_area);

        if min_eig < params.min_eigen_threshold || det < f32::EPSILON {
            if level == 0 {
                status = false;
            }
            if level > 0 {
                next_pt = [next_pt[0] * 2.0, next_pt[1] * 2.0];
            }
            continue;
        }

        let inv_det = 1.0 / det;

        for _ in 0..params.max_iterations {
            if outside(next_level, next_pt, half) {
                status = false;
                break;
            }

            let (mut b1, mut b2) = (0.0f32, 0.0f32);
            for j in 0..win {
                for i in 0..win {
                    let k = j * win + i;
                    let x = next_pt[0] - half + i as f32;
                    let y = next_pt[1] - half + j as f32;
                    let diff = sample(next_level, x, y) - patch[k];
                    b1 += diff * grad_x[k];
                    b2 += diff * grad_y[k];
                }
            }

            let delta = [
                (a12 * b2 - a22 * b1) * inv_det,
                (a12 * b1 - a11 * b2) * inv_det,
            ];
            next_pt[0] += delta[0];
            next_pt[1] += delta[1];

            if delta[0] * delta[0] + delta[1] * delta[1] <= params.epsilon {
                break;
            }
        }

        if !status {
            break;
        }

        if level == 0 {
            let mut sum = 0.0f32;
            for j in 0..win {
                for i in 0..win {
                    let x = next_pt[0] - half + i as f32;
                    let y = next_pt[1] - half + j as f32;
                    sum += (sample(next_level, x, y) - patch[j * win + i]).abs();
                }
            }
            error = sum / win_area;
        } else {
            next_pt = [next_pt[0] * 2.0, next_pt[1] * 2.0];
        }
    }

    FlowResult {
        point: next_pt,
        status,
        error,
    }
}
