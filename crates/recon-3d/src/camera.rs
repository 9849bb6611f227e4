use glam::{DMat3, DMat4, DVec2, DVec3};
use recon_image::{Image, ImageSize};

use crate::pose::Pose;

/// Error types for the camera model.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CameraError {
    /// The focal lengths must be strictly positive.
    #[error("Invalid focal length ({0}, {1}), both must be positive")]
    InvalidFocalLength(f64, f64),

    /// The matrix is not a pinhole intrinsic matrix.
    #[error("Invalid camera matrix: {0}")]
    InvalidMatrix(String),
}

/// Intrinsic parameters of a pinhole camera.
///
/// Maps a camera frame point `(X, Y, Z)` to the pixel `(fx X / Z + cx, fy Y / Z + cy)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinholeCamera {
    fx: f64,
    fy: f64,
    cx: f64,
    cy: f64,
}

impl PinholeCamera {
    /// Creates a new camera, checking that both focal lengths are positive.
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64) -> Result<Self, CameraError> {
        if !(fx > 0.0 && fy > 0.0) {
            return Err(CameraError::InvalidFocalLength(fx, fy));
        }
        Ok(Self { fx, fy, cx, cy })
    }

    /// Creates a camera from a 3x3 intrinsic matrix `[[fx, 0, cx], [0, fy, cy], [0, 0, 1]]`.
    ///
    /// Skew is not supported and the last row must be `[0, 0, 1]`.
    pub fn from_matrix(k: &DMat3) -> Result<Self, CameraError> {
        // glam is column-major: k.z_axis holds (cx, cy, 1)
        if k.y_axis.x != 0.0 {
            return Err(CameraError::InvalidMatrix(format!(
                "non-zero skew {}",
                k.y_axis.x
            )));
        }
        if k.x_axis.z != 0.0 || k.y_axis.z != 0.0 || k.z_axis.z != 1.0 {
            return Err(CameraError::InvalidMatrix(format!(
                "last row must be [0, 0, 1], got [{}, {}, {}]",
                k.x_axis.z, k.y_axis.z, k.z_axis.z
            )));
        }
        Self::new(k.x_axis.x, k.y_axis.y, k.z_axis.x, k.z_axis.y)
    }

    /// Returns the 3x3 intrinsic matrix.
    pub fn matrix(&self) -> DMat3 {
        DMat3::from_cols(
            DVec3::new(self.fx, 0.0, 0.0),
            DVec3::new(0.0, self.fy, 0.0),
            DVec3::new(self.cx, self.cy, 1.0),
        )
    }

    /// Focal length along x in pixels.
    pub fn fx(&self) -> f64 {
        self.fx
    }

    /// Focal length along y in pixels.
    pub fn fy(&self) -> f64 {
        self.fy
    }

    /// Principal point x coordinate in pixels.
    pub fn cx(&self) -> f64 {
        self.cx
    }

    /// Principal point y coordinate in pixels.
    pub fn cy(&self) -> f64 {
        self.cy
    }

    /// Project a camera frame point to pixel coordinates.
    ///
    /// The result is not finite when `point.z == 0`; callers guard against it.
    ///
    /// ```
    /// use glam::DVec3;
    /// use recon_3d::camera::PinholeCamera;
    ///
    /// let camera = PinholeCamera::new(500.0, 500.0, 320.0, 240.0).unwrap();
    /// let uv = camera.project(DVec3::new(0.0, 0.0, 2.0));
    /// assert_eq!((uv.x, uv.y), (320.0, 240.0));
    /// ```
    pub fn project(&self, point: DVec3) -> DVec2 {
        DVec2::new(
            self.fx * point.x / point.z + self.cx,
            self.fy * point.y / point.z + self.cy,
        )
    }

    /// Back-project a pixel to the camera frame point at depth `z`.
    pub fn unproject(&self, pixel: DVec2, z: f64) -> DVec3 {
        DVec3::new(
            (pixel.x - self.cx) * z / self.fx,
            (pixel.y - self.cy) * z / self.fy,
            z,
        )
    }
}

/// Build a camera with `fx = fy = f` and the principal point at the image centre.
pub fn build_k_matrix(f: f64, image_size: ImageSize) -> Result<PinholeCamera, CameraError> {
    PinholeCamera::new(
        f,
        f,
        image_size.width as f64 / 2.0,
        image_size.height as f64 / 2.0,
    )
}

/// Extract the intrinsics from a 4x4 stereo reprojection matrix `Q`.
///
/// `cx = -Q[0][3]`, `cy = -Q[1][3]` and `fx = fy = Q[2][3]`.
pub fn extract_k_from_q(q: &DMat4) -> Result<PinholeCamera, CameraError> {
    let f = q.w_axis.z;
    PinholeCamera::new(f, f, -q.w_axis.x, -q.w_axis.y)
}

#[inline]
fn nearest_pixel(point: DVec2, size: ImageSize) -> Option<(usize, usize)> {
    let (x, y) = (point.x.round(), point.y.round());
    if !(x >= 0.0 && y >= 0.0 && x < size.width as f64 && y < size.height as f64) {
        return None;
    }
    Some((x as usize, y as usize))
}

/// Depth at the nearest pixel to `point`, or `0.0` when it falls outside the map.
///
/// ```
/// use glam::DVec2;
/// use recon_image::Image;
/// use recon_3d::camera::extract_depth;
///
/// let depth = Image::<u16, 1>::new([2, 1].into(), vec![7, 9]).unwrap();
/// assert_eq!(extract_depth(&depth, DVec2::new(0.6, 0.2)), 9.0);
/// assert_eq!(extract_depth(&depth, DVec2::new(2.0, 0.0)), 0.0);
/// ```
pub fn extract_depth<T>(depth: &Image<T, 1>, point: DVec2) -> f64
where
    T: Copy + Into<f64>,
{
    nearest_pixel(point, depth.size())
        .and_then(|(x, y)| depth.get([y, x, 0]))
        .map_or(0.0, |&d| d.into())
}

/// Color at the nearest pixel to `point`, or `None` when it falls outside the image.
pub fn extract_color(color: &Image<u8, 3>, point: DVec2) -> Option<[u8; 3]> {
    let (x, y) = nearest_pixel(point, color.size())?;
    let pixel = color.pixel(x, y)?;
    Some([pixel[0], pixel[1], pixel[2]])
}

/// The 8 corners of the viewing frustum between `zmin` and `zmax`.
///
/// The first 4 corners lie on the near plane, the last 4 on the far plane, each in the
/// order top-left, top-right, bottom-right, bottom-left.
pub fn view_limits(
    camera: &PinholeCamera,
    image_size: ImageSize,
    zmin: f64,
    zmax: f64,
) -> [DVec3; 8] {
    let (w, h) = (image_size.width as f64, image_size.height as f64);
    let corners = [
        DVec2::new(0.0, 0.0),
        DVec2::new(w, 0.0),
        DVec2::new(w, h),
        DVec2::new(0.0, h),
    ];
    let mut limits = [DVec3::ZERO; 8];
    for (i, corner) in corners.iter().enumerate() {
        limits[i] = camera.unproject(*corner, zmin);
        limits[i + 4] = camera.unproject(*corner, zmax);
    }
    limits
}

/// Apply the pose to every point.
pub fn transform_points(pose: &Pose, points: &[DVec3]) -> Vec<DVec3> {
    crate::linalg::transform_points(points, &pose.rotation(), pose.translation())
}
