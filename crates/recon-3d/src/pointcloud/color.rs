use std::path::Path;

use glam::{DVec2, DVec3};
use recon_image::{Image, ImageSize};

use super::{CloudError, PointCloud};
use crate::camera::PinholeCamera;
use crate::pose::Pose;

/// One slot of a [`ColorCloud`]: a scene point and the color of its source pixel.
///
/// A slot with `point.z == 0` is empty.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ColorSample {
    /// Location of the sample in the cloud frame.
    pub point: DVec3,
    /// RGB color of the sample.
    pub color: [u8; 3],
}

impl ColorSample {
    /// Whether the slot holds the zero depth sentinel.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.point.z == 0.0
    }
}

/// A dense colored cloud with one `(X, Y, Z, R, G, B)` slot per source pixel.
///
/// The grid stays aligned with the images it was built from. Slots without depth are kept
/// as all-zero records rather than removed.
#[derive(Debug, Clone)]
pub struct ColorCloud(Image<f64, 6>);

impl ColorCloud {
    /// Create an empty cloud where every slot is the zero sentinel.
    pub fn new(size: ImageSize) -> Result<Self, CloudError> {
        Ok(Self(Image::from_size_val(size, 0.0)?))
    }

    /// Build a cloud by back-projecting every pixel with nonzero depth.
    ///
    /// # Arguments
    ///
    /// * `camera` - The intrinsics of the color/depth pair.
    /// * `color` - The RGB texture.
    /// * `depth` - The depth map, `0` meaning no data.
    ///
    /// # Errors
    ///
    /// [`CloudError::SizeMismatch`] when the two images differ in size.
    pub fn build<T>(
        camera: &PinholeCamera,
        color: &Image<u8, 3>,
        depth: &Image<T, 1>,
    ) -> Result<Self, CloudError>
    where
        T: Copy + Into<f64>,
    {
        if color.size() != depth.size() {
            return Err(CloudError::SizeMismatch(color.size(), depth.size()));
        }

        let mut cloud = Self::new(color.size())?;
        let width = color.width();

        for (i, ((slot, rgb), z)) in cloud
            .0
            .pixels_mut()
            .zip(color.pixels())
            .zip(depth.as_slice())
            .enumerate()
        {
            let z: f64 = (*z).into();
            if z == 0.0 {
                continue;
            }
            let pixel = DVec2::new((i % width) as f64, (i / width) as f64);
            let point = camera.unproject(pixel, z);
            write_slot(
                slot,
                &ColorSample {
                    point,
                    color: [rgb[0], rgb[1], rgb[2]],
                },
            );
        }

        log::debug!(
            "built color cloud {} with {} vertices",
            cloud.size(),
            cloud.vertex_count()
        );

        Ok(cloud)
    }

    /// The grid size of the cloud.
    pub fn size(&self) -> ImageSize {
        self.0.size()
    }

    /// The underlying six channel buffer.
    pub fn as_image(&self) -> &Image<f64, 6> {
        &self.0
    }

    /// The slot at column `x` and row `y`, or `None` when out of bounds.
    pub fn sample(&self, x: usize, y: usize) -> Option<ColorSample> {
        self.0.pixel(x, y).map(read_slot)
    }

    /// Overwrite the slot at column `x` and row `y`.
    pub fn set_sample(&mut self, x: usize, y: usize, sample: &ColorSample) -> Result<(), CloudError> {
        let size = self.size();
        let slot = self.0.pixel_mut(x, y).ok_or(
            recon_image::ImageError::PixelIndexOutOfBounds(x, y, size.width, size.height),
        )?;
        write_slot(slot, sample);
        Ok(())
    }

    /// Iterate the non-empty slots in row-major order.
    pub fn vertices(&self) -> impl Iterator<Item = ColorSample> + '_ {
        self.0
            .pixels()
            .map(read_slot)
            .filter(|sample| !sample.is_empty())
    }

    /// Number of non-empty slots.
    pub fn vertex_count(&self) -> usize {
        self.vertices().count()
    }

    /// Nearest-neighbor decimation on a regular stride.
    ///
    /// The output grid is `ceil(width / step) x ceil(height / step)`; slot `(x, y)` is a
    /// copy of source slot `(x * step, y * step)`.
    pub fn subsample(&self, step: usize) -> Result<Self, CloudError> {
        if step == 0 {
            return Err(CloudError::ZeroStep);
        }
        let size = self.size();
        let width = size.width.div_ceil(step);
        let mut result = Self::new(ImageSize {
            width,
            height: size.height.div_ceil(step),
        })?;

        for (i, dst) in result.0.pixels_mut().enumerate() {
            let (x, y) = (i % width, i / width);
            if let Some(src) = self.0.pixel(x * step, y * step) {
                dst.copy_from_slice(src);
            }
        }

        Ok(result)
    }

    /// Apply a rigid transform to every non-empty slot, carrying the color through.
    pub fn transform(&self, pose: &Pose) -> Self {
        let mut result = self.clone();
        for slot in result.0.pixels_mut() {
            let mut sample = read_slot(slot);
            if sample.is_empty() {
                continue;
            }
            sample.point = pose.transform_point(sample.point);
            write_slot(slot, &sample);
        }
        result
    }

    /// Collect the non-empty slots into a sparse [`PointCloud`].
    pub fn to_point_cloud(&self) -> PointCloud {
        let (points, colors) = self.vertices().map(|s| (s.point, s.color)).unzip();
        PointCloud::new(points, Some(colors))
    }

    /// Save the non-empty slots as an ASCII PLY file.
    ///
    /// See [`crate::io::ply::write_ply_ascii`] for the vertex line layout. The color columns
    /// are written blue, green, red under a `red green blue` header, so a cloud built from RGB
    /// images shows red and blue swapped in PLY viewers; build from BGR data to get true colors.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), CloudError> {
        crate::io::ply::write_ply_ascii(path, &self.to_point_cloud())?;
        Ok(())
    }
}

#[inline]
fn read_slot(slot: &[f64]) -> ColorSample {
    ColorSample {
        point: DVec3::new(slot[0], slot[1], slot[2]),
        color: [slot[3] as u8, slot[4] as u8, slot[5] as u8],
    }
}

#[inline]
fn write_slot(slot: &mut [f64], sample: &ColorSample) {
    slot[0] = sample.point.x;
    slot[1] = sample.point.y;
    slot[2] = sample.point.z;
    slot[3] = sample.color[0] as f64;
    slot[4] = sample.color[1] as f64;
    slot[5] = sample.color[2] as f64;
}
