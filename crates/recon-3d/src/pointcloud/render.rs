use glam::DVec2;
use recon_image::Image;

use super::{CloudError, ColorCloud};
use crate::camera::PinholeCamera;
use crate::pose::Pose;

/// A synthetic view of a [`ColorCloud`] with its z-buffer.
#[derive(Debug, Clone)]
pub struct RenderedView {
    /// The rendered RGB image; pixels that received no sample stay black.
    pub image: Image<u8, 3>,
    /// The depth of the sample drawn at each pixel, `0` where nothing was drawn.
    pub depth: Image<f64, 1>,
}

impl ColorCloud {
    /// Render the cloud from a new viewpoint with a depth test.
    ///
    /// Every non-empty slot is moved by `pose`, projected through `camera` and written to
    /// the pixel `round(u / step), round(v / step)` of an image with the cloud's own grid
    /// size. When two samples land on the same pixel the nearer one wins.
    ///
    /// # Arguments
    ///
    /// * `camera` - The intrinsics of the virtual camera.
    /// * `pose` - Transform from the cloud frame to the virtual camera frame.
    /// * `step` - Pixel scale between the camera image and the cloud grid.
    pub fn render_image(
        &self,
        camera: &PinholeCamera,
        pose: &Pose,
        step: usize,
    ) -> Result<RenderedView, CloudError> {
        if step == 0 {
            return Err(CloudError::ZeroStep);
        }

        let size = self.size();
        let mut image = Image::<u8, 3>::from_size_val(size, 0)?;
        let mut depth = Image::<f64, 1>::from_size_val(size, 0.0)?;

        let mut written = 0usize;
        for sample in self.vertices() {
            let point = pose.transform_point(sample.point);
            if point.z <= 0.0 {
                continue;
            }

            let uv = camera.project(point) / step as f64;
            let (u, v) = (uv.x.round(), uv.y.round());
            if u < 0.0 || v < 0.0 {
                continue;
            }
            let (u, v) = (u as usize, v as usize);

            let Some(current) = depth.get_mut([v, u, 0]) else {
                continue;
            };
            if *current > 0.0 && *current < point.z {
                continue;
            }
            *current = point.z;

            if let Some(pixel) = image.pixel_mut(u, v) {
                pixel.copy_from_slice(&sample.color);
                written += 1;
            }
        }

        log::trace!("rendered {written} samples into {size}");

        Ok(RenderedView { image, depth })
    }

    /// Project every slot through `camera` without moving it.
    ///
    /// Slots with `Z <= 0` map to the sentinel `(-1, -1)`.
    pub fn project_image_points(&self, camera: &PinholeCamera) -> Result<Image<f64, 2>, CloudError> {
        let mut points = Image::<f64, 2>::from_size_val(self.size(), -1.0)?;

        for (dst, slot) in points.pixels_mut().zip(self.as_image().pixels()) {
            let point = glam::DVec3::new(slot[0], slot[1], slot[2]);
            if point.z <= 0.0 {
                continue;
            }
            let uv: DVec2 = camera.project(point);
            dst[0] = uv.x;
            dst[1] = uv.y;
        }

        Ok(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pointcloud::ColorSample;
    use glam::DVec3;

    #[test]
    fn test_render_depth_test() -> Result<(), Box<dyn std::error::Error>> {
        let camera = PinholeCamera::new(10.0, 10.0, 2.0, 2.0)?;
        let mut cloud = ColorCloud::new([4, 4].into())?;

        // both samples project to pixel (2, 2); the far one is written first
        cloud.set_sample(
            0,
            0,
            &ColorSample {
                point: DVec3::new(0.0, 0.0, 8.0),
                color: [255, 0, 0],
            },
        )?;
        cloud.set_sample(
            3,
            3,
            &ColorSample {
                point: DVec3::new(0.0, 0.0, 3.0),
                color: [0, 255, 0],
            },
        )?;

        let view = cloud.render_image(&camera, &Pose::IDENTITY, 1)?;
        assert_eq!(view.image.pixel(2, 2), Some([0u8, 255, 0].as_slice()));
        assert_eq!(view.depth.get([2, 2, 0]), Some(&3.0));

        // untouched pixels keep the zero record
        assert_eq!(view.image.pixel(0, 0), Some([0u8, 0, 0].as_slice()));
        assert_eq!(view.depth.get([0, 0, 0]), Some(&0.0));
        Ok(())
    }

    #[test]
    fn test_render_near_first() -> Result<(), Box<dyn std::error::Error>> {
        let camera = PinholeCamera::new(10.0, 10.0, 2.0, 2.0)?;
        let mut cloud = ColorCloud::new([4, 4].into())?;
        cloud.set_sample(
            0,
            0,
            &ColorSample {
                point: DVec3::new(0.0, 0.0, 3.0),
                color: [0, 0, 255],
            },
        )?;
        cloud.set_sample(
            1,
            0,
            &ColorSample {
                point: DVec3::new(0.0, 0.0, 9.0),
                color: [255, 255, 255],
            },
        )?;

        let view = cloud.render_image(&camera, &Pose::IDENTITY, 1)?;
        assert_eq!(view.image.pixel(2, 2), Some([0u8, 0, 255].as_slice()));
        assert_eq!(view.depth.get([2, 2, 0]), Some(&3.0));
        Ok(())
    }

    #[test]
    fn test_render_with_pose_and_step() -> Result<(), Box<dyn std::error::Error>> {
        let camera = PinholeCamera::new(10.0, 10.0, 4.0, 4.0)?;
        let mut cloud = ColorCloud::new([4, 4].into())?;
        cloud.set_sample(
            0,
            0,
            &ColorSample {
                point: DVec3::new(0.0, 0.0, 2.0),
                color: [9, 9, 9],
            },
        )?;

        // shift right by 0.4 at depth 2 -> u = 10 * 0.2 + 4 = 6, then / 2 = 3
        let pose = Pose::from_vectors(DVec3::ZERO, DVec3::new(0.4, 0.0, 0.0));
        let view = cloud.render_image(&camera, &pose, 2)?;
        assert_eq!(view.image.pixel(3, 2), Some([9u8, 9, 9].as_slice()));

        // behind the camera
        let pose = Pose::from_vectors(DVec3::ZERO, DVec3::new(0.0, 0.0, -5.0));
        let view = cloud.render_image(&camera, &pose, 1)?;
        assert!(view.depth.as_slice().iter().all(|&z| z == 0.0));

        assert!(matches!(
            cloud.render_image(&camera, &pose, 0),
            Err(CloudError::ZeroStep)
        ));
        Ok(())
    }

    #[test]
    fn test_project_image_points() -> Result<(), Box<dyn std::error::Error>> {
        let camera = PinholeCamera::new(10.0, 10.0, 2.0, 2.0)?;
        let mut cloud = ColorCloud::new([2, 1].into())?;
        cloud.set_sample(
            1,
            0,
            &ColorSample {
                point: DVec3::new(1.0, -1.0, 5.0),
                color: [0, 0, 0],
            },
        )?;

        let points = cloud.project_image_points(&camera)?;
        assert_eq!(points.pixel(0, 0), Some([-1.0, -1.0].as_slice()));
        assert_eq!(points.pixel(1, 0), Some([4.0, 0.0].as_slice()));
        Ok(())
    }
}
