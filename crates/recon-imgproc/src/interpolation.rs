use recon_image::Image;

/// Kernel for bilinear interpolation
///
/// Coordinates outside the image are clamped to the border, so sampling never fails.
///
/// # Arguments
///
/// * `image` - The input image container.
/// * `u` - The x coordinate of the pixel to interpolate.
/// * `v` - The y coordinate of the pixel to interpolate.
///
/// # Returns
///
/// The interpolated pixel values, or zeros for an empty image.
///
/// # Example
///
/// ```
/// use recon_image::{Image, ImageSize};
/// use recon_imgproc::interpolation::bilinear_interpolation;
///
/// let image = Image::<f32, 1>::new(
///     ImageSize { width: 2, height: 1 },
///     vec![0.0, 10.0],
/// ).unwrap();
///
/// assert_eq!(bilinear_interpolation(&image, 0.5, 0.0), [5.0]);
/// ```
pub fn bilinear_interpolation<const C: usize>(image: &Image<f32, C>, u: f32, v: f32) -> [f32; C] {
    let (rows, cols) = (image.rows(), image.cols());
    let mut pixel = [0.0; C];

    if rows == 0 || cols == 0 {
        return pixel;
    }

    let u = u.clamp(0.0, (cols - 1) as f32);
    let v = v.clamp(0.0, (rows - 1) as f32);

    let iu0 = u.trunc() as usize;
    let iv0 = v.trunc() as usize;

    let frac_u = u - iu0 as f32;
    let frac_v = v - iv0 as f32;

    let frac_uu = 1.0 - frac_u;
    let frac_vv = 1.0 - frac_v;

    let w00 = frac_uu * frac_vv;
    let w01 = frac_u * frac_vv;
    let w10 = frac_uu * frac_v;
    let w11 = frac_u * frac_v;

    let iu1 = if iu0 + 1 < cols { iu0 + 1 } else { iu0 };
    let iv1 = if iv0 + 1 < rows { iv0 + 1 } else { iv0 };

    let data = image.as_slice();
    let at = |x: usize, y: usize| {
        let base = (y * cols + x) * C;
        &data[base..base + C]
    };

    let p00 = at(iu0, iv0);
    let p01 = at(iu1, iv0);
    let p10 = at(iu0, iv1);
    let p11 = at(iu1, iv1);

    for k in 0..C {
        pixel[k] = p00[k] * w00 + p01[k] * w01 + p10[k] * w10 + p11[k] * w11;
    }

    pixel
}

#[cfg(test)]
mod tests {
    use super::bilinear_interpolation;
    use recon_image::{Image, ImageError, ImageSize};

    #[test]
    fn bilinear_center() -> Result<(), ImageError> {
        let image = Image::<f32, 1>::new(
            ImageSize {
                width: 2,
                height: 2,
            },
            vec![0.0, 1.0, 2.0, 3.0],
        )?;
        approx::assert_relative_eq!(bilinear_interpolation(&image, 0.5, 0.5)[0], 1.5);
        Ok(())
    }

    #[test]
    fn bilinear_clamps_outside() -> Result<(), ImageError> {
        let image = Image::<f32, 2>::new(
            ImageSize {
                width: 2,
                height: 1,
            },
            vec![1.0, 2.0, 3.0, 4.0],
        )?;
        assert_eq!(bilinear_interpolation(&image, -4.0, 0.0), [1.0, 2.0]);
        assert_eq!(bilinear_interpolation(&image, 9.0, 3.0), [3.0, 4.0]);
        Ok(())
    }
}
