use recon_image::{Image, ImageError};

/// Reflect an index into `[0, len)` mirroring around the border pixel (`gfedcb|abcdefgh|gfedcba`).
pub(crate) fn reflect_101(idx: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let len = len as isize;
    let period = 2 * (len - 1);
    let mut i = idx.rem_euclid(period);
    if i >= len {
        i = period - i;
    }
    i as usize
}

/// Compute the spatial image gradients with the 3x3 Scharr operator.
///
/// The responses are normalised by 1/32 so they are expressed in intensity units per pixel.
/// Borders are handled by reflection.
///
/// # Arguments
///
/// * `src` - The input grayscale image.
/// * `dx` - The output horizontal gradient.
/// * `dy` - The output vertical gradient.
pub fn scharr_gradients(
    src: &Image<f32, 1>,
    dx: &mut Image<f32, 1>,
    dy: &mut Image<f32, 1>,
) -> Result<(), ImageError> {
    for dst in [&*dx, &*dy] {
        if src.size() != dst.size() {
            return Err(ImageError::InvalidImageSize(
                src.cols(),
                src.rows(),
                dst.cols(),
                dst.rows(),
            ));
        }
    }

    let (cols, rows) = (src.cols(), src.rows());
    let data = src.as_slice();
    let at = |x: isize, y: isize| data[reflect_101(y, rows) * cols + reflect_101(x, cols)];

    const SCALE: f32 = 1.0 / 32.0;

    let dx_data = dx.as_slice_mut();
    for y in 0..rows as isize {
        for x in 0..cols as isize {
            let gx = 3.0 * (at(x + 1, y - 1) - at(x - 1, y - 1))
                + 10.0 * (at(x + 1, y) - at(x - 1, y))
                + 3.0 * (at(x + 1, y + 1) - at(x - 1, y + 1));
            dx_data[y as usize * cols + x as usize] = gx * SCALE;
        }
    }

    let dy_data = dy.as_slice_mut();
    for y in 0..rows as isize {
        for x in 0..cols as isize {
            let gy = 3.0 * (at(x - 1, y + 1) - at(x - 1, y - 1))
                + 10.0 * (at(x, y + 1) - at(x, y - 1))
                + 3.0 * (at(x + 1, y + 1) - at(x + 1, y - 1));
            dy_data[y as usize * cols + x as usize] = gy * SCALE;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use recon_image::ImageSize;

    #[test]
    fn reflect_indices() {
        assert_eq!(reflect_101(-1, 5), 1);
        assert_eq!(reflect_101(-2, 5), 2);
        assert_eq!(reflect_101(5, 5), 3);
        assert_eq!(reflect_101(2, 5), 2);
        assert_eq!(reflect_101(-3, 1), 0);
    }

    #[test]
    fn scharr_horizontal_ramp() -> Result<(), ImageError> {
        let size = ImageSize {
            width: 5,
            height: 4,
        };
        let data = (0..4)
            .flat_map(|_| (0..5).map(|x| 2.0 * x as f32))
            .collect();
        let src = Image::<f32, 1>::new(size, data)?;

        let mut dx = Image::<f32, 1>::from_size_val(size, 0.0)?;
        let mut dy = Image::<f32, 1>::from_size_val(size, 0.0)?;
        scharr_gradients(&src, &mut dx, &mut dy)?;

        // interior pixels see the true slope
        approx::assert_relative_eq!(dx.get_pixel(2, 1, 0)?, 2.0);
        approx::assert_relative_eq!(dy.get_pixel(2, 1, 0)?, 0.0);

        Ok(())
    }
}
