use recon_image::{Image, ImageError};

/// Define the RGB weights for the grayscale conversion.
const RW: f64 = 0.299;
const GW: f64 = 0.587;
const BW: f64 = 0.114;

/// Convert an RGB image to grayscale using the formula:
///
/// Y = 0.299 * R + 0.587 * G + 0.114 * B
///
/// # Arguments
///
/// * `src` - The input RGB image.
/// * `dst` - The output grayscale image.
///
/// Precondition: the input and output images must have the same size.
///
/// # Example
///
/// ```
/// use recon_image::{Image, ImageSize};
/// use recon_imgproc::color::gray_from_rgb;
///
/// let image = Image::<f32, 3>::new(
///     ImageSize {
///         width: 4,
///         height: 5,
///     },
///     vec![0f32; 4 * 5 * 3],
/// )
/// .unwrap();
///
/// let mut gray = Image::<f32, 1>::from_size_val(image.size(), 0.0).unwrap();
///
/// gray_from_rgb(&image, &mut gray).unwrap();
/// assert_eq!(gray.size().width, 4);
/// assert_eq!(gray.size().height, 5);
/// ```
pub fn gray_from_rgb<T>(src: &Image<T, 3>, dst: &mut Image<T, 1>) -> Result<(), ImageError>
where
    T: num_traits::Float,
{
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.cols(),
            src.rows(),
            dst.cols(),
            dst.rows(),
        ));
    }

    let rw = T::from(RW).ok_or(ImageError::CastError)?;
    let gw = T::from(GW).ok_or(ImageError::CastError)?;
    let bw = T::from(BW).ok_or(ImageError::CastError)?;

    src.pixels()
        .zip(dst.pixels_mut())
        .for_each(|(src_pixel, dst_pixel)| {
            dst_pixel[0] = rw * src_pixel[0] + gw * src_pixel[1] + bw * src_pixel[2];
        });

    Ok(())
}

/// Convert an RGB8 image to grayscale using the fixed-point formula:
///
/// Y = (77 * R + 150 * G + 29 * B) >> 8
///
/// # Arguments
///
/// * `src` - The input RGB8 image.
/// * `dst` - The output grayscale image.
///
/// Precondition: the input and output images must have the same size.
pub fn gray_from_rgb_u8(src: &Image<u8, 3>, dst: &mut Image<u8, 1>) -> Result<(), ImageError> {
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.cols(),
            src.rows(),
            dst.cols(),
            dst.rows(),
        ));
    }

    src.pixels()
        .zip(dst.pixels_mut())
        .for_each(|(src_pixel, dst_pixel)| {
            let r = src_pixel[0] as u16;
            let g = src_pixel[1] as u16;
            let b = src_pixel[2] as u16;
            dst_pixel[0] = ((r * 77 + g * 150 + b * 29) >> 8) as u8;
        });

    Ok(())
}

#[cfg(test)]
mod tests {
    use recon_image::{Image, ImageSize};

    #[test]
    fn gray_from_rgb() -> Result<(), Box<dyn std::error::Error>> {
        let image = Image::<f32, 3>::new(
            ImageSize {
                width: 2,
                height: 1,
            },
            vec![1.0, 0.0, 0.0, 0.0, 0.0, 1.0],
        )?;

        let mut gray = Image::<f32, 1>::from_size_val(image.size(), 0.0)?;
        super::gray_from_rgb(&image, &mut gray)?;

        approx::assert_relative_eq!(gray.as_slice()[0], 0.299, epsilon = 1e-6);
        approx::assert_relative_eq!(gray.as_slice()[1], 0.114, epsilon = 1e-6);

        Ok(())
    }

    #[test]
    fn gray_from_rgb_u8() -> Result<(), Box<dyn std::error::Error>> {
        let image = Image::<u8, 3>::new(
            ImageSize {
                width: 1,
                height: 2,
            },
            vec![255, 255, 255, 0, 0, 0],
        )?;

        let mut gray = Image::<u8, 1>::from_size_val(image.size(), 0)?;
        super::gray_from_rgb_u8(&image, &mut gray)?;

        assert_eq!(gray.as_slice(), &[255, 0]);

        Ok(())
    }

    #[test]
    fn gray_size_mismatch() -> Result<(), Box<dyn std::error::Error>> {
        let image = Image::<u8, 3>::from_size_val([2, 2].into(), 0)?;
        let mut gray = Image::<u8, 1>::from_size_val([3, 2].into(), 0)?;
        assert!(super::gray_from_rgb_u8(&image, &mut gray).is_err());
        Ok(())
    }
}
