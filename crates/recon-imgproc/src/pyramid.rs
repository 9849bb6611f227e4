use crate::filter::reflect_101;
use recon_image::{Image, ImageError, ImageSize};

// The 2D kernel is the outer product of [1, 4, 6, 4, 1] / 16 with itself.
const PYRAMID_KERNEL: [f32; 5] = [1.0 / 16.0, 4.0 / 16.0, 6.0 / 16.0, 4.0 / 16.0, 1.0 / 16.0];

/// Size of the next (coarser) pyramid level: `((width + 1) / 2, (height + 1) / 2)`.
pub fn pyrdown_size(size: ImageSize) -> ImageSize {
    ImageSize {
        width: size.width.div_ceil(2),
        height: size.height.div_ceil(2),
    }
}

/// Blur an image with a 5x5 Gaussian kernel and then downsample it by two.
///
/// # Arguments
///
/// * `src` - The source image to be downsampled.
/// * `dst` - The destination image, sized with [`pyrdown_size`].
///
/// # Example
///
/// ```
/// use recon_image::{Image, ImageSize};
/// use recon_imgproc::pyramid::{pyrdown, pyrdown_size};
///
/// let image = Image::<f32, 1>::from_size_val(
///     ImageSize {
///         width: 5,
///         height: 4,
///     },
///     1.0,
/// ).unwrap();
///
/// let mut downsampled = Image::<f32, 1>::from_size_val(pyrdown_size(image.size()), 0.0).unwrap();
///
/// pyrdown(&image, &mut downsampled).unwrap();
/// assert_eq!(downsampled.width(), 3);
/// assert_eq!(downsampled.height(), 2);
/// ```
pub fn pyrdown<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<f32, C>,
) -> Result<(), ImageError> {
    let expected = pyrdown_size(src.size());

    if dst.size() != expected {
        return Err(ImageError::InvalidImageSize(
            expected.width,
            expected.height,
            dst.width(),
            dst.height(),
        ));
    }

    if src.is_empty() {
        return Ok(());
    }

    let (cols, rows) = (src.cols(), src.rows());
    let data = src.as_slice();

    // horizontal pass, keeping only the even columns
    let mut tmp = vec![0.0f32; rows * expected.width * C];
    for y in 0..rows {
        for dx in 0..expected.width {
            let x = (2 * dx) as isize;
            let dst_base = (y * expected.width + dx) * C;
            for (k, w) in PYRAMID_KERNEL.iter().enumerate() {
                let sx = reflect_101(x + k as isize - 2, cols);
                let src_base = (y * cols + sx) * C;
                for c in 0..C {
                    tmp[dst_base + c] += w * data[src_base + c];
                }
            }
        }
    }

    // vertical pass, keeping only the even rows
    let out = dst.as_slice_mut();
    out.iter_mut().for_each(|v| *v = 0.0);
    for dy in 0..expected.height {
        let y = (2 * dy) as isize;
        for (k, w) in PYRAMID_KERNEL.iter().enumerate() {
            let sy = reflect_101(y + k as isize - 2, rows);
            for dx in 0..expected.width {
                let src_base = (sy * expected.width + dx) * C;
                let dst_base = (dy * expected.width + dx) * C;
                for c in 0..C {
                    out[dst_base + c] += w * tmp[src_base + c];
                }
            }
        }
    }

    Ok(())
}

/// Build a Gaussian pyramid with `max_level + 1` levels, level 0 being the input.
///
/// Stops early once a level would collapse to a single row or column.
pub fn build_pyramid(
    src: &Image<f32, 1>,
    max_level: usize,
) -> Result<Vec<Image<f32, 1>>, ImageError> {
    let mut pyramid = vec![src.clone()];

    for _ in 0..max_level {
        let Some(prev) = pyramid.last() else {
            break;
        };
        let next_size = pyrdown_size(prev.size());
        if next_size.width < 2 || next_size.height < 2 {
            break;
        }
        let mut next = Image::from_size_val(next_size, 0.0)?;
        pyrdown(prev, &mut next)?;
        pyramid.push(next);
    }

    Ok(pyramid)
}
