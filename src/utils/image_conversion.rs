//! Image conversion utilities between OpenCV Mats and model input tensors.

use crate::utils::safe_cast::{i32_to_usize, usize_to_i32};
use crate::{Error, Result};
use ndarray::Array4;
use opencv::core::{Mat, Size, Vec3f, CV_32F};
use opencv::imgproc::{self, InterpolationFlags};
use opencv::prelude::*;

/// Resize a BGR image to `size`×`size` and convert it to an NHWC RGB tensor
/// with values in `[0, 1]`
///
/// # Errors
/// * Returns error if the image is empty
/// * Returns error if any OpenCV conversion fails
pub fn bgr_to_nhwc_tensor(image: &Mat, size: usize) -> Result<Array4<f32>> {
    if image.empty() {
        return Err(Error::InvalidInput("Cannot convert an empty image".to_string()));
    }
    let side = usize_to_i32(size)?;

    let mut resized = Mat::default();
    imgproc::resize(
        image,
        &mut resized,
        Size::new(side, side),
        0.0,
        0.0,
        InterpolationFlags::INTER_LINEAR as i32,
    )?;

    let mut rgb_image = Mat::default();
    imgproc::cvt_color(&resized, &mut rgb_image, imgproc::COLOR_BGR2RGB, 0)?;

    let mut float_image = Mat::default();
    rgb_image.convert_to(&mut float_image, CV_32F, 1.0 / 255.0, 0.0)?;

    let channels = 3;
    let mut data = vec![0.0f32; size * size * channels];
    for row in 0..side {
        for col in 0..side {
            let pixel = float_image.at_2d::<Vec3f>(row, col)?;
            let base = (i32_to_usize(row)? * size + i32_to_usize(col)?) * channels;
            data[base..base + channels].copy_from_slice(&pixel.0);
        }
    }

    Array4::from_shape_vec((1, size, size, channels), data)
        .map_err(|e| Error::InvalidInput(format!("Failed to create input tensor: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::{Scalar, CV_8UC3};

    #[test]
    fn test_tensor_shape_and_channel_order() {
        // Pure blue in BGR
        let image = Mat::new_rows_cols_with_default(48, 64, CV_8UC3, Scalar::new(255.0, 0.0, 0.0, 0.0)).unwrap();
        let tensor = bgr_to_nhwc_tensor(&image, 32).unwrap();

        assert_eq!(tensor.shape(), &[1, 32, 32, 3]);
        // RGB order after conversion: blue lands in the last channel
        assert!(tensor[[0, 10, 10, 0]].abs() < 1e-6);
        assert!((tensor[[0, 10, 10, 2]] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_empty_image_rejected() {
        assert!(bgr_to_nhwc_tensor(&Mat::default(), 32).is_err());
    }
}
