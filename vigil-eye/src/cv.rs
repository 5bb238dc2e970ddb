//! Conversions between `image` buffers and OpenCV matrices

use crate::error::VisionError;
use image::RgbImage;
use opencv::{
    core::{Mat, Scalar, CV_8UC3},
    imgproc,
    prelude::*,
};

/// RGB image to a BGR `Mat`
pub fn image_to_mat(image: &RgbImage) -> Result<Mat, VisionError> {
    let (width, height) = image.dimensions();
    let mut rgb = Mat::new_rows_cols_with_default(height as i32, width as i32, CV_8UC3, Scalar::all(0.0))?;
    rgb.data_bytes_mut()?.copy_from_slice(image.as_raw());

    let mut bgr = Mat::default();
    imgproc::cvt_color(&rgb, &mut bgr, imgproc::COLOR_RGB2BGR, 0)?;
    Ok(bgr)
}

/// BGR `Mat` from a camera to an RGB image
pub fn mat_to_image(mat: &Mat) -> Result<RgbImage, VisionError> {
    if mat.rows() <= 0 || mat.cols() <= 0 {
        return Err(VisionError::Camera("Empty frame".to_string()));
    }

    let mut rgb = Mat::default();
    imgproc::cvt_color(mat, &mut rgb, imgproc::COLOR_BGR2RGB, 0)?;
    let rgb = if rgb.is_continuous() { rgb } else { rgb.try_clone()? };

    let (width, height) = (rgb.cols() as u32, rgb.rows() as u32);
    RgbImage::from_raw(width, height, rgb.data_bytes()?.to_vec())
        .ok_or_else(|| VisionError::Processing("Frame buffer size mismatch".to_string()))
}

/// Grayscale copy of a BGR `Mat`
pub fn to_gray(bgr: &Mat) -> Result<Mat, VisionError> {
    let mut gray = Mat::default();
    imgproc::cvt_color(bgr, &mut gray, imgproc::COLOR_BGR2GRAY, 0)?;
    Ok(gray)
}
