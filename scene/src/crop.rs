use image::{GrayImage, imageops};

use crate::error::AugmentError;

/// Tight `(x, y, width, height)` box around all non-zero pixels.
pub fn content_bounds(img: &GrayImage) -> Option<(u32, u32, u32, u32)> {
    let (w, h) = img.dimensions();
    let row_used = |y: u32| (0..w).any(|x| img.get_pixel(x, y)[0] != 0);
    let col_used = |x: u32| (0..h).any(|y| img.get_pixel(x, y)[0] != 0);

    let top = (0..h).find(|&y| row_used(y))?;
    let bottom = (0..h).rev().find(|&y| row_used(y))?;
    let left = (0..w).find(|&x| col_used(x))?;
    let right = (0..w).rev().find(|&x| col_used(x))?;

    Some((left, top, right - left + 1, bottom - top + 1))
}

/// Trims zero-valued rows and columns from every edge.
pub fn crop_to_content(img: &GrayImage) -> Result<GrayImage, AugmentError> {
    let (x, y, w, h) = content_bounds(img).ok_or(AugmentError::NoContent)?;
    Ok(imageops::crop_imm(img, x, y, w, h).to_image())
}
