use image::{DynamicImage, GrayImage, RgbImage, RgbaImage, imageops::overlay};
use rand::Rng;

use crate::{
    composer::{OPAQUE_BLACK, prepare_glyph},
    config::GenerationConfig,
    error::{SceneError, Stage},
    retry::retry,
};

/// Isolated view of the target, centered on a black target-sized canvas.
///
/// Rotation and shear follow the configured bounds; scale is not augmented.
/// Glyphs larger than the canvas are clipped symmetrically.
pub fn target_crop<R: Rng + ?Sized>(
    target: &GrayImage,
    config: &GenerationConfig,
    rng: &mut R,
) -> Result<RgbImage, SceneError> {
    let (tw, th) = config.target_size();
    let bounds = config.augment_bounds().without_scale();
    let glyph = retry(Stage::TargetCrop, config.params().max_retries, || {
        prepare_glyph(target, bounds, rng)
    })?;

    let (left, upper) = centered_offset((tw, th), glyph.dimensions());
    let mut canvas = RgbaImage::from_pixel(tw, th, OPAQUE_BLACK);
    overlay(&mut canvas, &glyph.colored, left, upper);
    Ok(DynamicImage::ImageRgba8(canvas).into_rgb8())
}

/// Floor-divided offset placing `glyph` in the middle of `canvas`; negative
/// when the glyph overhangs.
pub fn centered_offset(canvas: (u32, u32), glyph: (u32, u32)) -> (i64, i64) {
    (
        (canvas.0 as i64 - glyph.0 as i64).div_euclid(2),
        (canvas.1 as i64 - glyph.1 as i64).div_euclid(2),
    )
}
