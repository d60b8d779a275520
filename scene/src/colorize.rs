use image::{GrayImage, Rgba, RgbaImage};
use rand::Rng;

/// Tints a silhouette with one random solid color.
///
/// Each channel factor is drawn uniformly from `[0, 1)`. Background pixels
/// become fully transparent.
pub fn colorize<R: Rng + ?Sized>(silhouette: &GrayImage, rng: &mut R) -> RgbaImage {
    let tint = [rng.random::<f32>(), rng.random::<f32>(), rng.random::<f32>()];
    tint_silhouette(silhouette, tint)
}

pub fn tint_silhouette(silhouette: &GrayImage, tint: [f32; 3]) -> RgbaImage {
    let (w, h) = silhouette.dimensions();
    RgbaImage::from_fn(w, h, |x, y| {
        let v = silhouette.get_pixel(x, y)[0];
        if v == 0 {
            return Rgba([0, 0, 0, 0]);
        }
        let v = v as f32;
        Rgba([
            (v * tint[0]) as u8,
            (v * tint[1]) as u8,
            (v * tint[2]) as u8,
            u8::MAX,
        ])
    })
}
