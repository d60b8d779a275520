//! Randomized affine augmentation of a single character raster.

use image::{
    GrayImage, Luma,
    imageops::{self, FilterType},
};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use rand::Rng;

use crate::{config::AugmentBounds, error::AugmentError};

/// Resize ratio applied after warping; maps a 105 px source frame onto 32 px.
pub const NORMALIZED_SCALE: f32 = 32.0 / 105.0;

/// One sampled rotation + shear + anisotropic scale.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AffineParams {
    /// Radians.
    pub rotation: f32,
    /// Radians.
    pub shear: f32,
    pub scale_x: f32,
    pub scale_y: f32,
}

/// Axis-aligned box enclosing the transformed source frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Extent {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Extent {
    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }
}

impl AffineParams {
    pub fn identity() -> Self {
        Self {
            rotation: 0.0,
            shear: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
        }
    }

    /// Rotation and shear uniform in `[-bound, bound]` degrees, each scale
    /// factor `scale^u` with `u` uniform in `[-1, 1]`.
    pub fn sample<R: Rng + ?Sized>(bounds: AugmentBounds, rng: &mut R) -> Self {
        let rotation = rng.random_range(-bounds.rotation..=bounds.rotation);
        let shear = rng.random_range(-bounds.shear..=bounds.shear);
        let scale_x = bounds.scale.powf(rng.random_range(-1.0..=1.0));
        let scale_y = bounds.scale.powf(rng.random_range(-1.0..=1.0));
        Self {
            rotation: rotation.to_radians(),
            shear: shear.to_radians(),
            scale_x,
            scale_y,
        }
    }

    /// Row-major 2x2 linear part `[m00, m01, m10, m11]`.
    pub fn linear(&self) -> [f32; 4] {
        let sum = self.rotation + self.shear;
        let diff = self.rotation - self.shear;
        [
            self.scale_x * sum.cos(),
            self.scale_y * diff.sin(),
            -self.scale_x * sum.sin(),
            self.scale_y * diff.cos(),
        ]
    }

    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        let [m00, m01, m10, m11] = self.linear();
        (m00 * x + m01 * y, m10 * x + m11 * y)
    }

    /// Bounding box of the four transformed corners of a `width x height` frame.
    pub fn extent(&self, width: u32, height: u32) -> Extent {
        let (w, h) = (width as f32, height as f32);
        let corners = [
            self.apply(0.0, 0.0),
            self.apply(0.0, h),
            self.apply(w, 0.0),
            self.apply(w, h),
        ];
        corners.iter().fold(
            Extent {
                min_x: f32::INFINITY,
                min_y: f32::INFINITY,
                max_x: f32::NEG_INFINITY,
                max_y: f32::NEG_INFINITY,
            },
            |e, &(x, y)| Extent {
                min_x: e.min_x.min(x),
                min_y: e.min_y.min(y),
                max_x: e.max_x.max(x),
                max_y: e.max_y.max(y),
            },
        )
    }
}

fn positive_size(width: f32, height: f32) -> Result<(u32, u32), AugmentError> {
    // truncation toward zero, NaN maps to 0
    let (w, h) = (width as i64, height as i64);
    if w <= 0 || h <= 0 || w > u32::MAX as i64 || h > u32::MAX as i64 {
        return Err(AugmentError::Degenerate {
            width: w,
            height: h,
        });
    }
    Ok((w as u32, h as u32))
}

/// Resamples `img` into the tight canvas enclosing its transformed frame.
pub fn warp_affine(img: &GrayImage, params: &AffineParams) -> Result<GrayImage, AugmentError> {
    let (width, height) = img.dimensions();
    let extent = params.extent(width, height);
    let (out_w, out_h) = positive_size(extent.width(), extent.height())?;

    let [m00, m01, m10, m11] = params.linear();
    let forward = [
        m00,
        m01,
        -extent.min_x,
        m10,
        m11,
        -extent.min_y,
        0.0,
        0.0,
        1.0,
    ];
    // Projection keeps the inverse for sampling output -> source.
    let projection = Projection::from_matrix(forward).ok_or(AugmentError::Singular)?;

    let mut out = GrayImage::new(out_w, out_h);
    warp_into(img, &projection, Interpolation::Nearest, Luma([0]), &mut out);
    Ok(out)
}

/// Brings a warped raster to the normalized character scale.
///
/// The target size comes from the unrounded `extent`, so a frame of 98.9 px
/// maps to 30 px rather than the 29 px its truncated raster would give.
pub fn normalize(img: &GrayImage, extent: &Extent) -> Result<GrayImage, AugmentError> {
    let (nw, nh) = positive_size(
        NORMALIZED_SCALE * extent.width(),
        NORMALIZED_SCALE * extent.height(),
    )?;
    Ok(imageops::resize(img, nw, nh, FilterType::Triangle))
}

/// Applies `params` and normalizes the result.
pub fn transform(img: &GrayImage, params: &AffineParams) -> Result<GrayImage, AugmentError> {
    let (width, height) = img.dimensions();
    let warped = warp_affine(img, params)?;
    normalize(&warped, &params.extent(width, height))
}

/// Samples a transform within `bounds` and applies it.
pub fn augment<R: Rng + ?Sized>(
    img: &GrayImage,
    bounds: AugmentBounds,
    rng: &mut R,
) -> Result<GrayImage, AugmentError> {
    let params = AffineParams::sample(bounds, rng);
    transform(img, &params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::SmallRng};

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    fn block(width: u32, height: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| {
            if x > width / 4 && x < 3 * width / 4 && y > height / 4 && y < 3 * height / 4 {
                Luma([255])
            } else {
                Luma([0])
            }
        })
    }

    #[test]
    fn identity_extent_matches_frame() {
        let e = AffineParams::identity().extent(105, 60);
        assert!(close(e.min_x, 0.0) && close(e.min_y, 0.0));
        assert!(close(e.width(), 105.0) && close(e.height(), 60.0));
    }

    #[test]
    fn quarter_turn_swaps_extent() {
        let params = AffineParams {
            rotation: std::f32::consts::FRAC_PI_2,
            ..AffineParams::identity()
        };
        let e = params.extent(40, 10);
        assert!(close(e.width(), 10.0));
        assert!(close(e.height(), 40.0));
    }

    #[test]
    fn anisotropic_scale_stretches_axes() {
        let params = AffineParams {
            scale_x: 2.0,
            scale_y: 0.5,
            ..AffineParams::identity()
        };
        let e = params.extent(10, 10);
        assert!(close(e.width(), 20.0));
        assert!(close(e.height(), 5.0));
    }

    #[test]
    fn identity_normalizes_to_fixed_scale() {
        let img = block(105, 105);
        let out = transform(&img, &AffineParams::identity()).unwrap();
        assert_eq!(out.dimensions(), (32, 32));
        assert!(out.pixels().any(|p| p[0] > 0));
    }

    #[test]
    fn normalized_size_uses_unrounded_extent() {
        let warped = block(98, 60);
        let extent = Extent {
            min_x: 0.0,
            min_y: 0.0,
            max_x: 98.9,
            max_y: 60.0,
        };
        let out = normalize(&warped, &extent).unwrap();
        assert_eq!(out.dimensions(), (30, 18));
    }

    #[test]
    fn tiny_images_are_degenerate() {
        let img = block(3, 3);
        assert!(matches!(
            transform(&img, &AffineParams::identity()),
            Err(AugmentError::Degenerate { .. })
        ));
    }

    #[test]
    fn collapsed_scale_is_rejected() {
        let params = AffineParams {
            scale_x: 0.0,
            ..AffineParams::identity()
        };
        assert!(warp_affine(&block(20, 20), &params).is_err());
    }

    #[test]
    fn sampled_params_stay_in_bounds() {
        let mut rng = SmallRng::seed_from_u64(3);
        let bounds = AugmentBounds {
            rotation: 20.0,
            shear: 10.0,
            scale: 2.0,
        };
        for _ in 0..200 {
            let p = AffineParams::sample(bounds, &mut rng);
            assert!(p.rotation.abs() <= 20f32.to_radians() + 1e-6);
            assert!(p.shear.abs() <= 10f32.to_radians() + 1e-6);
            assert!((0.5..=2.0).contains(&p.scale_x));
            assert!((0.5..=2.0).contains(&p.scale_y));
        }
    }

    #[test]
    fn augment_leaves_foreground() {
        let mut rng = SmallRng::seed_from_u64(11);
        let img = block(105, 105);
        let bounds = AugmentBounds {
            rotation: 20.0,
            shear: 10.0,
            scale: 2.0,
        };
        for _ in 0..20 {
            let out = augment(&img, bounds, &mut rng).unwrap();
            assert!(out.pixels().any(|p| p[0] > 0));
        }
        assert_eq!(img, block(105, 105));
    }
}
