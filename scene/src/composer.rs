use image::{DynamicImage, GrayImage, Luma, RgbImage, Rgba, RgbaImage, imageops::overlay};
use rand::Rng;

use crate::{
    augment::augment,
    colorize::colorize,
    config::{AugmentBounds, GenerationConfig},
    corpus::CharacterCorpus,
    crop::crop_to_content,
    error::{AugmentError, ConfigError, SceneError, Stage},
    geom::BoundingBox,
    retry::retry,
};

pub(crate) const OPAQUE_BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// An augmented, cropped character in both its binary and tinted form.
#[derive(Clone, Debug)]
pub struct Glyph {
    pub silhouette: GrayImage,
    pub colored: RgbaImage,
}

impl Glyph {
    pub fn dimensions(&self) -> (u32, u32) {
        self.silhouette.dimensions()
    }
}

/// Augment, crop and colorize one source raster.
pub fn prepare_glyph<R: Rng + ?Sized>(
    source: &GrayImage,
    bounds: AugmentBounds,
    rng: &mut R,
) -> Result<Glyph, AugmentError> {
    let silhouette = crop_to_content(&augment(source, bounds, rng)?)?;
    let colored = colorize(&silhouette, rng);
    Ok(Glyph {
        silhouette,
        colored,
    })
}

/// Scene with a target segmentation mask. Mask values are 0 or 1.
#[derive(Clone, Debug)]
pub struct SegmentationScene {
    pub image: RgbImage,
    pub mask: GrayImage,
    /// The target was swapped for a random character and left out of the mask.
    pub empty: bool,
    pub distractors: usize,
}

/// Scene where every placed character is annotated.
#[derive(Clone, Debug)]
pub struct AnnotatedScene {
    pub image: RgbImage,
    pub boxes: Vec<BoundingBox>,
}

/// Composites augmented characters from a corpus into fixed-size scenes.
pub struct SceneComposer<'a> {
    corpus: &'a CharacterCorpus,
    config: &'a GenerationConfig,
}

impl<'a> SceneComposer<'a> {
    pub fn new(
        corpus: &'a CharacterCorpus,
        config: &'a GenerationConfig,
    ) -> Result<Self, ConfigError> {
        corpus.check_instances(&config.instances())?;
        Ok(Self { corpus, config })
    }

    pub fn corpus(&self) -> &'a CharacterCorpus {
        self.corpus
    }

    pub fn config(&self) -> &'a GenerationConfig {
        self.config
    }

    /// Fixed distractor count, or uniform in `[min_distractors, distractors]`.
    pub fn distractor_count<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        let params = self.config.params();
        match params.min_distractors {
            Some(min) => rng.random_range(min..=params.distractors),
            None => params.distractors,
        }
    }

    /// Draws a random target character from the configured drawer split.
    pub fn draw_character<R: Rng + ?Sized>(&self, rng: &mut R) -> (usize, &'a GrayImage) {
        self.corpus.draw(self.config.instances(), rng)
    }

    fn place<R: Rng + ?Sized>(&self, glyph: &Glyph, rng: &mut R) -> Result<(u32, u32), AugmentError> {
        let (cw, ch) = self.config.scene_size();
        let (gw, gh) = glyph.dimensions();
        if gw > cw || gh > ch {
            return Err(AugmentError::DoesNotFit {
                glyph_width: gw,
                glyph_height: gh,
                canvas_width: cw,
                canvas_height: ch,
            });
        }
        Ok((rng.random_range(0..=cw - gw), rng.random_range(0..=ch - gh)))
    }

    fn placed_glyph<R: Rng + ?Sized>(
        &self,
        source: &GrayImage,
        rng: &mut R,
    ) -> Result<(Glyph, (u32, u32)), AugmentError> {
        let glyph = prepare_glyph(source, self.config.augment_bounds(), rng)?;
        let at = self.place(&glyph, rng)?;
        Ok((glyph, at))
    }

    /// A freshly drawn random character, placed. Retried as a whole.
    fn random_object<R: Rng + ?Sized>(
        &self,
        stage: Stage,
        rng: &mut R,
    ) -> Result<(usize, Glyph, (u32, u32)), SceneError> {
        retry(stage, self.config.params().max_retries, || {
            let (class, source) = self.draw_character(rng);
            let (glyph, at) = self.placed_glyph(source, rng)?;
            Ok((class, glyph, at))
        })
    }

    fn scatter<R: Rng + ?Sized>(
        &self,
        canvas: &mut RgbaImage,
        count: usize,
        stage: Stage,
        rng: &mut R,
    ) -> Result<(), SceneError> {
        for _ in 0..count {
            let (_, glyph, (x, y)) = self.random_object(stage, rng)?;
            overlay(canvas, &glyph.colored, x as i64, y as i64);
        }
        Ok(())
    }

    fn blank_canvas(&self) -> RgbaImage {
        let (w, h) = self.config.scene_size();
        RgbaImage::from_pixel(w, h, OPAQUE_BLACK)
    }

    /// Distractors, then the target (or a stand-in for empty scenes), then
    /// occluders on top.
    pub fn segmentation_scene<R: Rng + ?Sized>(
        &self,
        target: &GrayImage,
        n_distractors: usize,
        rng: &mut R,
    ) -> Result<SegmentationScene, SceneError> {
        let params = self.config.params();
        let mut canvas = self.blank_canvas();
        let mut mask = GrayImage::new(params.image_width, params.image_height);

        self.scatter(&mut canvas, n_distractors, Stage::Distractor, rng)?;

        let empty = rng.random::<f64>() < params.empty;
        let target = if empty {
            self.draw_character(rng).1
        } else {
            target
        };

        let (glyph, (x, y)) = retry(Stage::Target, params.max_retries, || {
            self.placed_glyph(target, rng)
        })?;
        overlay(&mut canvas, &glyph.colored, x as i64, y as i64);
        if !empty {
            for (gx, gy, p) in glyph.silhouette.enumerate_pixels() {
                if p[0] != 0 {
                    mask.put_pixel(x + gx, y + gy, Luma([1]));
                }
            }
        }

        self.scatter(&mut canvas, params.occluders, Stage::Occluder, rng)?;

        Ok(SegmentationScene {
            image: DynamicImage::ImageRgba8(canvas).into_rgb8(),
            mask,
            empty,
            distractors: n_distractors,
        })
    }

    /// `n_objects` random characters, each annotated with its box and class.
    pub fn annotated_scene<R: Rng + ?Sized>(
        &self,
        n_objects: usize,
        rng: &mut R,
    ) -> Result<AnnotatedScene, SceneError> {
        let mut canvas = self.blank_canvas();
        let mut boxes = Vec::with_capacity(n_objects);
        for _ in 0..n_objects {
            let (class, glyph, (x, y)) = self.random_object(Stage::Object, rng)?;
            overlay(&mut canvas, &glyph.colored, x as i64, y as i64);
            let (w, h) = glyph.dimensions();
            boxes.push(BoundingBox::at(x, y, w, h, class as u32));
        }
        Ok(AnnotatedScene {
            image: DynamicImage::ImageRgba8(canvas).into_rgb8(),
            boxes,
        })
    }
}
