use std::ops::Range;

use image::{GrayImage, Luma};
use imageproc::drawing::draw_filled_circle_mut;
use rand::{Rng, SeedableRng, rngs::SmallRng};

use crate::error::ConfigError;

/// Side of the frames drawn by [`CharacterCorpus::procedural`].
pub const PROCEDURAL_SIZE: u32 = 105;
const STROKE_RADIUS: i32 = 2;

/// Character instances grouped by class, then by drawer.
///
/// Rasters are single channel with a zero background.
#[derive(Clone, Debug)]
pub struct CharacterCorpus {
    classes: Vec<Vec<GrayImage>>,
}

impl CharacterCorpus {
    pub fn new(classes: Vec<Vec<GrayImage>>) -> Result<Self, ConfigError> {
        if classes.is_empty() {
            return Err(ConfigError::EmptyCorpus);
        }
        Ok(Self { classes })
    }

    /// Stroke characters drawn from a per-class template with per-drawer jitter.
    pub fn procedural(num_classes: usize, instances: usize, seed: u64) -> Self {
        let mut rng = SmallRng::seed_from_u64(seed);
        let classes = (0..num_classes)
            .map(|_| {
                let template = stroke_template(&mut rng);
                (0..instances)
                    .map(|_| draw_instance(&template, &mut rng))
                    .collect()
            })
            .collect();
        Self { classes }
    }

    pub fn num_classes(&self) -> usize {
        self.classes.len()
    }

    /// Instance count of the smallest class.
    pub fn min_instances(&self) -> usize {
        self.classes.iter().map(Vec::len).min().unwrap_or(0)
    }

    pub fn instance(&self, class: usize, drawer: usize) -> Option<&GrayImage> {
        self.classes.get(class)?.get(drawer)
    }

    /// Fails when some class cannot serve every drawer in `instances`.
    pub fn check_instances(&self, instances: &Range<usize>) -> Result<(), ConfigError> {
        match self
            .classes
            .iter()
            .enumerate()
            .find(|(_, class)| class.len() < instances.end)
        {
            Some((class, instances_of)) => Err(ConfigError::NotEnoughInstances {
                class,
                available: instances_of.len(),
                required: instances.end,
            }),
            None => Ok(()),
        }
    }

    /// Uniform class, then uniform drawer in `instances`. Callers must have
    /// passed `instances` through [`Self::check_instances`].
    pub fn draw<R: Rng + ?Sized>(
        &self,
        instances: Range<usize>,
        rng: &mut R,
    ) -> (usize, &GrayImage) {
        let class = rng.random_range(0..self.classes.len());
        let drawer = rng.random_range(instances);
        (class, &self.classes[class][drawer])
    }
}

type Stroke = [(f32, f32); 2];

fn stroke_template(rng: &mut SmallRng) -> Vec<Stroke> {
    let n = rng.random_range(2..=4);
    let lo = 20.0;
    let hi = PROCEDURAL_SIZE as f32 - 20.0;
    (0..n)
        .map(|_| {
            [
                (rng.random_range(lo..hi), rng.random_range(lo..hi)),
                (rng.random_range(lo..hi), rng.random_range(lo..hi)),
            ]
        })
        .collect()
}

fn draw_instance(template: &[Stroke], rng: &mut SmallRng) -> GrayImage {
    let mut canvas = GrayImage::new(PROCEDURAL_SIZE, PROCEDURAL_SIZE);
    for &stroke in template {
        let [a, b] = stroke.map(|(x, y)| {
            (
                x + rng.random_range(-4.0..=4.0),
                y + rng.random_range(-4.0..=4.0),
            )
        });
        let steps = ((b.0 - a.0).hypot(b.1 - a.1).ceil() as usize).max(1);
        for i in 0..=steps {
            let t = i as f32 / steps as f32;
            let center = (
                (a.0 + t * (b.0 - a.0)).round() as i32,
                (a.1 + t * (b.1 - a.1)).round() as i32,
            );
            draw_filled_circle_mut(&mut canvas, center, STROKE_RADIUS, Luma([255]));
        }
    }
    canvas
}
