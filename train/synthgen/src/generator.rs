use anyhow::{Context, Result};
use image::{GrayImage, RgbImage};
use log::debug;
use ndarray::{Array3, Array4, ArrayView1, ArrayView3, ArrayViewMut3, s};
use rand::{SeedableRng, rngs::SmallRng};
use scene::{CharacterCorpus, ConfigError, GenerationConfig, SceneComposer, target_crop};

/// One job's worth of segmentation samples.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentationShard {
    /// (L, H, W, 3)
    pub images: Array4<u8>,
    /// (L, H, W, 1), values 0 or 1
    pub segmentation: Array4<u8>,
    /// (L, h, w, 3)
    pub targets: Array4<u8>,
}

/// One job's worth of bounding-box samples.
#[derive(Debug, Clone, PartialEq)]
pub struct BboxShard {
    /// (L, H, W, 3)
    pub images: Array4<u8>,
    /// (L, distractors, 5); unused rows stay zero
    pub boxes: Array3<u32>,
}

/// Fills contiguous blocks of dataset rows from a private RNG stream.
pub struct BatchWorker<'a> {
    composer: SceneComposer<'a>,
}

impl<'a> BatchWorker<'a> {
    pub fn new(corpus: &'a CharacterCorpus, config: &'a GenerationConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            composer: SceneComposer::new(corpus, config)?,
        })
    }

    fn rng(seed: Option<u64>) -> SmallRng {
        match seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        }
    }

    pub fn segmentation_shard(&self, job: usize, seed: Option<u64>) -> Result<SegmentationShard> {
        let config = self.composer.config();
        let params = config.params();
        let (w, h) = (params.image_width as usize, params.image_height as usize);
        let (tw, th) = (params.target_width as usize, params.target_height as usize);
        let len = params.job_length;
        debug!("job {job}: {len} segmentation scenes, seed {seed:?}");

        let mut rng = Self::rng(seed);
        let mut shard = SegmentationShard {
            images: Array4::zeros((len, h, w, 3)),
            segmentation: Array4::zeros((len, h, w, 1)),
            targets: Array4::zeros((len, th, tw, 3)),
        };

        for i in 0..len {
            let (_, target) = self.composer.draw_character(&mut rng);
            let n_distractors = self.composer.distractor_count(&mut rng);
            let scene = self
                .composer
                .segmentation_scene(target, n_distractors, &mut rng)
                .with_context(|| format!("job {job}, scene {i}"))?;
            let crop = target_crop(target, config, &mut rng)
                .with_context(|| format!("job {job}, target {i}"))?;

            copy_rgb(shard.images.slice_mut(s![i, .., .., ..]), &scene.image)?;
            copy_luma(shard.segmentation.slice_mut(s![i, .., .., ..]), &scene.mask)?;
            copy_rgb(shard.targets.slice_mut(s![i, .., .., ..]), &crop)?;
        }

        Ok(shard)
    }

    pub fn bbox_shard(&self, job: usize, seed: Option<u64>) -> Result<BboxShard> {
        let config = self.composer.config();
        let params = config.params();
        let (w, h) = (params.image_width as usize, params.image_height as usize);
        let len = params.job_length;
        debug!("job {job}: {len} annotated scenes, seed {seed:?}");

        let mut rng = Self::rng(seed);
        let mut shard = BboxShard {
            images: Array4::zeros((len, h, w, 3)),
            boxes: Array3::zeros((len, params.distractors, config.bbox_fields())),
        };

        for i in 0..len {
            let n_objects = self.composer.distractor_count(&mut rng);
            let scene = self
                .composer
                .annotated_scene(n_objects, &mut rng)
                .with_context(|| format!("job {job}, scene {i}"))?;

            copy_rgb(shard.images.slice_mut(s![i, .., .., ..]), &scene.image)?;
            for (j, bbox) in scene.boxes.iter().enumerate() {
                let row = bbox.to_row();
                shard
                    .boxes
                    .slice_mut(s![i, j, ..])
                    .assign(&ArrayView1::from(&row[..]));
            }
        }

        Ok(shard)
    }
}

fn copy_rgb(mut dst: ArrayViewMut3<u8>, img: &RgbImage) -> Result<()> {
    let (w, h) = img.dimensions();
    let src = ArrayView3::from_shape((h as usize, w as usize, 3), &img.as_raw()[..])?;
    dst.assign(&src);
    Ok(())
}

fn copy_luma(mut dst: ArrayViewMut3<u8>, img: &GrayImage) -> Result<()> {
    let (w, h) = img.dimensions();
    let src = ArrayView3::from_shape((h as usize, w as usize, 1), &img.as_raw()[..])?;
    dst.assign(&src);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scene::GenerationParams;

    fn small_config(job_length: usize) -> GenerationConfig {
        GenerationConfig::new(GenerationParams {
            image_width: 64,
            image_height: 48,
            target_width: 24,
            target_height: 20,
            distractors: 4,
            max_scale: 1.5,
            job_length,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn segmentation_shard_fills_every_row() {
        let corpus = CharacterCorpus::procedural(5, 20, 0);
        let config = small_config(3);
        let worker = BatchWorker::new(&corpus, &config).unwrap();

        let shard = worker.segmentation_shard(0, Some(17)).unwrap();
        assert_eq!(shard.images.shape(), &[3, 48, 64, 3]);
        assert_eq!(shard.segmentation.shape(), &[3, 48, 64, 1]);
        assert_eq!(shard.targets.shape(), &[3, 20, 24, 3]);
        assert!(shard.segmentation.iter().all(|&v| v <= 1));
        for i in 0..3usize {
            assert!(shard.segmentation.slice(s![i, .., .., ..]).iter().any(|&v| v == 1));
        }
    }

    #[test]
    fn bbox_shard_records_each_object() {
        let corpus = CharacterCorpus::procedural(5, 20, 0);
        let config = small_config(2);
        let worker = BatchWorker::new(&corpus, &config).unwrap();

        let shard = worker.bbox_shard(1, Some(5)).unwrap();
        assert_eq!(shard.boxes.shape(), &[2, 4, 5]);
        for i in 0..2usize {
            for j in 0..4usize {
                let row = shard.boxes.slice(s![i, j, ..]);
                assert!(row[0] < row[2] && row[2] <= 64);
                assert!(row[1] < row[3] && row[3] <= 48);
                assert!(row[4] < 5);
            }
        }
    }

    #[test]
    fn same_seed_same_shard() {
        let corpus = CharacterCorpus::procedural(5, 20, 0);
        let config = small_config(2);
        let worker = BatchWorker::new(&corpus, &config).unwrap();

        let a = worker.segmentation_shard(0, Some(99)).unwrap();
        let b = worker.segmentation_shard(3, Some(99)).unwrap();
        assert_eq!(a, b);
    }
}
