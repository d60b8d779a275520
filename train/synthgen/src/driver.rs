use std::{collections::BTreeSet, time::Instant};

use anyhow::{Result, bail};
use log::{debug, info};
use ndarray::{Array3, Array4, s};
use rand::{RngCore, SeedableRng};
use rand_xoshiro::SplitMix64;
use rayon::prelude::*;
use scene::{CharacterCorpus, ConfigError, GenerationConfig};

use crate::generator::{BatchWorker, BboxShard, SegmentationShard};

/// Full segmentation dataset, rows in shard order.
pub type SegmentationDataset = SegmentationShard;

/// Full bounding-box dataset, rows in shard order.
pub type BboxDataset = BboxShard;

/// `count` distinct 32-bit shard seeds.
///
/// Oversamples `2 * count` draws, deduplicates them in sorted order and tops
/// up on collisions. `None` seeds the sequence from OS entropy.
pub fn shard_seeds(master: Option<u64>, count: usize) -> Vec<u64> {
    let mut sm = match master {
        Some(seed) => SplitMix64::seed_from_u64(seed),
        None => SplitMix64::from_os_rng(),
    };
    let mut seeds = BTreeSet::new();
    for _ in 0..2 * count {
        seeds.insert(sm.next_u32() as u64);
    }
    while seeds.len() < count {
        seeds.insert(sm.next_u32() as u64);
    }
    seeds.into_iter().take(count).collect()
}

/// Splits a dataset into shards and generates them on the rayon pool.
pub struct DatasetDriver<'a> {
    corpus: &'a CharacterCorpus,
    config: &'a GenerationConfig,
}

impl<'a> DatasetDriver<'a> {
    pub fn new(corpus: &'a CharacterCorpus, config: &'a GenerationConfig) -> Self {
        Self { corpus, config }
    }

    fn plan(&self, dataset_size: usize, seeds: &[u64]) -> Result<usize> {
        let shards = self.config.shard_count(dataset_size)?;
        if seeds.len() < shards {
            bail!("{shards} shards need as many seeds, got {}", seeds.len());
        }
        info!(
            "executing {shards} tasks of {} scenes",
            self.config.params().job_length
        );
        debug!("shard seeds: {:?}", &seeds[..shards]);
        Ok(shards)
    }

    pub fn generate_segmentation(
        &self,
        dataset_size: usize,
        seed: Option<u64>,
    ) -> Result<SegmentationDataset> {
        let shards = self.config.shard_count(dataset_size)?;
        self.generate_segmentation_with_seeds(dataset_size, &shard_seeds(seed, shards))
    }

    pub fn generate_segmentation_with_seeds(
        &self,
        dataset_size: usize,
        seeds: &[u64],
    ) -> Result<SegmentationDataset> {
        let t = Instant::now();
        let shards = self.plan(dataset_size, seeds)?;
        let worker = BatchWorker::new(self.corpus, self.config)?;

        let results = seeds[..shards]
            .par_iter()
            .enumerate()
            .map(|(k, &seed)| worker.segmentation_shard(k, Some(seed)))
            .collect::<Result<Vec<_>>>()?;

        let params = self.config.params();
        let (w, h) = (params.image_width as usize, params.image_height as usize);
        let (tw, th) = (params.target_width as usize, params.target_height as usize);
        let len = params.job_length;
        let mut data = SegmentationDataset {
            images: Array4::zeros((dataset_size, h, w, 3)),
            segmentation: Array4::zeros((dataset_size, h, w, 1)),
            targets: Array4::zeros((dataset_size, th, tw, 3)),
        };
        for (k, shard) in results.iter().enumerate() {
            let rows = k * len..(k + 1) * len;
            data.images
                .slice_mut(s![rows.clone(), .., .., ..])
                .assign(&shard.images);
            data.segmentation
                .slice_mut(s![rows.clone(), .., .., ..])
                .assign(&shard.segmentation);
            data.targets
                .slice_mut(s![rows, .., .., ..])
                .assign(&shard.targets);
        }

        info!("generated {dataset_size} segmentation scenes in {:?}", t.elapsed());
        Ok(data)
    }

    pub fn generate_bbox(&self, dataset_size: usize, seed: Option<u64>) -> Result<BboxDataset> {
        let shards = self.config.shard_count(dataset_size)?;
        self.generate_bbox_with_seeds(dataset_size, &shard_seeds(seed, shards))
    }

    pub fn generate_bbox_with_seeds(
        &self,
        dataset_size: usize,
        seeds: &[u64],
    ) -> Result<BboxDataset> {
        let t = Instant::now();
        let params = self.config.params();
        if self.corpus.num_classes() > params.num_classes {
            return Err(ConfigError::TooManyClasses {
                corpus: self.corpus.num_classes(),
                configured: params.num_classes,
            }
            .into());
        }
        let shards = self.plan(dataset_size, seeds)?;
        let worker = BatchWorker::new(self.corpus, self.config)?;

        let results = seeds[..shards]
            .par_iter()
            .enumerate()
            .map(|(k, &seed)| worker.bbox_shard(k, Some(seed)))
            .collect::<Result<Vec<_>>>()?;

        let (w, h) = (params.image_width as usize, params.image_height as usize);
        let len = params.job_length;
        let mut data = BboxDataset {
            images: Array4::zeros((dataset_size, h, w, 3)),
            boxes: Array3::zeros((dataset_size, params.distractors, self.config.bbox_fields())),
        };
        for (k, shard) in results.iter().enumerate() {
            let rows = k * len..(k + 1) * len;
            data.images
                .slice_mut(s![rows.clone(), .., .., ..])
                .assign(&shard.images);
            data.boxes.slice_mut(s![rows, .., ..]).assign(&shard.boxes);
        }

        info!("generated {dataset_size} annotated scenes in {:?}", t.elapsed());
        Ok(data)
    }
}
