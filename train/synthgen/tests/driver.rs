use ndarray::s;
use scene::{CharacterCorpus, ConfigError, GenerationConfig, GenerationParams};
use synthgen::{DatasetDriver, shard_seeds};

fn config(job_length: usize, distractors: usize) -> GenerationConfig {
    GenerationConfig::new(GenerationParams {
        image_width: 64,
        image_height: 64,
        target_width: 24,
        target_height: 24,
        distractors,
        job_length,
        max_scale: 1.5,
        num_classes: 8,
        ..Default::default()
    })
    .unwrap()
}

#[test]
fn shard_plan_covers_exact_multiples() {
    let cfg = GenerationConfig::new(GenerationParams::default()).unwrap();
    assert_eq!(cfg.shard_count(4000), Ok(2));
}

#[test]
fn generated_rows_match_dataset_size() {
    let corpus = CharacterCorpus::procedural(6, 20, 1);
    let cfg = config(2, 2);
    assert_eq!(cfg.shard_count(4), Ok(2));
    let driver = DatasetDriver::new(&corpus, &cfg);

    let segmentation = driver.generate_segmentation(4, Some(2)).unwrap();
    assert_eq!(segmentation.images.shape()[0], 4);
    assert_eq!(segmentation.segmentation.shape()[0], 4);
    assert_eq!(segmentation.targets.shape()[0], 4);
    for i in 0..4usize {
        let mask = segmentation.segmentation.slice(s![i, .., .., ..]);
        assert!(mask.iter().any(|&v| v == 1));
    }

    let bbox = driver.generate_bbox(4, Some(2)).unwrap();
    assert_eq!(bbox.images.shape()[0], 4);
    assert_eq!(bbox.boxes.shape()[0], 4);
}

#[test]
fn remainder_is_a_configuration_error() {
    let cfg = GenerationConfig::new(GenerationParams::default()).unwrap();
    let corpus = CharacterCorpus::procedural(4, 20, 0);
    let driver = DatasetDriver::new(&corpus, &cfg);

    let err = driver.generate_segmentation(4500, Some(1)).unwrap_err();
    assert_eq!(
        err.downcast_ref::<ConfigError>(),
        Some(&ConfigError::ShardMismatch {
            size: 4500,
            job_length: 2000
        })
    );
}

#[test]
fn segmentation_dataset_concatenates_shards_in_order() {
    let corpus = CharacterCorpus::procedural(6, 20, 1);
    let cfg = config(2, 3);
    let driver = DatasetDriver::new(&corpus, &cfg);
    let seeds = shard_seeds(Some(7), 3);

    let data = driver.generate_segmentation_with_seeds(6, &seeds).unwrap();
    assert_eq!(data.images.shape(), &[6, 64, 64, 3]);
    assert_eq!(data.segmentation.shape(), &[6, 64, 64, 1]);
    assert_eq!(data.targets.shape(), &[6, 24, 24, 3]);

    let worker = synthgen::BatchWorker::new(&corpus, &cfg).unwrap();
    let second = worker.segmentation_shard(1, Some(seeds[1])).unwrap();
    assert_eq!(data.images.slice(s![2..4, .., .., ..]), second.images);
    assert_eq!(data.targets.slice(s![2..4, .., .., ..]), second.targets);
}

#[test]
fn identical_seeds_give_identical_datasets() {
    let corpus = CharacterCorpus::procedural(6, 20, 1);
    let cfg = config(2, 3);
    let driver = DatasetDriver::new(&corpus, &cfg);

    let a = driver.generate_segmentation(4, Some(123)).unwrap();
    let b = driver.generate_segmentation(4, Some(123)).unwrap();
    assert_eq!(a, b);

    let a = driver.generate_bbox(4, Some(5)).unwrap();
    let b = driver.generate_bbox(4, Some(5)).unwrap();
    assert_eq!(a, b);
}

#[test]
fn bbox_dataset_has_one_row_per_object() {
    let corpus = CharacterCorpus::procedural(8, 20, 2);
    let cfg = config(3, 5);
    let driver = DatasetDriver::new(&corpus, &cfg);

    let data = driver.generate_bbox(6, Some(9)).unwrap();
    assert_eq!(data.images.shape(), &[6, 64, 64, 3]);
    assert_eq!(data.boxes.shape(), &[6, 5, 5]);
    for i in 0..6 {
        let boxes = synthgen::record::boxes_of(&data.boxes, i);
        assert_eq!(boxes.len(), 5);
        for b in boxes {
            assert!(b.x_min < b.x_max && b.x_max <= 64);
            assert!(b.y_min < b.y_max && b.y_max <= 64);
        }
    }
}

#[test]
fn bbox_mode_rejects_uncovered_classes() {
    let corpus = CharacterCorpus::procedural(9, 20, 2);
    let cfg = config(1, 2);
    let driver = DatasetDriver::new(&corpus, &cfg);

    let err = driver.generate_bbox(1, Some(0)).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ConfigError>(),
        Some(ConfigError::TooManyClasses {
            corpus: 9,
            configured: 8
        })
    ));
}

#[test]
fn too_few_seeds_are_rejected() {
    let corpus = CharacterCorpus::procedural(2, 20, 0);
    let cfg = config(1, 1);
    let driver = DatasetDriver::new(&corpus, &cfg);
    assert!(driver.generate_segmentation_with_seeds(3, &[1, 2]).is_err());
}
