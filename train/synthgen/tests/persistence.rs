use std::{fs, path::PathBuf};

use ndarray::{Array3, Array4};
use scene::{CharacterCorpus, GenerationConfig, GenerationParams};
use synthgen::{BboxDataset, DatasetDriver, io};

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("synthgen-{name}-{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    dir
}

#[test]
fn segmentation_arrays_are_saved_as_npy() {
    let cfg = GenerationConfig::new(GenerationParams {
        image_width: 48,
        image_height: 40,
        target_width: 16,
        target_height: 16,
        distractors: 2,
        max_scale: 1.2,
        job_length: 2,
        ..Default::default()
    })
    .unwrap();
    let corpus = CharacterCorpus::procedural(3, 20, 0);
    let data = DatasetDriver::new(&corpus, &cfg)
        .generate_segmentation(2, Some(3))
        .unwrap();

    let root = scratch_dir("npy");
    let dir = root.join("val-train");
    io::save_segmentation(&dir, &data).unwrap();
    for name in ["images.npy", "segmentation.npy", "targets.npy"] {
        assert!(dir.join(name).is_file());
    }

    let loaded = io::load_dataset(&root, "val-train").unwrap();
    assert_eq!(loaded.images.shape(), &[2, 40, 48, 3]);
    assert_eq!(loaded.segmentation.shape(), &[2, 40, 48, 1]);
    assert_eq!(loaded.targets.shape(), &[2, 16, 16, 3]);
    assert_eq!(loaded, data);

    assert!(io::load_dataset(&root, "holdout").is_err());
    fs::remove_dir_all(root).unwrap();
}

#[test]
fn corpus_directory_loads_sorted_classes() {
    let root = scratch_dir("corpus");
    let corpus = CharacterCorpus::procedural(2, 3, 4);
    for class in 0..2 {
        let dir = root.join("alphabet").join(format!("character{:02}", class + 1));
        fs::create_dir_all(&dir).unwrap();
        for drawer in 0..3 {
            let mut img = corpus.instance(class, drawer).unwrap().clone();
            image::imageops::invert(&mut img);
            img.save(dir.join(format!("{drawer:02}.png"))).unwrap();
        }
    }
    fs::write(root.join("alphabet").join("notes.txt"), "ignored").unwrap();

    let loaded = synthgen::corpus_dir::load_corpus(&root, true).unwrap();
    assert_eq!(loaded.num_classes(), 2);
    assert_eq!(loaded.min_instances(), 3);
    assert_eq!(loaded.instance(1, 2), corpus.instance(1, 2));
    fs::remove_dir_all(root).unwrap();
}

#[test]
fn bbox_arrays_round_trip_as_uint32() {
    let mut boxes = Array3::<u32>::zeros((2, 3, 5));
    boxes[[0, 0, 0]] = 300;
    boxes[[0, 0, 2]] = 598;
    boxes[[0, 0, 3]] = 17;
    boxes[[1, 2, 4]] = 1023;
    let data = BboxDataset {
        images: Array4::from_shape_fn((2, 4, 6, 3), |(i, y, x, c)| (i + y + x + c) as u8),
        boxes,
    };

    let dir = scratch_dir("bbox-npy");
    io::save_bbox_arrays(&dir, &data).unwrap();
    assert!(dir.join("images.npy").is_file());
    assert!(dir.join("bboxes.npy").is_file());

    let loaded = io::load_bbox_arrays(&dir).unwrap();
    assert_eq!(loaded, data);
    assert_eq!(loaded.boxes[[1, 2, 4]], 1023);

    // a uint32 box file is not readable as bytes
    assert!(ndarray_npy::read_npy::<_, Array3<u8>>(dir.join("bboxes.npy")).is_err());
    fs::remove_dir_all(dir).unwrap();
}

#[test]
fn missing_corpus_directory_is_reported() {
    let root = scratch_dir("no-corpus");
    let err = synthgen::corpus_dir::load_corpus(&root, false).unwrap_err();
    assert!(format!("{err:#}").contains("listing"));
}
