use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use image::{RgbImage, codecs::jpeg::JpegEncoder};
use log::info;
use ndarray::{Array3, Array4, s};
use ndarray_npy::{read_npy, write_npy};
use rayon::prelude::*;
use scene::GenerationConfig;

use crate::{
    driver::{BboxDataset, SegmentationDataset},
    record::CocoDocument,
};

/// Subsets `load_dataset` accepts.
pub const SUBSETS: [&str; 5] = [
    "train",
    "val-train",
    "test-train",
    "val-one-shot",
    "test-one-shot",
];

const JPEG_QUALITY: u8 = 75;

fn save_array<A, D>(dir: &Path, name: &str, array: &ndarray::Array<A, D>) -> Result<()>
where
    A: ndarray_npy::WritableElement,
    D: ndarray::Dimension,
{
    let path = dir.join(format!("{name}.npy"));
    write_npy(&path, array).with_context(|| format!("writing {}", path.display()))
}

fn load_array<T: ndarray_npy::ReadNpyExt>(dir: &Path, name: &str) -> Result<T> {
    let path = dir.join(format!("{name}.npy"));
    read_npy(&path).with_context(|| format!("reading {}", path.display()))
}

/// Writes `images.npy`, `segmentation.npy` and `targets.npy` into `dir`.
pub fn save_segmentation(dir: &Path, data: &SegmentationDataset) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    save_array(dir, "images", &data.images)?;
    save_array(dir, "segmentation", &data.segmentation)?;
    save_array(dir, "targets", &data.targets)?;
    info!("saved {} scenes to {}", data.images.shape()[0], dir.display());
    Ok(())
}

pub fn load_segmentation(dir: &Path) -> Result<SegmentationDataset> {
    let images: Array4<u8> = load_array(dir, "images")?;
    let segmentation: Array4<u8> = load_array(dir, "segmentation")?;
    let targets: Array4<u8> = load_array(dir, "targets")?;
    let n = images.shape()[0];
    if segmentation.shape()[0] != n || targets.shape()[0] != n {
        bail!(
            "row counts differ in {}: {} images, {} masks, {} targets",
            dir.display(),
            n,
            segmentation.shape()[0],
            targets.shape()[0]
        );
    }
    Ok(SegmentationDataset {
        images,
        segmentation,
        targets,
    })
}

/// Loads one named subset below `root`.
pub fn load_dataset(root: &Path, subset: &str) -> Result<SegmentationDataset> {
    if !SUBSETS.contains(&subset) {
        bail!("unknown subset {subset:?}, expected one of {SUBSETS:?}");
    }
    load_segmentation(&root.join(subset))
}

/// Writes `images.npy` and `bboxes.npy` into `dir`.
pub fn save_bbox_arrays(dir: &Path, data: &BboxDataset) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    save_array(dir, "images", &data.images)?;
    save_array(dir, "bboxes", &data.boxes)?;
    Ok(())
}

pub fn load_bbox_arrays(dir: &Path) -> Result<BboxDataset> {
    let images: Array4<u8> = load_array(dir, "images")?;
    let boxes: Array3<u32> = load_array(dir, "bboxes")?;
    Ok(BboxDataset { images, boxes })
}

pub fn encode_jpeg(img: &RgbImage) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY).encode_image(img)?;
    Ok(buf)
}

fn scene_image(images: &Array4<u8>, i: usize) -> Result<RgbImage> {
    let (h, w) = (images.shape()[1], images.shape()[2]);
    let pixels: Vec<u8> = images.slice(s![i, .., .., ..]).iter().copied().collect();
    RgbImage::from_raw(w as u32, h as u32, pixels)
        .with_context(|| format!("scene {i} does not match {w}x{h}"))
}

/// Writes the COCO json and one JPEG per scene under the configured data path.
///
/// Returns the path of the json document.
pub fn save_coco(config: &GenerationConfig, data: &BboxDataset) -> Result<PathBuf> {
    let params = config.params();
    let image_dir = params.data_path.join(params.drawer_split.to_string());
    fs::create_dir_all(&image_dir)
        .with_context(|| format!("creating {}", image_dir.display()))?;

    let doc = CocoDocument::build(config, &data.boxes);

    doc.images
        .par_iter()
        .enumerate()
        .try_for_each(|(i, record)| -> Result<()> {
            let jpeg = encode_jpeg(&scene_image(&data.images, i)?)?;
            let path = image_dir.join(&record.file_name);
            fs::write(&path, jpeg).with_context(|| format!("writing {}", path.display()))
        })?;

    let json_path = params.data_path.join(format!("{}.json", config.coco_stem()));
    let mut writer = BufWriter::new(
        File::create(&json_path).with_context(|| format!("creating {}", json_path.display()))?,
    );
    serde_json::to_writer(&mut writer, &doc)?;
    writer.flush()?;

    info!(
        "wrote {} images and {} annotations to {}",
        doc.images.len(),
        doc.annotations.len(),
        json_path.display()
    );
    Ok(json_path)
}
