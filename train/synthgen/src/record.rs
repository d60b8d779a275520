use ndarray::{Array3, s};
use scene::{BoundingBox, GenerationConfig};
use serde::{Deserialize, Serialize};

const DATE_CAPTURED: &str = "2021-05-22 00:00:00";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CocoImage {
    pub license: u32,
    pub file_name: String,
    pub coco_url: String,
    pub width: u32,
    pub height: u32,
    pub date_captured: String,
    pub flickr_url: String,
    pub id: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CocoAnnotation {
    /// x, y, width, height
    pub bbox: [u32; 4],
    pub segmentation: Vec<[u32; 8]>,
    pub area: u64,
    pub iscrowd: u8,
    pub image_id: u64,
    pub category_id: u32,
    pub id: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CocoCategory {
    pub id: String,
    pub name: String,
    pub supercategory: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CocoDocument {
    pub images: Vec<CocoImage>,
    pub annotations: Vec<CocoAnnotation>,
    pub categories: Vec<CocoCategory>,
}

pub fn image_file_name(config: &GenerationConfig, id: u64) -> String {
    format!("{}_{id:012}.jpg", config.coco_stem())
}

impl CocoAnnotation {
    fn from_box(b: &BoundingBox, image_id: u64, id: u64) -> Self {
        let (w, h) = (b.width(), b.height());
        Self {
            bbox: [b.x_min, b.y_min, w, h],
            segmentation: vec![[
                b.x_min, b.y_min, b.x_min, b.y_max, b.x_max, b.y_max, b.x_max, b.y_min,
            ]],
            area: w as u64 * h as u64,
            iscrowd: 0,
            image_id,
            // categories are 1-based
            category_id: b.class_id + 1,
            id,
        }
    }
}

impl CocoDocument {
    /// One image record per row of `boxes`, one annotation per set box.
    ///
    /// Image ids start at 1; annotation ids count emitted annotations.
    pub fn build(config: &GenerationConfig, boxes: &Array3<u32>) -> Self {
        let (width, height) = config.scene_size();
        let mut images = Vec::with_capacity(boxes.shape()[0]);
        let mut annotations = Vec::new();

        for i in 0..boxes.shape()[0] {
            let image_id = i as u64 + 1;
            images.push(CocoImage {
                license: 1,
                file_name: image_file_name(config, image_id),
                coco_url: String::new(),
                width,
                height,
                date_captured: DATE_CAPTURED.to_string(),
                flickr_url: String::new(),
                id: image_id,
            });

            for bbox in boxes_of(boxes, i) {
                let id = annotations.len() as u64 + 1;
                annotations.push(CocoAnnotation::from_box(&bbox, image_id, id));
            }
        }

        let categories = (1..=config.params().num_classes)
            .map(|i| CocoCategory {
                id: i.to_string(),
                name: i.to_string(),
                supercategory: "None".to_string(),
            })
            .collect();

        Self {
            images,
            annotations,
            categories,
        }
    }
}

/// Box rows of one image, skipping unset slots.
pub fn boxes_of(boxes: &Array3<u32>, image: usize) -> Vec<BoundingBox> {
    boxes
        .slice(s![image, .., ..])
        .outer_iter()
        .map(|row| BoundingBox::from_row([row[0], row[1], row[2], row[3], row[4]]))
        .filter(|b| !b.is_unset())
        .collect()
}
