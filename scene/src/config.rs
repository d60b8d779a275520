use std::{fmt, ops::Range, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Which drawers' instances a dataset may draw from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawerSplit {
    #[default]
    All,
    Train,
    Val,
}

impl fmt::Display for DrawerSplit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DrawerSplit::All => "all",
            DrawerSplit::Train => "train",
            DrawerSplit::Val => "val",
        })
    }
}

impl std::str::FromStr for DrawerSplit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(DrawerSplit::All),
            "train" => Ok(DrawerSplit::Train),
            "val" => Ok(DrawerSplit::Val),
            other => Err(format!(
                "a drawer split has to be one of all, train, val (got {other:?})"
            )),
        }
    }
}

/// Raw, user-facing options. Loaded from JSON, every field optional.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationParams {
    pub image_width: u32,
    pub image_height: u32,
    pub target_width: u32,
    pub target_height: u32,
    /// Characters placed behind the target (or annotated objects in bbox mode).
    pub distractors: usize,
    /// Lower end of a varying distractor count; `None` keeps it fixed.
    pub min_distractors: Option<usize>,
    /// Characters placed atop the target.
    pub occluders: usize,
    /// Probability in [0, 1] that a scene carries no target.
    pub empty: f64,
    pub drawer_split: DrawerSplit,
    pub drawer_split_point: usize,
    pub instances_per_class: usize,
    pub max_rotation: f32,
    pub max_shear: f32,
    pub max_scale: f32,
    /// Scenes generated per parallel job.
    pub job_length: usize,
    pub bbox_dims: usize,
    pub num_classes: usize,
    pub max_retries: usize,
    pub data_path: PathBuf,
    pub prefix: String,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            image_width: 96,
            image_height: 96,
            target_width: 32,
            target_height: 32,
            distractors: 31,
            min_distractors: None,
            occluders: 0,
            empty: 0.0,
            drawer_split: DrawerSplit::All,
            drawer_split_point: 14,
            instances_per_class: 20,
            max_rotation: 20.0,
            max_shear: 10.0,
            max_scale: 2.0,
            job_length: 2000,
            bbox_dims: 4,
            num_classes: 20,
            max_retries: 1000,
            data_path: PathBuf::new(),
            prefix: "CLUTTERED_OMNIGLOT".to_string(),
        }
    }
}

/// Rotation/shear/scale ranges handed to the augmenter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AugmentBounds {
    /// Degrees.
    pub rotation: f32,
    /// Degrees.
    pub shear: f32,
    /// Multiplicative, >= 1.
    pub scale: f32,
}

impl AugmentBounds {
    /// Same angles, no scale augmentation.
    pub fn without_scale(self) -> Self {
        Self { scale: 1.0, ..self }
    }
}

/// Validated, immutable generation settings.
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationConfig {
    params: GenerationParams,
    instances: Range<usize>,
}

impl GenerationConfig {
    pub fn new(params: GenerationParams) -> Result<Self, ConfigError> {
        let p = &params;
        if p.image_width == 0 || p.image_height == 0 {
            return Err(ConfigError::ZeroSize {
                what: "scene",
                width: p.image_width,
                height: p.image_height,
            });
        }
        if p.target_width == 0 || p.target_height == 0 {
            return Err(ConfigError::ZeroSize {
                what: "target",
                width: p.target_width,
                height: p.target_height,
            });
        }
        if !(0.0..=1.0).contains(&p.empty) {
            return Err(ConfigError::EmptyProbability(p.empty));
        }
        for (name, value) in [("max_rotation", p.max_rotation), ("max_shear", p.max_shear)] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::AngleBound { name, value });
            }
        }
        if !p.max_scale.is_finite() || p.max_scale < 1.0 {
            return Err(ConfigError::ScaleBound(p.max_scale));
        }
        if p.bbox_dims != 4 {
            return Err(ConfigError::BboxDims(p.bbox_dims));
        }
        if let Some(min) = p.min_distractors {
            if min > p.distractors {
                return Err(ConfigError::DistractorRange {
                    min,
                    max: p.distractors,
                });
            }
        }
        for (name, value) in [
            ("job_length", p.job_length),
            ("num_classes", p.num_classes),
            ("max_retries", p.max_retries),
            ("instances_per_class", p.instances_per_class),
        ] {
            if value == 0 {
                return Err(ConfigError::NotPositive { name });
            }
        }

        let instances = instance_range(p.drawer_split, p.drawer_split_point, p.instances_per_class)?;
        Ok(Self { params, instances })
    }

    pub fn params(&self) -> &GenerationParams {
        &self.params
    }

    /// Drawer instances (`LOW_INSTANCE..HIGH_INSTANCE`) characters are drawn from.
    pub fn instances(&self) -> Range<usize> {
        self.instances.clone()
    }

    pub fn scene_size(&self) -> (u32, u32) {
        (self.params.image_width, self.params.image_height)
    }

    pub fn target_size(&self) -> (u32, u32) {
        (self.params.target_width, self.params.target_height)
    }

    pub fn augment_bounds(&self) -> AugmentBounds {
        AugmentBounds {
            rotation: self.params.max_rotation,
            shear: self.params.max_shear,
            scale: self.params.max_scale,
        }
    }

    /// Fields per bounding-box row: corners plus the class id.
    pub fn bbox_fields(&self) -> usize {
        self.params.bbox_dims + 1
    }

    /// Number of shards for `dataset_size` scenes. Remainders are rejected.
    pub fn shard_count(&self, dataset_size: usize) -> Result<usize, ConfigError> {
        let job_length = self.params.job_length;
        if dataset_size % job_length != 0 {
            return Err(ConfigError::ShardMismatch {
                size: dataset_size,
                job_length,
            });
        }
        Ok(dataset_size / job_length)
    }

    /// Base name shared by the COCO json and its image files.
    pub fn coco_stem(&self) -> String {
        format!(
            "{}_{}_characters_bbox_{}",
            self.params.prefix, self.params.distractors, self.params.drawer_split
        )
    }
}

fn instance_range(
    split: DrawerSplit,
    split_point: usize,
    instances: usize,
) -> Result<Range<usize>, ConfigError> {
    if split != DrawerSplit::All && (split_point == 0 || split_point >= instances) {
        return Err(ConfigError::SplitPoint {
            split_point,
            instances,
        });
    }
    Ok(match split {
        DrawerSplit::All => 0..instances,
        DrawerSplit::Train => 0..split_point,
        DrawerSplit::Val => split_point..instances,
    })
}
