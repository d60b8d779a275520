//! Synthesis of cluttered handwritten-character scenes.
//!
//! A [`CharacterCorpus`] supplies source rasters; [`SceneComposer`] augments,
//! crops and colorizes them into scenes with either a target segmentation
//! mask or per-object bounding boxes. [`target_crop`] renders the isolated
//! target view used alongside segmentation scenes.

pub mod augment;
pub mod colorize;
pub mod composer;
pub mod config;
pub mod corpus;
pub mod crop;
pub mod error;
pub mod geom;
pub mod retry;
pub mod target;

pub use composer::{AnnotatedScene, SceneComposer, SegmentationScene};
pub use config::{DrawerSplit, GenerationConfig, GenerationParams};
pub use corpus::CharacterCorpus;
pub use error::{AugmentError, ConfigError, SceneError};
pub use geom::BoundingBox;
pub use target::target_crop;
