//! Parallel generation and persistence of cluttered character datasets.

pub mod corpus_dir;
pub mod driver;
pub mod generator;
pub mod io;
pub mod record;

pub use driver::{BboxDataset, DatasetDriver, SegmentationDataset, shard_seeds};
pub use generator::BatchWorker;
