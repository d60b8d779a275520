use std::fmt;

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{what} must be positive, got {width}x{height}")]
    ZeroSize {
        what: &'static str,
        width: u32,
        height: u32,
    },
    #[error("empty-scene probability must lie in [0, 1], got {0}")]
    EmptyProbability(f64),
    #[error("{name} must be a finite non-negative number of degrees, got {value}")]
    AngleBound { name: &'static str, value: f32 },
    #[error("scale bound must be a finite value >= 1, got {0}")]
    ScaleBound(f32),
    #[error("drawer split point {split_point} must lie strictly inside 0..{instances}")]
    SplitPoint { split_point: usize, instances: usize },
    #[error("only corner boxes (4 fields) are supported, got {0} bbox dims")]
    BboxDims(usize),
    #[error("min_distractors ({min}) exceeds distractors ({max})")]
    DistractorRange { min: usize, max: usize },
    #[error("{name} must be positive")]
    NotPositive { name: &'static str },
    #[error("dataset size {size} is not a multiple of the job length {job_length}")]
    ShardMismatch { size: usize, job_length: usize },
    #[error("corpus class {class} has {available} instances, drawer split needs {required}")]
    NotEnoughInstances {
        class: usize,
        available: usize,
        required: usize,
    },
    #[error("corpus has {corpus} classes but only {configured} categories are configured")]
    TooManyClasses { corpus: usize, configured: usize },
    #[error("character corpus is empty")]
    EmptyCorpus,
}

/// Local failure of one augmentation attempt. Always recoverable by retrying.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum AugmentError {
    #[error("affine transform produced a degenerate {width}x{height} extent")]
    Degenerate { width: i64, height: i64 },
    #[error("affine transform is not invertible")]
    Singular,
    #[error("image holds no foreground pixels")]
    NoContent,
    #[error("glyph of {glyph_width}x{glyph_height} does not fit a {canvas_width}x{canvas_height} canvas")]
    DoesNotFit {
        glyph_width: u32,
        glyph_height: u32,
        canvas_width: u32,
        canvas_height: u32,
    },
}

/// Which compositing step a retried glyph belonged to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Distractor,
    Target,
    Occluder,
    Object,
    TargetCrop,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Distractor => "distractor",
            Stage::Target => "target",
            Stage::Occluder => "occluder",
            Stage::Object => "annotated object",
            Stage::TargetCrop => "target crop",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("gave up placing {stage} after {attempts} attempts")]
    RetriesExhausted {
        stage: Stage,
        attempts: usize,
        #[source]
        source: AugmentError,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
}
