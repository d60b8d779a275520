use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use scene::{CharacterCorpus, DrawerSplit, GenerationConfig, GenerationParams};
use synthgen::{DatasetDriver, corpus_dir::load_corpus, io};

/// Generate cluttered handwritten-character scene datasets.
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// JSON file with generation parameters
    #[arg(long)]
    config: Option<PathBuf>,
    /// Character corpus: one directory of images per class
    #[arg(long, required_unless_present = "procedural")]
    corpus: Option<PathBuf>,
    /// Use a drawn corpus with this many classes instead of --corpus
    #[arg(long, conflicts_with = "corpus")]
    procedural: Option<usize>,
    /// Corpus images are dark strokes on a light background
    #[arg(long)]
    invert: bool,
    /// Worker threads (default: all cores)
    #[arg(long)]
    threads: Option<usize>,
    #[arg(long)]
    split: Option<DrawerSplit>,
    #[arg(long)]
    distractors: Option<usize>,
    #[arg(long)]
    job_length: Option<usize>,
    #[arg(long)]
    data_path: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Scenes with target segmentation masks and target crops
    Segmentation {
        #[arg(long)]
        size: usize,
        /// Output directory for the .npy arrays
        #[arg(long)]
        out: PathBuf,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Scenes with per-character bounding boxes
    Bbox {
        #[arg(long)]
        size: usize,
        #[arg(long)]
        seed: Option<u64>,
        /// Skip the COCO export
        #[arg(long)]
        no_coco: bool,
        /// Also write images.npy and bboxes.npy here
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn load_params(args: &Args) -> Result<GenerationParams> {
    let mut params = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => GenerationParams::default(),
    };
    if let Some(split) = args.split {
        params.drawer_split = split;
    }
    if let Some(n) = args.distractors {
        params.distractors = n;
    }
    if let Some(n) = args.job_length {
        params.job_length = n;
    }
    if let Some(path) = &args.data_path {
        params.data_path = path.clone();
    }
    Ok(params)
}

fn main() -> Result<()> {
    pretty_env_logger::init();
    let args = Args::parse();

    if let Some(n) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build_global()
            .context("configuring worker pool")?;
    }

    let config = GenerationConfig::new(load_params(&args)?)?;
    let corpus = match (&args.corpus, args.procedural) {
        (Some(root), _) => load_corpus(root, args.invert)?,
        (None, Some(classes)) => {
            CharacterCorpus::procedural(classes, config.params().instances_per_class, 0)
        }
        (None, None) => anyhow::bail!("either --corpus or --procedural is required"),
    };
    let driver = DatasetDriver::new(&corpus, &config);

    match args.command {
        Command::Segmentation { size, out, seed } => {
            let data = driver.generate_segmentation(size, seed)?;
            io::save_segmentation(&out, &data)?;
        }
        Command::Bbox {
            size,
            seed,
            no_coco,
            out,
        } => {
            let data = driver.generate_bbox(size, seed)?;
            if let Some(dir) = out {
                io::save_bbox_arrays(&dir, &data)?;
            }
            if !no_coco {
                io::save_coco(&config, &data)?;
            }
        }
    }

    Ok(())
}
