use std::{
    fs::read_dir,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use image::{GrayImage, imageops};
use log::info;
use rayon::prelude::*;
use scene::CharacterCorpus;

fn is_image(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_ascii_lowercase())
            .as_deref(),
        Some("png") | Some("jpg") | Some("jpeg")
    )
}

fn entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = read_dir(dir)
        .with_context(|| format!("listing {}", dir.display()))?
        .map(|e| {
            e.map(|e| e.path())
                .with_context(|| format!("reading an entry of {}", dir.display()))
        })
        .collect::<Result<Vec<PathBuf>>>()?;
    paths.sort();
    Ok(paths)
}

/// Every directory below `root` that directly holds images, in path order.
fn class_dirs(root: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let paths = entries(&dir)?;
        if paths.iter().any(|p| p.is_file() && is_image(p)) {
            found.push(dir);
        }
        pending.extend(paths.into_iter().filter(|p| p.is_dir()));
    }
    found.sort();
    Ok(found)
}

fn load_class(dir: &Path, invert: bool) -> Result<Vec<GrayImage>> {
    entries(dir)?
        .into_iter()
        .filter(|p| p.is_file() && is_image(p))
        .map(|path| -> Result<GrayImage> {
            let mut img = image::open(&path)
                .with_context(|| format!("decoding {}", path.display()))?
                .into_luma8();
            if invert {
                imageops::invert(&mut img);
            }
            Ok(img)
        })
        .collect()
}

/// Loads a class-per-directory character corpus.
///
/// Instances are ordered by file name so drawer indices are stable. With
/// `invert`, dark strokes on a light page become bright strokes on zero.
pub fn load_corpus(root: &Path, invert: bool) -> Result<CharacterCorpus> {
    let dirs = class_dirs(root)?;
    if dirs.is_empty() {
        bail!("no character images below {}", root.display());
    }
    let classes = dirs
        .par_iter()
        .map(|dir| load_class(dir, invert))
        .collect::<Result<Vec<_>>>()?;
    let corpus = CharacterCorpus::new(classes)?;
    info!(
        "loaded {} classes (at least {} instances each) from {}",
        corpus.num_classes(),
        corpus.min_instances(),
        root.display()
    );
    Ok(corpus)
}
