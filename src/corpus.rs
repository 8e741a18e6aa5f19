use anyhow::{Context, Result};
use log::warn;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::labeling::{Convention, Split};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tif", "tiff", "webp"];

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.iter().any(|x| x.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

/// Every image file under `root`, sorted by path.
pub fn list_images(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        anyhow::bail!("image directory {} does not exist", root.display());
    }

    let mut paths = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry.with_context(|| format!("walking {}", root.display()))?;
        if entry.file_type().is_file() && is_image(entry.path()) {
            paths.push(entry.into_path());
        }
    }
    paths.sort();
    Ok(paths)
}

/// Images partitioned into the enrollment and evaluation splits.
#[derive(Debug, Default, Clone)]
pub struct Corpus {
    pub train: Vec<PathBuf>,
    pub test: Vec<PathBuf>,
}

impl Corpus {
    pub fn new(paths: Vec<PathBuf>, convention: &Convention) -> Self {
        let mut corpus = Self::default();
        for path in paths {
            match convention.split(&path) {
                Some(Split::Train) => corpus.train.push(path),
                Some(Split::Test) => corpus.test.push(path),
                None => warn!("Ignoring {}: no split marker", path.display()),
            }
        }
        corpus
    }

    pub fn load(root: &Path, convention: &Convention) -> Result<Self> {
        Ok(Self::new(list_images(root)?, convention))
    }
}
