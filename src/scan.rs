//! The two passes over the corpus.

use anyhow::{Context, Result};
use image::DynamicImage;
use log::{debug, info, warn};
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use crate::database::EnrollmentDatabase;
use crate::labeling::label_for;
use crate::matcher;
use crate::tally::{EnrollmentTally, EvaluationTally};
use crate::{Detector, Embedding, Encoder};

/// Everything the enrollment pass produces.
#[derive(Debug, Default)]
pub struct Enrollment {
    pub database: EnrollmentDatabase,
    /// Labels with at least one training image where no face was found.
    pub no_face: BTreeSet<String>,
    pub tally: EnrollmentTally,
}

fn load_image(path: &Path) -> Result<DynamicImage> {
    image::open(path).with_context(|| format!("decoding {}", path.display()))
}

/// Detect and encode every face in one image.
fn embed_faces<D, E>(path: &Path, detector: &mut D, encoder: &mut E) -> Result<Vec<Embedding>>
where
    D: Detector + ?Sized,
    E: Encoder + ?Sized,
{
    let img = load_image(path)?;
    let detections = detector
        .detect(&img)
        .with_context(|| format!("detecting faces in {}", path.display()))?;
    detections
        .iter()
        .map(|d| {
            encoder
                .encode(&img, d)
                .with_context(|| format!("encoding face in {}", path.display()))
        })
        .collect()
}

/// Selected paths in order, each at most once.
fn selected<'a>(paths: &'a [PathBuf], select: impl Fn(&Path) -> bool) -> Vec<&'a PathBuf> {
    let mut seen = HashSet::new();
    paths
        .iter()
        .filter(|p| select(p.as_path()))
        .filter(|p| {
            let first = seen.insert(p.as_path());
            if !first {
                warn!("Skipping duplicate {}", p.display());
            }
            first
        })
        .collect()
}

/// Build the database from every path `select` accepts.
pub fn enroll<D, E>(
    paths: &[PathBuf],
    select: impl Fn(&Path) -> bool,
    detector: &mut D,
    encoder: &mut E,
) -> Result<Enrollment>
where
    D: Detector + ?Sized,
    E: Encoder + ?Sized,
{
    let mut enrollment = Enrollment::default();
    let chosen = selected(paths, select);

    for (i, path) in chosen.iter().enumerate() {
        let label = label_for(path)?;
        info!("Processing image {}/{} for \"{}\"", i + 1, chosen.len(), label);
        enrollment.tally.images += 1;

        let embeddings = embed_faces(path, detector, encoder)?;
        if embeddings.is_empty() {
            warn!("No face found in {}", path.display());
            enrollment.no_face.insert(label.clone());
        }
        for embedding in embeddings {
            enrollment.tally.faces += 1;
            enrollment.database.push(embedding, label.as_str());
        }
    }

    Ok(enrollment)
}

/// Match every face of every path `select` accepts against the enrollment,
/// skipping labels that had a training image without a face.
pub fn evaluate<D, E>(
    paths: &[PathBuf],
    select: impl Fn(&Path) -> bool,
    enrollment: &Enrollment,
    tolerance: f32,
    detector: &mut D,
    encoder: &mut E,
) -> Result<EvaluationTally>
where
    D: Detector + ?Sized,
    E: Encoder + ?Sized,
{
    let mut tally = EvaluationTally::default();

    let mut cases = Vec::new();
    for path in selected(paths, select) {
        let label = label_for(path)?;
        if enrollment.no_face.contains(&label) {
            debug!("Skipping {}: no face enrolled for \"{}\"", path.display(), label);
            continue;
        }
        cases.push((path, label));
    }

    for (i, (path, label)) in cases.iter().enumerate() {
        info!("Recognition case {}/{} for \"{}\"", i + 1, cases.len(), label);
        tally.images += 1;

        for embedding in embed_faces(path, detector, encoder)? {
            let prediction = matcher::predict(&enrollment.database, &embedding, tolerance);
            let outcome = tally.record(label, prediction);
            debug!("{}: predicted {} ({:?})", path.display(), prediction, outcome);
        }
    }

    Ok(tally)
}
