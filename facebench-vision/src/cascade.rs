use std::path::Path;

use anyhow::{anyhow, Result};
use image::DynamicImage;
use rustface::{Detector as _, ImageData};
use serde::{Deserialize, Serialize};

use crate::detector::Detector;
use crate::face::Detection;

/// Tuning for the funnel-structured cascade detector.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CascadeParams {
    /// Growth of the detection window between pyramid levels (> 1).
    pub scale_factor: f32,
    /// Smallest face side, in pixels, that will be reported.
    pub min_face_size: u32,
    pub score_threshold: f64,
    pub window_step: u32,
}

impl Default for CascadeParams {
    fn default() -> Self {
        Self {
            scale_factor: 1.2,
            min_face_size: 50,
            score_threshold: 2.0,
            window_step: 4,
        }
    }
}

impl CascadeParams {
    /// rustface panics on out-of-range settings, so check them up front.
    pub fn validate(&self) -> Result<()> {
        if self.min_face_size < 20 {
            anyhow::bail!("min_face_size must be at least 20, got {}", self.min_face_size);
        }
        let pyramid = self.pyramid_step();
        if !(0.01..=0.99).contains(&pyramid) {
            anyhow::bail!(
                "scale_factor {} gives pyramid step {:.3}, outside 0.01..=0.99",
                self.scale_factor,
                pyramid
            );
        }
        if self.score_threshold <= 0.0 {
            anyhow::bail!("score_threshold must be positive, got {}", self.score_threshold);
        }
        if self.window_step == 0 {
            anyhow::bail!("window_step must be positive");
        }
        Ok(())
    }

    /// rustface shrinks the image by this factor per level.
    fn pyramid_step(&self) -> f32 {
        1.0 / self.scale_factor
    }
}

/// Grayscale cascade detector backed by rustface (SeetaFace model).
pub struct CascadeDetector {
    inner: Box<dyn rustface::Detector>,
}

impl CascadeDetector {
    pub fn from_file(model: &Path, params: &CascadeParams) -> Result<Self> {
        params.validate()?;
        if !model.exists() {
            anyhow::bail!("cascade model {} not found", model.display());
        }

        let path = model.to_string_lossy();
        let mut inner = rustface::create_detector(&path)
            .map_err(|e| anyhow!("loading cascade model {}: {:?}", model.display(), e))?;
        inner.set_min_face_size(params.min_face_size);
        inner.set_score_thresh(params.score_threshold);
        inner.set_pyramid_scale_factor(params.pyramid_step());
        inner.set_slide_window_step(params.window_step, params.window_step);

        Ok(Self { inner })
    }
}

impl Detector for CascadeDetector {
    fn detect(&mut self, img: &DynamicImage) -> Result<Vec<Detection>> {
        let gray = img.to_luma8();
        let (width, height) = gray.dimensions();
        if width == 0 || height == 0 {
            return Ok(vec![]);
        }

        let mut data = ImageData::new(gray.as_raw(), width, height);
        let faces = self.inner.detect(&mut data);

        Ok(faces
            .iter()
            .map(|f| {
                let r = f.bbox();
                Detection::from_bbox(
                    [r.x() as f32, r.y() as f32, r.width() as f32, r.height() as f32],
                    f.score() as f32,
                )
            })
            .collect())
    }
}
