use std::path::Path;

use anyhow::{Context, Result};
use image::{DynamicImage, GenericImageView};
use ort::{session::Session, value::Value};
use serde::{Deserialize, Serialize};

use crate::face::{self, Detection};
use crate::yunet;

/// Anything that can find faces in an image.
pub trait Detector {
    fn detect(&mut self, img: &DynamicImage) -> Result<Vec<Detection>>;
}

/// Tuning for the YuNet detector.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct YuNetParams {
    pub score_threshold: f32,
    pub nms_threshold: f32,
    pub input_size: u32,
}

impl Default for YuNetParams {
    fn default() -> Self {
        Self {
            score_threshold: 0.6,
            nms_threshold: 0.3,
            input_size: 640,
        }
    }
}

/// YuNet face detector running on ONNX Runtime.
pub struct YuNetDetector {
    session: Session,
    params: YuNetParams,
}

impl YuNetDetector {
    pub fn from_file(model: &Path, params: YuNetParams) -> Result<Self> {
        if params.input_size % 32 != 0 {
            anyhow::bail!("YuNet input size {} is not a multiple of 32", params.input_size);
        }
        Ok(Self {
            session: crate::model::load_session(model)?,
            params,
        })
    }
}

impl Detector for YuNetDetector {
    fn detect(&mut self, img: &DynamicImage) -> Result<Vec<Detection>> {
        let target = self.params.input_size;
        let letterbox = Letterbox::fit(img.dimensions(), target);

        let resized = img.resize_exact(
            letterbox.width,
            letterbox.height,
            image::imageops::FilterType::Triangle,
        );
        let mut canvas = DynamicImage::new_rgb8(target, target);
        image::imageops::overlay(
            &mut canvas,
            &resized,
            letterbox.offset_x as i64,
            letterbox.offset_y as i64,
        );

        let input = Value::from_array(face::bgr_tensor(&canvas.to_rgb8()))?;
        let outputs = self.session.run(ort::inputs![input])?;

        let mut owned: Vec<(Vec<i64>, Vec<f32>)> = Vec::new();
        for (_name, output) in outputs.iter() {
            let (shape, data) = output.try_extract_tensor::<f32>()?;
            owned.push((shape.iter().copied().collect(), data.to_vec()));
        }
        let refs: Vec<(&[i64], &[f32])> = owned
            .iter()
            .map(|(s, d)| (s.as_slice(), d.as_slice()))
            .collect();

        let levels =
            yunet::parse_outputs(&refs, target as usize).context("parsing YuNet outputs")?;
        let raw = yunet::decode(&levels, self.params.score_threshold, target as usize);
        let kept = face::nms(&raw, self.params.nms_threshold);

        log::debug!("yunet: {} candidates, {} after nms", raw.len(), kept.len());
        Ok(kept.into_iter().map(|d| letterbox.restore(d)).collect())
    }
}

/// Aspect-preserving resize into a square canvas, centred with padding.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Letterbox {
    scale: f32,
    width: u32,
    height: u32,
    offset_x: u32,
    offset_y: u32,
}

impl Letterbox {
    fn fit((w, h): (u32, u32), target: u32) -> Self {
        let scale = target as f32 / w.max(h).max(1) as f32;
        let width = ((w as f32 * scale) as u32).clamp(1, target);
        let height = ((h as f32 * scale) as u32).clamp(1, target);
        Self {
            scale,
            width,
            height,
            offset_x: (target - width) / 2,
            offset_y: (target - height) / 2,
        }
    }

    fn to_source(&self, x: f32, y: f32) -> (f32, f32) {
        (
            (x - self.offset_x as f32) / self.scale,
            (y - self.offset_y as f32) / self.scale,
        )
    }

    fn restore(&self, mut d: Detection) -> Detection {
        let (x, y) = self.to_source(d.bbox[0], d.bbox[1]);
        d.bbox = [x, y, d.bbox[2] / self.scale, d.bbox[3] / self.scale];
        if let Some(lm) = d.landmarks.as_mut() {
            for k in 0..5 {
                let (px, py) = self.to_source(lm[2 * k], lm[2 * k + 1]);
                lm[2 * k] = px;
                lm[2 * k + 1] = py;
            }
        }
        d
    }
}
