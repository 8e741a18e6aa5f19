use std::path::Path;

use anyhow::{Context, Result};
use image::DynamicImage;
use ort::{session::Session, value::Value};

use crate::face::{self, Detection, Embedding};

/// Turns a detected face into an embedding.
pub trait Encoder {
    fn encode(&mut self, img: &DynamicImage, detection: &Detection) -> Result<Embedding>;
}

/// SFace recognizer: 112x112 BGR chip in, L2-normalised 128-d vector out.
pub struct SFaceEncoder {
    session: Session,
}

impl SFaceEncoder {
    pub fn from_file(model: &Path) -> Result<Self> {
        Ok(Self {
            session: crate::model::load_session(model)?,
        })
    }
}

impl Encoder for SFaceEncoder {
    fn encode(&mut self, img: &DynamicImage, detection: &Detection) -> Result<Embedding> {
        let chip = face::face_chip(img, detection).to_rgb8();
        let input = Value::from_array(face::bgr_tensor(&chip))?;

        let outputs = self.session.run(ort::inputs![input])?;
        let (shape, data) = outputs[0].try_extract_tensor::<f32>()?;
        let shape: Vec<i64> = shape.iter().copied().collect();

        face::embedding_from_output(&shape, data).context("reading SFace output")
    }
}
