//! YuNet output decoding.
//!
//! YuNet is anchor-free: every cell of the stride 8, 16 and 32 feature maps
//! predicts one candidate. Per stride the model emits four tensors, ordered
//! `cls_8, cls_16, cls_32, obj_8, .., bbox_8, .., kps_8, ..`:
//!
//! - cls, obj: `[1, H*W, 1]`, already passed through a sigmoid
//! - bbox: `[1, H*W, 4]` as (dx, dy, log w, log h) in stride units
//! - kps: `[1, H*W, 10]` as five (dx, dy) offsets in stride units

use anyhow::Result;
use ndarray::Array2;

use crate::face::Detection;

pub const STRIDES: [usize; 3] = [8, 16, 32];

/// Decoded tensors for one feature map.
#[derive(Debug, Clone)]
pub struct StrideOutput {
    pub stride: usize,
    pub cls: Array2<f32>,
    pub obj: Array2<f32>,
    pub bbox: Array2<f32>,
    pub kps: Array2<f32>,
}

impl StrideOutput {
    fn cells(&self) -> usize {
        self.cls.nrows()
    }

    /// Geometric mean of class and objectness scores, as OpenCV's FaceDetectorYN does.
    pub fn score(&self, idx: usize) -> f32 {
        let cls = self.cls[[idx, 0]].clamp(0.0, 1.0);
        let obj = self.obj[[idx, 0]].clamp(0.0, 1.0);
        (cls * obj).sqrt()
    }
}

/// Group the twelve raw output tensors by stride and check their shapes.
pub fn parse_outputs(outputs: &[(&[i64], &[f32])], input_size: usize) -> Result<Vec<StrideOutput>> {
    if outputs.len() < 4 * STRIDES.len() {
        anyhow::bail!(
            "YuNet produced {} outputs, expected {}",
            outputs.len(),
            4 * STRIDES.len()
        );
    }

    let tensor = |idx: usize, cells: usize, width: usize| -> Result<Array2<f32>> {
        let (shape, data) = outputs[idx];
        if shape != [1, cells as i64, width as i64] {
            anyhow::bail!(
                "unexpected shape {:?} for output {}, expected [1, {}, {}]",
                shape,
                idx,
                cells,
                width
            );
        }
        Ok(Array2::from_shape_vec((cells, width), data.to_vec())?)
    };

    STRIDES
        .iter()
        .enumerate()
        .map(|(level, &stride)| {
            let side = input_size / stride;
            let cells = side * side;
            let n = STRIDES.len();
            Ok(StrideOutput {
                stride,
                cls: tensor(level, cells, 1)?,
                obj: tensor(level + n, cells, 1)?,
                bbox: tensor(level + 2 * n, cells, 4)?,
                kps: tensor(level + 3 * n, cells, 10)?,
            })
        })
        .collect()
}

/// Turn per-cell predictions into detections in input-canvas pixels.
pub fn decode(levels: &[StrideOutput], score_threshold: f32, input_size: usize) -> Vec<Detection> {
    let mut detections = Vec::new();

    for level in levels {
        let side = input_size / level.stride;
        let stride = level.stride as f32;

        for idx in 0..level.cells() {
            let score = level.score(idx);
            if score < score_threshold {
                continue;
            }
            let col = (idx % side) as f32;
            let row = (idx / side) as f32;

            let cx = (col + level.bbox[[idx, 0]]) * stride;
            let cy = (row + level.bbox[[idx, 1]]) * stride;
            let w = level.bbox[[idx, 2]].exp() * stride;
            let h = level.bbox[[idx, 3]].exp() * stride;

            let mut landmarks = [0.0f32; 10];
            for k in 0..5 {
                landmarks[2 * k] = (col + level.kps[[idx, 2 * k]]) * stride;
                landmarks[2 * k + 1] = (row + level.kps[[idx, 2 * k + 1]]) * stride;
            }

            detections.push(Detection {
                bbox: [cx - w / 2.0, cy - h / 2.0, w, h],
                score,
                landmarks: Some(landmarks),
            });
        }
    }

    detections
}
