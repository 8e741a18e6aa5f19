use anyhow::Result;
use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use ndarray::{Array1, Array4};

/// Side length of the aligned face crop fed to the recognizer.
pub const FACE_SIZE: u32 = 112;

/// One detected face in source image pixel coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub bbox: [f32; 4], // x, y, w, h
    pub score: f32,
    /// Five points (eyes, nose, mouth corners) as x1,y1,...,x5,y5 when the
    /// detector predicts them.
    pub landmarks: Option<[f32; 10]>,
}

impl Detection {
    pub fn from_bbox(bbox: [f32; 4], score: f32) -> Self {
        Self {
            bbox,
            score,
            landmarks: None,
        }
    }
}

/// Face embedding produced by the recognizer.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    pub vector: Array1<f32>,
}

impl Embedding {
    pub fn from_vec(values: Vec<f32>) -> Self {
        Self {
            vector: Array1::from_vec(values),
        }
    }

    pub fn len(&self) -> usize {
        self.vector.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vector.is_empty()
    }

    pub fn to_vec(&self) -> Vec<f32> {
        self.vector.to_vec()
    }

    /// Euclidean distance. Embeddings of different length are infinitely far apart.
    pub fn distance(&self, other: &Embedding) -> f32 {
        if self.len() != other.len() {
            return f32::INFINITY;
        }
        self.vector
            .iter()
            .zip(other.vector.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f32>()
            .sqrt()
    }

    /// Scale to unit length; zero vectors are left untouched.
    pub fn normalized(mut self) -> Self {
        let norm = self.vector.dot(&self.vector).sqrt();
        if norm > 0.0 {
            self.vector.mapv_inplace(|x| x / norm);
        }
        self
    }
}

/// Apply non-maximum suppression to remove overlapping detections
pub fn nms(detections: &[Detection], iou_threshold: f32) -> Vec<Detection> {
    let mut sorted = detections.to_vec();
    sorted.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut keep: Vec<Detection> = Vec::with_capacity(sorted.len());
    for candidate in sorted {
        if keep
            .iter()
            .all(|kept| compute_iou(&kept.bbox, &candidate.bbox) <= iou_threshold)
        {
            keep.push(candidate);
        }
    }
    keep
}

fn compute_iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = (a[0] + a[2]).min(b[0] + b[2]);
    let y2 = (a[1] + a[3]).min(b[1] + b[3]);

    if x2 <= x1 || y2 <= y1 {
        return 0.0;
    }

    let inter = (x2 - x1) * (y2 - y1);
    inter / (a[2] * a[3] + b[2] * b[3] - inter)
}

/// Produce the recognizer input for one detection: eye-aligned when landmarks
/// are available, otherwise a square crop around the box.
pub fn face_chip(img: &DynamicImage, detection: &Detection) -> DynamicImage {
    match detection.landmarks {
        Some(landmarks) => align_face(img, &landmarks, FACE_SIZE),
        None => crop_face(img, &detection.bbox, FACE_SIZE),
    }
}

/// Rotate, scale and translate so the eyes land on the ArcFace reference
/// positions of a 112x112 chip.
pub fn align_face(img: &DynamicImage, landmarks: &[f32; 10], size: u32) -> DynamicImage {
    const REF_LEFT_EYE: (f32, f32) = (38.2946, 51.6963);
    const REF_RIGHT_EYE: (f32, f32) = (73.5318, 51.5014);

    let unit = size as f32 / 112.0;
    let (lx, ly) = (landmarks[0], landmarks[1]);
    let (rx, ry) = (landmarks[2], landmarks[3]);

    let src_dx = rx - lx;
    let src_dy = ry - ly;
    let dst_dx = (REF_RIGHT_EYE.0 - REF_LEFT_EYE.0) * unit;
    let dst_dy = (REF_RIGHT_EYE.1 - REF_LEFT_EYE.1) * unit;

    let src_len = (src_dx * src_dx + src_dy * src_dy).sqrt().max(f32::EPSILON);
    let dst_len = (dst_dx * dst_dx + dst_dy * dst_dy).sqrt();
    let angle = dst_dy.atan2(dst_dx) - src_dy.atan2(src_dx);

    // Inverse mapping: destination pixel -> source pixel.
    let inv_scale = src_len / dst_len;
    let (sin, cos) = (-angle).sin_cos();
    let dst_cx = (REF_LEFT_EYE.0 + REF_RIGHT_EYE.0) / 2.0 * unit;
    let dst_cy = (REF_LEFT_EYE.1 + REF_RIGHT_EYE.1) / 2.0 * unit;
    let src_cx = (lx + rx) / 2.0;
    let src_cy = (ly + ry) / 2.0;

    let source = img.to_rgb8();
    RgbImage::from_fn(size, size, |x, y| {
        let px = (x as f32 - dst_cx) * inv_scale;
        let py = (y as f32 - dst_cy) * inv_scale;
        let sx = src_cx + px * cos - py * sin;
        let sy = src_cy + px * sin + py * cos;
        sample_bilinear(&source, sx, sy)
    })
    .into()
}

fn sample_bilinear(img: &RgbImage, x: f32, y: f32) -> Rgb<u8> {
    let (w, h) = img.dimensions();
    if x < 0.0 || y < 0.0 || x >= w as f32 || y >= h as f32 {
        return Rgb([0, 0, 0]);
    }
    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = img.get_pixel(x0, y0);
    let p10 = img.get_pixel(x1, y0);
    let p01 = img.get_pixel(x0, y1);
    let p11 = img.get_pixel(x1, y1);

    let mut out = [0u8; 3];
    for (c, value) in out.iter_mut().enumerate() {
        let top = p00[c] as f32 * (1.0 - fx) + p10[c] as f32 * fx;
        let bottom = p01[c] as f32 * (1.0 - fx) + p11[c] as f32 * fx;
        *value = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
    }
    Rgb(out)
}

/// Square crop centred on the box, clamped to the image, resized to `size`.
pub fn crop_face(img: &DynamicImage, bbox: &[f32; 4], size: u32) -> DynamicImage {
    let (img_w, img_h) = img.dimensions();
    let side = bbox[2].max(bbox[3]).max(1.0);
    let cx = bbox[0] + bbox[2] / 2.0;
    let cy = bbox[1] + bbox[3] / 2.0;

    let x0 = (cx - side / 2.0).clamp(0.0, img_w.saturating_sub(1) as f32) as u32;
    let y0 = (cy - side / 2.0).clamp(0.0, img_h.saturating_sub(1) as f32) as u32;
    let w = (side as u32).clamp(1, img_w - x0);
    let h = (side as u32).clamp(1, img_h - y0);

    img.crop_imm(x0, y0, w, h)
        .resize_exact(size, size, image::imageops::FilterType::Triangle)
}

/// Pack an RGB image into a [1, 3, H, W] tensor in BGR channel order with raw
/// 0..255 values, the layout both OpenCV zoo models expect.
pub fn bgr_tensor(img: &RgbImage) -> Array4<f32> {
    let (w, h) = img.dimensions();
    Array4::from_shape_fn((1, 3, h as usize, w as usize), |(_, c, y, x)| {
        img.get_pixel(x as u32, y as u32)[2 - c] as f32
    })
}

/// Check a tensor shape against the expected face embedding layout.
pub(crate) fn embedding_from_output(shape: &[i64], data: &[f32]) -> Result<Embedding> {
    let width = match shape {
        [1, n] => *n as usize,
        [n] => *n as usize,
        _ => anyhow::bail!("unexpected embedding shape {:?}", shape),
    };
    if data.len() < width {
        anyhow::bail!("embedding output has {} values, expected {}", data.len(), width);
    }
    Ok(Embedding::from_vec(data[..width].to_vec()).normalized())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iou() {
        let a = [10.0, 10.0, 20.0, 20.0];
        let b = [15.0, 15.0, 20.0, 20.0];
        let iou = compute_iou(&a, &b);
        assert!(iou > 0.0 && iou < 1.0);

        let c = [100.0, 100.0, 10.0, 10.0];
        assert_eq!(compute_iou(&a, &c), 0.0);
    }

    #[test]
    fn test_nms() {
        let detections = vec![
            Detection::from_bbox([10.0, 10.0, 20.0, 20.0], 0.9),
            Detection::from_bbox([12.0, 12.0, 20.0, 20.0], 0.8),
            Detection::from_bbox([100.0, 100.0, 20.0, 20.0], 0.85),
        ];

        let result = nms(&detections, 0.3);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].score, 0.9);
        assert_eq!(result[1].score, 0.85);
    }

    #[test]
    fn test_distance() {
        let a = Embedding::from_vec(vec![0.0, 3.0]);
        let b = Embedding::from_vec(vec![4.0, 0.0]);
        assert!((a.distance(&b) - 5.0).abs() < 1e-6);
        assert_eq!(a.distance(&a), 0.0);

        let short = Embedding::from_vec(vec![1.0]);
        assert!(a.distance(&short).is_infinite());
    }

    #[test]
    fn test_normalized() {
        let e = Embedding::from_vec(vec![3.0, 4.0]).normalized();
        assert!((e.vector[0] - 0.6).abs() < 1e-6);
        assert!((e.vector[1] - 0.8).abs() < 1e-6);

        let zero = Embedding::from_vec(vec![0.0, 0.0]).normalized();
        assert_eq!(zero.to_vec(), vec![0.0, 0.0]);
    }

    #[test]
    fn test_crop_face_clamps_to_image() {
        let img = DynamicImage::new_rgb8(40, 30);
        let chip = crop_face(&img, &[-10.0, 20.0, 50.0, 50.0], FACE_SIZE);
        assert_eq!(chip.dimensions(), (FACE_SIZE, FACE_SIZE));
    }

    #[test]
    fn test_align_face_keeps_eye_midpoint() {
        // White dot between the eyes should land at the reference eye centre.
        let mut img = RgbImage::new(200, 200);
        for y in 98..=102 {
            for x in 98..=102 {
                img.put_pixel(x, y, Rgb([255, 255, 255]));
            }
        }
        let landmarks = [80.0, 100.0, 120.0, 100.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        let chip = align_face(&DynamicImage::ImageRgb8(img), &landmarks, FACE_SIZE).to_rgb8();
        assert_eq!(chip.dimensions(), (FACE_SIZE, FACE_SIZE));
        assert_eq!(chip.get_pixel(56, 52)[0], 255);
        assert_eq!(chip.get_pixel(5, 5)[0], 0);
    }

    #[test]
    fn test_bgr_tensor_channel_order() {
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(1, 0, Rgb([10, 20, 30]));
        let t = bgr_tensor(&img);
        assert_eq!(t.shape(), &[1, 3, 1, 2]);
        assert_eq!(t[[0, 0, 0, 1]], 30.0);
        assert_eq!(t[[0, 1, 0, 1]], 20.0);
        assert_eq!(t[[0, 2, 0, 1]], 10.0);
    }

    #[test]
    fn test_embedding_from_output() {
        let e = embedding_from_output(&[1, 2], &[3.0, 4.0]).unwrap();
        assert_eq!(e.len(), 2);
        assert!(embedding_from_output(&[2, 2, 2], &[0.0; 8]).is_err());
    }
}
