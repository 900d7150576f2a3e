/// YOLO face detector using ONNX Runtime via `ort`.
///
/// Frames are turned upright before letterboxing, so the returned boxes are
/// already in the orientation the user sees (mirroring aside).
use std::path::Path;

use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::face_box::FaceBox;
use crate::shared::frame::{Frame, Rotation};

/// Fallback YOLO model input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

/// NMS IoU threshold.
const NMS_IOU_THRESH: f64 = 0.45;

/// YOLO face detector backed by an ONNX Runtime session.
pub struct OnnxYoloDetector {
    session: ort::session::Session,
    confidence: f64,
    input_size: u32,
}

impl OnnxYoloDetector {
    /// Load a YOLO ONNX model and prepare for inference.
    ///
    /// The input resolution is read from the model's input shape (expecting NCHW).
    /// Falls back to 640 if the shape is dynamic or unreadable.
    pub fn new(model_path: &Path, confidence: f64) -> Result<Self, Box<dyn std::error::Error>> {
        let session = ort::session::Session::builder()?.commit_from_file(model_path)?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| match input.dtype() {
                ort::value::ValueType::Tensor { ref shape, .. }
                    if shape.len() >= 4 && shape[2] > 0 =>
                {
                    Some(shape[2] as u32)
                }
                _ => None,
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);

        log::info!("Loaded face model {} (input {input_size}px)", model_path.display());

        Ok(Self {
            session,
            confidence,
            input_size,
        })
    }

}

impl FaceDetector for OnnxYoloDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceBox>, Box<dyn std::error::Error>> {
        if frame.width() == 0 || frame.height() == 0 {
            log::debug!("Skipping empty frame {}", frame.index());
            return Ok(Vec::new());
        }
        let rotated;
        let frame = if frame.rotation() == Rotation::Deg0 {
            frame
        } else {
            rotated = frame.upright();
            &rotated
        };
        let (fw, fh) = (frame.width(), frame.height());

        let Some((input_tensor, scale, pad_x, pad_y)) = letterbox(frame, self.input_size) else {
            return Ok(Vec::new());
        };

        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("YOLO model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape();

        // [1, features, detections] or [1, detections, features]
        if shape.len() != 3 {
            return Err(format!("Unexpected YOLO output shape: {shape:?}").into());
        }
        let transposed = shape[1] < shape[2];
        let (num_dets, num_feats) = if transposed {
            (shape[2], shape[1])
        } else {
            (shape[1], shape[2])
        };
        if num_feats < 5 {
            return Ok(Vec::new());
        }

        let data = tensor.as_slice().ok_or("Cannot get tensor slice")?;
        let value = |det: usize, feat: usize| -> f64 {
            if transposed {
                data[feat * num_dets + det] as f64
            } else {
                data[det * num_feats + feat] as f64
            }
        };

        // Row format: [cx, cy, w, h, conf, landmarks...]
        let mut candidates = Vec::new();
        for i in 0..num_dets {
            let conf = value(i, 4);
            if conf < self.confidence {
                continue;
            }
            let (cx, cy, w, h) = (value(i, 0), value(i, 1), value(i, 2), value(i, 3));

            let unletterbox = |v: f64, pad: u32| (v - pad as f64) / scale;
            let face = FaceBox::new(
                unletterbox(cx - w / 2.0, pad_x),
                unletterbox(cy - h / 2.0, pad_y),
                unletterbox(cx + w / 2.0, pad_x),
                unletterbox(cy + h / 2.0, pad_y),
            );
            candidates.push(Candidate {
                face: face.clamp_to(fw, fh),
                confidence: conf,
            });
        }

        Ok(nms(&mut candidates, NMS_IOU_THRESH)
            .into_iter()
            .map(|c| c.face)
            .filter(|f| f.area() > 0.0)
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Letterbox-resize a frame to `target_size` × `target_size`.
///
/// Returns `(NCHW float32 tensor, scale, pad_x, pad_y)`, or `None` for a
/// frame with no pixels.
fn letterbox(frame: &Frame, target_size: u32) -> Option<(ndarray::Array4<f32>, f64, u32, u32)> {
    if frame.width() == 0 || frame.height() == 0 {
        return None;
    }
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = ((fw * scale).round() as u32).min(target_size);
    let new_h = ((fh * scale).round() as u32).min(target_size);
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    // 114/255 gray padding, YOLO convention
    let gray = 114.0f32 / 255.0;
    let mut tensor =
        ndarray::Array4::<f32>::from_elem((1, 3, target_size as usize, target_size as usize), gray);

    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;

    for y in 0..new_h as usize {
        let src_y = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f64 / scale) as usize).min(src_w - 1);
            let ty = pad_y as usize + y;
            let tx = pad_x as usize + x;
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    Some((tensor, scale, pad_x, pad_y))
}

// ---------------------------------------------------------------------------
// NMS
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
struct Candidate {
    face: FaceBox,
    confidence: f64,
}

/// Greedy NMS: sort by confidence descending, suppress overlapping boxes.
fn nms(candidates: &mut [Candidate], iou_thresh: f64) -> Vec<Candidate> {
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<Candidate> = Vec::new();
    for candidate in candidates.iter() {
        if keep
            .iter()
            .all(|kept| kept.face.iou(&candidate.face) <= iou_thresh)
        {
            keep.push(candidate.clone());
        }
    }
    keep
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::constants::DETECTION_CONFIDENCE;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn candidate(left: f64, top: f64, size: f64, confidence: f64) -> Candidate {
        Candidate {
            face: FaceBox::new(left, top, left + size, top + size),
            confidence,
        }
    }

    // ── letterbox ──

    #[test]
    fn test_letterbox_preserves_aspect_ratio() {
        // scale = min(640/200, 640/100) = 3.2 → 640x320, pad_y = 160
        let frame = Frame::new(vec![128u8; 200 * 100 * 3], 200, 100, 3, 0);
        let (tensor, scale, pad_x, pad_y) = letterbox(&frame, 640).unwrap();

        assert_eq!(tensor.shape(), &[1, 3, 640, 640]);
        assert_relative_eq!(scale, 3.2, epsilon = 0.01);
        assert_eq!(pad_x, 0);
        assert_eq!(pad_y, 160);
    }

    #[test]
    fn test_letterbox_portrait_pads_horizontally() {
        let frame = Frame::new(vec![128u8; 90 * 160 * 3], 90, 160, 3, 0);
        let (_, scale, pad_x, pad_y) = letterbox(&frame, 640).unwrap();

        assert_relative_eq!(scale, 4.0, epsilon = 0.01);
        assert_eq!(pad_x, 140);
        assert_eq!(pad_y, 0);
    }

    #[test]
    fn test_letterbox_upright_frame_of_rotated_buffer() {
        // A 160x90 landscape buffer rotated 90° is letterboxed as 90x160.
        let frame = Frame::new(vec![128u8; 160 * 90 * 3], 160, 90, 3, 0)
            .with_orientation(Rotation::Deg90, false);
        let (_, _, pad_x, pad_y) = letterbox(&frame.upright(), 640).unwrap();

        assert_eq!(pad_x, 140);
        assert_eq!(pad_y, 0);
    }

    #[test]
    fn test_letterbox_values_normalized() {
        let frame = Frame::new(vec![255u8; 100 * 50 * 3], 100, 50, 3, 0);
        let (tensor, _, pad_x, pad_y) = letterbox(&frame, 640).unwrap();

        let y = pad_y as usize + 1;
        let x = pad_x as usize + 1;
        assert_relative_eq!(tensor[[0, 0, y, x]], 1.0, epsilon = 0.01);
        assert_relative_eq!(tensor[[0, 0, 0, 0]], 114.0 / 255.0, epsilon = 0.01);
    }

    #[rstest]
    #[case::zero_width(0, 480)]
    #[case::zero_height(640, 0)]
    #[case::zero_both(0, 0)]
    fn test_letterbox_empty_frame_is_skipped(#[case] width: u32, #[case] height: u32) {
        let frame = Frame::new(Vec::new(), width, height, 3, 0);
        assert!(letterbox(&frame, 640).is_none());
    }

    #[test]
    fn test_letterbox_extreme_aspect_ratio() {
        let frame = Frame::new(vec![10u8; 4000 * 3], 4000, 1, 3, 0);
        let (tensor, _, pad_x, _) = letterbox(&frame, 640).unwrap();
        assert_eq!(tensor.shape(), &[1, 3, 640, 640]);
        assert_eq!(pad_x, 0);
    }

    // ── nms ──

    #[test]
    fn test_nms_suppresses_overlapping() {
        let mut candidates = vec![
            candidate(0.0, 0.0, 100.0, 0.9),
            candidate(5.0, 5.0, 100.0, 0.8),
        ];
        let kept = nms(&mut candidates, 0.3);
        assert_eq!(kept.len(), 1);
        assert_relative_eq!(kept[0].confidence, 0.9);
    }

    #[test]
    fn test_nms_keeps_non_overlapping() {
        let mut candidates = vec![
            candidate(0.0, 0.0, 50.0, 0.9),
            candidate(200.0, 200.0, 50.0, 0.8),
        ];
        assert_eq!(nms(&mut candidates, 0.3).len(), 2);
    }

    #[test]
    fn test_nms_confidence_ordering() {
        let mut candidates = vec![
            candidate(0.0, 0.0, 100.0, 0.5),
            candidate(2.0, 2.0, 100.0, 0.9),
        ];
        let kept = nms(&mut candidates, 0.3);
        assert_eq!(kept.len(), 1);
        assert_relative_eq!(kept[0].confidence, 0.9);
    }

    #[test]
    fn test_nms_empty_input() {
        let mut candidates: Vec<Candidate> = Vec::new();
        assert!(nms(&mut candidates, 0.3).is_empty());
    }

    #[test]
    fn test_new_missing_model_is_error() {
        assert!(OnnxYoloDetector::new(Path::new("/nonexistent/model.onnx"), DETECTION_CONFIDENCE).is_err());
    }
}
