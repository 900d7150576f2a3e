use crate::shared::face_box::FaceBox;
use crate::shared::frame::Frame;

/// Domain interface for face detection.
///
/// Boxes are returned in the frame's upright coordinate space, i.e. after
/// applying [`Frame::rotation`]. Implementations may hold inference state,
/// hence `&mut self`.
pub trait FaceDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceBox>, Box<dyn std::error::Error>>;
}
