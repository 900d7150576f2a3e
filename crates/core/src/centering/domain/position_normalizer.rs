use crate::shared::face_box::FaceBox;
use crate::shared::frame::{Frame, Rotation};

/// Horizontal face-center position in the user-perceived view, in `[0, 1]`.
pub type NormalizedPosition = f64;

/// Maps a face box to its horizontal position as the user sees it.
///
/// Boxes are reported in upright coordinates, so for 90/270 degree sensors
/// the horizontal extent is the buffer height. A mirrored (front-facing)
/// preview flips the result. A zero-width frame or a box with a non-finite
/// center maps to the center.
pub fn normalize(
    face: &FaceBox,
    width: u32,
    height: u32,
    rotation: Rotation,
    mirrored: bool,
) -> NormalizedPosition {
    let effective_width = if rotation.swaps_axes() { height } else { width };
    if effective_width == 0 || !face.center_x().is_finite() {
        return 0.5;
    }

    let raw = (face.center_x() / effective_width as f64).clamp(0.0, 1.0);
    if mirrored {
        1.0 - raw
    } else {
        raw
    }
}

/// [`normalize`] using the frame's own dimensions and orientation.
pub fn normalize_in_frame(face: &FaceBox, frame: &Frame) -> NormalizedPosition {
    normalize(
        face,
        frame.width(),
        frame.height(),
        frame.rotation(),
        frame.mirrored(),
    )
}
