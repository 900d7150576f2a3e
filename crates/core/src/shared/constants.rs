use std::time::Duration;

pub const YOLO_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
pub const YOLO_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx";

/// Maximum distance of the face center from 0.5 that still counts as centered.
pub const CENTER_TOLERANCE: f64 = 0.06;

pub const CAPTURE_COOLDOWN: Duration = Duration::from_millis(2000);
pub const UI_DEBOUNCE: Duration = Duration::from_millis(150);
pub const LOG_THROTTLE: Duration = Duration::from_millis(500);

/// Minimum detection score for a face box.
pub const DETECTION_CONFIDENCE: f64 = 0.5;

pub const JPEG_QUALITY: u8 = 92;

/// Frames the camera may have leased out before it starts dropping new ones:
/// one queued, one being detected, one being decided on, one spare.
pub const FRAME_BUFFER_COUNT: usize = 4;

/// Folder name used for captures and settings.
pub const APP_DIR_NAME: &str = "AutoCenterFaceShot";
pub const CAPTURE_FILE_PREFIX: &str = "IMG_";
pub const CAPTURE_FILE_EXTENSION: &str = "jpg";
