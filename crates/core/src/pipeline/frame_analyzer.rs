use std::path::PathBuf;
use std::time::Instant;

use crate::capture::domain::capture_controller::{CaptureController, CaptureState};
use crate::capture::domain::image_sink::CaptureError;
use crate::centering::domain::centering_classifier::{Classification, CenteringClassifier};
use crate::centering::domain::position_normalizer::{normalize_in_frame, NormalizedPosition};
use crate::shared::face_box::FaceBox;
use crate::shared::frame::Frame;
use crate::shared::rate_limiter::RateLimiter;
use crate::shared::settings::CaptureSettings;
use crate::status::domain::status_sink::Status;

/// Effects of analyzing one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameDecision {
    pub classification: Classification,
    pub position: Option<NormalizedPosition>,
    /// Statuses to publish, in order.
    pub statuses: Vec<Status>,
    /// The frame must be handed to the image sink.
    pub start_capture: bool,
}

/// Per-frame decision logic: largest face → position → classification →
/// capture gate, with the UI debounce and log throttle applied.
///
/// Owns every limiter and the capture controller, so it must live on a
/// single thread. It performs no I/O beyond logging; callers carry out the
/// returned effects.
#[derive(Debug)]
pub struct FrameAnalyzer {
    classifier: CenteringClassifier,
    ui_debounce: RateLimiter,
    log_throttle: RateLimiter,
    controller: CaptureController,
}

impl FrameAnalyzer {
    pub fn new(settings: &CaptureSettings) -> Self {
        Self {
            classifier: CenteringClassifier::new(settings.center_tolerance),
            ui_debounce: RateLimiter::new(settings.ui_debounce()),
            log_throttle: RateLimiter::new(settings.log_throttle()),
            controller: CaptureController::new(settings.capture_cooldown()),
        }
    }

    /// Decides what a successfully detected frame should produce.
    pub fn analyze(&mut self, frame: &Frame, faces: &[FaceBox], now: Instant) -> FrameDecision {
        if self.log_throttle.try_fire(now) {
            log::debug!("Faces detected: {}", faces.len());
        }

        let position = FaceBox::largest(faces).map(|face| normalize_in_frame(face, frame));
        let classification = self.classifier.classify(position);

        let mut statuses = Vec::new();
        if self.ui_debounce.try_fire(now) {
            statuses.push(guidance(classification));
        }

        let start_capture = self.controller.request(classification, now);
        if start_capture {
            statuses.push(Status::Capturing);
        }

        FrameDecision {
            classification,
            position,
            statuses,
            start_capture,
        }
    }

    /// A detector failure changes nothing but the log.
    pub fn detection_failed(&self, frame_index: usize, error: &dyn std::error::Error) {
        log::warn!("Face detection failed on frame {frame_index}: {error}");
    }

    /// Applies a capture completion; returns the status to publish, if any.
    pub fn capture_finished(&mut self, outcome: &Result<PathBuf, CaptureError>) -> Option<Status> {
        self.controller.finish(outcome)
    }

    pub fn capture_state(&self) -> CaptureState {
        self.controller.state()
    }
}

fn guidance(classification: Classification) -> Status {
    match classification {
        Classification::NoFace => Status::AlignFace,
        Classification::Centered => Status::Centered,
        Classification::MoveLeft => Status::MoveLeft,
        Classification::MoveRight => Status::MoveRight,
    }
}
