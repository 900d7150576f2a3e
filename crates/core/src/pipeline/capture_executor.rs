use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::camera::domain::frame_source::FrameSource;
use crate::capture::domain::capture_naming::CaptureNaming;
use crate::capture::domain::image_sink::ImageSink;
use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::settings::CaptureSettings;
use crate::status::domain::status_sink::StatusSink;

use super::pipeline_logger::PipelineLogger;

/// Configuration for one capture session.
pub struct ExecutorConfig {
    pub settings: CaptureSettings,
    pub naming: CaptureNaming,
    pub cancelled: Arc<AtomicBool>,
    pub logger: Box<dyn PipelineLogger>,
}

/// What happened during a session.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionReport {
    pub frames_analyzed: usize,
    /// Frames replaced in the queue by a newer one before detection.
    pub frames_evicted: usize,
    pub detection_failures: usize,
    pub captures_saved: usize,
    pub captures_failed: usize,
    pub captures: Vec<PathBuf>,
}

/// Abstracts how the source → detect → decide → capture session runs.
///
/// This is a port. The source is handed over already opened; the executor
/// closes it when the session ends.
pub trait CaptureExecutor: Send {
    fn execute(
        &self,
        source: Box<dyn FrameSource>,
        detector: Box<dyn FaceDetector>,
        sink: Box<dyn ImageSink>,
        status: Box<dyn StatusSink>,
        config: ExecutorConfig,
    ) -> Result<SessionReport, Box<dyn std::error::Error>>;
}
