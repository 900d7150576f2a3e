use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use thiserror::Error;

use crate::camera::domain::frame_source::FrameSource;
use crate::camera::domain::permission_gate::PermissionGate;
use crate::capture::domain::capture_naming::CaptureNaming;
use crate::capture::domain::image_sink::ImageSink;
use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::settings::CaptureSettings;
use crate::status::domain::status_sink::StatusSink;

use super::capture_executor::{CaptureExecutor, ExecutorConfig, SessionReport};
use super::pipeline_logger::{NullPipelineLogger, PipelineLogger};

/// Reasons a session never got going. Both leave the use case ready for
/// another attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StartupError {
    #[error("Camera permission is required")]
    PermissionDenied,
    #[error("Failed to start camera: {0}")]
    CameraBind(String),
}

/// Orchestrates an auto-capture session.
///
/// Checks camera permission, binds the frame source, then hands everything
/// to a `CaptureExecutor`. A denied permission or a failed bind keeps the
/// components in place so `execute` can be called again; once a session has
/// actually run the components are consumed.
pub struct AutoCaptureUseCase {
    source: Option<Box<dyn FrameSource>>,
    detector: Option<Box<dyn FaceDetector>>,
    sink: Option<Box<dyn ImageSink>>,
    status: Option<Box<dyn StatusSink>>,
    logger: Option<Box<dyn PipelineLogger>>,
    permission: Box<dyn PermissionGate>,
    executor: Box<dyn CaptureExecutor>,
    settings: CaptureSettings,
    cancelled: Arc<AtomicBool>,
}

impl AutoCaptureUseCase {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source: Box<dyn FrameSource>,
        detector: Box<dyn FaceDetector>,
        sink: Box<dyn ImageSink>,
        status: Box<dyn StatusSink>,
        permission: Box<dyn PermissionGate>,
        executor: Box<dyn CaptureExecutor>,
        settings: CaptureSettings,
        cancelled: Option<Arc<AtomicBool>>,
    ) -> Self {
        Self {
            source: Some(source),
            detector: Some(detector),
            sink: Some(sink),
            status: Some(status),
            logger: None,
            permission,
            executor,
            settings,
            cancelled: cancelled.unwrap_or_else(|| Arc::new(AtomicBool::new(false))),
        }
    }

    pub fn with_logger(mut self, logger: Box<dyn PipelineLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Runs one session until the source ends or the session is cancelled.
    ///
    /// Fails with [`StartupError`] before anything starts when permission is
    /// missing or the camera cannot be opened.
    pub fn execute(&mut self) -> Result<SessionReport, Box<dyn std::error::Error>> {
        if !self.permission.is_granted() {
            log::warn!("Camera permission not granted");
            return Err(StartupError::PermissionDenied.into());
        }

        let source = self.source.as_mut().ok_or("Session already ran")?;
        let info = source.open().map_err(|e| {
            log::error!("Camera bind failed: {e}");
            StartupError::CameraBind(e.to_string())
        })?;
        log::info!(
            "Camera started: {} {}x{} @ {:.1} fps, rotation {}°{}",
            info.description,
            info.width,
            info.height,
            info.fps,
            info.rotation.degrees(),
            if info.mirrored { ", mirrored" } else { "" }
        );

        let naming = CaptureNaming::new(
            self.settings.resolved_output_dir(),
            self.settings.file_prefix.clone(),
        );
        log::info!("Saving captures to {}", naming.dir().display());

        let config = ExecutorConfig {
            settings: self.settings.clone(),
            naming,
            cancelled: self.cancelled.clone(),
            logger: self
                .logger
                .take()
                .unwrap_or_else(|| Box::new(NullPipelineLogger)),
        };

        self.executor.execute(
            self.source.take().ok_or("Session already ran")?,
            self.detector.take().ok_or("Session already ran")?,
            self.sink.take().ok_or("Session already ran")?,
            self.status.take().ok_or("Session already ran")?,
            config,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::domain::frame_source::SourceInfo;
    use crate::capture::domain::image_sink::CaptureError;
    use crate::pipeline::infrastructure::threaded_capture_executor::ThreadedCaptureExecutor;
    use crate::shared::face_box::FaceBox;
    use crate::shared::frame::{Frame, Rotation};
    use crate::shared::frame_lease::FrameLease;
    use crate::status::domain::status_sink::Status;
    use crate::status::infrastructure::channel_status_sink::ChannelStatusSink;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    // ── Stubs ──

    struct StubSource {
        frames: usize,
        fail_open: Arc<AtomicBool>,
        opened: Arc<AtomicUsize>,
    }

    impl StubSource {
        fn new(frames: usize) -> Self {
            Self {
                frames,
                fail_open: Arc::new(AtomicBool::new(false)),
                opened: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl FrameSource for StubSource {
        fn open(&mut self) -> Result<SourceInfo, Box<dyn std::error::Error>> {
            if self.fail_open.load(Ordering::SeqCst) {
                return Err("device busy".into());
            }
            self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(SourceInfo {
                width: 100,
                height: 100,
                fps: 30.0,
                rotation: Rotation::Deg0,
                mirrored: true,
                description: "stub".into(),
            })
        }

        fn next_frame(&mut self) -> Option<Result<FrameLease, Box<dyn std::error::Error>>> {
            if self.frames == 0 {
                return None;
            }
            self.frames -= 1;
            let frame = Frame::new(vec![0u8; 100 * 100 * 3], 100, 100, 3, 0);
            Some(Ok(FrameLease::detached(frame.with_orientation(Rotation::Deg0, true))))
        }

        fn close(&mut self) {}
    }

    struct StubDetector;

    impl FaceDetector for StubDetector {
        fn detect(&mut self, _frame: &Frame) -> Result<Vec<FaceBox>, Box<dyn std::error::Error>> {
            Ok(vec![FaceBox::new(40.0, 40.0, 60.0, 60.0)])
        }
    }

    struct StubSink {
        saved: Arc<Mutex<Vec<PathBuf>>>,
    }

    impl ImageSink for StubSink {
        fn save(&self, _frame: &Frame, path: &Path) -> Result<(), CaptureError> {
            self.saved.lock().unwrap().push(path.to_path_buf());
            Ok(())
        }
    }

    struct StubGate {
        granted: Arc<AtomicBool>,
    }

    impl PermissionGate for StubGate {
        fn is_granted(&self) -> bool {
            self.granted.load(Ordering::SeqCst)
        }
    }

    struct Harness {
        use_case: AutoCaptureUseCase,
        granted: Arc<AtomicBool>,
        fail_open: Arc<AtomicBool>,
        opened: Arc<AtomicUsize>,
        saved: Arc<Mutex<Vec<PathBuf>>>,
        statuses: crossbeam_channel::Receiver<Status>,
        dir: tempfile::TempDir,
    }

    fn harness(granted: bool) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let source = StubSource::new(3);
        let fail_open = source.fail_open.clone();
        let opened = source.opened.clone();
        let saved = Arc::new(Mutex::new(Vec::new()));
        let granted = Arc::new(AtomicBool::new(granted));
        let (status, statuses) = ChannelStatusSink::new();
        let settings = CaptureSettings {
            output_dir: Some(dir.path().to_path_buf()),
            ..CaptureSettings::default()
        };

        let use_case = AutoCaptureUseCase::new(
            Box::new(source),
            Box::new(StubDetector),
            Box::new(StubSink {
                saved: saved.clone(),
            }),
            Box::new(status),
            Box::new(StubGate {
                granted: granted.clone(),
            }),
            Box::new(ThreadedCaptureExecutor::new()),
            settings,
            None,
        );

        Harness {
            use_case,
            granted,
            fail_open,
            opened,
            saved,
            statuses,
            dir,
        }
    }

    fn startup_error<'a>(err: &'a (dyn std::error::Error + 'static)) -> Option<&'a StartupError> {
        err.downcast_ref::<StartupError>()
    }

    #[test]
    fn test_runs_session_and_captures() {
        let mut h = harness(true);
        let report = h.use_case.execute().unwrap();

        assert_eq!(report.captures_saved, 1);
        assert_eq!(h.saved.lock().unwrap().len(), 1);
        assert!(h.saved.lock().unwrap()[0].starts_with(h.dir.path()));

        let statuses: Vec<Status> = h.statuses.try_iter().collect();
        assert!(statuses.contains(&Status::Capturing));
        assert_eq!(statuses.last(), Some(&Status::Saved));
    }

    #[test]
    fn test_permission_denied_never_opens_source() {
        let mut h = harness(false);
        let err = h.use_case.execute().unwrap_err();

        assert_eq!(startup_error(err.as_ref()), Some(&StartupError::PermissionDenied));
        assert_eq!(err.to_string(), "Camera permission is required");
        assert_eq!(h.opened.load(Ordering::SeqCst), 0);
        assert!(h.statuses.try_iter().next().is_none());
    }

    #[test]
    fn test_retry_after_permission_granted() {
        let mut h = harness(false);
        assert!(h.use_case.execute().is_err());

        h.granted.store(true, Ordering::SeqCst);
        let report = h.use_case.execute().unwrap();
        assert_eq!(h.opened.load(Ordering::SeqCst), 1);
        assert_eq!(report.captures_saved, 1);
    }

    #[test]
    fn test_camera_bind_failure_is_reported_and_retryable() {
        let mut h = harness(true);
        h.fail_open.store(true, Ordering::SeqCst);

        let err = h.use_case.execute().unwrap_err();
        assert_eq!(
            startup_error(err.as_ref()),
            Some(&StartupError::CameraBind("device busy".into()))
        );
        assert_eq!(err.to_string(), "Failed to start camera: device busy");

        h.fail_open.store(false, Ordering::SeqCst);
        assert!(h.use_case.execute().is_ok());
    }

    #[test]
    fn test_second_execute_after_session_fails() {
        let mut h = harness(true);
        h.use_case.execute().unwrap();

        let err = h.use_case.execute().unwrap_err();
        assert!(startup_error(err.as_ref()).is_none());
        assert!(err.to_string().contains("already ran"));
    }

    #[test]
    fn test_cancelled_before_start_publishes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (status, statuses) = ChannelStatusSink::new();
        let cancelled = Arc::new(AtomicBool::new(true));
        let mut use_case = AutoCaptureUseCase::new(
            Box::new(StubSource::new(3)),
            Box::new(StubDetector),
            Box::new(StubSink {
                saved: Arc::new(Mutex::new(Vec::new())),
            }),
            Box::new(status),
            Box::new(StubGate {
                granted: Arc::new(AtomicBool::new(true)),
            }),
            Box::new(ThreadedCaptureExecutor::new()),
            CaptureSettings {
                output_dir: Some(dir.path().to_path_buf()),
                ..CaptureSettings::default()
            },
            Some(cancelled),
        );

        let report = use_case.execute().unwrap();
        assert_eq!(report.frames_analyzed, 0);
        assert!(statuses.try_iter().next().is_none());
    }
}
