use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{select, Receiver, Sender};

use crate::camera::domain::frame_source::FrameSource;
use crate::capture::domain::capture_controller::CaptureState;
use crate::capture::domain::capture_naming::CaptureNaming;
use crate::capture::domain::image_sink::{CaptureError, ImageSink};
use crate::detection::domain::face_detector::FaceDetector;
use crate::pipeline::capture_executor::{CaptureExecutor, ExecutorConfig, SessionReport};
use crate::pipeline::frame_analyzer::FrameAnalyzer;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::shared::face_box::FaceBox;
use crate::shared::frame_lease::FrameLease;
use crate::status::domain::status_sink::{Status, StatusSink};

use super::latest_frame_queue::{latest_only, LatestSender};

/// How often the decision loop re-checks cancellation while idle.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

type SendError = Box<dyn std::error::Error + Send + Sync>;
type CaptureOutcome = Result<PathBuf, CaptureError>;

/// A frame that went through the detector.
struct Detected {
    lease: FrameLease,
    faces: Result<Vec<FaceBox>, SendError>,
    detect_ms: f64,
}

/// Stops the worker threads on user cancellation or once the decision loop
/// has returned.
#[derive(Clone)]
struct Shutdown {
    cancelled: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
}

impl Shutdown {
    fn requested(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed) || self.finished.load(Ordering::Relaxed)
    }
}

/// Runs a capture session on dedicated threads.
///
/// Layout: `source → [latest] → detect → decide (caller's thread) → capture`
///
/// The source never waits for the detector: a frame still queued when the
/// next one arrives is released and replaced. All decisions happen on the
/// calling thread, which multiplexes detection results and capture
/// completions.
pub struct ThreadedCaptureExecutor {
    poll_interval: Duration,
}

impl ThreadedCaptureExecutor {
    pub fn new() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl Default for ThreadedCaptureExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureExecutor for ThreadedCaptureExecutor {
    fn execute(
        &self,
        source: Box<dyn FrameSource>,
        detector: Box<dyn FaceDetector>,
        sink: Box<dyn ImageSink>,
        status: Box<dyn StatusSink>,
        config: ExecutorConfig,
    ) -> Result<SessionReport, Box<dyn std::error::Error>> {
        let ExecutorConfig {
            settings,
            naming,
            cancelled,
            mut logger,
        } = config;

        let shutdown = Shutdown {
            cancelled: cancelled.clone(),
            finished: Arc::new(AtomicBool::new(false)),
        };
        let evicted = Arc::new(AtomicUsize::new(0));

        let (frame_tx, frame_rx) = latest_only::<FrameLease>();
        let (detected_tx, detected_rx) = crossbeam_channel::bounded::<Detected>(1);
        let (capture_tx, capture_rx) = crossbeam_channel::bounded::<FrameLease>(1);
        let (done_tx, done_rx) = crossbeam_channel::unbounded::<CaptureOutcome>();

        let source_handle = spawn_source(source, frame_tx, shutdown.clone(), evicted.clone());
        let detect_handle = spawn_detector(detector, frame_rx, detected_tx, shutdown.clone());
        let capture_handle = spawn_capture(sink, naming, capture_rx, done_tx);

        logger.info("Session started");
        let mut session = DecisionLoop {
            analyzer: FrameAnalyzer::new(&settings),
            status,
            logger: &mut *logger,
            capture_tx,
            cancelled: &cancelled,
            evicted: &evicted,
            report: SessionReport::default(),
        };
        session.run(detected_rx, &done_rx, self.poll_interval);
        let mut report = session.finish();

        shutdown.finished.store(true, Ordering::Relaxed);
        drop(done_rx);

        let result = join_threads(source_handle, detect_handle, capture_handle);
        report.frames_evicted = evicted.load(Ordering::Relaxed);

        logger.info(&format!(
            "Session ended: {} frames analyzed, {} saved, {} failed",
            report.frames_analyzed, report.captures_saved, report.captures_failed
        ));
        logger.summary();

        result.map(|()| report)
    }
}

fn spawn_source(
    mut source: Box<dyn FrameSource>,
    frame_tx: LatestSender<FrameLease>,
    shutdown: Shutdown,
    evicted: Arc<AtomicUsize>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        while !shutdown.requested() {
            let lease = match source.next_frame() {
                Some(Ok(lease)) => lease,
                Some(Err(e)) => {
                    log::error!("Camera stopped delivering frames: {e}");
                    break;
                }
                None => break,
            };
            match frame_tx.send(lease) {
                Ok(n) => {
                    evicted.fetch_add(n, Ordering::Relaxed);
                }
                Err(_) => break,
            }
        }
        source.close();
    })
}

fn spawn_detector(
    mut detector: Box<dyn FaceDetector>,
    frame_rx: Receiver<FrameLease>,
    detected_tx: Sender<Detected>,
    shutdown: Shutdown,
) -> JoinHandle<Box<dyn FaceDetector>> {
    std::thread::spawn(move || {
        for lease in frame_rx {
            if shutdown.requested() {
                break;
            }

            let started = Instant::now();
            let faces = detector
                .detect(&lease)
                .map_err(|e| -> SendError { e.to_string().into() });
            let detect_ms = started.elapsed().as_secs_f64() * 1000.0;

            let detected = Detected {
                lease,
                faces,
                detect_ms,
            };
            if detected_tx.send(detected).is_err() {
                break;
            }
        }
        detector
    })
}

fn spawn_capture(
    sink: Box<dyn ImageSink>,
    naming: CaptureNaming,
    capture_rx: Receiver<FrameLease>,
    done_tx: Sender<CaptureOutcome>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        for lease in capture_rx {
            let path = naming.next_path();
            let outcome = sink.save(&lease, &path).map(|()| path);
            drop(lease);
            if done_tx.send(outcome).is_err() {
                break;
            }
        }
    })
}

/// The single analysis context: owns the analyzer and publishes statuses.
struct DecisionLoop<'a> {
    analyzer: FrameAnalyzer,
    status: Box<dyn StatusSink>,
    logger: &'a mut dyn PipelineLogger,
    capture_tx: Sender<FrameLease>,
    cancelled: &'a AtomicBool,
    evicted: &'a AtomicUsize,
    report: SessionReport,
}

impl DecisionLoop<'_> {
    fn run(
        &mut self,
        detected_rx: Receiver<Detected>,
        done_rx: &Receiver<CaptureOutcome>,
        poll_interval: Duration,
    ) {
        let mut source_ended = false;
        while !source_ended && !self.is_cancelled() {
            select! {
                recv(detected_rx) -> msg => match msg {
                    Ok(detected) => self.on_detected(detected),
                    Err(_) => source_ended = true,
                },
                recv(done_rx) -> msg => {
                    if let Ok(outcome) = msg {
                        self.on_capture_done(outcome);
                    }
                },
                default(poll_interval) => {}
            }
        }

        if !source_ended {
            return;
        }
        // Let a capture that is already running land before shutting down.
        while self.analyzer.capture_state() == CaptureState::InFlight && !self.is_cancelled() {
            match done_rx.recv_timeout(poll_interval) {
                Ok(outcome) => self.on_capture_done(outcome),
                Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
                Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
            }
        }
    }

    fn finish(self) -> SessionReport {
        self.report
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    fn publish(&self, status: Status) {
        if !self.is_cancelled() {
            self.status.publish(status);
        }
    }

    fn on_detected(&mut self, detected: Detected) {
        let Detected {
            lease,
            faces,
            detect_ms,
        } = detected;

        self.report.frames_analyzed += 1;
        self.logger.frame(lease.index());
        self.logger.timing("detect", detect_ms);
        self.logger
            .metric("dropped_frames", self.evicted.load(Ordering::Relaxed) as f64);

        let faces = match faces {
            Ok(faces) => faces,
            Err(e) => {
                self.report.detection_failures += 1;
                self.analyzer.detection_failed(lease.index(), &*e);
                return;
            }
        };
        self.logger.metric("faces", faces.len() as f64);

        let decision = self.analyzer.analyze(&lease, &faces, Instant::now());
        for status in &decision.statuses {
            self.publish(*status);
        }

        if decision.start_capture {
            log::info!("Face centered on frame {}, capturing", lease.index());
            if self.capture_tx.send(lease).is_err() {
                self.on_capture_done(Err(CaptureError::WorkerStopped));
            }
        }
    }

    fn on_capture_done(&mut self, outcome: CaptureOutcome) {
        let Some(status) = self.analyzer.capture_finished(&outcome) else {
            return;
        };
        match outcome {
            Ok(path) => {
                self.report.captures_saved += 1;
                self.report.captures.push(path);
            }
            Err(_) => self.report.captures_failed += 1,
        }
        self.publish(status);
    }
}

/// Joins all session threads and reports the first panic encountered.
fn join_threads(
    source_handle: JoinHandle<()>,
    detect_handle: JoinHandle<Box<dyn FaceDetector>>,
    capture_handle: JoinHandle<()>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut first_error: Option<Box<dyn std::error::Error>> = None;
    let mut set_if_none = |err: &str| {
        if first_error.is_none() {
            first_error = Some(err.into());
        }
    };

    if source_handle.join().is_err() {
        set_if_none("Source thread panicked");
    }
    if detect_handle.join().is_err() {
        set_if_none("Detect thread panicked");
    }
    if capture_handle.join().is_err() {
        set_if_none("Capture thread panicked");
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
