use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use clap::Parser;
use crossbeam_channel::Receiver;

use autocenter_core::camera::infrastructure::device_permission_gate::DevicePermissionGate;
use autocenter_core::camera::infrastructure::ffmpeg_frame_source::FfmpegFrameSource;
use autocenter_core::capture::infrastructure::jpeg_file_sink::JpegFileSink;
use autocenter_core::detection::domain::face_detector::FaceDetector;
use autocenter_core::detection::infrastructure::model_resolver;
use autocenter_core::detection::infrastructure::onnx_yolo_detector::OnnxYoloDetector;
use autocenter_core::pipeline::auto_capture_use_case::AutoCaptureUseCase;
use autocenter_core::pipeline::infrastructure::threaded_capture_executor::ThreadedCaptureExecutor;
use autocenter_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use autocenter_core::shared::constants::{DETECTION_CONFIDENCE, YOLO_MODEL_NAME, YOLO_MODEL_URL};
use autocenter_core::shared::frame::Rotation;
use autocenter_core::shared::settings::CaptureSettings;
use autocenter_core::status::domain::status_sink::Status;
use autocenter_core::status::infrastructure::channel_status_sink::ChannelStatusSink;

/// Hands-free selfie capture: guides the face to the center of the frame
/// and saves a photo when it gets there.
#[derive(Parser)]
#[command(name = "autocenter")]
struct Cli {
    /// Camera device or video file used as the camera feed.
    input: PathBuf,

    /// Capture folder (default: <Pictures>/AutoCenterFaceShot).
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Settings file (default: <config dir>/AutoCenterFaceShot/settings.json).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long, default_value_t = DETECTION_CONFIDENCE)]
    confidence: f64,

    /// Sensor rotation in degrees (0, 90, 180, 270). Overrides stream metadata.
    #[arg(long, allow_negative_numbers = true)]
    rotation: Option<i32>,

    /// Treat the feed as a rear camera (no mirrored preview).
    #[arg(long)]
    no_mirror: bool,

    /// Pace a video file at its native frame rate, like a live camera.
    #[arg(long)]
    realtime: bool,

    /// Stop after this many saved captures.
    #[arg(long)]
    max_captures: Option<usize>,

    /// Write the effective settings back to the settings file before starting.
    #[arg(long)]
    save_settings: bool,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let settings = load_settings(&cli)?;
    let detector = build_detector(&cli)?;

    let mut source = FfmpegFrameSource::new(&cli.input)
        .with_mirrored(!cli.no_mirror)
        .with_realtime(cli.realtime)
        .with_buffer_count(settings.frame_buffers);
    if let Some(degrees) = cli.rotation {
        source = source.with_rotation(Rotation::from_degrees(degrees));
    }

    let cancelled = Arc::new(AtomicBool::new(false));
    let sink = JpegFileSink::new().with_quality(settings.jpeg_quality);
    let (status_sink, status_rx) = ChannelStatusSink::new();
    let ui = spawn_status_view(status_rx, cli.max_captures, cancelled.clone());

    let mut use_case = AutoCaptureUseCase::new(
        Box::new(source),
        detector,
        Box::new(sink),
        Box::new(status_sink),
        Box::new(DevicePermissionGate::new(&cli.input)),
        Box::new(ThreadedCaptureExecutor::new()),
        settings,
        Some(cancelled),
    )
    .with_logger(Box::new(StdoutPipelineLogger::default()));

    let result = use_case.execute();
    // Dropping the use case drops an unused status sink and ends the view.
    drop(use_case);
    if ui.join().is_err() {
        log::warn!("Status view thread panicked");
    }

    let report = result?;
    for path in &report.captures {
        println!("{}", path.display());
    }
    log::info!(
        "{} captures saved, {} failed",
        report.captures_saved,
        report.captures_failed
    );
    Ok(())
}

/// Reads the settings file and applies command-line overrides. With
/// `--save-settings` the result is written back, starting from defaults when
/// the file does not exist yet.
fn load_settings(cli: &Cli) -> Result<CaptureSettings, Box<dyn std::error::Error>> {
    let mut settings = match &cli.settings {
        Some(path) if cli.save_settings && !path.exists() => CaptureSettings::default(),
        Some(path) => CaptureSettings::load_from(path)?,
        None => CaptureSettings::load(),
    };
    if let Some(dir) = &cli.output_dir {
        settings.output_dir = Some(dir.clone());
    }

    if cli.save_settings {
        let path = cli
            .settings
            .clone()
            .or_else(CaptureSettings::default_path)
            .ok_or("No config directory to save settings in")?;
        settings.save_to(&path)?;
        log::info!("Settings saved to {}", path.display());
    }
    Ok(settings)
}

/// Renders statuses on their own thread, standing in for the UI.
fn spawn_status_view(
    status_rx: Receiver<Status>,
    max_captures: Option<usize>,
    cancelled: Arc<AtomicBool>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let mut saved = 0;
        for status in status_rx {
            eprintln!("{status}");
            if status == Status::Saved {
                saved += 1;
                if max_captures.is_some_and(|max| saved >= max) {
                    cancelled.store(true, Ordering::Relaxed);
                }
            }
        }
    })
}

fn build_detector(cli: &Cli) -> Result<Box<dyn FaceDetector>, Box<dyn std::error::Error>> {
    log::info!("Resolving model: {YOLO_MODEL_NAME}");
    let model_path = model_resolver::resolve(
        YOLO_MODEL_NAME,
        YOLO_MODEL_URL,
        None,
        Some(Box::new(download_progress)),
    )?;
    eprintln!();

    Ok(Box::new(OnnxYoloDetector::new(&model_path, cli.confidence)?))
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.input.exists() {
        return Err(format!("Input not found: {}", cli.input.display()).into());
    }
    if !(0.0..=1.0).contains(&cli.confidence) {
        return Err(format!(
            "Confidence must be between 0.0 and 1.0, got {}",
            cli.confidence
        )
        .into());
    }
    if let Some(degrees) = cli.rotation {
        if degrees.rem_euclid(90) != 0 {
            return Err(format!("Rotation must be a multiple of 90, got {degrees}").into());
        }
    }
    if cli.max_captures == Some(0) {
        return Err("--max-captures must be at least 1".into());
    }
    Ok(())
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading face detection model... {pct}%");
    } else {
        eprint!("\rDownloading face detection model... {downloaded} bytes");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("autocenter").chain(args.iter().copied())).unwrap()
    }

    fn existing_input() -> tempfile::NamedTempFile {
        tempfile::NamedTempFile::new().unwrap()
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&["/dev/video0"]);
        assert_eq!(cli.confidence, DETECTION_CONFIDENCE);
        assert!(!cli.save_settings);
        assert!(!cli.no_mirror);
        assert!(!cli.realtime);
        assert!(cli.rotation.is_none());
        assert!(cli.max_captures.is_none());
    }

    #[test]
    fn test_missing_input_rejected() {
        let cli = parse(&["/nonexistent/feed.mp4"]);
        assert!(validate(&cli).unwrap_err().to_string().contains("Input not found"));
    }

    #[test]
    fn test_rotation_must_be_quarter_turn() {
        let input = existing_input();
        let path = input.path().to_str().unwrap();
        assert!(validate(&parse(&[path, "--rotation", "270"])).is_ok());
        assert!(validate(&parse(&[path, "--rotation", "-90"])).is_ok());
        assert!(validate(&parse(&[path, "--rotation", "45"])).is_err());
    }

    #[test]
    fn test_confidence_range() {
        let input = existing_input();
        let path = input.path().to_str().unwrap();
        assert!(validate(&parse(&[path, "--confidence", "1.5"])).is_err());
    }

    #[test]
    fn test_zero_max_captures_rejected() {
        let input = existing_input();
        let path = input.path().to_str().unwrap();
        assert!(validate(&parse(&[path, "--max-captures", "0"])).is_err());
    }

    #[test]
    fn test_save_settings_writes_overrides() {
        let input = existing_input();
        let dir = tempfile::tempdir().unwrap();
        let settings_path = dir.path().join("config").join("settings.json");
        let shots = dir.path().join("shots");
        let cli = parse(&[
            input.path().to_str().unwrap(),
            "--settings",
            settings_path.to_str().unwrap(),
            "--output-dir",
            shots.to_str().unwrap(),
            "--save-settings",
        ]);

        let settings = load_settings(&cli).unwrap();
        assert_eq!(settings.output_dir.as_deref(), Some(shots.as_path()));
        assert_eq!(CaptureSettings::load_from(&settings_path).unwrap(), settings);
    }

    #[test]
    fn test_settings_file_is_read_without_saving() {
        let input = existing_input();
        let dir = tempfile::tempdir().unwrap();
        let settings_path = dir.path().join("settings.json");
        std::fs::write(&settings_path, r#"{ "jpeg_quality": 75, "frame_buffers": 2 }"#).unwrap();
        let cli = parse(&[
            input.path().to_str().unwrap(),
            "--settings",
            settings_path.to_str().unwrap(),
        ]);

        let settings = load_settings(&cli).unwrap();
        assert_eq!(settings.jpeg_quality, 75);
        assert_eq!(settings.frame_buffers, 2);
        assert!(settings.output_dir.is_none());
    }

    #[test]
    fn test_missing_settings_file_without_save_is_error() {
        let input = existing_input();
        let dir = tempfile::tempdir().unwrap();
        let settings_path = dir.path().join("absent.json");
        let cli = parse(&[
            input.path().to_str().unwrap(),
            "--settings",
            settings_path.to_str().unwrap(),
        ]);

        assert!(load_settings(&cli).is_err());
        assert!(!settings_path.exists());
    }

    #[test]
    fn test_status_view_cancels_after_max_captures() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let cancelled = Arc::new(AtomicBool::new(false));
        let view = spawn_status_view(rx, Some(2), cancelled.clone());

        tx.send(Status::Capturing).unwrap();
        tx.send(Status::Saved).unwrap();
        tx.send(Status::SaveFailed).unwrap();
        tx.send(Status::Saved).unwrap();
        drop(tx);
        view.join().unwrap();

        assert!(cancelled.load(Ordering::Relaxed));
    }
}
