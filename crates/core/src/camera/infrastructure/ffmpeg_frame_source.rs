use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::camera::domain::frame_source::{FrameSource, SourceInfo};
use crate::shared::constants::FRAME_BUFFER_COUNT;
use crate::shared::frame::{Frame, Rotation};
use crate::shared::frame_lease::FrameLease;

/// Plays a video file or capture device through ffmpeg as a camera feed.
///
/// Like a sensor, it keeps producing frames whether or not anyone is ready:
/// when every buffer is still leased out, newly decoded frames are dropped.
/// In real-time mode frames are paced at the stream's frame rate.
pub struct FfmpegFrameSource {
    path: PathBuf,
    rotation_override: Option<Rotation>,
    mirrored: bool,
    realtime: bool,
    buffer_count: usize,
    decoding: Option<Decoding>,
    info: Option<SourceInfo>,
    outstanding: Arc<AtomicUsize>,
    skipped: usize,
    next_deadline: Option<Instant>,
}

// Safety: FfmpegFrameSource is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegFrameSource {}

impl FfmpegFrameSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            rotation_override: None,
            mirrored: true,
            realtime: false,
            buffer_count: FRAME_BUFFER_COUNT,
            decoding: None,
            info: None,
            outstanding: Arc::new(AtomicUsize::new(0)),
            skipped: 0,
            next_deadline: None,
        }
    }

    /// Ignores the stream's rotation metadata.
    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation_override = Some(rotation);
        self
    }

    /// Whether the preview is mirrored (front-facing camera). Default: true.
    pub fn with_mirrored(mut self, mirrored: bool) -> Self {
        self.mirrored = mirrored;
        self
    }

    pub fn with_realtime(mut self, realtime: bool) -> Self {
        self.realtime = realtime;
        self
    }

    pub fn with_buffer_count(mut self, buffer_count: usize) -> Self {
        self.buffer_count = buffer_count.max(1);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Frames currently leased out and not yet released.
    pub fn outstanding_frames(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }

    /// Frames dropped because no buffer was free.
    pub fn skipped_frames(&self) -> usize {
        self.skipped
    }

    fn pace(&mut self, fps: f64) {
        if !self.realtime || fps <= 0.0 {
            return;
        }
        let now = Instant::now();
        if let Some(deadline) = self.next_deadline {
            if deadline > now {
                std::thread::sleep(deadline - now);
            }
        }
        let base = self.next_deadline.map_or(now, |d| d.max(now));
        self.next_deadline = Some(base + Duration::from_secs_f64(1.0 / fps));
    }
}

impl FrameSource for FfmpegFrameSource {
    fn open(&mut self) -> Result<SourceInfo, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        let ictx = ffmpeg_next::format::input(&self.path)?;

        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or("No video stream found")?;

        let stream_index = stream.index();
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;

        let rate = stream.rate();
        let fps = if rate.denominator() != 0 {
            rate.numerator() as f64 / rate.denominator() as f64
        } else {
            0.0
        };
        let rotation = self
            .rotation_override
            .unwrap_or_else(|| Rotation::from_degrees(extract_rotation(&stream)));

        let width = decoder.width();
        let height = decoder.height();
        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        let info = SourceInfo {
            width,
            height,
            fps,
            rotation,
            mirrored: self.mirrored,
            description: format!(
                "{} ({})",
                self.path.display(),
                decoder
                    .codec()
                    .map(|c| c.name().to_string())
                    .unwrap_or_default()
            ),
        };

        self.decoding = Some(Decoding {
            ictx,
            decoder,
            scaler,
            width,
            height,
            stream_index,
            frame_index: 0,
            flushing: false,
            done: false,
        });
        self.info = Some(info.clone());
        self.next_deadline = None;
        self.skipped = 0;

        Ok(info)
    }

    fn next_frame(&mut self) -> Option<Result<FrameLease, Box<dyn std::error::Error>>> {
        let Some(info) = self.info.clone() else {
            return Some(Err("FfmpegFrameSource: not opened".into()));
        };

        loop {
            let frame = match self.decoding.as_mut()?.next()? {
                Ok(frame) => frame,
                Err(e) => return Some(Err(e)),
            };
            self.pace(info.fps);

            if self.outstanding.load(Ordering::Acquire) >= self.buffer_count {
                self.skipped += 1;
                log::trace!("No free buffer, dropping frame {}", frame.index());
                continue;
            }

            self.outstanding.fetch_add(1, Ordering::AcqRel);
            let outstanding = self.outstanding.clone();
            let frame = frame.with_orientation(info.rotation, info.mirrored);
            return Some(Ok(FrameLease::new(
                frame,
                Box::new(move |_| {
                    outstanding.fetch_sub(1, Ordering::AcqRel);
                }),
            )));
        }
    }

    fn close(&mut self) {
        self.decoding = None;
        self.info = None;
    }
}

/// Decoder state for an opened stream; yields frames in decode order.
struct Decoding {
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    width: u32,
    height: u32,
    stream_index: usize,
    frame_index: usize,
    flushing: bool,
    done: bool,
}

impl Decoding {
    fn try_receive(&mut self) -> Option<Result<Frame, Box<dyn std::error::Error>>> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        if self.decoder.receive_frame(&mut decoded).is_err() {
            return None;
        }

        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
        if let Err(e) = self.scaler.run(&decoded, &mut rgb_frame) {
            return Some(Err(Box::new(e)));
        }

        let pixels = extract_rgb_pixels(&rgb_frame, self.width, self.height);
        let frame = Frame::new(pixels, self.width, self.height, 3, self.frame_index);
        self.frame_index += 1;
        Some(Ok(frame))
    }

    fn next(&mut self) -> Option<Result<Frame, Box<dyn std::error::Error>>> {
        if self.done {
            return None;
        }

        if let Some(result) = self.try_receive() {
            return Some(result);
        }

        if self.flushing {
            self.done = true;
            return None;
        }

        loop {
            let Some((stream, packet)) = self.ictx.packets().next() else {
                let _ = self.decoder.send_eof();
                self.flushing = true;
                if let Some(result) = self.try_receive() {
                    return Some(result);
                }
                self.done = true;
                return None;
            };

            if stream.index() != self.stream_index {
                continue;
            }

            if self.decoder.send_packet(&packet).is_err() {
                continue;
            }

            if let Some(result) = self.try_receive() {
                return Some(result);
            }
        }
    }
}

/// Rotation angle of a video stream in degrees.
///
/// Reads the DisplayMatrix side data first, then the `"rotate"` metadata tag.
fn extract_rotation(stream: &ffmpeg_next::format::stream::Stream) -> i32 {
    for side_data in stream.side_data() {
        if side_data.kind() == ffmpeg_next::codec::packet::side_data::Type::DisplayMatrix {
            if let Some(angle) = parse_display_matrix(side_data.data()) {
                return angle;
            }
        }
    }

    stream
        .metadata()
        .get("rotate")
        .and_then(|s| s.parse::<i32>().ok())
        .unwrap_or(0)
}

/// Rotation from a 3x3 display matrix (9 x i32, 16.16 fixed point, little
/// endian). The matrix holds the inverse of the capture rotation, hence the
/// negation.
fn parse_display_matrix(data: &[u8]) -> Option<i32> {
    if data.len() < 36 {
        return None;
    }

    let m00 = i32::from_le_bytes(data[0..4].try_into().ok()?) as f64 / 65536.0;
    let m10 = i32::from_le_bytes(data[4..8].try_into().ok()?) as f64 / 65536.0;

    Some(-m10.atan2(m00).to_degrees().round() as i32)
}

/// Copies an ffmpeg RGB24 plane into a tightly packed buffer, dropping the
/// per-row stride padding.
fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let row_bytes = width as usize * 3;

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + row_bytes]);
    }
    pixels
}
