use crate::shared::frame::Rotation;
use crate::shared::frame_lease::FrameLease;

/// What a frame source reports once it is bound.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceInfo {
    pub width: u32,
    pub height: u32,
    /// Nominal frame rate, 0 when unknown.
    pub fps: f64,
    pub rotation: Rotation,
    pub mirrored: bool,
    pub description: String,
}

/// Delivers camera frames one at a time.
///
/// Frames are handed out as [`FrameLease`]s; the source gets each buffer
/// back when the lease is dropped.
pub trait FrameSource: Send {
    /// Binds the underlying device or stream.
    fn open(&mut self) -> Result<SourceInfo, Box<dyn std::error::Error>>;

    /// Next frame, or `None` once the stream has ended.
    fn next_frame(&mut self) -> Option<Result<FrameLease, Box<dyn std::error::Error>>>;

    /// Releases the device. Safe to call more than once.
    fn close(&mut self);
}
