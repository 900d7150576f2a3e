use std::fmt;
use std::ops::Deref;

use super::frame::Frame;

/// Callback run once when a leased frame is handed back to its source.
pub type ReleaseFn = Box<dyn FnOnce(&Frame) + Send>;

/// A frame borrowed from a frame source.
///
/// Dropping the lease releases the frame exactly once, so every exit path
/// of the analysis loop (empty detection, detector error, eviction by a
/// newer frame, normal completion) gives the buffer back to the source.
pub struct FrameLease {
    frame: Frame,
    release: Option<ReleaseFn>,
}

impl FrameLease {
    pub fn new(frame: Frame, release: ReleaseFn) -> Self {
        Self {
            frame,
            release: Some(release),
        }
    }

    /// A lease whose source does not need to be notified on release.
    pub fn detached(frame: Frame) -> Self {
        Self {
            frame,
            release: None,
        }
    }
}

impl Deref for FrameLease {
    type Target = Frame;

    fn deref(&self) -> &Frame {
        &self.frame
    }
}

impl Drop for FrameLease {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release(&self.frame);
        }
    }
}

impl fmt::Debug for FrameLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameLease")
            .field("index", &self.frame.index())
            .field("managed", &self.release.is_some())
            .finish()
    }
}
