use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::centering::domain::centering_classifier::Classification;
use crate::shared::rate_limiter::RateLimiter;
use crate::status::domain::status_sink::Status;

use super::image_sink::CaptureError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    InFlight,
}

/// Gates capture requests: only from `Idle`, only on a centered face, and
/// only once the cooldown since the previous request start has elapsed.
///
/// At most one capture is ever in flight. The cooldown is anchored to the
/// moment a request starts, not to when the sink finishes it.
#[derive(Debug)]
pub struct CaptureController {
    state: CaptureState,
    cooldown: RateLimiter,
}

impl CaptureController {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            state: CaptureState::Idle,
            cooldown: RateLimiter::new(cooldown),
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// Returns `true` when a capture must begin now; the controller is then
    /// `InFlight` until [`finish`](Self::finish) is called.
    pub fn request(&mut self, classification: Classification, now: Instant) -> bool {
        if classification != Classification::Centered || self.state == CaptureState::InFlight {
            return false;
        }
        if !self.cooldown.try_fire(now) {
            return false;
        }
        self.state = CaptureState::InFlight;
        true
    }

    /// Applies the sink's completion and returns the terminal status.
    ///
    /// A completion with nothing in flight is ignored.
    pub fn finish(&mut self, outcome: &Result<PathBuf, CaptureError>) -> Option<Status> {
        if self.state == CaptureState::Idle {
            log::warn!("Capture completion received while idle, ignoring");
            return None;
        }
        self.state = CaptureState::Idle;
        match outcome {
            Ok(path) => {
                log::info!("Saved capture to {}", path.display());
                Some(Status::Saved)
            }
            Err(e) => {
                log::error!("Save failed: {e}");
                Some(Status::SaveFailed)
            }
        }
    }
}
