use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("failed to create capture directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("frame {index} has no usable RGB buffer")]
    InvalidFrame { index: usize },
    #[error("failed to write {path}: {message}")]
    Write { path: PathBuf, message: String },
    #[error("capture worker stopped")]
    WorkerStopped,
}

/// Persists a captured frame.
///
/// Called on the capture thread; the decision thread learns the outcome
/// through a completion message.
pub trait ImageSink: Send {
    fn save(&self, frame: &Frame, path: &Path) -> Result<(), CaptureError>;
}
