use std::fs;
use std::io::BufWriter;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;

use crate::capture::domain::image_sink::{CaptureError, ImageSink};
use crate::shared::constants::JPEG_QUALITY;
use crate::shared::frame::Frame;

/// Encodes captures as JPEG files using the `image` crate.
///
/// Frames are rotated upright before encoding. The file is written next to
/// its destination and renamed into place, so a failed save never leaves a
/// truncated image behind.
pub struct JpegFileSink {
    quality: u8,
}

impl JpegFileSink {
    pub fn new() -> Self {
        Self {
            quality: JPEG_QUALITY,
        }
    }

    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality.clamp(1, 100);
        self
    }
}

impl Default for JpegFileSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageSink for JpegFileSink {
    fn save(&self, frame: &Frame, path: &Path) -> Result<(), CaptureError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| CaptureError::CreateDir {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        if frame.channels() != 3 {
            return Err(CaptureError::InvalidFrame {
                index: frame.index(),
            });
        }
        let upright = frame.upright();
        let img = image::RgbImage::from_raw(upright.width(), upright.height(), upright.data().to_vec())
            .ok_or(CaptureError::InvalidFrame {
                index: frame.index(),
            })?;

        let write_err = |message: String| CaptureError::Write {
            path: path.to_path_buf(),
            message,
        };

        let temp_path = path.with_extension("part");
        let file = fs::File::create(&temp_path).map_err(|e| write_err(e.to_string()))?;
        let encoded = img.write_with_encoder(JpegEncoder::new_with_quality(
            BufWriter::new(file),
            self.quality,
        ));
        if let Err(e) = encoded {
            let _ = fs::remove_file(&temp_path);
            return Err(write_err(e.to_string()));
        }

        fs::rename(&temp_path, path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            write_err(e.to_string())
        })
    }
}
