use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use crate::shared::constants::{CAPTURE_FILE_EXTENSION, CAPTURE_FILE_PREFIX};

/// Where and under which name captures are written:
/// `<dir>/<prefix>yyyyMMdd_HHmmss.jpg`.
#[derive(Clone, Debug, PartialEq)]
pub struct CaptureNaming {
    dir: PathBuf,
    prefix: String,
}

impl CaptureNaming {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_name(&self, taken_at: NaiveDateTime) -> String {
        format!(
            "{}{}.{CAPTURE_FILE_EXTENSION}",
            self.prefix,
            taken_at.format("%Y%m%d_%H%M%S")
        )
    }

    /// First free path for a capture taken at `taken_at`.
    ///
    /// Two captures inside the same second get `_1`, `_2`, ... suffixes
    /// instead of overwriting each other.
    pub fn path_for(&self, taken_at: NaiveDateTime) -> PathBuf {
        let candidate = self.dir.join(self.file_name(taken_at));
        if !candidate.exists() {
            return candidate;
        }
        let stem = format!("{}{}", self.prefix, taken_at.format("%Y%m%d_%H%M%S"));
        (1..)
            .map(|n| {
                self.dir
                    .join(format!("{stem}_{n}.{CAPTURE_FILE_EXTENSION}"))
            })
            .find(|p| !p.exists())
            .unwrap_or(candidate)
    }

    /// [`path_for`](Self::path_for) at the current local time.
    pub fn next_path(&self) -> PathBuf {
        self.path_for(chrono::Local::now().naive_local())
    }
}

impl Default for CaptureNaming {
    fn default() -> Self {
        Self::new(PathBuf::from("."), CAPTURE_FILE_PREFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::fs;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_file_name_format() {
        let naming = CaptureNaming::new("/tmp", "IMG_");
        assert_eq!(naming.file_name(at(7, 5, 3)), "IMG_20240309_070503.jpg");
    }

    #[test]
    fn test_custom_prefix() {
        let naming = CaptureNaming::new("/tmp", "face-");
        assert_eq!(naming.file_name(at(23, 59, 59)), "face-20240309_235959.jpg");
    }

    #[test]
    fn test_path_for_uses_dir() {
        let dir = tempfile::tempdir().unwrap();
        let naming = CaptureNaming::new(dir.path(), "IMG_");
        assert_eq!(
            naming.path_for(at(12, 0, 0)),
            dir.path().join("IMG_20240309_120000.jpg")
        );
    }

    #[test]
    fn test_path_for_avoids_collisions() {
        let dir = tempfile::tempdir().unwrap();
        let naming = CaptureNaming::new(dir.path(), "IMG_");
        fs::write(dir.path().join("IMG_20240309_120000.jpg"), b"x").unwrap();
        fs::write(dir.path().join("IMG_20240309_120000_1.jpg"), b"x").unwrap();

        assert_eq!(
            naming.path_for(at(12, 0, 0)),
            dir.path().join("IMG_20240309_120000_2.jpg")
        );
    }

    #[test]
    fn test_next_path_has_prefix_and_extension() {
        let naming = CaptureNaming::new("/nonexistent/captures", "IMG_");
        let path = naming.next_path();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("IMG_"));
        assert!(name.ends_with(".jpg"));
        assert_eq!(name.len(), "IMG_yyyyMMdd_HHmmss.jpg".len());
    }
}
