use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::shared::constants::APP_DIR_NAME;

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("failed to create cache directory: {0}")]
    CacheDir(#[source] std::io::Error),
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to write model to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not determine cache directory")]
    NoCacheDir,
}

/// Progress callback: `(bytes_downloaded, total_bytes)`.
/// `total_bytes` is 0 if the server didn't provide Content-Length.
pub type ProgressFn = Box<dyn Fn(u64, u64) + Send>;

/// Resolve the detector model by name.
///
/// Resolution order:
/// 1. User cache directory (platform-specific)
/// 2. Bundled directory (development checkouts, packaged installs)
/// 3. Download from `url` into the cache
pub fn resolve(
    name: &str,
    url: &str,
    bundled_dir: Option<&Path>,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    resolve_in(&model_cache_dir()?, name, url, bundled_dir, progress)
}

fn resolve_in(
    cache_dir: &Path,
    name: &str,
    url: &str,
    bundled_dir: Option<&Path>,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    let cached_path = cache_dir.join(name);
    if cached_path.exists() {
        log::debug!("Using cached model {}", cached_path.display());
        return Ok(cached_path);
    }

    if let Some(bundled_path) = bundled_dir.map(|d| d.join(name)).filter(|p| p.exists()) {
        log::debug!("Using bundled model {}", bundled_path.display());
        return Ok(bundled_path);
    }

    fs::create_dir_all(cache_dir).map_err(ModelResolveError::CacheDir)?;
    log::info!("Downloading {name} from {url}");
    download(url, &cached_path, progress)?;
    Ok(cached_path)
}

/// Platform-specific model cache directory.
///
/// - macOS: `~/Library/Application Support/AutoCenterFaceShot/models/`
/// - Linux: `$XDG_CACHE_HOME/AutoCenterFaceShot/models/` or `~/.cache/AutoCenterFaceShot/models/`
/// - Windows: `%LOCALAPPDATA%/AutoCenterFaceShot/models/`
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    #[cfg(target_os = "macos")]
    let base = dirs::data_dir();
    #[cfg(not(target_os = "macos"))]
    let base = dirs::cache_dir();

    base.map(|d| d.join(APP_DIR_NAME).join("models"))
        .ok_or(ModelResolveError::NoCacheDir)
}

fn download(url: &str, dest: &Path, progress: Option<ProgressFn>) -> Result<(), ModelResolveError> {
    let temp_path = dest.with_extension("part");

    let result = download_inner(url, dest, &temp_path, progress);
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn download_inner(
    url: &str,
    dest: &Path,
    temp_path: &Path,
    progress: Option<ProgressFn>,
) -> Result<(), ModelResolveError> {
    let mut response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|e| ModelResolveError::Download {
            url: url.to_string(),
            source: e,
        })?;

    let write_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| ModelResolveError::Write { path, source }
    };

    let total = response.content_length().unwrap_or(0);
    let mut downloaded: u64 = 0;
    let mut file = fs::File::create(temp_path).map_err(write_err(temp_path))?;

    // Streamed in chunks; models are too large to buffer whole.
    let mut buf = vec![0u8; 1024 * 1024];
    loop {
        let n = response.read(&mut buf).map_err(write_err(temp_path))?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n]).map_err(write_err(temp_path))?;
        downloaded += n as u64;
        if let Some(ref cb) = progress {
            cb(downloaded, total);
        }
    }

    file.flush().map_err(write_err(temp_path))?;
    drop(file);

    fs::rename(temp_path, dest).map_err(write_err(dest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const BAD_URL: &str = "http://invalid.nonexistent.example.com/model.onnx";

    #[test]
    fn test_resolve_prefers_cached_file() {
        let tmp = TempDir::new().unwrap();
        let cache = tmp.path().join("cache");
        let bundled = tmp.path().join("bundled");
        fs::create_dir_all(&cache).unwrap();
        fs::create_dir_all(&bundled).unwrap();
        fs::write(cache.join("face.onnx"), b"cached").unwrap();
        fs::write(bundled.join("face.onnx"), b"bundled").unwrap();

        let path = resolve_in(&cache, "face.onnx", BAD_URL, Some(&bundled), None).unwrap();
        assert_eq!(path, cache.join("face.onnx"));
    }

    #[test]
    fn test_resolve_falls_back_to_bundled_file() {
        let tmp = TempDir::new().unwrap();
        let cache = tmp.path().join("cache");
        let bundled = tmp.path().join("bundled");
        fs::create_dir_all(&bundled).unwrap();
        fs::write(bundled.join("face.onnx"), b"bundled").unwrap();

        let path = resolve_in(&cache, "face.onnx", BAD_URL, Some(&bundled), None).unwrap();
        assert_eq!(path, bundled.join("face.onnx"));
        assert!(!cache.exists());
    }

    #[test]
    fn test_resolve_download_failure_leaves_no_files() {
        let tmp = TempDir::new().unwrap();
        let cache = tmp.path().join("cache");

        let result = resolve_in(&cache, "face.onnx", BAD_URL, None, None);
        assert!(matches!(result, Err(ModelResolveError::Download { .. })));
        assert!(!cache.join("face.onnx").exists());
        assert!(!cache.join("face.part").exists());
    }

    #[test]
    fn test_model_cache_dir_is_app_scoped() {
        let path = model_cache_dir().unwrap();
        assert!(path.ends_with(Path::new(APP_DIR_NAME).join("models")));
    }

    #[test]
    fn test_download_to_file() {
        // Requires network access
        if std::env::var("CI").is_ok() {
            return;
        }
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("robots.txt");

        let progress_called = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = progress_called.clone();

        let result = download(
            "https://www.google.com/robots.txt",
            &dest,
            Some(Box::new(move |_downloaded, _total| {
                flag.store(true, std::sync::atomic::Ordering::Relaxed);
            })),
        );
        if result.is_err() {
            // Offline sandbox
            return;
        }
        assert!(dest.exists());
        assert!(progress_called.load(std::sync::atomic::Ordering::Relaxed));
    }
}
