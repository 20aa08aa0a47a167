use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::detection::domain::detector_options::ModelAsset;
use crate::shared::constants::APP_DIR_NAME;

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("could not determine cache directory")]
    NoCacheDir,
    #[error("failed to prepare model cache at {path}: {source}")]
    CacheDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("request for {url} failed: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned an empty body")]
    EmptyAsset { url: String },
    #[error("failed to store model at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Progress callback: `(bytes_downloaded, total_bytes)`.
/// `total_bytes` is 0 when the server sends no Content-Length.
pub type ProgressFn = Box<dyn Fn(u64, u64) + Send>;

/// Download-once store for model assets.
#[derive(Clone, Debug)]
pub struct ModelCache {
    dir: PathBuf,
}

impl ModelCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Cache rooted in the platform's per-user location:
    ///
    /// - macOS: `~/Library/Application Support/Framewatch/models/`
    /// - Linux: `$XDG_CACHE_HOME/Framewatch/models/` or `~/.cache/Framewatch/models/`
    /// - Windows: `%LOCALAPPDATA%/Framewatch/models/`
    pub fn user_default() -> Result<Self, ModelResolveError> {
        #[cfg(target_os = "macos")]
        let base = dirs::data_dir();
        #[cfg(not(target_os = "macos"))]
        let base = dirs::cache_dir();

        base.map(|d| Self::new(d.join(APP_DIR_NAME).join("models")))
            .ok_or(ModelResolveError::NoCacheDir)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, asset: &ModelAsset) -> PathBuf {
        self.dir.join(&asset.name)
    }

    /// Local path of `asset`, fetching it on first use. An empty cached
    /// file counts as missing.
    pub fn fetch(
        &self,
        asset: &ModelAsset,
        progress: Option<ProgressFn>,
    ) -> Result<PathBuf, ModelResolveError> {
        let path = self.path_for(asset);
        if is_usable(&path) {
            log::debug!("Model {} served from {}", asset.name, path.display());
            return Ok(path);
        }

        fs::create_dir_all(&self.dir).map_err(|source| ModelResolveError::CacheDir {
            path: self.dir.clone(),
            source,
        })?;
        log::info!("Fetching model {} from {}", asset.name, asset.url);
        download(&asset.url, &path, progress)?;
        Ok(path)
    }
}

fn is_usable(path: &Path) -> bool {
    fs::metadata(path).is_ok_and(|m| m.is_file() && m.len() > 0)
}

/// Stream `url` into `dest` through a `.part` sibling that only replaces
/// `dest` once the body is complete.
fn download(url: &str, dest: &Path, progress: Option<ProgressFn>) -> Result<(), ModelResolveError> {
    let part = dest.with_extension("part");
    let result = stream_to(url, &part, progress).and_then(|_| {
        fs::rename(&part, dest).map_err(|source| ModelResolveError::Write {
            path: dest.to_path_buf(),
            source,
        })
    });
    if result.is_err() {
        let _ = fs::remove_file(&part);
    }
    result
}

fn stream_to(url: &str, part: &Path, progress: Option<ProgressFn>) -> Result<u64, ModelResolveError> {
    let request_failed = |source| ModelResolveError::Download {
        url: url.to_string(),
        source,
    };
    let write_failed = |source| ModelResolveError::Write {
        path: part.to_path_buf(),
        source,
    };

    let mut response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(request_failed)?;
    let total = response.content_length().unwrap_or(0);

    let mut file = fs::File::create(part).map_err(write_failed)?;
    let mut buf = vec![0u8; 1 << 20];
    let mut written = 0u64;
    loop {
        let n = response.read(&mut buf).map_err(write_failed)?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n]).map_err(write_failed)?;
        written += n as u64;
        if let Some(cb) = &progress {
            cb(written, total);
        }
    }
    file.flush().map_err(write_failed)?;

    if written == 0 {
        return Err(ModelResolveError::EmptyAsset {
            url: url.to_string(),
        });
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const UNREACHABLE: &str = "http://invalid.nonexistent.example.com/model.onnx";

    fn asset(name: &str) -> ModelAsset {
        ModelAsset {
            name: name.into(),
            url: UNREACHABLE.into(),
        }
    }

    #[test]
    fn test_cached_asset_needs_no_network() {
        let tmp = TempDir::new().unwrap();
        let cache = ModelCache::new(tmp.path());
        let asset = asset("detector.onnx");
        fs::write(cache.path_for(&asset), b"weights").unwrap();

        assert_eq!(cache.fetch(&asset, None).unwrap(), tmp.path().join("detector.onnx"));
    }

    #[test]
    fn test_empty_cached_file_is_refetched() {
        let tmp = TempDir::new().unwrap();
        let cache = ModelCache::new(tmp.path());
        let asset = asset("detector.onnx");
        fs::write(cache.path_for(&asset), b"").unwrap();

        assert!(matches!(
            cache.fetch(&asset, None),
            Err(ModelResolveError::Download { .. })
        ));
    }

    #[test]
    fn test_failed_fetch_leaves_no_files() {
        let tmp = TempDir::new().unwrap();
        let cache = ModelCache::new(tmp.path().join("models"));
        let asset = asset("missing.onnx");

        assert!(cache.fetch(&asset, None).is_err());
        let path = cache.path_for(&asset);
        assert!(!path.exists());
        assert!(!path.with_extension("part").exists());
    }

    #[test]
    fn test_user_default_lives_under_app_dir() {
        let cache = ModelCache::user_default().unwrap();
        let dir = cache.dir().to_string_lossy();
        assert!(dir.contains(APP_DIR_NAME));
        assert!(dir.ends_with("models"));
    }

    #[test]
    fn test_download_reports_progress() {
        // Needs network access.
        if std::env::var("CI").is_ok() {
            return;
        }
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("robots.txt");
        let seen = std::sync::Arc::new(std::sync::atomic::AtomicU64::new(0));
        let sink = seen.clone();

        let result = download(
            "https://www.google.com/robots.txt",
            &dest,
            Some(Box::new(move |downloaded, _total| {
                sink.store(downloaded, std::sync::atomic::Ordering::Relaxed);
            })),
        );
        if result.is_err() {
            // Sandboxed environments without network access.
            return;
        }
        let bytes = fs::read(&dest).unwrap();
        assert!(!bytes.is_empty());
        assert_eq!(
            seen.load(std::sync::atomic::Ordering::Relaxed),
            bytes.len() as u64
        );
    }
}
