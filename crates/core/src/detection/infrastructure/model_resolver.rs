use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("failed to create cache directory {path}: {source}")]
    CacheDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
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

/// Locates detector models in a cache directory, downloading on a miss.
#[derive(Clone, Debug)]
pub struct ModelResolver {
    cache_dir: PathBuf,
}

impl ModelResolver {
    /// Resolver over the platform model cache.
    ///
    /// - macOS: `~/Library/Application Support/DepthGuard/models/`
    /// - Linux: `$XDG_CACHE_HOME/DepthGuard/models/` or `~/.cache/DepthGuard/models/`
    /// - Windows: `%LOCALAPPDATA%/DepthGuard/models/`
    pub fn new() -> Result<Self, ModelResolveError> {
        #[cfg(target_os = "macos")]
        let base = dirs::data_dir();
        #[cfg(not(target_os = "macos"))]
        let base = dirs::cache_dir();

        base.map(|d| Self::with_cache_dir(d.join("DepthGuard").join("models")))
            .ok_or(ModelResolveError::NoCacheDir)
    }

    pub fn with_cache_dir(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn cached_path(&self, name: &str) -> PathBuf {
        self.cache_dir.join(name)
    }

    /// Returns the cached model, downloading it from `url` first if absent.
    pub fn resolve(
        &self,
        name: &str,
        url: &str,
        progress: Option<ProgressFn>,
    ) -> Result<PathBuf, ModelResolveError> {
        let cached = self.cached_path(name);
        if cached.is_file() {
            log::debug!("using cached model {}", cached.display());
            return Ok(cached);
        }

        fs::create_dir_all(&self.cache_dir).map_err(|source| ModelResolveError::CacheDir {
            path: self.cache_dir.clone(),
            source,
        })?;
        log::info!("downloading {name} from {url}");
        download(url, &cached, progress)?;
        Ok(cached)
    }
}

/// Downloads into `<dest>.part` and renames on success; the partial file is
/// removed on any failure.
fn download(url: &str, dest: &Path, progress: Option<ProgressFn>) -> Result<(), ModelResolveError> {
    let part = dest.with_extension("part");
    let result = fetch_to(url, &part, progress.as_ref()).and_then(|_| {
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

fn fetch_to(
    url: &str,
    part: &Path,
    progress: Option<&ProgressFn>,
) -> Result<u64, ModelResolveError> {
    let mut response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|source| ModelResolveError::Download {
            url: url.to_string(),
            source,
        })?;
    let total = response.content_length().unwrap_or(0);

    let write_err = |source| ModelResolveError::Write {
        path: part.to_path_buf(),
        source,
    };
    let mut file = fs::File::create(part).map_err(write_err)?;
    let mut buf = vec![0u8; 256 * 1024];
    let mut written = 0u64;
    loop {
        let n = response.read(&mut buf).map_err(write_err)?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n]).map_err(write_err)?;
        written += n as u64;
        if let Some(cb) = progress {
            cb(written, total);
        }
    }
    file.flush().map_err(write_err)?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const UNREACHABLE_URL: &str = "http://invalid.nonexistent.example.com/model.onnx";

    #[test]
    fn test_cached_model_is_returned_without_download() {
        let tmp = TempDir::new().unwrap();
        let resolver = ModelResolver::with_cache_dir(tmp.path());
        fs::write(resolver.cached_path("yunet.onnx"), b"weights").unwrap();

        let path = resolver.resolve("yunet.onnx", UNREACHABLE_URL, None).unwrap();
        assert_eq!(path, tmp.path().join("yunet.onnx"));
    }

    #[test]
    fn test_failed_download_leaves_nothing_behind() {
        let tmp = TempDir::new().unwrap();
        let resolver = ModelResolver::with_cache_dir(tmp.path().join("models"));

        let result = resolver.resolve("yunet.onnx", UNREACHABLE_URL, None);
        assert!(matches!(result, Err(ModelResolveError::Download { .. })));

        let dest = resolver.cached_path("yunet.onnx");
        assert!(!dest.exists());
        assert!(!dest.with_extension("part").exists());
    }

    #[test]
    fn test_platform_cache_dir_is_app_scoped() {
        let resolver = ModelResolver::new().unwrap();
        let path = resolver.cache_dir().to_string_lossy().into_owned();
        assert!(path.contains("DepthGuard"));
        assert!(path.ends_with("models"));
    }
}
