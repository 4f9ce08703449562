use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::classifier::{Classifier, CompactClassifier, ModelSource, NetworkClassifier};
use crate::error::ModerationError;

/// Native network JSON on local disk.
pub struct LocalNetworkSource {
    path: PathBuf,
}

impl LocalNetworkSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        LocalNetworkSource { path: path.into() }
    }
}

impl ModelSource for LocalNetworkSource {
    fn load(&self) -> Result<Arc<dyn Classifier>, ModerationError> {
        if !self.path.exists() {
            return Err(ModerationError::ModelUnavailable(format!(
                "model not found at {}",
                self.path.display()
            )));
        }
        Ok(Arc::new(NetworkClassifier::load(&self.path)?))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Compact `.optc` model on local disk.
pub struct LocalCompactSource {
    path: PathBuf,
}

impl LocalCompactSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        LocalCompactSource { path: path.into() }
    }
}

impl ModelSource for LocalCompactSource {
    fn load(&self) -> Result<Arc<dyn Classifier>, ModerationError> {
        if !self.path.exists() {
            return Err(ModerationError::ModelUnavailable(format!(
                "model not found at {}",
                self.path.display()
            )));
        }
        Ok(Arc::new(CompactClassifier::load(&self.path)?))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Compact model fetched over HTTP(S) and cached at a fixed path.
///
/// An existing cache file is used as-is. A cache file that fails to parse is
/// removed so that the next load downloads a fresh copy.
pub struct RemoteCompactSource {
    url: String,
    cache_path: PathBuf,
    timeout: Duration,
}

impl RemoteCompactSource {
    pub fn new(url: String, cache_path: PathBuf, timeout: Duration) -> Self {
        RemoteCompactSource { url, cache_path, timeout }
    }

    fn download(&self) -> Result<(), ModerationError> {
        log::info!("Downloading model from {}", self.url);
        let unavailable = |e: String| ModerationError::ModelUnavailable(format!("download failed: {}", e));

        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| unavailable(e.to_string()))?;
        let response = client.get(&self.url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| unavailable(e.to_string()))?;
        let body = response.bytes().map_err(|e| unavailable(e.to_string()))?;

        write_atomically(&self.cache_path, &body).map_err(|e| unavailable(e.to_string()))?;
        log::info!("Model downloaded to {} ({} bytes)", self.cache_path.display(), body.len());
        Ok(())
    }
}

impl ModelSource for RemoteCompactSource {
    fn load(&self) -> Result<Arc<dyn Classifier>, ModerationError> {
        if !self.cache_path.exists() {
            self.download()?;
        }
        match CompactClassifier::load(&self.cache_path) {
            Ok(classifier) => Ok(Arc::new(classifier)),
            Err(e) => {
                let _ = std::fs::remove_file(&self.cache_path);
                Err(e)
            }
        }
    }

    fn describe(&self) -> String {
        format!("{} (cache {})", self.url, self.cache_path.display())
    }
}

/// Writes `bytes` next to `path` and renames into place, so a concurrent
/// reader never sees a half-written model.
fn write_atomically(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
