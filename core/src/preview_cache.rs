use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::Mutex;
use tokio::sync::OnceCell;
use tracing::debug;
use tracing::info;
use tracing::instrument;

use crate::catalog::RemoteImage;
use crate::error::Result;
use crate::error::WallpickErr;
use crate::http::describe;

const SESSION_DIR_PREFIX: &str = "wallpick-thumbnails-";

/// Maps image names to thumbnails already written to the session cache
/// directory. Entries are write-once: one is registered only after its file
/// has been fully written, and is never evicted for the rest of the session.
#[derive(Debug)]
pub struct PreviewCache {
    http: reqwest::Client,
    dir: PathBuf,
    timeout: Duration,
    // One cell per name. A cell is filled only after a successful write;
    // callers for the same name wait on it while other names proceed.
    entries: Mutex<HashMap<String, Arc<OnceCell<PathBuf>>>>,
    // Removes the directory when the session ends.
    _session_dir: Option<TempDir>,
}

impl PreviewCache {
    /// Cache writing into `dir`, which is left in place afterwards.
    pub fn new(http: reqwest::Client, dir: PathBuf, timeout: Duration) -> Self {
        Self {
            http,
            dir,
            timeout,
            entries: Mutex::new(HashMap::new()),
            _session_dir: None,
        }
    }

    /// Cache writing into a fresh private directory under `parent`. Every
    /// session gets its own directory, deleted when the cache is dropped.
    pub fn for_session(http: reqwest::Client, parent: &Path, timeout: Duration) -> Result<Self> {
        std::fs::create_dir_all(parent)?;
        let session_dir = tempfile::Builder::new()
            .prefix(SESSION_DIR_PREFIX)
            .tempdir_in(parent)?;
        debug!(dir = %session_dir.path().display(), "thumbnail cache directory created");
        Ok(Self {
            dir: session_dir.path().to_path_buf(),
            _session_dir: Some(session_dir),
            ..Self::new(http, PathBuf::new(), timeout)
        })
    }

    pub async fn cached_path(&self, name: &str) -> Option<PathBuf> {
        let cell = self.entries.lock().await.get(name).cloned()?;
        cell.get().cloned()
    }

    /// Returns the local thumbnail for `image`, fetching it on first use.
    #[instrument(level = "debug", skip_all, fields(name = %image.name))]
    pub async fn ensure_thumbnail(&self, image: &RemoteImage) -> Result<PathBuf> {
        let cell = {
            let mut entries = self.entries.lock().await;
            Arc::clone(entries.entry(image.name.clone()).or_default())
        };
        if let Some(path) = cell.get() {
            debug!("thumbnail cache hit");
            return Ok(path.clone());
        }

        let path = cell
            .get_or_try_init(|| async {
                let path = self.dir.join(cache_file_name(&image.name));
                self.fetch_to(image, &path).await.map_err(|reason| {
                    WallpickErr::ThumbnailFetchFailed {
                        name: image.name.clone(),
                        reason,
                    }
                })?;
                info!(path = %path.display(), "thumbnail cached");
                Ok::<_, WallpickErr>(path)
            })
            .await?;
        Ok(path.clone())
    }

    async fn fetch_to(&self, image: &RemoteImage, path: &Path) -> std::result::Result<(), String> {
        let response = self
            .http
            .get(&image.thumbnail_url)
            .timeout(self.timeout)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|err| describe(&err))?;
        let bytes = response.bytes().await.map_err(|err| describe(&err))?;
        if bytes.is_empty() {
            return Err("empty response body".to_string());
        }

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|err| format!("cannot create {}: {err}", self.dir.display()))?;
        let partial = partial_path(path);
        if let Err(err) = write_then_rename(&partial, path, &bytes).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(format!("cannot write {}: {err}", path.display()));
        }
        Ok(())
    }
}

async fn write_then_rename(partial: &Path, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    tokio::fs::write(partial, bytes).await?;
    tokio::fs::rename(partial, path).await
}

/// File name used for `name` inside a directory we own. Listing names never
/// contain separators, but the name comes from the network.
pub(crate) fn cache_file_name(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '_',
            c => c,
        })
        .collect();
    match sanitized.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => sanitized,
    }
}

pub(crate) fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(std::ffi::OsStr::to_os_string).unwrap_or_default();
    name.push(".part");
    path.with_file_name(name)
}
