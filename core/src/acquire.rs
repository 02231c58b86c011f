use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::info;
use tracing::instrument;
use tracing::warn;

use crate::catalog::RemoteImage;
use crate::config::DownloadConfig;
use crate::error::Result;
use crate::error::WallpickErr;
use crate::http::describe;
use crate::preview_cache::cache_file_name;
use crate::preview_cache::partial_path;
use crate::wallpaper::WallpaperSetter;

/// Outcome of one confirm action. A failed apply still means the download
/// succeeded, so `saved_path` is always a complete file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyResult {
    pub saved_path: PathBuf,
    pub wallpaper_applied: bool,
    /// Present iff the wallpaper could not be applied.
    pub error_detail: Option<String>,
}

impl ApplyResult {
    pub fn status_message(&self) -> String {
        match &self.error_detail {
            None => format!("Wallpaper set. Saved to {}", self.saved_path.display()),
            Some(detail) => format!(
                "Saved to {}, but could not set wallpaper: {detail}",
                self.saved_path.display()
            ),
        }
    }
}

/// Downloads a full-resolution image and applies it as the wallpaper.
pub struct Acquirer {
    http: reqwest::Client,
    save_dir: PathBuf,
    settle_delay: Duration,
    timeout: Duration,
    setter: Arc<dyn WallpaperSetter>,
}

impl Acquirer {
    pub fn new(
        http: reqwest::Client,
        download: &DownloadConfig,
        setter: Arc<dyn WallpaperSetter>,
    ) -> Self {
        Self {
            http,
            save_dir: download.save_dir.clone(),
            settle_delay: download.settle_delay,
            timeout: download.timeout,
            setter,
        }
    }

    /// Runs the whole pipeline. Only download failures are returned as
    /// errors; an apply failure is reported inside the [`ApplyResult`].
    #[instrument(skip_all, fields(name = %image.name))]
    pub async fn acquire_and_apply(&self, image: &RemoteImage) -> Result<ApplyResult> {
        let saved_path = self.download(image).await?;

        // Some wallpaper backends re-read the file immediately; give the OS a
        // moment to release it.
        tokio::time::sleep(self.settle_delay).await;

        let absolute = std::path::absolute(&saved_path).unwrap_or_else(|_| saved_path.clone());
        match self.setter.apply(&absolute).await {
            Ok(()) => {
                info!(path = %absolute.display(), "wallpaper applied");
                Ok(ApplyResult {
                    saved_path: absolute,
                    wallpaper_applied: true,
                    error_detail: None,
                })
            }
            Err(detail) => {
                warn!(path = %absolute.display(), "wallpaper not applied: {detail}");
                Ok(ApplyResult {
                    saved_path: absolute,
                    wallpaper_applied: false,
                    error_detail: Some(detail),
                })
            }
        }
    }

    /// Streams `image` to `<save_dir>/<name>`. The final path only appears
    /// once the whole body has been written and synced.
    pub async fn download(&self, image: &RemoteImage) -> Result<PathBuf> {
        let download_failed = |reason: String| WallpickErr::DownloadFailed {
            name: image.name.clone(),
            reason,
        };

        tokio::fs::create_dir_all(&self.save_dir).await.map_err(|err| {
            download_failed(format!(
                "cannot create {}: {err}",
                self.save_dir.display()
            ))
        })?;

        let saved_path = self.save_dir.join(cache_file_name(&image.name));
        let partial = partial_path(&saved_path);
        let result = tokio::time::timeout(self.timeout, self.stream_to(image, &partial))
            .await
            .unwrap_or_else(|_| Err(format!("timed out after {:?}", self.timeout)));

        let written = match result {
            Ok(written) => written,
            Err(reason) => {
                let _ = tokio::fs::remove_file(&partial).await;
                return Err(download_failed(reason));
            }
        };

        if let Err(err) = tokio::fs::rename(&partial, &saved_path).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(download_failed(format!(
                "cannot move download into place: {err}"
            )));
        }
        info!(name = %image.name, bytes = written, path = %saved_path.display(), "download complete");
        Ok(saved_path)
    }

    async fn stream_to(&self, image: &RemoteImage, partial: &Path) -> std::result::Result<u64, String> {
        let response = self
            .http
            .get(&image.download_url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|err| describe(&err))?;

        let mut file = tokio::fs::File::create(partial)
            .await
            .map_err(|err| format!("cannot create {}: {err}", partial.display()))?;
        let mut stream = response.bytes_stream();
        let mut written = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|err| describe(&err))?;
            file.write_all(&chunk)
                .await
                .map_err(|err| format!("write failed: {err}"))?;
            written += chunk.len() as u64;
        }
        file.flush()
            .await
            .map_err(|err| format!("write failed: {err}"))?;
        file.sync_all()
            .await
            .map_err(|err| format!("write failed: {err}"))?;

        if written == 0 {
            return Err("empty response body".to_string());
        }
        Ok(written)
    }
}
