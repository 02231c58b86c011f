use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, WallpickErr>;

/// Failures produced by the pipeline stages. None of these are fatal to a
/// running session; each is converted to a short status string at the
/// boundary of the stage that produced it.
#[derive(Error, Debug)]
pub enum WallpickErr {
    /// The listing endpoint could not be reached or returned something we
    /// could not parse. Callers treat this exactly like an empty catalog.
    #[error("listing request failed: {0}")]
    ListingFailed(String),

    #[error("thumbnail fetch for `{name}` failed: {reason}")]
    ThumbnailFetchFailed { name: String, reason: String },

    /// Both rasterization profiles failed. `reason` holds the last backend
    /// error.
    #[error("rendering `{}` failed: {reason}", path.display())]
    RenderFailed { path: PathBuf, reason: String },

    #[error("download of `{name}` failed: {reason}")]
    DownloadFailed { name: String, reason: String },

    #[error("setting the wallpaper failed: {0}")]
    WallpaperApplyFailed(String),

    #[error("invalid configuration in {}: {reason}", path.display())]
    Config { path: PathBuf, reason: String },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl WallpickErr {
    /// Short message suitable for the status line or the preview pane.
    pub fn user_message(&self) -> String {
        match self {
            WallpickErr::ListingFailed(_) => "Could not load the image list.".to_string(),
            WallpickErr::ThumbnailFetchFailed { .. } => "Preview download failed.".to_string(),
            WallpickErr::RenderFailed { .. } => "Preview unavailable.".to_string(),
            WallpickErr::DownloadFailed { name, .. } => format!("Download of {name} failed."),
            WallpickErr::WallpaperApplyFailed(detail) => {
                format!("Could not set wallpaper: {detail}")
            }
            WallpickErr::Config { path, .. } => {
                format!("Invalid configuration in {}", path.display())
            }
            WallpickErr::Io(err) => format!("I/O error: {err}"),
        }
    }
}
