use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use dirs::home_dir;
use serde::Deserialize;

use crate::error::Result;
use crate::error::WallpickErr;

pub const CONFIG_TOML_FILE: &str = "config.toml";

const WALLPICK_HOME_ENV: &str = "WALLPICK_HOME";
const DEFAULT_HOME_DIRNAME: &str = ".wallpick";
const SAVE_DIRNAME: &str = "wallpick";

const DEFAULT_OWNER: &str = "Adhishcantcode";
const DEFAULT_REPO: &str = "wallpapers";
const DEFAULT_BRANCH: &str = "main";
const DEFAULT_API_BASE_URL: &str = "https://api.github.com";
const DEFAULT_RAW_BASE_URL: &str = "https://raw.githubusercontent.com";
const DEFAULT_PROXY_URL: &str = "https://wsrv.nl/";
const DEFAULT_THUMBNAIL_WIDTH: u32 = 480;
const DEFAULT_THUMBNAIL_QUALITY: u8 = 70;
const DEFAULT_DEBOUNCE_MS: u64 = 400;
const DEFAULT_RASTERIZER: &str = "chafa";
const DEFAULT_RENDER_TIMEOUT_SECS: u64 = 10;
const DEFAULT_SETTLE_MS: u64 = 1_500;
const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 300;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 20;

/// Raw contents of `config.toml`. Every key is optional; [`Config`] holds the
/// resolved values.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ConfigToml {
    pub source: Option<SourceToml>,
    pub thumbnails: Option<ThumbnailsToml>,
    pub preview: Option<PreviewToml>,
    pub download: Option<DownloadToml>,
    pub network: Option<NetworkToml>,
    pub wallpaper: Option<WallpaperToml>,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct SourceToml {
    pub owner: Option<String>,
    pub repo: Option<String>,
    pub branch: Option<String>,
    pub folder: Option<String>,
    pub api_base_url: Option<String>,
    pub raw_base_url: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ThumbnailsToml {
    /// Image proxy used to shrink thumbnails. An empty string disables it.
    pub proxy_url: Option<String>,
    pub width: Option<u32>,
    pub quality: Option<u8>,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct PreviewToml {
    pub debounce_ms: Option<u64>,
    pub rasterizer: Option<String>,
    pub render_timeout_secs: Option<u64>,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct DownloadToml {
    pub save_dir: Option<PathBuf>,
    pub settle_ms: Option<u64>,
    pub timeout_secs: Option<u64>,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct NetworkToml {
    pub timeout_secs: Option<u64>,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct WallpaperToml {
    /// Argv template; `{path}` is replaced by the absolute image path and
    /// `{uri}` by its `file://` URI.
    pub command: Option<Vec<String>>,
}

/// Where the remote collection lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    pub owner: String,
    pub repo: String,
    pub branch: String,
    /// Directory inside the repository, without leading or trailing slashes.
    /// Empty means the repository root.
    pub folder: String,
    pub api_base_url: String,
    pub raw_base_url: String,
}

impl SourceConfig {
    /// `owner/repo` or `owner/repo/folder`, for display.
    pub fn display_name(&self) -> String {
        if self.folder.is_empty() {
            format!("{}/{}", self.owner, self.repo)
        } else {
            format!("{}/{}/{}", self.owner, self.repo, self.folder)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailConfig {
    pub proxy_url: Option<String>,
    pub width: u32,
    pub quality: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewConfig {
    pub debounce: Duration,
    /// Program used to rasterize thumbnails into terminal glyphs.
    pub rasterizer: String,
    pub render_timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadConfig {
    pub save_dir: PathBuf,
    pub settle_delay: Duration,
    pub timeout: Duration,
}

/// Resolved session configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub wallpick_home: PathBuf,
    pub source: SourceConfig,
    pub thumbnails: ThumbnailConfig,
    pub preview: PreviewConfig,
    pub download: DownloadConfig,
    pub request_timeout: Duration,
    pub wallpaper_command: Option<Vec<String>>,
    /// Parent of the per-session thumbnail directories.
    pub cache_root: PathBuf,
}

impl Config {
    /// Loads `config_path` (or `<wallpick_home>/config.toml`). A missing file
    /// yields the defaults; a file that fails to parse is an error.
    pub fn load(wallpick_home: PathBuf, config_path: Option<&Path>) -> Result<Self> {
        let path = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| wallpick_home.join(CONFIG_TOML_FILE));
        let toml = load_config_toml(&path)?;
        Ok(Self::from_toml(toml, wallpick_home))
    }

    pub fn from_toml(toml: ConfigToml, wallpick_home: PathBuf) -> Self {
        let source = toml.source.unwrap_or_default();
        let thumbnails = toml.thumbnails.unwrap_or_default();
        let preview = toml.preview.unwrap_or_default();
        let download = toml.download.unwrap_or_default();
        let network = toml.network.unwrap_or_default();
        let wallpaper = toml.wallpaper.unwrap_or_default();

        let proxy_url = match thumbnails.proxy_url {
            Some(url) if url.trim().is_empty() => None,
            Some(url) => Some(url),
            None => Some(DEFAULT_PROXY_URL.to_string()),
        };

        Self {
            wallpick_home,
            source: SourceConfig {
                owner: source.owner.unwrap_or_else(|| DEFAULT_OWNER.to_string()),
                repo: source.repo.unwrap_or_else(|| DEFAULT_REPO.to_string()),
                branch: source.branch.unwrap_or_else(|| DEFAULT_BRANCH.to_string()),
                folder: source
                    .folder
                    .map(|folder| folder.trim_matches('/').to_string())
                    .unwrap_or_default(),
                api_base_url: trim_base_url(source.api_base_url, DEFAULT_API_BASE_URL),
                raw_base_url: trim_base_url(source.raw_base_url, DEFAULT_RAW_BASE_URL),
            },
            thumbnails: ThumbnailConfig {
                proxy_url,
                width: thumbnails.width.unwrap_or(DEFAULT_THUMBNAIL_WIDTH).max(1),
                quality: thumbnails
                    .quality
                    .unwrap_or(DEFAULT_THUMBNAIL_QUALITY)
                    .clamp(1, 100),
            },
            preview: PreviewConfig {
                debounce: Duration::from_millis(preview.debounce_ms.unwrap_or(DEFAULT_DEBOUNCE_MS)),
                rasterizer: preview
                    .rasterizer
                    .unwrap_or_else(|| DEFAULT_RASTERIZER.to_string()),
                render_timeout: Duration::from_secs(
                    preview
                        .render_timeout_secs
                        .unwrap_or(DEFAULT_RENDER_TIMEOUT_SECS)
                        .max(1),
                ),
            },
            download: DownloadConfig {
                save_dir: download
                    .save_dir
                    .map(|dir| expand_home(&dir))
                    .unwrap_or_else(default_save_dir),
                settle_delay: Duration::from_millis(download.settle_ms.unwrap_or(DEFAULT_SETTLE_MS)),
                timeout: Duration::from_secs(
                    download
                        .timeout_secs
                        .unwrap_or(DEFAULT_DOWNLOAD_TIMEOUT_SECS)
                        .max(1),
                ),
            },
            request_timeout: Duration::from_secs(
                network
                    .timeout_secs
                    .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS)
                    .max(1),
            ),
            wallpaper_command: wallpaper.command.filter(|argv| !argv.is_empty()),
            cache_root: std::env::temp_dir(),
        }
    }

    pub fn log_dir(&self) -> PathBuf {
        self.wallpick_home.join("log")
    }
}

fn load_config_toml(path: &Path) -> Result<ConfigToml> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(ConfigToml::default()),
        Err(err) => return Err(err.into()),
    };
    toml::from_str(&contents).map_err(|err| WallpickErr::Config {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })
}

fn trim_base_url(value: Option<String>, default: &str) -> String {
    value
        .unwrap_or_else(|| default.to_string())
        .trim_end_matches('/')
        .to_string()
}

fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

fn default_save_dir() -> PathBuf {
    if let Some(pictures) = dirs::picture_dir() {
        return pictures.join(SAVE_DIRNAME);
    }
    if let Some(home) = home_dir() {
        return home.join("Pictures").join(SAVE_DIRNAME);
    }
    PathBuf::from(SAVE_DIRNAME)
}

/// Returns the wallpick configuration directory, which can be specified by
/// the `WALLPICK_HOME` environment variable. If not set, defaults to
/// `~/.wallpick`.
///
/// - If `WALLPICK_HOME` is set, the value will be canonicalized and this
///   function will Err if the path does not exist.
/// - If `WALLPICK_HOME` is not set, this function does not verify that the
///   directory exists.
pub fn find_wallpick_home() -> std::io::Result<PathBuf> {
    if let Ok(val) = std::env::var(WALLPICK_HOME_ENV)
        && !val.is_empty()
    {
        return PathBuf::from(val).canonicalize();
    }

    let mut p = home_dir().ok_or_else(|| {
        std::io::Error::new(ErrorKind::NotFound, "Could not find home directory")
    })?;
    p.push(DEFAULT_HOME_DIRNAME);
    Ok(p)
}
