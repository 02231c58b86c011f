use std::time::Duration;

use serde::Deserialize;
use tracing::info;
use tracing::instrument;
use tracing::warn;
use url::Url;

use crate::config::SourceConfig;
use crate::config::ThumbnailConfig;
use crate::error::Result;
use crate::error::WallpickErr;
use crate::http::describe;

/// Extensions shown in the catalog, matched case-insensitively.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

/// One entry of the remote collection. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteImage {
    /// Unique within a listing; used as the cache and save key.
    pub name: String,
    pub size_bytes: u64,
    /// Full-resolution asset.
    pub download_url: String,
    pub thumbnail_url: String,
}

impl RemoteImage {
    /// Size in megabytes with two decimals, e.g. `"2.35 MB"`.
    pub fn display_size(&self) -> String {
        format!("{:.2} MB", self.size_bytes as f64 / 1024.0 / 1024.0)
    }
}

/// Shape of one object in the directory listing response. Unknown fields are
/// ignored.
#[derive(Debug, Deserialize)]
struct ListingEntry {
    #[serde(rename = "type")]
    kind: String,
    name: String,
    #[serde(default)]
    size: u64,
    download_url: Option<String>,
}

pub fn is_supported_image(name: &str) -> bool {
    let Some((_, ext)) = name.rsplit_once('.') else {
        return false;
    };
    IMAGE_EXTENSIONS
        .iter()
        .any(|allowed| ext.eq_ignore_ascii_case(allowed))
}

pub fn listing_url(source: &SourceConfig) -> Result<Url> {
    let mut url = parse_base(&source.api_base_url)?;
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|()| WallpickErr::ListingFailed("API base URL cannot be a base".to_string()))?;
        segments
            .pop_if_empty()
            .extend(["repos", source.owner.as_str(), source.repo.as_str(), "contents"]);
        segments.extend(source.folder.split('/').filter(|part| !part.is_empty()));
    }
    url.query_pairs_mut().append_pair("ref", &source.branch);
    Ok(url)
}

/// Raw-content URL of `name`, built from the fixed remote coordinates.
pub fn raw_url(source: &SourceConfig, name: &str) -> Result<Url> {
    let mut url = parse_base(&source.raw_base_url)?;
    {
        let mut segments = url.path_segments_mut().map_err(|()| {
            WallpickErr::ListingFailed("raw content URL cannot be a base".to_string())
        })?;
        segments
            .pop_if_empty()
            .extend([&source.owner, &source.repo, &source.branch]);
        segments.extend(source.folder.split('/').filter(|part| !part.is_empty()));
        segments.push(name);
    }
    Ok(url)
}

/// Thumbnail URL of `name`: the raw URL, passed through the resize proxy
/// when one is configured.
pub fn thumbnail_url(
    source: &SourceConfig,
    thumbnails: &ThumbnailConfig,
    name: &str,
) -> Result<String> {
    let raw = raw_url(source, name)?;
    let Some(proxy) = thumbnails.proxy_url.as_deref() else {
        return Ok(raw.into());
    };
    let width = thumbnails.width.to_string();
    let quality = thumbnails.quality.to_string();
    let url = Url::parse_with_params(
        proxy,
        [
            ("url", raw.as_str()),
            ("w", width.as_str()),
            ("q", quality.as_str()),
        ],
    )
    .map_err(|err| WallpickErr::ListingFailed(format!("invalid proxy URL `{proxy}`: {err}")))?;
    Ok(url.into())
}

fn parse_base(base: &str) -> Result<Url> {
    Url::parse(base).map_err(|err| WallpickErr::ListingFailed(format!("invalid URL `{base}`: {err}")))
}

/// Fetches the catalog once per session.
#[derive(Debug, Clone)]
pub struct CatalogFetcher {
    http: reqwest::Client,
    source: SourceConfig,
    thumbnails: ThumbnailConfig,
    timeout: Duration,
}

impl CatalogFetcher {
    pub fn new(
        http: reqwest::Client,
        source: SourceConfig,
        thumbnails: ThumbnailConfig,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            source,
            thumbnails,
            timeout,
        }
    }

    /// Returns the images in the order the endpoint supplied them. Any
    /// transport or parse failure is logged and yields an empty catalog.
    #[instrument(skip_all)]
    pub async fn list_images(&self) -> Vec<RemoteImage> {
        match self.try_list_images().await {
            Ok(images) => {
                info!(
                    count = images.len(),
                    source = %self.source.display_name(),
                    "catalog loaded"
                );
                images
            }
            Err(err) => {
                warn!("treating catalog as empty: {err}");
                Vec::new()
            }
        }
    }

    async fn try_list_images(&self) -> Result<Vec<RemoteImage>> {
        let url = listing_url(&self.source)?;
        let response = self
            .http
            .get(url)
            .header("Accept", "application/vnd.github+json")
            .timeout(self.timeout)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|err| WallpickErr::ListingFailed(describe(&err)))?;
        let body = response
            .bytes()
            .await
            .map_err(|err| WallpickErr::ListingFailed(describe(&err)))?;
        let entries: Vec<ListingEntry> = serde_json::from_slice(&body)
            .map_err(|err| WallpickErr::ListingFailed(format!("unexpected listing body: {err}")))?;
        self.filter_listing(entries)
    }

    fn filter_listing(&self, entries: Vec<ListingEntry>) -> Result<Vec<RemoteImage>> {
        let mut images = Vec::new();
        for entry in entries {
            if entry.kind != "file" || !is_supported_image(&entry.name) {
                continue;
            }
            let download_url = match entry.download_url {
                Some(url) => url,
                None => raw_url(&self.source, &entry.name)?.into(),
            };
            let thumbnail_url = thumbnail_url(&self.source, &self.thumbnails, &entry.name)?;
            images.push(RemoteImage {
                name: entry.name,
                size_bytes: entry.size,
                download_url,
                thumbnail_url,
            });
        }
        Ok(images)
    }
}
