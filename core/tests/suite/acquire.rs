use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;
use std::time::SystemTime;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;
use wallpick_core::Acquirer;
use wallpick_core::CatalogFetcher;
use wallpick_core::RemoteImage;
use wallpick_core::WallpaperSetter;
use wallpick_core::WallpickErr;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;
use wiremock::matchers::method;
use wiremock::matchers::path;

use super::file_entry;
use super::http_client;
use super::test_config;

/// What the setter saw when it was called.
#[derive(Clone, Debug)]
struct ApplyCall {
    path: PathBuf,
    at: SystemTime,
    file_len: u64,
}

/// Records every path it is asked to apply.
#[derive(Default)]
struct RecordingSetter {
    calls: Mutex<Vec<ApplyCall>>,
    failure: Option<String>,
}

impl RecordingSetter {
    fn failing(detail: &str) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failure: Some(detail.to_string()),
        }
    }

    fn calls(&self) -> Vec<ApplyCall> {
        self.calls.lock().unwrap().clone()
    }

    fn applied(&self) -> Vec<PathBuf> {
        self.calls().into_iter().map(|call| call.path).collect()
    }
}

#[async_trait]
impl WallpaperSetter for RecordingSetter {
    fn name(&self) -> &str {
        "recording"
    }

    async fn apply(&self, path: &Path) -> Result<(), String> {
        let file_len = std::fs::metadata(path).map(|meta| meta.len()).unwrap_or(0);
        self.calls.lock().unwrap().push(ApplyCall {
            path: path.to_path_buf(),
            at: SystemTime::now(),
            file_len,
        });
        match &self.failure {
            Some(detail) => Err(detail.clone()),
            None => Ok(()),
        }
    }
}

fn image(server: &MockServer, name: &str) -> RemoteImage {
    RemoteImage {
        name: name.to_string(),
        size_bytes: 4,
        download_url: format!("{}/files/{name}", server.uri()),
        thumbnail_url: format!("{}/thumbs/{name}", server.uri()),
    }
}

async fn serve_file(server: &MockServer, name: &str, body: &[u8]) {
    Mock::given(method("GET"))
        .and(path(format!("/files/{name}")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .mount(server)
        .await;
}

#[tokio::test]
async fn downloads_then_applies_absolute_path() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    serve_file(&server, "a.png", b"full-resolution").await;

    let home = TempDir::new()?;
    let save_dir = home.path().join("Pictures");
    let config = test_config(&server.uri(), home.path(), &save_dir);
    let setter = Arc::new(RecordingSetter::default());
    let acquirer = Acquirer::new(http_client(), &config.download, setter.clone());

    let result = acquirer.acquire_and_apply(&image(&server, "a.png")).await?;

    let expected = std::path::absolute(save_dir.join("a.png"))?;
    assert_eq!(result.saved_path, expected);
    assert!(result.wallpaper_applied);
    assert_eq!(result.error_detail, None);
    assert_eq!(std::fs::read(&expected)?, b"full-resolution");
    assert_eq!(setter.applied(), vec![expected]);
    assert!(!save_dir.join("a.png.part").exists());
    Ok(())
}

#[tokio::test]
async fn apply_failure_keeps_the_download() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    serve_file(&server, "a.png", b"bytes").await;

    let home = TempDir::new()?;
    let config = test_config(&server.uri(), home.path(), home.path());
    let setter = Arc::new(RecordingSetter::failing("feh: not installed"));
    let acquirer = Acquirer::new(http_client(), &config.download, setter.clone());

    let result = acquirer.acquire_and_apply(&image(&server, "a.png")).await?;

    assert!(!result.wallpaper_applied);
    assert_eq!(result.error_detail.as_deref(), Some("feh: not installed"));
    assert!(result.saved_path.is_file());
    assert_eq!(std::fs::metadata(&result.saved_path)?.len(), 5);
    assert_eq!(std::fs::read(&result.saved_path)?, b"bytes");
    assert_eq!(setter.applied().len(), 1);
    Ok(())
}

#[tokio::test]
async fn apply_waits_for_the_settle_delay() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    serve_file(&server, "a.png", b"full-resolution").await;

    let home = TempDir::new()?;
    let mut config = test_config(&server.uri(), home.path(), home.path());
    let settle = Duration::from_millis(300);
    config.download.settle_delay = settle;
    let setter = Arc::new(RecordingSetter::default());
    let acquirer = Acquirer::new(http_client(), &config.download, setter.clone());

    let result = acquirer.acquire_and_apply(&image(&server, "a.png")).await?;

    let calls = setter.calls();
    assert_eq!(calls.len(), 1);
    let call = &calls[0];
    assert_eq!(call.file_len, 15);
    let finished_writing = std::fs::metadata(&result.saved_path)?.modified()?;
    let waited = call.at.duration_since(finished_writing)?;
    assert!(waited >= settle, "applied {waited:?} after the download finished");
    Ok(())
}

#[tokio::test]
async fn download_failure_never_applies() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files/a.png"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let home = TempDir::new()?;
    let save_dir = home.path().join("out");
    let config = test_config(&server.uri(), home.path(), &save_dir);
    let setter = Arc::new(RecordingSetter::default());
    let acquirer = Acquirer::new(http_client(), &config.download, setter.clone());

    let err = acquirer
        .acquire_and_apply(&image(&server, "a.png"))
        .await
        .expect_err("404 is a download failure");

    assert!(matches!(err, WallpickErr::DownloadFailed { ref name, .. } if name == "a.png"));
    assert_eq!(setter.applied(), Vec::<PathBuf>::new());
    assert!(!save_dir.join("a.png").exists());
    assert!(!save_dir.join("a.png.part").exists());
    Ok(())
}

#[tokio::test]
async fn empty_body_is_a_download_failure() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    serve_file(&server, "a.png", b"").await;

    let home = TempDir::new()?;
    let config = test_config(&server.uri(), home.path(), home.path());
    let acquirer = Acquirer::new(
        http_client(),
        &config.download,
        Arc::new(RecordingSetter::default()),
    );

    let err = acquirer
        .download(&image(&server, "a.png"))
        .await
        .expect_err("empty body");
    assert!(matches!(err, WallpickErr::DownloadFailed { .. }));
    assert!(!home.path().join("a.png").exists());
    Ok(())
}

#[tokio::test]
async fn confirming_second_catalog_entry_saves_it() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let uri = server.uri();
    Mock::given(method("GET"))
        .and(path("/repos/someone/walls/contents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            file_entry(&uri, "a.png", 1024),
            file_entry(&uri, "b.jpg", 2048),
        ])))
        .mount(&server)
        .await;
    serve_file(&server, "b.jpg", b"second image").await;

    let home = TempDir::new()?;
    let save_dir = home.path().join("saved");
    let config = test_config(&uri, home.path(), &save_dir);
    let catalog = CatalogFetcher::new(
        http_client(),
        config.source.clone(),
        config.thumbnails.clone(),
        config.request_timeout,
    )
    .list_images()
    .await;
    assert_eq!(catalog.len(), 2);

    let setter = Arc::new(RecordingSetter::default());
    let acquirer = Acquirer::new(http_client(), &config.download, setter.clone());
    let result = acquirer.acquire_and_apply(&catalog[1]).await?;

    let expected = std::path::absolute(save_dir.join("b.jpg"))?;
    assert_eq!(result.saved_path, expected);
    assert_eq!(std::fs::read(&expected)?, b"second image");
    assert_eq!(setter.applied(), vec![expected]);
    Ok(())
}
