use std::sync::Arc;

use pretty_assertions::assert_eq;
use tempfile::TempDir;
use wallpick_core::PreviewCache;
use wallpick_core::RemoteImage;
use wallpick_core::WallpickErr;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;
use wiremock::matchers::method;
use wiremock::matchers::path;

use super::http_client;

fn image(server: &MockServer, name: &str) -> RemoteImage {
    RemoteImage {
        name: name.to_string(),
        size_bytes: 10,
        download_url: format!("{}/files/{name}", server.uri()),
        thumbnail_url: format!("{}/thumbs/{name}", server.uri()),
    }
}

fn cache(dir: &TempDir) -> PreviewCache {
    PreviewCache::new(
        http_client(),
        dir.path().join("thumbs"),
        std::time::Duration::from_secs(5),
    )
}

#[tokio::test]
async fn second_request_for_same_name_is_served_from_cache() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/thumbs/a.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"thumbnail-bytes".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new()?;
    let cache = cache(&dir);
    let image = image(&server, "a.png");

    let first = cache.ensure_thumbnail(&image).await?;
    let second = cache.ensure_thumbnail(&image).await?;

    assert_eq!(first, second);
    assert_eq!(first, dir.path().join("thumbs").join("a.png"));
    assert_eq!(std::fs::read(&first)?, b"thumbnail-bytes");
    assert_eq!(cache.cached_path("a.png").await, Some(first));
    Ok(())
}

#[tokio::test]
async fn concurrent_requests_fetch_once() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/thumbs/a.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"thumbnail-bytes".to_vec())
                .set_delay(std::time::Duration::from_millis(50)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new()?;
    let cache = Arc::new(cache(&dir));
    let image = image(&server, "a.png");

    let (first, second) = tokio::join!(
        cache.ensure_thumbnail(&image),
        cache.ensure_thumbnail(&image)
    );
    assert_eq!(first?, second?);
    Ok(())
}

#[tokio::test]
async fn failed_fetch_leaves_no_entry_or_file() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/thumbs/a.png"))
        .respond_with(ResponseTemplate::new(404))
        .expect(2)
        .mount(&server)
        .await;

    let dir = TempDir::new()?;
    let cache = cache(&dir);
    let image = image(&server, "a.png");

    let err = cache
        .ensure_thumbnail(&image)
        .await
        .expect_err("404 is a fetch failure");
    assert!(matches!(err, WallpickErr::ThumbnailFetchFailed { ref name, .. } if name == "a.png"));
    assert_eq!(cache.cached_path("a.png").await, None);
    assert!(!dir.path().join("thumbs").join("a.png").exists());

    // Nothing was registered, so the next request goes back to the network.
    assert!(cache.ensure_thumbnail(&image).await.is_err());
    Ok(())
}

#[tokio::test]
async fn different_names_are_cached_separately() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    for name in ["a.png", "b.jpg"] {
        Mock::given(method("GET"))
            .and(path(format!("/thumbs/{name}")))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(name.as_bytes().to_vec()))
            .expect(1)
            .mount(&server)
            .await;
    }

    let dir = TempDir::new()?;
    let cache = cache(&dir);

    let a = cache.ensure_thumbnail(&image(&server, "a.png")).await?;
    let b = cache.ensure_thumbnail(&image(&server, "b.jpg")).await?;

    assert_eq!(std::fs::read(a)?, b"a.png");
    assert_eq!(std::fs::read(b)?, b"b.jpg");
    Ok(())
}

#[tokio::test]
async fn concurrent_sessions_keep_separate_directories() -> anyhow::Result<()> {
    let first_server = MockServer::start().await;
    let second_server = MockServer::start().await;
    for (server, body) in [(&first_server, "first"), (&second_server, "second")] {
        Mock::given(method("GET"))
            .and(path("/thumbs/a.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.as_bytes().to_vec()))
            .expect(1)
            .mount(server)
            .await;
    }

    let root = TempDir::new()?;
    let timeout = std::time::Duration::from_secs(5);
    let first = PreviewCache::for_session(http_client(), root.path(), timeout)?;
    let second = PreviewCache::for_session(http_client(), root.path(), timeout)?;

    let first_image = image(&first_server, "a.png");
    let second_image = image(&second_server, "a.png");
    let (first_path, second_path) = tokio::join!(
        first.ensure_thumbnail(&first_image),
        second.ensure_thumbnail(&second_image)
    );
    let (first_path, second_path) = (first_path?, second_path?);

    assert_ne!(first_path, second_path);
    assert!(first_path.starts_with(root.path()));
    assert_eq!(std::fs::read(&first_path)?, b"first");
    assert_eq!(std::fs::read(&second_path)?, b"second");

    let session_dir = first_path.parent().map(std::path::Path::to_path_buf);
    drop(first);
    assert!(!first_path.exists());
    assert!(session_dir.is_some_and(|dir| !dir.exists()));
    assert!(second_path.is_file());
    Ok(())
}

#[tokio::test]
async fn slow_fetch_does_not_block_other_names() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/thumbs/slow.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"slow".to_vec())
                .set_delay(std::time::Duration::from_secs(2)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/thumbs/fast.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"fast".to_vec()))
        .mount(&server)
        .await;

    let dir = TempDir::new()?;
    let cache = Arc::new(cache(&dir));
    let slow = {
        let cache = Arc::clone(&cache);
        let image = image(&server, "slow.png");
        tokio::spawn(async move { cache.ensure_thumbnail(&image).await })
    };
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    let fast = tokio::time::timeout(
        std::time::Duration::from_secs(1),
        cache.ensure_thumbnail(&image(&server, "fast.png")),
    )
    .await
    .expect("fast.png should not wait for slow.png")?;

    assert_eq!(std::fs::read(fast)?, b"fast");
    assert_eq!(cache.cached_path("slow.png").await, None);
    slow.await??;
    Ok(())
}
