use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;
use wallpick_core::CatalogFetcher;
use wallpick_core::Config;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;
use wiremock::matchers::header_exists;
use wiremock::matchers::method;
use wiremock::matchers::path;
use wiremock::matchers::query_param;

use super::dir_entry;
use super::file_entry;
use super::http_client;
use super::test_config;

fn fetcher(config: &Config) -> CatalogFetcher {
    CatalogFetcher::new(
        http_client(),
        config.source.clone(),
        config.thumbnails.clone(),
        config.request_timeout,
    )
}

#[tokio::test]
async fn keeps_image_files_in_endpoint_order() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let uri = server.uri();
    let home = TempDir::new()?;
    let config = test_config(&uri, home.path(), home.path());

    Mock::given(method("GET"))
        .and(path("/repos/someone/walls/contents"))
        .and(query_param("ref", "main"))
        .and(header_exists("user-agent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            file_entry(&uri, "zebra.PNG", 2048),
            file_entry(&uri, "README.md", 10),
            dir_entry("nested.png"),
            file_entry(&uri, "alpha.jpg", 1024),
            file_entry(&uri, "notes.txt", 5),
            file_entry(&uri, "mid.webp", 4096),
            file_entry(&uri, "photo.JPEG", 512),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let images = fetcher(&config).list_images().await;

    let names: Vec<&str> = images.iter().map(|image| image.name.as_str()).collect();
    assert_eq!(names, vec!["zebra.PNG", "alpha.jpg", "mid.webp", "photo.JPEG"]);
    assert_eq!(images[1].size_bytes, 1024);
    assert_eq!(images[1].download_url, format!("{uri}/files/alpha.jpg"));
    assert_eq!(
        images[1].thumbnail_url,
        format!("{uri}/raw/someone/walls/main/alpha.jpg")
    );
    Ok(())
}

#[tokio::test]
async fn server_error_yields_empty_catalog() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let home = TempDir::new()?;
    let config = test_config(&server.uri(), home.path(), home.path());

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403).set_body_string("rate limited"))
        .mount(&server)
        .await;

    assert_eq!(fetcher(&config).list_images().await, Vec::new());
    Ok(())
}

#[tokio::test]
async fn unexpected_body_yields_empty_catalog() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let home = TempDir::new()?;
    let config = test_config(&server.uri(), home.path(), home.path());

    // A single-file path returns an object instead of an array.
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Not Found",
        })))
        .mount(&server)
        .await;

    assert_eq!(fetcher(&config).list_images().await, Vec::new());
    Ok(())
}

#[tokio::test]
async fn unreachable_endpoint_yields_empty_catalog() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let uri = server.uri();
    drop(server);
    let home = TempDir::new()?;
    let config = test_config(&uri, home.path(), home.path());

    assert_eq!(fetcher(&config).list_images().await, Vec::new());
    Ok(())
}

#[tokio::test]
async fn listing_without_images_is_empty() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let uri = server.uri();
    let home = TempDir::new()?;
    let config = test_config(&uri, home.path(), home.path());

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            file_entry(&uri, "LICENSE", 100),
            dir_entry("archive"),
        ])))
        .mount(&server)
        .await;

    assert_eq!(fetcher(&config).list_images().await, Vec::new());
    Ok(())
}
