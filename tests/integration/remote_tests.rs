use crate::common::{create_coordinator, create_test_config, rule};
use serde_json::json;
use std::fs;
use tempfile::TempDir;
use webkeep::config::{Config, RemoteServiceConfig};
use webkeep::crawler::CrawlerKind;
use webkeep::images::image_filename;
use webkeep::storage::DocumentStore;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn remote_config(root: &std::path::Path, server: &MockServer) -> Config {
    let mut config = create_test_config(root);
    config.remote_service = Some(RemoteServiceConfig {
        endpoint: format!("{}/v1/scrape", server.uri()),
        api_key: Some("test-key".to_string()),
        ..Default::default()
    });
    config.crawlers = vec![rule("127.0.0.1", "firecrawl")];
    config
}

#[tokio::test]
async fn test_remote_capture() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();
    let dir = TempDir::new().unwrap();
    let url = format!("{}/article", base);

    Mock::given(method("POST"))
        .and(path("/v1/scrape"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "url": url,
            "formats": ["markdown", "links"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {
                "markdown": "# Article\n\n![diagram](/img/diagram.png)\n\nSee ![logo][l].\n\n[l]: //127.0.0.1/unreachable.png",
                "links": [format!("{}/next", base)],
                "metadata": { "title": "Remote Article" }
            }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/img/diagram.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"PNG".to_vec())
                .insert_header("content-type", "image/png"),
        )
        .mount(&mock_server)
        .await;

    let config = remote_config(dir.path(), &mock_server);
    let mut coordinator = create_coordinator(&config);
    assert_eq!(
        coordinator.dispatcher().kind_for(&url),
        CrawlerKind::RemoteService
    );

    let result = coordinator.capture(&url, None).await;

    assert!(result.success, "capture failed: {}", result.message);
    assert_eq!(result.title, "Remote Article");
    assert_eq!(result.link_urls, vec![format!("{}/next", base)]);
    assert_eq!(
        result.image_urls,
        vec![
            format!("{}/img/diagram.png", base),
            "https://127.0.0.1/unreachable.png".to_string()
        ]
    );

    let local = format!(
        "images/{}",
        image_filename(&format!("{}/img/diagram.png", base), None)
    );
    assert!(result.markdown.contains(&format!("![diagram]({})", local)));
    // The reference definition could not be fetched and stays remote
    assert!(result.markdown.contains("[l]: //127.0.0.1/unreachable.png"));

    let doc_path = coordinator.store().resolve_path(&url, None).unwrap();
    assert_eq!(fs::read_to_string(doc_path.raw_content_path()).unwrap(), "");
    assert_eq!(fs::read(doc_path.dir().join(&local)).unwrap(), b"PNG");
}

#[tokio::test]
async fn test_remote_service_error() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let url = format!("{}/article", mock_server.uri());

    Mock::given(method("POST"))
        .and(path("/v1/scrape"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "success": false,
            "error": "Rate limit exceeded"
        })))
        .mount(&mock_server)
        .await;

    let config = remote_config(dir.path(), &mock_server);
    let mut coordinator = create_coordinator(&config);

    let result = coordinator.capture(&url, None).await;

    assert!(!result.success);
    assert!(
        result.message.contains("Rate limit exceeded"),
        "message: {}",
        result.message
    );
    assert!(coordinator.store().get_document(&url).unwrap().is_none());
}

#[tokio::test]
async fn test_malformed_remote_response() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let url = format!("{}/article", mock_server.uri());

    Mock::given(method("POST"))
        .and(path("/v1/scrape"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&mock_server)
        .await;

    let config = remote_config(dir.path(), &mock_server);
    let mut coordinator = create_coordinator(&config);

    let result = coordinator.capture(&url, None).await;

    assert!(!result.success);
    assert!(result.message.starts_with("Error crawling"));
}

#[tokio::test]
async fn test_missing_api_key_falls_back_to_default() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let url = format!("{}/article", mock_server.uri());

    Mock::given(method("GET"))
        .and(path("/article"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><body><h1>Local</h1></body></html>")
                .insert_header("content-type", "text/html"),
        )
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(dir.path());
    config.remote_service = Some(RemoteServiceConfig {
        endpoint: format!("{}/v1/scrape", mock_server.uri()),
        api_key: None,
        api_key_env: "WEBKEEP_TEST_MISSING_KEY".to_string(),
    });
    config.crawlers = vec![rule("127.0.0.1", "remote")];
    let mut coordinator = create_coordinator(&config);

    assert_eq!(coordinator.dispatcher().kind_for(&url), CrawlerKind::Default);

    let result = coordinator.capture(&url, None).await;
    assert!(result.success);
    assert_eq!(result.title, "Local");
}
