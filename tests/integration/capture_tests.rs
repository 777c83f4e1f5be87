use crate::common::{create_coordinator, create_test_config, html_page, rule};
use std::fs;
use std::time::Duration;
use tempfile::TempDir;
use webkeep::crawler::CrawlerKind;
use webkeep::images::image_filename;
use webkeep::storage::DocumentStore;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_html(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html; charset=utf-8"),
        )
        .mount(server)
        .await;
}

async fn mount_image(server: &MockServer, route: &str, content_type: &str, bytes: &[u8]) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(bytes.to_vec())
                .insert_header("content-type", content_type),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_capture_with_one_failed_image() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();
    let dir = TempDir::new().unwrap();

    let page = html_page(
        "Images",
        r#"<h1>Gallery</h1>
        <p>Read <a href="/about">about us</a>.</p>
        <img src="/img/a.png" alt="A">
        <img src="img/b.jpg" alt="B">
        <img src="/img/missing.png" alt="Missing">
        <img src="/img/a.png" alt="A again">"#,
    );
    mount_html(&mock_server, "/blog/post", page.clone()).await;
    mount_image(&mock_server, "/img/a.png", "image/png", b"PNG-A").await;
    mount_image(&mock_server, "/blog/img/b.jpg", "image/jpeg", b"JPG-B").await;
    Mock::given(method("GET"))
        .and(path("/img/missing.png"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let config = create_test_config(dir.path());
    let mut coordinator = create_coordinator(&config);
    let url = format!("{}/blog/post", base);

    let result = coordinator.capture(&url, None).await;

    assert!(result.success, "capture failed: {}", result.message);
    assert!(result.doc_id.is_some());
    assert_eq!(result.title, "Images");
    assert_eq!(result.image_urls.len(), 4);
    assert!(result.link_urls.contains(&format!("{}/about", base)));

    let a_local = format!("images/{}", image_filename(&format!("{}/img/a.png", base), None));
    let b_local = format!(
        "images/{}",
        image_filename(&format!("{}/blog/img/b.jpg", base), None)
    );

    let doc_path = coordinator.store().resolve_path(&url, None).unwrap();
    let markdown = fs::read_to_string(doc_path.markdown_path()).unwrap();
    assert_eq!(markdown, result.markdown);

    // Both spellings of a.png point at the same local file
    assert_eq!(markdown.matches(&a_local).count(), 2);
    assert!(markdown.contains(&b_local));
    // The failed image keeps its remote URL
    assert!(markdown.contains(&format!("{}/img/missing.png", base)));
    assert!(markdown.contains(&format!("({}/about)", base)));

    assert_eq!(fs::read(doc_path.dir().join(&a_local)).unwrap(), b"PNG-A");
    assert_eq!(fs::read(doc_path.dir().join(&b_local)).unwrap(), b"JPG-B");
    assert_eq!(fs::read_dir(doc_path.images_dir()).unwrap().count(), 2);

    assert_eq!(fs::read_to_string(doc_path.raw_content_path()).unwrap(), page);

    let mapping: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(doc_path.image_mapping_path()).unwrap())
            .unwrap();
    let mapping = mapping.as_object().unwrap();
    assert_eq!(mapping.len(), 2);
    assert_eq!(mapping["/img/a.png"], a_local.as_str());
    assert_eq!(mapping["img/b.jpg"], b_local.as_str());
}

#[tokio::test]
async fn test_page_not_found_stores_nothing() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let config = create_test_config(dir.path());
    let mut coordinator = create_coordinator(&config);
    let url = format!("{}/gone", mock_server.uri());

    let result = coordinator.capture(&url, None).await;

    assert!(!result.success);
    assert!(result.message.contains("404"), "message: {}", result.message);
    assert!(result.doc_id.is_none());
    assert!(coordinator.store().list_documents(None).unwrap().is_empty());

    let doc_path = coordinator.store().resolve_path(&url, None).unwrap();
    assert!(!doc_path.markdown_path().exists());
}

#[tokio::test]
async fn test_recapture_reports_existing_document() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_html(&mock_server, "/post", html_page("Post", "<p>Hello</p>")).await;

    let config = create_test_config(dir.path());
    let mut coordinator = create_coordinator(&config);
    let url = format!("{}/post", mock_server.uri());

    let first = coordinator.capture(&url, None).await;
    assert!(first.success);

    let second = coordinator.capture(&url, None).await;
    assert!(!second.success);
    assert_eq!(second.message, "Document already exists");
    assert_eq!(second.doc_id, first.doc_id);
    assert_eq!(coordinator.store().list_documents(None).unwrap().len(), 1);
}

#[tokio::test]
async fn test_recapture_into_other_category_keeps_catalogued_directory() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_html(
        &mock_server,
        "/post",
        html_page("Post", r#"<img src="/a.png" alt="a">"#),
    )
    .await;
    mount_image(&mock_server, "/a.png", "image/png", b"PNG").await;

    let config = create_test_config(dir.path());
    let mut coordinator = create_coordinator(&config);
    let tech = coordinator.store_mut().add_category("Tech").unwrap();
    let url = format!("{}/post", mock_server.uri());

    let first = coordinator.capture(&url, None).await;
    assert!(first.success);

    let second = coordinator.capture(&url, Some(tech)).await;
    assert!(!second.success);
    assert_eq!(second.message, "Document already exists");
    assert_eq!(second.doc_id, first.doc_id);

    assert!(!dir.path().join("tech").exists());

    let document = coordinator.store().get_document(&url).unwrap().unwrap();
    assert_eq!(document.category_id, None);
    let doc_path = coordinator.store().resolve_path(&url, None).unwrap();
    assert_eq!(document.markdown_path, doc_path.markdown_path().to_string_lossy());
    assert!(doc_path.markdown_path().exists());
    assert_eq!(fs::read_dir(doc_path.images_dir()).unwrap().count(), 1);
}

#[tokio::test]
async fn test_page_timeout_stores_nothing() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(html_page("Slow", "<p>late</p>"))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(dir.path());
    config.http.page_timeout_secs = 1;
    let mut coordinator = create_coordinator(&config);
    let url = format!("{}/slow", mock_server.uri());

    let result = coordinator.capture(&url, None).await;

    assert!(!result.success);
    assert!(result.message.contains("timeout"), "message: {}", result.message);
    assert!(result.doc_id.is_none());
    assert!(coordinator.store().get_document(&url).unwrap().is_none());
    let doc_path = coordinator.store().resolve_path(&url, None).unwrap();
    assert!(!doc_path.dir().exists());
}

#[tokio::test]
async fn test_connection_refused_is_a_failure() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path());
    let mut coordinator = create_coordinator(&config);
    let url = "http://127.0.0.1:1/unreachable";

    let result = coordinator.capture(url, None).await;

    assert!(!result.success);
    assert!(
        result.message.starts_with("Failed to download page"),
        "message: {}",
        result.message
    );
    assert!(coordinator.store().list_documents(None).unwrap().is_empty());
}

#[tokio::test]
async fn test_image_timeout_is_skipped() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();
    let dir = TempDir::new().unwrap();

    mount_html(
        &mock_server,
        "/post",
        html_page(
            "Post",
            r#"<img src="/fast.png" alt="fast"><img src="/slow.png" alt="slow">"#,
        ),
    )
    .await;
    mount_image(&mock_server, "/fast.png", "image/png", b"FAST").await;
    Mock::given(method("GET"))
        .and(path("/slow.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"SLOW".to_vec())
                .insert_header("content-type", "image/png")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(dir.path());
    config.http.image_timeout_secs = 1;
    let mut coordinator = create_coordinator(&config);
    let url = format!("{}/post", base);

    let result = coordinator.capture(&url, None).await;

    assert!(result.success, "capture failed: {}", result.message);
    let fast_local = format!(
        "images/{}",
        image_filename(&format!("{}/fast.png", base), None)
    );
    assert!(result.markdown.contains(&fast_local));
    assert!(result.markdown.contains(&format!("({}/slow.png)", base)));

    let doc_path = coordinator.store().resolve_path(&url, None).unwrap();
    assert_eq!(fs::read_dir(doc_path.images_dir()).unwrap().count(), 1);
}

#[tokio::test]
async fn test_category_changes_storage_directory() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_html(&mock_server, "/post", html_page("Post", "<p>Hello</p>")).await;

    let config = create_test_config(dir.path());
    let mut coordinator = create_coordinator(&config);
    let tech = coordinator.store_mut().add_category("Tech Notes").unwrap();
    let url = format!("{}/post", mock_server.uri());

    let result = coordinator.capture(&url, Some(tech)).await;
    assert!(result.success);

    let doc_path = coordinator.store().resolve_path(&url, Some(tech)).unwrap();
    assert_eq!(doc_path.category, "tech_notes");
    assert!(doc_path.dir().starts_with(dir.path().join("tech_notes")));
    assert!(doc_path.markdown_path().exists());
}

#[tokio::test]
async fn test_extension_from_content_type() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();
    let dir = TempDir::new().unwrap();

    mount_html(
        &mock_server,
        "/chart",
        html_page("Chart", r#"<img src="/render?id=7" alt="chart">"#),
    )
    .await;
    mount_image(&mock_server, "/render", "image/webp", b"WEBP").await;

    let config = create_test_config(dir.path());
    let mut coordinator = create_coordinator(&config);
    let url = format!("{}/chart", base);

    let result = coordinator.capture(&url, None).await;
    assert!(result.success);

    let doc_path = coordinator.store().resolve_path(&url, None).unwrap();
    let files: Vec<String> = fs::read_dir(doc_path.images_dir())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(files.len(), 1);
    assert!(files[0].ends_with(".webp"));
    assert!(result.markdown.contains(&format!("images/{}", files[0])));
}

#[tokio::test]
async fn test_render_uses_serving_route() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_html(
        &mock_server,
        "/post",
        html_page("Post", r#"<img src="/a.png" alt="a">"#),
    )
    .await;
    mount_image(&mock_server, "/a.png", "image/png", b"PNG").await;

    let config = create_test_config(dir.path());
    let mut coordinator = create_coordinator(&config);
    let url = format!("{}/post", mock_server.uri());

    assert!(coordinator.capture(&url, None).await.success);

    let doc_path = coordinator.store().resolve_path(&url, None).unwrap();
    let rendered = coordinator.render(&url).unwrap().unwrap();
    let prefix = format!("/files/{}/images/", doc_path.relative_dir());
    assert!(rendered.contains(&prefix), "rendered: {}", rendered);

    assert!(coordinator.render("https://example.com/unknown").unwrap().is_none());
}

#[tokio::test]
async fn test_unknown_crawler_type_uses_default() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_html(&mock_server, "/post", html_page("Fallback", "<p>Body</p>")).await;

    let mut config = create_test_config(dir.path());
    config.crawlers = vec![rule("127.0.0.1", "selenium")];
    let mut coordinator = create_coordinator(&config);
    let url = format!("{}/post", mock_server.uri());

    assert_eq!(coordinator.dispatcher().kind_for(&url), CrawlerKind::Default);

    let result = coordinator.capture(&url, None).await;
    assert!(result.success);
    assert_eq!(result.title, "Fallback");
    assert!(result.markdown.contains("Body"));
}
