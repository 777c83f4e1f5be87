use std::path::Path;
use webkeep::config::{Config, CrawlerRule, HttpConfig, ServingConfig, StorageConfig};
use webkeep::crawler::Coordinator;
use webkeep::storage::{PathResolver, SqliteStorage};

/// Creates a test configuration storing documents under `root`
pub fn create_test_config(root: &Path) -> Config {
    Config {
        storage: StorageConfig {
            root: root.to_string_lossy().into_owned(),
            database_path: root.join("documents.db").to_string_lossy().into_owned(),
            write_image_mapping: true,
        },
        http: HttpConfig {
            page_timeout_secs: 5,
            image_timeout_secs: 5,
            ..HttpConfig::default()
        },
        remote_service: None,
        serving: ServingConfig::default(),
        crawlers: vec![],
    }
}

pub fn rule(domain: &str, crawler_type: &str) -> CrawlerRule {
    CrawlerRule {
        domain: domain.to_string(),
        crawler_type: crawler_type.to_string(),
    }
}

/// Builds a pipeline over an in-memory catalog
pub fn create_coordinator(config: &Config) -> Coordinator<SqliteStorage> {
    let storage =
        SqliteStorage::new_in_memory(PathResolver::new(&config.storage.root)).expect("storage");
    Coordinator::from_config(config, storage).expect("coordinator")
}

pub fn html_page(title: &str, body: &str) -> String {
    format!(
        "<html><head><title>{}</title></head><body>{}</body></html>",
        title, body
    )
}
