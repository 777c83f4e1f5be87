//! webkeep: capture web pages as self-contained Markdown
//!
//! This crate fetches a page, converts it to Markdown, downloads the images it
//! references into a content-addressed local directory, and rewrites the
//! Markdown so it points at those local copies. Documents are filed under a
//! deterministic `root/category/host/hash8` directory.

pub mod config;
pub mod crawler;
pub mod images;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for webkeep operations
#[derive(Debug, Error)]
pub enum WebkeepError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("HTML conversion error for {url}: {message}")]
    HtmlParse { url: String, message: String },

    #[error("Remote scraping service error: {0}")]
    RemoteService(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid domain pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Result type alias for webkeep operations
pub type Result<T> = std::result::Result<T, WebkeepError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlResult, CrawlerDispatcher, CrawlerKind, Coordinator};
pub use images::{ImageDownloader, ImageExtractor};
pub use storage::{DocumentStore, PathResolver, SqliteStorage, StoragePath};
pub use url::resolve_reference;
