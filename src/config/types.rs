use serde::Deserialize;

/// Browser user agent sent with page and image requests unless overridden
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Main configuration structure for webkeep
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub storage: StorageConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(rename = "remote-service", default)]
    pub remote_service: Option<RemoteServiceConfig>,
    #[serde(default)]
    pub serving: ServingConfig,
    /// Ordered crawler rules; the first matching pattern wins
    #[serde(default)]
    pub crawlers: Vec<CrawlerRule>,
}

/// Where documents and the catalog live
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Root directory under which `category/host/hash8` directories are created
    pub root: String,

    /// Path to the SQLite catalog database
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Write `image_mapping.json` next to each captured document
    #[serde(rename = "write-image-mapping", default = "default_true")]
    pub write_image_mapping: bool,
}

/// HTTP client behavior
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Timeout for the page fetch (seconds)
    #[serde(rename = "page-timeout-secs", default = "default_page_timeout")]
    pub page_timeout_secs: u64,

    /// Timeout for each image fetch (seconds)
    #[serde(rename = "image-timeout-secs", default = "default_image_timeout")]
    pub image_timeout_secs: u64,

    /// Width of the image download pool
    #[serde(
        rename = "max-concurrent-downloads",
        default = "default_max_concurrent_downloads"
    )]
    pub max_concurrent_downloads: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            page_timeout_secs: default_page_timeout(),
            image_timeout_secs: default_image_timeout(),
            max_concurrent_downloads: default_max_concurrent_downloads(),
        }
    }
}

/// Firecrawl-compatible scraping API used by the remote crawler
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteServiceConfig {
    #[serde(default = "default_remote_endpoint")]
    pub endpoint: String,

    /// API key given inline
    #[serde(rename = "api-key", default)]
    pub api_key: Option<String>,

    /// Environment variable holding the API key
    #[serde(rename = "api-key-env", default = "default_api_key_env")]
    pub api_key_env: String,
}

impl Default for RemoteServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: default_remote_endpoint(),
            api_key: None,
            api_key_env: default_api_key_env(),
        }
    }
}

impl RemoteServiceConfig {
    /// Returns the inline key, or the key from the configured environment variable
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(&self.api_key_env).ok())
            .filter(|key| !key.trim().is_empty())
    }
}

/// How stored documents are exposed for display
#[derive(Debug, Clone, Deserialize)]
pub struct ServingConfig {
    /// Route prefix that serves files from the storage root
    #[serde(default = "default_route")]
    pub route: String,
}

impl Default for ServingConfig {
    fn default() -> Self {
        Self {
            route: default_route(),
        }
    }
}

/// A domain pattern bound to a crawler type tag
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerRule {
    /// Glob such as `*.medium.com`; `*` is a wildcard, dots are literal
    pub domain: String,

    /// Crawler type tag (`default`, `remote`, `firecrawl`)
    #[serde(rename = "type", default = "default_crawler_type")]
    pub crawler_type: String,
}

fn default_true() -> bool {
    true
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_page_timeout() -> u64 {
    30
}

fn default_image_timeout() -> u64 {
    10
}

fn default_max_concurrent_downloads() -> usize {
    4
}

fn default_remote_endpoint() -> String {
    "https://api.firecrawl.dev/v1/scrape".to_string()
}

fn default_api_key_env() -> String {
    "FIRECRAWL_API_KEY".to_string()
}

fn default_route() -> String {
    "/files".to_string()
}

fn default_crawler_type() -> String {
    "default".to_string()
}
