use crate::config::types::{Config, HttpConfig, RemoteServiceConfig, ServingConfig, StorageConfig};
use crate::ConfigError;
use url::Url;

const MAX_TIMEOUT_SECS: u64 = 300;
const MAX_CONCURRENT_DOWNLOADS: usize = 32;

/// Validates the entire configuration
///
/// Crawler rules are deliberately absent here: a bad rule degrades to the
/// default crawler when the dispatcher is built instead of failing startup.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_storage_config(&config.storage)?;
    validate_http_config(&config.http)?;
    validate_serving_config(&config.serving)?;
    if let Some(remote) = &config.remote_service {
        validate_remote_service_config(remote)?;
    }
    Ok(())
}

fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.root.trim().is_empty() {
        return Err(ConfigError::Validation(
            "storage root cannot be empty".to_string(),
        ));
    }

    if config.database_path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    validate_timeout("page_timeout_secs", config.page_timeout_secs)?;
    validate_timeout("image_timeout_secs", config.image_timeout_secs)?;

    if config.max_concurrent_downloads < 1 || config.max_concurrent_downloads > MAX_CONCURRENT_DOWNLOADS
    {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_downloads must be between 1 and {}, got {}",
            MAX_CONCURRENT_DOWNLOADS, config.max_concurrent_downloads
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_timeout(name: &str, secs: u64) -> Result<(), ConfigError> {
    if secs < 1 || secs > MAX_TIMEOUT_SECS {
        return Err(ConfigError::Validation(format!(
            "{} must be between 1 and {} seconds, got {}",
            name, MAX_TIMEOUT_SECS, secs
        )));
    }
    Ok(())
}

fn validate_serving_config(config: &ServingConfig) -> Result<(), ConfigError> {
    if !config.route.starts_with('/') {
        return Err(ConfigError::Validation(format!(
            "serving route must start with '/', got '{}'",
            config.route
        )));
    }
    Ok(())
}

fn validate_remote_service_config(config: &RemoteServiceConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.endpoint).map_err(|e| {
        ConfigError::InvalidUrl(format!(
            "Invalid remote-service endpoint '{}': {}",
            config.endpoint, e
        ))
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "remote-service endpoint must be http(s), got '{}'",
            config.endpoint
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_valid_config() -> Config {
        Config {
            storage: StorageConfig {
                root: "./docs".to_string(),
                database_path: "./documents.db".to_string(),
                write_image_mapping: true,
            },
            http: HttpConfig::default(),
            remote_service: None,
            serving: ServingConfig::default(),
            crawlers: vec![],
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&create_valid_config()).is_ok());
    }

    #[test]
    fn test_empty_storage_root() {
        let mut config = create_valid_config();
        config.storage.root = "  ".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_empty_database_path() {
        let mut config = create_valid_config();
        config.storage.database_path = String::new();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_timeout() {
        let mut config = create_valid_config();
        config.http.image_timeout_secs = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_timeout_too_large() {
        let mut config = create_valid_config();
        config.http.page_timeout_secs = 301;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_download_concurrency_bounds() {
        let mut config = create_valid_config();
        config.http.max_concurrent_downloads = 33;
        assert!(validate(&config).is_err());

        config.http.max_concurrent_downloads = 32;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_serving_route_must_be_absolute() {
        let mut config = create_valid_config();
        config.serving.route = "files".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_remote_endpoint_must_parse() {
        let mut config = create_valid_config();
        config.remote_service = Some(RemoteServiceConfig {
            endpoint: "not a url".to_string(),
            api_key: None,
            api_key_env: "WEBKEEP_TEST_KEY".to_string(),
        });
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));
    }

    #[test]
    fn test_remote_endpoint_scheme() {
        let mut config = create_valid_config();
        config.remote_service = Some(RemoteServiceConfig {
            endpoint: "ftp://scraper.example.com/".to_string(),
            api_key: None,
            api_key_env: "WEBKEEP_TEST_KEY".to_string(),
        });
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_unknown_crawler_type_is_not_fatal() {
        let mut config = create_valid_config();
        config.crawlers.push(crate::config::CrawlerRule {
            domain: "*.example.com".to_string(),
            crawler_type: "nonexistent".to_string(),
        });
        assert!(validate(&config).is_ok());
    }
}
