//! Remote crawler backed by a Firecrawl-compatible scrape API
//!
//! The service renders the page and returns Markdown directly, so there is no
//! raw HTML to keep. Image references are recovered from the Markdown.

use crate::config::{HttpConfig, RemoteServiceConfig};
use crate::crawler::parser::UNTITLED;
use crate::crawler::CrawlResult;
use crate::images::ImageExtractor;
use crate::url::{parse_page_url, resolve_reference};
use crate::{Result, WebkeepError};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Serialize)]
struct ScrapeRequest<'a> {
    url: &'a str,
    formats: [&'static str; 2],
}

#[derive(Debug, Deserialize)]
struct ScrapeResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<ScrapeData>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ScrapeData {
    #[serde(default)]
    markdown: Option<String>,
    #[serde(default)]
    links: Vec<String>,
    #[serde(default)]
    metadata: ScrapeMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct ScrapeMetadata {
    #[serde(default)]
    title: Option<String>,
}

/// Delegates fetching and conversion to a scraping service
#[derive(Debug, Clone)]
pub struct RemoteServiceCrawler {
    client: Client,
    endpoint: String,
    api_key: String,
    extractor: ImageExtractor,
}

impl RemoteServiceCrawler {
    /// Builds the crawler; fails when no API key is configured
    pub fn new(config: &RemoteServiceConfig, http: &HttpConfig) -> Result<Self> {
        let api_key = config.resolve_api_key().ok_or_else(|| {
            WebkeepError::RemoteService(format!(
                "API key not set (use api-key or ${})",
                config.api_key_env
            ))
        })?;

        let client = Client::builder()
            .user_agent(http.user_agent.as_str())
            .timeout(Duration::from_secs(http.page_timeout_secs))
            .connect_timeout(Duration::from_secs(http.page_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key,
            extractor: ImageExtractor::new(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn crawl(&self, url: &str, _destination_hint: Option<&Path>) -> CrawlResult {
        match self.scrape(url).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!("Remote crawler failed for {}: {}", url, e);
                CrawlResult::failure(url, format!("Error crawling {}: {}", url, e))
            }
        }
    }

    async fn scrape(&self, url: &str) -> Result<CrawlResult> {
        let page_url = parse_page_url(url)?;

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&ScrapeRequest {
                url,
                formats: ["markdown", "links"],
            })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    WebkeepError::Timeout {
                        url: url.to_string(),
                    }
                } else {
                    WebkeepError::Http {
                        url: url.to_string(),
                        source: e,
                    }
                }
            })?;

        let status = response.status();
        let body = response.text().await?;

        let parsed: ScrapeResponse = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(e) if status.is_success() => return Err(e.into()),
            Err(_) => {
                return Err(WebkeepError::RemoteService(format!(
                    "HTTP {}",
                    status.as_u16()
                )))
            }
        };

        if !status.is_success() || !parsed.success {
            let reason = parsed
                .error
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            return Err(WebkeepError::RemoteService(reason));
        }

        let data = parsed.data.ok_or_else(|| {
            WebkeepError::RemoteService("Response carried no data".to_string())
        })?;
        let markdown = data.markdown.unwrap_or_default();

        let image_urls = self
            .extractor
            .scan(&markdown)
            .into_iter()
            .filter_map(|reference| resolve_reference(&reference.url, Some(&page_url)))
            .collect();

        let title = data
            .metadata
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| UNTITLED.to_string());

        Ok(CrawlResult {
            url: url.to_string(),
            success: true,
            message: "Success".to_string(),
            title,
            html: String::new(),
            markdown,
            image_urls,
            link_urls: data.links,
            doc_id: None,
        })
    }
}
