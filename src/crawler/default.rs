//! The default crawler: fetch, parse and convert locally

use crate::config::HttpConfig;
use crate::crawler::convert::html_to_markdown;
use crate::crawler::fetcher::{build_http_client, fetch_url, FetchResult};
use crate::crawler::parser::{absolutize_references, parse_html};
use crate::crawler::CrawlResult;
use crate::url::parse_page_url;
use reqwest::Client;
use std::path::Path;

/// Captures static HTML pages with a plain GET
///
/// Pages that need JavaScript to render will come back mostly empty; route
/// those to the remote crawler.
#[derive(Debug, Clone)]
pub struct DefaultCrawler {
    client: Client,
}

impl DefaultCrawler {
    pub fn new(config: &HttpConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::with_client(build_http_client(config)?))
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    pub async fn crawl(&self, url: &str, destination_hint: Option<&Path>) -> CrawlResult {
        let page_url = match parse_page_url(url) {
            Ok(page_url) => page_url,
            Err(e) => return CrawlResult::failure(url, format!("Invalid URL: {}", e)),
        };

        if let Some(dir) = destination_hint {
            tracing::debug!("Fetching {} for {}", url, dir.display());
        } else {
            tracing::debug!("Fetching {}", url);
        }

        let fetched = fetch_url(&self.client, page_url.as_str()).await;
        let body = match fetched {
            FetchResult::Success {
                body, final_url, ..
            } => {
                if final_url != page_url.as_str() {
                    tracing::debug!("{} redirected to {}", url, final_url);
                }
                body
            }
            failed => {
                let message = failed
                    .failure_message()
                    .unwrap_or_else(|| "Failed to download page".to_string());
                tracing::warn!("{}: {}", url, message);
                return CrawlResult::failure(url, message);
            }
        };

        let parsed = parse_html(&body, &page_url);
        let absolute_html = absolutize_references(&body, &page_url);

        let markdown = match html_to_markdown(&absolute_html, url) {
            Ok(markdown) => markdown,
            Err(e) => return CrawlResult::failure(url, e.to_string()),
        };

        tracing::debug!(
            "Converted {} ({} bytes of Markdown, {} images, {} links)",
            url,
            markdown.len(),
            parsed.image_urls.len(),
            parsed.links.len()
        );

        CrawlResult {
            url: url.to_string(),
            success: true,
            message: "Success".to_string(),
            title: parsed.title,
            html: body,
            markdown,
            image_urls: parsed.image_urls,
            link_urls: parsed.links,
            doc_id: None,
        }
    }
}
