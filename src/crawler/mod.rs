//! Crawler module for page capture
//!
//! This module contains the capture logic, including:
//! - HTTP fetching and lenient HTML parsing
//! - HTML to Markdown conversion
//! - The crawler variants and their dispatch by URL pattern
//! - The capture pipeline tying crawlers, images and storage together

mod convert;
mod coordinator;
mod default;
mod dispatcher;
mod fetcher;
mod parser;
mod remote;

pub use convert::{html_to_markdown, post_process_markdown};
pub use coordinator::Coordinator;
pub use default::DefaultCrawler;
pub use dispatcher::CrawlerDispatcher;
pub use fetcher::{build_http_client, fetch_url, FetchResult};
pub use parser::{absolutize_references, parse_html, ParsedPage, UNTITLED};
pub use remote::RemoteServiceCrawler;

use std::fmt;
use std::path::Path;

/// Outcome of one capture attempt
///
/// Crawlers never return errors; a failure is a result with `success` unset
/// and the reason in `message`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlResult {
    pub url: String,
    pub success: bool,
    pub message: String,
    pub title: String,
    /// Raw page source; empty when the crawler never sees HTML
    pub html: String,
    pub markdown: String,
    /// Image references in document order, duplicates kept
    pub image_urls: Vec<String>,
    pub link_urls: Vec<String>,
    /// Catalog ID, set once the document has been stored
    pub doc_id: Option<i64>,
}

impl CrawlResult {
    pub fn failure(url: &str, message: impl Into<String>) -> Self {
        Self {
            url: url.to_string(),
            success: false,
            message: message.into(),
            ..Default::default()
        }
    }
}

/// The crawler variants a rule can select
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlerKind {
    /// Local fetch, parse and convert
    Default,
    /// Firecrawl-compatible scraping API
    RemoteService,
}

impl CrawlerKind {
    /// Parses a crawler type tag from configuration
    ///
    /// Tags are case-insensitive. Returns None for unknown tags.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "default" => Some(Self::Default),
            "remote" | "firecrawl" | "fire" => Some(Self::RemoteService),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::RemoteService => "remote",
        }
    }
}

impl fmt::Display for CrawlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A ready-to-use crawler
#[derive(Debug, Clone)]
pub enum Crawler {
    Default(DefaultCrawler),
    RemoteService(RemoteServiceCrawler),
}

impl Crawler {
    pub fn kind(&self) -> CrawlerKind {
        match self {
            Self::Default(_) => CrawlerKind::Default,
            Self::RemoteService(_) => CrawlerKind::RemoteService,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Captures `url`; `destination_hint` is the document directory the
    /// pipeline will store into
    pub async fn crawl(&self, url: &str, destination_hint: Option<&Path>) -> CrawlResult {
        match self {
            Self::Default(crawler) => crawler.crawl(url, destination_hint).await,
            Self::RemoteService(crawler) => crawler.crawl(url, destination_hint).await,
        }
    }
}
