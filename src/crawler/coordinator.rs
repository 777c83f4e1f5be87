//! Capture coordinator - the page capture pipeline
//!
//! This module ties the pieces of one capture together:
//! - Resolving the document directory
//! - Dispatching the URL to a crawler
//! - Downloading images into the document's `images/` directory
//! - Rewriting image references to the local copies
//! - Handing the finished document to storage

use crate::config::Config;
use crate::crawler::{CrawlResult, CrawlerDispatcher};
use crate::images::{ImageDownloader, ImageExtractor};
use crate::storage::{DocumentStore, SqliteStorage, StorageError, StoragePath};
use crate::url::parse_page_url;
use crate::Result;
use std::collections::{BTreeMap, HashMap};
use std::fs;

/// Message for a capture whose URL was already in the catalog
pub const ALREADY_EXISTS: &str = "Document already exists";

/// Main capture coordinator
///
/// Holds the stateless services of the pipeline plus the store it writes to.
/// One `capture` call runs one page end to end; concurrent captures of the
/// same (url, category) are not coordinated.
pub struct Coordinator<S = SqliteStorage> {
    dispatcher: CrawlerDispatcher,
    downloader: ImageDownloader,
    extractor: ImageExtractor,
    store: S,
    write_image_mapping: bool,
}

impl<S: DocumentStore> Coordinator<S> {
    pub fn new(
        dispatcher: CrawlerDispatcher,
        downloader: ImageDownloader,
        extractor: ImageExtractor,
        store: S,
    ) -> Self {
        Self {
            dispatcher,
            downloader,
            extractor,
            store,
            write_image_mapping: true,
        }
    }

    /// Builds every service from configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to capture
    /// * `Err(WebkeepError)` - An HTTP client could not be built
    pub fn from_config(config: &Config, store: S) -> Result<Self> {
        let dispatcher = CrawlerDispatcher::from_config(config)?;
        let downloader = ImageDownloader::new(&config.http)?;
        let extractor = ImageExtractor::new().with_serving_route(&config.serving.route);

        Ok(Self::new(dispatcher, downloader, extractor, store)
            .with_image_mapping(config.storage.write_image_mapping))
    }

    /// Whether to write `image_mapping.json` next to each document
    pub fn with_image_mapping(mut self, enabled: bool) -> Self {
        self.write_image_mapping = enabled;
        self
    }

    pub fn dispatcher(&self) -> &CrawlerDispatcher {
        &self.dispatcher
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Captures `url` into `category_id`
    ///
    /// Never returns an error: every failure is reported through the result.
    /// The document is stored once the page itself was fetched, however many
    /// of its images failed. A URL already in the catalog is recaptured into
    /// its existing directory whatever `category_id` says.
    pub async fn capture(&mut self, url: &str, category_id: Option<i64>) -> CrawlResult {
        // A catalogued URL is refreshed in place; moving it is update_document_category's job
        let category_id = match self.store.get_document(url) {
            Ok(Some(existing)) => {
                if existing.category_id != category_id {
                    tracing::info!(
                        "{} is already catalogued as document {}; keeping its category",
                        url,
                        existing.id
                    );
                }
                existing.category_id
            }
            Ok(None) => category_id,
            Err(e) => {
                tracing::error!("Catalog lookup failed for {}: {}", url, e);
                return CrawlResult::failure(url, format!("Failed to look up document: {}", e));
            }
        };

        let path = match self.store.resolve_path(url, category_id) {
            Ok(path) => path,
            Err(e) => {
                tracing::error!("Cannot resolve storage path for {}: {}", url, e);
                return CrawlResult::failure(url, e.to_string());
            }
        };
        let page_url = match parse_page_url(url) {
            Ok(page_url) => page_url,
            Err(e) => return CrawlResult::failure(url, format!("Invalid URL: {}", e)),
        };

        let crawler = self.dispatcher.select(url);
        tracing::info!("Capturing {} with the {} crawler", url, crawler.name());

        let dir = path.dir();
        let result = crawler.crawl(url, Some(dir.as_path())).await;
        if !result.success {
            tracing::error!("Capture of {} failed: {}", url, result.message);
            return result;
        }

        let mapping = self
            .downloader
            .download_all(&page_url, &result.image_urls, &path.images_dir())
            .await;

        let markdown = self
            .extractor
            .replace_markdown_images(&result.markdown, &mapping, Some(&page_url));

        if self.write_image_mapping && !mapping.is_empty() {
            if let Err(e) = write_mapping(&path, &mapping) {
                tracing::warn!("Failed to write image mapping for {}: {}", url, e);
            }
        }

        match self
            .store
            .add_document(url, &result.title, &result.html, &markdown, category_id)
        {
            Ok(doc_id) => {
                tracing::info!(
                    "Stored {} as document {} ({} images) in {}",
                    url,
                    doc_id,
                    mapping.len(),
                    dir.display()
                );
                CrawlResult {
                    success: true,
                    message: "Success".to_string(),
                    markdown,
                    doc_id: Some(doc_id),
                    ..result
                }
            }
            Err(StorageError::DuplicateUrl(_)) => {
                tracing::info!("{} is already in the catalog; files refreshed", url);
                let existing = self.store.get_document(url).ok().flatten().map(|d| d.id);
                CrawlResult {
                    success: false,
                    message: ALREADY_EXISTS.to_string(),
                    markdown,
                    doc_id: existing,
                    ..result
                }
            }
            Err(e) => {
                tracing::error!("Failed to store {}: {}", url, e);
                CrawlResult::failure(url, format!("Failed to add document: {}", e))
            }
        }
    }

    /// Loads a stored document's Markdown with image paths made servable
    ///
    /// Returns `Ok(None)` if the URL is not in the catalog.
    pub fn render(&self, url: &str) -> Result<Option<String>> {
        let Some(document) = self.store.get_document(url)? else {
            return Ok(None);
        };

        let path = self.store.resolve_path(url, document.category_id)?;
        let markdown = fs::read_to_string(&document.markdown_path)?;
        Ok(Some(
            self.extractor
                .restore_markdown_images(&markdown, &path.relative_dir()),
        ))
    }
}

/// Writes the original URL -> local path audit record
fn write_mapping(path: &StoragePath, mapping: &HashMap<String, String>) -> Result<()> {
    let ordered: BTreeMap<&String, &String> = mapping.iter().collect();
    fs::create_dir_all(path.dir())?;
    fs::write(path.image_mapping_path(), serde_json::to_string_pretty(&ordered)?)?;
    Ok(())
}
