//! Image downloading into content-addressed files
//!
//! Each image is fetched independently through a bounded pool. A failure on
//! one image is logged and that URL is left out of the mapping; it never
//! fails the batch.

use crate::config::HttpConfig;
use crate::images::extractor::LOCAL_IMAGES_MARKER;
use crate::url::resolve_reference;
use futures::stream::{self, StreamExt};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Extensions taken straight from the image URL when present
pub const ALLOWED_IMAGE_EXTENSIONS: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".gif", ".webp", ".svg", ".bmp", ".avif", ".ico",
];

/// Extension used when neither the URL nor the content type gives one
pub const DEFAULT_IMAGE_EXTENSION: &str = ".jpg";

/// Number of hex characters in an image file stem
const IMAGE_HASH_LEN: usize = 16;

/// Fetches images and writes them under a document's `images/` directory
#[derive(Debug, Clone)]
pub struct ImageDownloader {
    client: Client,
    max_concurrent: usize,
}

impl ImageDownloader {
    /// Builds a downloader from the HTTP configuration
    pub fn new(config: &HttpConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.image_timeout_secs))
            .connect_timeout(Duration::from_secs(config.image_timeout_secs))
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self::with_client(client, config.max_concurrent_downloads))
    }

    /// Wraps an existing client; `max_concurrent` is clamped to at least one
    pub fn with_client(client: Client, max_concurrent: usize) -> Self {
        Self {
            client,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Downloads every image and returns `original url -> images/<file>`
    ///
    /// URLs are deduplicated by exact string before fetching. Relative and
    /// protocol-relative URLs are resolved against `doc_url`. `data:` URLs are
    /// skipped; they are already self-contained. The returned paths are
    /// relative to the directory holding `content.md`.
    pub async fn download_all(
        &self,
        doc_url: &Url,
        image_urls: &[String],
        images_dir: &Path,
    ) -> HashMap<String, String> {
        let mut seen = HashSet::new();
        let unique: Vec<&String> = image_urls
            .iter()
            .filter(|url| seen.insert(url.as_str()))
            .collect();

        tracing::debug!(
            "Downloading {} unique images for {} into {}",
            unique.len(),
            doc_url,
            images_dir.display()
        );

        let results: Vec<Option<(String, String)>> = stream::iter(unique)
            .map(|original| async move {
                self.download_one(doc_url, original, images_dir)
                    .await
                    .map(|local| (original.clone(), local))
            })
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;

        let mapping: HashMap<String, String> = results.into_iter().flatten().collect();
        tracing::info!(
            "Downloaded {}/{} images for {}",
            mapping.len(),
            seen.len(),
            doc_url
        );
        mapping
    }

    async fn download_one(&self, doc_url: &Url, original: &str, images_dir: &Path) -> Option<String> {
        let absolute = resolve_reference(original, Some(doc_url))?;
        if absolute.starts_with("data:") {
            tracing::debug!("Skipping inline data image");
            return None;
        }

        match self.fetch(&absolute).await {
            Ok((bytes, content_type)) => {
                match write_image(images_dir, &absolute, content_type.as_deref(), &bytes) {
                    Ok(local) => {
                        tracing::debug!("Saved {} as {}", absolute, local);
                        Some(local)
                    }
                    Err(e) => {
                        tracing::warn!("Failed to write image {}: {}", absolute, e);
                        None
                    }
                }
            }
            Err(e) => {
                tracing::warn!("Failed to download image {}: {}", absolute, e);
                None
            }
        }
    }

    async fn fetch(&self, url: &str) -> Result<(Vec<u8>, Option<String>), String> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                "request timeout".to_string()
            } else {
                e.to_string()
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP {}", status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let bytes = response.bytes().await.map_err(|e| e.to_string())?;
        Ok((bytes.to_vec(), content_type))
    }
}

/// Writes image bytes under `images_dir` and returns the path relative to `content.md`
///
/// The directory is created on first use. An existing file with the same
/// name is overwritten.
pub fn write_image(
    images_dir: &Path,
    image_url: &str,
    content_type: Option<&str>,
    bytes: &[u8],
) -> std::io::Result<String> {
    let filename = image_filename(image_url, content_type);
    std::fs::create_dir_all(images_dir)?;
    std::fs::write(images_dir.join(&filename), bytes)?;
    Ok(format!("{}{}", LOCAL_IMAGES_MARKER, filename))
}

/// Content-addressed file name for an image URL
///
/// # Examples
///
/// ```
/// use webkeep::images::image_filename;
///
/// let name = image_filename("https://example.com/a/cat.PNG?size=large", None);
/// assert!(name.ends_with(".png"));
/// assert_eq!(name.len(), 16 + ".png".len());
/// ```
pub fn image_filename(image_url: &str, content_type: Option<&str>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(image_url.as_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("{}{}", &digest[..IMAGE_HASH_LEN], image_extension(image_url, content_type))
}

/// Chooses the file extension for an image
///
/// 1. The URL path's own extension, if it is on the allow-list
/// 2. An extension guessed from the `Content-Type` header
/// 3. [`DEFAULT_IMAGE_EXTENSION`]
pub fn image_extension(image_url: &str, content_type: Option<&str>) -> &'static str {
    let path = Url::parse(image_url)
        .map(|url| url.path().to_ascii_lowercase())
        .unwrap_or_else(|_| {
            image_url
                .split(['?', '#'])
                .next()
                .unwrap_or_default()
                .to_ascii_lowercase()
        });

    if let Some(ext) = ALLOWED_IMAGE_EXTENSIONS
        .iter()
        .copied()
        .find(|ext| path.ends_with(ext))
    {
        return ext;
    }

    content_type
        .and_then(extension_for_content_type)
        .unwrap_or(DEFAULT_IMAGE_EXTENSION)
}

fn extension_for_content_type(content_type: &str) -> Option<&'static str> {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match mime.as_str() {
        "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(".jpg"),
        "image/png" => Some(".png"),
        "image/gif" => Some(".gif"),
        "image/webp" => Some(".webp"),
        "image/svg+xml" => Some(".svg"),
        "image/bmp" => Some(".bmp"),
        "image/avif" => Some(".avif"),
        "image/x-icon" | "image/vnd.microsoft.icon" => Some(".ico"),
        _ => None,
    }
}
