//! On-disk addressing for captured documents
//!
//! A document lives in `root/<category>/<host>/<hash8>/`, where `hash8` is
//! the first eight hex characters of the SHA-256 of the raw URL string. The
//! directory is a pure function of (url, category): re-capturing the same
//! page lands in the same place and overwrites what was there.

use crate::url::host_segment;
use crate::{UrlError, UrlResult};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use url::Url;

/// Markdown body
pub const MARKDOWN_FILE: &str = "content.md";
/// Raw captured source
pub const RAW_CONTENT_FILE: &str = "content.txt";
/// Downloaded image files
pub const IMAGES_DIR: &str = "images";
/// Original URL -> local file audit record
pub const IMAGE_MAPPING_FILE: &str = "image_mapping.json";
/// Category segment for documents without a category
pub const UNCATEGORIZED: &str = "uncategorized";

/// The storage location of one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoragePath {
    pub root: PathBuf,
    pub category: String,
    pub host: String,
    pub hash: String,
}

impl StoragePath {
    /// The document directory
    pub fn dir(&self) -> PathBuf {
        self.root.join(&self.category).join(&self.host).join(&self.hash)
    }

    pub fn markdown_path(&self) -> PathBuf {
        self.dir().join(MARKDOWN_FILE)
    }

    pub fn raw_content_path(&self) -> PathBuf {
        self.dir().join(RAW_CONTENT_FILE)
    }

    pub fn images_dir(&self) -> PathBuf {
        self.dir().join(IMAGES_DIR)
    }

    pub fn image_mapping_path(&self) -> PathBuf {
        self.dir().join(IMAGE_MAPPING_FILE)
    }

    /// `category/host/hash8` with forward slashes, as used in serving URLs
    pub fn relative_dir(&self) -> String {
        format!("{}/{}/{}", self.category, self.host, self.hash)
    }
}

/// Maps (url, category) to a [`StoragePath`] under a fixed root
///
/// The resolver has no side effects; callers create directories when they
/// first write into them.
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves the storage location for a document
    ///
    /// # Examples
    ///
    /// ```
    /// use webkeep::storage::PathResolver;
    ///
    /// let resolver = PathResolver::new("/data/docs");
    /// let path = resolver.resolve("https://example.com/post", Some("Tech")).unwrap();
    /// assert_eq!(path.category, "tech");
    /// assert_eq!(path.host, "example.com");
    /// assert_eq!(path.hash.len(), 8);
    /// assert!(path.dir().starts_with("/data/docs/tech/example.com"));
    /// ```
    pub fn resolve(&self, url: &str, category: Option<&str>) -> UrlResult<StoragePath> {
        let parsed = Url::parse(url.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;
        let host = host_segment(&parsed).ok_or(UrlError::MissingDomain)?;

        Ok(StoragePath {
            root: self.root.clone(),
            category: normalize_category(category),
            host,
            hash: hash8(url),
        })
    }
}

/// Normalizes a category name into a directory segment
///
/// Lowercases, turns spaces and path separators into underscores, and maps a
/// missing or blank name to `uncategorized`.
pub fn normalize_category(name: Option<&str>) -> String {
    match name.map(str::trim).filter(|name| !name.is_empty()) {
        Some(name) => name
            .to_lowercase()
            .chars()
            .map(|c| match c {
                ' ' | '/' | '\\' => '_',
                c => c,
            })
            .collect(),
        None => UNCATEGORIZED.to_string(),
    }
}

/// First eight hex characters of the SHA-256 of the raw URL string
pub fn hash8(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..8].to_string()
}
