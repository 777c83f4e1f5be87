//! Storage traits and error types
//!
//! [`DocumentStore`] is the persistence contract the capture pipeline
//! consumes, plus the catalog operations the CLI needs.

use crate::storage::{CategoryRecord, DocumentRecord, StoragePath};
use crate::UrlError;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid document URL: {0}")]
    Url(#[from] UrlError),

    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Category not found: {0}")]
    CategoryNotFound(i64),

    #[error("Document already exists: {0}")]
    DuplicateUrl(String),

    #[error("Category already exists: {0}")]
    DuplicateCategory(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Persistence backend for captured documents
pub trait DocumentStore {
    // ===== Capture Contract =====

    /// Resolves the storage directory for a document in a category
    fn resolve_path(&self, url: &str, category_id: Option<i64>) -> StorageResult<StoragePath>;

    /// Writes a document's files and records it in the catalog
    ///
    /// # Returns
    ///
    /// * `Ok(id)` - The new document ID
    /// * `Err(StorageError::DuplicateUrl)` - A document with this URL already
    ///   exists; its files have been refreshed but the catalog is unchanged
    /// * `Err(_)` - Any other failure
    fn add_document(
        &mut self,
        url: &str,
        title: &str,
        raw_content: &str,
        markdown: &str,
        category_id: Option<i64>,
    ) -> StorageResult<i64>;

    /// Stores one image for a document and returns its path relative to `content.md`
    fn save_image(
        &mut self,
        doc_url: &str,
        image_url: &str,
        bytes: &[u8],
        category_id: Option<i64>,
    ) -> StorageResult<String>;

    // ===== Categories =====

    /// Adds a category; duplicate names are rejected
    fn add_category(&mut self, name: &str) -> StorageResult<i64>;

    /// Gets a category by ID
    fn get_category(&self, category_id: i64) -> StorageResult<CategoryRecord>;

    /// Gets a category by exact name
    fn find_category_by_name(&self, name: &str) -> StorageResult<Option<CategoryRecord>>;

    /// Lists all categories ordered by name
    fn list_categories(&self) -> StorageResult<Vec<CategoryRecord>>;

    // ===== Documents =====

    /// Gets a document by URL
    fn get_document(&self, url: &str) -> StorageResult<Option<DocumentRecord>>;

    /// Lists documents, newest first, optionally filtered by category
    fn list_documents(&self, category_id: Option<i64>) -> StorageResult<Vec<DocumentRecord>>;

    /// Lists documents whose title or URL contains `query`
    fn search_documents(
        &self,
        query: &str,
        category_id: Option<i64>,
    ) -> StorageResult<Vec<DocumentRecord>>;

    /// Moves a document to another category, relocating its files
    fn update_document_category(&mut self, url: &str, category_id: Option<i64>)
        -> StorageResult<()>;

    /// Deletes a document and its files; returns false if it did not exist
    fn delete_document(&mut self, url: &str) -> StorageResult<bool>;
}
