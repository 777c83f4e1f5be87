//! Storage module for captured documents
//!
//! This module handles everything that touches disk:
//! - The deterministic `root/category/host/hash8` directory layout
//! - Writing Markdown, raw content and images into a document directory
//! - The SQLite catalog of categories and documents

mod layout;
mod schema;
mod sqlite;
mod traits;

pub use layout::{
    hash8, normalize_category, PathResolver, StoragePath, IMAGES_DIR, IMAGE_MAPPING_FILE,
    MARKDOWN_FILE, RAW_CONTENT_FILE, UNCATEGORIZED,
};
pub use sqlite::SqliteStorage;
pub use traits::{DocumentStore, StorageError, StorageResult};

use std::path::Path;

/// Opens (or creates) the catalog database, storing documents under `root`
///
/// # Arguments
///
/// * `db_path` - Path to the SQLite database file
/// * `root` - Base directory for document files
pub fn open_storage(db_path: &Path, root: &Path) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(db_path, PathResolver::new(root))
}

/// Represents a category in the database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRecord {
    pub id: i64,
    pub name: String,
    pub created_at: String,
}

/// Represents a captured document in the database
#[derive(Debug, Clone)]
pub struct DocumentRecord {
    pub id: i64,
    pub url: String,
    pub title: Option<String>,
    pub markdown_path: String,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    pub created_at: String,
}
