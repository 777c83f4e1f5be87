//! SQLite storage implementation
//!
//! This module provides a SQLite-backed implementation of the DocumentStore
//! trait. Document files live on disk under the [`PathResolver`] root; the
//! database only records where they are.

use crate::images::write_image;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{DocumentStore, StorageError, StorageResult};
use crate::storage::{CategoryRecord, DocumentRecord, PathResolver, StoragePath};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::fs;
use std::path::Path;

const DOCUMENT_SELECT: &str = "SELECT d.id, d.url, d.title, d.markdown_path, d.category_id, c.name, d.created_at
     FROM documents d LEFT JOIN categories c ON c.id = d.category_id";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
    resolver: PathResolver,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file; its parent directory is
    ///   created if missing
    /// * `resolver` - Maps documents to their directories under the storage root
    pub fn new(path: &Path, resolver: PathResolver) -> StorageResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn, resolver })
    }

    /// Creates an in-memory catalog; document files still go under the resolver root
    pub fn new_in_memory(resolver: PathResolver) -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn, resolver })
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    fn category_name(&self, category_id: Option<i64>) -> StorageResult<Option<String>> {
        match category_id {
            Some(id) => Ok(Some(self.get_category(id)?.name)),
            None => Ok(None),
        }
    }

    fn document_id(&self, url: &str) -> StorageResult<Option<i64>> {
        let id = self
            .conn
            .query_row("SELECT id FROM documents WHERE url = ?1", params![url], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(id)
    }

    fn query_documents(
        &self,
        filter: &str,
        args: &[&dyn rusqlite::ToSql],
    ) -> StorageResult<Vec<DocumentRecord>> {
        let sql = format!(
            "{} {} ORDER BY d.created_at DESC, d.id DESC",
            DOCUMENT_SELECT, filter
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let documents = stmt
            .query_map(args, row_to_document)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(documents)
    }
}

fn row_to_document(row: &Row<'_>) -> rusqlite::Result<DocumentRecord> {
    Ok(DocumentRecord {
        id: row.get(0)?,
        url: row.get(1)?,
        title: row.get(2)?,
        markdown_path: row.get(3)?,
        category_id: row.get(4)?,
        category_name: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn row_to_category(row: &Row<'_>) -> rusqlite::Result<CategoryRecord> {
    Ok(CategoryRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: row.get(2)?,
    })
}

impl DocumentStore for SqliteStorage {
    // ===== Capture Contract =====

    fn resolve_path(&self, url: &str, category_id: Option<i64>) -> StorageResult<StoragePath> {
        let category = self.category_name(category_id)?;
        Ok(self.resolver.resolve(url, category.as_deref())?)
    }

    fn add_document(
        &mut self,
        url: &str,
        title: &str,
        raw_content: &str,
        markdown: &str,
        category_id: Option<i64>,
    ) -> StorageResult<i64> {
        let path = self.resolve_path(url, category_id)?;
        fs::create_dir_all(path.dir())?;
        fs::write(path.markdown_path(), markdown)?;
        fs::write(path.raw_content_path(), raw_content)?;

        if self.document_id(url)?.is_some() {
            tracing::debug!("Refreshed files for existing document {}", url);
            return Err(StorageError::DuplicateUrl(url.to_string()));
        }

        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO documents (url, title, markdown_path, category_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                url,
                title,
                path.markdown_path().to_string_lossy(),
                category_id,
                now
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    fn save_image(
        &mut self,
        doc_url: &str,
        image_url: &str,
        bytes: &[u8],
        category_id: Option<i64>,
    ) -> StorageResult<String> {
        let path = self.resolve_path(doc_url, category_id)?;
        Ok(write_image(&path.images_dir(), image_url, None, bytes)?)
    }

    // ===== Categories =====

    fn add_category(&mut self, name: &str) -> StorageResult<i64> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StorageError::Database(
                "Category name cannot be empty".to_string(),
            ));
        }
        if self.find_category_by_name(name)?.is_some() {
            return Err(StorageError::DuplicateCategory(name.to_string()));
        }

        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO categories (name, created_at) VALUES (?1, ?2)",
            params![name, now],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_category(&self, category_id: i64) -> StorageResult<CategoryRecord> {
        self.conn
            .query_row(
                "SELECT id, name, created_at FROM categories WHERE id = ?1",
                params![category_id],
                row_to_category,
            )
            .optional()?
            .ok_or(StorageError::CategoryNotFound(category_id))
    }

    fn find_category_by_name(&self, name: &str) -> StorageResult<Option<CategoryRecord>> {
        let category = self
            .conn
            .query_row(
                "SELECT id, name, created_at FROM categories WHERE name = ?1",
                params![name.trim()],
                row_to_category,
            )
            .optional()?;
        Ok(category)
    }

    fn list_categories(&self) -> StorageResult<Vec<CategoryRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, created_at FROM categories ORDER BY name")?;
        let categories = stmt
            .query_map([], row_to_category)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(categories)
    }

    // ===== Documents =====

    fn get_document(&self, url: &str) -> StorageResult<Option<DocumentRecord>> {
        let sql = format!("{} WHERE d.url = ?1", DOCUMENT_SELECT);
        let document = self
            .conn
            .query_row(&sql, params![url], row_to_document)
            .optional()?;
        Ok(document)
    }

    fn list_documents(&self, category_id: Option<i64>) -> StorageResult<Vec<DocumentRecord>> {
        match category_id {
            Some(id) => self.query_documents("WHERE d.category_id = ?1", &[&id]),
            None => self.query_documents("", &[]),
        }
    }

    fn search_documents(
        &self,
        query: &str,
        category_id: Option<i64>,
    ) -> StorageResult<Vec<DocumentRecord>> {
        let matches = "(instr(lower(coalesce(d.title, '')), lower(?1)) > 0
                        OR instr(lower(d.url), lower(?1)) > 0)";
        match category_id {
            Some(id) => self.query_documents(
                &format!("WHERE {} AND d.category_id = ?2", matches),
                &[&query, &id],
            ),
            None => self.query_documents(&format!("WHERE {}", matches), &[&query]),
        }
    }

    fn update_document_category(
        &mut self,
        url: &str,
        category_id: Option<i64>,
    ) -> StorageResult<()> {
        let document = self
            .get_document(url)?
            .ok_or_else(|| StorageError::DocumentNotFound(url.to_string()))?;
        let target = self.resolve_path(url, category_id)?;
        let new_dir = target.dir();

        if let Some(old_dir) = Path::new(&document.markdown_path).parent() {
            if old_dir != new_dir && old_dir.exists() {
                if new_dir.exists() {
                    fs::remove_dir_all(&new_dir)?;
                }
                if let Some(parent) = new_dir.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::rename(old_dir, &new_dir)?;
                tracing::debug!("Moved {} to {}", old_dir.display(), new_dir.display());
            }
        }

        self.conn.execute(
            "UPDATE documents SET category_id = ?1, markdown_path = ?2 WHERE id = ?3",
            params![
                category_id,
                target.markdown_path().to_string_lossy(),
                document.id
            ],
        )?;
        Ok(())
    }

    fn delete_document(&mut self, url: &str) -> StorageResult<bool> {
        let Some(document) = self.get_document(url)? else {
            return Ok(false);
        };

        self.conn
            .execute("DELETE FROM documents WHERE id = ?1", params![document.id])?;

        if let Some(dir) = Path::new(&document.markdown_path).parent() {
            if dir.exists() {
                fs::remove_dir_all(dir)?;
            }
        }
        Ok(true)
    }
}
