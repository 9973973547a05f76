//! SQLite archive implementation
//!
//! This module provides a SQLite-based implementation of the ArchiveSink trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{ArchiveSink, ArchivedPage, StorageError, StorageResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

/// SQLite archive backend
///
/// Pages are upserted keyed by URL. The connection sits behind a mutex so
/// the archive can be shared as `Arc<dyn ArchiveSink>`.
pub struct SqliteArchive {
    conn: Mutex<Connection>,
}

impl SqliteArchive {
    /// Opens or creates the archive database at `path`
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        tracing::info!("Opened page archive at {}", path.display());

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory archive (for testing)
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Number of archived pages
    pub fn count_pages(&self) -> StorageResult<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM pages", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Loads an archived page by URL
    pub fn get_page(&self, url: &str) -> StorageResult<Option<ArchivedPage>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT url, title, content, links, crawled_at, status_code, content_type
             FROM pages WHERE url = ?1",
        )?;

        let row = stmt
            .query_row(params![url], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, u16>(5)?,
                    row.get::<_, String>(6)?,
                ))
            })
            .optional()?;

        let Some((url, title, content, links, crawled_at, status_code, content_type)) = row
        else {
            return Ok(None);
        };

        let crawled_at = chrono::DateTime::parse_from_rfc3339(&crawled_at)
            .map_err(|e| StorageError::Database(format!("bad crawled_at: {}", e)))?
            .with_timezone(&chrono::Utc);

        Ok(Some(ArchivedPage {
            url,
            title,
            content,
            links: links
                .lines()
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect(),
            crawled_at,
            status_code,
            content_type,
        }))
    }

    fn lock(&self) -> StorageResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Database("archive connection poisoned".to_string()))
    }
}

impl ArchiveSink for SqliteArchive {
    fn store(&self, page: &ArchivedPage) -> StorageResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO pages (url, title, content, links, crawled_at, status_code, content_type)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(url) DO UPDATE SET
                title = excluded.title,
                content = excluded.content,
                links = excluded.links,
                crawled_at = excluded.crawled_at,
                status_code = excluded.status_code,
                content_type = excluded.content_type",
            params![
                page.url,
                page.title,
                page.content,
                page.links.join("\n"),
                page.crawled_at.to_rfc3339(),
                page.status_code,
                page.content_type,
            ],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_page(url: &str, title: &str) -> ArchivedPage {
        ArchivedPage {
            url: url.to_string(),
            title: title.to_string(),
            content: "<html></html>".to_string(),
            links: vec![
                "https://example.com/a".to_string(),
                "https://example.com/b".to_string(),
            ],
            crawled_at: Utc::now(),
            status_code: 200,
            content_type: "text/html".to_string(),
        }
    }

    #[test]
    fn test_store_and_load() {
        let archive = SqliteArchive::new_in_memory().unwrap();
        let page = sample_page("https://example.com/", "Home");

        archive.store(&page).unwrap();

        let loaded = archive.get_page("https://example.com/").unwrap().unwrap();
        assert_eq!(loaded.title, "Home");
        assert_eq!(loaded.links, page.links);
        assert_eq!(loaded.status_code, 200);
        assert_eq!(archive.count_pages().unwrap(), 1);
    }

    #[test]
    fn test_store_upserts_by_url() {
        let archive = SqliteArchive::new_in_memory().unwrap();

        archive
            .store(&sample_page("https://example.com/", "First"))
            .unwrap();
        archive
            .store(&sample_page("https://example.com/", "Second"))
            .unwrap();

        assert_eq!(archive.count_pages().unwrap(), 1);
        let loaded = archive.get_page("https://example.com/").unwrap().unwrap();
        assert_eq!(loaded.title, "Second");
    }

    #[test]
    fn test_missing_page() {
        let archive = SqliteArchive::new_in_memory().unwrap();
        assert!(archive.get_page("https://example.com/none").unwrap().is_none());
    }

    #[test]
    fn test_open_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("archive.db");

        {
            let archive = SqliteArchive::new(&path).unwrap();
            archive
                .store(&sample_page("https://example.com/x", "X"))
                .unwrap();
        }

        let reopened = SqliteArchive::new(&path).unwrap();
        assert_eq!(reopened.count_pages().unwrap(), 1);
    }
}
