//! Database schema definitions
//!
//! This module contains the SQL schema for the page archive.

/// SQL schema for the archive database
pub const SCHEMA_SQL: &str = r#"
-- One row per archived URL; re-crawls overwrite the row
CREATE TABLE IF NOT EXISTS pages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL,
    content TEXT NOT NULL,
    links TEXT NOT NULL,
    crawled_at TEXT NOT NULL,
    status_code INTEGER NOT NULL,
    content_type TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_pages_crawled_at ON pages(crawled_at);
"#;

/// Initializes the database schema
///
/// Safe to call on an existing database.
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
