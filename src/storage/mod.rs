//! Storage module for fetched pages
//!
//! This module holds the sinks fetched pages are handed to:
//! - The archive sink interface and page record
//! - A SQLite archive that upserts pages by URL
//! - A content saver that writes raw HTML to a host/path directory tree

mod content;
mod schema;
mod sqlite;
mod traits;

pub use content::ContentSaver;
pub use sqlite::SqliteArchive;
pub use traits::{ArchiveSink, ArchivedPage, StorageError, StorageResult};
