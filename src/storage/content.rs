//! On-disk content archival
//!
//! Raw page content is written under `<output-dir>/<host>/<file>.html`, one
//! directory per host and one file per URL path.

use crate::config::ContentSaverConfig;
use crate::storage::traits::{ArchiveSink, ArchivedPage, StorageError, StorageResult};
use crate::url::extract_host;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

const MAX_FILENAME_LEN: usize = 100;
const TRUNCATED_PREFIX_LEN: usize = 80;
const DIGEST_HEX_LEN: usize = 16;

/// Writes fetched pages to a host/path directory tree
#[derive(Debug, Clone)]
pub struct ContentSaver {
    output_dir: PathBuf,
    /// 0 disables the ceiling
    max_file_size: u64,
    save_metadata: bool,
}

impl ContentSaver {
    pub fn new(config: &ContentSaverConfig) -> Self {
        Self {
            output_dir: PathBuf::from(&config.output_dir),
            max_file_size: config.max_file_size,
            save_metadata: config.save_metadata,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Saves a page, returning the written path
    ///
    /// Returns `Ok(None)` when the page is over the size ceiling.
    pub fn save(&self, page: &ArchivedPage) -> StorageResult<Option<PathBuf>> {
        if self.max_file_size > 0 && page.size() as u64 > self.max_file_size {
            tracing::debug!(
                "Skipping {} ({} bytes exceeds {} byte ceiling)",
                page.url,
                page.size(),
                self.max_file_size
            );
            return Ok(None);
        }

        let path = self.path_for(&page.url)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut output = String::with_capacity(page.content.len() + 512);
        if self.save_metadata {
            output.push_str(&metadata_header(page));
            output.push_str("\n\n");
        }
        output.push_str(&page.content);

        fs::write(&path, output)?;
        tracing::trace!("Saved {} to {}", page.url, path.display());

        Ok(Some(path))
    }

    /// Computes the file a URL is saved to
    pub fn path_for(&self, page_url: &str) -> StorageResult<PathBuf> {
        let url = Url::parse(page_url).map_err(|e| StorageError::InvalidUrl(e.to_string()))?;
        let host = extract_host(&url).ok_or_else(|| StorageError::InvalidUrl(page_url.to_string()))?;

        Ok(self
            .output_dir
            .join(sanitize_host(&host))
            .join(format!("{}.html", safe_filename(&url))))
    }
}

impl ArchiveSink for ContentSaver {
    fn store(&self, page: &ArchivedPage) -> StorageResult<()> {
        self.save(page).map(|_| ())
    }
}

/// `www.example.com:8080` becomes `example_com_8080`
fn sanitize_host(host: &str) -> String {
    host.strip_prefix("www.")
        .unwrap_or(host)
        .replace(['.', ':'], "_")
}

fn sanitize_component(raw: &str) -> String {
    raw.replace(['/', '?', '&', '=', '#', '%', ' '], "_")
}

/// Maps a URL path (and a short query) to a flat file name
fn safe_filename(url: &Url) -> String {
    let path = url.path();
    let mut name = match path.trim_start_matches('/') {
        "" => "index".to_string(),
        trimmed => sanitize_component(trimmed),
    };

    if name.len() > MAX_FILENAME_LEN {
        let digest = hex::encode(Sha256::digest(path.as_bytes()));
        let prefix: String = name.chars().take(TRUNCATED_PREFIX_LEN).collect();
        name = format!("{}_{}", prefix, &digest[..DIGEST_HEX_LEN]);
    }

    if let Some(query) = url.query().filter(|q| !q.is_empty()) {
        let query = sanitize_component(query);
        if name.len() < TRUNCATED_PREFIX_LEN && name.len() + query.len() < MAX_FILENAME_LEN {
            name.push('_');
            name.push_str(&query);
        }
    }

    name
}

fn metadata_header(page: &ArchivedPage) -> String {
    format!(
        "<!--\n\
         CRAWLED PAGE METADATA\n\
         =====================\n\
         URL: {}\n\
         Title: {}\n\
         Content-Type: {}\n\
         Status Code: {}\n\
         Crawled At: {}\n\
         Content Size: {} bytes\n\
         =====================\n\
         -->",
        page.url,
        page.title.replace("--", "- -"),
        page.content_type,
        page.status_code,
        page.crawled_at.to_rfc3339(),
        page.size()
    )
}
