//! Page export
//!
//! Writes stored page bodies to files named after their URL, for reading
//! crawled pages outside the store.

use crate::storage::Storage;
use crate::CrawlError;
use std::path::{Path, PathBuf};

/// Turns arbitrary text into a filename-safe slug
///
/// The text is lowercased and spaces become `_`. Any other character outside
/// `[a-z0-9_.\n]` becomes `+`.
pub fn text_to_slug(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| match c {
            ' ' => '_',
            'a'..='z' | '0'..='9' | '_' | '\n' | '.' => c,
            _ => '+',
        })
        .collect()
}

/// Filename an exported page is written to
///
/// The slug of the URL, with `.html` appended unless it already ends in
/// `.html` or `.htm`.
pub fn export_filename(url: &str) -> String {
    let mut slug = text_to_slug(url);
    if !(slug.ends_with(".html") || slug.ends_with(".htm")) {
        slug.push_str(".html");
    }
    slug
}

/// Writes the body of page `id` into `dir`
///
/// # Arguments
///
/// * `storage` - The store to read from
/// * `dir` - An existing directory
/// * `id` - The page ID
///
/// # Returns
///
/// * `Ok(PathBuf)` - The file written
/// * `Err(CrawlError::Storage)` - No page has that ID, or the lookup failed
/// * `Err(CrawlError::Io)` - The file could not be written
pub fn export_page(storage: &dyn Storage, dir: &Path, id: i64) -> Result<PathBuf, CrawlError> {
    let page = storage.get_page(id)?;
    let path = dir.join(export_filename(&page.url));
    std::fs::write(&path, page.body.as_bytes())?;

    tracing::info!(
        "id {}: wrote {} bytes to file {}",
        id,
        page.body.len(),
        path.display()
    );
    Ok(path)
}
