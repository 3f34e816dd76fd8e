//! Small helpers for log output, text cleanup and output directories.
//!
//! - String truncation for log fields that may hold whole response bodies
//! - Whitespace cleanup for titles and names scraped from markup
//! - Output directory validation before any source is queried

use itertools::Itertools;
use std::error::Error;
use std::fs as stdfs;
use tokio::fs;
use tracing::{info, instrument};

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` characters with an ellipsis and a count of
/// the bytes dropped. The cut always falls on a character boundary.
///
/// # Arguments
///
/// * `s` - The string to potentially truncate
/// * `max` - Maximum number of characters to keep
///
/// # Returns
///
/// The original string if it has at most `max` characters, otherwise the
/// first `max` characters followed by `"…(+N bytes)"`.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}…(+{} bytes)", &s[..cut], s.len() - cut),
    }
}

/// Collapse runs of whitespace (tabs and newlines included) into single
/// spaces and trim the ends.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(clean_text("  Deep\n\tClustering "), "Deep Clustering");
/// ```
pub fn clean_text(s: &str) -> String {
    s.split_whitespace().join(" ")
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory (and parents) if needed, then creates and removes a
/// scratch file inside it. Called before any source is queried.
///
/// # Arguments
///
/// * `path` - Directory that will receive the per-source blobs
///
/// # Returns
///
/// `Ok(())` if the directory exists and accepts new files.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or the scratch file
/// cannot be written.
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    let scratch = format!("{}/..__write_check__", path.trim_end_matches('/'));
    stdfs::File::create(&scratch)?;
    let _ = stdfs::remove_file(&scratch);
    info!("Output directory is writable");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_for_log_short_string() {
        let s = "Hello, world!";
        assert_eq!(truncate_for_log(s, 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_multibyte() {
        let s = "Müller–Schmidt";
        assert_eq!(truncate_for_log(s, 2), "Mü…(+14 bytes)");
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  Deep\n\tClustering   via\r\nKernels "), "Deep Clustering via Kernels");
        assert_eq!(clean_text(" \n "), "");
    }

    #[tokio::test]
    async fn test_ensure_writable_dir_creates_nested() {
        let dir = std::env::temp_dir().join(format!("faculty_pubs_utils_{}", std::process::id()));
        let nested = dir.join("a/b");
        ensure_writable_dir(nested.to_str().unwrap()).await.unwrap();
        assert!(nested.is_dir());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
