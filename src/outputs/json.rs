//! Per-source JSON blobs.
//!
//! Each source's records for a run are written as one JSON array to
//! `{output_dir}/{source_tag}.json`, overwriting any earlier run of the same
//! source:
//! ```text
//! output_dir/
//! ├── acm.json
//! ├── arxiv.json
//! └── pubmed.json
//! ```

use crate::models::PublicationRecord;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

/// Path of the blob for `tag` inside `output_dir`.
pub fn blob_path(output_dir: &str, tag: &str) -> PathBuf {
    Path::new(output_dir).join(format!("{tag}.json"))
}

/// Write `records` as a pretty-printed JSON array to a per-source blob.
///
/// Creates `output_dir` if needed and overwrites any existing blob for the
/// same tag. An empty slice still produces a file holding `[]`.
///
/// # Arguments
///
/// * `output_dir` - Directory holding the blobs
/// * `tag` - Source tag used as the file stem, e.g. `"arxiv"`
/// * `records` - Everything the source returned for the roster
///
/// # Returns
///
/// The path written, or an error if serialization, directory creation or
/// the write fails.
///
/// # Output Path
///
/// The file is written to: `{output_dir}/{tag}.json`
#[instrument(level = "info", skip_all, fields(output_dir = %output_dir, tag = %tag, count = records.len()))]
pub async fn write_records(
    output_dir: &str,
    tag: &str,
    records: &[PublicationRecord],
) -> Result<PathBuf, Box<dyn Error>> {
    let json = serde_json::to_string_pretty(records)?;

    if let Err(e) = fs::create_dir_all(output_dir).await {
        error!(output_dir = %output_dir, error = %e, "Failed to create JSON dir");
        return Err(e.into());
    }

    let path = blob_path(output_dir, tag);
    info!(path = %path.display(), "Writing JSON");
    fs::write(&path, json).await?;
    info!(path = %path.display(), "Wrote source blob");
    Ok(path)
}

/// Read one blob back.
///
/// # Errors
///
/// Fails if the file cannot be read or does not hold an array of
/// [`PublicationRecord`]s.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn read_records(path: &Path) -> Result<Vec<PublicationRecord>, Box<dyn Error>> {
    let text = fs::read_to_string(path).await?;
    let records: Vec<PublicationRecord> = serde_json::from_str(&text)?;
    info!(count = records.len(), "Loaded source blob");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::PublishedOn;
    use crate::models::PublicationType;

    fn record(title: &str) -> PublicationRecord {
        PublicationRecord {
            full_name: "Jennifer Dy".to_string(),
            profile_url: "https://example.edu/dy".to_string(),
            link: "https://dblp.org/rec/conf/x".to_string(),
            pdf_link: None,
            published: PublishedOn::in_year(2021).unwrap(),
            data_source: "dblp".to_string(),
            venue: "ICML".to_string(),
            title: title.to_string(),
            publication_type: PublicationType::Conference,
            affiliation: String::new(),
            affiliation_match: false,
            citations: 0,
        }
    }

    fn temp_dir(name: &str) -> String {
        std::env::temp_dir()
            .join(format!("faculty_pubs_json_{name}_{}", std::process::id()))
            .to_string_lossy()
            .into_owned()
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let dir = temp_dir("rw");
        let records = vec![record("A"), record("B")];
        let path = write_records(&dir, "dblp", &records).await.unwrap();
        assert!(path.ends_with("dblp.json"));
        assert_eq!(read_records(&path).await.unwrap(), records);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_empty_run_writes_empty_array() {
        let dir = temp_dir("empty");
        let path = write_records(&dir, "nih", &[]).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_read_rejects_garbage() {
        let dir = temp_dir("bad");
        std::fs::create_dir_all(&dir).unwrap();
        let path = Path::new(&dir).join("bad.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(read_records(&path).await.is_err());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
