//! Aggregate report: every source blob in a directory, concatenated into one
//! tab-delimited file.

use super::json::read_records;
use crate::models::PublicationRecord;
use csv::{QuoteStyle, WriterBuilder};
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

pub const HEADER: [&str; 12] = [
    "FullName",
    "EaiUrl",
    "Url",
    "PdfUrl",
    "PublicationDate",
    "DataSource",
    "Publication",
    "Title",
    "EaiMatch",
    "Affiliation",
    "Type",
    "Citations",
];

/// Tabs and line breaks would break the row structure.
fn field(value: &str) -> String {
    value.replace(['\t', '\r', '\n'], " ")
}

/// One report row, columns in [`HEADER`] order.
pub fn row(record: &PublicationRecord) -> [String; 12] {
    [
        field(&record.full_name),
        field(&record.profile_url),
        field(&record.link),
        field(record.pdf_link.as_deref().unwrap_or_default()),
        record.published.date().format("%Y-%m-%d").to_string(),
        field(&record.data_source),
        field(&record.venue),
        field(&record.title),
        record.affiliation_match.to_string(),
        field(&record.affiliation),
        field(record.publication_type.label()),
        record.citations.to_string(),
    ]
}

/// Render the header plus one row per record as tab-delimited text.
///
/// Fields are written unquoted; tabs and line breaks inside them are already
/// flattened to spaces by [`row`].
///
/// # Arguments
///
/// * `records` - Rows in output order.
///
/// # Returns
///
/// The report bytes, every line newline-terminated.
pub fn render(records: &[PublicationRecord]) -> Result<Vec<u8>, Box<dyn Error>> {
    let mut writer = WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(QuoteStyle::Never)
        .from_writer(Vec::new());
    writer.write_record(HEADER)?;
    for record in records {
        writer.write_record(row(record))?;
    }
    Ok(writer.into_inner().map_err(|e| e.into_error())?)
}

/// `*.json` files directly inside `dir`, sorted by file name.
pub async fn blob_files(dir: &Path) -> Result<Vec<PathBuf>, Box<dyn Error>> {
    let mut entries = fs::read_dir(dir).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "json") && entry.file_type().await?.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Load every blob in `input_dir` in file-name order and concatenate them.
#[instrument(level = "info", skip_all, fields(input_dir = %input_dir.display()))]
pub async fn load_all(input_dir: &Path) -> Result<Vec<PublicationRecord>, Box<dyn Error>> {
    let mut all = Vec::new();
    for path in blob_files(input_dir).await? {
        all.extend(read_records(&path).await?);
    }
    info!(count = all.len(), "Loaded records");
    Ok(all)
}

/// Aggregate `input_dir` into the delimited report at `output`.
#[instrument(level = "info", skip_all, fields(input_dir = %input_dir.display(), output = %output.display()))]
pub async fn write_report(input_dir: &Path, output: &Path) -> Result<usize, Box<dyn Error>> {
    let records = load_all(input_dir).await?;
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    fs::write(output, render(&records)?).await?;
    info!(rows = records.len(), "Wrote report");
    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::PublishedOn;
    use crate::models::PublicationType;
    use crate::outputs::json::write_records;
    use chrono::NaiveDate;

    fn record(source: &str, title: &str) -> PublicationRecord {
        PublicationRecord {
            full_name: "Jennifer Dy".to_string(),
            profile_url: "https://example.edu/dy".to_string(),
            link: "https://example.org/p".to_string(),
            pdf_link: Some("https://example.org/p.pdf".to_string()),
            published: PublishedOn::on_day(NaiveDate::from_ymd_opt(2021, 3, 9).unwrap()),
            data_source: source.to_string(),
            venue: "Nature\tMethods".to_string(),
            title: title.to_string(),
            publication_type: PublicationType::Journal,
            affiliation: "Northeastern University".to_string(),
            affiliation_match: true,
            citations: 7,
        }
    }

    #[test]
    fn test_row_columns() {
        let cols = row(&record("pubmed", "Line one\nline two"));
        assert_eq!(cols[4], "2021-03-09");
        assert_eq!(cols[6], "Nature Methods");
        assert_eq!(cols[7], "Line one line two");
        assert_eq!(cols[8], "true");
        assert_eq!(cols[10], "journal");
        assert_eq!(cols[11], "7");
    }

    #[test]
    fn test_render_header_only() {
        let text = String::from_utf8(render(&[]).unwrap()).unwrap();
        assert_eq!(text, format!("{}\n", HEADER.join("\t")));
    }

    #[test]
    fn test_render_leaves_quotes_alone() {
        let text = String::from_utf8(render(&[record("acm", r#"The "Real" Thing"#)]).unwrap()).unwrap();
        let line = text.lines().nth(1).unwrap();
        assert_eq!(line.split('\t').count(), HEADER.len());
        assert_eq!(line.split('\t').nth(7), Some(r#"The "Real" Thing"#));
    }

    #[tokio::test]
    async fn test_report_concatenates_in_file_order() {
        let dir = std::env::temp_dir().join(format!("faculty_pubs_report_{}", std::process::id()));
        let dir_str = dir.to_string_lossy().into_owned();
        write_records(&dir_str, "pubmed", &[record("pubmed", "P1")]).await.unwrap();
        write_records(&dir_str, "arxiv", &[record("arxiv", "A1"), record("arxiv", "A2")]).await.unwrap();
        std::fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let output = dir.join("out/all_papers.tsv");
        assert_eq!(write_report(&dir, &output).await.unwrap(), 3);

        let text = std::fs::read_to_string(&output).unwrap();
        let titles: Vec<_> = text
            .lines()
            .skip(1)
            .map(|l| l.split('\t').nth(7).unwrap())
            .collect();
        assert_eq!(titles, vec!["A1", "A2", "P1"]);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
