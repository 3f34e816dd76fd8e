//! Faculty roster loading.
//!
//! The roster is a delimited text file with a header row. Comma separated by
//! default; tab separated when the header line contains a tab. The `Name` and
//! `Url` columns are located by header (case-insensitive); other columns are
//! ignored. Quoting follows the usual CSV rules, so a quoted field may hold
//! the delimiter or a line break.

use crate::models::AuthorEntry;
use csv::{ReaderBuilder, StringRecord, Trim};
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info, instrument};

fn column(header: &StringRecord, name: &str) -> Option<usize> {
    header.iter().position(|h| h.eq_ignore_ascii_case(name))
}

/// Tab when the header line has one, comma otherwise.
fn sniff_delimiter(text: &str) -> u8 {
    let header_line = text.lines().find(|l| !l.trim().is_empty()).unwrap_or_default();
    if header_line.contains('\t') { b'\t' } else { b',' }
}

/// Parse roster text into author entries, in file order.
///
/// # Arguments
///
/// * `text` - The whole roster file, optionally starting with a byte order mark.
///
/// # Returns
///
/// One [`AuthorEntry`] per row with a non-blank name. A row without a `Url`
/// cell yields an empty profile URL.
///
/// # Errors
///
/// Fails when the text is empty, when either required column is missing from
/// the header, or when a row cannot be read (for example an unterminated
/// quote).
pub fn parse_roster(text: &str) -> Result<Vec<AuthorEntry>, Box<dyn Error>> {
    let text = text.trim_start_matches('\u{feff}');
    if text.trim().is_empty() {
        return Err("roster is empty".into());
    }

    let mut reader = ReaderBuilder::new()
        .delimiter(sniff_delimiter(text))
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let header = reader.headers()?.clone();
    let name_col = column(&header, "Name").ok_or("roster header has no Name column")?;
    let url_col = column(&header, "Url").ok_or("roster header has no Url column")?;

    let mut entries = Vec::new();
    for (i, row) in reader.records().enumerate() {
        let row = row?;
        let name = row.get(name_col).unwrap_or_default();
        if name.is_empty() {
            debug!(row = i + 1, "Skipping roster row without a name");
            continue;
        }
        entries.push(AuthorEntry::new(name, row.get(url_col).unwrap_or_default()));
    }
    Ok(entries)
}

/// Read and parse a roster file.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn load_roster(path: &Path) -> Result<Vec<AuthorEntry>, Box<dyn Error>> {
    let text = fs::read_to_string(path).await?;
    let entries = parse_roster(&text)?;
    info!(authors = entries.len(), "Loaded roster");
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comma_roster() {
        let text = "Name,Url,Dept\nJennifer Dy,https://ai.northeastern.edu/dy,ECE\n\"Smith, Alice\",https://x/a,CS\n";
        let entries = parse_roster(text).unwrap();
        assert_eq!(
            entries,
            vec![
                AuthorEntry::new("Jennifer Dy", "https://ai.northeastern.edu/dy"),
                AuthorEntry::new("Smith, Alice", "https://x/a"),
            ]
        );
    }

    #[test]
    fn test_tab_roster_case_insensitive_header() {
        let text = "\u{feff}url\tNAME\nhttps://x/dy\tJennifer Dy\n\tNo Profile\n";
        let entries = parse_roster(text).unwrap();
        assert_eq!(entries[0], AuthorEntry::new("Jennifer Dy", "https://x/dy"));
        assert_eq!(entries[1], AuthorEntry::new("No Profile", ""));
    }

    #[test]
    fn test_blank_names_skipped() {
        let text = "Name,Url\n,https://x/nobody\n  ,\nBeth Noveck\n";
        let entries = parse_roster(text).unwrap();
        assert_eq!(entries, vec![AuthorEntry::new("Beth Noveck", "")]);
    }

    #[test]
    fn test_quoted_quote() {
        let entries = parse_roster("Name,Url\n\"Dwayne \"\"The Rock\"\" Johnson\",u\n").unwrap();
        assert_eq!(entries, vec![AuthorEntry::new(r#"Dwayne "The Rock" Johnson"#, "u")]);
    }

    #[test]
    fn test_quoted_line_break_stays_in_one_row() {
        let text = "Name,Url\n\"Jennifer\nDy\",http://a\nUsama Fayyad,http://b\n";
        let entries = parse_roster(text).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], AuthorEntry::new("Jennifer\nDy", "http://a"));
        assert_eq!(entries[1], AuthorEntry::new("Usama Fayyad", "http://b"));
    }

    #[test]
    fn test_missing_columns() {
        assert!(parse_roster("").is_err());
        assert!(parse_roster("Name,Email\nA,b\n").is_err());
    }
}
