//! Data models for fetch inputs and normalized publication records.
//!
//! - [`AuthorEntry`]: one roster row
//! - [`FetchRequest`]: a validated author identity plus date window
//! - [`RecordDraft`]: a partially parsed item, filled field by field
//! - [`PublicationRecord`]: the normalized output unit; only produced by
//!   [`RecordDraft::finish`], so every record has a title and a resolved date
//! - [`PublicationType`]: the publication kind label

use crate::dates::{self, DateWindow, PublishedOn};
use crate::error::{DateError, DropReason, FetchError};
use crate::names::{NameParts, affiliation_matches};
use crate::utils::clean_text;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One faculty member from the roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorEntry {
    pub full_name: String,
    /// Profile page, passed through to records untouched. May be empty.
    pub profile_url: String,
}

impl AuthorEntry {
    pub fn new(full_name: impl Into<String>, profile_url: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            profile_url: profile_url.into(),
        }
    }
}

/// A validated request to fetch one author's publications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub full_name: String,
    pub name: NameParts,
    pub profile_url: String,
    pub window: DateWindow,
}

impl FetchRequest {
    /// Build a request for one author and date window.
    ///
    /// # Arguments
    ///
    /// * `full_name` - Author name as written in the roster; surrounding
    ///   whitespace is trimmed
    /// * `profile_url` - The author's profile page, copied onto every record
    /// * `start` - First day of the window
    /// * `end` - Last day of the window (inclusive)
    ///
    /// # Errors
    ///
    /// [`FetchError::InvalidRequest`] when the name has no tokens, or when
    /// `start > end`.
    pub fn new(
        full_name: &str,
        profile_url: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Self, FetchError> {
        let name = NameParts::split(full_name)
            .ok_or_else(|| FetchError::invalid("author name is empty"))?;
        let window = DateWindow::new(start, end)?;
        Ok(Self {
            full_name: full_name.trim().to_string(),
            name,
            profile_url: profile_url.to_string(),
            window,
        })
    }

    pub fn for_entry(entry: &AuthorEntry, start: NaiveDate, end: NaiveDate) -> Result<Self, FetchError> {
        Self::new(&entry.full_name, &entry.profile_url, start, end)
    }
}

/// Kind of publication.
///
/// Serialized as its label (`"journal"`, `"pre-print"`, ...); any other label
/// round-trips as [`PublicationType::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum PublicationType {
    Journal,
    Conference,
    PrePrint,
    Grant,
    NewsArticle,
    Other(String),
    #[default]
    Unknown,
}

impl PublicationType {
    pub fn label(&self) -> &str {
        match self {
            PublicationType::Journal => "journal",
            PublicationType::Conference => "conference",
            PublicationType::PrePrint => "pre-print",
            PublicationType::Grant => "grant",
            PublicationType::NewsArticle => "news article",
            PublicationType::Other(label) => label,
            PublicationType::Unknown => "",
        }
    }

    /// Case-insensitive inverse of [`PublicationType::label`].
    pub fn from_label(label: &str) -> Self {
        let trimmed = label.trim();
        match trimmed.to_lowercase().as_str() {
            "" => PublicationType::Unknown,
            "journal" => PublicationType::Journal,
            "conference" => PublicationType::Conference,
            "pre-print" | "preprint" => PublicationType::PrePrint,
            "grant" => PublicationType::Grant,
            "news article" => PublicationType::NewsArticle,
            _ => PublicationType::Other(trimmed.to_string()),
        }
    }
}

impl From<PublicationType> for String {
    fn from(t: PublicationType) -> Self {
        t.label().to_string()
    }
}

impl From<String> for PublicationType {
    fn from(s: String) -> Self {
        PublicationType::from_label(&s)
    }
}

/// A normalized publication, as persisted per source and reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationRecord {
    pub full_name: String,
    pub profile_url: String,
    pub link: String,
    pub pdf_link: Option<String>,
    pub published: PublishedOn,
    pub data_source: String,
    pub venue: String,
    pub title: String,
    pub publication_type: PublicationType,
    pub affiliation: String,
    pub affiliation_match: bool,
    #[serde(default)]
    pub citations: u64,
}

/// What [`RecordDraft::finish`] needs besides the draft itself.
#[derive(Debug, Clone, Copy)]
pub struct RecordContext<'a> {
    pub request: &'a FetchRequest,
    pub data_source: &'a str,
    pub require_link: bool,
    pub institution: Option<&'a str>,
}

/// An item being parsed. Every field is optional until [`RecordDraft::finish`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordDraft {
    pub title: Option<String>,
    pub link: Option<String>,
    pub pdf_link: Option<String>,
    /// A date the parser already resolved.
    pub published: Option<PublishedOn>,
    /// Free text to resolve when `published` is absent.
    pub date_text: Option<String>,
    /// Last resort when neither of the above resolves.
    pub year: Option<i32>,
    pub venue: Option<String>,
    pub publication_type: PublicationType,
    pub affiliation: Option<String>,
    pub citations: Option<u64>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| clean_text(&s))
        .filter(|s| !s.is_empty())
}

impl RecordDraft {
    pub fn new(publication_type: PublicationType) -> Self {
        Self {
            publication_type,
            ..Self::default()
        }
    }

    /// Resolved date: explicit date, then the date text, then the year.
    pub fn resolve_date(&self) -> Result<PublishedOn, DropReason> {
        if let Some(published) = self.published {
            return Ok(published);
        }
        let from_text = self.date_text.as_deref().map(dates::resolve);
        match (from_text, self.year.and_then(PublishedOn::in_year)) {
            (Some(Ok(published)), _) => Ok(published),
            (_, Some(published)) => Ok(published),
            (Some(Err(e)), None) => Err(e.into()),
            (None, None) => Err(DateError::Unresolvable(String::new()).into()),
        }
    }

    /// Validate and normalize into a record.
    ///
    /// Whitespace in the title, venue and affiliation is collapsed. The
    /// affiliation is matched case-insensitively against the institution, if
    /// one is set.
    ///
    /// # Arguments
    ///
    /// * `ctx` - The request, source tag, link requirement and institution
    ///
    /// # Returns
    ///
    /// The finished [`PublicationRecord`], or the [`DropReason`] for an item
    /// with no title, no resolvable date, or (when `ctx.require_link` is set)
    /// no link.
    pub fn finish(self, ctx: &RecordContext<'_>) -> Result<PublicationRecord, DropReason> {
        let title = non_blank(self.title.clone()).ok_or(DropReason::MissingTitle)?;
        let link = self
            .link
            .clone()
            .map(|l| l.trim().to_string())
            .unwrap_or_default();
        if ctx.require_link && link.is_empty() {
            return Err(DropReason::MissingLink);
        }
        let published = self.resolve_date()?;
        let affiliation = non_blank(self.affiliation).unwrap_or_default();
        let affiliation_match = ctx
            .institution
            .is_some_and(|inst| affiliation_matches(&affiliation, inst));

        Ok(PublicationRecord {
            full_name: ctx.request.full_name.clone(),
            profile_url: ctx.request.profile_url.clone(),
            link,
            pdf_link: self.pdf_link.map(|l| l.trim().to_string()).filter(|l| !l.is_empty()),
            published,
            data_source: ctx.data_source.to_string(),
            venue: non_blank(self.venue).unwrap_or_default(),
            title,
            publication_type: self.publication_type,
            affiliation,
            affiliation_match,
            citations: self.citations.unwrap_or(0),
        })
    }
}
