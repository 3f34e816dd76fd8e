//! Error taxonomy for the fetch pipeline.
//!
//! Failures are layered so each one is handled at the level that can recover
//! from it:
//!
//! - [`DropReason`]: a single item is rejected; the page goes on.
//! - [`SourceError`]: a page (or discovery body) could not be parsed; the walk
//!   skips that page.
//! - [`FetchError`]: the author fetch itself failed; the batch logs it, cools
//!   down and moves to the next author.
//!
//! Nothing here is fatal to a batch.

/// No date strategy could make sense of a piece of text.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DateError {
    #[error("no date, month-year or year found in {0:?}")]
    Unresolvable(String),
}

/// Why a parsed item did not become a [`PublicationRecord`](crate::models::PublicationRecord).
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    #[error("item has no title")]
    MissingTitle,

    #[error("item has no link")]
    MissingLink,

    #[error("item date is unresolvable: {0}")]
    UnresolvableDate(#[from] DateError),

    #[error("malformed item: {0}")]
    Malformed(String),
}

/// A response body that could not be parsed as the source's page format.
#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid XML: {0}")]
    Xml(String),

    #[error("unexpected HTML: {0}")]
    Html(String),

    #[error("missing field `{0}`")]
    MissingField(&'static str),
}

/// Failure of one author fetch.
#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    /// The request could not be built from the caller's input.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The source is missing something it needs (API key, base URL, ...).
    #[error("configuration error: {0}")]
    Config(String),

    /// Connection, timeout or TLS failure.
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl FetchError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
