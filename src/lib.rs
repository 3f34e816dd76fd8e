//! # faculty_pubs
//!
//! Collects publication metadata for a list of faculty from academic, patent,
//! grant and news sources, keeps one JSON blob per source, and aggregates the
//! blobs into a tab-delimited report.
//!
//! ## Architecture
//!
//! 1. **Roster**: read `(name, profile url)` pairs ([`roster`])
//! 2. **Fetching**: for each selected source, a [`fetcher::Fetcher`] walks the
//!    source's paginated search for every author, one request at a time
//!    ([`scrapers`] describe the requests and parse the pages)
//! 3. **Normalization**: items become [`models::PublicationRecord`]s through
//!    [`models::RecordDraft::finish`]; undated or untitled items are dropped
//!    and records outside the date window are filtered out
//! 4. **Output**: per-source JSON blobs, later aggregated into one report
//!    ([`outputs`])

pub mod cli;
pub mod config;
pub mod dates;
pub mod error;
pub mod fetcher;
pub mod http;
pub mod models;
pub mod names;
pub mod outputs;
pub mod roster;
pub mod scrapers;
pub mod tree;
pub mod utils;
