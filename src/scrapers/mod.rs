//! Publication sources.
//!
//! Each submodule describes one external system: how to build its discovery
//! and page requests, and how to read its responses into [`RecordDraft`]s.
//! None of them touch the network; [`crate::fetcher::Fetcher`] drives them.
//!
//! # Supported Sources
//!
//! | Source | Module | Format | Hit count |
//! |--------|--------|--------|-----------|
//! | ACM Digital Library | [`acm`] | HTML | discovery page (`span.hitsLength`) |
//! | arXiv | [`arxiv`] | Atom XML | first page (`totalResults`) |
//! | DBLP | [`dblp`] | JSON | first page (`@total`) |
//! | PubMed (Entrez) | [`pubmed`] | XML | discovery (`esearch` history) |
//! | Semantic Scholar | [`semantic_scholar`] | JSON | first page (`total`) |
//! | New York Times | [`nytimes`] | JSON | first page (`meta.hits`) |
//! | NIH RePORTER | [`nih`] | JSON (POST) | first page (`meta.total`) |
//! | NeurIPS proceedings | [`neurips`] | HTML | one page per year |
//! | ICML proceedings (PMLR) | [`icml`] | HTML | one page per volume |
//! | EPO OPS | [`epo`] | XML | first page (`@total-result-count`) |

use crate::config::{SourceConfig, SourceKind};
use crate::error::{DropReason, FetchError, SourceError};
use crate::http::HttpRequest;
use crate::models::{FetchRequest, RecordDraft};
use scraper::Selector;
use serde_json::Value;

pub mod acm;
pub mod arxiv;
pub mod dblp;
pub mod epo;
pub mod icml;
pub mod neurips;
pub mod nih;
pub mod nytimes;
pub mod pubmed;
pub mod semantic_scholar;

/// What a discovery request taught us before paging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Discovery {
    /// Total hits, when the discovery response reports them.
    pub hits: Option<usize>,
    /// Opaque key/value pairs to replay on every page (e.g. Entrez history).
    pub session: Vec<(String, String)>,
    pub affiliation: Option<String>,
    /// Bearer token for page requests.
    pub token: Option<String>,
}

impl Discovery {
    pub fn session_value(&self, key: &str) -> Option<&str> {
        self.session
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Per-page information handed to [`Source::parse_page`].
#[derive(Debug, Clone, Copy)]
pub struct PageContext<'a> {
    /// Zero-based page index.
    pub index: usize,
    pub discovery: &'a Discovery,
}

/// One parsed page.
#[derive(Debug, Default)]
pub struct ParsedPage {
    /// Total hits, if this page reports them.
    pub total_hits: Option<usize>,
    /// Raw items on the page, before author filtering. Drives the short-page
    /// stop when no total is known.
    pub item_count: usize,
    /// Items that belong to the author, parsed or rejected.
    pub entries: Vec<Result<RecordDraft, DropReason>>,
}

/// An external system that publications can be fetched from.
pub trait Source: Send + Sync {
    /// Data source name stamped on every record.
    fn name(&self) -> &'static str;

    fn config(&self) -> &SourceConfig;

    /// Whether records without a link are dropped.
    fn requires_link(&self) -> bool {
        false
    }

    /// Request issued once per author before paging, if any.
    fn discovery_request(&self, _request: &FetchRequest) -> Result<Option<HttpRequest>, FetchError> {
        Ok(None)
    }

    fn parse_discovery(&self, _body: &str) -> Result<Discovery, SourceError> {
        Ok(Discovery::default())
    }

    /// When false, a failed discovery is logged and paging proceeds anyway.
    fn discovery_required(&self) -> bool {
        true
    }

    /// A page count known up front, independent of any hit count.
    fn planned_pages(&self, _request: &FetchRequest) -> Option<usize> {
        None
    }

    fn page_request(
        &self,
        request: &FetchRequest,
        page: usize,
        discovery: &Discovery,
    ) -> Result<HttpRequest, FetchError>;

    fn parse_page(
        &self,
        body: &str,
        request: &FetchRequest,
        ctx: &PageContext<'_>,
    ) -> Result<ParsedPage, SourceError>;
}

/// Construct the source for `kind`.
pub fn build(kind: SourceKind, config: SourceConfig) -> Box<dyn Source> {
    match kind {
        SourceKind::Acm => Box::new(acm::Acm::new(config)),
        SourceKind::Arxiv => Box::new(arxiv::Arxiv::new(config)),
        SourceKind::Dblp => Box::new(dblp::Dblp::new(config)),
        SourceKind::Pubmed => Box::new(pubmed::Pubmed::new(config)),
        SourceKind::SemanticScholar => Box::new(semantic_scholar::SemanticScholar::new(config)),
        SourceKind::Nytimes => Box::new(nytimes::Nytimes::new(config)),
        SourceKind::Nih => Box::new(nih::Nih::new(config)),
        SourceKind::Neurips => Box::new(neurips::Neurips::new(config)),
        SourceKind::Icml => Box::new(icml::Icml::new(config)),
        SourceKind::Epo => Box::new(epo::Epo::new(config)),
    }
}

/// Number of page requests needed for `hits` at `page_size` per page.
pub fn pages_for(hits: usize, page_size: usize) -> usize {
    hits.div_ceil(page_size.max(1))
}

pub(crate) fn selector(css: &str) -> Result<Selector, SourceError> {
    Selector::parse(css).map_err(|e| SourceError::Html(format!("bad selector {css:?}: {e}")))
}

pub(crate) fn json_body(body: &str) -> Result<Value, SourceError> {
    Ok(serde_json::from_str(body)?)
}

pub(crate) fn require_key<'a>(key: &'a Option<String>, what: &str) -> Result<&'a str, FetchError> {
    key.as_deref()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| FetchError::config(format!("{what} is not configured")))
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::models::FetchRequest;
    use chrono::NaiveDate;

    pub fn request(name: &str, start: (i32, u32, u32), end: (i32, u32, u32)) -> FetchRequest {
        FetchRequest::new(
            name,
            "https://example.edu/profile",
            NaiveDate::from_ymd_opt(start.0, start.1, start.2).unwrap(),
            NaiveDate::from_ymd_opt(end.0, end.1, end.2).unwrap(),
        )
        .unwrap()
    }
}
