//! Semantic Scholar Graph API source.
//!
//! Pages through `/author/search` with nested `papers.*` fields, so one
//! request returns matching author profiles together with their papers.
//! Profiles whose name does not match the requested author are skipped; the
//! papers of the remaining ones become records, carrying citation counts and
//! open-access PDF links. An API key, when configured, goes in `x-api-key`.

use super::{Discovery, PageContext, ParsedPage, Source, json_body};
use crate::config::SourceConfig;
use crate::error::{FetchError, SourceError};
use crate::http::HttpRequest;
use crate::models::{FetchRequest, PublicationType, RecordDraft};
use crate::names;
use crate::tree::{as_list, at, str_at, text, u64_at};
use serde_json::Value;

const FIELDS: &str = "name,affiliations,papers.title,papers.year,papers.venue,papers.url,\
papers.citationCount,papers.publicationDate,papers.publicationTypes,papers.openAccessPdf";

pub struct SemanticScholar {
    config: SourceConfig,
}

impl SemanticScholar {
    pub fn new(config: SourceConfig) -> Self {
        Self { config }
    }
}

fn paper_type(paper: &Value) -> PublicationType {
    let types: Vec<String> = as_list(at(paper, &["publicationTypes"]))
        .into_iter()
        .filter_map(text)
        .collect();
    if types.iter().any(|t| t == "JournalArticle") {
        PublicationType::Journal
    } else if types.iter().any(|t| t == "Conference") {
        PublicationType::Conference
    } else {
        PublicationType::Unknown
    }
}

impl Source for SemanticScholar {
    fn name(&self) -> &'static str {
        "Semantic Scholar"
    }

    fn config(&self) -> &SourceConfig {
        &self.config
    }

    fn page_request(
        &self,
        request: &FetchRequest,
        page: usize,
        _discovery: &Discovery,
    ) -> Result<HttpRequest, FetchError> {
        let http = HttpRequest::get(self.config.endpoint("author/search"))
            .query("query", request.name.joined())
            .query("fields", FIELDS)
            .query("offset", page * self.config.page_size)
            .query("limit", self.config.page_size);
        Ok(match self.config.api_key.as_deref().filter(|k| !k.is_empty()) {
            Some(key) => http.header("x-api-key", key),
            None => http,
        })
    }

    fn parse_page(
        &self,
        body: &str,
        request: &FetchRequest,
        _ctx: &PageContext<'_>,
    ) -> Result<ParsedPage, SourceError> {
        let body = json_body(body)?;
        let authors = as_list(at(&body, &["data"]));

        let mut page = ParsedPage {
            total_hits: u64_at(&body, &["total"]).map(|n| n as usize),
            item_count: authors.len(),
            entries: Vec::new(),
        };
        for author in authors {
            let name = str_at(author, &["name"]).unwrap_or_default();
            if !names::is_a_match(&request.full_name, &name) {
                continue;
            }
            let affiliation = as_list(at(author, &["affiliations"]))
                .into_iter()
                .find_map(text);
            for paper in as_list(at(author, &["papers"])) {
                page.entries.push(Ok(RecordDraft {
                    title: str_at(paper, &["title"]),
                    link: str_at(paper, &["url"]),
                    pdf_link: str_at(paper, &["openAccessPdf", "url"]),
                    date_text: str_at(paper, &["publicationDate"]),
                    year: u64_at(paper, &["year"]).and_then(|y| i32::try_from(y).ok()),
                    venue: str_at(paper, &["venue"]),
                    affiliation: affiliation.clone(),
                    citations: u64_at(paper, &["citationCount"]),
                    ..RecordDraft::new(paper_type(paper))
                }));
            }
        }
        Ok(page)
    }
}
