//! DBLP publication search.
//!
//! Pages come from `/search/publ/api` (JSON, `h` items from offset `f`), with
//! the total in `result.hits.@total`. Before paging, the author search at
//! `/search/author/api` is consulted for an affiliation note; that lookup is
//! optional and the walk proceeds without it when it fails.

use super::{Discovery, PageContext, ParsedPage, Source, json_body};
use crate::config::SourceConfig;
use crate::error::{FetchError, SourceError};
use crate::http::HttpRequest;
use crate::models::{FetchRequest, PublicationType, RecordDraft};
use crate::names;
use crate::tree::{as_list, at, str_at, text, u64_at};
use serde_json::Value;

pub struct Dblp {
    config: SourceConfig,
}

impl Dblp {
    pub fn new(config: SourceConfig) -> Self {
        Self { config }
    }
}

/// First `affiliation` note among the author hits.
fn affiliation_note(body: &Value) -> Option<String> {
    as_list(at(body, &["result", "hits", "hit"]))
        .into_iter()
        .flat_map(|hit| as_list(at(hit, &["info", "notes", "note"])))
        .find(|note| str_at(note, &["@type"]).as_deref() == Some("affiliation"))
        .and_then(|note| str_at(note, &["text"]))
}

/// DBLP authors are `{"@pid": .., "text": name}` objects, or bare strings.
fn author_name(node: &Value) -> Option<String> {
    str_at(node, &["text"]).or_else(|| text(node))
}

fn publication_type(link: &str) -> PublicationType {
    if link.contains("/journals/") {
        PublicationType::Journal
    } else if link.contains("/conf/") {
        PublicationType::Conference
    } else {
        PublicationType::Unknown
    }
}

impl Source for Dblp {
    fn name(&self) -> &'static str {
        "dblp"
    }

    fn config(&self) -> &SourceConfig {
        &self.config
    }

    fn discovery_request(&self, request: &FetchRequest) -> Result<Option<HttpRequest>, FetchError> {
        Ok(Some(
            HttpRequest::get(self.config.endpoint("search/author/api"))
                .query("q", request.name.joined())
                .query("format", "json")
                .query("h", 100),
        ))
    }

    fn parse_discovery(&self, body: &str) -> Result<Discovery, SourceError> {
        Ok(Discovery {
            affiliation: affiliation_note(&json_body(body)?),
            ..Discovery::default()
        })
    }

    fn discovery_required(&self) -> bool {
        false
    }

    fn page_request(
        &self,
        request: &FetchRequest,
        page: usize,
        _discovery: &Discovery,
    ) -> Result<HttpRequest, FetchError> {
        Ok(HttpRequest::get(self.config.endpoint("search/publ/api"))
            .query("q", request.name.joined())
            .query("format", "json")
            .query("h", self.config.page_size)
            .query("f", page * self.config.page_size))
    }

    fn parse_page(
        &self,
        body: &str,
        request: &FetchRequest,
        _ctx: &PageContext<'_>,
    ) -> Result<ParsedPage, SourceError> {
        let body = json_body(body)?;
        let hits = at(&body, &["result", "hits"]).ok_or(SourceError::MissingField("result.hits"))?;
        let items = as_list(at(hits, &["hit"]));

        let mut page = ParsedPage {
            total_hits: u64_at(hits, &["@total"]).map(|n| n as usize),
            item_count: items.len(),
            entries: Vec::new(),
        };
        for item in items {
            let Some(info) = at(item, &["info"]) else {
                continue;
            };
            let authors: Vec<String> = as_list(at(info, &["authors", "author"]))
                .into_iter()
                .filter_map(author_name)
                .collect();
            if !authors.is_empty()
                && !names::any_match(&request.full_name, authors.iter().map(String::as_str))
            {
                continue;
            }

            let link = str_at(info, &["url"]);
            let kind = link.as_deref().map(publication_type).unwrap_or_default();
            page.entries.push(Ok(RecordDraft {
                title: str_at(info, &["title"]).map(|t| t.trim_end_matches('.').to_string()),
                link,
                date_text: str_at(info, &["published"]),
                year: str_at(info, &["year"]).and_then(|y| y.parse().ok()),
                venue: str_at(info, &["venue"]),
                ..RecordDraft::new(kind)
            }));
        }
        Ok(page)
    }
}
