//! arXiv API source.
//!
//! Queries the Atom feed at `/api/query` with `au:first AND au:last`, paged by
//! `start`/`max_results`. The first page's `opensearch:totalResults` sets the
//! page count. Entries whose author list has no match for the requested
//! author are skipped.

use super::{Discovery, PageContext, ParsedPage, Source};
use crate::config::SourceConfig;
use crate::error::{FetchError, SourceError};
use crate::http::HttpRequest;
use crate::models::{FetchRequest, PublicationType, RecordDraft};
use crate::names;
use crate::tree::{as_list, at, str_at, u64_at, xml_to_value};
use serde_json::Value;

pub struct Arxiv {
    config: SourceConfig,
}

impl Arxiv {
    pub fn new(config: SourceConfig) -> Self {
        Self { config }
    }
}

fn entry_authors(entry: &Value) -> Vec<String> {
    as_list(at(entry, &["author"]))
        .into_iter()
        .filter_map(|author| str_at(author, &["name"]))
        .collect()
}

fn pdf_link(entry: &Value) -> Option<String> {
    as_list(at(entry, &["link"]))
        .into_iter()
        .find(|link| str_at(link, &["@title"]).as_deref() == Some("pdf"))
        .and_then(|link| str_at(link, &["@href"]))
}

impl Source for Arxiv {
    fn name(&self) -> &'static str {
        "arxiv"
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
        let name = &request.name;
        Ok(HttpRequest::get(self.config.endpoint("api/query"))
            .query("search_query", format!("au:{} AND au:{}", name.first, name.last))
            .query("start", page * self.config.page_size)
            .query("max_results", self.config.page_size))
    }

    fn parse_page(
        &self,
        body: &str,
        request: &FetchRequest,
        _ctx: &PageContext<'_>,
    ) -> Result<ParsedPage, SourceError> {
        let feed = xml_to_value(body)?;
        let feed = at(&feed, &["feed"]).ok_or(SourceError::MissingField("feed"))?;
        let entries = as_list(at(feed, &["entry"]));

        let mut page = ParsedPage {
            total_hits: u64_at(feed, &["totalResults"]).map(|n| n as usize),
            item_count: entries.len(),
            entries: Vec::new(),
        };
        for entry in entries {
            let authors = entry_authors(entry);
            if !names::any_match(&request.full_name, authors.iter().map(String::as_str)) {
                continue;
            }
            page.entries.push(Ok(RecordDraft {
                title: str_at(entry, &["title"]),
                link: str_at(entry, &["id"]),
                pdf_link: pdf_link(entry),
                date_text: str_at(entry, &["updated"]).or_else(|| str_at(entry, &["published"])),
                venue: Some("arxiv".to_string()),
                ..RecordDraft::new(PublicationType::PrePrint)
            }));
        }
        Ok(page)
    }
}
