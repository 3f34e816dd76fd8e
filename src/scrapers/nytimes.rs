//! New York Times Article Search API.
//!
//! Searches `articlesearch.json` for the author's name inside the date
//! window (`begin_date`/`end_date` as `YYYYMMDD`). The API serves fixed pages
//! of ten documents, addressed by a zero-based `page` parameter, and requires
//! an API key.

use super::{Discovery, PageContext, ParsedPage, Source, json_body, require_key};
use crate::config::SourceConfig;
use crate::error::{FetchError, SourceError};
use crate::http::HttpRequest;
use crate::models::{FetchRequest, PublicationType, RecordDraft};
use crate::tree::{as_list, at, str_at, u64_at};

pub struct Nytimes {
    config: SourceConfig,
}

impl Nytimes {
    pub fn new(config: SourceConfig) -> Self {
        Self { config }
    }
}

impl Source for Nytimes {
    fn name(&self) -> &'static str {
        "nytimes"
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
        let key = require_key(&self.config.api_key, "New York Times API key")?;
        Ok(HttpRequest::get(self.config.endpoint("articlesearch.json"))
            .query("q", request.name.joined())
            .query("api-key", key)
            .query("begin_date", request.window.start().format("%Y%m%d"))
            .query("end_date", request.window.end().format("%Y%m%d"))
            .query("page", page))
    }

    fn parse_page(
        &self,
        body: &str,
        _request: &FetchRequest,
        _ctx: &PageContext<'_>,
    ) -> Result<ParsedPage, SourceError> {
        let body = json_body(body)?;
        let response = at(&body, &["response"]).ok_or(SourceError::MissingField("response"))?;
        let docs = as_list(at(response, &["docs"]));
        let total = u64_at(response, &["meta", "hits"]).or_else(|| u64_at(response, &["metadata", "hits"]));

        let entries = docs
            .iter()
            .map(|doc| {
                Ok(RecordDraft {
                    title: str_at(doc, &["headline", "main"]).or_else(|| str_at(doc, &["abstract"])),
                    link: str_at(doc, &["web_url"]),
                    date_text: str_at(doc, &["pub_date"]),
                    venue: str_at(doc, &["source"])
                        .or_else(|| Some("The New York Times".to_string())),
                    ..RecordDraft::new(PublicationType::NewsArticle)
                })
            })
            .collect();
        Ok(ParsedPage {
            total_hits: total.map(|n| n as usize),
            item_count: docs.len(),
            entries,
        })
    }
}
