//! ACM Digital Library search scraper.
//!
//! The DL has no public API, so this reads the HTML search results at
//! `/action/doSearch`. A first request reads the hit count from
//! `span.hitsLength`; pages of `page_size` results follow, addressed by a
//! zero-based `startPage`.
//!
//! Items without a link are dropped. Dates come from the "Month Year" blurb
//! in `div.bookPubDate`.

use super::{Discovery, PageContext, ParsedPage, Source, selector};
use crate::config::SourceConfig;
use crate::error::{DropReason, FetchError, SourceError};
use crate::http::HttpRequest;
use crate::models::{FetchRequest, PublicationType, RecordDraft};
use scraper::{ElementRef, Html};
use tracing::debug;

pub struct Acm {
    config: SourceConfig,
}

impl Acm {
    pub fn new(config: SourceConfig) -> Self {
        Self { config }
    }

    fn search(&self, request: &FetchRequest) -> HttpRequest {
        HttpRequest::get(self.config.endpoint("action/doSearch"))
            .query("AllField", format!("\"{}\"", request.name.joined()))
            .query("expand", "all")
    }

    fn parse_item(&self, item: ElementRef<'_>) -> Result<RecordDraft, SourceError> {
        let first = |css: &str| first_match(item, css);
        let mut draft = RecordDraft::default();

        if let Some(heading) = first("span.issue-item__heading")? {
            draft.publication_type = PublicationType::from_label(&text_of(heading));
        }
        if let Some(title) = first("span.hlFld-Title, span.hlFld-ContentGroupTitle")? {
            draft.title = Some(text_of(title));
        }
        if let Some(detail) = first("div.issue-item__detail")? {
            draft.venue = detail
                .select(&selector("a")?)
                .next()
                .and_then(|a| a.value().attr("title"))
                .map(str::to_string);
            draft.link = detail
                .select(&selector("a.issue-item__doi")?)
                .next()
                .and_then(|a| a.value().attr("href"))
                .map(str::to_string);
        }
        if let Some(anchor) = first("h5.issue-item__title a")? {
            if let Some(href) = anchor.value().attr("href") {
                draft.link = Some(self.config.absolute(href));
            }
            draft.title = Some(text_of(anchor));
        }
        draft.date_text = first("div.bookPubDate")?.map(text_of);

        Ok(draft)
    }
}

fn first_match<'a>(el: ElementRef<'a>, css: &str) -> Result<Option<ElementRef<'a>>, SourceError> {
    Ok(el.select(&selector(css)?).next())
}

fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Hit count text such as `"1,234"`.
fn parse_hits(text: &str) -> Option<usize> {
    text.chars()
        .filter(|c| c.is_ascii_digit())
        .collect::<String>()
        .parse()
        .ok()
}

impl Source for Acm {
    fn name(&self) -> &'static str {
        "ACM"
    }

    fn config(&self) -> &SourceConfig {
        &self.config
    }

    fn requires_link(&self) -> bool {
        true
    }

    fn discovery_request(&self, request: &FetchRequest) -> Result<Option<HttpRequest>, FetchError> {
        Ok(Some(self.search(request)))
    }

    fn parse_discovery(&self, body: &str) -> Result<Discovery, SourceError> {
        let document = Html::parse_document(body);
        let hits = match document.select(&selector("span.hitsLength")?).next() {
            Some(span) => parse_hits(&span.text().collect::<String>())
                .ok_or_else(|| SourceError::Html("unreadable span.hitsLength".to_string()))?,
            // No results block at all means no hits.
            None => 0,
        };
        Ok(Discovery {
            hits: Some(hits),
            ..Discovery::default()
        })
    }

    fn page_request(
        &self,
        request: &FetchRequest,
        page: usize,
        _discovery: &Discovery,
    ) -> Result<HttpRequest, FetchError> {
        Ok(self
            .search(request)
            .query("pageSize", self.config.page_size)
            .query("startPage", page))
    }

    fn parse_page(
        &self,
        body: &str,
        _request: &FetchRequest,
        ctx: &PageContext<'_>,
    ) -> Result<ParsedPage, SourceError> {
        let document = Html::parse_document(body);
        let item_selector = selector("li.search__item.issue-item-container")?;

        let mut page = ParsedPage::default();
        for item in document.select(&item_selector) {
            page.item_count += 1;
            page.entries.push(
                self.parse_item(item)
                    .map_err(|e| DropReason::Malformed(e.to_string())),
            );
        }
        debug!(page = ctx.index, items = page.item_count, "Parsed ACM results page");
        Ok(page)
    }
}
