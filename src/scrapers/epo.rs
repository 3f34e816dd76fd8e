//! European Patent Office, Open Patent Services (OPS).
//!
//! OPS needs an OAuth bearer token: discovery posts the consumer key and
//! secret (basic auth, `grant_type=client_credentials`) to `auth/accesstoken`
//! once per author. Pages then query `published-data/search/biblio` for the
//! inventor, addressed by a 1-based `Range` of `lo-hi`, and read the
//! exchange-document XML. Patents are dated by their docdb publication date.

use super::{Discovery, PageContext, ParsedPage, Source, json_body, require_key};
use crate::config::SourceConfig;
use crate::error::{FetchError, SourceError};
use crate::http::HttpRequest;
use crate::models::{FetchRequest, PublicationType, RecordDraft};
use crate::names;
use crate::tree::{as_list, at, str_at, text, u64_at, xml_to_value};
use serde_json::Value;
use tracing::warn;

/// Widest `Range` OPS accepts.
const MAX_RANGE: usize = 100;

pub struct Epo {
    config: SourceConfig,
}

impl Epo {
    /// `page_size` is clamped to the `1..=100` range OPS serves.
    pub fn new(mut config: SourceConfig) -> Self {
        let size = config.page_size.clamp(1, MAX_RANGE);
        if size != config.page_size {
            warn!(requested = config.page_size, using = size, "EPO page size out of range");
            config.page_size = size;
        }
        Self { config }
    }
}

/// CQL query: inventor name within the publication-date window.
fn cql(request: &FetchRequest) -> String {
    format!(
        "in=\"{}\" and pd within \"{} {}\"",
        request.name.joined(),
        request.window.start().format("%Y%m%d"),
        request.window.end().format("%Y%m%d"),
    )
}

/// English title when present, else the first one listed.
fn invention_title(biblio: &Value) -> Option<String> {
    let titles = as_list(at(biblio, &["invention-title"]));
    titles
        .iter()
        .find(|t| str_at(t, &["@lang"]).as_deref() == Some("en"))
        .or_else(|| titles.first())
        .and_then(|t| text(t))
}

/// Names under `parties/<group>/<party>/<party>-name/name`.
fn party_names(biblio: &Value, group: &str, party: &str) -> Vec<String> {
    let name_key = format!("{party}-name");
    as_list(at(biblio, &["parties", group, party]))
        .into_iter()
        .filter_map(|p| str_at(p, &[name_key.as_str(), "name"]))
        .collect()
}

fn espacenet_link(country: &str, number: &str, kind: &str) -> String {
    let query = format!("pn={country}{number}{kind}");
    format!(
        "https://worldwide.espacenet.com/patent/search?q={}",
        urlencoding::encode(&query)
    )
}

fn draft_for(document: &Value, request: &FetchRequest) -> Option<RecordDraft> {
    let biblio = at(document, &["bibliographic-data"])?;
    let inventors = party_names(biblio, "inventors", "inventor");
    if !inventors.is_empty() && !names::any_match(&request.full_name, inventors.iter().map(String::as_str)) {
        return None;
    }

    let docdb = as_list(at(biblio, &["publication-reference", "document-id"]))
        .into_iter()
        .find(|id| str_at(id, &["@document-id-type"]).as_deref() == Some("docdb"));
    let link = docdb.and_then(|id| {
        Some(espacenet_link(
            &str_at(id, &["country"])?,
            &str_at(id, &["doc-number"])?,
            &str_at(id, &["kind"]).unwrap_or_default(),
        ))
    });

    Some(RecordDraft {
        title: invention_title(biblio),
        link,
        date_text: docdb.and_then(|id| str_at(id, &["date"])),
        venue: Some("European Patent Office".to_string()),
        affiliation: party_names(biblio, "applicants", "applicant").into_iter().next(),
        ..RecordDraft::new(PublicationType::Other("patent".to_string()))
    })
}

impl Source for Epo {
    fn name(&self) -> &'static str {
        "epo"
    }

    fn config(&self) -> &SourceConfig {
        &self.config
    }

    fn discovery_request(&self, _request: &FetchRequest) -> Result<Option<HttpRequest>, FetchError> {
        let key = require_key(&self.config.api_key, "EPO consumer key")?;
        let secret = require_key(&self.config.api_secret, "EPO consumer secret")?;
        Ok(Some(
            HttpRequest::post(self.config.endpoint("auth/accesstoken"))
                .basic_auth(key, secret)
                .form(&[("grant_type", "client_credentials")]),
        ))
    }

    fn parse_discovery(&self, body: &str) -> Result<Discovery, SourceError> {
        let body = json_body(body)?;
        let token = str_at(&body, &["access_token"]).ok_or(SourceError::MissingField("access_token"))?;
        Ok(Discovery {
            token: Some(token),
            ..Discovery::default()
        })
    }

    fn page_request(
        &self,
        request: &FetchRequest,
        page: usize,
        discovery: &Discovery,
    ) -> Result<HttpRequest, FetchError> {
        let token = discovery
            .token
            .as_deref()
            .ok_or_else(|| FetchError::invalid("no OPS access token"))?;
        let size = self.config.page_size;
        let lo = page * size + 1;
        Ok(
            HttpRequest::get(self.config.endpoint("rest-services/published-data/search/biblio"))
                .query("q", cql(request))
                .query("Range", format!("{lo}-{}", lo + size - 1))
                .header("Accept", "application/exchange+xml")
                .bearer(token),
        )
    }

    fn parse_page(
        &self,
        body: &str,
        request: &FetchRequest,
        _ctx: &PageContext<'_>,
    ) -> Result<ParsedPage, SourceError> {
        let tree = xml_to_value(body)?;
        let search = at(&tree, &["world-patent-data", "biblio-search"])
            .ok_or(SourceError::MissingField("biblio-search"))?;
        let documents: Vec<&Value> = as_list(at(search, &["search-result", "exchange-documents"]))
            .into_iter()
            .flat_map(|docs| as_list(at(docs, &["exchange-document"])))
            .collect();

        Ok(ParsedPage {
            total_hits: u64_at(search, &["@total-result-count"]).map(|n| n as usize),
            item_count: documents.len(),
            entries: documents
                .into_iter()
                .filter_map(|doc| draft_for(doc, request))
                .map(Ok)
                .collect(),
        })
    }
}
