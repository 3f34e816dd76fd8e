//! PubMed through the NCBI Entrez E-utilities.
//!
//! Discovery runs `esearch.fcgi` with `usehistory=y` and `retmax=0`: the
//! response carries the hit `Count` and a history session (`WebEnv`,
//! `QueryKey`). Pages then replay that session against `efetch.fcgi` with
//! `retstart`/`retmax` and parse the returned `PubmedArticleSet` XML.

use super::{Discovery, PageContext, ParsedPage, Source};
use crate::config::SourceConfig;
use crate::dates::{PublishedOn, month_number};
use crate::error::{FetchError, SourceError};
use crate::http::HttpRequest;
use crate::models::{FetchRequest, PublicationType, RecordDraft};
use crate::names;
use crate::tree::{as_list, at, str_at, u64_at, xml_to_value};
use serde_json::Value;

pub struct Pubmed {
    config: SourceConfig,
}

impl Pubmed {
    pub fn new(config: SourceConfig) -> Self {
        Self { config }
    }

    fn with_key(&self, request: HttpRequest) -> HttpRequest {
        match self.config.api_key.as_deref().filter(|k| !k.is_empty()) {
            Some(key) => request.query("api_key", key),
            None => request,
        }
    }
}

/// Date from `PubDate`, falling back to `ArticleDate`.
fn parse_pub_date(article: &Value) -> (Option<PublishedOn>, Option<String>) {
    let from_node = |node: &Value| {
        let year = str_at(node, &["Year"])?.parse().ok()?;
        let month = str_at(node, &["Month"]).and_then(|m| month_number(&m));
        let day = str_at(node, &["Day"]).and_then(|d| d.parse().ok());
        PublishedOn::from_parts(year, month, day)
    };
    let pub_date = at(article, &["Journal", "JournalIssue", "PubDate"]);
    let published = pub_date
        .and_then(from_node)
        .or_else(|| as_list(at(article, &["ArticleDate"])).into_iter().find_map(from_node));
    let medline = pub_date.and_then(|d| str_at(d, &["MedlineDate"]));
    (published, medline)
}

/// `(display name, first affiliation)` for each listed author.
fn authors(article: &Value) -> Vec<(String, Option<String>)> {
    as_list(at(article, &["AuthorList", "Author"]))
        .into_iter()
        .filter_map(|author| {
            let last = str_at(author, &["LastName"])?;
            let fore = str_at(author, &["ForeName"]).or_else(|| str_at(author, &["Initials"]));
            let name = match fore {
                Some(fore) => format!("{fore} {last}"),
                None => last,
            };
            let affiliation = as_list(at(author, &["AffiliationInfo"]))
                .into_iter()
                .find_map(|info| str_at(info, &["Affiliation"]));
            Some((name, affiliation))
        })
        .collect()
}

impl Source for Pubmed {
    fn name(&self) -> &'static str {
        "pubmed"
    }

    fn config(&self) -> &SourceConfig {
        &self.config
    }

    fn discovery_request(&self, request: &FetchRequest) -> Result<Option<HttpRequest>, FetchError> {
        let term = format!("{}[Author]", request.name.joined());
        Ok(Some(self.with_key(
            HttpRequest::get(self.config.endpoint("esearch.fcgi"))
                .query("db", "pubmed")
                .query("term", term)
                .query("usehistory", "y")
                .query("retmax", 0),
        )))
    }

    fn parse_discovery(&self, body: &str) -> Result<Discovery, SourceError> {
        let tree = xml_to_value(body)?;
        let result = at(&tree, &["eSearchResult"]).ok_or(SourceError::MissingField("eSearchResult"))?;
        let hits = u64_at(result, &["Count"]).ok_or(SourceError::MissingField("Count"))? as usize;
        let mut session = Vec::new();
        for key in ["WebEnv", "QueryKey"] {
            match str_at(result, &[key]) {
                Some(value) => session.push((key.to_string(), value)),
                None if hits > 0 => return Err(SourceError::MissingField(key)),
                None => {}
            }
        }
        Ok(Discovery {
            hits: Some(hits),
            session,
            ..Discovery::default()
        })
    }

    fn page_request(
        &self,
        _request: &FetchRequest,
        page: usize,
        discovery: &Discovery,
    ) -> Result<HttpRequest, FetchError> {
        let web_env = discovery
            .session_value("WebEnv")
            .ok_or_else(|| FetchError::invalid("no Entrez history session"))?;
        let query_key = discovery.session_value("QueryKey").unwrap_or("1");
        Ok(self.with_key(
            HttpRequest::get(self.config.endpoint("efetch.fcgi"))
                .query("db", "pubmed")
                .query("WebEnv", web_env)
                .query("query_key", query_key)
                .query("retmode", "xml")
                .query("retstart", page * self.config.page_size)
                .query("retmax", self.config.page_size),
        ))
    }

    fn parse_page(
        &self,
        body: &str,
        request: &FetchRequest,
        _ctx: &PageContext<'_>,
    ) -> Result<ParsedPage, SourceError> {
        let tree = xml_to_value(body)?;
        let set = at(&tree, &["PubmedArticleSet"]).ok_or(SourceError::MissingField("PubmedArticleSet"))?;
        let articles = as_list(at(set, &["PubmedArticle"]));

        let mut page = ParsedPage {
            item_count: articles.len(),
            ..ParsedPage::default()
        };
        for item in articles {
            let citation = at(item, &["MedlineCitation"]);
            let Some(article) = citation.and_then(|c| at(c, &["Article"])) else {
                continue;
            };
            let listed = authors(article);
            let matching = listed
                .iter()
                .find(|(name, _)| names::is_a_match(&request.full_name, name));
            if !listed.is_empty() && matching.is_none() {
                continue;
            }

            let pmid = citation.and_then(|c| str_at(c, &["PMID"]));
            let (published, medline_date) = parse_pub_date(article);
            page.entries.push(Ok(RecordDraft {
                title: str_at(article, &["ArticleTitle"]),
                link: pmid.map(|id| format!("https://pubmed.ncbi.nlm.nih.gov/{id}/")),
                published,
                date_text: medline_date,
                venue: str_at(article, &["Journal", "Title"]),
                affiliation: matching.and_then(|(_, aff)| aff.clone()),
                ..RecordDraft::new(PublicationType::Journal)
            }));
        }
        Ok(page)
    }
}
