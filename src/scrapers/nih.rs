//! NIH RePORTER project search.
//!
//! `POST /v2/projects/search` with a `pi_names` criterion, paged by
//! `offset`/`limit` in the JSON body; `meta.total` gives the hit count.
//! A project is kept when one of its principal investigators matches the
//! author, and becomes a grant record dated by its start date, with the
//! awardee organization as affiliation.

use super::{Discovery, PageContext, ParsedPage, Source, json_body};
use crate::config::SourceConfig;
use crate::error::{FetchError, SourceError};
use crate::http::HttpRequest;
use crate::models::{FetchRequest, PublicationType, RecordDraft};
use crate::names;
use crate::tree::{as_list, at, str_at, u64_at};
use serde_json::{Value, json};

const INCLUDE_FIELDS: [&str; 8] = [
    "ApplId",
    "ProjectNum",
    "ProjectTitle",
    "ProjectStartDate",
    "FiscalYear",
    "Organization",
    "PrincipalInvestigators",
    "ProjectDetailUrl",
];

pub struct Nih {
    config: SourceConfig,
}

impl Nih {
    pub fn new(config: SourceConfig) -> Self {
        Self { config }
    }
}

fn investigators(project: &Value) -> Vec<String> {
    as_list(at(project, &["principal_investigators"]))
        .into_iter()
        .filter_map(|pi| {
            str_at(pi, &["full_name"]).or_else(|| {
                let first = str_at(pi, &["first_name"]).unwrap_or_default();
                let last = str_at(pi, &["last_name"])?;
                Some(format!("{first} {last}"))
            })
        })
        .collect()
}

impl Source for Nih {
    fn name(&self) -> &'static str {
        "nih"
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
        let body = json!({
            "criteria": {
                "pi_names": [{
                    "first_name": request.name.first,
                    "last_name": request.name.last,
                }],
            },
            "include_fields": INCLUDE_FIELDS,
            "offset": page * self.config.page_size,
            "limit": self.config.page_size,
            "sort_field": "project_start_date",
            "sort_order": "desc",
        });
        Ok(HttpRequest::post(self.config.endpoint("v2/projects/search")).json(body))
    }

    fn parse_page(
        &self,
        body: &str,
        request: &FetchRequest,
        _ctx: &PageContext<'_>,
    ) -> Result<ParsedPage, SourceError> {
        let body = json_body(body)?;
        let projects = as_list(at(&body, &["results"]));

        let mut page = ParsedPage {
            total_hits: u64_at(&body, &["meta", "total"]).map(|n| n as usize),
            item_count: projects.len(),
            entries: Vec::new(),
        };
        for project in projects {
            let pis = investigators(project);
            if !names::any_match(&request.full_name, pis.iter().map(String::as_str)) {
                continue;
            }
            page.entries.push(Ok(RecordDraft {
                title: str_at(project, &["project_title"]),
                link: str_at(project, &["project_detail_url"]),
                date_text: str_at(project, &["project_start_date"]),
                year: u64_at(project, &["fiscal_year"]).and_then(|y| i32::try_from(y).ok()),
                venue: str_at(project, &["project_num"]),
                affiliation: str_at(project, &["organization", "org_name"]),
                ..RecordDraft::new(PublicationType::Grant)
            }));
        }
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceKind;
    use crate::fetcher::Fetcher;
    use crate::http::Body;
    use crate::scrapers::test_support::request;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn nih(base: &str) -> Nih {
        let mut config = SourceConfig::defaults_for(SourceKind::Nih);
        config.base_url = base.to_string();
        Nih::new(config)
    }

    #[test]
    fn test_post_body() {
        let req = request("Jennifer G. Dy", (2020, 1, 1), (2022, 12, 31));
        let http = nih("https://api.reporter.nih.gov")
            .page_request(&req, 1, &Discovery::default())
            .unwrap();
        assert_eq!(http.url, "https://api.reporter.nih.gov/v2/projects/search");
        let Body::Json(body) = &http.body else {
            panic!("expected a JSON body");
        };
        assert_eq!(body["offset"], 500);
        assert_eq!(body["limit"], 500);
        assert_eq!(body["criteria"]["pi_names"][0]["last_name"], "Dy");
    }

    #[test]
    fn test_investigator_names() {
        let project = json!({"principal_investigators": [
            {"first_name": "JENNIFER", "last_name": "DY"},
            {"full_name": "Alice B Smith", "first_name": "Alice", "last_name": "Smith"}
        ]});
        assert_eq!(investigators(&project), vec!["JENNIFER DY", "Alice B Smith"]);
    }

    #[tokio::test]
    async fn test_grants_for_matching_pi() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/projects/search"))
            .and(body_partial_json(json!({"offset": 0})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "meta": {"total": 2, "offset": 0, "limit": 500},
                "results": [
                    {
                        "project_num": "5R01AA000001-02",
                        "project_title": "Interpretable models for health",
                        "project_start_date": "2021-09-01T12:09:00Z",
                        "fiscal_year": 2022,
                        "organization": {"org_name": "NORTHEASTERN UNIVERSITY"},
                        "principal_investigators": [{"first_name": "JENNIFER", "last_name": "DY"}],
                        "project_detail_url": "https://reporter.nih.gov/project-details/1"
                    },
                    {
                        "project_title": "Other PI",
                        "project_start_date": "2021-09-01T12:09:00Z",
                        "principal_investigators": [{"first_name": "JOHN", "last_name": "DOE"}]
                    }
                ]
            })))
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(Box::new(nih(&server.uri())), Some("Northeastern University".to_string())).unwrap();
        let outcome = fetcher
            .fetch_for_author(&request("Jennifer Dy", (2021, 1, 1), (2022, 12, 31)))
            .await
            .unwrap();

        assert_eq!(outcome.pages_requested, 1);
        assert_eq!(outcome.records.len(), 1);
        let grant = &outcome.records[0];
        assert_eq!(grant.publication_type, PublicationType::Grant);
        assert_eq!(grant.affiliation, "NORTHEASTERN UNIVERSITY");
        assert!(grant.affiliation_match);
        assert_eq!(grant.published.date().to_string(), "2021-09-01");
    }
}
