//! ICML proceedings (proceedings.mlr.press).
//!
//! PMLR publishes each ICML as one numbered volume, `/v{N}`, listing every
//! paper as a `div.paper` with a `p.title`, a `span.authors` list and
//! `p.links` anchors (abstract page first, PDF second). The volume's `h2`
//! header carries the conference name and dates, e.g.
//! `Volume 202: International Conference on Machine Learning, 23-29 July 2023, ...`.
//! One page is fetched per ICML volume in the window.

use super::{Discovery, PageContext, ParsedPage, Source, selector};
use crate::config::SourceConfig;
use crate::error::{FetchError, SourceError};
use crate::http::HttpRequest;
use crate::models::{FetchRequest, PublicationType, RecordDraft};
use crate::names;
use crate::utils::clean_text;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html};

/// ICML year and its PMLR volume number.
const VOLUMES: [(i32, u32); 13] = [
    (2013, 28),
    (2014, 32),
    (2015, 37),
    (2016, 48),
    (2017, 70),
    (2018, 80),
    (2019, 97),
    (2020, 119),
    (2021, 139),
    (2022, 162),
    (2023, 202),
    (2024, 235),
    (2025, 267),
];

/// `Volume N: <conference>, <d[-d]> <month...> <yyyy>`
static VOLUME_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Volume\s+\d+:\s+(.*?),\s+\d{1,2}(?:\s*-\s*\d{1,2})?\s+\S.*?\s(\d{4})\b").unwrap()
});

pub struct Icml {
    config: SourceConfig,
}

impl Icml {
    pub fn new(config: SourceConfig) -> Self {
        Self { config }
    }
}

/// `(year, volume)` pairs inside the window's years, oldest first.
fn volumes_for(request: &FetchRequest) -> Vec<(i32, u32)> {
    let years = request.window.years();
    VOLUMES.into_iter().filter(|(year, _)| years.contains(year)).collect()
}

/// Conference name and year from a volume header.
fn conference_and_year(header: &str) -> Option<(String, i32)> {
    let header = clean_text(header);
    let caps = VOLUME_HEADER.captures(&header)?;
    let year = caps[2].parse().ok()?;
    Some((caps[1].trim().to_string(), year))
}

fn text_of(element: ElementRef<'_>) -> String {
    clean_text(&element.text().collect::<String>())
}

impl Source for Icml {
    fn name(&self) -> &'static str {
        "icml"
    }

    fn config(&self) -> &SourceConfig {
        &self.config
    }

    fn requires_link(&self) -> bool {
        true
    }

    fn planned_pages(&self, request: &FetchRequest) -> Option<usize> {
        Some(volumes_for(request).len())
    }

    fn page_request(
        &self,
        request: &FetchRequest,
        page: usize,
        _discovery: &Discovery,
    ) -> Result<HttpRequest, FetchError> {
        let (_, volume) = volumes_for(request)
            .get(page)
            .copied()
            .ok_or_else(|| FetchError::invalid(format!("no ICML volume for page {page}")))?;
        Ok(HttpRequest::get(self.config.endpoint(&format!("v{volume}"))))
    }

    fn parse_page(
        &self,
        body: &str,
        request: &FetchRequest,
        _ctx: &PageContext<'_>,
    ) -> Result<ParsedPage, SourceError> {
        let document = Html::parse_document(body);
        let header = document
            .select(&selector("h2")?)
            .next()
            .map(text_of)
            .ok_or_else(|| SourceError::Html("no volume header".to_string()))?;
        let (conference, year) = conference_and_year(&header)
            .ok_or_else(|| SourceError::Html(format!("unrecognized volume header {header:?}")))?;

        let title_sel = selector("p.title")?;
        let authors_sel = selector("span.authors")?;
        let links_sel = selector("p.links a")?;

        let mut page = ParsedPage::default();
        for paper in document.select(&selector("div.paper")?) {
            page.item_count += 1;
            let authors = paper.select(&authors_sel).next().map(text_of).unwrap_or_default();
            if !names::any_match(&request.full_name, authors.split(',')) {
                continue;
            }
            let mut hrefs = paper
                .select(&links_sel)
                .filter_map(|a| a.value().attr("href"))
                .map(|href| self.config.absolute(href));
            page.entries.push(Ok(RecordDraft {
                title: paper.select(&title_sel).next().map(text_of),
                link: hrefs.next(),
                pdf_link: hrefs.next(),
                year: Some(year),
                venue: Some(conference.clone()),
                ..RecordDraft::new(PublicationType::Conference)
            }));
        }
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceKind;
    use crate::dates::DatePrecision;
    use crate::fetcher::Fetcher;
    use crate::scrapers::test_support::request;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn volume(header: &str, papers: &[(&str, &str, &str)]) -> String {
        let items: String = papers
            .iter()
            .map(|(slug, title, authors)| {
                format!(
                    r#"<div class="paper">
  <p class="title">{title}</p>
  <p class="details"><span class="authors">{authors}</span>; <span class="info">PMLR 202:1-10</span></p>
  <p class="links">[<a href="https://proceedings.mlr.press/v202/{slug}.html">abs</a>][<a href="https://proceedings.mlr.press/v202/{slug}/{slug}.pdf">Download PDF</a>]</p>
</div>"#
                )
            })
            .collect();
        format!(r#"<html><body><main><h2>{header}</h2>{items}</main></body></html>"#)
    }

    fn icml(base: &str) -> Icml {
        let mut config = SourceConfig::defaults_for(SourceKind::Icml);
        config.base_url = base.to_string();
        Icml::new(config)
    }

    #[test]
    fn test_conference_and_year() {
        assert_eq!(
            conference_and_year(
                "Volume 202: International Conference on Machine Learning, 23-29 July 2023, Honolulu, Hawaii, USA"
            ),
            Some(("International Conference on Machine Learning".to_string(), 2023))
        );
        assert_eq!(
            conference_and_year("Volume 28: Proceedings of The 30th International Conference on Machine Learning, 17 June 2013, Atlanta"),
            Some((
                "Proceedings of The 30th International Conference on Machine Learning".to_string(),
                2013
            ))
        );
        assert_eq!(conference_and_year("Proceedings of Machine Learning Research"), None);
    }

    #[test]
    fn test_one_page_per_volume_in_window() {
        let source = icml("https://proceedings.mlr.press");
        let req = request("Jennifer Dy", (2021, 6, 1), (2023, 2, 1));
        assert_eq!(source.planned_pages(&req), Some(3));
        let http = source.page_request(&req, 2, &Discovery::default()).unwrap();
        assert_eq!(http.url, "https://proceedings.mlr.press/v202");
        assert!(source.page_request(&req, 3, &Discovery::default()).is_err());

        let before = request("Jennifer Dy", (2001, 1, 1), (2005, 12, 31));
        assert_eq!(source.planned_pages(&before), Some(0));
    }

    #[tokio::test]
    async fn test_volume_parsed_and_authors_matched() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v162"))
            .respond_with(ResponseTemplate::new(200).set_body_string(volume(
                "Volume 162: International Conference on Machine Learning, 17-23 July 2022, Baltimore, Maryland, USA",
                &[
                    ("smith22a", "Paper A", "Alice Smith,\n Jennifer\u{a0}G.\u{a0}Dy"),
                    ("doe22b", "Paper B", "Jennifer Doe"),
                ],
            )))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v202"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html><h2>Not found</h2></html>"))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(Box::new(icml(&server.uri())), None).unwrap();
        let outcome = fetcher
            .fetch_for_author(&request("Jennifer Dy", (2022, 1, 1), (2023, 12, 31)))
            .await
            .unwrap();

        assert_eq!(outcome.pages_requested, 2);
        assert_eq!(outcome.pages_failed, 1);
        assert_eq!(outcome.records.len(), 1);
        let record = &outcome.records[0];
        assert_eq!(record.title, "Paper A");
        assert_eq!(record.link, "https://proceedings.mlr.press/v202/smith22a.html");
        assert_eq!(
            record.pdf_link.as_deref(),
            Some("https://proceedings.mlr.press/v202/smith22a/smith22a.pdf")
        );
        assert_eq!(record.venue, "International Conference on Machine Learning");
        assert_eq!(record.published.year(), 2022);
        assert_eq!(record.published.precision(), DatePrecision::Year);
        assert_eq!(record.publication_type, PublicationType::Conference);
    }
}
