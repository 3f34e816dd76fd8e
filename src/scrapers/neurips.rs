//! NeurIPS proceedings (papers.nips.cc).
//!
//! The proceedings site lists every accepted paper of a year on one page,
//! `/paper_files/paper/{year}`, as `ul.paper-list li` items holding the paper
//! link and an italic author list. One page is fetched per year in the
//! window; papers by the requested author become conference records dated
//! by year.

use super::{Discovery, PageContext, ParsedPage, Source, selector};
use crate::config::SourceConfig;
use crate::error::{FetchError, SourceError};
use crate::http::HttpRequest;
use crate::models::{FetchRequest, PublicationType, RecordDraft};
use crate::names;
use scraper::Html;

pub struct Neurips {
    config: SourceConfig,
}

impl Neurips {
    pub fn new(config: SourceConfig) -> Self {
        Self { config }
    }
}

fn year_for(request: &FetchRequest, page: usize) -> i32 {
    request.window.years().start() + page as i32
}

impl Source for Neurips {
    fn name(&self) -> &'static str {
        "neurips"
    }

    fn config(&self) -> &SourceConfig {
        &self.config
    }

    fn requires_link(&self) -> bool {
        true
    }

    fn planned_pages(&self, request: &FetchRequest) -> Option<usize> {
        Some(request.window.years().count())
    }

    fn page_request(
        &self,
        request: &FetchRequest,
        page: usize,
        _discovery: &Discovery,
    ) -> Result<HttpRequest, FetchError> {
        let year = year_for(request, page);
        Ok(HttpRequest::get(
            self.config.endpoint(&format!("paper_files/paper/{year}")),
        ))
    }

    fn parse_page(
        &self,
        body: &str,
        request: &FetchRequest,
        ctx: &PageContext<'_>,
    ) -> Result<ParsedPage, SourceError> {
        let year = year_for(request, ctx.index);
        let document = Html::parse_document(body);
        let list = document
            .select(&selector("ul.paper-list")?)
            .next()
            .ok_or_else(|| SourceError::Html("no ul.paper-list".to_string()))?;
        let anchor = selector("a")?;
        let italic = selector("i")?;

        let mut page = ParsedPage::default();
        for item in list.select(&selector("li")?) {
            page.item_count += 1;
            let Some(link) = item.select(&anchor).next() else {
                continue;
            };
            let href = link.value().attr("href").unwrap_or_default();
            if !href.contains("/paper/") {
                continue;
            }
            let authors = item
                .select(&italic)
                .next()
                .map(|i| i.text().collect::<String>())
                .unwrap_or_default();
            if !names::any_match(&request.full_name, authors.split(',')) {
                continue;
            }
            page.entries.push(Ok(RecordDraft {
                title: Some(link.text().collect()),
                link: Some(self.config.absolute(href)),
                year: Some(year),
                venue: Some(format!("NeurIPS {year}")),
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

    fn listing(papers: &[(&str, &str, &str)]) -> String {
        let items: String = papers
            .iter()
            .map(|(href, title, authors)| {
                format!(r#"<li class="conference"><a title="paper title" href="{href}">{title}</a> <span class="paper-authors"><i>{authors}</i></span></li>"#)
            })
            .collect();
        format!(r#"<html><body><div class="container"><ul class="paper-list">{items}</ul></div></body></html>"#)
    }

    fn neurips(base: &str) -> Neurips {
        let mut config = SourceConfig::defaults_for(SourceKind::Neurips);
        config.base_url = base.to_string();
        Neurips::new(config)
    }

    #[test]
    fn test_one_page_per_year() {
        let source = neurips("https://papers.nips.cc");
        let req = request("Jennifer Dy", (2019, 6, 1), (2021, 2, 1));
        assert_eq!(source.planned_pages(&req), Some(3));
        let http = source.page_request(&req, 2, &Discovery::default()).unwrap();
        assert_eq!(http.url, "https://papers.nips.cc/paper_files/paper/2021");
    }

    #[tokio::test]
    async fn test_years_walked_and_authors_matched() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/paper_files/paper/2020"))
            .respond_with(ResponseTemplate::new(200).set_body_string(listing(&[
                ("/paper_files/paper/2020/hash/a-Abstract.html", "Paper A", "Alice Smith, Jennifer G Dy"),
                ("/paper_files/paper/2020/hash/b-Abstract.html", "Paper B", "Jennifer Doe"),
                ("/about", "Not a paper", "Jennifer Dy"),
            ])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/paper_files/paper/2021"))
            .respond_with(ResponseTemplate::new(200).set_body_string(listing(&[(
                "/paper_files/paper/2021/hash/c-Abstract.html",
                "Paper C",
                "J. Dy",
            )])))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(Box::new(neurips(&server.uri())), None).unwrap();
        let outcome = fetcher
            .fetch_for_author(&request("Jennifer Dy", (2020, 1, 1), (2021, 12, 31)))
            .await
            .unwrap();

        assert_eq!(outcome.pages_requested, 2);
        let titles: Vec<_> = outcome.records.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Paper A", "Paper C"]);
        assert_eq!(outcome.records[0].published.precision(), DatePrecision::Year);
        assert_eq!(outcome.records[1].venue, "NeurIPS 2021");
        assert!(outcome.records[0].link.ends_with("/paper_files/paper/2020/hash/a-Abstract.html"));
    }
}
