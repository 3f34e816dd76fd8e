//! The author publication fetcher.
//!
//! [`Fetcher`] walks one [`Source`]'s paginated search for an author, turns
//! every page into [`PublicationRecord`]s and keeps the ones inside the date
//! window. A batch ([`Fetcher::fetch_for_authors`]) runs authors one after
//! another and isolates their failures from each other.
//!
//! # Page walk
//!
//! ```text
//! Init ──► FetchPage ──200──► (parse) ──► FetchPage(next) | Done
//!              │
//!              └─non-200─► Backoff ──transient, retries left──► FetchPage(same)
//!                              └────────otherwise────────────► AbortAuthor
//! ```
//!
//! The number of pages is `ceil(hits / page_size)` when the hit count is
//! known, from the discovery response or from the first page. Without a hit
//! count the walk stops at the first short page. An optional `max_pages`
//! bounds the walk either way; a walk cut short by it is marked truncated.

use crate::error::{DropReason, FetchError};
use crate::http::{HttpRequest, build_client};
use crate::models::{AuthorEntry, FetchRequest, PublicationRecord, RecordContext, RecordDraft};
use crate::scrapers::{Discovery, PageContext, Source, pages_for};
use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use std::time::Instant;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, trace, warn};

/// Where an author's page walk is.
#[derive(Debug, Clone, PartialEq, Eq)]
enum WalkState {
    Init,
    FetchPage { page: usize, attempt: u32 },
    Backoff { page: usize, attempt: u32, transient: bool, status: u16 },
    Done,
    AbortAuthor { reason: String },
}

/// Records and counters from one author's walk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthorOutcome {
    pub records: Vec<PublicationRecord>,
    pub pages_requested: usize,
    /// Non-200 responses and unparseable pages.
    pub pages_failed: usize,
    pub items_dropped: usize,
    pub out_of_window: usize,
    /// Set when the walk gave up before its last page.
    pub aborted: Option<String>,
    /// Set when `max_pages` stopped the walk with pages still to fetch.
    pub truncated: bool,
}

/// Result of a batch run over a roster.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchReport {
    pub source: String,
    pub records: Vec<PublicationRecord>,
    pub succeeded: Vec<String>,
    /// Author name and the error that stopped their fetch.
    pub failed: Vec<(String, String)>,
    /// Authors whose walk ended early; their earlier records are kept.
    pub aborted: Vec<String>,
    /// Authors whose walk hit the page cap.
    pub truncated: Vec<String>,
    pub pages_requested: usize,
    pub pages_failed: usize,
    pub items_dropped: usize,
    pub out_of_window: usize,
}

impl FetchReport {
    fn absorb(&mut self, name: &str, outcome: AuthorOutcome) {
        self.succeeded.push(name.to_string());
        if outcome.aborted.is_some() {
            self.aborted.push(name.to_string());
        }
        if outcome.truncated {
            self.truncated.push(name.to_string());
        }
        self.pages_requested += outcome.pages_requested;
        self.pages_failed += outcome.pages_failed;
        self.items_dropped += outcome.items_dropped;
        self.out_of_window += outcome.out_of_window;
        self.records.extend(outcome.records);
    }

    pub fn log_summary(&self) {
        info!(
            source = %self.source,
            records = self.records.len(),
            authors_ok = self.succeeded.len(),
            authors_failed = self.failed.len(),
            authors_aborted = self.aborted.len(),
            authors_truncated = self.truncated.len(),
            pages_requested = self.pages_requested,
            pages_failed = self.pages_failed,
            items_dropped = self.items_dropped,
            out_of_window = self.out_of_window,
            "Batch summary"
        );
        for (name, reason) in &self.failed {
            warn!(source = %self.source, author = %name, %reason, "Author failed");
        }
        for name in &self.truncated {
            warn!(source = %self.source, author = %name, "Page cap left results unfetched");
        }
    }
}

/// Drives a [`Source`] over authors.
pub struct Fetcher {
    source: Box<dyn Source>,
    client: Client,
    institution: Option<String>,
}

impl Fetcher {
    /// Build a fetcher with a client using the source's timeout. Fails on a
    /// malformed `base_url`.
    pub fn new(source: Box<dyn Source>, institution: Option<String>) -> Result<Self, FetchError> {
        source.config().validate()?;
        let client = build_client(source.config().timeout())?;
        Ok(Self {
            source,
            client,
            institution: institution.filter(|i| !i.trim().is_empty()),
        })
    }

    /// Fetch one author's publications inside `request.window`.
    ///
    /// HTTP failures on individual pages are absorbed (see the module docs);
    /// only transport failures and request/config errors are returned as
    /// `Err`.
    #[instrument(level = "info", skip_all, fields(source = self.source.name(), author = %request.full_name))]
    pub async fn fetch_for_author(&self, request: &FetchRequest) -> Result<AuthorOutcome, FetchError> {
        let source = self.source.as_ref();
        let config = source.config();
        let t0 = Instant::now();

        let mut outcome = AuthorOutcome::default();
        let mut discovery = Discovery::default();
        let mut planned: Option<usize> = None;
        let mut state = WalkState::Init;

        loop {
            trace!(?state, "Walk state");
            state = match state {
                WalkState::Init => match self.discover(request).await? {
                    Ok(found) => {
                        discovery = found;
                        planned = source
                            .planned_pages(request)
                            .or_else(|| discovery.hits.map(|h| pages_for(h, config.page_size)));
                        if let Some(hits) = discovery.hits {
                            info!(hits, pages = ?planned, "Discovered hit count");
                        }
                        if planned == Some(0) {
                            WalkState::Done
                        } else {
                            WalkState::FetchPage { page: 0, attempt: 0 }
                        }
                    }
                    Err(reason) => WalkState::AbortAuthor { reason },
                },

                WalkState::FetchPage { page, attempt } => {
                    if let Some(cap) = config.max_pages.filter(|cap| page >= *cap) {
                        warn!(max_pages = cap, planned = ?planned, "Page cap reached; remaining pages skipped");
                        outcome.truncated = true;
                        WalkState::Done
                    } else {
                        let http = source.page_request(request, page, &discovery)?;
                        outcome.pages_requested += 1;
                        let response = http.send(&self.client).await?;

                        if !response.is_success() {
                            WalkState::Backoff {
                                page,
                                attempt,
                                transient: response.is_transient(),
                                status: response.status,
                            }
                        } else {
                            let ctx = PageContext {
                                index: page,
                                discovery: &discovery,
                            };
                            match source.parse_page(&response.body, request, &ctx) {
                                Ok(parsed) => {
                                    if planned.is_none()
                                        && let Some(total) = parsed.total_hits
                                    {
                                        planned = Some(pages_for(total, config.page_size));
                                        info!(hits = total, pages = ?planned, "Hit count from first page");
                                    }
                                    debug!(
                                        page,
                                        items = parsed.item_count,
                                        entries = parsed.entries.len(),
                                        "Parsed page"
                                    );
                                    self.collect(parsed.entries, request, &discovery, &mut outcome);
                                    next_page(page, parsed.item_count, config.page_size, planned)
                                }
                                Err(e) => {
                                    outcome.pages_failed += 1;
                                    warn!(page, error = %e, "Skipping unparseable page");
                                    match planned {
                                        Some(_) => next_page(page, 0, config.page_size, planned),
                                        None => WalkState::Done,
                                    }
                                }
                            }
                        }
                    }
                }

                WalkState::Backoff {
                    page,
                    attempt,
                    transient,
                    status,
                } => {
                    outcome.pages_failed += 1;
                    warn!(
                        page,
                        status,
                        attempt,
                        backoff_secs = config.backoff_seconds,
                        "Page request failed; backing off"
                    );
                    sleep(config.backoff()).await;
                    if transient && attempt < config.page_retries {
                        WalkState::FetchPage {
                            page,
                            attempt: attempt + 1,
                        }
                    } else {
                        WalkState::AbortAuthor {
                            reason: format!("HTTP {status} on page {page}"),
                        }
                    }
                }

                WalkState::Done => break,

                WalkState::AbortAuthor { reason } => {
                    warn!(%reason, kept = outcome.records.len(), "Abandoning remaining pages");
                    outcome.aborted = Some(reason);
                    break;
                }
            };
        }

        info!(
            records = outcome.records.len(),
            pages = outcome.pages_requested,
            dropped = outcome.items_dropped,
            out_of_window = outcome.out_of_window,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Author fetch finished"
        );
        Ok(outcome)
    }

    /// Run the discovery request, if the source has one.
    ///
    /// The inner `Err` carries the reason to abort the author.
    async fn discover(&self, request: &FetchRequest) -> Result<Result<Discovery, String>, FetchError> {
        let source = self.source.as_ref();
        let Some(http) = source.discovery_request(request)? else {
            return Ok(Ok(Discovery::default()));
        };

        match discovery_attempts(&self.client, source, &http).await? {
            Ok(found) => Ok(Ok(found)),
            Err(reason) if source.discovery_required() => Ok(Err(reason)),
            Err(reason) => {
                debug!(%reason, "Optional discovery failed; paging without it");
                Ok(Ok(Discovery::default()))
            }
        }
    }

    fn collect(
        &self,
        entries: Vec<Result<RecordDraft, DropReason>>,
        request: &FetchRequest,
        discovery: &Discovery,
        outcome: &mut AuthorOutcome,
    ) {
        let ctx = RecordContext {
            request,
            data_source: self.source.name(),
            require_link: self.source.requires_link(),
            institution: self.institution.as_deref(),
        };
        for entry in entries {
            let finished = entry.and_then(|mut draft| {
                if draft.affiliation.is_none() {
                    draft.affiliation = discovery.affiliation.clone();
                }
                draft.finish(&ctx)
            });
            match finished {
                Ok(record) if request.window.contains(&record.published) => {
                    outcome.records.push(record)
                }
                Ok(record) => {
                    outcome.out_of_window += 1;
                    trace!(title = %record.title, date = %record.published.date(), "Outside window");
                }
                Err(reason) => {
                    outcome.items_dropped += 1;
                    debug!(%reason, "Dropped item");
                }
            }
        }
    }

    /// Fetch every author in `authors`, in order.
    ///
    /// A failing author is logged and followed by the cooldown sleep; the
    /// batch carries on. Successful authors are followed by the author delay.
    #[instrument(level = "info", skip_all, fields(source = self.source.name(), authors = authors.len()))]
    pub async fn fetch_for_authors(
        &self,
        authors: &[AuthorEntry],
        start: NaiveDate,
        end: NaiveDate,
    ) -> FetchReport {
        let config = self.source.config();
        let t0 = Instant::now();

        let results: Vec<(&AuthorEntry, Result<AuthorOutcome, FetchError>)> = stream::iter(authors)
            .then(|entry| async move {
                let result = match FetchRequest::for_entry(entry, start, end) {
                    Ok(request) => self.fetch_for_author(&request).await,
                    Err(e) => Err(e),
                };
                match &result {
                    Ok(_) => sleep(config.author_delay()).await,
                    Err(e) => {
                        error!(author = %entry.full_name, error = %e, cooldown_secs = config.cooldown_seconds, "Author fetch failed");
                        sleep(config.cooldown()).await;
                    }
                }
                (entry, result)
            })
            .collect()
            .await;

        let mut report = FetchReport {
            source: self.source.name().to_string(),
            ..FetchReport::default()
        };
        for (entry, result) in results {
            match result {
                Ok(outcome) => report.absorb(&entry.full_name, outcome),
                Err(e) => report.failed.push((entry.full_name.clone(), e.to_string())),
            }
        }
        info!(elapsed_ms = t0.elapsed().as_millis() as u64, "Batch finished");
        report.log_summary();
        report
    }
}

async fn discovery_attempts(
    client: &Client,
    source: &dyn Source,
    http: &HttpRequest,
) -> Result<Result<Discovery, String>, FetchError> {
    let config = source.config();
    let mut attempt = 0u32;
    loop {
        let response = http.send(client).await?;
        if response.is_success() {
            return Ok(source.parse_discovery(&response.body).map_err(|e| {
                warn!(error = %e, "Unparseable discovery response");
                format!("unparseable discovery response: {e}")
            }));
        }
        warn!(
            status = response.status,
            attempt,
            backoff_secs = config.backoff_seconds,
            "Discovery request failed; backing off"
        );
        sleep(config.backoff()).await;
        if response.is_transient() && attempt < config.page_retries {
            attempt += 1;
            continue;
        }
        return Ok(Err(format!("discovery returned HTTP {}", response.status)));
    }
}

fn next_page(page: usize, item_count: usize, page_size: usize, planned: Option<usize>) -> WalkState {
    let next = page + 1;
    let more = match planned {
        Some(pages) => next < pages,
        None => item_count > 0 && item_count >= page_size,
    };
    if more {
        WalkState::FetchPage { page: next, attempt: 0 }
    } else {
        WalkState::Done
    }
}
