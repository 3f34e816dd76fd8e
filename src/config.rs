//! Per-source configuration.
//!
//! Every source runs with a [`SourceConfig`]: its endpoint, credentials, page
//! size and the fixed sleeps used between pages and authors. Built-in
//! defaults come from [`SourceConfig::defaults_for`]; an optional YAML file
//! ([`Settings`]) overrides any field per source and names the institution
//! used for affiliation matching.
//!
//! ```yaml
//! institution: Northeastern University
//! sources:
//!   acm:
//!     author_delay_seconds: 90
//!   semantic_scholar:
//!     api_key: "..."
//!     page_size: 50
//! ```

use crate::error::FetchError;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::time::Duration;
use tracing::{info, instrument};
use url::Url;

/// The external systems a fetch can target.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Acm,
    Arxiv,
    Dblp,
    Pubmed,
    SemanticScholar,
    Nytimes,
    Nih,
    Neurips,
    Icml,
    Epo,
}

impl SourceKind {
    pub const ALL: [SourceKind; 10] = [
        SourceKind::Acm,
        SourceKind::Arxiv,
        SourceKind::Dblp,
        SourceKind::Pubmed,
        SourceKind::SemanticScholar,
        SourceKind::Nytimes,
        SourceKind::Nih,
        SourceKind::Neurips,
        SourceKind::Icml,
        SourceKind::Epo,
    ];

    /// File-name friendly tag, used for the per-source JSON blob.
    pub fn tag(&self) -> &'static str {
        match self {
            SourceKind::Acm => "acm",
            SourceKind::Arxiv => "arxiv",
            SourceKind::Dblp => "dblp",
            SourceKind::Pubmed => "pubmed",
            SourceKind::SemanticScholar => "semantic_scholar",
            SourceKind::Nytimes => "nytimes",
            SourceKind::Nih => "nih",
            SourceKind::Neurips => "neurips",
            SourceKind::Icml => "icml",
            SourceKind::Epo => "epo",
        }
    }
}

/// Everything a source needs to talk to its endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    /// Items per page request.
    pub page_size: usize,
    pub timeout_seconds: u64,
    /// Sleep after a non-200 page before retrying or giving up.
    pub backoff_seconds: u64,
    /// Sleep after each author that completed.
    pub author_delay_seconds: u64,
    /// Sleep after an author whose fetch failed.
    pub cooldown_seconds: u64,
    /// Extra attempts for a page answered with 429 or 5xx.
    pub page_retries: u32,
    /// Upper bound on page requests per author; `None` fetches every page.
    pub max_pages: Option<usize>,
}

impl SourceConfig {
    /// Built-in settings for `kind`.
    pub fn defaults_for(kind: SourceKind) -> Self {
        let base = |url: &str, page_size: usize, author_delay_seconds: u64| SourceConfig {
            base_url: url.to_string(),
            api_key: None,
            api_secret: None,
            page_size,
            timeout_seconds: 30,
            backoff_seconds: 60,
            author_delay_seconds,
            cooldown_seconds: 120,
            page_retries: 1,
            max_pages: None,
        };
        match kind {
            SourceKind::Acm => base("https://dl.acm.org", 20, 60),
            SourceKind::Arxiv => base("http://export.arxiv.org", 100, 3),
            SourceKind::Dblp => base("https://dblp.org", 1000, 5),
            SourceKind::Pubmed => base("https://eutils.ncbi.nlm.nih.gov/entrez/eutils", 200, 1),
            SourceKind::SemanticScholar => SourceConfig {
                cooldown_seconds: 10,
                ..base("https://api.semanticscholar.org/graph/v1", 100, 5)
            },
            // Article Search serves at most 100 pages per query
            SourceKind::Nytimes => SourceConfig {
                max_pages: Some(100),
                ..base("https://api.nytimes.com/svc/search/v2", 10, 10)
            },
            SourceKind::Nih => base("https://api.reporter.nih.gov", 500, 1),
            SourceKind::Neurips => base("https://papers.nips.cc", 0, 1),
            SourceKind::Icml => base("https://proceedings.mlr.press", 0, 1),
            SourceKind::Epo => base("https://ops.epo.org/3.2", 100, 5),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_secs(self.backoff_seconds)
    }

    pub fn author_delay(&self) -> Duration {
        Duration::from_secs(self.author_delay_seconds)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_seconds)
    }

    /// `base_url` joined with `path`, without doubled slashes.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Resolve an `href` found in a page against `base_url`. Absolute
    /// hrefs come back unchanged.
    pub fn absolute(&self, href: &str) -> String {
        Url::parse(&self.base_url)
            .and_then(|base| base.join(href))
            .map(String::from)
            .unwrap_or_else(|_| self.endpoint(href))
    }

    /// `base_url` must be an http(s) URL.
    pub fn validate(&self) -> Result<(), FetchError> {
        let url = Url::parse(&self.base_url)
            .map_err(|e| FetchError::config(format!("bad base_url {:?}: {e}", self.base_url)))?;
        match url.scheme() {
            "http" | "https" => Ok(()),
            other => Err(FetchError::config(format!("unsupported scheme {other:?} in base_url"))),
        }
    }

    fn apply(&mut self, o: &SourceOverrides) {
        if let Some(v) = &o.base_url {
            self.base_url = v.clone();
        }
        if o.api_key.is_some() {
            self.api_key = o.api_key.clone();
        }
        if o.api_secret.is_some() {
            self.api_secret = o.api_secret.clone();
        }
        if let Some(v) = o.page_size {
            self.page_size = v;
        }
        if let Some(v) = o.timeout_seconds {
            self.timeout_seconds = v;
        }
        if let Some(v) = o.backoff_seconds {
            self.backoff_seconds = v;
        }
        if let Some(v) = o.author_delay_seconds {
            self.author_delay_seconds = v;
        }
        if let Some(v) = o.cooldown_seconds {
            self.cooldown_seconds = v;
        }
        if let Some(v) = o.page_retries {
            self.page_retries = v;
        }
        if o.max_pages.is_some() {
            self.max_pages = o.max_pages;
        }
    }
}

/// Optional per-source fields from the YAML file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceOverrides {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub page_size: Option<usize>,
    pub timeout_seconds: Option<u64>,
    pub backoff_seconds: Option<u64>,
    pub author_delay_seconds: Option<u64>,
    pub cooldown_seconds: Option<u64>,
    pub page_retries: Option<u32>,
    pub max_pages: Option<usize>,
}

/// The YAML settings file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Settings {
    /// Institution searched for in affiliations.
    pub institution: Option<String>,
    #[serde(default)]
    pub sources: BTreeMap<SourceKind, SourceOverrides>,
}

impl Settings {
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }

    /// Load settings from `path`.
    #[instrument(level = "info", skip_all, fields(path = %path))]
    pub async fn load(path: &str) -> Result<Self, Box<dyn Error>> {
        let text = tokio::fs::read_to_string(path).await?;
        let settings = Self::from_yaml(&text)?;
        info!(
            overridden_sources = settings.sources.len(),
            institution = settings.institution.as_deref().unwrap_or(""),
            "Loaded settings"
        );
        Ok(settings)
    }

    /// Defaults for `kind` with this file's overrides applied.
    pub fn source_config(&self, kind: SourceKind) -> SourceConfig {
        let mut config = SourceConfig::defaults_for(kind);
        if let Some(overrides) = self.sources.get(&kind) {
            config.apply(overrides);
        }
        config
    }
}
