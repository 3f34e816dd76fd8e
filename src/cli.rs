//! Command-line interface definitions.
//!
//! API keys can be given as flags or through environment variables.

use crate::config::{SourceConfig, SourceKind};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

/// Collect faculty publications from academic and news sources.
///
/// # Examples
///
/// ```sh
/// # All sources, one JSON blob per source
/// faculty_pubs fetch --roster faculty.csv --start 2020-01-01 --end 2023-12-31 -o ./blobs
///
/// # Just DBLP and arXiv, with an institution to flag affiliations
/// faculty_pubs fetch -r faculty.csv --start 2023-01-01 --end 2023-12-31 -o ./blobs \
///     -s dblp -s arxiv --institution "Northeastern University"
///
/// # Aggregate the blobs into one tab-delimited report
/// faculty_pubs report -i ./blobs -o all_papers.tsv
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Query sources for every author in a roster and write one blob per source
    Fetch(FetchArgs),
    /// Aggregate the blobs in a directory into a tab-delimited report
    Report(ReportArgs),
}

#[derive(clap::Args, Debug)]
pub struct FetchArgs {
    /// Roster file with Name and Url columns (comma or tab separated)
    #[arg(short, long)]
    pub roster: String,

    /// First day of the window, YYYY-MM-DD
    #[arg(long)]
    pub start: NaiveDate,

    /// Last day of the window, YYYY-MM-DD (inclusive)
    #[arg(long)]
    pub end: NaiveDate,

    /// Directory for the per-source JSON blobs
    #[arg(short, long)]
    pub output_dir: String,

    /// Sources to query; repeat for several. Defaults to all of them.
    #[arg(short, long = "source", value_enum)]
    pub sources: Vec<SourceKind>,

    /// Optional path to a YAML settings file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Institution matched against record affiliations
    #[arg(long)]
    pub institution: Option<String>,

    /// New York Times API key
    #[arg(long, env = "NYT_API_KEY", hide_env_values = true)]
    pub nyt_api_key: Option<String>,

    /// Semantic Scholar API key
    #[arg(long, env = "S2_API_KEY", hide_env_values = true)]
    pub s2_api_key: Option<String>,

    /// NCBI E-utilities API key
    #[arg(long, env = "NCBI_API_KEY", hide_env_values = true)]
    pub ncbi_api_key: Option<String>,

    /// EPO OPS consumer key
    #[arg(long, env = "EPO_CONSUMER_KEY", hide_env_values = true)]
    pub epo_consumer_key: Option<String>,

    /// EPO OPS consumer secret
    #[arg(long, env = "EPO_CONSUMER_SECRET", hide_env_values = true)]
    pub epo_consumer_secret: Option<String>,
}

impl FetchArgs {
    /// Selected sources, or every source when none were named.
    pub fn selected_sources(&self) -> Vec<SourceKind> {
        if self.sources.is_empty() {
            SourceKind::ALL.to_vec()
        } else {
            self.sources.iter().copied().fold(Vec::new(), |mut acc, kind| {
                if !acc.contains(&kind) {
                    acc.push(kind);
                }
                acc
            })
        }
    }

    /// Put any keys given on the command line into `config`.
    pub fn apply_keys(&self, kind: SourceKind, config: &mut SourceConfig) {
        let (key, secret) = match kind {
            SourceKind::Nytimes => (self.nyt_api_key.as_ref(), None),
            SourceKind::SemanticScholar => (self.s2_api_key.as_ref(), None),
            SourceKind::Pubmed => (self.ncbi_api_key.as_ref(), None),
            SourceKind::Epo => (self.epo_consumer_key.as_ref(), self.epo_consumer_secret.as_ref()),
            _ => return,
        };
        if let Some(key) = key {
            config.api_key = Some(key.clone());
        }
        if let Some(secret) = secret {
            config.api_secret = Some(secret.clone());
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct ReportArgs {
    /// Directory holding the per-source JSON blobs
    #[arg(short, long)]
    pub input_dir: String,

    /// Report file to write
    #[arg(short, long)]
    pub output: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetch_args(extra: &[&str]) -> FetchArgs {
        let mut argv = vec![
            "faculty_pubs",
            "fetch",
            "--roster",
            "faculty.csv",
            "--start",
            "2020-01-01",
            "--end",
            "2023-12-31",
            "--output-dir",
            "./blobs",
        ];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Command::Fetch(args) => args,
            other => panic!("expected fetch, got {other:?}"),
        }
    }

    #[test]
    fn test_fetch_parsing() {
        let args = fetch_args(&[]);
        assert_eq!(args.roster, "faculty.csv");
        assert_eq!(args.start, NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
        assert_eq!(args.output_dir, "./blobs");
        assert_eq!(args.selected_sources(), SourceKind::ALL.to_vec());
    }

    #[test]
    fn test_fetch_sources_short_flags() {
        let args = fetch_args(&["-s", "dblp", "-s", "semantic-scholar", "-s", "dblp"]);
        assert_eq!(
            args.selected_sources(),
            vec![SourceKind::Dblp, SourceKind::SemanticScholar]
        );
    }

    #[test]
    fn test_bad_date_rejected() {
        let result = Cli::try_parse_from([
            "faculty_pubs",
            "fetch",
            "-r",
            "f.csv",
            "--start",
            "2020-13-01",
            "--end",
            "2021-01-01",
            "-o",
            "x",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_apply_keys() {
        let args = fetch_args(&["--epo-consumer-key", "k", "--epo-consumer-secret", "s"]);
        let mut epo = SourceConfig::defaults_for(SourceKind::Epo);
        args.apply_keys(SourceKind::Epo, &mut epo);
        assert_eq!(epo.api_key.as_deref(), Some("k"));
        assert_eq!(epo.api_secret.as_deref(), Some("s"));

        let mut dblp = SourceConfig::defaults_for(SourceKind::Dblp);
        args.apply_keys(SourceKind::Dblp, &mut dblp);
        assert_eq!(dblp.api_key, None);
    }

    #[test]
    fn test_report_parsing() {
        let cli = Cli::parse_from(["faculty_pubs", "report", "-i", "./blobs", "-o", "all.tsv"]);
        let Command::Report(args) = cli.command else {
            panic!("expected report");
        };
        assert_eq!(args.input_dir, "./blobs");
        assert_eq!(args.output, "all.tsv");
    }
}
