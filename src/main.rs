//! # faculty_pubs
//!
//! Fetch faculty publications per source into JSON blobs, then aggregate
//! them into one tab-delimited report.
//!
//! ## Usage
//!
//! ```sh
//! faculty_pubs fetch -r faculty.csv --start 2020-01-01 --end 2023-12-31 -o ./blobs
//! faculty_pubs report -i ./blobs -o all_papers.tsv
//! ```

use clap::Parser;
use faculty_pubs::cli::{Cli, Command, FetchArgs, ReportArgs};
use faculty_pubs::config::Settings;
use faculty_pubs::dates::DateWindow;
use faculty_pubs::fetcher::Fetcher;
use faculty_pubs::outputs::{json, report};
use faculty_pubs::roster::load_roster;
use faculty_pubs::scrapers;
use faculty_pubs::utils::ensure_writable_dir;
use std::error::Error;
use std::path::Path;
use tracing::{error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("faculty_pubs starting up");

    let args = Cli::parse();

    match &args.command {
        Command::Fetch(fetch) => run_fetch(fetch).await?,
        Command::Report(rep) => run_report(rep).await?,
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    Ok(())
}

#[instrument(level = "info", skip_all, fields(roster = %args.roster, start = %args.start, end = %args.end))]
async fn run_fetch(args: &FetchArgs) -> Result<(), Box<dyn Error>> {
    DateWindow::new(args.start, args.end)?;

    // Early check: ensure the blob dir is writable
    if let Err(e) = ensure_writable_dir(&args.output_dir).await {
        error!(
            path = %args.output_dir,
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let settings = match &args.config {
        Some(path) => Settings::load(path).await?,
        None => Settings::default(),
    };
    let institution = args.institution.clone().or_else(|| settings.institution.clone());
    let authors = load_roster(Path::new(&args.roster)).await?;

    let sources = args.selected_sources();
    info!(sources = sources.len(), authors = authors.len(), "Starting fetch");

    let mut total_records = 0;
    for kind in sources {
        let mut config = settings.source_config(kind);
        args.apply_keys(kind, &mut config);

        let fetcher = match Fetcher::new(scrapers::build(kind, config), institution.clone()) {
            Ok(fetcher) => fetcher,
            Err(e) => {
                error!(source = kind.tag(), error = %e, "Could not set up source; skipping");
                continue;
            }
        };
        let batch = fetcher.fetch_for_authors(&authors, args.start, args.end).await;

        // Keep the previous blob when the source never got through for anyone
        if batch.succeeded.is_empty() && !batch.failed.is_empty() {
            warn!(source = kind.tag(), "Every author failed; not writing a blob");
            continue;
        }
        match json::write_records(&args.output_dir, kind.tag(), &batch.records).await {
            Ok(path) => {
                total_records += batch.records.len();
                info!(source = kind.tag(), path = %path.display(), records = batch.records.len(), "Source done");
            }
            Err(e) => error!(source = kind.tag(), error = %e, "Failed to write source blob"),
        }
    }

    info!(records = total_records, "Fetch complete");
    Ok(())
}

#[instrument(level = "info", skip_all, fields(input_dir = %args.input_dir, output = %args.output))]
async fn run_report(args: &ReportArgs) -> Result<(), Box<dyn Error>> {
    let rows = report::write_report(Path::new(&args.input_dir), Path::new(&args.output)).await?;
    info!(rows, path = %args.output, "Report written");
    Ok(())
}
