//! Output generation.
//!
//! - [`json`]: one JSON array of records per source
//! - [`report`]: all source blobs in a directory, aggregated into one
//!   tab-delimited report
//!
//! ```text
//! output_dir/
//! ├── acm.json
//! ├── dblp.json
//! └── semantic_scholar.json
//!
//! all_papers.tsv      # FullName, EaiUrl, Url, ... Citations
//! ```

pub mod json;
pub mod report;
