//! Survey scraping pipeline: page fetch → row materialization →
//! classification → entry reassembly.

pub mod assemble;
pub mod classify;
pub mod dom;
pub mod extract;

use std::thread;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use self::assemble::Assembler;
use self::classify::{classify, RowKind};

#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("fetching listing page {page} failed")]
    Http {
        page: usize,
        #[source]
        source: reqwest::Error,
    },
    #[error("listing page has no results table")]
    NoResultsTable,
}

/// One scraped survey entry. Fields hold the text as displayed; empty means
/// the cell was absent or unparsable. Numeric parsing happens downstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawApplicant {
    pub university: String,
    pub program_name: String,
    pub degree_title: String,
    pub date_added: String,
    pub applicant_status: String,
    pub decision_date: String,
    pub applicant_url: String,
    pub semester: String,
    pub student_location: String,
    pub gre_quant: String,
    pub gre_verbal: String,
    pub gre_aw: String,
    pub gpa: String,
    pub notes: String,
}

impl RawApplicant {
    /// School and program are the only fields reliably present; an entry
    /// missing both is markup noise and is never emitted.
    pub fn is_complete(&self) -> bool {
        !self.university.is_empty() || !self.program_name.is_empty()
    }
}

/// Fetches one listing page by 1-based page number.
pub trait PageFetcher {
    fn fetch_page(&self, page: usize) -> Result<String, ScrapeError>;
}

#[derive(Debug, Clone)]
pub struct ScrapeOptions {
    /// Stop after this many entries have been collected.
    pub max_records: usize,
    /// Blocking pause between page fetches.
    pub delay: Duration,
}

/// Walk the listing from page 1 and collect entries until the cap is hit,
/// `seen` recognizes an entry's URL (incremental re-scrape), or a page
/// yields no data rows (end of listing). Entries come back newest-first, as
/// rendered by the site. Fetch and parse failures are fatal; there is no
/// retry here.
pub fn collect_new<P, F>(
    fetcher: &P,
    options: &ScrapeOptions,
    mut seen: F,
) -> Result<Vec<RawApplicant>, ScrapeError>
where
    P: PageFetcher,
    F: FnMut(&str) -> bool,
{
    let mut records = Vec::new();
    if options.max_records == 0 {
        return Ok(records);
    }

    let pb = ProgressBar::new(options.max_records as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} entries")
            .unwrap()
            .progress_chars("=> "),
    );

    let mut assembler = Assembler::new();
    let mut page = 1;

    loop {
        let html = fetcher.fetch_page(page)?;
        let rows = dom::parse_listing(&html)?;

        let data_rows = rows
            .iter()
            .filter(|r| matches!(classify(r), RowKind::Entry | RowKind::Continuation))
            .count();
        if data_rows == 0 {
            info!(page, "listing exhausted");
            break;
        }

        for (i, row) in rows.iter().enumerate() {
            let next_kind = rows.get(i + 1).map(classify);
            let fed = assembler.feed(row, next_kind);

            if let Some(record) = fed.emitted {
                records.push(record);
                pb.inc(1);
                if records.len() >= options.max_records {
                    pb.finish_and_clear();
                    info!(count = records.len(), "record cap reached");
                    return Ok(records);
                }
            }

            if let Some(url) = fed.started_url {
                if !url.is_empty() && seen(&url) {
                    pb.finish_and_clear();
                    info!(url = %url, count = records.len(), "hit known entry, stopping");
                    return Ok(records);
                }
            }
        }

        debug!(page, total = records.len(), "page assembled");
        thread::sleep(options.delay);
        page += 1;
    }

    // an entry whose trailing rows never came is still worth keeping
    if let Some(record) = assembler.finish() {
        records.push(record);
        pb.inc(1);
    }
    pb.finish_and_clear();
    Ok(records)
}
