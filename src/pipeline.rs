//! Sequential fetch-and-persist run over a range of submission dates

use crate::config::Config;
use crate::edinet::errors::{EdinetError, Result};
use crate::edinet::{extract_securities_reports, EdinetClient, ListingType, SecuritiesReport};
use crate::ledger::Ledger;
use crate::persist::{PersistOutcome, Persister, Prepared};
use chrono::NaiveDate;
use std::fmt;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Counters of one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Dates whose listing was requested
    pub dates: usize,
    /// Dates skipped because the listing could not be fetched
    pub listing_failures: usize,
    /// Securities reports found in the listings
    pub reports: usize,
    /// Archives written and recorded in this run
    pub recorded: usize,
    /// Reports the ledger already knew about
    pub already_downloaded: usize,
    /// Archives found on disk whose ledger rows were backfilled
    pub file_exists: usize,
    /// Reports skipped because of a fetch or filesystem failure
    pub failed: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} dates ({} listing failures), {} reports: {} recorded, {} already downloaded, {} backfilled from disk, {} failed",
            self.dates,
            self.listing_failures,
            self.reports,
            self.recorded,
            self.already_downloaded,
            self.file_exists,
            self.failed
        )
    }
}

/// Listing fetcher, report extractor, document fetcher and persister wired
/// together. One date at a time, one document at a time.
pub struct Pipeline {
    config: Config,
    client: EdinetClient,
    persister: Persister,
}

impl Pipeline {
    /// Open the ledger and build the HTTP client from `config`
    pub async fn new(config: Config) -> Result<Self> {
        let ledger = Ledger::open(&config.database_path).await?;
        let client = EdinetClient::new(&config)?;
        let persister = Persister::new(
            ledger,
            config.download_dir.clone(),
            config.api.document_format,
        );

        Ok(Self::from_parts(config, client, persister))
    }

    pub fn from_parts(config: Config, client: EdinetClient, persister: Persister) -> Self {
        Self {
            config,
            client,
            persister,
        }
    }

    pub fn ledger(&self) -> &Ledger {
        self.persister.ledger()
    }

    /// Process every date in order. Fetch and per-document failures are
    /// logged and skipped; ledger failures abort the run.
    pub async fn run(&self, dates: &[NaiveDate], listing_type: ListingType) -> Result<RunSummary> {
        let start_time = Instant::now();
        let mut summary = RunSummary::default();

        info!("Processing {} submission dates", dates.len());

        for date in dates {
            summary.dates += 1;
            self.process_date(*date, listing_type, &mut summary).await?;
        }

        let elapsed = start_time.elapsed();
        info!(
            "Run complete in {} minutes {} seconds: {}",
            elapsed.as_secs() / 60,
            elapsed.as_secs() % 60,
            summary
        );

        Ok(summary)
    }

    async fn process_date(
        &self,
        date: NaiveDate,
        listing_type: ListingType,
        summary: &mut RunSummary,
    ) -> Result<()> {
        let listing = match self.client.fetch_listing(date, listing_type).await {
            Ok(listing) => listing,
            Err(e) => {
                warn!(%date, "Failed to get listing, skipping date: {}", e);
                summary.listing_failures += 1;
                self.pace().await;
                return Ok(());
            }
        };
        self.pace().await;

        let reports = extract_securities_reports(&listing, &self.config.filter);
        let count = reports.clone().count();
        if count == 0 {
            debug!(%date, "No securities reports");
            return Ok(());
        }

        info!(%date, "Found {} securities reports", count);
        summary.reports += count;

        for report in reports {
            self.process_report(date, &report, summary).await?;
        }

        Ok(())
    }

    async fn process_report(
        &self,
        date: NaiveDate,
        report: &SecuritiesReport<'_>,
        summary: &mut RunSummary,
    ) -> Result<()> {
        info!(
            %date,
            doc_id = report.doc_id,
            sec_code = report.sec_code,
            "Processing {}",
            report.filer_name
        );

        let pending = match self.persister.prepare(date, report).await {
            Ok(Prepared::Done(outcome)) => {
                tally(summary, &outcome);
                return Ok(());
            }
            Ok(Prepared::Pending(pending)) => pending,
            Err(e) => return contain(e, report.doc_id, summary),
        };

        let payload = match self.client.fetch_document(report.doc_id).await {
            Ok(payload) => payload,
            Err(e) => {
                self.pace().await;
                return contain(e, report.doc_id, summary);
            }
        };

        if let Some(length) = payload.content_length() {
            debug!(doc_id = report.doc_id, length, "Streaming archive");
        }

        let result = self.persister.write(pending, payload.into_stream()).await;
        self.pace().await;

        match result {
            Ok(outcome) => {
                tally(summary, &outcome);
                Ok(())
            }
            Err(e) => contain(e, report.doc_id, summary),
        }
    }

    async fn pace(&self) {
        let delay = self.config.edinet_request_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

fn tally(summary: &mut RunSummary, outcome: &PersistOutcome) {
    match outcome {
        PersistOutcome::AlreadyDownloaded => summary.already_downloaded += 1,
        PersistOutcome::FileExists { .. } => summary.file_exists += 1,
        PersistOutcome::Recorded { .. } => summary.recorded += 1,
    }
}

/// Keep per-document failures local; hand fatal ones back to the caller
fn contain(err: EdinetError, doc_id: &str, summary: &mut RunSummary) -> Result<()> {
    if err.is_fatal() {
        return Err(err);
    }

    if err.is_fetch_failure() {
        warn!(doc_id, "Failed to fetch document, skipping: {}", err);
    } else {
        warn!(doc_id, "Failed to store document, skipping: {}", err);
    }
    summary.failed += 1;
    Ok(())
}
