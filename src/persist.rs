//! Idempotent placement of one report archive on disk plus its ledger row
//!
//! Per document the orchestrator moves through
//! `PENDING -> COMPANY_REGISTERED -> {ALREADY_DOWNLOADED | FILE_EXISTS | WRITTEN -> RECORDED}`.
//! [`Persister::prepare`] covers everything up to the decision whether a
//! write is needed, so the caller can skip the document request entirely for
//! filings that are already on disk. [`Persister::write`] finishes the
//! pending state.
//!
//! The payload is streamed into `<doc_id>.<ext>.part` and renamed onto the
//! target path once complete. A file at the target path is therefore always
//! a finished download, which is what allows a missing ledger row to be
//! backfilled from it.
//!
//! Ledger rows that exist with the downloaded flag unset are completed in
//! place rather than inserted again.

use crate::edinet::errors::{EdinetError, Result};
use crate::edinet::{is_valid_doc_id, DocumentFormat, SecuritiesReport};
use crate::ledger::Ledger;
use chrono::NaiveDate;
use futures::{pin_mut, Stream, StreamExt};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, warn};

/// Size of the blocks handed to the filesystem
pub const WRITE_CHUNK_SIZE: usize = 8 * 1024;

/// Terminal state of one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistOutcome {
    /// The ledger already marks the document as downloaded
    AlreadyDownloaded,
    /// The archive was already on disk without a ledger row; the row has
    /// been backfilled
    FileExists { path: PathBuf },
    /// Archive written and ledger row recorded
    Recorded { path: PathBuf, bytes: u64 },
}

/// Result of [`Persister::prepare`]
#[derive(Debug)]
pub enum Prepared {
    Done(PersistOutcome),
    Pending(PendingWrite),
}

/// A document whose company is registered and whose archive must be written
#[derive(Debug, Clone)]
pub struct PendingWrite {
    pub doc_id: String,
    pub submission_date: NaiveDate,
    pub company_id: i64,
    pub path: PathBuf,
    partial_path: PathBuf,
}

/// Writes archives under `<root>/<YYYY>/<MM>/<DD>/` and keeps the ledger in step
#[derive(Debug, Clone)]
pub struct Persister {
    ledger: Ledger,
    root: PathBuf,
    format: DocumentFormat,
}

impl Persister {
    pub fn new(ledger: Ledger, root: impl Into<PathBuf>, format: DocumentFormat) -> Self {
        Self {
            ledger,
            root: root.into(),
            format,
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// `<root>/<YYYY>/<MM>/<DD>`
    pub fn target_dir(&self, submission_date: NaiveDate) -> PathBuf {
        self.root
            .join(submission_date.format("%Y").to_string())
            .join(submission_date.format("%m").to_string())
            .join(submission_date.format("%d").to_string())
    }

    /// `<root>/<YYYY>/<MM>/<DD>/<doc_id>.<ext>`
    pub fn target_path(&self, submission_date: NaiveDate, doc_id: &str) -> PathBuf {
        self.target_dir(submission_date)
            .join(format!("{}.{}", doc_id, self.format.file_extension()))
    }

    /// Register the company, consult the ledger and the filesystem, and
    /// decide whether the archive still has to be written.
    pub async fn prepare(
        &self,
        submission_date: NaiveDate,
        report: &SecuritiesReport<'_>,
    ) -> Result<Prepared> {
        if !is_valid_doc_id(report.doc_id) {
            return Err(EdinetError::InvalidDocId(report.doc_id.to_string()));
        }

        let company_id = self
            .ledger
            .register_company(report.filer_name, report.sec_code)
            .await?;

        if self.ledger.is_downloaded(report.doc_id).await? {
            info!(doc_id = report.doc_id, "Already downloaded, skipping");
            return Ok(Prepared::Done(PersistOutcome::AlreadyDownloaded));
        }

        let dir = self.target_dir(submission_date);
        tokio::fs::create_dir_all(&dir).await?;

        let path = self.target_path(submission_date, report.doc_id);
        if tokio::fs::try_exists(&path).await? {
            // only a completed download is ever renamed onto the target path
            self.settle(report.doc_id, submission_date, company_id)
                .await?;
            warn!(
                doc_id = report.doc_id,
                path = %path.display(),
                "Archive already on disk without ledger row, backfilled ledger"
            );
            return Ok(Prepared::Done(PersistOutcome::FileExists { path }));
        }

        let partial_path = dir.join(format!(
            "{}.{}.part",
            report.doc_id,
            self.format.file_extension()
        ));

        Ok(Prepared::Pending(PendingWrite {
            doc_id: report.doc_id.to_string(),
            submission_date,
            company_id,
            path,
            partial_path,
        }))
    }

    /// Stream the payload to disk, then record the document in the ledger
    pub async fn write<S, B, E>(&self, pending: PendingWrite, payload: S) -> Result<PersistOutcome>
    where
        S: Stream<Item = std::result::Result<B, E>>,
        B: AsRef<[u8]>,
        E: Into<EdinetError>,
    {
        let bytes = match stream_to_file(&pending.partial_path, payload).await {
            Ok(bytes) => bytes,
            Err(e) => {
                if let Err(cleanup) = tokio::fs::remove_file(&pending.partial_path).await {
                    debug!(path = %pending.partial_path.display(), "No partial file to remove: {}", cleanup);
                }
                return Err(e);
            }
        };

        tokio::fs::rename(&pending.partial_path, &pending.path).await?;
        debug!(doc_id = %pending.doc_id, bytes, "Archive written");

        self.settle(&pending.doc_id, pending.submission_date, pending.company_id)
            .await?;

        info!(
            doc_id = %pending.doc_id,
            path = %pending.path.display(),
            bytes,
            "Recorded downloaded archive"
        );

        Ok(PersistOutcome::Recorded {
            path: pending.path,
            bytes,
        })
    }

    /// Mark the document downloaded: flip an unset row, else append one
    async fn settle(&self, doc_id: &str, submission_date: NaiveDate, company_id: i64) -> Result<()> {
        if self.ledger.mark_downloaded(doc_id).await? {
            debug!(doc_id, "Completed existing ledger row");
            return Ok(());
        }
        self.ledger
            .record_downloaded(doc_id, submission_date, company_id)
            .await
    }

    /// Full orchestration for a payload that has already been requested
    pub async fn save_report_with_record<S, B, E>(
        &self,
        submission_date: NaiveDate,
        report: &SecuritiesReport<'_>,
        payload: S,
    ) -> Result<PersistOutcome>
    where
        S: Stream<Item = std::result::Result<B, E>>,
        B: AsRef<[u8]>,
        E: Into<EdinetError>,
    {
        match self.prepare(submission_date, report).await? {
            Prepared::Done(outcome) => Ok(outcome),
            Prepared::Pending(pending) => self.write(pending, payload).await,
        }
    }
}

async fn stream_to_file<S, B, E>(path: &Path, payload: S) -> Result<u64>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<EdinetError>,
{
    let file = tokio::fs::File::create(path).await?;
    let mut writer = BufWriter::with_capacity(WRITE_CHUNK_SIZE, file);
    let mut written: u64 = 0;

    pin_mut!(payload);
    while let Some(chunk) = payload.next().await {
        let chunk = chunk.map_err(Into::<EdinetError>::into)?;
        let chunk = chunk.as_ref();
        if chunk.is_empty() {
            continue;
        }
        writer.write_all(chunk).await?;
        written += chunk.len() as u64;
    }

    writer.flush().await?;
    writer.get_ref().sync_all().await?;
    Ok(written)
}
