//! Sync Executor
//!
//! Runs a single sync job to a terminal state: resolves the seller credential,
//! walks the marketplace through the paginator, normalizes and deduplicates what
//! comes back, and writes the resulting status to the job store.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use metrics::counter;
use sea_orm::DatabaseConnection;
use serde_json::Value;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

use crate::config::AppConfig;
use crate::error::StoreError;
use crate::hashing::{HashScheme, content_hash};
use crate::marketplace::{Endpoints, FetchClient, FetchError, RequestGate, is_valid_token_format};
use crate::models::sync_job::{JobKind, JobStatus, Model as SyncJob};
use crate::normalization::{normalize_card, normalize_report_row};
use crate::paginator::{PaginationError, Paginator};
use crate::planner::plan;
use crate::repositories::{
    CredentialLookup, CredentialRepository, JobStore, RecordRepository, RecordStore,
    SyncJobRepository,
};

/// Body `title` the marketplace uses inside a 200 page to report throttling.
const RATE_LIMIT_SENTINEL: &str = "too many requests";

/// Configuration for the sync executor
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// First day served by the v5 report
    pub cutover: NaiveDate,
    /// Pause between consecutive report windows of one job
    pub window_pause: Duration,
    /// Probe the passes endpoint with the token before fetching
    pub verify_credentials: bool,
    /// Hash layout used for report deduplication
    pub hash_scheme: HashScheme,
}

impl ExecutorConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            cutover: config.marketplace.cutover_date,
            window_pause: config.marketplace.window_pause(),
            verify_credentials: config.marketplace.verify_credentials,
            hash_scheme: config.hash_scheme,
        }
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self::from_app_config(&AppConfig::default())
    }
}

/// Terminal classification of a failed job.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct JobError {
    pub message: String,
    pub retryable: bool,
}

impl JobError {
    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
        }
    }

    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
        }
    }
}

impl From<PaginationError> for JobError {
    fn from(err: PaginationError) -> Self {
        let retryable = err.is_retryable();
        let message = match &err {
            PaginationError::NotFound { endpoint, detail } => format!(
                "{endpoint} not found ({detail}); the token may lack access to this API category"
            ),
            other => other.to_string(),
        };
        Self { message, retryable }
    }
}

/// Result of one job run, as written to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Success(String),
    Failed(JobError),
}

impl JobOutcome {
    pub fn status(&self) -> JobStatus {
        match self {
            JobOutcome::Success(_) => JobStatus::Success,
            JobOutcome::Failed(_) => JobStatus::Error,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, JobOutcome::Failed(err) if err.retryable)
    }
}

/// Per-job record counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestTally {
    pub total: usize,
    pub saved: usize,
    pub duplicates: usize,
    pub failed: usize,
}

impl IngestTally {
    pub fn summary(&self) -> String {
        format!(
            "Total: {}, Saved: {}, Duplicates: {}, Failed: {}",
            self.total, self.saved, self.duplicates, self.failed
        )
    }
}

/// Executes sync jobs against the marketplace and the stores.
pub struct SyncExecutor {
    jobs: Arc<dyn JobStore>,
    records: Arc<dyn RecordStore>,
    credentials: Arc<dyn CredentialLookup>,
    paginator: Paginator,
    config: ExecutorConfig,
}

impl SyncExecutor {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        records: Arc<dyn RecordStore>,
        credentials: Arc<dyn CredentialLookup>,
        paginator: Paginator,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            jobs,
            records,
            credentials,
            paginator,
            config,
        }
    }

    /// Wire the SeaORM stores and a marketplace client around `gate`.
    pub fn from_config(
        config: &AppConfig,
        db: DatabaseConnection,
        gate: Arc<dyn RequestGate>,
    ) -> Result<Self, FetchError> {
        let client = FetchClient::new(gate, config.marketplace.timeout())?;
        let endpoints = Endpoints::from_config(&config.marketplace)?;
        let paginator = Paginator::new(client, endpoints, config.marketplace.clone());

        Ok(Self::new(
            Arc::new(SyncJobRepository::new(db.clone())),
            Arc::new(RecordRepository::new(db.clone())),
            Arc::new(CredentialRepository::new(db)),
            paginator,
            ExecutorConfig::from_app_config(config),
        ))
    }

    /// Run `job` and persist its terminal status.
    ///
    /// Only a failure to write that status is returned as an error; every other
    /// problem ends up in the returned [`JobOutcome`].
    #[instrument(skip(self, job), fields(job_id = %job.id, owner_id = job.owner_id, kind = %job.kind))]
    pub async fn run_job(&self, job: &SyncJob) -> Result<JobOutcome, StoreError> {
        info!("Starting sync job");

        let outcome = match job.kind {
            JobKind::Report => self.run_report(job).await,
            JobKind::Card => self.run_card(job).await,
        }
        .map_or_else(JobOutcome::Failed, JobOutcome::Success);

        let (message, retryable) = match &outcome {
            JobOutcome::Success(summary) => (summary.clone(), false),
            JobOutcome::Failed(err) => (err.message.clone(), err.retryable),
        };
        let status = outcome.status();

        self.jobs
            .update_status(job.id, status, Some(message.clone()), retryable)
            .await
            .map_err(|err| {
                error!(error = %err, status = %status, "Failed to record sync job status");
                err
            })?;

        counter!(
            "sync_jobs_processed_total",
            "kind" => job.kind.as_str(),
            "status" => status.as_str()
        )
        .increment(1);

        match &outcome {
            JobOutcome::Success(_) => info!(summary = %message, "Sync job succeeded"),
            JobOutcome::Failed(err) => {
                warn!(error = %err, retryable = err.retryable, "Sync job failed")
            }
        }

        Ok(outcome)
    }

    async fn run_report(&self, job: &SyncJob) -> Result<String, JobError> {
        let token = self.credential(job.owner_id).await?;

        let (Some(from), Some(to)) = (job.date_from, job.date_to) else {
            return Err(JobError::permanent("report job has no date range"));
        };
        let windows = plan(from, to, self.config.cutover);
        if windows.is_empty() {
            return Err(JobError::permanent(format!(
                "invalid period: {from} is after {to}"
            )));
        }

        let mut rows: Vec<Value> = Vec::new();
        let mut capped_windows = 0;
        for (index, window) in windows.iter().enumerate() {
            if index > 0 {
                sleep(self.config.window_pause).await;
            }
            let pages = self.paginator.fetch_report_window(&token, window).await?;
            info!(
                from = %window.from,
                to = %window.to,
                api = %window.api,
                pages = pages.pages,
                records = pages.records.len(),
                "Report window fetched"
            );
            if pages.exhausted {
                capped_windows += 1;
            }
            rows.extend(pages.records);
        }

        let Some(first) = rows.first() else {
            return Err(JobError::permanent("No data"));
        };
        if is_rate_limit_sentinel(first) {
            return Err(JobError::retryable(
                "marketplace answered with 'too many requests'",
            ));
        }

        let tally = self.ingest_reports(job.owner_id, &rows).await;
        let mut summary = tally.summary();
        if capped_windows > 0 {
            summary.push_str(&format!("; page limit reached in {capped_windows} window(s)"));
        }

        if tally.saved > 0 || tally.failed == 0 {
            Ok(summary)
        } else {
            Err(JobError::permanent(summary))
        }
    }

    async fn run_card(&self, job: &SyncJob) -> Result<String, JobError> {
        let token = self.credential(job.owner_id).await?;
        let pages = self.paginator.fetch_cards(&token).await?;
        if pages.records.is_empty() {
            return Err(JobError::permanent("No articles data received"));
        }

        let mut tally = IngestTally {
            total: pages.records.len(),
            ..IngestTally::default()
        };
        for (index, raw) in pages.records.iter().enumerate() {
            let card = match normalize_card(raw, job.owner_id) {
                Ok(card) => card,
                Err(err) => {
                    warn!(index, error = %err, "Skipping card");
                    tally.failed += 1;
                    continue;
                }
            };
            match self.records.upsert_card(&card).await {
                Ok(()) => tally.saved += 1,
                Err(err) => {
                    warn!(index, articule = %card.articule, error = %err, "Failed to store card");
                    tally.failed += 1;
                }
            }
        }
        counter!("sync_records_saved_total", "kind" => "card").increment(tally.saved as u64);

        let mut summary = tally.summary();
        if pages.exhausted {
            summary.push_str("; page limit reached");
        }
        if tally.saved > 0 {
            Ok(summary)
        } else {
            Err(JobError::permanent(summary))
        }
    }

    /// Normalize, hash and store report rows, skipping ones already stored.
    async fn ingest_reports(&self, owner_id: i64, rows: &[Value]) -> IngestTally {
        let mut tally = IngestTally {
            total: rows.len(),
            ..IngestTally::default()
        };

        for (index, raw) in rows.iter().enumerate() {
            let record = match normalize_report_row(raw, owner_id) {
                Ok(record) => record,
                Err(err) => {
                    warn!(index, error = %err, "Skipping report row");
                    tally.failed += 1;
                    continue;
                }
            };
            let hash = content_hash(&record, self.config.hash_scheme);

            match self.records.exists_by_hash(&hash).await {
                Ok(true) => {
                    debug!(index, hash = %hash, "Duplicate report row");
                    tally.duplicates += 1;
                    continue;
                }
                Ok(false) => {}
                Err(err) => {
                    warn!(index, error = %err, "Hash lookup failed");
                    tally.failed += 1;
                    continue;
                }
            }

            match self.records.insert_report(&record, &hash).await {
                Ok(()) => tally.saved += 1,
                Err(err) => {
                    warn!(index, error = %err, "Failed to store report row");
                    tally.failed += 1;
                }
            }
        }

        counter!("sync_records_saved_total", "kind" => "report").increment(tally.saved as u64);
        counter!("sync_records_duplicate_total").increment(tally.duplicates as u64);
        tally
    }

    /// Resolve and check the owner's token.
    async fn credential(&self, owner_id: i64) -> Result<String, JobError> {
        let token = self
            .credentials
            .owner_credential(owner_id)
            .await
            .map_err(|err| JobError::retryable(format!("credential lookup failed: {err}")))?
            .ok_or_else(|| {
                JobError::permanent(format!("no marketplace credential for owner {owner_id}"))
            })?;

        if !is_valid_token_format(&token) {
            return Err(JobError::permanent("marketplace credential is malformed"));
        }

        if self.config.verify_credentials {
            let accepted = self
                .paginator
                .client()
                .probe_credential(&self.paginator.endpoints().passes, &token)
                .await
                .map_err(|err| JobError::retryable(format!("credential probe failed: {err}")))?;
            if !accepted {
                return Err(JobError::permanent("marketplace rejected the credential"));
            }
        }

        Ok(token)
    }
}

fn is_rate_limit_sentinel(row: &Value) -> bool {
    row.get("title").and_then(Value::as_str) == Some(RATE_LIMIT_SENTINEL)
}
