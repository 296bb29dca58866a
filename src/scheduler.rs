//! # Sync Scheduler
//!
//! Polls the job store for pending jobs of one kind and hands them to the
//! executor one at a time. One scheduler task runs per job kind; all of them
//! share the process-wide rate limiter.

use std::sync::Arc;
use std::time::Duration;

use metrics::histogram;
use serde::Serialize;
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

use crate::error::StoreError;
use crate::marketplace::RateLimiter;
use crate::models::sync_job::JobKind;
use crate::repositories::JobStore;
use crate::sync_executor::{JobOutcome, SyncExecutor};

/// Counters for a single polling cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CycleStats {
    pub processed: u64,
    pub succeeded: u64,
    pub failed: u64,
    /// Subset of `failed` marked retryable.
    pub retryable: u64,
}

/// Background scheduler service.
pub struct SyncScheduler {
    jobs: Arc<dyn JobStore>,
    executor: Arc<SyncExecutor>,
    limiter: Arc<RateLimiter>,
}

impl SyncScheduler {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        executor: Arc<SyncExecutor>,
        limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            jobs,
            executor,
            limiter,
        }
    }

    /// Process every job of `kind` that is pending right now.
    pub async fn run_once(&self, kind: JobKind) -> Result<CycleStats, StoreError> {
        self.cycle(kind, None).await
    }

    /// Run a cycle immediately and then every `interval` until `shutdown` fires.
    ///
    /// A job already in progress always runs to completion; cancellation is
    /// checked between jobs and while waiting for the next cycle.
    #[instrument(skip(self, shutdown), fields(kind = %kind))]
    pub async fn run(&self, kind: JobKind, interval: Duration, shutdown: CancellationToken) {
        info!(interval_secs = interval.as_secs(), "Starting sync scheduler");

        loop {
            if let Err(err) = self.cycle(kind, Some(&shutdown)).await {
                error!(error = ?err, "Sync cycle failed");
            }

            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Sync scheduler shutdown requested");
                    break;
                }
                _ = sleep(interval) => {}
            }
        }

        info!("Sync scheduler stopped");
    }

    async fn cycle(
        &self,
        kind: JobKind,
        shutdown: Option<&CancellationToken>,
    ) -> Result<CycleStats, StoreError> {
        let started = Instant::now();
        let mut stats = CycleStats::default();

        let pending = self.jobs.list_pending(kind).await?;
        debug!(kind = %kind, pending = pending.len(), "Loaded pending sync jobs");

        for job in pending {
            if shutdown.is_some_and(CancellationToken::is_cancelled) {
                info!(kind = %kind, "Shutdown requested; remaining jobs stay pending");
                break;
            }

            stats.processed += 1;
            match self.executor.run_job(&job).await {
                Ok(JobOutcome::Success(_)) => stats.succeeded += 1,
                Ok(JobOutcome::Failed(err)) => {
                    stats.failed += 1;
                    if err.retryable {
                        stats.retryable += 1;
                    }
                }
                Err(err) => {
                    stats.failed += 1;
                    error!(error = ?err, job_id = %job.id, "Sync job outcome was not recorded");
                }
            }
        }

        histogram!("sync_cycle_duration_ms", "kind" => kind.as_str())
            .record(started.elapsed().as_secs_f64() * 1_000.0);

        let limiter = self.limiter.stats().await;
        info!(
            kind = %kind,
            processed = stats.processed,
            succeeded = stats.succeeded,
            failed = stats.failed,
            retryable = stats.retryable,
            total_requests = limiter.total_requests,
            rate_limit_hits = limiter.rate_limit_hits,
            requests_this_minute = limiter.requests_this_minute,
            rate_limited = limiter.rate_limited,
            "Sync cycle completed"
        );

        Ok(stats)
    }
}
