//! # Seller Sync Entry Point
//!
//! Loads configuration, connects to the database and runs one scheduler task
//! per selected job kind until Ctrl-C or SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use migration::{Migrator, MigratorTrait};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use seller_sync::{
    config::{AppConfig, ConfigLoader},
    db,
    marketplace::RateLimiter,
    models::JobKind,
    repositories::{JobStore, SyncJobRepository},
    scheduler::SyncScheduler,
    sync_executor::SyncExecutor,
    telemetry,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum KindArg {
    Report,
    Card,
    All,
}

impl KindArg {
    fn kinds(self) -> Vec<JobKind> {
        match self {
            KindArg::Report => vec![JobKind::Report],
            KindArg::Card => vec![JobKind::Card],
            KindArg::All => vec![JobKind::Report, JobKind::Card],
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "seller-sync", version, about = "Marketplace seller report ingestion")]
struct Cli {
    /// Job kinds to process
    #[arg(long, value_enum, default_value_t = KindArg::All)]
    kind: KindArg,

    /// Run a single cycle per kind and exit
    #[arg(long)]
    once: bool,

    /// Seconds between cycles, overriding the configured interval
    #[arg(long)]
    interval: Option<u64>,

    /// Apply database migrations before starting
    #[arg(long)]
    migrate: bool,

    /// Move retryable failed jobs back to pending and exit
    #[arg(long)]
    requeue_retryable: bool,
}

fn interval_for(config: &AppConfig, kind: JobKind, overridden: Option<u64>) -> Duration {
    let seconds = overridden.unwrap_or(match kind {
        JobKind::Report => config.scheduler.report_interval_seconds,
        JobKind::Card => config.scheduler.card_interval_seconds,
    });
    Duration::from_secs(seconds.max(1))
}

async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C, finishing current jobs"),
        _ = terminate => info!("Received SIGTERM, finishing current jobs"),
    }

    shutdown.cancel();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ConfigLoader::new().load().context("loading configuration")?;
    telemetry::init_tracing(&config).context("initializing telemetry")?;
    info!(profile = %config.profile, "Loaded configuration");
    if let Ok(redacted) = config.redacted_json() {
        tracing::debug!(config = %redacted, "Effective configuration");
    }

    let db = db::init_pool(&config)
        .await
        .context("initializing database connection pool")?;
    db::health_check(&db).await?;

    if cli.migrate {
        Migrator::up(&db, None)
            .await
            .context("applying database migrations")?;
        info!("Database migrations applied");
    }

    let jobs = Arc::new(SyncJobRepository::new(db.clone()));

    if cli.requeue_retryable {
        for kind in cli.kind.kinds() {
            let moved = jobs
                .requeue_retryable(kind)
                .await
                .with_context(|| format!("requeueing retryable {kind} jobs"))?;
            info!(kind = %kind, requeued = moved, "Requeued retryable jobs");
        }
        return Ok(());
    }

    let limiter = Arc::new(RateLimiter::new(&config.rate_limit));
    let executor = Arc::new(
        SyncExecutor::from_config(&config, db.clone(), limiter.clone())
            .context("building sync executor")?,
    );
    let scheduler = Arc::new(SyncScheduler::new(jobs, executor, limiter));

    if cli.once {
        for kind in cli.kind.kinds() {
            let stats = scheduler
                .run_once(kind)
                .await
                .with_context(|| format!("running {kind} cycle"))?;
            info!(kind = %kind, ?stats, "Cycle finished");
        }
        return Ok(());
    }

    let shutdown = CancellationToken::new();
    tokio::spawn(shutdown_signal(shutdown.clone()));

    let mut tasks = Vec::new();
    for kind in cli.kind.kinds() {
        let scheduler = scheduler.clone();
        let shutdown = shutdown.clone();
        let interval = interval_for(&config, kind, cli.interval);
        tasks.push(tokio::spawn(async move {
            scheduler.run(kind, interval, shutdown).await;
        }));
    }

    for task in tasks {
        if let Err(err) = task.await {
            warn!(error = %err, "Scheduler task ended abnormally");
        }
    }

    info!("seller-sync stopped");
    Ok(())
}
