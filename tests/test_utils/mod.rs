//! Shared fixtures for the integration tests.
//!
//! Provides an in-memory SQLite database with migrations applied, a request
//! gate that never waits, and configuration pointing every marketplace
//! endpoint at a local mock server.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection};
use seller_sync::config::AppConfig;
use seller_sync::marketplace::RequestGate;
use seller_sync::repositories::{CredentialRepository, RecordRepository, SyncJobRepository};
use seller_sync::sync_executor::SyncExecutor;

/// A token that passes the format check.
pub const TOKEN: &str = "aaaa.bbbb.cccc";

pub const REPORT_V1_PATH: &str = "/api/v1/supplier/reportDetailByPeriod";
pub const REPORT_V5_PATH: &str = "/api/v5/supplier/reportDetailByPeriod";
pub const CARDS_PATH: &str = "/content/v2/get/cards/list";
pub const PASSES_PATH: &str = "/api/v3/passes";

/// Sets up an in-memory SQLite database with all migrations applied.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

/// Gate that lets every request through immediately and remembers what it saw.
#[derive(Debug, Default)]
pub struct RecordingGate {
    acquired: AtomicUsize,
    observed: Mutex<Vec<(u16, Option<String>)>>,
}

impl RecordingGate {
    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn observed(&self) -> Vec<(u16, Option<String>)> {
        self.observed
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .clone()
    }
}

#[async_trait]
impl RequestGate for RecordingGate {
    async fn acquire(&self) {
        self.acquired.fetch_add(1, Ordering::SeqCst);
    }

    async fn observe(&self, status: u16, retry_after: Option<&str>) {
        self.observed
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .push((status, retry_after.map(str::to_owned)));
    }
}

/// Configuration with every endpoint on `base` and no pauses.
pub fn test_config(base: &str) -> AppConfig {
    let mut config = AppConfig::default();
    config.database_url = "sqlite::memory:".to_string();
    config.marketplace.report_v1_url = format!("{base}{REPORT_V1_PATH}");
    config.marketplace.report_v5_url = format!("{base}{REPORT_V5_PATH}");
    config.marketplace.cards_url = format!("{base}{CARDS_PATH}");
    config.marketplace.passes_url = format!("{base}{PASSES_PATH}");
    config.marketplace.timeout_ms = 2_000;
    config.marketplace.max_attempts = 3;
    config.marketplace.max_pages = 5;
    config.marketplace.page_pause_ms = 0;
    config.marketplace.card_page_pause_ms = 0;
    config.marketplace.window_pause_ms = 0;
    config.rate_limit.min_interval_ms = 0;
    config
}

/// Database, stores and an executor wired against one mock server.
pub struct Harness {
    pub db: DatabaseConnection,
    pub jobs: SyncJobRepository,
    pub records: RecordRepository,
    pub credentials: CredentialRepository,
    pub gate: Arc<RecordingGate>,
    pub executor: SyncExecutor,
}

pub async fn harness(config: &AppConfig) -> Result<Harness> {
    let db = setup_test_db().await?;
    let gate = Arc::new(RecordingGate::default());
    let executor = SyncExecutor::from_config(config, db.clone(), gate.clone())?;

    Ok(Harness {
        jobs: SyncJobRepository::new(db.clone()),
        records: RecordRepository::new(db.clone()),
        credentials: CredentialRepository::new(db.clone()),
        db,
        gate,
        executor,
    })
}
