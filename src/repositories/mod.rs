//! # Repository Layer
//!
//! The ingestion engine reaches persistence only through the three traits
//! below. `SyncJobRepository`, `RecordRepository` and `CredentialRepository`
//! implement them on top of SeaORM.

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::sync_job::{JobKind, JobStatus, Model as SyncJob};
use crate::normalization::{CardRecord, NormalizedRecord};

pub mod credential;
pub mod records;
pub mod sync_job;

pub use credential::CredentialRepository;
pub use records::RecordRepository;
pub use sync_job::SyncJobRepository;

/// Queue of sync jobs and their state transitions.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Pending jobs of `kind`, oldest first.
    async fn list_pending(&self, kind: JobKind) -> Result<Vec<SyncJob>, StoreError>;

    /// Record a status transition. `message` replaces `last_error`.
    async fn update_status(
        &self,
        id: Uuid,
        status: JobStatus,
        message: Option<String>,
        retryable: bool,
    ) -> Result<(), StoreError>;

    async fn enqueue_report(
        &self,
        owner_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<SyncJob, StoreError>;

    async fn enqueue_card(&self, owner_id: i64) -> Result<SyncJob, StoreError>;

    async fn find(&self, id: Uuid) -> Result<Option<SyncJob>, StoreError>;

    /// Move retryable `error` jobs of `kind` back to `pending`, returning how many moved.
    async fn requeue_retryable(&self, kind: JobKind) -> Result<u64, StoreError>;
}

/// Storage for ingested report lines and catalogue cards.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn exists_by_hash(&self, content_hash: &str) -> Result<bool, StoreError>;

    async fn insert_report(
        &self,
        record: &NormalizedRecord,
        content_hash: &str,
    ) -> Result<(), StoreError>;

    /// Insert or refresh the card keyed by `(owner_id, articule)`.
    async fn upsert_card(&self, card: &CardRecord) -> Result<(), StoreError>;
}

/// Per-seller marketplace tokens.
#[async_trait]
pub trait CredentialLookup: Send + Sync {
    async fn owner_credential(&self, owner_id: i64) -> Result<Option<String>, StoreError>;

    async fn set_owner_credential(&self, owner_id: i64, token: &str) -> Result<(), StoreError>;
}

#[cfg(test)]
pub(crate) async fn test_db() -> sea_orm::DatabaseConnection {
    use migration::{Migrator, MigratorTrait};

    let db = sea_orm::Database::connect("sqlite::memory:")
        .await
        .expect("connect sqlite");
    Migrator::up(&db, None).await.expect("apply migrations");
    db
}
