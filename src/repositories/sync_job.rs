//! # SyncJob Repository
//!
//! SeaORM-backed [`JobStore`] over the `sync_jobs` table.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use super::JobStore;
use crate::error::{StoreError, map_db_err};
use crate::models::sync_job::{ActiveModel, Column, Entity, JobKind, JobStatus, Model};

/// Repository for sync job database operations
#[derive(Clone)]
pub struct SyncJobRepository {
    db: DatabaseConnection,
}

impl SyncJobRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn enqueue(
        &self,
        owner_id: i64,
        kind: JobKind,
        period: Option<(NaiveDate, NaiveDate)>,
    ) -> Result<Model, StoreError> {
        let now = Utc::now().fixed_offset();

        let job = ActiveModel {
            id: Set(Uuid::new_v4()),
            owner_id: Set(owner_id),
            kind: Set(kind),
            status: Set(JobStatus::Pending),
            date_from: Set(period.map(|(from, _)| from)),
            date_to: Set(period.map(|(_, to)| to)),
            last_error: Set(None),
            retryable: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let result = job
            .insert(&self.db)
            .await
            .map_err(|e| map_db_err("enqueueing sync job", e))?;

        tracing::info!(
            job_id = %result.id,
            owner_id,
            kind = %kind,
            "Sync job enqueued"
        );

        Ok(result)
    }
}

#[async_trait]
impl JobStore for SyncJobRepository {
    async fn list_pending(&self, kind: JobKind) -> Result<Vec<Model>, StoreError> {
        Entity::find()
            .filter(Column::Kind.eq(kind))
            .filter(Column::Status.eq(JobStatus::Pending))
            .order_by_asc(Column::CreatedAt)
            .order_by_asc(Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| map_db_err("listing pending sync jobs", e))
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: JobStatus,
        message: Option<String>,
        retryable: bool,
    ) -> Result<(), StoreError> {
        let job = Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| map_db_err("loading sync job", e))?
            .ok_or(StoreError::JobNotFound(id))?;

        let mut active: ActiveModel = job.into();
        active.status = Set(status);
        active.last_error = Set(message);
        active.retryable = Set(retryable);
        active.updated_at = Set(Utc::now().fixed_offset());

        active
            .update(&self.db)
            .await
            .map_err(|e| map_db_err("updating sync job status", e))?;

        tracing::debug!(job_id = %id, status = %status, retryable, "Sync job status updated");
        Ok(())
    }

    async fn enqueue_report(
        &self,
        owner_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Model, StoreError> {
        self.enqueue(owner_id, JobKind::Report, Some((from, to))).await
    }

    async fn enqueue_card(&self, owner_id: i64) -> Result<Model, StoreError> {
        self.enqueue(owner_id, JobKind::Card, None).await
    }

    async fn find(&self, id: Uuid) -> Result<Option<Model>, StoreError> {
        Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| map_db_err("finding sync job", e))
    }

    async fn requeue_retryable(&self, kind: JobKind) -> Result<u64, StoreError> {
        let result = Entity::update_many()
            .col_expr(Column::Status, Expr::value(JobStatus::Pending.as_str()))
            .col_expr(Column::Retryable, Expr::value(false))
            .col_expr(Column::UpdatedAt, Expr::value(Utc::now().fixed_offset()))
            .filter(Column::Kind.eq(kind))
            .filter(Column::Status.eq(JobStatus::Error))
            .filter(Column::Retryable.eq(true))
            .exec(&self.db)
            .await
            .map_err(|e| map_db_err("requeueing retryable sync jobs", e))?;

        tracing::info!(kind = %kind, requeued = result.rows_affected, "Retryable sync jobs requeued");
        Ok(result.rows_affected)
    }
}
