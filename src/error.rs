//! Store-level errors shared by the repositories.

use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error while {context}: {source}")]
    Database {
        context: &'static str,
        #[source]
        source: DbErr,
    },
    #[error("sync job {0} not found")]
    JobNotFound(Uuid),
}

/// Log a database failure and wrap it with the operation that produced it.
pub fn map_db_err(context: &'static str, err: DbErr) -> StoreError {
    tracing::error!(error = ?err, context, "Database operation failed");
    StoreError::Database {
        context,
        source: err,
    }
}
