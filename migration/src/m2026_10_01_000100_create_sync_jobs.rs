//! Creates the `sync_jobs` queue shared by report and card jobs.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SyncJobs::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(SyncJobs::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(SyncJobs::OwnerId).big_integer().not_null())
                    .col(ColumnDef::new(SyncJobs::Kind).text().not_null())
                    .col(
                        ColumnDef::new(SyncJobs::Status)
                            .text()
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(SyncJobs::DateFrom).date().null())
                    .col(ColumnDef::new(SyncJobs::DateTo).date().null())
                    .col(ColumnDef::new(SyncJobs::LastError).text().null())
                    .col(
                        ColumnDef::new(SyncJobs::Retryable)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(SyncJobs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(SyncJobs::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Pending jobs are picked per kind in creation order.
        manager
            .create_index(
                Index::create()
                    .name("idx_sync_jobs_kind_status_created")
                    .table(SyncJobs::Table)
                    .col(SyncJobs::Kind)
                    .col(SyncJobs::Status)
                    .col(SyncJobs::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_sync_jobs_kind_status_created")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(SyncJobs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum SyncJobs {
    Table,
    Id,
    OwnerId,
    Kind,
    Status,
    DateFrom,
    DateTo,
    LastError,
    Retryable,
    CreatedAt,
    UpdatedAt,
}
