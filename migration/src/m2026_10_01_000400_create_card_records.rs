//! Creates `card_records` with one row per seller article.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CardRecords::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(CardRecords::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(CardRecords::OwnerId).big_integer().not_null())
                    .col(ColumnDef::new(CardRecords::Articule).text().not_null())
                    .col(ColumnDef::new(CardRecords::Name).text().null())
                    .col(ColumnDef::new(CardRecords::InternalId).text().null())
                    .col(ColumnDef::new(CardRecords::Photo).text().null())
                    .col(ColumnDef::new(CardRecords::EuSize).text().null())
                    .col(ColumnDef::new(CardRecords::RusSize).text().null())
                    .col(ColumnDef::new(CardRecords::ChrtId).big_integer().null())
                    .col(ColumnDef::new(CardRecords::Barcode).text().null())
                    .col(
                        ColumnDef::new(CardRecords::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(CardRecords::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_card_records_owner_articule")
                    .table(CardRecords::Table)
                    .col(CardRecords::OwnerId)
                    .col(CardRecords::Articule)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("uq_card_records_owner_articule")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(CardRecords::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum CardRecords {
    Table,
    Id,
    OwnerId,
    Articule,
    Name,
    InternalId,
    Photo,
    EuSize,
    RusSize,
    ChrtId,
    Barcode,
    CreatedAt,
    UpdatedAt,
}
