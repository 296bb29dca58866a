//! Creates `report_records`, the store of normalized realization report lines.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ReportRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ReportRecords::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ReportRecords::OwnerId).big_integer().not_null())
                    .col(ColumnDef::new(ReportRecords::ContentHash).string_len(64).not_null())
                    .col(ColumnDef::new(ReportRecords::RealizationreportId).big_integer().null())
                    .col(ColumnDef::new(ReportRecords::Rid).big_integer().null())
                    .col(ColumnDef::new(ReportRecords::SupplierOperName).big_integer().null())
                    .col(ColumnDef::new(ReportRecords::ReportType).big_integer().null())
                    .col(ColumnDef::new(ReportRecords::ShkId).big_integer().null())
                    .col(ColumnDef::new(ReportRecords::NmId).big_integer().null())
                    .col(ColumnDef::new(ReportRecords::GiId).big_integer().null())
                    .col(ColumnDef::new(ReportRecords::Quantity).big_integer().null())
                    .col(ColumnDef::new(ReportRecords::ReturnAmount).big_integer().null())
                    .col(ColumnDef::new(ReportRecords::DeliveryAmount).big_integer().null())
                    .col(ColumnDef::new(ReportRecords::AssemblyId).big_integer().null())
                    .col(ColumnDef::new(ReportRecords::PpvzOfficeId).big_integer().null())
                    .col(ColumnDef::new(ReportRecords::DeliveryRub).double().null())
                    .col(ColumnDef::new(ReportRecords::Penalty).double().null())
                    .col(ColumnDef::new(ReportRecords::AdditionalPayment).double().null())
                    .col(ColumnDef::new(ReportRecords::StorageFee).double().null())
                    .col(ColumnDef::new(ReportRecords::AcquiringFee).double().null())
                    .col(ColumnDef::new(ReportRecords::AcquiringPercent).double().null())
                    .col(ColumnDef::new(ReportRecords::PpvzSalesCommission).double().null())
                    .col(ColumnDef::new(ReportRecords::Deduction).double().null())
                    .col(ColumnDef::new(ReportRecords::Acceptance).double().null())
                    .col(ColumnDef::new(ReportRecords::DlvPrc).double().null())
                    .col(ColumnDef::new(ReportRecords::RetailPrice).double().null())
                    .col(ColumnDef::new(ReportRecords::RetailAmount).double().null())
                    .col(ColumnDef::new(ReportRecords::CommissionPercent).double().null())
                    .col(ColumnDef::new(ReportRecords::Srid).text().null())
                    .col(ColumnDef::new(ReportRecords::PpvzForPay).text().null())
                    .col(ColumnDef::new(ReportRecords::RebillLogisticCost).text().null())
                    .col(ColumnDef::new(ReportRecords::PpvzSppPrc).text().null())
                    .col(ColumnDef::new(ReportRecords::PpvzKvwPrcBase).text().null())
                    .col(ColumnDef::new(ReportRecords::PpvzKvwPrc).text().null())
                    .col(ColumnDef::new(ReportRecords::PpvzVwNds).text().null())
                    .col(ColumnDef::new(ReportRecords::PpvzVw).text().null())
                    .col(ColumnDef::new(ReportRecords::SubjectName).text().null())
                    .col(ColumnDef::new(ReportRecords::BrandName).text().null())
                    .col(ColumnDef::new(ReportRecords::OfficeName).text().null())
                    .col(ColumnDef::new(ReportRecords::Barcode).text().null())
                    .col(ColumnDef::new(ReportRecords::BonusTypeName).text().null())
                    .col(ColumnDef::new(ReportRecords::SaName).text().null())
                    .col(ColumnDef::new(ReportRecords::GiBoxTypeName).text().null())
                    .col(ColumnDef::new(ReportRecords::TsName).text().null())
                    .col(ColumnDef::new(ReportRecords::StickerId).text().null())
                    .col(ColumnDef::new(ReportRecords::RrDt).date().null())
                    .col(ColumnDef::new(ReportRecords::OrderDt).timestamp().null())
                    .col(ColumnDef::new(ReportRecords::SaleDt).timestamp().null())
                    .col(
                        ColumnDef::new(ReportRecords::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Not unique: duplicates are filtered by lookup before insert.
        manager
            .create_index(
                Index::create()
                    .name("idx_report_records_content_hash")
                    .table(ReportRecords::Table)
                    .col(ReportRecords::ContentHash)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_report_records_owner_rr_dt")
                    .table(ReportRecords::Table)
                    .col(ReportRecords::OwnerId)
                    .col(ReportRecords::RrDt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_report_records_owner_rr_dt")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_report_records_content_hash")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(ReportRecords::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ReportRecords {
    Table,
    Id,
    OwnerId,
    ContentHash,
    RealizationreportId,
    Rid,
    SupplierOperName,
    ReportType,
    ShkId,
    NmId,
    GiId,
    Quantity,
    ReturnAmount,
    DeliveryAmount,
    AssemblyId,
    PpvzOfficeId,
    DeliveryRub,
    Penalty,
    AdditionalPayment,
    StorageFee,
    AcquiringFee,
    AcquiringPercent,
    PpvzSalesCommission,
    Deduction,
    Acceptance,
    DlvPrc,
    RetailPrice,
    RetailAmount,
    CommissionPercent,
    Srid,
    PpvzForPay,
    RebillLogisticCost,
    PpvzSppPrc,
    PpvzKvwPrcBase,
    PpvzKvwPrc,
    PpvzVwNds,
    PpvzVw,
    SubjectName,
    BrandName,
    OfficeName,
    Barcode,
    BonusTypeName,
    SaName,
    GiBoxTypeName,
    TsName,
    StickerId,
    RrDt,
    OrderDt,
    SaleDt,
    CreatedAt,
}
