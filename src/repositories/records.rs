//! SeaORM-backed [`RecordStore`] for report lines and catalogue cards.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set,
};
use uuid::Uuid;

use super::RecordStore;
use crate::error::{StoreError, map_db_err};
use crate::models::{card_record, report_record};
use crate::normalization::{CardRecord, NormalizedRecord};

#[derive(Clone)]
pub struct RecordRepository {
    db: DatabaseConnection,
}

impl RecordRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Stored report lines for an owner; used by diagnostics and tests.
    pub async fn count_reports(&self, owner_id: i64) -> Result<u64, StoreError> {
        report_record::Entity::find()
            .filter(report_record::Column::OwnerId.eq(owner_id))
            .count(&self.db)
            .await
            .map_err(|e| map_db_err("counting report records", e))
    }

    pub async fn list_cards(&self, owner_id: i64) -> Result<Vec<card_record::Model>, StoreError> {
        card_record::Entity::find()
            .filter(card_record::Column::OwnerId.eq(owner_id))
            .all(&self.db)
            .await
            .map_err(|e| map_db_err("listing card records", e))
    }
}

#[async_trait]
impl RecordStore for RecordRepository {
    async fn exists_by_hash(&self, content_hash: &str) -> Result<bool, StoreError> {
        let matches = report_record::Entity::find()
            .filter(report_record::Column::ContentHash.eq(content_hash))
            .count(&self.db)
            .await
            .map_err(|e| map_db_err("checking report hash", e))?;
        Ok(matches > 0)
    }

    async fn insert_report(
        &self,
        record: &NormalizedRecord,
        content_hash: &str,
    ) -> Result<(), StoreError> {
        report_active_model(record, content_hash)
            .insert(&self.db)
            .await
            .map_err(|e| map_db_err("inserting report record", e))?;
        Ok(())
    }

    async fn upsert_card(&self, card: &CardRecord) -> Result<(), StoreError> {
        use card_record::Column;

        let now = Utc::now().fixed_offset();
        let model = card_record::ActiveModel {
            id: Set(Uuid::new_v4()),
            owner_id: Set(card.owner_id),
            articule: Set(card.articule.clone()),
            name: Set(card.name.clone()),
            internal_id: Set(card.internal_id.clone()),
            photo: Set(card.photo.clone()),
            eu_size: Set(card.eu_size.clone()),
            rus_size: Set(card.rus_size.clone()),
            chrt_id: Set(card.chrt_id),
            barcode: Set(card.barcode.clone()),
            created_at: Set(now),
            updated_at: Set(now),
        };

        card_record::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([Column::OwnerId, Column::Articule])
                    .update_columns([
                        Column::Name,
                        Column::InternalId,
                        Column::Photo,
                        Column::EuSize,
                        Column::RusSize,
                        Column::ChrtId,
                        Column::Barcode,
                        Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await
            .map_err(|e| map_db_err("upserting card record", e))?;
        Ok(())
    }
}

fn report_active_model(record: &NormalizedRecord, content_hash: &str) -> report_record::ActiveModel {
    report_record::ActiveModel {
        id: Set(Uuid::new_v4()),
        owner_id: Set(record.owner_id),
        content_hash: Set(content_hash.to_string()),
        realizationreport_id: Set(record.realizationreport_id),
        rid: Set(record.rid),
        srid: Set(record.srid.clone()),
        supplier_oper_name: Set(record.supplier_oper_name),
        report_type: Set(record.report_type),
        shk_id: Set(record.shk_id),
        nm_id: Set(record.nm_id),
        gi_id: Set(record.gi_id),
        quantity: Set(record.quantity),
        return_amount: Set(record.return_amount),
        delivery_amount: Set(record.delivery_amount),
        assembly_id: Set(record.assembly_id),
        ppvz_office_id: Set(record.ppvz_office_id),
        delivery_rub: Set(record.delivery_rub),
        penalty: Set(record.penalty),
        additional_payment: Set(record.additional_payment),
        storage_fee: Set(record.storage_fee),
        acquiring_fee: Set(record.acquiring_fee),
        acquiring_percent: Set(record.acquiring_percent),
        ppvz_sales_commission: Set(record.ppvz_sales_commission),
        deduction: Set(record.deduction),
        acceptance: Set(record.acceptance),
        dlv_prc: Set(record.dlv_prc),
        retail_price: Set(record.retail_price),
        retail_amount: Set(record.retail_amount),
        commission_percent: Set(record.commission_percent),
        ppvz_for_pay: Set(record.ppvz_for_pay.clone()),
        rebill_logistic_cost: Set(record.rebill_logistic_cost.clone()),
        ppvz_spp_prc: Set(record.ppvz_spp_prc.clone()),
        ppvz_kvw_prc_base: Set(record.ppvz_kvw_prc_base.clone()),
        ppvz_kvw_prc: Set(record.ppvz_kvw_prc.clone()),
        ppvz_vw_nds: Set(record.ppvz_vw_nds.clone()),
        ppvz_vw: Set(record.ppvz_vw.clone()),
        subject_name: Set(record.subject_name.clone()),
        brand_name: Set(record.brand_name.clone()),
        office_name: Set(record.office_name.clone()),
        barcode: Set(record.barcode.clone()),
        bonus_type_name: Set(record.bonus_type_name.clone()),
        sa_name: Set(record.sa_name.clone()),
        gi_box_type_name: Set(record.gi_box_type_name.clone()),
        ts_name: Set(record.ts_name.clone()),
        sticker_id: Set(record.sticker_id.clone()),
        rr_dt: Set(record.rr_dt),
        order_dt: Set(record.order_dt),
        sale_dt: Set(record.sale_dt),
        created_at: Set(Utc::now().fixed_offset()),
    }
}
