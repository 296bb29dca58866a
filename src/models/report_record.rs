//! Report record entity
//!
//! A normalized accounting line from the seller realization report. The
//! `content_hash` column is the idempotency key checked before every insert.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "report_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub owner_id: i64,

    /// Lowercase hex SHA-256 over the hashed fields
    pub content_hash: String,

    pub realizationreport_id: Option<i64>,
    pub rid: Option<i64>,
    pub srid: Option<String>,
    /// Operation vocabulary code, 0 for unknown labels
    pub supplier_oper_name: Option<i64>,
    pub report_type: Option<i64>,
    pub shk_id: Option<i64>,
    pub nm_id: Option<i64>,
    pub gi_id: Option<i64>,
    pub quantity: Option<i64>,
    pub return_amount: Option<i64>,
    pub delivery_amount: Option<i64>,
    pub assembly_id: Option<i64>,
    pub ppvz_office_id: Option<i64>,

    pub delivery_rub: Option<f64>,
    pub penalty: Option<f64>,
    pub additional_payment: Option<f64>,
    pub storage_fee: Option<f64>,
    pub acquiring_fee: Option<f64>,
    pub acquiring_percent: Option<f64>,
    pub ppvz_sales_commission: Option<f64>,
    pub deduction: Option<f64>,
    pub acceptance: Option<f64>,
    pub dlv_prc: Option<f64>,
    pub retail_price: Option<f64>,
    pub retail_amount: Option<f64>,
    pub commission_percent: Option<f64>,

    // Kept as text exactly as received; numbers arrive pre-rendered with two decimals.
    pub ppvz_for_pay: Option<String>,
    pub rebill_logistic_cost: Option<String>,
    pub ppvz_spp_prc: Option<String>,
    pub ppvz_kvw_prc_base: Option<String>,
    pub ppvz_kvw_prc: Option<String>,
    pub ppvz_vw_nds: Option<String>,
    pub ppvz_vw: Option<String>,

    pub subject_name: Option<String>,
    pub brand_name: Option<String>,
    pub office_name: Option<String>,
    pub barcode: Option<String>,
    pub bonus_type_name: Option<String>,
    pub sa_name: Option<String>,
    pub gi_box_type_name: Option<String>,
    pub ts_name: Option<String>,
    pub sticker_id: Option<String>,

    pub rr_dt: Option<Date>,
    pub order_dt: Option<DateTime>,
    pub sale_dt: Option<DateTime>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
