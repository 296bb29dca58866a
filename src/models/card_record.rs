//! Catalogue card entity, one row per `(owner_id, articule)`.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "card_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub owner_id: i64,
    /// Marketplace article number (`nmID`)
    pub articule: String,
    pub name: Option<String>,
    /// Seller-side identifier (`vendorCode`, or `nmUUID` when present)
    pub internal_id: Option<String>,
    pub photo: Option<String>,
    pub eu_size: Option<String>,
    pub rus_size: Option<String>,
    pub chrt_id: Option<i64>,
    /// Comma-separated SKUs of the first size
    pub barcode: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
