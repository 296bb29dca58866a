//! Report row decoding and normalization.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, trace};

use super::{Loose, NormalizationError, json_type_name, operation_code};

/// Report row as received, before any interpretation.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawReportRow {
    pub realizationreport_id: Option<Loose>,
    pub rid: Option<Loose>,
    pub srid: Option<Loose>,
    pub supplier_oper_name: Option<Loose>,
    pub report_type: Option<Loose>,
    pub shk_id: Option<Loose>,
    pub nm_id: Option<Loose>,
    pub gi_id: Option<Loose>,
    pub quantity: Option<Loose>,
    pub return_amount: Option<Loose>,
    pub delivery_amount: Option<Loose>,
    pub assembly_id: Option<Loose>,
    pub ppvz_office_id: Option<Loose>,
    pub delivery_rub: Option<Loose>,
    pub penalty: Option<Loose>,
    pub additional_payment: Option<Loose>,
    pub storage_fee: Option<Loose>,
    pub acquiring_fee: Option<Loose>,
    pub acquiring_percent: Option<Loose>,
    pub ppvz_sales_commission: Option<Loose>,
    pub deduction: Option<Loose>,
    pub acceptance: Option<Loose>,
    pub dlv_prc: Option<Loose>,
    pub retail_price: Option<Loose>,
    pub retail_amount: Option<Loose>,
    pub commission_percent: Option<Loose>,
    pub ppvz_for_pay: Option<Loose>,
    pub rebill_logistic_cost: Option<Loose>,
    pub ppvz_spp_prc: Option<Loose>,
    pub ppvz_kvw_prc_base: Option<Loose>,
    pub ppvz_kvw_prc: Option<Loose>,
    pub ppvz_vw_nds: Option<Loose>,
    pub ppvz_vw: Option<Loose>,
    pub subject_name: Option<Loose>,
    pub brand_name: Option<Loose>,
    pub office_name: Option<Loose>,
    pub barcode: Option<Loose>,
    pub bonus_type_name: Option<Loose>,
    pub sa_name: Option<Loose>,
    pub gi_box_type_name: Option<Loose>,
    pub ts_name: Option<Loose>,
    pub sticker_id: Option<Loose>,
    pub rr_dt: Option<Loose>,
    pub order_dt: Option<Loose>,
    pub sale_dt: Option<Loose>,
    /// Keys the engine does not map (cursor ids, document types, ...).
    #[serde(flatten)]
    pub unrecognized: BTreeMap<String, Value>,
}

/// One accounting line in canonical form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedRecord {
    pub owner_id: i64,

    pub realizationreport_id: Option<i64>,
    pub rid: Option<i64>,
    pub srid: Option<String>,
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

    pub rr_dt: Option<NaiveDate>,
    pub order_dt: Option<NaiveDateTime>,
    pub sale_dt: Option<NaiveDateTime>,
}

/// Normalize one element of a report page.
///
/// Only non-object elements are rejected; every other problem leaves the
/// affected field empty.
pub fn normalize_report_row(
    value: &Value,
    owner_id: i64,
) -> Result<NormalizedRecord, NormalizationError> {
    if !value.is_object() {
        return Err(NormalizationError::NotAnObject {
            found: json_type_name(value),
        });
    }

    let raw = RawReportRow::deserialize(value)
        .map_err(|err| NormalizationError::Malformed(err.to_string()))?;

    if !raw.unrecognized.is_empty() {
        trace!(
            keys = ?raw.unrecognized.keys().collect::<Vec<_>>(),
            "Report row carries unmapped keys"
        );
    }

    let supplier_oper_name = raw.supplier_oper_name.as_ref().map(operation_code);

    Ok(NormalizedRecord {
        owner_id,
        realizationreport_id: int("realizationreport_id", raw.realizationreport_id),
        rid: int("rid", raw.rid),
        srid: text("srid", raw.srid),
        supplier_oper_name,
        report_type: int("report_type", raw.report_type),
        shk_id: int("shk_id", raw.shk_id),
        nm_id: int("nm_id", raw.nm_id),
        gi_id: int("gi_id", raw.gi_id),
        quantity: int("quantity", raw.quantity),
        return_amount: int("return_amount", raw.return_amount),
        delivery_amount: int("delivery_amount", raw.delivery_amount),
        assembly_id: int("assembly_id", raw.assembly_id),
        ppvz_office_id: int("ppvz_office_id", raw.ppvz_office_id),
        delivery_rub: float("delivery_rub", raw.delivery_rub),
        penalty: float("penalty", raw.penalty),
        additional_payment: float("additional_payment", raw.additional_payment),
        storage_fee: float("storage_fee", raw.storage_fee),
        acquiring_fee: float("acquiring_fee", raw.acquiring_fee),
        acquiring_percent: float("acquiring_percent", raw.acquiring_percent),
        ppvz_sales_commission: float("ppvz_sales_commission", raw.ppvz_sales_commission),
        deduction: float("deduction", raw.deduction),
        acceptance: float("acceptance", raw.acceptance),
        dlv_prc: float("dlv_prc", raw.dlv_prc),
        retail_price: float("retail_price", raw.retail_price),
        retail_amount: float("retail_amount", raw.retail_amount),
        commission_percent: float("commission_percent", raw.commission_percent),
        ppvz_for_pay: money("ppvz_for_pay", raw.ppvz_for_pay),
        rebill_logistic_cost: money("rebill_logistic_cost", raw.rebill_logistic_cost),
        ppvz_spp_prc: money("ppvz_spp_prc", raw.ppvz_spp_prc),
        ppvz_kvw_prc_base: money("ppvz_kvw_prc_base", raw.ppvz_kvw_prc_base),
        ppvz_kvw_prc: money("ppvz_kvw_prc", raw.ppvz_kvw_prc),
        ppvz_vw_nds: money("ppvz_vw_nds", raw.ppvz_vw_nds),
        ppvz_vw: money("ppvz_vw", raw.ppvz_vw),
        subject_name: text("subject_name", raw.subject_name),
        brand_name: text("brand_name", raw.brand_name),
        office_name: text("office_name", raw.office_name),
        barcode: text("barcode", raw.barcode),
        bonus_type_name: text("bonus_type_name", raw.bonus_type_name),
        sa_name: text("sa_name", raw.sa_name),
        gi_box_type_name: text("gi_box_type_name", raw.gi_box_type_name),
        ts_name: text("ts_name", raw.ts_name),
        sticker_id: text("sticker_id", raw.sticker_id),
        rr_dt: interpret("rr_dt", raw.rr_dt, Loose::as_date),
        order_dt: interpret("order_dt", raw.order_dt, Loose::as_datetime),
        sale_dt: interpret("sale_dt", raw.sale_dt, Loose::as_datetime),
    })
}

fn interpret<T>(field: &'static str, value: Option<Loose>, f: fn(&Loose) -> Option<T>) -> Option<T> {
    let value = value?;
    let parsed = f(&value);
    if parsed.is_none() {
        debug!(field, found = value.kind(), "Ignoring uninterpretable report field");
    }
    parsed
}

fn int(field: &'static str, value: Option<Loose>) -> Option<i64> {
    interpret(field, value, Loose::as_i64)
}

fn float(field: &'static str, value: Option<Loose>) -> Option<f64> {
    interpret(field, value, Loose::as_f64)
}

fn money(field: &'static str, value: Option<Loose>) -> Option<String> {
    interpret(field, value, Loose::as_money_text)
}

fn text(field: &'static str, value: Option<Loose>) -> Option<String> {
    interpret(field, value, Loose::as_text)
}
