//! Content hashing for report records.
//!
//! The hash is the only idempotency key for report rows, so the field order and
//! rendering rules below are a stored contract: changing them breaks
//! deduplication against every hash already persisted.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::normalization::NormalizedRecord;

const DATETIME_LAYOUT: &str = "%Y-%m-%d %H:%M:%S";

/// How hash parts are joined before digesting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashScheme {
    /// Parts joined with `|`; adjacent fields cannot bleed into each other.
    #[default]
    Delimited,
    /// Parts concatenated without a separator, matching hashes written by the
    /// previous backend.
    Legacy,
}

impl HashScheme {
    pub const fn as_str(self) -> &'static str {
        match self {
            HashScheme::Delimited => "delimited",
            HashScheme::Legacy => "legacy",
        }
    }

    const fn separator(self) -> &'static str {
        match self {
            HashScheme::Delimited => "|",
            HashScheme::Legacy => "",
        }
    }
}

impl fmt::Display for HashScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "delimited" => Ok(HashScheme::Delimited),
            "legacy" => Ok(HashScheme::Legacy),
            other => Err(format!("unknown hash scheme '{other}'")),
        }
    }
}

/// Ordered textual parts folded into the digest.
pub fn hash_parts(record: &NormalizedRecord) -> Vec<String> {
    let mut parts = Vec::with_capacity(39);

    if record.owner_id > 0 {
        parts.push(record.owner_id.to_string());
    }
    parts.push(int(record.realizationreport_id));
    parts.push(int(record.rid));
    parts.push(text(&record.srid));
    parts.push(int(record.supplier_oper_name));
    parts.push(int(record.report_type));
    parts.push(int(record.shk_id));
    parts.push(int(record.nm_id));
    parts.push(int(record.gi_id));
    parts.push(int(record.quantity));
    parts.push(money(&record.rebill_logistic_cost));
    parts.push(int(record.return_amount));
    parts.push(amount(record.retail_price));
    parts.push(amount(record.retail_amount));
    parts.push(text(&record.subject_name));
    parts.push(text(&record.sa_name));
    parts.push(money(&record.ppvz_vw_nds));
    parts.push(money(&record.ppvz_vw));
    parts.push(money(&record.ppvz_spp_prc));
    parts.push(money(&record.ppvz_kvw_prc_base));
    parts.push(money(&record.ppvz_kvw_prc));
    parts.push(amount(record.ppvz_sales_commission));
    parts.push(amount(record.acquiring_fee));
    parts.push(int(record.assembly_id));
    parts.push(amount(record.acquiring_percent));
    parts.push(text(&record.gi_box_type_name));
    parts.push(amount(record.acceptance));
    parts.push(amount(record.commission_percent));
    parts.push(int(record.delivery_amount));
    parts.push(amount(record.delivery_rub));
    parts.push(text(&record.bonus_type_name));
    parts.push(money(&record.ppvz_for_pay));
    parts.push(int(record.ppvz_office_id));
    parts.push(text(&record.sticker_id));
    parts.push(text(&record.office_name));
    parts.push(amount(record.penalty));
    parts.push(text(&record.ts_name));
    parts.push(
        record
            .order_dt
            .map(|dt| dt.format(DATETIME_LAYOUT).to_string())
            .unwrap_or_default(),
    );
    parts.push(
        record
            .sale_dt
            .map(|dt| dt.format(DATETIME_LAYOUT).to_string())
            .unwrap_or_default(),
    );

    parts
}

/// Lowercase hex SHA-256 over the record's hash parts.
pub fn content_hash(record: &NormalizedRecord, scheme: HashScheme) -> String {
    let mask = hash_parts(record).join(scheme.separator());
    hex::encode(Sha256::digest(mask.as_bytes()))
}

fn int(value: Option<i64>) -> String {
    value.map_or_else(|| "0".to_string(), |v| v.to_string())
}

fn amount(value: Option<f64>) -> String {
    value.map_or_else(|| "0".to_string(), |v| format!("{v:.2}"))
}

fn money(value: &Option<String>) -> String {
    value
        .as_deref()
        .map_or_else(|| "0".to_string(), |v| v.replace(',', ""))
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}
