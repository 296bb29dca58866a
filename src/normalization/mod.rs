//! Mapping of raw marketplace payloads into canonical records.
//!
//! Report rows and catalogue cards are decoded into typed intermediates
//! ([`report::RawReportRow`], [`card::RawCard`]) before any business logic sees
//! them; fields that cannot be interpreted are left empty and logged.

use std::fmt;

use thiserror::Error;

pub mod card;
pub mod loose;
pub mod report;

pub use card::{CardRecord, normalize_card};
pub use loose::Loose;
pub use report::{NormalizedRecord, RawReportRow, normalize_report_row};

/// Controlled vocabulary for the `supplier_oper_name` report column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Sale,
    Return,
    Logistics,
    Withholding,
    Penalty,
    Storage,
    SalesCorrection,
    AdvancePaymentForIdleGoods,
    StorageRecalculation,
    PaidAcceptanceRecalculation,
    LogisticsCorrection,
    AcquiringAdjustment,
    DamageCompensation,
    LostGoodsCompensation,
    DefectCompensation,
    VoluntaryReturnCompensation,
    SubstitutedGoodsCompensation,
    TransportCostReimbursement,
}

impl OperationKind {
    /// Stable numeric code persisted in `report_records.supplier_oper_name`.
    pub const fn code(self) -> i64 {
        match self {
            OperationKind::Sale => 1,
            OperationKind::Return => 2,
            OperationKind::Logistics => 3,
            OperationKind::Withholding => 4,
            OperationKind::Penalty => 5,
            OperationKind::Storage => 6,
            OperationKind::SalesCorrection => 7,
            OperationKind::AdvancePaymentForIdleGoods => 8,
            OperationKind::StorageRecalculation => 9,
            OperationKind::PaidAcceptanceRecalculation => 10,
            OperationKind::LogisticsCorrection => 11,
            OperationKind::AcquiringAdjustment => 12,
            OperationKind::DamageCompensation => 13,
            OperationKind::LostGoodsCompensation => 14,
            OperationKind::DefectCompensation => 15,
            OperationKind::VoluntaryReturnCompensation => 16,
            OperationKind::SubstitutedGoodsCompensation => 17,
            OperationKind::TransportCostReimbursement => 18,
        }
    }

    /// Label exactly as the report API spells it.
    pub const fn label(self) -> &'static str {
        match self {
            OperationKind::Sale => "Продажа",
            OperationKind::Return => "Возврат",
            OperationKind::Logistics => "Логистика",
            OperationKind::Withholding => "Удержание",
            OperationKind::Penalty => "Штраф",
            OperationKind::Storage => "Хранение",
            OperationKind::SalesCorrection => "Коррекция продаж",
            OperationKind::AdvancePaymentForIdleGoods => "Авансовая оплата за товар без движения",
            OperationKind::StorageRecalculation => "Пересчет хранения",
            OperationKind::PaidAcceptanceRecalculation => "Пересчет платной приемки",
            OperationKind::LogisticsCorrection => "Коррекция логистики",
            OperationKind::AcquiringAdjustment => "Корректировка эквайринга",
            OperationKind::DamageCompensation => "Компенсация ущерба",
            OperationKind::LostGoodsCompensation => "Компенсация потерянного товара",
            OperationKind::DefectCompensation => "Компенсация брака",
            OperationKind::VoluntaryReturnCompensation => "Добровольная компенсация при возврате",
            OperationKind::SubstitutedGoodsCompensation => "Компенсация подмененного товара",
            OperationKind::TransportCostReimbursement => {
                "Возмещение издержек по перевозке/по складским операциям с товаром"
            }
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Complete vocabulary, ordered by code.
pub const ALL_OPERATION_KINDS: &[OperationKind] = &[
    OperationKind::Sale,
    OperationKind::Return,
    OperationKind::Logistics,
    OperationKind::Withholding,
    OperationKind::Penalty,
    OperationKind::Storage,
    OperationKind::SalesCorrection,
    OperationKind::AdvancePaymentForIdleGoods,
    OperationKind::StorageRecalculation,
    OperationKind::PaidAcceptanceRecalculation,
    OperationKind::LogisticsCorrection,
    OperationKind::AcquiringAdjustment,
    OperationKind::DamageCompensation,
    OperationKind::LostGoodsCompensation,
    OperationKind::DefectCompensation,
    OperationKind::VoluntaryReturnCompensation,
    OperationKind::SubstitutedGoodsCompensation,
    OperationKind::TransportCostReimbursement,
];

/// Exact-match lookup of an API label.
pub fn parse_operation_label(label: &str) -> Option<OperationKind> {
    ALL_OPERATION_KINDS
        .iter()
        .copied()
        .find(|kind| kind.label() == label)
}

/// Resolve the numeric operation code for a raw `supplier_oper_name` value.
///
/// Known labels map to their vocabulary code, integer-looking values pass
/// through unchanged and anything else collapses to `0`.
pub fn operation_code(raw: &Loose) -> i64 {
    match raw {
        Loose::Text(label) => parse_operation_label(label)
            .map(OperationKind::code)
            .or_else(|| label.trim().parse::<i64>().ok())
            .unwrap_or(0),
        other => other.as_i64().unwrap_or(0),
    }
}

/// Errors raised for payload entries that cannot become records at all.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizationError {
    #[error("expected a JSON object, found {found}")]
    NotAnObject { found: &'static str },
    #[error("payload missing required field: {field}")]
    MissingField { field: &'static str },
    #[error("payload could not be decoded: {0}")]
    Malformed(String),
}

pub(crate) fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
