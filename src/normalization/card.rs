//! Catalogue card decoding.

use serde::Deserialize;
use serde_json::Value;

use super::{Loose, NormalizationError, json_type_name};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawCard {
    #[serde(rename = "nmID")]
    pub nm_id: Option<Loose>,
    #[serde(rename = "nmUUID")]
    pub nm_uuid: Option<Loose>,
    #[serde(rename = "vendorCode")]
    pub vendor_code: Option<Loose>,
    pub title: Option<Loose>,
    pub photos: Option<Vec<RawPhoto>>,
    pub sizes: Option<Vec<RawSize>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawPhoto {
    pub big: Option<Loose>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawSize {
    #[serde(rename = "chrtID")]
    pub chrt_id: Option<Loose>,
    #[serde(rename = "techSize")]
    pub tech_size: Option<Loose>,
    #[serde(rename = "wbSize")]
    pub wb_size: Option<Loose>,
    pub skus: Option<Vec<Loose>>,
}

/// Catalogue item keyed by `(owner_id, articule)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CardRecord {
    pub owner_id: i64,
    pub articule: String,
    pub name: Option<String>,
    pub internal_id: Option<String>,
    pub photo: Option<String>,
    pub eu_size: Option<String>,
    pub rus_size: Option<String>,
    pub chrt_id: Option<i64>,
    pub barcode: Option<String>,
}

pub fn normalize_card(value: &Value, owner_id: i64) -> Result<CardRecord, NormalizationError> {
    if !value.is_object() {
        return Err(NormalizationError::NotAnObject {
            found: json_type_name(value),
        });
    }

    let raw =
        RawCard::deserialize(value).map_err(|err| NormalizationError::Malformed(err.to_string()))?;

    let articule = raw
        .nm_id
        .as_ref()
        .and_then(Loose::as_i64)
        .map(|id| id.to_string())
        .ok_or(NormalizationError::MissingField { field: "nmID" })?;

    // nmUUID wins over the seller's own vendor code when both are present.
    let internal_id = raw
        .nm_uuid
        .as_ref()
        .and_then(Loose::as_text)
        .filter(|v| !v.is_empty())
        .or_else(|| raw.vendor_code.as_ref().and_then(Loose::as_text));

    let photo = raw
        .photos
        .as_deref()
        .and_then(<[RawPhoto]>::first)
        .and_then(|photo| photo.big.as_ref())
        .and_then(Loose::as_text);

    let first_size = raw.sizes.as_deref().and_then(<[RawSize]>::first);
    let barcode = first_size
        .and_then(|size| size.skus.as_deref())
        .map(|skus| {
            skus.iter()
                .filter_map(Loose::as_text)
                .collect::<Vec<_>>()
                .join(", ")
        })
        .filter(|joined| !joined.is_empty());

    Ok(CardRecord {
        owner_id,
        articule,
        name: raw.title.as_ref().and_then(Loose::as_text),
        internal_id,
        photo,
        eu_size: first_size
            .and_then(|size| size.tech_size.as_ref())
            .and_then(Loose::as_text),
        rus_size: first_size
            .and_then(|size| size.wb_size.as_ref())
            .and_then(Loose::as_text),
        chrt_id: first_size
            .and_then(|size| size.chrt_id.as_ref())
            .and_then(Loose::as_i64),
        barcode,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn maps_first_photo_and_size() {
        let card = normalize_card(
            &json!({
                "nmID": 12345678,
                "vendorCode": "DRESS-01",
                "title": "Платье летнее",
                "photos": [{"big": "https://img/1.jpg"}, {"big": "https://img/2.jpg"}],
                "sizes": [
                    {"chrtID": 111, "techSize": "42", "wbSize": "S", "skus": ["200001", "200002"]},
                    {"chrtID": 222, "techSize": "44", "wbSize": "M", "skus": ["200003"]}
                ]
            }),
            5,
        )
        .unwrap();

        assert_eq!(card.owner_id, 5);
        assert_eq!(card.articule, "12345678");
        assert_eq!(card.name.as_deref(), Some("Платье летнее"));
        assert_eq!(card.internal_id.as_deref(), Some("DRESS-01"));
        assert_eq!(card.photo.as_deref(), Some("https://img/1.jpg"));
        assert_eq!(card.eu_size.as_deref(), Some("42"));
        assert_eq!(card.rus_size.as_deref(), Some("S"));
        assert_eq!(card.chrt_id, Some(111));
        assert_eq!(card.barcode.as_deref(), Some("200001, 200002"));
    }

    #[test]
    fn uuid_overrides_vendor_code() {
        let card = normalize_card(
            &json!({"nmID": 1, "vendorCode": "V-1", "nmUUID": "0192-abcd"}),
            1,
        )
        .unwrap();
        assert_eq!(card.internal_id.as_deref(), Some("0192-abcd"));
    }

    #[test]
    fn missing_nm_id_is_rejected() {
        assert_eq!(
            normalize_card(&json!({"title": "no id"}), 1),
            Err(NormalizationError::MissingField { field: "nmID" })
        );
    }

    #[test]
    fn sparse_card_still_maps() {
        let card = normalize_card(&json!({"nmID": 7, "photos": null, "sizes": []}), 1).unwrap();
        assert_eq!(card.articule, "7");
        assert_eq!(card.photo, None);
        assert_eq!(card.barcode, None);
    }
}
