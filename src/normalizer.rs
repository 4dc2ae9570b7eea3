//! Raw record -> [`UnifiedPriceRecord`] normalization pipeline (C16, §4.14).
//!
//! Grounded on `original_source/scraper/app/scraping/normalizer.py`'s seven-step
//! algorithm: apply the schema mapping field-by-field, apply per-field conversions
//! (multiply, date reformat), coerce price/arrival fields to floats, fill defaults,
//! derive ids for fields the source doesn't supply natively, and finally drop any
//! record missing a crop name or modal price.

use crate::core::constants::DEFAULT_PRICE_UNIT;
use crate::core::types::{FieldConversion, SchemaMapping, UnifiedPriceRecord};
use crate::date_utils;

/// Normalize `raw_records` against `mapping`, returning only records with both a
/// crop name and a modal price (§4.14 edge case: "missing `cropName`/`modalPrice`
/// rows are dropped, not defaulted").
pub fn normalize_records(
    raw_records: &[serde_json::Value],
    mapping: &SchemaMapping,
    source_id: &str,
    source_name: &str,
) -> Vec<UnifiedPriceRecord> {
    raw_records
        .iter()
        .filter_map(|raw| normalize_one(raw, mapping, source_id, source_name))
        .collect()
}

fn normalize_one(
    raw: &serde_json::Value,
    mapping: &SchemaMapping,
    source_id: &str,
    source_name: &str,
) -> Option<UnifiedPriceRecord> {
    let raw_obj = raw.as_object()?;

    // Step 1: apply the schema mapping field-by-field (raw field -> unified field).
    let mut fields: std::collections::HashMap<String, serde_json::Value> = std::collections::HashMap::new();
    for (raw_field, unified_field) in &mapping.schema_mapping {
        if let Some(value) = raw_obj.get(raw_field) {
            fields.insert(unified_field.clone(), value.clone());
        }
    }

    // Step 2: apply per-unified-field conversions (multiply / date_format).
    for (unified_field, conversion) in &mapping.conversions {
        apply_conversion(&mut fields, unified_field, conversion);
    }

    // Step 3: normalize the date field defensively, twice, as the original does
    // (parse may succeed on the first pass but need a second round-trip through
    // to_iso_string once a date_format conversion has already run).
    normalize_date_field(&mut fields);
    normalize_date_field(&mut fields);

    // Step 4: coerce minPrice/maxPrice/modalPrice to floats, stripping thousands commas.
    let min_price = coerce_price(fields.get("minPrice"));
    let max_price = coerce_price(fields.get("maxPrice"));
    let modal_price = coerce_price(fields.get("modalPrice"));

    // Step 5: arrival is float-or-None.
    let arrival = coerce_price(fields.get("arrival"));

    let crop_name = string_field(&fields, "cropName");
    let modal_price = modal_price?;
    // The original's gate is a Python truthiness check on modalPrice, so a coerced
    // 0.0 (numeric 0 or the string "0") is treated the same as missing.
    if crop_name.is_empty() || modal_price == 0.0 {
        return None;
    }

    // Step 6: defaults.
    let unit = string_field_or(&fields, "unit", DEFAULT_PRICE_UNIT);
    let source = if source_name.is_empty() { "other".to_string() } else { source_name.to_string() };

    let mandi_name = string_field(&fields, "mandiName");
    let state_name = string_field(&fields, "stateName");
    let date = string_field(&fields, "date");

    // Step 7: derive ids for any of crop/mandi/state that the schema mapping didn't
    // already supply a matching *Id field for.
    let crop_id = string_field_or_derive(&fields, "cropId", &crop_name);
    let mandi_id = string_field_or_derive(&fields, "mandiId", &mandi_name);
    let state_id = string_field_or_derive(&fields, "stateId", &state_name);

    let _ = source_id; // no sourceId column on UnifiedPriceRecord; callers key persisted rows by source separately.

    Some(UnifiedPriceRecord {
        crop_id,
        crop_name,
        mandi_id,
        mandi_name,
        state_id,
        state_name,
        date,
        min_price: min_price.unwrap_or(0.0),
        max_price: max_price.unwrap_or(0.0),
        modal_price,
        unit,
        arrival,
        source,
    })
}

fn apply_conversion(
    fields: &mut std::collections::HashMap<String, serde_json::Value>,
    unified_field: &str,
    conversion: &FieldConversion,
) {
    if let Some(multiply) = conversion.multiply {
        if let Some(value) = fields.get(unified_field) {
            if let Some(n) = value_to_f64(value) {
                fields.insert(unified_field.to_string(), serde_json::json!(n * multiply));
            }
        }
    }
    if let Some(fmt) = &conversion.date_format {
        if let Some(serde_json::Value::String(raw)) = fields.get(unified_field) {
            if let Some(date) = parse_with_format(raw, fmt) {
                fields.insert(unified_field.to_string(), serde_json::json!(date_utils::to_iso_string(Some(date))));
            }
        }
    }
}

fn parse_with_format(raw: &str, fmt: &str) -> Option<chrono::NaiveDate> {
    chrono::NaiveDate::parse_from_str(raw.trim(), fmt).ok()
}

fn normalize_date_field(fields: &mut std::collections::HashMap<String, serde_json::Value>) {
    let Some(serde_json::Value::String(raw)) = fields.get("date") else { return };
    if let Some(date) = date_utils::parse_date(raw) {
        fields.insert("date".to_string(), serde_json::json!(date_utils::to_iso_string(Some(date))));
    }
}

fn coerce_price(value: Option<&serde_json::Value>) -> Option<f64> {
    match value? {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => {
            let cleaned: String = s.chars().filter(|c| *c != ',').collect();
            cleaned.trim().parse::<f64>().ok()
        }
        _ => None,
    }
}

fn value_to_f64(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn string_field(fields: &std::collections::HashMap<String, serde_json::Value>, key: &str) -> String {
    fields.get(key).and_then(|v| v.as_str()).unwrap_or_default().trim().to_string()
}

fn string_field_or(
    fields: &std::collections::HashMap<String, serde_json::Value>,
    key: &str,
    default: &str,
) -> String {
    let v = string_field(fields, key);
    if v.is_empty() { default.to_string() } else { v }
}

fn string_field_or_derive(
    fields: &std::collections::HashMap<String, serde_json::Value>,
    key: &str,
    name: &str,
) -> String {
    let v = string_field(fields, key);
    if !v.is_empty() {
        return v;
    }
    name_to_id(name)
}

/// Mirrors `_name_to_id` in the original: lowercase, strip, spaces -> hyphens, drop commas.
fn name_to_id(name: &str) -> String {
    name.trim().to_ascii_lowercase().replace(',', "").replace(' ', "-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn mapping(schema: &[(&str, &str)]) -> SchemaMapping {
        SchemaMapping {
            schema_mapping: schema.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            conversions: HashMap::new(),
            confidence: 0.9,
            unmapped_fields: Vec::new(),
            notes: None,
        }
    }

    #[test]
    fn maps_and_derives_ids() {
        let raw = serde_json::json!([{
            "Commodity": "Onion",
            "Market": "Lasalgaon",
            "State": "Maharashtra",
            "Modal Price": "1,200",
            "Arrival Date": "2026-01-15",
        }]);
        let m = mapping(&[
            ("Commodity", "cropName"),
            ("Market", "mandiName"),
            ("State", "stateName"),
            ("Modal Price", "modalPrice"),
            ("Arrival Date", "date"),
        ]);
        let records = normalize_records(raw.as_array().unwrap(), &m, "src-1", "agmarknet");
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.crop_id, "onion");
        assert_eq!(r.mandi_id, "lasalgaon");
        assert_eq!(r.modal_price, 1200.0);
        assert_eq!(r.unit, "quintal");
        assert_eq!(r.source, "agmarknet");
    }

    #[test]
    fn drops_records_missing_crop_name_or_modal_price() {
        let raw = serde_json::json!([
            {"Commodity": "", "Modal Price": "100"},
            {"Commodity": "Potato", "Modal Price": ""},
            {"Commodity": "Wheat", "Modal Price": "200"},
        ]);
        let m = mapping(&[("Commodity", "cropName"), ("Modal Price", "modalPrice")]);
        let records = normalize_records(raw.as_array().unwrap(), &m, "src-1", "other");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].crop_name, "Wheat");
    }

    #[test]
    fn drops_records_with_zero_modal_price() {
        let raw = serde_json::json!([
            {"Commodity": "Onion", "Modal Price": "0"},
            {"Commodity": "Potato", "Modal Price": 0},
            {"Commodity": "Wheat", "Modal Price": "200"},
        ]);
        let m = mapping(&[("Commodity", "cropName"), ("Modal Price", "modalPrice")]);
        let records = normalize_records(raw.as_array().unwrap(), &m, "src-1", "other");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].crop_name, "Wheat");
    }

    #[test]
    fn applies_multiply_conversion() {
        let raw = serde_json::json!([{"price_per_kg": "10", "crop": "Onion"}]);
        let mut m = mapping(&[("price_per_kg", "modalPrice"), ("crop", "cropName")]);
        m.conversions.insert("modalPrice".to_string(), FieldConversion { multiply: Some(100.0), date_format: None, comment: None });
        let records = normalize_records(raw.as_array().unwrap(), &m, "src-1", "other");
        assert_eq!(records[0].modal_price, 1000.0);
    }

    #[test]
    fn defaults_source_to_other_when_name_empty() {
        let raw = serde_json::json!([{"crop": "Onion", "price": "10"}]);
        let m = mapping(&[("crop", "cropName"), ("price", "modalPrice")]);
        let records = normalize_records(raw.as_array().unwrap(), &m, "src-1", "");
        assert_eq!(records[0].source, "other");
    }
}
