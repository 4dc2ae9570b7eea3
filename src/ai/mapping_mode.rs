//! AI mapping mode: map raw extracted field names onto the unified schema (C12, §4.10).
//!
//! Grounded on `original_source/app/ai/mapping_mode.py`. Reuses [`SchemaMapping`] /
//! [`FieldConversion`] from `core::types` directly as the oracle's structured-output
//! target, since (unlike discovery mode's tagged-enum problem) the mapping shape is
//! already flat and matches the original's Pydantic model field-for-field.

use mongodb::bson::{doc, Document};

use crate::ai::oracle::Oracle;
use crate::ai::prompts::{mapping_user_prompt, MAPPING_SYSTEM_PROMPT};
use crate::core::context::RunContext;
use crate::core::types::SchemaMapping;

/// Ask the oracle to map `raw_fields` (seen in `sample_data`) onto the unified schema.
/// Returns `None` if there were no fields to map or the oracle call failed.
pub async fn run_mapping_ai(
    ctx: &mut RunContext,
    oracle: &Oracle,
    raw_fields: &[String],
    sample_data: &[serde_json::Value],
    source_url: &str,
    extraction_type: &str,
) -> Option<SchemaMapping> {
    if raw_fields.is_empty() {
        tracing::warn!("no raw fields provided — cannot generate a schema mapping");
        return None;
    }

    tracing::info!(field_count = raw_fields.len(), "running AI schema mapping");

    let raw_fields_json = serde_json::to_string(raw_fields).unwrap_or_default();
    let sample_json = serde_json::to_string_pretty(&sample_data.iter().take(3).collect::<Vec<_>>())
        .unwrap_or_default();

    match oracle
        .complete::<SchemaMapping>(
            MAPPING_SYSTEM_PROMPT,
            &mapping_user_prompt(&raw_fields_json, &sample_json, source_url, extraction_type),
        )
        .await
    {
        Ok(mapping) => {
            tracing::info!(
                mapped = mapping.schema_mapping.len(),
                unmapped = mapping.unmapped_fields.len(),
                confidence = mapping.confidence,
                "oracle mapping result"
            );
            Some(mapping)
        }
        Err(e) => {
            ctx.add_error(source_url.to_string(), format!("AI mapping error: {e}"), false);
            None
        }
    }
}

/// Flatten a [`SchemaMapping`] into the `sources` document fields the original's
/// `schema_mapping_to_source_update` writes (§6).
pub fn schema_mapping_to_source_update(mapping: &SchemaMapping) -> Document {
    doc! {
        "schemaMapping": mongodb::bson::to_bson(&mapping.schema_mapping).unwrap_or_default(),
        "conversions": mongodb::bson::to_bson(&mapping.conversions).unwrap_or_default(),
        "mappingConfidence": mapping.confidence,
        "unmappedFields": mapping.unmapped_fields.clone(),
        "mappingNotes": mapping.notes.clone().unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn flattens_schema_mapping_into_source_update() {
        let mut schema_mapping = HashMap::new();
        schema_mapping.insert("Commodity".to_string(), "cropName".to_string());
        let mapping = SchemaMapping {
            schema_mapping,
            conversions: HashMap::new(),
            confidence: 0.75,
            unmapped_fields: vec!["Notes".to_string()],
            notes: Some("straightforward mapping".to_string()),
        };
        let update = schema_mapping_to_source_update(&mapping);
        assert_eq!(update.get_f64("mappingConfidence").unwrap(), 0.75);
        assert_eq!(update.get_array("unmappedFields").unwrap().len(), 1);
    }
}
