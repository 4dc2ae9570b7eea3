//! AI discovery mode: analyze a [`DiscoveryResult`] and pick an extraction strategy
//! (C11, §4.9).
//!
//! Grounded on `original_source/app/ai/discovery_mode.py`. The oracle is asked for a
//! flat [`RawExtractionConfig`] (mirroring the original's single Pydantic model with
//! per-type optional fields) because forcing a provider to emit one arm of a tagged
//! enum via JSON schema is unreliable across providers; `into_extraction_config`
//! narrows it into the closed [`ExtractionConfig`] variant afterward, the same
//! normalize-then-branch shape as the original's `field_validator` + the
//! `if/elif` in `extraction_config_to_source_update`.

use mongodb::bson::{doc, Document};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::ai::oracle::Oracle;
use crate::ai::prompts::{discovery_user_prompt, DISCOVERY_SYSTEM_PROMPT};
use crate::core::constants::MIN_DISCOVERY_CONFIDENCE;
use crate::core::context::RunContext;
use crate::core::types::{DiscoveryResult, ExtractionConfig, HttpMethod, PaginationMode, PostContentType};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RawExtractionConfig {
    /// `"api"`, `"html_table"`, or `"pdf_excel"` (case-insensitive, common synonyms accepted).
    pub extraction_type: String,
    pub confidence: f64,
    pub reasoning: String,

    #[serde(default)]
    pub endpoint: String,
    #[serde(default = "default_get")]
    pub method: String,
    #[serde(default)]
    pub params: HashMap<String, String>,
    #[serde(default)]
    pub headers: HashMap<String, String>,

    #[serde(default)]
    pub page_url: String,
    #[serde(default)]
    pub html_selector: String,
    #[serde(default)]
    pub table_headers: Vec<String>,

    #[serde(default)]
    pub file_url: String,
    #[serde(default)]
    pub file_type: String,
}

fn default_get() -> String {
    "GET".to_string()
}

impl RawExtractionConfig {
    /// Normalize common LLM misspellings for `extraction_type` (§4.9).
    pub fn normalized_type(&self) -> String {
        match self.extraction_type.to_ascii_lowercase().trim() {
            "table" | "html" | "htmltable" => "html_table".to_string(),
            "api" | "json" => "api".to_string(),
            "file" | "pdf" | "excel" | "pdfexcel" | "download" => "pdf_excel".to_string(),
            other => other.to_string(),
        }
    }

    /// Reject selectors that look like hallucinated HTML or are too generic to use.
    fn cleaned_selector(&self) -> String {
        let v = self.html_selector.trim();
        if v.starts_with('<') || v.eq_ignore_ascii_case("table") {
            return String::new();
        }
        v.to_string()
    }

    pub fn into_extraction_config(self) -> ExtractionConfig {
        match self.normalized_type().as_str() {
            "api" => ExtractionConfig::Api {
                endpoint: self.endpoint,
                method: if self.method.eq_ignore_ascii_case("post") {
                    HttpMethod::Post
                } else {
                    HttpMethod::Get
                },
                params: self.params,
                headers: self.headers,
                post_body: None,
                post_content_type: Some(PostContentType::Json),
                paginate: PaginationMode::None,
                confidence: self.confidence,
                reasoning: self.reasoning,
            },
            "pdf_excel" => ExtractionConfig::PdfExcel {
                file_url: self.file_url,
                file_type: self.file_type,
                confidence: self.confidence,
                reasoning: self.reasoning,
            },
            _ => ExtractionConfig::HtmlTable {
                page_url: self.page_url,
                selector: self.cleaned_selector(),
                expected_headers: self.table_headers,
                confidence: self.confidence,
                reasoning: self.reasoning,
            },
        }
    }
}

/// Analyze `discovery_result` and recommend an extraction strategy, or `None` if there
/// was nothing to analyze or the oracle's confidence fell below
/// [`MIN_DISCOVERY_CONFIDENCE`] (§4.9).
pub async fn run_discovery_ai(
    ctx: &mut RunContext,
    oracle: &Oracle,
    discovery_result: &DiscoveryResult,
) -> Option<ExtractionConfig> {
    if !discovery_result.has_candidates() {
        tracing::warn!("no candidates found during discovery — nothing for the oracle to analyze");
        return None;
    }

    let ai_context: Value = discovery_result.to_ai_context();
    let context_json = serde_json::to_string_pretty(&ai_context).unwrap_or_default();

    tracing::info!("running AI discovery analysis");

    match oracle
        .complete::<RawExtractionConfig>(DISCOVERY_SYSTEM_PROMPT, &discovery_user_prompt(&context_json))
        .await
    {
        Ok(raw) => {
            tracing::info!(
                extraction_type = %raw.normalized_type(),
                confidence = raw.confidence,
                reasoning = %raw.reasoning,
                "oracle recommendation"
            );
            if raw.confidence < MIN_DISCOVERY_CONFIDENCE {
                tracing::warn!(
                    confidence = raw.confidence,
                    threshold = MIN_DISCOVERY_CONFIDENCE,
                    "oracle confidence below threshold — rejecting"
                );
                return None;
            }
            Some(raw.into_extraction_config())
        }
        Err(e) => {
            ctx.add_error(ctx.source_url.clone(), format!("AI discovery error: {e}"), false);
            None
        }
    }
}

/// Flatten an [`ExtractionConfig`] into the `sources` document fields the original's
/// `extraction_config_to_source_update` writes (§6): `extractionType` plus whichever
/// per-type fields apply, `aiConfidence`, `aiReasoning`.
pub fn extraction_config_to_source_update(config: &ExtractionConfig) -> Document {
    let mut update = doc! {
        "extractionType": config.extraction_type(),
        "aiConfidence": config.confidence(),
    };
    match config {
        ExtractionConfig::Api { endpoint, method, params, headers, post_body, post_content_type, paginate, reasoning, .. } => {
            update.insert("endpoint", endpoint.clone());
            update.insert("endpointMethod", serde_json::to_value(method).ok().and_then(|v| v.as_str().map(str::to_string)).unwrap_or_default());
            update.insert("endpointParams", mongodb::bson::to_bson(params).unwrap_or_default());
            update.insert("endpointHeaders", mongodb::bson::to_bson(headers).unwrap_or_default());
            if let Some(body) = post_body {
                update.insert("endpointPostData", body.clone());
            }
            if let Some(ct) = post_content_type {
                update.insert(
                    "postContentType",
                    serde_json::to_value(ct).ok().and_then(|v| v.as_str().map(str::to_string)).unwrap_or_default(),
                );
            }
            update.insert(
                "paginate",
                serde_json::to_value(paginate).ok().and_then(|v| v.as_str().map(str::to_string)).unwrap_or_default(),
            );
            update.insert("aiReasoning", reasoning.clone());
        }
        ExtractionConfig::HtmlTable { page_url, selector, expected_headers, reasoning, .. } => {
            update.insert("htmlPageUrl", page_url.clone());
            update.insert("htmlSelector", selector.clone());
            update.insert("htmlTableHeaders", expected_headers.clone());
            update.insert("aiReasoning", reasoning.clone());
        }
        ExtractionConfig::PdfExcel { file_url, file_type, reasoning, .. } => {
            update.insert("fileUrl", file_url.clone());
            update.insert("fileType", file_type.clone());
            update.insert("aiReasoning", reasoning.clone());
        }
    }
    update
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_common_type_synonyms() {
        let mut raw = sample_raw();
        raw.extraction_type = "HTML".to_string();
        assert_eq!(raw.normalized_type(), "html_table");
        raw.extraction_type = "Download".to_string();
        assert_eq!(raw.normalized_type(), "pdf_excel");
    }

    #[test]
    fn rejects_hallucinated_html_selector() {
        let mut raw = sample_raw();
        raw.extraction_type = "table".to_string();
        raw.html_selector = "<table>".to_string();
        let cfg = raw.into_extraction_config();
        match cfg {
            ExtractionConfig::HtmlTable { selector, .. } => assert_eq!(selector, ""),
            _ => panic!("expected HtmlTable"),
        }
    }

    #[test]
    fn rejects_overly_generic_selector() {
        let mut raw = sample_raw();
        raw.extraction_type = "table".to_string();
        raw.html_selector = "TABLE".to_string();
        let cfg = raw.into_extraction_config();
        match cfg {
            ExtractionConfig::HtmlTable { selector, .. } => assert_eq!(selector, ""),
            _ => panic!("expected HtmlTable"),
        }
    }

    #[test]
    fn flattens_api_config_into_source_update() {
        let cfg = ExtractionConfig::Api {
            endpoint: "https://example.com/api".to_string(),
            method: HttpMethod::Get,
            params: HashMap::new(),
            headers: HashMap::new(),
            post_body: None,
            post_content_type: None,
            paginate: PaginationMode::Page,
            confidence: 0.8,
            reasoning: "looks like a JSON API".to_string(),
        };
        let update = extraction_config_to_source_update(&cfg);
        assert_eq!(update.get_str("extractionType").unwrap(), "api");
        assert_eq!(update.get_str("endpointMethod").unwrap(), "GET");
        assert_eq!(update.get_str("paginate").unwrap(), "page");
    }

    fn sample_raw() -> RawExtractionConfig {
        RawExtractionConfig {
            extraction_type: "api".to_string(),
            confidence: 0.9,
            reasoning: "test".to_string(),
            endpoint: String::new(),
            method: "GET".to_string(),
            params: HashMap::new(),
            headers: HashMap::new(),
            page_url: String::new(),
            html_selector: String::new(),
            table_headers: Vec::new(),
            file_url: String::new(),
            file_type: String::new(),
        }
    }
}
