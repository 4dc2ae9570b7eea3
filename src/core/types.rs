//! Core data model (§3): Source, QueueItem, candidate sum types, ExtractionConfig,
//! SchemaMapping, UnifiedPriceRecord, RunLog.
//!
//! Candidate lists and ExtractionConfig are modeled as closed variants (tagged enums)
//! rather than "optional everything" records, per the design note in SPEC_FULL.md §9.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Health status of a Source, per the state machine in §4.16.
///
/// `Stale` intentionally carries no recency information — SPEC_FULL.md §9 resolves
/// the "STALE semantics" open question by collapsing the "recently stale" and
/// "chronically stale" branches of the original into one state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    Ok,
    Stale,
    Broken,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            HealthStatus::Ok => "OK",
            HealthStatus::Stale => "STALE",
            HealthStatus::Broken => "BROKEN",
        };
        write!(f, "{s}")
    }
}

/// Per-unified-field conversion rule attached to a [`SchemaMapping`] (§3, §4.10).
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct FieldConversion {
    /// Multiply the raw numeric value by this factor (e.g. price-per-kg → per-quintal).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiply: Option<f64>,
    /// A strftime-like pattern used to parse the raw date string before re-emitting ISO.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Raw-field → unified-field translation plus per-field conversions (§3, §4.10).
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SchemaMapping {
    /// raw field name -> unified field name
    pub schema_mapping: HashMap<String, String>,
    /// unified field name -> conversion rule
    #[serde(default)]
    pub conversions: HashMap<String, FieldConversion>,
    pub confidence: f64,
    #[serde(default)]
    pub unmapped_fields: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Unified field names that must have a mapping for a [`SchemaMapping`] to be
/// considered complete (§3). Violations are reported, not fatal.
pub const REQUIRED_UNIFIED_FIELDS: &[&str] =
    &["cropName", "mandiName", "stateName", "date", "modalPrice"];

impl SchemaMapping {
    /// Unified fields from [`REQUIRED_UNIFIED_FIELDS`] that have no raw field mapped to them.
    pub fn missing_required_fields(&self) -> Vec<&'static str> {
        let mapped: std::collections::HashSet<&str> =
            self.schema_mapping.values().map(String::as_str).collect();
        REQUIRED_UNIFIED_FIELDS
            .iter()
            .copied()
            .filter(|f| !mapped.contains(f))
            .collect()
    }
}

/// A single crawl queue entry (§3, C4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueItem {
    pub url: String,
    pub level: u8,
    pub depth: u32,
    pub parent_url: Option<String>,
}

/// A candidate JSON API endpoint observed by the network sniffer (§3, C6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiCandidate {
    pub url: String,
    pub method: String,
    pub request_headers: HashMap<String, String>,
    pub post_body: Option<String>,
    pub content_type: String,
    pub record_count: usize,
    pub relevance_score: f64,
    pub sample_data: Vec<serde_json::Value>,
}

/// A candidate HTML `<table>` found by the table detector (§3, C7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableCandidate {
    pub page_url: String,
    pub selector: String,
    pub headers: Vec<String>,
    pub row_count: usize,
    pub score: f64,
    pub sample_rows: Vec<Vec<String>>,
}

/// A candidate downloadable file anchor found by the file detector (§3, C8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileCandidate {
    pub page_url: String,
    pub file_url: String,
    pub text: String,
    pub extension: String,
    pub score: f64,
}

/// Per-page summary recorded by the discovery engine, used to build the AI context (§4.9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSummary {
    pub url: String,
    pub title: Option<String>,
    pub status: u16,
    pub link_count: usize,
}

/// Queue statistics snapshot (§4.2).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueStats {
    pub remaining: usize,
    pub total_seen: usize,
    pub per_level_counts: HashMap<u8, usize>,
}

/// Bundled output of a discovery run (§3, C9).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscoveryResult {
    pub api_candidates: Vec<ApiCandidate>,
    pub table_candidates: Vec<TableCandidate>,
    pub file_candidates: Vec<FileCandidate>,
    pub pages_visited: Vec<PageSummary>,
    pub queue_stats: QueueStats,
    /// Non-fatal per-page errors accumulated during the crawl.
    pub errors: Vec<String>,
}

impl DiscoveryResult {
    pub fn has_candidates(&self) -> bool {
        !self.api_candidates.is_empty()
            || !self.table_candidates.is_empty()
            || !self.file_candidates.is_empty()
    }

    pub fn best_api_candidate(&self) -> Option<&ApiCandidate> {
        self.api_candidates
            .iter()
            .max_by(|a, b| a.relevance_score.total_cmp(&b.relevance_score))
    }

    pub fn best_table_candidate(&self) -> Option<&TableCandidate> {
        self.table_candidates
            .iter()
            .max_by(|a, b| a.score.total_cmp(&b.score))
    }

    pub fn best_file_candidate(&self) -> Option<&FileCandidate> {
        self.file_candidates
            .iter()
            .max_by(|a, b| a.score.total_cmp(&b.score))
    }

    /// Sort all three candidate lists by descending score, per the DiscoveryResult
    /// invariant in §3.
    pub fn sort_candidates(&mut self) {
        self.api_candidates
            .sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
        self.table_candidates
            .sort_by(|a, b| b.score.total_cmp(&a.score));
        self.file_candidates
            .sort_by(|a, b| b.score.total_cmp(&a.score));
    }

    /// Trim this result into the bounded view the discovery-mode prompt context uses
    /// (§4.9: first 20 page summaries; top 5 of each candidate list; sample rows
    /// truncated to 2).
    pub fn to_ai_context(&self) -> serde_json::Value {
        let pages: Vec<&PageSummary> = self.pages_visited.iter().take(20).collect();

        let apis: Vec<serde_json::Value> = self
            .api_candidates
            .iter()
            .take(5)
            .map(|c| {
                serde_json::json!({
                    "url": c.url,
                    "method": c.method,
                    "record_count": c.record_count,
                    "relevance_score": c.relevance_score,
                    "sample_data": c.sample_data.iter().take(2).collect::<Vec<_>>(),
                })
            })
            .collect();

        let tables: Vec<serde_json::Value> = self
            .table_candidates
            .iter()
            .take(5)
            .map(|c| {
                serde_json::json!({
                    "page_url": c.page_url,
                    "selector": c.selector,
                    "headers": c.headers,
                    "row_count": c.row_count,
                    "score": c.score,
                    "sample_rows": c.sample_rows.iter().take(2).collect::<Vec<_>>(),
                })
            })
            .collect();

        let files: Vec<serde_json::Value> = self
            .file_candidates
            .iter()
            .take(5)
            .map(|c| {
                serde_json::json!({
                    "page_url": c.page_url,
                    "file_url": c.file_url,
                    "text": c.text,
                    "extension": c.extension,
                    "score": c.score,
                })
            })
            .collect();

        serde_json::json!({
            "pages_visited": pages,
            "api_candidates": apis,
            "table_candidates": tables,
            "file_candidates": files,
            "queue_stats": self.queue_stats,
        })
    }
}

/// Pagination style for a replayable API endpoint (C13).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaginationMode {
    #[default]
    None,
    Page,
    Offset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum PostContentType {
    Json,
    FormUrlencoded,
}

/// A closed-variant extraction strategy (§3, §9 "candidate lists as sum type").
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "extraction_type", rename_all = "snake_case")]
pub enum ExtractionConfig {
    Api {
        endpoint: String,
        method: HttpMethod,
        #[serde(default)]
        params: HashMap<String, String>,
        #[serde(default)]
        headers: HashMap<String, String>,
        #[serde(default)]
        post_body: Option<String>,
        #[serde(default)]
        post_content_type: Option<PostContentType>,
        #[serde(default)]
        paginate: PaginationMode,
        confidence: f64,
        reasoning: String,
    },
    HtmlTable {
        page_url: String,
        selector: String,
        #[serde(default)]
        expected_headers: Vec<String>,
        confidence: f64,
        reasoning: String,
    },
    PdfExcel {
        file_url: String,
        file_type: String,
        confidence: f64,
        reasoning: String,
    },
}

impl ExtractionConfig {
    pub fn confidence(&self) -> f64 {
        match self {
            ExtractionConfig::Api { confidence, .. } => *confidence,
            ExtractionConfig::HtmlTable { confidence, .. } => *confidence,
            ExtractionConfig::PdfExcel { confidence, .. } => *confidence,
        }
    }

    pub fn extraction_type(&self) -> &'static str {
        match self {
            ExtractionConfig::Api { .. } => "api",
            ExtractionConfig::HtmlTable { .. } => "html_table",
            ExtractionConfig::PdfExcel { .. } => "pdf_excel",
        }
    }
}

/// A persisted portal definition (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub entry_url: String,
    pub base_url: String,
    pub name: Option<String>,
    pub region: Option<String>,
    pub extraction_config: Option<ExtractionConfig>,
    pub schema_mapping: Option<SchemaMapping>,
    pub health_status: HealthStatus,
    pub health_updated_at: Option<DateTime<Utc>>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Source {
    pub fn new(entry_url: impl Into<String>, base_url: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            entry_url: entry_url.into(),
            base_url: base_url.into(),
            name: None,
            region: None,
            extraction_config: None,
            schema_mapping: None,
            health_status: HealthStatus::Broken,
            health_updated_at: None,
            last_success_at: None,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_extraction_config(&self) -> bool {
        self.extraction_config.is_some()
    }
}

/// The canonical output record (§3). `unit` always defaults to `"quintal"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedPriceRecord {
    pub crop_id: String,
    pub crop_name: String,
    pub mandi_id: String,
    pub mandi_name: String,
    pub state_id: String,
    pub state_name: String,
    /// `YYYY-MM-DD`
    pub date: String,
    pub min_price: f64,
    pub max_price: f64,
    pub modal_price: f64,
    pub unit: String,
    pub arrival: Option<f64>,
    pub source: String,
}

impl UnifiedPriceRecord {
    /// Invariant check used by tests and by the normalizer's own assertions (§8).
    pub fn is_valid(&self) -> bool {
        if self.crop_name.is_empty()
            || self.mandi_name.is_empty()
            || self.state_name.is_empty()
            || self.date.len() != 10
        {
            return false;
        }
        if self.modal_price < 0.0 {
            return false;
        }
        if self.min_price > 0.0 && self.max_price > 0.0 && self.min_price > self.max_price {
            return false;
        }
        true
    }

    /// Ordered map matching the unified schema column order (§6), used by CSV output.
    pub fn to_ordered_map(&self) -> Vec<(&'static str, String)> {
        vec![
            ("cropId", self.crop_id.clone()),
            ("cropName", self.crop_name.clone()),
            ("mandiId", self.mandi_id.clone()),
            ("mandiName", self.mandi_name.clone()),
            ("stateId", self.state_id.clone()),
            ("stateName", self.state_name.clone()),
            ("date", self.date.clone()),
            ("minPrice", self.min_price.to_string()),
            ("maxPrice", self.max_price.to_string()),
            ("modalPrice", self.modal_price.to_string()),
            ("unit", self.unit.clone()),
            (
                "arrival",
                self.arrival.map(|a| a.to_string()).unwrap_or_default(),
            ),
            ("source", self.source.clone()),
        ]
    }

    /// Camel-cased JSON representation matching the persisted `prices` document shape
    /// (§6), with prices/arrival kept as numbers rather than stringified.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "cropId": self.crop_id,
            "cropName": self.crop_name,
            "mandiId": self.mandi_id,
            "mandiName": self.mandi_name,
            "stateId": self.state_id,
            "stateName": self.state_name,
            "date": self.date,
            "minPrice": self.min_price,
            "maxPrice": self.max_price,
            "modalPrice": self.modal_price,
            "unit": self.unit,
            "arrival": self.arrival,
            "source": self.source,
        })
    }
}

/// Per-execution telemetry record (§3, §4.16).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunLog {
    pub source_id: String,
    pub source_url: String,
    pub start_time: DateTime<Utc>,
    pub elapsed_seconds: f64,
    pub visited_urls: Vec<String>,
    pub records_extracted: usize,
    pub records_saved: usize,
    pub errors: Vec<String>,
    pub fatal: bool,
    pub success: bool,
}

impl RunLog {
    /// Camel-cased JSON shape matching the persisted `scrape_runs` document (§6).
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "sourceId": self.source_id,
            "sourceUrl": self.source_url,
            "startTime": self.start_time,
            "durationSeconds": self.elapsed_seconds,
            "visitedUrls": self.visited_urls,
            "visitedCount": self.visited_urls.len(),
            "recordsExtracted": self.records_extracted,
            "recordsSaved": self.records_saved,
            "errors": self.errors,
            "errorCount": self.errors.len(),
            "success": self.success,
        })
    }
}
