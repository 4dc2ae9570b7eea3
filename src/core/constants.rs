//! Frozen keyword sets, thresholds, and schema constants shared across the pipeline.
//!
//! Grounded on `original_source/scraper/app/core/constants.py`; values are carried
//! over verbatim since they are load-bearing for the scoring/detector invariants
//! in SPEC_FULL.md §4 and the testable properties in §8.

pub const LEVEL_0_KEYWORDS: &[&str] = &[
    "api",
    "mandi",
    "price",
    "rate",
    "report",
    "commodity",
    "market",
    "apmc",
    "agmarknet",
    "arrivals",
];

pub const LEVEL_1_KEYWORDS: &[&str] = &[
    "market-watch",
    "daily",
    "bulletin",
    "rates-today",
    "today",
    "current",
    "latest",
    "live",
    "wholesale",
    "retail",
];

pub const LEVEL_3_KEYWORDS: &[&str] = &[
    "archive",
    "download",
    "old",
    "history",
    "previous",
    "past",
    "annual",
    "yearly",
];

/// Content-types the network sniffer (C6) treats as JSON API responses.
pub const JSON_CONTENT_TYPES: &[&str] = &["application/json", "text/json"];

/// Minimum record count for the sniffer to retain a response regardless of score.
pub const MIN_API_RECORDS: usize = 3;

/// File extensions the file detector (C8) looks for on anchor hrefs.
pub const DOWNLOADABLE_EXTENSIONS: &[&str] = &[".pdf", ".xlsx", ".xls", ".csv"];

/// Minimum oracle confidence to accept a Discovery-mode result (§4.9).
pub const MIN_DISCOVERY_CONFIDENCE: f64 = 0.6;

/// Maximum internal-link crawl depth from the entry URL.
pub const MAX_CRAWL_DEPTH: u32 = 3;

/// Extraction types in the priority order the oracle must prefer (§4.9).
pub const EXTRACTION_PRIORITY: &[&str] = &["api", "html_table", "pdf_excel"];

/// Exact column order of the unified price schema (§6).
pub const UNIFIED_PRICE_FIELDS: &[&str] = &[
    "cropId",
    "cropName",
    "mandiId",
    "mandiName",
    "stateId",
    "stateName",
    "date",
    "minPrice",
    "maxPrice",
    "modalPrice",
    "unit",
    "arrival",
    "source",
];

pub const DEFAULT_PRICE_UNIT: &str = "quintal";

/// Date formats (chrono strftime syntax) tried in order during parsing, before
/// falling back to ISO 8601 (§6).
pub const INDIAN_DATE_FORMATS: &[&str] = &[
    "%d-%m-%Y",
    "%d/%m/%Y",
    "%d-%b-%Y",
    "%d %b %Y",
    "%Y-%m-%d",
    "%d.%m.%Y",
    "%d-%m-%y",
    "%d/%m/%y",
];

/// Hours after which a source with no new data is considered stale (informational;
/// SPEC_FULL.md resolves the STALE state itself to not depend on recency — see
/// DESIGN.md's Open Question decisions).
pub const STALE_THRESHOLD_HOURS: i64 = 48;

/// Default resource caps, all overridable via environment (§6).
pub const DEFAULT_MAX_PAGES_PER_SOURCE: usize = 50;
pub const DEFAULT_DISCOVERY_TIMEOUT_SECONDS: u64 = 120;
pub const DEFAULT_REQUEST_DELAY_MS: u64 = 500;
pub const DEFAULT_MAX_PAGES_API: usize = 10;

/// Header/entity keyword sets for the table detector (C7).
pub const TABLE_HEADER_KEYWORDS: &[&str] = &[
    "price", "rate", "modal", "min", "max", "commodity", "crop", "variety", "mandi", "market",
    "apmc", "state", "district", "arrival", "quantity", "date", "unit",
];

/// Subset of `TABLE_HEADER_KEYWORDS` treated as "price" keywords for the
/// combined price+entity bonus in §4.5.
pub const TABLE_PRICE_KEYWORDS: &[&str] = &["price", "rate", "modal", "min", "max"];

/// Subset of `TABLE_HEADER_KEYWORDS` treated as "entity" keywords for the
/// combined price+entity bonus in §4.5.
pub const TABLE_ENTITY_KEYWORDS: &[&str] = &[
    "commodity", "crop", "variety", "mandi", "market", "apmc", "state", "district",
];

/// JSON body field names the sniffer (C6) searches for relevance scoring.
pub const SNIFFER_PRICE_FIELD_KEYWORDS: &[&str] = &[
    "price", "rate", "modal", "min", "max", "commodity", "mandi", "market", "arrival",
];

/// File-detector (C8) keyword bonus and recency terms (§4.6).
pub const FILE_RECENCY_KEYWORDS: &[&str] = &["daily", "today", "current", "latest"];
