//! Library-internal error taxonomy (§7).
//!
//! Modules that can fail in ways the runner must record onto a [`crate::core::context::RunContext`]
//! return `Result<_, AgentError>`. The binary entry point and orchestration glue instead use
//! `anyhow::Result`, attaching context at call sites, per the two-tier split described in
//! SPEC_FULL.md §10.2.

use thiserror::Error;

/// Error taxonomy aligned with SPEC_FULL.md §7's error classes.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Browser navigation failure: timeout, non-2xx, DNS/network. Non-fatal — recorded
    /// per URL, discovery continues.
    #[error("navigation failed for {url}: {message}")]
    Navigation { url: String, message: String },

    /// Replay HTTP failure that is not a 403/429 retry case — pagination/scrape stops.
    #[error("replay request failed: {0}")]
    Replay(String),

    /// HTML/file parse failure: no matching table, selector mismatch, decode failure.
    #[error("parse failed: {0}")]
    Parse(String),

    /// The oracle (LM) failed to produce a valid structured response.
    #[error("oracle call failed: {0}")]
    Oracle(String),

    /// `scrape` invoked on a source with no `extraction_type` set.
    #[error("source {0} has no extraction config")]
    ConfigMissing(String),

    /// Unrecoverable error for the current source (browser launch failure, DB connect
    /// failure): aborts that source with a fatal run-log entry.
    #[error("fatal: {0}")]
    Fatal(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serde(#[from] serde_json::Error),

    #[error(transparent)]
    Url(#[from] url::ParseError),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Mongo(#[from] mongodb::error::Error),

    #[error(transparent)]
    Bson(#[from] mongodb::bson::ser::Error),
}

impl AgentError {
    /// Whether this error class should abort the current source entirely (§7 "Fatal").
    pub fn is_fatal(&self) -> bool {
        matches!(self, AgentError::Fatal(_) | AgentError::ConfigMissing(_))
    }
}
