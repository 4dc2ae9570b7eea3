//! Mutable per-run context threaded through a single scrape/discover invocation.
//!
//! Grounded on `original_source/scraper/app/core/context.py`: instead of a logger
//! handle, errors are recorded onto `self` and also emitted via `tracing` at the
//! point of `add_error` (§10.1), matching the original's dual behavior of both
//! appending to `self.errors` and calling `self.logger`.

use std::time::Instant;

use chrono::{DateTime, Utc};

use crate::core::types::RunLog;

#[derive(Debug, Clone)]
pub struct RunError {
    pub url: String,
    pub error: String,
    pub fatal: bool,
    pub timestamp: DateTime<Utc>,
}

/// Per-run mutable state: visited URLs, accumulated errors, extraction counts.
#[derive(Debug)]
pub struct RunContext {
    pub source_id: String,
    pub source_url: String,
    start_time: Instant,
    started_at: DateTime<Utc>,
    pub visited_urls: Vec<String>,
    pub errors: Vec<RunError>,
    pub records_extracted: usize,
    pub records_saved: usize,
}

impl RunContext {
    pub fn new(source_id: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            source_url: source_url.into(),
            start_time: Instant::now(),
            started_at: Utc::now(),
            visited_urls: Vec::new(),
            errors: Vec::new(),
            records_extracted: 0,
            records_saved: 0,
        }
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64()
    }

    /// Record a non-fatal or fatal error encountered during the run (§7).
    pub fn add_error(&mut self, url: impl Into<String>, error: impl Into<String>, fatal: bool) {
        let url = url.into();
        let error = error.into();
        if fatal {
            tracing::error!(url = %url, %error, "fatal error in run");
        } else {
            tracing::warn!(url = %url, %error, "non-fatal error in run");
        }
        self.errors.push(RunError {
            url,
            error,
            fatal,
            timestamp: Utc::now(),
        });
    }

    pub fn mark_visited(&mut self, url: impl Into<String>) {
        self.visited_urls.push(url.into());
    }

    /// Whether the run is fatal, i.e. at least one error was flagged `fatal`.
    pub fn is_fatal(&self) -> bool {
        self.errors.iter().any(|e| e.fatal)
    }

    pub fn to_run_log(&self) -> RunLog {
        RunLog {
            source_id: self.source_id.clone(),
            source_url: self.source_url.clone(),
            start_time: self.started_at,
            elapsed_seconds: self.elapsed_seconds(),
            visited_urls: self.visited_urls.clone(),
            records_extracted: self.records_extracted,
            records_saved: self.records_saved,
            errors: self
                .errors
                .iter()
                .map(|e| format!("[{}] {}{}", e.url, e.error, if e.fatal { " (fatal)" } else { "" }))
                .collect(),
            fatal: self.is_fatal(),
            success: !self.is_fatal(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_is_absence_of_fatal_errors() {
        let mut ctx = RunContext::new("src-1", "https://example.com");
        ctx.add_error("https://example.com/a", "timeout", false);
        let log = ctx.to_run_log();
        assert!(log.success);
        assert!(!log.fatal);
        assert_eq!(log.errors.len(), 1);
    }

    #[test]
    fn fatal_error_marks_run_unsuccessful() {
        let mut ctx = RunContext::new("src-1", "https://example.com");
        ctx.add_error("https://example.com", "browser launch failed", true);
        let log = ctx.to_run_log();
        assert!(!log.success);
        assert!(log.fatal);
    }
}
