//! Source health state machine (§4.16).
//!
//! Grounded on `original_source/scraper/app/monitoring/health.py`'s `update_health`.
//! Modeled here as a pure function over already-queried facts rather than a function
//! that reaches into a repo itself, so it has no dependency on `io::runs_repo`/
//! `io::sources_repo` and is trivial to unit test. `runner.rs` gathers the facts
//! (recent failure count, whether any success exists) via the `io` traits and calls
//! [`evaluate_health`].
//!
//! The original has two separate STALE-producing branches (`is_recent` true or false)
//! that both set the same status string — this collapses them into one `Stale`
//! variant with no recency payload, per the Open Question decision in DESIGN.md.

use crate::core::types::HealthStatus;

/// Facts gathered from the run log needed to evaluate a source's health after a run.
pub struct HealthInputs {
    pub success: bool,
    pub records_saved: usize,
    /// Number of failed runs among the most recent 5 (§4.16: `last_n=5`).
    pub recent_failure_count: usize,
    pub has_prior_success: bool,
}

pub struct HealthOutcome {
    pub status: HealthStatus,
    pub message: Option<String>,
}

/// Decide the new health status for a source after a run, mirroring `update_health`'s
/// branch order: a successful run with saved records is always OK; otherwise 3+
/// failures in the last 5 runs is BROKEN; otherwise STALE if a prior success exists,
/// else BROKEN.
pub fn evaluate_health(inputs: &HealthInputs) -> HealthOutcome {
    if inputs.success && inputs.records_saved > 0 {
        return HealthOutcome { status: HealthStatus::Ok, message: None };
    }

    if inputs.recent_failure_count >= 3 {
        return HealthOutcome {
            status: HealthStatus::Broken,
            message: Some(format!("{} consecutive failures in last 5 runs", inputs.recent_failure_count)),
        };
    }

    if inputs.has_prior_success {
        HealthOutcome {
            status: HealthStatus::Stale,
            message: Some("last scrape failed but previous successes exist".to_string()),
        }
    } else {
        HealthOutcome { status: HealthStatus::Broken, message: Some("no successful scrapes recorded".to_string()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn successful_run_with_records_is_ok() {
        let out = evaluate_health(&HealthInputs {
            success: true,
            records_saved: 42,
            recent_failure_count: 0,
            has_prior_success: true,
        });
        assert!(matches!(out.status, HealthStatus::Ok));
    }

    #[test]
    fn three_recent_failures_is_broken() {
        let out = evaluate_health(&HealthInputs {
            success: false,
            records_saved: 0,
            recent_failure_count: 3,
            has_prior_success: true,
        });
        assert!(matches!(out.status, HealthStatus::Broken));
    }

    #[test]
    fn failure_with_prior_success_is_stale() {
        let out = evaluate_health(&HealthInputs {
            success: false,
            records_saved: 0,
            recent_failure_count: 1,
            has_prior_success: true,
        });
        assert!(matches!(out.status, HealthStatus::Stale));
    }

    #[test]
    fn failure_with_no_prior_success_is_broken() {
        let out = evaluate_health(&HealthInputs {
            success: false,
            records_saved: 0,
            recent_failure_count: 0,
            has_prior_success: false,
        });
        assert!(matches!(out.status, HealthStatus::Broken));
    }

    #[test]
    fn success_with_zero_records_falls_through_to_failure_branches() {
        let out = evaluate_health(&HealthInputs {
            success: true,
            records_saved: 0,
            recent_failure_count: 0,
            has_prior_success: true,
        });
        assert!(matches!(out.status, HealthStatus::Stale));
    }
}
