//! URL priority scoring (C3, §4.1).
//!
//! Grounded on `original_source/scraper/app/queue/scoring.py`. Tokenizes
//! `path + " " + query` lowercased and matches against the frozen tiers in order
//! L0 → L1 → L3, defaulting to L2.

use url::Url;

use crate::core::constants::{LEVEL_0_KEYWORDS, LEVEL_1_KEYWORDS, LEVEL_3_KEYWORDS};

fn searchable_text(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => format!("{} {}", parsed.path(), parsed.query().unwrap_or("")).to_lowercase(),
        Err(_) => url.to_lowercase(),
    }
}

/// Assign a priority level to `url`: 0 = critical, 1 = high probability,
/// 2 = normal internal link (default), 3 = deep crawl.
pub fn score_url(url: &str) -> u8 {
    let text = searchable_text(url);

    if LEVEL_0_KEYWORDS.iter().any(|kw| text.contains(kw)) {
        return 0;
    }
    if LEVEL_1_KEYWORDS.iter().any(|kw| text.contains(kw)) {
        return 1;
    }
    if LEVEL_3_KEYWORDS.iter().any(|kw| text.contains(kw)) {
        return 3;
    }
    2
}

/// Debug/introspection variant reporting which keyword(s) from the winning tier
/// matched (SPEC_FULL.md §11.1).
pub fn score_url_with_details(url: &str) -> (u8, Vec<String>) {
    let text = searchable_text(url);

    let l0: Vec<String> = LEVEL_0_KEYWORDS
        .iter()
        .filter(|kw| text.contains(*kw))
        .map(|s| s.to_string())
        .collect();
    if !l0.is_empty() {
        return (0, l0);
    }

    let l1: Vec<String> = LEVEL_1_KEYWORDS
        .iter()
        .filter(|kw| text.contains(*kw))
        .map(|s| s.to_string())
        .collect();
    if !l1.is_empty() {
        return (1, l1);
    }

    let l3: Vec<String> = LEVEL_3_KEYWORDS
        .iter()
        .filter(|kw| text.contains(*kw))
        .map(|s| s.to_string())
        .collect();
    if !l3.is_empty() {
        return (3, l3);
    }

    (2, Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_0_keyword_wins_over_everything() {
        assert_eq!(score_url("https://example.com/mandi-prices?archive=1"), 0);
    }

    #[test]
    fn level_1_keyword_without_level_0() {
        assert_eq!(score_url("https://example.com/daily-report"), 0); // "report" is L0
        assert_eq!(score_url("https://example.com/rates-today"), 1);
    }

    #[test]
    fn level_3_keyword_is_lowest_priority() {
        assert_eq!(score_url("https://example.com/archive/2020"), 3);
    }

    #[test]
    fn unmatched_url_defaults_to_level_2() {
        assert_eq!(score_url("https://example.com/about"), 2);
    }

    #[test]
    fn url_prioritization_scenario() {
        // SPEC_FULL.md §8 scenario 3.
        assert_eq!(score_url("https://example.com/mandi-prices"), 0);
        assert_eq!(score_url("https://example.com/about"), 2);
        assert_eq!(score_url("https://example.com/archive/2020"), 3);
    }

    #[test]
    fn details_report_matched_keywords() {
        let (level, matched) = score_url_with_details("https://example.com/mandi-prices");
        assert_eq!(level, 0);
        assert!(matched.contains(&"mandi".to_string()) || matched.contains(&"price".to_string()));
    }
}
