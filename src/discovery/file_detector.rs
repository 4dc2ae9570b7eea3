//! Downloadable-file link detector (C8, §4.6).
//!
//! Grounded on `original_source/scraper/app/discovery/file_detector.py`.

use regex::Regex;
use scraper::{Html, Selector};
use std::sync::OnceLock;

use crate::core::constants::{DOWNLOADABLE_EXTENSIONS, FILE_RECENCY_KEYWORDS, LEVEL_0_KEYWORDS};
use crate::core::types::FileCandidate;
use crate::url_utils;

fn date_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d{2}[-/.]\d{2}[-/.]\d{4}").unwrap())
}

/// Find downloadable file anchors on `html`, dedup by absolute URL, sorted by
/// descending score (§4.6).
pub fn detect_files(html: &str, base_url: &str, page_url: &str) -> Vec<FileCandidate> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut seen = std::collections::HashSet::new();
    let mut candidates = Vec::new();

    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let href = href.trim();
        if href.is_empty() {
            continue;
        }

        let Some(absolute) = url_utils::resolve_url(href, base_url) else {
            continue;
        };

        let Some(extension) = matched_extension(&absolute) else {
            continue;
        };

        if !seen.insert(absolute.clone()) {
            continue;
        }

        let text: String = element.text().collect::<String>().trim().chars().take(200).collect();
        let score = score_file(&absolute, &text, extension);

        candidates.push(FileCandidate {
            page_url: page_url.to_string(),
            file_url: absolute,
            text,
            extension: extension.to_string(),
            score,
        });
    }

    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
    candidates
}

fn matched_extension(url: &str) -> Option<&'static str> {
    let lower = url.to_ascii_lowercase();
    DOWNLOADABLE_EXTENSIONS
        .iter()
        .find(|ext| lower.ends_with(**ext) || lower.contains(**ext))
        .copied()
}

/// Score a file link 0.0-1.0 from keyword matches, date-like patterns, and extension
/// preference (Excel > PDF > CSV for structured data), per §4.6.
fn score_file(url: &str, text: &str, extension: &str) -> f64 {
    let combined = format!("{url} {text}").to_lowercase();
    let mut score = 0.0;

    for keyword in LEVEL_0_KEYWORDS {
        if combined.contains(keyword) {
            score += 0.15;
        }
    }

    if date_pattern().is_match(&combined) {
        score += 0.1;
    }
    if FILE_RECENCY_KEYWORDS.iter().any(|kw| combined.contains(kw)) {
        score += 0.1;
    }

    score += match extension {
        ".xlsx" | ".xls" => 0.15,
        ".csv" => 0.1,
        ".pdf" => 0.05,
        _ => 0.0,
    };

    score.min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_and_dedups_downloadable_links() {
        let html = r#"
            <a href="/reports/daily-mandi-prices-01-02-2024.xlsx">Today's Rates</a>
            <a href="/reports/daily-mandi-prices-01-02-2024.xlsx">Duplicate</a>
            <a href="/about">About</a>
            <a href="/archive/old-report.pdf">Old Report</a>
        "#;
        let candidates = detect_files(html, "https://example.com", "https://example.com/reports");
        assert_eq!(candidates.len(), 2);
        assert!(candidates[0].score > candidates[1].score);
        assert_eq!(candidates[0].extension, ".xlsx");
    }

    #[test]
    fn excel_scores_higher_than_pdf_for_identical_text() {
        let xlsx = score_file("https://example.com/data.xlsx", "Mandi rates", ".xlsx");
        let pdf = score_file("https://example.com/data.pdf", "Mandi rates", ".pdf");
        assert!(xlsx > pdf);
    }

    #[test]
    fn non_downloadable_links_are_ignored() {
        let html = r#"<a href="/about">About</a><a href="/contact.html">Contact</a>"#;
        assert!(detect_files(html, "https://example.com", "https://example.com").is_empty());
    }
}
