//! HTML `<table>` detector and scorer (C7, §4.5).
//!
//! Grounded on `original_source/scraper/app/discovery/table_detector.py`. The original
//! walks the live DOM via a Playwright `page.evaluate` script; here the page's captured
//! HTML snapshot is parsed with `scraper` instead, since C5 already hands discovery the
//! full document for a navigated page.

use scraper::{ElementRef, Html, Selector};

use crate::core::constants::{TABLE_ENTITY_KEYWORDS, TABLE_HEADER_KEYWORDS, TABLE_PRICE_KEYWORDS};
use crate::core::types::TableCandidate;

/// Find and score every `<table>` on `html`, skipping tables too small to plausibly
/// hold price data (`< 2` rows or `< 3` columns), per §4.5.
pub fn detect_tables(html: &str, page_url: &str) -> Vec<TableCandidate> {
    let document = Html::parse_document(html);
    let Ok(table_selector) = Selector::parse("table") else {
        return Vec::new();
    };

    let mut candidates = Vec::new();

    for (idx, table) in document.select(&table_selector).enumerate() {
        let headers = extract_headers(&table);
        let rows = extract_rows(&table);
        let row_count = rows.len();

        if row_count < 2 || headers.len() < 3 {
            continue;
        }

        let score = score_table(&headers, row_count);
        let selector = table_selector_for(&table, idx);

        candidates.push(TableCandidate {
            page_url: page_url.to_string(),
            selector,
            headers,
            row_count,
            score,
            sample_rows: rows.into_iter().take(3).collect(),
        });
    }

    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
    candidates
}

fn extract_headers(table: &ElementRef) -> Vec<String> {
    let Ok(header_sel) = Selector::parse("thead th, thead td") else {
        return Vec::new();
    };
    let mut headers: Vec<String> = table
        .select(&header_sel)
        .map(|cell| cell.text().collect::<String>().trim().to_string())
        .collect();

    if headers.is_empty() {
        if let Ok(first_row_sel) = Selector::parse("tr:first-child th, tr:first-child td") {
            headers = table
                .select(&first_row_sel)
                .map(|cell| cell.text().collect::<String>().trim().to_string())
                .collect();
        }
    }

    headers
}

fn extract_rows(table: &ElementRef) -> Vec<Vec<String>> {
    let Ok(row_sel) = Selector::parse("tbody tr, tr") else {
        return Vec::new();
    };
    let Ok(cell_sel) = Selector::parse("td, th") else {
        return Vec::new();
    };

    table
        .select(&row_sel)
        .map(|row| {
            row.select(&cell_sel)
                .map(|cell| {
                    let text: String = cell.text().collect();
                    text.trim().chars().take(100).collect()
                })
                .collect::<Vec<String>>()
        })
        .collect()
}

fn table_selector_for(table: &ElementRef, idx: usize) -> String {
    if let Some(id) = table.value().attr("id") {
        return format!("table#{id}");
    }
    if let Some(class) = table.value().attr("class") {
        if let Some(first) = class.split_whitespace().next() {
            return format!("table.{first}");
        }
    }
    format!("table:nth-of-type({})", idx + 1)
}

/// Score a table 0.0-1.0 from its header keywords, row count, and column count (§4.5).
fn score_table(headers: &[String], row_count: usize) -> f64 {
    let mut score = 0.0;

    let matched = headers
        .iter()
        .filter(|h| {
            let lower = h.to_lowercase();
            TABLE_HEADER_KEYWORDS.iter().any(|kw| lower.contains(kw))
        })
        .count();
    if !headers.is_empty() {
        score += (matched as f64 / headers.len() as f64) * 0.6;
    }

    if row_count >= 10 {
        score += 0.2;
    } else if row_count >= 5 {
        score += 0.1;
    }

    let col_count = headers.len();
    if (5..=15).contains(&col_count) {
        score += 0.1;
    } else if col_count > 15 {
        score += 0.05;
    }

    let header_text = headers.join(" ").to_lowercase();
    let has_price = TABLE_PRICE_KEYWORDS.iter().any(|k| header_text.contains(k));
    let has_entity = TABLE_ENTITY_KEYWORDS.iter().any(|k| header_text.contains(k));
    if has_price && has_entity {
        score += 0.1;
    }

    score.min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRICE_TABLE_HTML: &str = r#"
        <html><body>
        <table id="prices">
            <thead><tr><th>Commodity</th><th>Mandi</th><th>Min Price</th><th>Max Price</th><th>Modal Price</th></tr></thead>
            <tbody>
                <tr><td>Onion</td><td>Nashik</td><td>1000</td><td>1500</td><td>1200</td></tr>
                <tr><td>Potato</td><td>Pune</td><td>800</td><td>1100</td><td>950</td></tr>
                <tr><td>Tomato</td><td>Nashik</td><td>600</td><td>900</td><td>750</td></tr>
            </tbody>
        </table>
        <table>
            <tr><td>Home</td><td>About</td></tr>
        </table>
        </body></html>
    "#;

    #[test]
    fn skips_small_layout_tables() {
        let candidates = detect_tables(PRICE_TABLE_HTML, "https://example.com");
        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn scores_price_table_highly() {
        let candidates = detect_tables(PRICE_TABLE_HTML, "https://example.com");
        assert_eq!(candidates[0].selector, "table#prices");
        assert!(candidates[0].score > 0.7, "score was {}", candidates[0].score);
        assert_eq!(candidates[0].row_count, 3);
        assert_eq!(candidates[0].sample_rows.len(), 3);
    }

    #[test]
    fn fallback_selector_uses_nth_of_type_when_no_id_or_class() {
        let html = r#"
            <table><thead><tr><th>Price</th><th>Mandi</th><th>Date</th></tr></thead>
            <tbody><tr><td>1</td><td>2</td><td>3</td></tr><tr><td>4</td><td>5</td><td>6</td></tr></tbody></table>
        "#;
        let candidates = detect_tables(html, "https://example.com");
        assert_eq!(candidates[0].selector, "table:nth-of-type(1)");
    }
}
