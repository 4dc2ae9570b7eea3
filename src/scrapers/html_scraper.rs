//! HTML table replay scraper (C14, §4.12).
//!
//! Grounded on `original_source/scraper/app/scraping/html_scraper.py`. The original
//! parses with BeautifulSoup/pandas; this uses `scraper` (CSS selectors over `html5ever`)
//! directly, using the first header row as dict keys the same way `pandas.read_html`
//! does, rather than pulling in a dataframe dependency the teacher's stack has no use
//! for elsewhere.

use scraper::{ElementRef, Html, Selector};

use crate::core::context::RunContext;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Fetch `page_url` and extract the table at `selector` (or the first table found, if
/// `selector` is empty) as a list of row objects keyed by header text.
pub async fn scrape_html_table(
    ctx: &mut RunContext,
    client: &reqwest::Client,
    page_url: &str,
    selector: &str,
) -> Vec<serde_json::Value> {
    let response = match client.get(page_url).header("User-Agent", DEFAULT_USER_AGENT).send().await {
        Ok(r) => r,
        Err(e) => {
            ctx.add_error(page_url.to_string(), format!("HTTP error: {e}"), false);
            return Vec::new();
        }
    };

    if !response.status().is_success() {
        ctx.add_error(page_url.to_string(), format!("HTTP error: {}", response.status()), false);
        return Vec::new();
    }

    let html = match response.text().await {
        Ok(t) => t,
        Err(e) => {
            ctx.add_error(page_url.to_string(), format!("failed to read response body: {e}"), false);
            return Vec::new();
        }
    };

    let records = extract_table_from_html(&html, selector);
    if records.is_empty() {
        let msg = if selector.is_empty() {
            format!("no tables found on {page_url}")
        } else {
            format!("selector '{selector}' not found on {page_url}")
        };
        ctx.add_error(page_url.to_string(), msg, false);
    } else {
        tracing::info!(rows = records.len(), page_url, "extracted table rows");
    }
    records
}

/// Parse `html` and extract the targeted table as row objects.
pub fn extract_table_from_html(html: &str, selector: &str) -> Vec<serde_json::Value> {
    let document = Html::parse_document(html);

    let table = if selector.is_empty() {
        let Ok(sel) = Selector::parse("table") else { return Vec::new() };
        document.select(&sel).next()
    } else {
        match Selector::parse(selector) {
            Ok(sel) => document.select(&sel).next(),
            Err(_) => None,
        }
    };

    let Some(table) = table else { return Vec::new() };

    let headers = extract_headers(&table);
    if headers.is_empty() {
        return Vec::new();
    }

    let Ok(row_sel) = Selector::parse("tbody tr, tr") else { return Vec::new() };
    let Ok(cell_sel) = Selector::parse("td, th") else { return Vec::new() };

    let mut records = Vec::new();
    for (row_idx, row) in table.select(&row_sel).enumerate() {
        // Skip the header row itself when there was no <thead>.
        if row_idx == 0 && !has_thead(&table) {
            continue;
        }

        let cells: Vec<String> = row
            .select(&cell_sel)
            .map(|c| c.text().collect::<String>().trim().to_string())
            .collect();
        if cells.is_empty() || cells.iter().all(|c| c.is_empty()) {
            continue;
        }

        let mut record = serde_json::Map::new();
        for (i, header) in headers.iter().enumerate() {
            let value = cells.get(i).cloned().unwrap_or_default();
            record.insert(header.clone(), serde_json::Value::String(value));
        }
        records.push(serde_json::Value::Object(record));
    }

    records
}

fn has_thead(table: &ElementRef) -> bool {
    Selector::parse("thead").ok().map(|sel| table.select(&sel).next().is_some()).unwrap_or(false)
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
        .into_iter()
        .enumerate()
        .map(|(i, h)| if h.is_empty() { format!("col_{i}") } else { h })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_rows_keyed_by_header() {
        let html = r#"
            <table>
                <thead><tr><th>Commodity</th><th>Modal Price</th></tr></thead>
                <tbody>
                    <tr><td>Onion</td><td>1200</td></tr>
                    <tr><td>Potato</td><td>950</td></tr>
                </tbody>
            </table>
        "#;
        let records = extract_table_from_html(html, "");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["Commodity"], "Onion");
        assert_eq!(records[1]["Modal Price"], "950");
    }

    #[test]
    fn skips_header_row_when_no_thead() {
        let html = r#"
            <table>
                <tr><td>Commodity</td><td>Modal Price</td></tr>
                <tr><td>Onion</td><td>1200</td></tr>
            </table>
        "#;
        let records = extract_table_from_html(html, "");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["Commodity"], "Onion");
    }

    #[test]
    fn missing_selector_returns_empty() {
        let html = "<table><tr><td>a</td></tr></table>";
        assert!(extract_table_from_html(html, "table#nonexistent").is_empty());
    }
}
