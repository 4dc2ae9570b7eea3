//! Black-box replay tests for the HTTP-facing scrapers (C13/C14/C15), driving the real
//! `reqwest`-based scraper functions against a local `wiremock` server instead of a live
//! portal.

use std::collections::HashMap;

use mandi_agent::core::context::RunContext;
use mandi_agent::core::types::{ExtractionConfig, HttpMethod, PaginationMode, PostContentType};
use mandi_agent::scrapers::{scrape_api, scrape_file, scrape_html_table};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn api_scraper_follows_pagination_until_short_page() {
    let server = MockServer::start().await;

    let page_of = |n: usize| -> Vec<serde_json::Value> {
        (0..n).map(|i| serde_json::json!({"commodity": "Onion", "price": 1000 + i})).collect()
    };

    Mock::given(method("GET"))
        .and(path("/api/prices"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": page_of(100) })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/prices"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": page_of(10) })))
        .mount(&server)
        .await;

    let config = ExtractionConfig::Api {
        endpoint: format!("{}/api/prices", server.uri()),
        method: HttpMethod::Get,
        params: HashMap::new(),
        headers: HashMap::new(),
        post_body: None,
        post_content_type: Some(PostContentType::Json),
        paginate: PaginationMode::Page,
        confidence: 0.9,
        reasoning: "test".to_string(),
    };

    let mut ctx = RunContext::new("src-1", "https://example.com");
    let client = reqwest::Client::new();
    let records = scrape_api(&mut ctx, &client, &config, 0).await;

    assert_eq!(records.len(), 110);
    assert!(ctx.errors.is_empty());
}

#[tokio::test]
async fn api_scraper_injects_offset_and_limit_for_offset_pagination() {
    let server = MockServer::start().await;

    let page_of = |n: usize| -> Vec<serde_json::Value> {
        (0..n).map(|i| serde_json::json!({"commodity": "Onion", "price": 1000 + i})).collect()
    };

    Mock::given(method("GET"))
        .and(path("/api/prices"))
        .and(query_param("offset", "0"))
        .and(query_param("limit", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": page_of(100) })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/prices"))
        .and(query_param("offset", "100"))
        .and(query_param("limit", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": page_of(5) })))
        .mount(&server)
        .await;

    let config = ExtractionConfig::Api {
        endpoint: format!("{}/api/prices", server.uri()),
        method: HttpMethod::Get,
        params: HashMap::new(),
        headers: HashMap::new(),
        post_body: None,
        post_content_type: Some(PostContentType::Json),
        paginate: PaginationMode::Offset,
        confidence: 0.9,
        reasoning: "test".to_string(),
    };

    let mut ctx = RunContext::new("src-1", "https://example.com");
    let client = reqwest::Client::new();
    let records = scrape_api(&mut ctx, &client, &config, 0).await;

    assert_eq!(records.len(), 105);
    assert!(ctx.errors.is_empty());
}

#[tokio::test]
async fn api_scraper_records_non_fatal_error_on_http_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/prices"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let config = ExtractionConfig::Api {
        endpoint: format!("{}/api/prices", server.uri()),
        method: HttpMethod::Get,
        params: HashMap::new(),
        headers: HashMap::new(),
        post_body: None,
        post_content_type: None,
        paginate: PaginationMode::None,
        confidence: 0.9,
        reasoning: "test".to_string(),
    };

    let mut ctx = RunContext::new("src-1", "https://example.com");
    let client = reqwest::Client::new();
    let records = scrape_api(&mut ctx, &client, &config, 0).await;

    assert!(records.is_empty());
    assert!(!ctx.errors.is_empty());
    assert!(!ctx.is_fatal(), "HTTP failures during replay are non-fatal");
}

#[tokio::test]
async fn html_scraper_extracts_table_rows_keyed_by_header() {
    let server = MockServer::start().await;

    let body = r#"
        <html><body>
            <table id="prices">
                <thead><tr><th>Commodity</th><th>Modal Price</th></tr></thead>
                <tbody>
                    <tr><td>Onion</td><td>1200</td></tr>
                    <tr><td>Potato</td><td>800</td></tr>
                </tbody>
            </table>
        </body></html>
    "#;

    Mock::given(method("GET"))
        .and(path("/mandi/prices"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let mut ctx = RunContext::new("src-1", "https://example.com");
    let client = reqwest::Client::new();
    let records = scrape_html_table(&mut ctx, &client, &format!("{}/mandi/prices", server.uri()), "#prices").await;

    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["Commodity"], "Onion");
    assert_eq!(records[1]["Modal Price"], "800");
}

#[tokio::test]
async fn html_scraper_records_error_when_selector_matches_nothing() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/mandi/prices"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body><p>no tables here</p></body></html>"))
        .mount(&server)
        .await;

    let mut ctx = RunContext::new("src-1", "https://example.com");
    let client = reqwest::Client::new();
    let records =
        scrape_html_table(&mut ctx, &client, &format!("{}/mandi/prices", server.uri()), "#missing").await;

    assert!(records.is_empty());
    assert!(!ctx.errors.is_empty());
}

#[tokio::test]
async fn file_scraper_parses_downloaded_csv() {
    let server = MockServer::start().await;

    let csv_body = "Commodity,Modal Price\nOnion,1200\nPotato,800\n";
    Mock::given(method("GET"))
        .and(path("/downloads/prices.csv"))
        .respond_with(ResponseTemplate::new(200).set_body_string(csv_body))
        .mount(&server)
        .await;

    let mut ctx = RunContext::new("src-1", "https://example.com");
    let client = reqwest::Client::new();
    let records = scrape_file(&mut ctx, &client, &format!("{}/downloads/prices.csv", server.uri()), "csv").await;

    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["Commodity"], "Onion");
}

#[tokio::test]
async fn file_scraper_reports_unsupported_pdf_type_without_panicking() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/downloads/prices.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.4 fake".to_vec()))
        .mount(&server)
        .await;

    let mut ctx = RunContext::new("src-1", "https://example.com");
    let client = reqwest::Client::new();
    let records = scrape_file(&mut ctx, &client, &format!("{}/downloads/prices.pdf", server.uri()), "pdf").await;

    assert!(records.is_empty());
    assert!(ctx.errors.iter().any(|e| e.error.contains("PDF")));
}
