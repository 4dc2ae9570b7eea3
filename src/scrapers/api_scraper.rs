//! API endpoint replay (C13, §4.11).
//!
//! Grounded on `original_source/scraper/app/scraping/api_scraper.py`: paginate until a
//! short page, back off 5s on 403/429 and retry the same page, give up on any other
//! HTTP error or malformed JSON.

use std::collections::HashMap;
use std::time::Duration;

use crate::core::context::RunContext;
use crate::core::types::{ExtractionConfig, HttpMethod, PaginationMode, PostContentType};

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";
const PAGE_PARAM: &str = "page";
const PAGE_SIZE_PARAM: &str = "limit";
const OFFSET_PARAM: &str = "offset";
const PAGE_SIZE: u32 = 100;
const MAX_PAGES: u32 = 10;

/// Replay an `api`-type [`ExtractionConfig`], returning the flat list of raw records
/// harvested across all pages.
pub async fn scrape_api(
    ctx: &mut RunContext,
    client: &reqwest::Client,
    config: &ExtractionConfig,
    request_delay_ms: u64,
) -> Vec<serde_json::Value> {
    let ExtractionConfig::Api { endpoint, method, params, headers, post_body, post_content_type, paginate, .. } = config
    else {
        return Vec::new();
    };

    let mut request_headers = HashMap::new();
    request_headers.insert("User-Agent".to_string(), DEFAULT_USER_AGENT.to_string());
    request_headers.insert("Accept".to_string(), "application/json, text/plain, */*".to_string());
    request_headers.insert("Accept-Language".to_string(), "en-US,en;q=0.9".to_string());
    for (k, v) in headers {
        request_headers.insert(k.clone(), v.clone());
    }

    let paginate = *paginate;
    let total_pages = if paginate == PaginationMode::None { 1 } else { MAX_PAGES };

    let mut all_records = Vec::new();

    let mut page_num = 1u32;
    while page_num <= total_pages {
        let response = match *method {
            HttpMethod::Post => {
                let mut body: serde_json::Value = post_body
                    .as_ref()
                    .and_then(|b| serde_json::from_str(b).ok())
                    .unwrap_or_else(|| serde_json::json!({}));
                if let Some(obj) = body.as_object_mut() {
                    match paginate {
                        PaginationMode::Page => {
                            obj.insert(PAGE_PARAM.to_string(), serde_json::json!(page_num));
                            obj.insert(PAGE_SIZE_PARAM.to_string(), serde_json::json!(PAGE_SIZE));
                        }
                        PaginationMode::Offset => {
                            obj.insert(OFFSET_PARAM.to_string(), serde_json::json!((page_num - 1) * PAGE_SIZE));
                            obj.insert(PAGE_SIZE_PARAM.to_string(), serde_json::json!(PAGE_SIZE));
                        }
                        PaginationMode::None => {}
                    }
                }

                let mut builder = client.post(endpoint);
                for (k, v) in &request_headers {
                    builder = builder.header(k, v);
                }
                builder = match post_content_type {
                    Some(PostContentType::FormUrlencoded) => builder.form(&body),
                    _ => builder.json(&body),
                };
                builder.send().await
            }
            HttpMethod::Get => {
                let mut req_params: Vec<(String, String)> =
                    params.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
                match paginate {
                    PaginationMode::Page => {
                        req_params.push((PAGE_PARAM.to_string(), page_num.to_string()));
                        req_params.push((PAGE_SIZE_PARAM.to_string(), PAGE_SIZE.to_string()));
                    }
                    PaginationMode::Offset => {
                        req_params.push((OFFSET_PARAM.to_string(), ((page_num - 1) * PAGE_SIZE).to_string()));
                        req_params.push((PAGE_SIZE_PARAM.to_string(), PAGE_SIZE.to_string()));
                    }
                    PaginationMode::None => {}
                }

                let mut builder = client.get(endpoint).query(&req_params);
                for (k, v) in &request_headers {
                    builder = builder.header(k, v);
                }
                builder.send().await
            }
        };

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                ctx.add_error(endpoint.clone(), format!("request error on page {page_num}: {e}"), false);
                break;
            }
        };

        let status = response.status();
        if status.as_u16() == 403 || status.as_u16() == 429 {
            ctx.add_error(endpoint.clone(), format!("HTTP {status} on page {page_num}"), false);
            tracing::warn!("rate limited, waiting 5s...");
            tokio::time::sleep(Duration::from_secs(5)).await;
            continue;
        }
        if !status.is_success() {
            ctx.add_error(endpoint.clone(), format!("HTTP {status} on page {page_num}"), false);
            break;
        }

        let data: serde_json::Value = match response.json().await {
            Ok(v) => v,
            Err(_) => {
                ctx.add_error(endpoint.clone(), format!("invalid JSON on page {page_num}"), false);
                break;
            }
        };

        let records = extract_records(&data);
        if records.is_empty() {
            tracing::debug!(page_num, "no records on page — stopping pagination");
            break;
        }

        let count = records.len();
        all_records.extend(records);
        tracing::debug!(page_num, count, total = all_records.len(), "api page fetched");

        if paginate == PaginationMode::None {
            break;
        }
        if count < PAGE_SIZE as usize {
            break;
        }

        tokio::time::sleep(Duration::from_millis(request_delay_ms)).await;
        page_num += 1;
    }

    tracing::info!(total = all_records.len(), endpoint = %endpoint, "api scrape complete");
    all_records
}

/// Pull a flat record list out of a JSON response: a direct array, or a common
/// wrapper key (`data`, `records`, `items`, `results`, `rows`, `list`).
fn extract_records(data: &serde_json::Value) -> Vec<serde_json::Value> {
    if let serde_json::Value::Array(items) = data {
        return items.clone();
    }
    if let serde_json::Value::Object(map) = data {
        for key in ["data", "records", "items", "results", "rows", "list"] {
            if let Some(serde_json::Value::Array(items)) = map.get(key) {
                return items.clone();
            }
        }
    }
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_direct_array() {
        let data = json!([{"a": 1}, {"a": 2}]);
        assert_eq!(extract_records(&data).len(), 2);
    }

    #[test]
    fn extracts_from_wrapper_key() {
        let data = json!({"records": [{"a": 1}]});
        assert_eq!(extract_records(&data).len(), 1);
    }

    #[test]
    fn returns_empty_for_unrecognized_shape() {
        let data = json!({"status": "ok"});
        assert!(extract_records(&data).is_empty());
    }
}
