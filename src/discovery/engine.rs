//! Discovery engine orchestrator (C9, §4.7).
//!
//! Grounded on `original_source/scraper/app/discovery/discovery_engine.py`: seed the
//! queue with the entry URL, pop-navigate-detect-requeue until the queue drains or
//! `max_pages` is hit, then hand back an aggregated [`DiscoveryResult`]. The crawl loop
//! shape (`while !queue.is_empty() && pages_processed < max_pages`) is carried over
//! verbatim; the per-page browser-context reuse in the original becomes one short-lived
//! `chromiumoxide` page per visit here (see `browser::manager::navigate_and_sniff`),
//! since attaching/detaching a sniffer per page is simpler in chromiumoxide than
//! threading a single long-lived page through the whole crawl.

use std::time::Duration;

use crate::browser::BrowserSession;
use crate::core::context::RunContext;
use crate::core::types::{DiscoveryResult, PageSummary};
use crate::discovery::file_detector::detect_files;
use crate::discovery::table_detector::detect_tables;
use crate::queue::MultiLevelQueue;
use crate::scoring::score_url;
use crate::url_utils::extract_base_url;

use crate::core::constants::MAX_CRAWL_DEPTH;

/// Run the full discovery pipeline for a single source URL (§4.7).
pub async fn run_discovery(
    ctx: &mut RunContext,
    entry_url: &str,
    max_pages: usize,
    discovery_timeout_seconds: u64,
    request_delay_ms: u64,
    headless: bool,
) -> anyhow::Result<DiscoveryResult> {
    let base_url = extract_base_url(entry_url).unwrap_or_else(|| entry_url.to_string());
    let mut result = DiscoveryResult::default();

    let mut queue = MultiLevelQueue::new(MAX_CRAWL_DEPTH);
    let entry_level = score_url(entry_url);
    queue.push(entry_url, entry_level, 0, None);

    let mut session = BrowserSession::launch(headless).await?;
    let timeout = Duration::from_secs(discovery_timeout_seconds);

    let mut pages_processed = 0usize;

    while !queue.is_empty() && pages_processed < max_pages {
        let Some(item) = queue.pop() else { break };
        let url = item.url.clone();
        let depth = item.depth;

        tracing::info!(
            page = pages_processed + 1,
            max_pages,
            level = item.level,
            depth,
            url = %url,
            "discovery visiting page"
        );
        ctx.mark_visited(&url);

        let (nav, api_candidates) = session.navigate_and_sniff(&url, timeout).await;

        if let Some(error) = &nav.error {
            result.errors.push(format!("[{url}] {error}"));
            ctx.add_error(&url, error.clone(), false);
            pages_processed += 1;
            continue;
        }

        let tables = detect_tables(&nav.html, &url);
        let files = detect_files(&nav.html, &base_url, &url);

        result.pages_visited.push(PageSummary {
            url: url.clone(),
            title: nav.title.clone(),
            status: nav.http_status,
            link_count: nav.links.len(),
        });
        result.table_candidates.extend(tables);
        result.file_candidates.extend(files);
        result.api_candidates.extend(api_candidates);

        for link in &nav.links {
            let level = score_url(&link.url);
            queue.push(&link.url, level, depth + 1, Some(url.clone()));
        }

        pages_processed += 1;
        tokio::time::sleep(Duration::from_millis(request_delay_ms)).await;
    }

    session.close().await.ok();

    result.sort_candidates();
    result.queue_stats = queue.stats();

    tracing::info!(
        pages = result.pages_visited.len(),
        apis = result.api_candidates.len(),
        tables = result.table_candidates.len(),
        files = result.file_candidates.len(),
        "discovery complete"
    );

    Ok(result)
}
