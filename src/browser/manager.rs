//! Headless browser driver (C5, §4.3).
//!
//! Grounded on the teacher's `scraping::browser_manager` (chrome executable discovery,
//! headless `BrowserConfig` construction) and `scraping::rust_scraper::cdp` (CDP handler
//! task + `page.goto`/`page.content` idiom), generalized from a one-shot "fetch HTML"
//! primitive into the navigate-and-extract contract §4.3 specifies.

use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Result};
use chromiumoxide::browser::BrowserConfig;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::Browser;
use futures::StreamExt;
use scraper::{Html, Selector};
use tracing::{error, warn};

use crate::browser::sniffer::NetworkSniffer;
use crate::core::types::ApiCandidate;
use crate::url_utils;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Resolution order: `CHROME_EXECUTABLE` env var → PATH scan → OS well-known paths.
pub fn find_chrome_executable() -> Option<String> {
    if let Ok(p) = std::env::var("CHROME_EXECUTABLE") {
        if Path::new(&p).exists() {
            return Some(p);
        }
    }

    if let Ok(path_var) = std::env::var("PATH") {
        let candidates = ["google-chrome", "chromium", "chromium-browser", "chrome", "brave-browser"];
        for dir in std::env::split_paths(&path_var) {
            for exe in candidates {
                let full = dir.join(exe);
                if full.exists() {
                    return Some(full.to_string_lossy().to_string());
                }
            }
        }
    }

    #[cfg(target_os = "linux")]
    {
        let candidates = [
            "/usr/bin/google-chrome",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/usr/local/bin/chromium",
        ];
        for c in candidates {
            if Path::new(c).exists() {
                return Some(c.to_string());
            }
        }
    }

    #[cfg(target_os = "macos")]
    {
        let candidates = [
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
        ];
        for c in candidates {
            if Path::new(c).exists() {
                return Some(c.to_string());
            }
        }
    }

    None
}

fn build_config(exe: &str, headless: bool) -> Result<BrowserConfig> {
    let mut builder = BrowserConfig::builder()
        .chrome_executable(exe)
        .viewport(Viewport {
            width: 1280,
            height: 720,
            device_scale_factor: Some(1.0),
            emulating_mobile: false,
            is_landscape: true,
            has_touch: false,
        })
        .window_size(1280, 720)
        .arg("--disable-gpu")
        .arg("--no-sandbox")
        .arg("--disable-setuid-sandbox")
        .arg("--disable-dev-shm-usage")
        .arg("--disable-extensions")
        .arg("--disable-background-networking")
        .arg("--no-first-run")
        .arg(format!("--user-agent={DEFAULT_USER_AGENT}"));

    if !headless {
        builder = builder.with_head();
    }

    builder.build().map_err(|e| anyhow!("failed to build browser config: {e}"))
}

#[derive(Debug, Clone)]
pub struct ExtractedLink {
    pub url: String,
    pub text: String,
}

/// Result of [`navigate_and_extract`] (§4.3).
#[derive(Debug, Clone)]
pub struct NavigationResult {
    pub final_url: String,
    pub title: Option<String>,
    pub http_status: u16,
    pub links: Vec<ExtractedLink>,
    pub html_snippet: String,
    pub html: String,
    pub error: Option<String>,
}

/// A launched headless browser + its background CDP event-pump task.
///
/// Owns the browser for the duration of one discovery invocation; `close()` must be
/// called on every path (including error/cancel) to release the child process, per
/// SPEC_FULL.md §9 "Browser as owned resource".
pub struct BrowserSession {
    browser: Browser,
    handler_task: tokio::task::JoinHandle<()>,
}

impl BrowserSession {
    pub async fn launch(headless: bool) -> Result<Self> {
        let exe = find_chrome_executable().ok_or_else(|| {
            anyhow!("no Chromium-family browser found; set CHROME_EXECUTABLE")
        })?;
        let config = build_config(&exe, headless)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| anyhow!("failed to launch browser ({exe}): {e}"))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    error!("CDP handler error: {e}");
                }
            }
        });

        Ok(Self { browser, handler_task })
    }

    /// Navigate to `url`, wait for DOM content plus a fixed 1s settle for late JS,
    /// and extract the page snapshot described in §4.3.
    pub async fn navigate_and_extract(
        &mut self,
        url: &str,
        timeout: Duration,
    ) -> NavigationResult {
        let page = match tokio::time::timeout(timeout, self.browser.new_page(url)).await {
            Ok(Ok(page)) => page,
            Ok(Err(e)) => return navigation_error(url, format!("failed to open page: {e}")),
            Err(_) => return navigation_error(url, "navigation timed out"),
        };
        let result = self.extract_from_page(&page, url, timeout).await;
        let _ = page.close().await;
        result
    }

    /// Like [`navigate_and_extract`](Self::navigate_and_extract), but attaches a
    /// [`NetworkSniffer`] around the navigation and returns whatever JSON API
    /// candidates it captured (§4.4/§4.5 run together per page in the discovery loop).
    pub async fn navigate_and_sniff(
        &mut self,
        url: &str,
        timeout: Duration,
    ) -> (NavigationResult, Vec<ApiCandidate>) {
        let page = match tokio::time::timeout(timeout, self.browser.new_page(url)).await {
            Ok(Ok(page)) => page,
            Ok(Err(e)) => return (navigation_error(url, format!("failed to open page: {e}")), Vec::new()),
            Err(_) => return (navigation_error(url, "navigation timed out"), Vec::new()),
        };

        let sniffer = match NetworkSniffer::attach(&page).await {
            Ok(s) => Some(s),
            Err(e) => {
                warn!(url, error = %e, "failed to attach network sniffer");
                None
            }
        };

        let result = self.extract_from_page(&page, url, timeout).await;
        let candidates = match sniffer {
            Some(s) => s.stop().await,
            None => Vec::new(),
        };
        let _ = page.close().await;

        (result, candidates)
    }

    async fn extract_from_page(&self, page: &chromiumoxide::Page, url: &str, timeout: Duration) -> NavigationResult {
        let outcome: Result<NavigationResult> = async {
            tokio::time::timeout(timeout, page.wait_for_navigation())
                .await
                .map_err(|_| anyhow!("DOM load timed out"))?
                .map_err(|e| anyhow!("navigation failed: {e}"))?;

            tokio::time::sleep(Duration::from_secs(1)).await;

            let final_url = page.url().await.ok().flatten().unwrap_or_else(|| url.to_string());
            let title = page.get_title().await.ok().flatten();
            let html = page.content().await.map_err(|e| anyhow!("failed to get content: {e}"))?;

            let links = extract_internal_links(&html, &final_url);
            let html_snippet: String = html.chars().take(5000).collect();

            Ok(NavigationResult {
                final_url,
                title,
                http_status: 200,
                links,
                html_snippet,
                html,
                error: None,
            })
        }
        .await;

        outcome.unwrap_or_else(|e| {
            warn!(url, error = %e, "navigation failed");
            navigation_error(url, e.to_string())
        })
    }

    pub async fn close(mut self) -> Result<()> {
        let res = self.browser.close().await;
        self.handler_task.abort();
        res.map(|_| ()).map_err(|e| anyhow!("browser close error: {e}"))
    }
}

fn navigation_error(url: &str, error: impl Into<String>) -> NavigationResult {
    NavigationResult {
        final_url: url.to_string(),
        title: None,
        http_status: 0,
        links: Vec::new(),
        html_snippet: String::new(),
        html: String::new(),
        error: Some(error.into()),
    }
}

/// De-duplicated, absolute, internal (same root domain), non-skippable links (§4.3).
fn extract_internal_links(html: &str, base_url: &str) -> Vec<ExtractedLink> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut seen = std::collections::HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        if url_utils::is_skippable_href(href) {
            continue;
        }
        let Some(absolute) = url_utils::resolve_url(href, base_url) else {
            continue;
        };
        if !url_utils::is_internal_link(href, base_url) {
            continue;
        }
        if !seen.insert(absolute.clone()) {
            continue;
        }
        let text = element.text().collect::<String>().trim().to_string();
        links.push(ExtractedLink { url: absolute, text });
    }

    links
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_deduped_internal_links_only() {
        let html = r#"
            <html><body>
                <a href="/mandi-prices">Mandi</a>
                <a href="/mandi-prices">Mandi again</a>
                <a href="https://other.example.org/x">External</a>
                <a href="javascript:void(0)">Skip</a>
                <a href="#top">Skip anchor</a>
            </body></html>
        "#;
        let links = extract_internal_links(html, "https://example.com");
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "https://example.com/mandi-prices");
    }
}
