//! URL normalization, internal-link filtering, and downloadable-file detection (C1, §4.1 notes).
//!
//! Grounded on `original_source/scraper/app/utils/url_utils.py`, built on the `url` crate
//! rather than hand-rolled string splitting.

use url::Url;

use crate::core::constants::DOWNLOADABLE_EXTENSIONS;

/// Normalize a URL for consistent comparison: lowercase scheme/host, drop default
/// ports, strip the fragment and a trailing slash from the path.
pub fn normalize_url(raw: &str) -> Option<String> {
    let mut parsed = Url::parse(raw).ok()?;
    parsed.set_fragment(None);

    let scheme = parsed.scheme().to_ascii_lowercase();
    let is_default_port = matches!(
        (scheme.as_str(), parsed.port()),
        ("http", Some(80)) | ("https", Some(443))
    );
    if is_default_port {
        let _ = parsed.set_port(None);
    }

    if parsed.path().len() > 1 && parsed.path().ends_with('/') {
        let trimmed = parsed.path().trim_end_matches('/').to_string();
        parsed.set_path(&trimmed);
    }

    Some(parsed.to_string())
}

/// `scheme://host` for `url`, e.g. `https://agmarknet.gov.in/foo/bar` → `https://agmarknet.gov.in`.
pub fn extract_base_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(match parsed.port() {
        Some(p) => format!("{}://{}:{}", parsed.scheme(), host, p),
        None => format!("{}://{}", parsed.scheme(), host),
    })
}

pub fn get_domain(url: &str) -> Option<String> {
    Url::parse(url).ok()?.host_str().map(str::to_string)
}

/// Last two dot-separated labels of the host, for subdomain-aware internal-link matching.
/// `https://data.agmarknet.gov.in` → `agmarknet.gov.in`.
pub fn get_root_domain(url: &str) -> Option<String> {
    let domain = get_domain(url)?;
    let parts: Vec<&str> = domain.split('.').collect();
    if parts.len() >= 2 {
        Some(parts[parts.len() - 2..].join("."))
    } else {
        Some(domain)
    }
}

/// Resolve a potentially relative `link` against `base_url`.
pub fn resolve_url(link: &str, base_url: &str) -> Option<String> {
    let base = Url::parse(base_url).ok()?;
    base.join(link).ok().map(|u| u.to_string())
}

/// Whether `link` shares a root domain with `base_url`, after resolving relative links.
pub fn is_internal_link(link: &str, base_url: &str) -> bool {
    if link.is_empty() {
        return false;
    }
    let Some(absolute) = resolve_url(link, base_url) else {
        return false;
    };
    match (get_root_domain(&absolute), get_root_domain(base_url)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Whether `url`'s path ends in one of the downloadable extensions (§4.6 / C8).
pub fn is_downloadable(url: &str) -> bool {
    is_downloadable_with(url, DOWNLOADABLE_EXTENSIONS)
}

pub fn is_downloadable_with(url: &str, extensions: &[&str]) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let path = parsed.path().to_ascii_lowercase();
    extensions.iter().any(|ext| path.ends_with(ext))
}

/// Remove query parameters (and fragment) from a URL.
pub fn strip_query_params(url: &str) -> Option<String> {
    let mut parsed = Url::parse(url).ok()?;
    parsed.set_query(None);
    parsed.set_fragment(None);
    Some(parsed.to_string())
}

/// Href schemes the browser driver's link extractor (C5) must skip (§4.3).
pub fn is_skippable_href(href: &str) -> bool {
    href.is_empty()
        || href.starts_with('#')
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_scheme_host_case_and_trailing_slash() {
        assert_eq!(
            normalize_url("HTTPS://Example.com:443/Foo/").unwrap(),
            "https://example.com/Foo"
        );
    }

    #[test]
    fn keeps_non_default_port() {
        assert_eq!(
            normalize_url("http://example.com:8080/a").unwrap(),
            "http://example.com:8080/a"
        );
    }

    #[test]
    fn root_domain_matches_across_subdomains() {
        assert_eq!(
            get_root_domain("https://data.agmarknet.gov.in").unwrap(),
            "gov.in"
        );
    }

    #[test]
    fn internal_link_detects_subdomain_as_internal() {
        assert!(is_internal_link(
            "https://data.agmarknet.gov.in/prices",
            "https://agmarknet.gov.in"
        ));
        assert!(!is_internal_link(
            "https://other.example.org/prices",
            "https://agmarknet.gov.in"
        ));
    }

    #[test]
    fn relative_link_resolves_against_base() {
        assert_eq!(
            resolve_url("/prices", "https://example.com/page").unwrap(),
            "https://example.com/prices"
        );
    }

    #[test]
    fn downloadable_extension_matches_suffix() {
        assert!(is_downloadable("https://example.com/reports/today.PDF"));
        assert!(is_downloadable("https://example.com/data.xlsx"));
        assert!(!is_downloadable("https://example.com/data.html"));
    }

    #[test]
    fn skippable_hrefs() {
        assert!(is_skippable_href("#top"));
        assert!(is_skippable_href("javascript:void(0)"));
        assert!(is_skippable_href("mailto:a@b.com"));
        assert!(!is_skippable_href("/prices"));
    }
}
