//! Utility functions and helpers.

pub mod http;

use std::sync::LazyLock;

use regex::Regex;
use scraper::Selector;
use url::Url;

use crate::error::{AppError, Result};

static FIRST_INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]+").expect("static regex"));

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Extract the item id from a link path: the first run of ASCII digits.
pub fn extract_item_id(link: &str) -> Option<u64> {
    FIRST_INTEGER
        .find(link)
        .and_then(|m| m.as_str().parse().ok())
}

/// Drop the query string so the same image always has the same URL.
pub fn strip_query(url: &str) -> &str {
    match url.find('?') {
        Some(idx) if idx > 0 => &url[..idx],
        _ => url,
    }
}

/// Parse a CSS selector, reporting the offending selector on failure.
pub fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_url() {
        let base = Url::parse("https://www.hpoi.net/").unwrap();
        assert_eq!(
            resolve_url(&base, "hobby/12345"),
            "https://www.hpoi.net/hobby/12345"
        );
        assert_eq!(
            resolve_url(&base, "/hobby/12345"),
            "https://www.hpoi.net/hobby/12345"
        );
        assert_eq!(
            resolve_url(&base, "https://other.com/x"),
            "https://other.com/x"
        );
    }

    #[test]
    fn test_extract_item_id() {
        assert_eq!(extract_item_id("hobby/12345"), Some(12345));
        assert_eq!(extract_item_id("/hobby/678?from=home"), Some(678));
        assert_eq!(extract_item_id("hobby/list"), None);
    }

    #[test]
    fn test_strip_query() {
        assert_eq!(
            strip_query("https://r.hpoi.net/a.jpg?date=123"),
            "https://r.hpoi.net/a.jpg"
        );
        assert_eq!(strip_query("https://r.hpoi.net/a.jpg"), "https://r.hpoi.net/a.jpg");
        assert_eq!(strip_query("?only"), "?only");
    }

    #[test]
    fn test_parse_selector() {
        assert!(parse_selector("table.info-box a").is_ok());
        assert!(parse_selector("[[invalid").is_err());
    }
}
