//! Heuristics over statically served article HTML.
//!
//! Every heuristic here is an ordered list of strategies evaluated with early
//! exit. Nothing in this module performs I/O.

pub mod content;
pub mod images;
pub mod next_chapter;
pub mod pagination;

pub use content::locate_content;
pub use images::extract_images;
pub use next_chapter::find_next_chapter;
pub use pagination::discover_pages;

use scraper::{ElementRef, Selector};
use url::Url;

/// Compile a static selector table, keeping the source text for narration
pub(crate) fn compile(selectors: &[&'static str]) -> Vec<(&'static str, Selector)> {
    selectors
        .iter()
        .map(|s| (*s, Selector::parse(s).expect("static selector is valid")))
        .collect()
}

/// Text content with each fragment trimmed and empty fragments dropped
pub(crate) fn visible_text(element: ElementRef<'_>, separator: &str) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(separator)
}

/// Same host and port
pub(crate) fn same_host(a: &Url, b: &Url) -> bool {
    a.host_str() == b.host_str() && a.port_or_known_default() == b.port_or_known_default()
}

/// URL path without trailing slashes
pub(crate) fn trimmed_path(url: &Url) -> &str {
    url.path().trim_end_matches('/')
}

/// Identity of a page for deduplication: origin, trimmed path and query.
///
/// `/archives/100` and `/archives/100/` are the same page; fragments are
/// ignored.
pub fn page_key(url: &Url) -> String {
    format!(
        "{}{}?{}",
        url.origin().ascii_serialization(),
        trimmed_path(url),
        url.query().unwrap_or_default()
    )
}

/// Numeric suffix of `path` below `base`, if `path` is `base/<digits>`
fn numeric_suffix<'a>(base: &str, path: &'a str) -> Option<&'a str> {
    let suffix = path.strip_prefix(base)?.strip_prefix('/')?;
    (!suffix.is_empty() && suffix.chars().all(|c| c.is_ascii_digit())).then_some(suffix)
}

/// Whether `candidate` is another page of the article at `current`.
///
/// `https://aikatu.jp/archives/1031854/2` is intra-article for
/// `https://aikatu.jp/archives/1031854`, and so is
/// `https://w.grapps.me/original/624941/2/` for
/// `https://w.grapps.me/original/624941/`.
pub fn looks_like_intra_pagination(current: &Url, candidate: &Url) -> bool {
    same_host(current, candidate)
        && numeric_suffix(trimmed_path(current), trimmed_path(candidate)).is_some()
}

/// Page number of `url` within the article rooted at `base_path`.
///
/// The article root is page 1; a non-numeric or foreign path sorts last.
pub fn page_number(base_path: &str, url: &Url) -> u64 {
    let path = trimmed_path(url);
    if path == base_path {
        return 1;
    }
    numeric_suffix(base_path, path)
        .and_then(|suffix| suffix.parse().ok())
        .unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_intra_pagination_shape() {
        let current = url("https://aikatu.jp/archives/1031854");
        assert!(looks_like_intra_pagination(
            &current,
            &url("https://aikatu.jp/archives/1031854/2")
        ));
        assert!(looks_like_intra_pagination(
            &url("https://w.grapps.me/original/624941/"),
            &url("https://w.grapps.me/original/624941/2/")
        ));

        assert!(!looks_like_intra_pagination(
            &current,
            &url("https://aikatu.jp/archives/1031855")
        ));
        assert!(!looks_like_intra_pagination(
            &current,
            &url("https://aikatu.jp/archives/1031854/comments")
        ));
        assert!(!looks_like_intra_pagination(
            &current,
            &url("https://other.jp/archives/1031854/2")
        ));
        assert!(!looks_like_intra_pagination(&current, &current));
    }

    #[test]
    fn test_page_number() {
        let base = "/archives/100";
        assert_eq!(page_number(base, &url("https://a.jp/archives/100/")), 1);
        assert_eq!(page_number(base, &url("https://a.jp/archives/100/10")), 10);
        assert_eq!(page_number(base, &url("https://a.jp/archives/100/x")), u64::MAX);
        assert_eq!(page_number(base, &url("https://a.jp/archives/1002")), u64::MAX);
    }

    #[test]
    fn test_page_key_ignores_trailing_slash_and_fragment() {
        let key = page_key(&url("https://a.jp/archives/100"));
        assert_eq!(page_key(&url("https://a.jp/archives/100/")), key);
        assert_eq!(page_key(&url("https://a.jp/archives/100#comments")), key);
        assert_ne!(page_key(&url("https://a.jp/archives/100?page=2")), key);
        assert_ne!(page_key(&url("https://a.jp/archives/100/2")), key);
    }

    #[test]
    fn test_same_host_compares_ports() {
        assert!(same_host(&url("https://a.jp/x"), &url("https://a.jp:443/y")));
        assert!(!same_host(&url("http://a.jp:8080/x"), &url("http://a.jp/x")));
    }
}
