//! Main content region lookup.

use super::compile;
use crate::observer::{Event, Narrator};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

/// Common article wrappers, most specific first
static CONTENT_SELECTORS: Lazy<Vec<(&'static str, Selector)>> = Lazy::new(|| {
    compile(&[
        "article",
        ".entry-content",
        ".post-content",
        ".article-content",
        ".content",
        ".single-content",
        ".post-body",
        ".article-body",
        "main",
        "#content",
        "#main",
        ".post",
        ".entry",
        ".ystd",
        "#ystd",
    ])
});

static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("body").expect("static selector is valid"));

/// Narrow a document to its main content region.
///
/// The first selector with any match wins; without one the body (or the root
/// element) is returned, so a region always exists.
pub fn locate_content<'a>(document: &'a Html, narrator: &Narrator<'_>) -> ElementRef<'a> {
    for (name, selector) in CONTENT_SELECTORS.iter() {
        if let Some(region) = document.select(selector).next() {
            narrator.emit(Event::ContentRegion {
                selector: Some(*name),
            });
            return region;
        }
    }

    narrator.emit(Event::ContentRegion { selector: None });
    document
        .select(&BODY)
        .next()
        .unwrap_or_else(|| document.root_element())
}
