//! Discovery of the other pages of the same article.

use super::{
    compile, looks_like_intra_pagination, page_key, page_number, same_host, trimmed_path,
    visible_text,
};
use crate::error::StructureMismatch;
use crate::observer::{Event, Narrator};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use tracing::debug;
use url::Url;

/// Pagination containers; the first selector with any match wins
static CONTAINER_SELECTORS: Lazy<Vec<(&'static str, Selector)>> = Lazy::new(|| {
    compile(&[
        ".pagination a",
        ".page-numbers a",
        ".pager a",
        ".wp-pagenavi a",
        "nav.navigation a",
        ".post-page-numbers",
        "a.page-link",
        ".pages a",
    ])
});

static REL_NEXT: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"a[rel="next"], link[rel="next"]"#).expect("static selector is valid")
});

static ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a").expect("static selector is valid"));

/// Link texts that name a direction rather than a page
const DIRECTION_WORDS: &[&str] = &[
    "next", "prev", "previous", "»", "«", "›", "‹", "次へ", "前へ",
];

/// "Next page" phrases; Latin ones compare case-insensitively
const NEXT_PAGE_PHRASES: &[&str] = &["次のページ", "次ページ", "next page"];

type Strategy = for<'a> fn(&'a Html, &Url) -> Option<(&'static str, Vec<ElementRef<'a>>)>;

/// Link sources in priority order
const STRATEGIES: &[Strategy] = &[
    container_links,
    rel_next_links,
    numeric_links,
    next_page_text_links,
];

/// List every page of the article at `page_url`, including itself.
///
/// Pages are sorted by their numeric suffix below the article path: the
/// article root first, `/2`, `/3`, `/10` after it, unparsable paths last.
pub fn discover_pages(document: &Html, page_url: &Url, narrator: &Narrator<'_>) -> Vec<Url> {
    let base_path = trimmed_path(page_url).to_string();
    let mut pages = vec![page_url.clone()];

    let links = match pagination_links(document, page_url) {
        Ok((strategy, links)) => {
            narrator.emit(Event::PaginationMatched {
                strategy,
                links: links.len(),
            });
            links
        }
        Err(mismatch) => {
            debug!(url = %page_url, "{}", mismatch);
            Vec::new()
        }
    };

    let mut seen: HashSet<String> = HashSet::from([page_key(page_url)]);
    for link in links {
        let Some(url) = link.value().attr("href").and_then(|href| page_url.join(href).ok()) else {
            continue;
        };

        if !same_host(page_url, &url) {
            narrator.emit(Event::PaginationLinkDropped {
                url,
                reason: "other host",
            });
            continue;
        }
        if seen.contains(&page_key(&url)) {
            continue;
        }
        if trimmed_path(&url) != base_path && !looks_like_intra_pagination(page_url, &url) {
            narrator.emit(Event::PaginationLinkDropped {
                url,
                reason: "not part of this article",
            });
            continue;
        }
        let text = visible_text(link, "").to_lowercase();
        if DIRECTION_WORDS.contains(&text.as_str()) {
            continue;
        }

        seen.insert(page_key(&url));
        pages.push(url);
    }

    pages.sort_by_key(|url| page_number(&base_path, url));

    if pages.len() > 1 {
        narrator.emit(Event::PagesListed {
            pages: pages.clone(),
        });
    }

    pages
}

fn pagination_links<'a>(
    document: &'a Html,
    page_url: &Url,
) -> Result<(&'static str, Vec<ElementRef<'a>>), StructureMismatch> {
    STRATEGIES
        .iter()
        .find_map(|strategy| strategy(document, page_url))
        .ok_or(StructureMismatch {
            stage: "pagination",
        })
}

fn non_empty<'a>(
    name: &'static str,
    links: Vec<ElementRef<'a>>,
) -> Option<(&'static str, Vec<ElementRef<'a>>)> {
    (!links.is_empty()).then_some((name, links))
}

fn container_links<'a>(
    document: &'a Html,
    _page_url: &Url,
) -> Option<(&'static str, Vec<ElementRef<'a>>)> {
    CONTAINER_SELECTORS
        .iter()
        .find_map(|(name, selector)| non_empty(*name, document.select(selector).collect()))
}

fn rel_next_links<'a>(
    document: &'a Html,
    _page_url: &Url,
) -> Option<(&'static str, Vec<ElementRef<'a>>)> {
    let link = document
        .select(&REL_NEXT)
        .next()
        .filter(|link| link.value().attr("href").is_some())?;
    Some(("rel=next", vec![link]))
}

fn numeric_links<'a>(
    document: &'a Html,
    page_url: &Url,
) -> Option<(&'static str, Vec<ElementRef<'a>>)> {
    let base_path = trimmed_path(page_url);
    let links = document
        .select(&ANCHOR)
        .filter(|link| {
            let text = visible_text(*link, "");
            !text.is_empty() && text.chars().all(char::is_numeric)
        })
        .filter(|link| {
            link.value()
                .attr("href")
                .filter(|href| !href.is_empty())
                .and_then(|href| page_url.join(href).ok())
                .is_some_and(|url| trimmed_path(&url).starts_with(base_path))
        })
        .collect();
    non_empty("numeric links", links)
}

fn next_page_text_links<'a>(
    document: &'a Html,
    page_url: &Url,
) -> Option<(&'static str, Vec<ElementRef<'a>>)> {
    // Only the first phrase match counts, even when it leaves the site.
    let link = document.select(&ANCHOR).find(|link| {
        let has_href = link.value().attr("href").is_some_and(|href| !href.is_empty());
        let text = visible_text(*link, " ").to_lowercase();
        has_href && !text.is_empty() && NEXT_PAGE_PHRASES.iter().any(|p| text.contains(p))
    })?;

    let url = page_url.join(link.value().attr("href")?).ok()?;
    non_empty(
        "next page text",
        if same_host(page_url, &url) {
            vec![link]
        } else {
            Vec::new()
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pages(html: &str, page: &str) -> Vec<String> {
        let document = Html::parse_document(html);
        let page_url = Url::parse(page).unwrap();
        discover_pages(&document, &page_url, &Narrator::quiet())
            .into_iter()
            .map(|url| url.to_string())
            .collect()
    }

    #[test]
    fn test_numeric_sort_not_lexicographic() {
        let html = r#"<div class="pagination">
            <a href="/archives/100/10">10</a>
            <a href="/archives/100/2">2</a>
            <a href="/archives/100">1</a>
            <a href="/archives/100/3">3</a>
        </div>"#;

        assert_eq!(
            pages(html, "https://a.jp/archives/100"),
            vec![
                "https://a.jp/archives/100",
                "https://a.jp/archives/100/2",
                "https://a.jp/archives/100/3",
                "https://a.jp/archives/100/10",
            ]
        );
    }

    #[test]
    fn test_container_drops_other_articles_and_directions() {
        let html = r#"<div class="wp-pagenavi">
            <a href="/archives/100/2">2</a>
            <a href="/archives/100/2">next</a>
            <a href="/archives/101">次の話</a>
            <a href="https://elsewhere.jp/archives/100/3">3</a>
            <a href="/archives/100/3">»</a>
        </div>"#;

        assert_eq!(
            pages(html, "https://a.jp/archives/100/"),
            vec!["https://a.jp/archives/100/", "https://a.jp/archives/100/2"]
        );
    }

    #[test]
    fn test_slash_variant_of_start_page_is_not_another_page() {
        let html = r#"<div class="pagination">
            <a href="/archives/100/">1</a>
            <a href="/archives/100/2">2</a>
            <a href="/archives/100/2/">2</a>
        </div>"#;

        assert_eq!(
            pages(html, "https://a.jp/archives/100"),
            vec!["https://a.jp/archives/100", "https://a.jp/archives/100/2"]
        );
    }

    #[test]
    fn test_rel_next() {
        let html = r#"<html><head>
            <link rel="next" href="https://a.jp/original/624941/2/">
        </head><body></body></html>"#;

        assert_eq!(
            pages(html, "https://a.jp/original/624941/"),
            vec!["https://a.jp/original/624941/", "https://a.jp/original/624941/2/"]
        );
    }

    #[test]
    fn test_bare_numeric_anchors() {
        let html = r#"<body>
            <p><a href="/archives/100/2">2</a> <a href="/archives/100/3">3</a></p>
            <footer><a href="/ranking/5">5</a></footer>
        </body>"#;

        assert_eq!(
            pages(html, "https://a.jp/archives/100"),
            vec![
                "https://a.jp/archives/100",
                "https://a.jp/archives/100/2",
                "https://a.jp/archives/100/3",
            ]
        );
    }

    #[test]
    fn test_next_page_text() {
        let html = r#"<body>
            <a href="/archives/100/2">Next Page &raquo;</a>
        </body>"#;

        assert_eq!(
            pages(html, "https://a.jp/archives/100"),
            vec!["https://a.jp/archives/100", "https://a.jp/archives/100/2"]
        );
    }

    #[test]
    fn test_no_pagination_yields_only_self() {
        let html = "<body><p>one page story</p></body>";
        assert_eq!(
            pages(html, "https://a.jp/archives/100"),
            vec!["https://a.jp/archives/100"]
        );
    }
}
