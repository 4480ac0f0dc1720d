//! Discovery of the link to the next chapter.
//!
//! A next-chapter link leads to a different article. Links shaped like
//! intra-article pagination (`<current path>/<digits>`) are never accepted,
//! whichever strategy produced them.

use super::{compile, looks_like_intra_pagination, visible_text};
use crate::error::StructureMismatch;
use crate::observer::{Event, Narrator};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use url::Url;

static LABELED_BLOCK: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.page-text-body").expect("static selector is valid"));

/// Label text of the site-specific "next chapter" block
const BLOCK_LABEL: &str = "次の話";

/// Navigation widgets linking to the next post
static NAV_NEXT_SELECTORS: Lazy<Vec<(&'static str, Selector)>> = Lazy::new(|| {
    compile(&[
        "nav.post-navigation .nav-next a",
        "nav.navigation.post-navigation .nav-next a",
        ".post-navigation .nav-next a",
        ".navigation.post-navigation .nav-next a",
    ])
});

static ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a").expect("static selector is valid"));

/// "Next chapter" phrases; Latin ones compare case-insensitively
const NEXT_CHAPTER_PHRASES: &[&str] = &[
    "次の話",
    "次話",
    "次のエピソード",
    "next chapter",
    "next episode",
];

/// Find the single link to the chapter after the one at `page_url`.
pub fn find_next_chapter(
    document: &Html,
    page_url: &Url,
    narrator: &Narrator<'_>,
) -> Result<Url, StructureMismatch> {
    let candidates = labeled_block_links(document)
        .into_iter()
        .map(|href| ("labeled block", href))
        .chain(nav_next_links(document).map(|href| ("post navigation", href)))
        .chain(phrase_links(document).map(|href| ("link text", href)));

    for (strategy, href) in candidates {
        let Ok(url) = page_url.join(href) else {
            continue;
        };

        if looks_like_intra_pagination(page_url, &url) {
            narrator.emit(Event::NextChapterLooksLikePagination { url });
            continue;
        }

        narrator.emit(Event::NextChapterFound {
            strategy,
            url: url.clone(),
        });
        return Ok(url);
    }

    narrator.emit(Event::NextChapterMissing);
    Err(StructureMismatch {
        stage: "next chapter",
    })
}

/// Enclosing anchor of the labeled block, then the first anchor after it
fn labeled_block_links(document: &Html) -> Vec<&str> {
    let Some(block) = document
        .select(&LABELED_BLOCK)
        .find(|block| visible_text(*block, "").contains(BLOCK_LABEL))
    else {
        return Vec::new();
    };

    let enclosing = block
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|element| element.value().name() == "a")
        .and_then(|anchor| anchor.value().attr("href"));

    let following = document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .skip_while(|element| *element != block)
        .find(|element| element.value().name() == "a")
        .and_then(|anchor| anchor.value().attr("href"));

    enclosing.into_iter().chain(following).collect()
}

fn nav_next_links(document: &Html) -> impl Iterator<Item = &str> {
    NAV_NEXT_SELECTORS
        .iter()
        .filter_map(|(_, selector)| document.select(selector).next())
        .filter_map(|anchor| anchor.value().attr("href"))
}

fn phrase_links(document: &Html) -> impl Iterator<Item = &str> {
    document.select(&ANCHOR).filter_map(|anchor| {
        let href = anchor.value().attr("href").filter(|href| !href.is_empty())?;
        let text = visible_text(anchor, " ").to_lowercase();
        NEXT_CHAPTER_PHRASES
            .iter()
            .any(|phrase| text.contains(phrase))
            .then_some(href)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn next(html: &str, page: &str) -> Option<String> {
        let document = Html::parse_document(html);
        let page_url = Url::parse(page).unwrap();
        find_next_chapter(&document, &page_url, &Narrator::quiet())
            .ok()
            .map(|url| url.to_string())
    }

    #[test]
    fn test_labeled_block_inside_anchor() {
        let html = r#"<body>
            <a href="/archives/201"><div class="page-text-body">次の話＞＞</div></a>
        </body>"#;
        assert_eq!(
            next(html, "https://a.jp/archives/200").as_deref(),
            Some("https://a.jp/archives/201")
        );
    }

    #[test]
    fn test_labeled_block_followed_by_anchor() {
        let html = r#"<body>
            <div class="page-text-body">次の話</div>
            <p><a href="/archives/202">第3話</a></p>
        </body>"#;
        assert_eq!(
            next(html, "https://a.jp/archives/200").as_deref(),
            Some("https://a.jp/archives/202")
        );
    }

    #[test]
    fn test_post_navigation_widget() {
        let html = r#"<body>
            <nav class="navigation post-navigation">
                <div class="nav-previous"><a href="/archives/199">prev</a></div>
                <div class="nav-next"><a href="/archives/201">Chapter 2</a></div>
            </nav>
        </body>"#;
        assert_eq!(
            next(html, "https://a.jp/archives/200").as_deref(),
            Some("https://a.jp/archives/201")
        );
    }

    #[test]
    fn test_phrase_in_link_text() {
        let html = r#"<body>
            <a href="/archives/199">前の話</a>
            <a href="/archives/201">Next Chapter &gt;&gt;</a>
        </body>"#;
        assert_eq!(
            next(html, "https://a.jp/archives/200").as_deref(),
            Some("https://a.jp/archives/201")
        );
    }

    #[test]
    fn test_pagination_shape_is_never_next_chapter() {
        let html = r#"<body>
            <nav class="post-navigation">
                <div class="nav-next"><a href="/archives/200/2">次へ</a></div>
            </nav>
            <a href="/archives/200/3">次の話</a>
        </body>"#;
        assert_eq!(next(html, "https://a.jp/archives/200"), None);
    }

    #[test]
    fn test_pagination_shape_skipped_for_later_candidate() {
        let html = r#"<body>
            <a href="/archives/200/2">次の話</a>
            <a href="/archives/201">次話へ</a>
        </body>"#;
        assert_eq!(
            next(html, "https://a.jp/archives/200/").as_deref(),
            Some("https://a.jp/archives/201")
        );
    }

    #[test]
    fn test_missing_reports_structure_mismatch() {
        let document = Html::parse_document("<body><a href=\"/about\">about</a></body>");
        let page_url = Url::parse("https://a.jp/archives/200").unwrap();
        let err = find_next_chapter(&document, &page_url, &Narrator::quiet()).unwrap_err();
        assert_eq!(err.stage, "next chapter");
    }
}
