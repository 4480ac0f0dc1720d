//! Collection of one chapter across its pages.
//!
//! Pages are fetched one at a time in page order. What a page contributes is
//! computed by [`inspect_page`] without I/O and folded into a [`ChapterState`]
//! accumulator, so each step can be tested on its own.

use crate::fetch::HttpClient;
use crate::html::{discover_pages, extract_images, find_next_chapter, locate_content, page_key};
use crate::observer::{Event, Narrator};
use scraper::Html;
use shared::{ChapterResult, ExtractedImage, ImageCandidate};
use std::collections::HashSet;
use tracing::{debug, warn};
use url::Url;

/// Which discoveries to run on a page besides image extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inspect {
    pub pages: bool,
    pub next_chapter: bool,
}

/// Everything one page contributes to its chapter
#[derive(Debug, Clone, Default)]
pub struct PageFindings {
    pub images: Vec<ExtractedImage>,
    /// Sorted pages of the article; empty unless requested
    pub pages: Vec<Url>,
    pub next_chapter: Option<Url>,
}

/// Parse a page and run the requested heuristics on it
pub fn inspect_page(
    body: &str,
    page_url: &Url,
    inspect: Inspect,
    narrator: &Narrator<'_>,
) -> PageFindings {
    let document = Html::parse_document(body);
    let region = locate_content(&document, narrator);
    let images = extract_images(region, page_url, narrator);

    let next_chapter = if inspect.next_chapter {
        find_next_chapter(&document, page_url, narrator).ok()
    } else {
        None
    };

    let pages = if inspect.pages {
        discover_pages(&document, page_url, narrator)
    } else {
        Vec::new()
    };

    debug!(
        url = %page_url,
        images = images.len(),
        pages = pages.len(),
        next_chapter = next_chapter.is_some(),
        "Page inspected"
    );

    PageFindings {
        images,
        pages,
        next_chapter,
    }
}

/// State threaded through the pages of one chapter
#[derive(Debug, Clone)]
pub struct ChapterState {
    chapter: u32,
    seen: HashSet<Url>,
    images: Vec<ImageCandidate>,
    next_chapter: Option<Url>,
}

impl ChapterState {
    pub fn new(chapter: u32) -> Self {
        Self {
            chapter,
            seen: HashSet::new(),
            images: Vec::new(),
            next_chapter: None,
        }
    }

    /// Fold one page into the chapter.
    ///
    /// Images already seen in this chapter are skipped; the first next-chapter
    /// link found is kept.
    pub fn absorb(mut self, page_index: u32, findings: PageFindings) -> Self {
        for image in findings.images {
            if self.seen.insert(image.url.clone()) {
                self.images
                    .push(ImageCandidate::place(image, self.chapter, page_index));
            }
        }

        if self.next_chapter.is_none() {
            self.next_chapter = findings.next_chapter;
        }

        self
    }

    pub fn has_next_chapter(&self) -> bool {
        self.next_chapter.is_some()
    }

    pub fn finish(self) -> ChapterResult {
        ChapterResult {
            images: self.images,
            next_chapter_url: self.next_chapter,
        }
    }
}

/// Collects all images of a chapter, following its pagination
#[derive(Debug, Clone, Copy)]
pub struct EpisodeAggregator<'a> {
    http: &'a HttpClient,
    narrator: Narrator<'a>,
}

impl<'a> EpisodeAggregator<'a> {
    pub fn new(http: &'a HttpClient, narrator: Narrator<'a>) -> Self {
        Self { http, narrator }
    }

    /// Collect chapter `chapter` starting at `start_url`.
    ///
    /// A failed start page yields an empty chapter without a next link; a
    /// failed later page contributes nothing.
    pub async fn collect_chapter(&self, start_url: &Url, chapter: u32) -> ChapterResult {
        let Some(body) = self.fetch(start_url).await else {
            return ChapterResult::default();
        };

        let mut first = inspect_page(
            &body,
            start_url,
            Inspect {
                pages: true,
                next_chapter: true,
            },
            &self.narrator,
        );
        let pages = std::mem::take(&mut first.pages);
        let mut state = ChapterState::new(chapter).absorb(1, first);

        let start_key = page_key(start_url);
        let rest = pages
            .into_iter()
            .filter(|page| page_key(page) != start_key);
        for (page_index, page_url) in (2u32..).zip(rest) {
            debug!(chapter, page = page_index, url = %page_url, "Fetching chapter page");

            let Some(body) = self.fetch(&page_url).await else {
                continue;
            };

            let findings = inspect_page(
                &body,
                &page_url,
                Inspect {
                    pages: false,
                    next_chapter: !state.has_next_chapter(),
                },
                &self.narrator,
            );
            state = state.absorb(page_index, findings);
        }

        state.finish()
    }

    async fn fetch(&self, url: &Url) -> Option<String> {
        match self.http.fetch_page(url).await {
            Ok(body) => Some(body),
            Err(e) => {
                warn!(url = %url, error = %e, "Failed to fetch page");
                self.narrator.emit(Event::PageFetchFailed {
                    url: url.clone(),
                    error: e.to_string(),
                });
                None
            }
        }
    }
}
