//! Walks consecutive chapters through their next-chapter links.

use crate::episode::EpisodeAggregator;
use crate::observer::{Event, Narrator};
use shared::ImageCandidate;
use std::collections::HashSet;
use tracing::{info, warn};
use url::Url;

/// Candidates gathered over all visited chapters
#[derive(Debug, Clone, Default)]
pub struct Collection {
    /// Chapter order, then page order, then document order
    pub candidates: Vec<ImageCandidate>,
    /// Number of chapters actually visited
    pub chapters_resolved: u32,
}

/// Multi-chapter driver over [`EpisodeAggregator`]
#[derive(Debug, Clone, Copy)]
pub struct ChapterCollector<'a> {
    aggregator: EpisodeAggregator<'a>,
    narrator: Narrator<'a>,
}

impl<'a> ChapterCollector<'a> {
    pub fn new(aggregator: EpisodeAggregator<'a>, narrator: Narrator<'a>) -> Self {
        Self {
            aggregator,
            narrator,
        }
    }

    /// Collect up to `chapters` chapters starting at `start_url`.
    ///
    /// Stops early when a chapter has no next link. An image URL appearing in
    /// more than one chapter is kept only where it first appeared.
    pub async fn collect(&self, start_url: &Url, chapters: u32) -> Collection {
        let mut collection = Collection::default();
        let mut seen: HashSet<Url> = HashSet::new();
        let mut url = start_url.clone();

        for chapter in 1..=chapters {
            info!(chapter, url = %url, "Collecting chapter");
            self.narrator.emit(Event::ChapterStarted {
                chapter,
                url: url.clone(),
            });

            let result = self.aggregator.collect_chapter(&url, chapter).await;
            collection.chapters_resolved = chapter;

            let before = collection.candidates.len();
            collection.candidates.extend(
                result
                    .images
                    .into_iter()
                    .filter(|candidate| seen.insert(candidate.url.clone())),
            );
            let added = collection.candidates.len() - before;

            if added == 0 {
                warn!(chapter, url = %url, "Chapter produced no image candidates");
            }
            self.narrator.emit(Event::ChapterFinished {
                chapter,
                images: added,
            });

            match result.next_chapter_url {
                Some(next) => url = next,
                None => {
                    if chapter < chapters {
                        info!(chapter, "No next chapter link, stopping");
                        self.narrator.emit(Event::LastChapterReached { chapter });
                    }
                    break;
                }
            }
        }

        info!(
            chapters = collection.chapters_resolved,
            candidates = collection.candidates.len(),
            "Chapter collection finished"
        );
        collection
    }
}
