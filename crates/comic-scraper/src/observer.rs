//! Side-channel listeners for progress and decision narration.
//!
//! Observers never influence results. Every event is also logged at DEBUG;
//! observers only receive events when the run is verbose.

use std::fmt;
use tracing::debug;
use url::Url;

/// Why an `<img>` element did not become a candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSkip {
    MissingSource,
    DataUri,
    SkipPattern(&'static str),
    NoImageSignal,
}

/// A decision point inside the pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    ChapterStarted { chapter: u32, url: Url },
    ChapterFinished { chapter: u32, images: usize },
    LastChapterReached { chapter: u32 },
    PageFetchFailed { url: Url, error: String },
    ContentRegion { selector: Option<&'static str> },
    ImageAccepted { url: Url },
    ImageSkipped { source: String, reason: ImageSkip },
    PaginationMatched { strategy: &'static str, links: usize },
    PaginationLinkDropped { url: Url, reason: &'static str },
    PagesListed { pages: Vec<Url> },
    NextChapterFound { strategy: &'static str, url: Url },
    NextChapterLooksLikePagination { url: Url },
    NextChapterMissing,
    CandidateValidated { url: Url },
    CandidateRejected { url: Url, reason: String },
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::ChapterStarted { chapter, url } => write!(f, "chapter {chapter}: {url}"),
            Event::ChapterFinished { chapter, images } => {
                write!(f, "chapter {chapter}: {images} image candidates")
            }
            Event::LastChapterReached { chapter } => {
                write!(f, "chapter {chapter} is the last one found")
            }
            Event::PageFetchFailed { url, error } => write!(f, "fetch failed {url}: {error}"),
            Event::ContentRegion { selector: Some(s) } => write!(f, "content region: {s}"),
            Event::ContentRegion { selector: None } => write!(f, "content region: whole body"),
            Event::ImageAccepted { url } => write!(f, "image accepted: {url}"),
            Event::ImageSkipped { source, reason } => {
                let source = truncate(source, 100);
                match reason {
                    ImageSkip::MissingSource => write!(f, "img without source: {source}"),
                    ImageSkip::DataUri => write!(f, "data URI skipped"),
                    ImageSkip::SkipPattern(p) => write!(f, "skip pattern '{p}': {source}"),
                    ImageSkip::NoImageSignal => write!(f, "not an image URL: {source}"),
                }
            }
            Event::PaginationMatched { strategy, links } => {
                write!(f, "pagination via {strategy} ({links} links)")
            }
            Event::PaginationLinkDropped { url, reason } => {
                write!(f, "pagination link dropped ({reason}): {url}")
            }
            Event::PagesListed { pages } => write!(f, "{} pages in article", pages.len()),
            Event::NextChapterFound { strategy, url } => {
                write!(f, "next chapter via {strategy}: {url}")
            }
            Event::NextChapterLooksLikePagination { url } => {
                write!(f, "next chapter candidate is pagination: {url}")
            }
            Event::NextChapterMissing => write!(f, "no next chapter link"),
            Event::CandidateValidated { url } => write!(f, "validated: {url}"),
            Event::CandidateRejected { url, reason } => write!(f, "rejected {url}: {reason}"),
        }
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Listener for run progress and narration
pub trait Observer: Send + Sync {
    /// Called at each decision point when the run is verbose
    fn on_event(&self, _event: &Event) {}

    /// Called once per finished download task
    fn on_progress(&self, _completed: usize, _total: usize) {}
}

/// Observer that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl Observer for Silent {}

/// Routes events to tracing and, when verbose, to an observer
#[derive(Clone, Copy)]
pub struct Narrator<'a> {
    observer: &'a dyn Observer,
    verbose: bool,
}

impl<'a> Narrator<'a> {
    pub fn new(observer: &'a dyn Observer, verbose: bool) -> Self {
        Self { observer, verbose }
    }

    /// Narrator that only logs
    pub fn quiet() -> Narrator<'static> {
        Narrator {
            observer: &Silent,
            verbose: false,
        }
    }

    pub fn emit(&self, event: Event) {
        debug!(%event, "pipeline event");
        if self.verbose {
            self.observer.on_event(&event);
        }
    }

    pub fn progress(&self, completed: usize, total: usize) {
        self.observer.on_progress(completed, total);
    }
}

impl fmt::Debug for Narrator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Narrator")
            .field("verbose", &self.verbose)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Observer that records everything it sees
    #[derive(Default)]
    pub struct Recorder {
        pub events: Mutex<Vec<Event>>,
        pub progress: Mutex<Vec<(usize, usize)>>,
    }

    impl Observer for Recorder {
        fn on_event(&self, event: &Event) {
            self.events.lock().unwrap().push(event.clone());
        }

        fn on_progress(&self, completed: usize, total: usize) {
            self.progress.lock().unwrap().push((completed, total));
        }
    }
}
