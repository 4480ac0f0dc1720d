//! Comic scraper library for pulling manga page images out of blog articles.
//!
//! This library follows an article and its paginated pages, walks on to
//! later chapters, downloads the images it finds and keeps the ones that
//! look like real manga pages.

pub mod assemble;
pub mod collector;
pub mod episode;
pub mod error;
pub mod export;
pub mod fetch;
pub mod html;
pub mod observer;
pub mod pipeline;
pub mod validate;

pub use assemble::{assemble, Assembly};
pub use collector::{ChapterCollector, Collection};
pub use episode::EpisodeAggregator;
pub use error::{DecodeError, FetchError, Rejection, StructureMismatch};
pub use fetch::HttpClient;
pub use observer::{Event, Narrator, Observer, Silent};
pub use pipeline::{ComicScraper, ScrapeSettings};
pub use validate::{ValidationRules, Validator};
