//! Main extraction orchestrator.
//!
//! Coordinates the whole run: collect candidates over chapters, download and
//! validate them, then cap the result.

use crate::collector::ChapterCollector;
use crate::episode::EpisodeAggregator;
use crate::fetch::{origin_of, HttpClient};
use crate::observer::{Narrator, Observer};
use crate::validate::{ValidationRules, Validator};
use shared::config::ExtractionConfig;
use shared::{RunResult, RunStats};
use tracing::{info, warn};
use url::Url;

/// Tunables for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeSettings {
    pub min_image_bytes: usize,
    pub max_images_total: usize,
    pub parallel_downloads: usize,
    /// Forward decision events to the observer
    pub verbose: bool,
}

impl ScrapeSettings {
    pub fn from_config(config: &ExtractionConfig, verbose: bool) -> Self {
        Self {
            min_image_bytes: config.min_image_bytes(),
            max_images_total: config.max_images_total,
            parallel_downloads: config.parallel_downloads,
            verbose,
        }
    }
}

/// Main extraction coordinator
#[derive(Debug, Clone)]
pub struct ComicScraper {
    http: HttpClient,
    settings: ScrapeSettings,
}

impl ComicScraper {
    pub fn new(http: HttpClient, settings: ScrapeSettings) -> Self {
        Self { http, settings }
    }

    pub fn settings(&self) -> &ScrapeSettings {
        &self.settings
    }

    /// Run the complete extraction
    ///
    /// 1. Chapter collection, following next-chapter links
    /// 2. Concurrent download and validation
    /// 3. Truncation to the configured maximum
    ///
    /// Individual failures never abort the run; an empty result is valid.
    pub async fn run(&self, start_url: &Url, chapters: u32, observer: &dyn Observer) -> RunResult {
        let narrator = Narrator::new(observer, self.settings.verbose);
        let mut stats = RunStats {
            chapters_requested: chapters,
            ..Default::default()
        };

        info!(url = %start_url, chapters, "Starting extraction");

        // Phase 1: Collect candidates
        info!("Phase 1: Collecting image candidates");
        let aggregator = EpisodeAggregator::new(&self.http, narrator);
        let collection = ChapterCollector::new(aggregator, narrator)
            .collect(start_url, chapters)
            .await;

        stats.chapters_resolved = collection.chapters_resolved;
        stats.candidates = collection.candidates.len();

        if collection.candidates.is_empty() {
            warn!(url = %start_url, "No image candidates found");
            return RunResult::new(Vec::new(), stats);
        }

        let candidate_urls: Vec<String> = if self.settings.verbose {
            collection
                .candidates
                .iter()
                .map(|candidate| candidate.url.to_string())
                .collect()
        } else {
            Vec::new()
        };

        // Phase 2: Download and validate
        info!("Phase 2: Downloading and validating images");
        let validator = Validator::new(
            self.http.clone(),
            ValidationRules::with_min_bytes(self.settings.min_image_bytes),
            self.settings.parallel_downloads,
        );
        let referer = origin_of(start_url);
        let validated = validator
            .validate(collection.candidates, &referer, &narrator)
            .await;

        stats.validated = validated.len();

        if validated.is_empty() {
            warn!(
                candidates = stats.candidates,
                min_bytes = self.settings.min_image_bytes,
                "No image passed the filters"
            );
            for url in &candidate_urls {
                info!(url = %url, "Candidate before filtering");
            }
        }

        // Phase 3: Cap the result
        let mut result = RunResult::new(validated, stats);
        if result.truncate(self.settings.max_images_total) {
            warn!(
                validated = result.stats.validated,
                kept = result.stats.kept,
                "Result truncated to the configured maximum"
            );
        }

        info!(
            chapters_requested = result.stats.chapters_requested,
            chapters_resolved = result.stats.chapters_resolved,
            candidates = result.stats.candidates,
            validated = result.stats.validated,
            kept = result.stats.kept,
            "Extraction complete"
        );

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_from_config() {
        let config = ExtractionConfig {
            min_image_size_kb: 12,
            max_images_total: 7,
            parallel_downloads: 3,
            ..Default::default()
        };

        let settings = ScrapeSettings::from_config(&config, true);
        assert_eq!(
            settings,
            ScrapeSettings {
                min_image_bytes: 12_000,
                max_images_total: 7,
                parallel_downloads: 3,
                verbose: true,
            }
        );
    }
}
