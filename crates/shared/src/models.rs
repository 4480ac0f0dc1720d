//! Data models for the extraction pipeline.
//!
//! This module defines the values passed between pipeline stages, from the
//! images pulled out of markup to the records written next to the archive.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

/// Image reference pulled out of one page, before chapter/page indexing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedImage {
    pub url: Url,
    pub alt_text: String,
}

/// Image reference placed within a chapter, not yet downloaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageCandidate {
    pub url: Url,
    pub alt_text: String,
    pub chapter_index: u32, // 1-based
    pub page_index: u32,    // 1-based, restarts every chapter
}

impl ImageCandidate {
    /// Place an extracted image at a chapter/page position
    pub fn place(image: ExtractedImage, chapter_index: u32, page_index: u32) -> Self {
        Self {
            url: image.url,
            alt_text: image.alt_text,
            chapter_index,
            page_index,
        }
    }
}

/// Candidate whose bytes were fetched and passed every acceptance rule
#[derive(Debug, Clone)]
pub struct ValidatedImage {
    pub candidate: ImageCandidate,
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub byte_size: usize,
}

/// All images of one chapter plus the link onward, if any was found
#[derive(Debug, Clone, Default)]
pub struct ChapterResult {
    pub images: Vec<ImageCandidate>,
    pub next_chapter_url: Option<Url>,
}

/// Counters describing one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub chapters_requested: u32,
    pub chapters_resolved: u32,
    pub candidates: usize,
    pub validated: usize,
    pub kept: usize,
}

/// Terminal artifact handed to export
#[derive(Debug, Clone, Default)]
pub struct RunResult {
    pub validated_images: Vec<ValidatedImage>,
    pub per_chapter_counts: BTreeMap<u32, usize>,
    pub stats: RunStats,
}

impl RunResult {
    /// Build a result from validated images, counting per chapter
    pub fn new(validated_images: Vec<ValidatedImage>, stats: RunStats) -> Self {
        let mut result = Self {
            validated_images,
            per_chapter_counts: BTreeMap::new(),
            stats,
        };
        result.stats.kept = result.validated_images.len();
        result.recount();
        result
    }

    /// Keep at most `max` images in their original order.
    ///
    /// Returns true when images were dropped. Counts reflect the kept set.
    pub fn truncate(&mut self, max: usize) -> bool {
        if self.validated_images.len() <= max {
            return false;
        }
        self.validated_images.truncate(max);
        self.stats.kept = self.validated_images.len();
        self.recount();
        true
    }

    pub fn is_empty(&self) -> bool {
        self.validated_images.is_empty()
    }

    fn recount(&mut self) {
        self.per_chapter_counts.clear();
        for image in &self.validated_images {
            *self
                .per_chapter_counts
                .entry(image.candidate.chapter_index)
                .or_insert(0) += 1;
        }
    }
}

/// One row of the exported image listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingEntry {
    pub chapter: u32,
    pub page: u32,
    pub url: String,
    pub alt: String,
    pub width: u32,
    pub height: u32,
    pub size_bytes: usize,
    pub archive_path: String,
}

/// Run-level metadata written next to a persisted run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    pub run_id: String,
    pub url: String,
    pub chapters_requested: u32,
    pub chapters_resolved: u32,
    pub min_image_size_bytes: usize,
    pub max_images_total: usize,
    pub total_candidates: usize,
    pub total_extracted: usize,
    pub chapter_counts: BTreeMap<u32, usize>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validated(chapter: u32, page: u32, n: usize) -> ValidatedImage {
        let url = Url::parse(&format!("https://example.com/uploads/{n}.jpg")).unwrap();
        ValidatedImage {
            candidate: ImageCandidate {
                url,
                alt_text: String::new(),
                chapter_index: chapter,
                page_index: page,
            },
            bytes: vec![0; 4],
            width: 800,
            height: 1200,
            byte_size: 4,
        }
    }

    #[test]
    fn test_counts_per_chapter() {
        let result = RunResult::new(
            vec![validated(1, 1, 1), validated(1, 2, 2), validated(2, 1, 3)],
            RunStats::default(),
        );
        assert_eq!(result.per_chapter_counts.get(&1), Some(&2));
        assert_eq!(result.per_chapter_counts.get(&2), Some(&1));
        assert_eq!(result.stats.kept, 3);
    }

    #[test]
    fn test_truncate_front_loads_earlier_chapters() {
        let mut result = RunResult::new(
            vec![validated(1, 1, 1), validated(1, 1, 2), validated(2, 1, 3)],
            RunStats::default(),
        );

        assert!(result.truncate(2));
        assert_eq!(result.validated_images.len(), 2);
        assert_eq!(result.per_chapter_counts.get(&2), None);
        assert_eq!(result.stats.kept, 2);

        assert!(!result.truncate(5));
    }

    #[test]
    fn test_metadata_serializes_counts_as_map() {
        let mut chapter_counts = BTreeMap::new();
        chapter_counts.insert(1, 12);
        let meta = RunMetadata {
            run_id: "20240101_000000_abcdef01".to_string(),
            url: "https://example.com/archives/1".to_string(),
            chapters_requested: 3,
            chapters_resolved: 1,
            min_image_size_bytes: 30_000,
            max_images_total: 120,
            total_candidates: 20,
            total_extracted: 12,
            chapter_counts,
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["chapter_counts"]["1"], 12);
        assert_eq!(json["chapters_resolved"], 1);
    }
}
