//! Output files of a run: the archive, its listing and optional persistence.

use crate::assemble::Assembly;
use anyhow::{Context, Result};
use chrono::Utc;
use shared::{DataPaths, ListingEntry, RunMetadata, RunResult};
use std::path::{Path, PathBuf};
use tracing::info;
use url::Url;

/// Listing rows for the kept images, in archive order
pub fn build_listing(result: &RunResult, assembly: &Assembly) -> Vec<ListingEntry> {
    result
        .validated_images
        .iter()
        .zip(&assembly.paths)
        .map(|(image, path)| ListingEntry {
            chapter: image.candidate.chapter_index,
            page: image.candidate.page_index,
            url: image.candidate.url.to_string(),
            alt: image.candidate.alt_text.clone(),
            width: image.width,
            height: image.height,
            size_bytes: image.byte_size,
            archive_path: path.clone(),
        })
        .collect()
}

/// Run-level metadata for a persisted run
pub fn build_metadata(
    run_id: &str,
    start_url: &Url,
    result: &RunResult,
    min_image_size_bytes: usize,
    max_images_total: usize,
) -> RunMetadata {
    RunMetadata {
        run_id: run_id.to_string(),
        url: start_url.to_string(),
        chapters_requested: result.stats.chapters_requested,
        chapters_resolved: result.stats.chapters_resolved,
        min_image_size_bytes,
        max_images_total,
        total_candidates: result.stats.candidates,
        total_extracted: result.stats.kept,
        chapter_counts: result.per_chapter_counts.clone(),
        created_at: Utc::now(),
    }
}

/// Files written for download
#[derive(Debug, Clone)]
pub struct Downloads {
    pub archive: PathBuf,
    pub listing: PathBuf,
}

/// Write the archive and its JSON listing to the output root
pub fn write_downloads(
    paths: &DataPaths,
    run_id: &str,
    assembly: &Assembly,
    listing: &[ListingEntry],
) -> Result<Downloads> {
    paths
        .create_dirs()
        .with_context(|| format!("Failed to create output directory: {}", paths.root().display()))?;

    let archive = paths.archive_file(run_id);
    std::fs::write(&archive, &assembly.archive)
        .with_context(|| format!("Failed to write archive: {}", archive.display()))?;

    let listing_path = paths.listing_file(run_id);
    write_json(&listing_path, listing)?;

    info!(
        archive = %archive.display(),
        listing = %listing_path.display(),
        "Downloads written"
    );

    Ok(Downloads {
        archive,
        listing: listing_path,
    })
}

/// Store images, listing and metadata under the run's own directory
pub fn persist_run(
    paths: &DataPaths,
    run_id: &str,
    result: &RunResult,
    assembly: &Assembly,
    listing: &[ListingEntry],
    metadata: &RunMetadata,
) -> Result<PathBuf> {
    let images_dir = paths.run_images_dir(run_id);
    std::fs::create_dir_all(&images_dir)
        .with_context(|| format!("Failed to create run directory: {}", images_dir.display()))?;

    let run_dir = paths.run_dir(run_id);
    for (image, archive_path) in result.validated_images.iter().zip(&assembly.paths) {
        let target = run_dir.join(archive_path);
        std::fs::write(&target, &image.bytes)
            .with_context(|| format!("Failed to write image: {}", target.display()))?;
    }

    write_json(&paths.run_listing(run_id), listing)?;
    write_json(&paths.run_metadata(run_id), metadata)?;

    info!(
        run_dir = %run_dir.display(),
        images = result.validated_images.len(),
        "Run persisted"
    );

    Ok(run_dir)
}

fn write_json<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value).context("Failed to serialize JSON")?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write file: {}", path.display()))
}
