//! Comic Scraper CLI application.

use anyhow::{Context, Result};
use clap::Parser;
use comic_scraper::export::{build_listing, build_metadata, persist_run, write_downloads};
use comic_scraper::{assemble, ComicScraper, Event, HttpClient, Observer, ScrapeSettings};
use shared::{Config, DataPaths};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// URL of the first chapter's article
    url: String,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Number of chapters to follow
    #[arg(long)]
    chapters: Option<u32>,

    /// Minimum image size in kilobytes
    #[arg(long)]
    min_size_kb: Option<u64>,

    /// Maximum number of images kept
    #[arg(long)]
    max_images: Option<usize>,

    /// Parallel image downloads
    #[arg(long)]
    workers: Option<usize>,

    /// Also store images and metadata under a per-run directory
    #[arg(long)]
    save: bool,

    /// Enable verbose logging and decision narration
    #[arg(short, long)]
    verbose: bool,

    /// Write the effective configuration (after overrides) back to --config
    #[arg(long)]
    write_config: bool,
}

/// Reports progress and narration through the log
struct LogObserver;

impl Observer for LogObserver {
    fn on_event(&self, event: &Event) {
        info!("{}", event);
    }

    fn on_progress(&self, completed: usize, total: usize) {
        if completed % 10 == 0 || completed == total {
            info!(
                progress = format!("{}/{}", completed, total),
                "Downloading images"
            );
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = Config::from_file(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if let Some(chapters) = args.chapters {
        config.extraction.chapters = chapters;
    }
    if let Some(kb) = args.min_size_kb {
        config.extraction.min_image_size_kb = kb;
    }
    if let Some(max) = args.max_images {
        config.extraction.max_images_total = max;
    }
    if let Some(workers) = args.workers {
        config.extraction.parallel_downloads = workers;
    }
    config.extraction.chapters = config.extraction.chapters.max(1);
    if args.save {
        config.output.save_run = true;
    }

    // Initialize logging
    let log_level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        shared::logging::parse_level(&config.logging.default_level)
    };

    shared::logging::init(shared::LogConfig {
        log_dir: config.log_dir().to_string_lossy().to_string(),
        component: "comic-scraper".to_string(),
        default_level: log_level,
        console: config.logging.console,
        file: config.logging.file,
        json_format: config.logging.json_format,
    })?;

    info!("Comic Scraper starting");
    info!(config_file = %args.config.display(), "Loaded configuration");

    if args.write_config {
        config
            .save(&args.config)
            .with_context(|| format!("Failed to write config to {}", args.config.display()))?;
    }

    let start_url = Url::parse(args.url.trim())
        .with_context(|| format!("Invalid start URL: {}", args.url))?;

    // Initialize HTTP client and pipeline
    let http = HttpClient::new(Duration::from_secs(config.extraction.request_timeout_secs))?;
    let settings = ScrapeSettings::from_config(&config.extraction, args.verbose);
    let scraper = ComicScraper::new(http, settings);

    // Run extraction
    let result = scraper
        .run(&start_url, config.extraction.chapters, &LogObserver)
        .await;

    if result.stats.candidates == 0 {
        warn!("No images found on the page. The site structure may not be supported.");
        return Ok(());
    }
    if result.is_empty() {
        warn!(
            candidates = result.stats.candidates,
            "Images were found but none passed the filters. Try a lower --min-size-kb."
        );
        return Ok(());
    }

    // Export
    let data_paths = DataPaths::new(config.output_dir());
    let run_id = DataPaths::new_run_id();

    let assembly = assemble(&result.validated_images).context("Failed to build image archive")?;
    let listing = build_listing(&result, &assembly);
    let downloads = write_downloads(&data_paths, &run_id, &assembly, &listing)?;

    if config.output.save_run {
        let metadata = build_metadata(
            &run_id,
            &start_url,
            &result,
            config.extraction.min_image_bytes(),
            config.extraction.max_images_total,
        );
        let run_dir = persist_run(&data_paths, &run_id, &result, &assembly, &listing, &metadata)?;
        info!(run_dir = %run_dir.display(), "Run saved");
    }

    // Display final statistics
    info!("=== Extraction Complete ===");
    info!(
        "Chapters: {}/{}",
        result.stats.chapters_resolved, result.stats.chapters_requested
    );
    for (chapter, count) in &result.per_chapter_counts {
        info!("Chapter {}: {} images", chapter, count);
    }
    info!("Candidates: {}", result.stats.candidates);
    info!("Validated: {}", result.stats.validated);
    info!("Kept: {}", result.stats.kept);
    if result.stats.kept < result.stats.validated {
        warn!(
            "Only the first {} of {} images were kept",
            result.stats.kept, result.stats.validated
        );
    }
    info!("Archive: {}", downloads.archive.display());
    info!("Listing: {}", downloads.listing.display());

    info!("Comic Scraper finished successfully");

    Ok(())
}
