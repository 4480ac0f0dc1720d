//! File path utilities for organizing exported runs.
//!
//! Centralizes every path the exporter writes: downloadable archive and
//! listing files at the output root, and per-run directories for persisted
//! runs.

use chrono::Local;
use std::path::{Path, PathBuf};

/// Directory inside the archive and inside persisted runs holding images
pub const IMAGES_DIR: &str = "images";

/// File path manager for exported runs
#[derive(Debug, Clone)]
pub struct DataPaths {
    root: PathBuf,
}

impl DataPaths {
    /// Create a new DataPaths with the given output root
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Get the output root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    // ========== Downloadable artifacts ==========

    /// Get the image archive path for a run
    pub fn archive_file(&self, run_id: &str) -> PathBuf {
        self.root.join(format!("manga_images_{}.zip", run_id))
    }

    /// Get the image listing path for a run
    pub fn listing_file(&self, run_id: &str) -> PathBuf {
        self.root.join(format!("manga_images_{}.json", run_id))
    }

    // ========== Persisted runs ==========

    /// Get the directory of a persisted run
    pub fn run_dir(&self, run_id: &str) -> PathBuf {
        self.root.join(run_id)
    }

    /// Get the image directory of a persisted run
    pub fn run_images_dir(&self, run_id: &str) -> PathBuf {
        self.run_dir(run_id).join(IMAGES_DIR)
    }

    /// Get the listing path of a persisted run
    pub fn run_listing(&self, run_id: &str) -> PathBuf {
        self.run_dir(run_id).join("images.json")
    }

    /// Get the metadata path of a persisted run
    pub fn run_metadata(&self, run_id: &str) -> PathBuf {
        self.run_dir(run_id).join("meta.json")
    }

    // ========== Utility Methods ==========

    /// Create the output root
    pub fn create_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.root)
    }

    /// Create a run identifier: local timestamp plus a short random suffix
    pub fn new_run_id() -> String {
        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        format!("{}_{}", stamp, &suffix[..8])
    }
}
