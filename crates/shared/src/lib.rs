//! Shared library for the comic image extraction workspace.
//!
//! This crate provides common functionality used by the scraper crate:
//! - Configuration management
//! - Data models passed between pipeline stages
//! - Output path utilities
//! - Logging infrastructure

pub mod config;
pub mod logging;
pub mod models;
pub mod paths;

// Re-export commonly used types
pub use config::Config;
pub use logging::LogConfig;
pub use models::*;
pub use paths::{DataPaths, IMAGES_DIR};

/// Common result type using anyhow::Error
pub type Result<T> = anyhow::Result<T>;
