//! Per-item failure types.
//!
//! None of these abort a run: a failing page or image only contributes
//! nothing to the result.

use reqwest::StatusCode;
use thiserror::Error;

/// Network failure, timeout or non-success HTTP status
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with status {status}")]
    Status { url: String, status: StatusCode },
}

/// Bytes that are not a readable image
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unrecognized image format")]
    UnknownFormat,

    #[error("unreadable image dimensions: {0}")]
    Dimensions(#[from] image::ImageError),
}

/// No heuristic tier matched on a page
#[derive(Debug, Error)]
#[error("no {stage} heuristic matched")]
pub struct StructureMismatch {
    pub stage: &'static str,
}

/// Why a candidate did not become a validated image
#[derive(Debug, Error)]
pub enum Rejection {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("{size} bytes is below the {min} byte minimum")]
    TooSmall { size: usize, min: usize },

    #[error("aspect ratio {width}x{height} is too wide")]
    TooWide { width: u32, height: u32 },

    #[error("{width}x{height} is below the minimum dimension")]
    TooSmallDimensions { width: u32, height: u32 },
}
