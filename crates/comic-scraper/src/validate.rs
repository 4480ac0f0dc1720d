//! Concurrent download and acceptance checks for image candidates.
//!
//! Every candidate gets its own task, bounded by a semaphore. Tasks finish in
//! any order; results are put back into input order before returning.

use crate::error::{DecodeError, Rejection};
use crate::fetch::HttpClient;
use crate::observer::{Event, Narrator};
use image::{ImageFormat, ImageReader};
use shared::{ImageCandidate, ValidatedImage};
use std::io::Cursor;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Shortest accepted side, in pixels
pub const MIN_DIMENSION: u32 = 200;

/// Widest accepted width/height ratio
pub const MAX_ASPECT_RATIO: f64 = 3.0;

/// Acceptance thresholds for downloaded bytes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidationRules {
    pub min_bytes: usize,
    pub min_dimension: u32,
    pub max_aspect_ratio: f64,
}

impl ValidationRules {
    pub fn with_min_bytes(min_bytes: usize) -> Self {
        Self {
            min_bytes,
            min_dimension: MIN_DIMENSION,
            max_aspect_ratio: MAX_ASPECT_RATIO,
        }
    }

    /// Check downloaded bytes, returning the image dimensions on success.
    ///
    /// Rules apply in order: byte size, readability, aspect ratio, then the
    /// minimum side. Only the header is decoded.
    pub fn check(&self, bytes: &[u8]) -> Result<(u32, u32), Rejection> {
        if bytes.len() < self.min_bytes {
            return Err(Rejection::TooSmall {
                size: bytes.len(),
                min: self.min_bytes,
            });
        }

        let (_, width, height) = probe(bytes)?;

        let ratio = if height > 0 {
            f64::from(width) / f64::from(height)
        } else {
            0.0
        };
        if ratio > self.max_aspect_ratio {
            return Err(Rejection::TooWide { width, height });
        }

        if width < self.min_dimension || height < self.min_dimension {
            return Err(Rejection::TooSmallDimensions { width, height });
        }

        Ok((width, height))
    }
}

/// Read format and dimensions from an image header
pub fn probe(bytes: &[u8]) -> Result<(ImageFormat, u32, u32), DecodeError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|_| DecodeError::UnknownFormat)?;
    let format = reader.format().ok_or(DecodeError::UnknownFormat)?;
    let (width, height) = reader.into_dimensions()?;
    Ok((format, width, height))
}

/// Downloads candidates concurrently and keeps the acceptable ones
#[derive(Debug, Clone)]
pub struct Validator {
    http: HttpClient,
    rules: ValidationRules,
    workers: usize,
}

impl Validator {
    pub fn new(http: HttpClient, rules: ValidationRules, workers: usize) -> Self {
        Self {
            http,
            rules,
            workers: workers.max(1),
        }
    }

    /// Validate all candidates, sending `referer` with every download.
    ///
    /// The result keeps input order. Progress is reported once per finished
    /// task.
    pub async fn validate(
        &self,
        candidates: Vec<ImageCandidate>,
        referer: &str,
        narrator: &Narrator<'_>,
    ) -> Vec<ValidatedImage> {
        let total = candidates.len();
        if total == 0 {
            return Vec::new();
        }

        info!(total, workers = self.workers, "Validating image candidates");

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let referer: Arc<str> = Arc::from(referer);
        let mut tasks = JoinSet::new();

        for (index, candidate) in candidates.into_iter().enumerate() {
            let http = self.http.clone();
            let rules = self.rules;
            let semaphore = Arc::clone(&semaphore);
            let referer = Arc::clone(&referer);

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let url = candidate.url.clone();
                let outcome = download(&http, candidate, &referer, rules).await;
                (index, url, outcome)
            });
        }

        let mut slots: Vec<Option<ValidatedImage>> = (0..total).map(|_| None).collect();
        let mut completed = 0;

        while let Some(joined) = tasks.join_next().await {
            completed += 1;
            narrator.progress(completed, total);

            match joined {
                Ok((index, url, Ok(image))) => {
                    debug!(url = %url, width = image.width, height = image.height, "Image accepted");
                    narrator.emit(Event::CandidateValidated { url });
                    slots[index] = Some(image);
                }
                Ok((_, url, Err(rejection))) => {
                    debug!(url = %url, reason = %rejection, "Image rejected");
                    narrator.emit(Event::CandidateRejected {
                        url,
                        reason: rejection.to_string(),
                    });
                }
                Err(e) => {
                    warn!(error = %e, "Validation task failed");
                }
            }
        }

        let validated: Vec<ValidatedImage> = slots.into_iter().flatten().collect();
        info!(total, validated = validated.len(), "Validation finished");
        validated
    }
}

async fn download(
    http: &HttpClient,
    candidate: ImageCandidate,
    referer: &str,
    rules: ValidationRules,
) -> Result<ValidatedImage, Rejection> {
    let bytes = http.fetch_image(&candidate.url, referer).await?;
    let (width, height) = rules.check(&bytes)?;
    let byte_size = bytes.len();

    Ok(ValidatedImage {
        candidate,
        bytes,
        width,
        height,
        byte_size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::testing::Recorder;
    use httpmock::prelude::*;
    use image::{Rgb, RgbImage};
    use std::time::Duration;
    use url::Url;

    /// PNG with noisy pixels so it does not compress below the size threshold
    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut state: u32 = 0x2545_f491;
        let img = RgbImage::from_fn(width, height, |_, _| {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            let [r, g, b, _] = state.to_le_bytes();
            Rgb([r, g, b])
        });
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    fn rules() -> ValidationRules {
        ValidationRules::with_min_bytes(1000)
    }

    #[test]
    fn test_probe_reads_header() {
        let (format, width, height) = probe(&png(320, 240)).unwrap();
        assert_eq!(format, ImageFormat::Png);
        assert_eq!((width, height), (320, 240));
    }

    #[test]
    fn test_too_small_bytes() {
        let err = rules().check(b"tiny junk").unwrap_err();
        assert!(matches!(err, Rejection::TooSmall { size: 9, min: 1000 }));
    }

    #[test]
    fn test_unreadable_bytes() {
        let err = rules().check(&[0x42; 4096]).unwrap_err();
        assert!(matches!(err, Rejection::Decode(_)));
    }

    #[test]
    fn test_aspect_ratio_boundary() {
        assert!(matches!(
            rules().check(&png(600, 150)),
            Err(Rejection::TooWide { .. })
        ));
        assert_eq!(rules().check(&png(600, 300)).unwrap(), (600, 300));
        assert_eq!(rules().check(&png(600, 200)).unwrap(), (600, 200));
        // Tall strips pass the ratio check; 150 only fails the minimum side
        assert_eq!(rules().check(&png(200, 600)).unwrap(), (200, 600));
        assert!(matches!(
            rules().check(&png(150, 600)),
            Err(Rejection::TooSmallDimensions { width: 150, height: 600 })
        ));
    }

    #[test]
    fn test_minimum_side() {
        assert!(matches!(
            rules().check(&png(199, 400)),
            Err(Rejection::TooSmallDimensions { width: 199, height: 400 })
        ));
        assert_eq!(rules().check(&png(200, 400)).unwrap(), (200, 400));
    }

    #[tokio::test]
    async fn test_results_keep_input_order() {
        let server = MockServer::start();
        let slow = server.mock(|when, then| {
            when.method(GET).path("/uploads/a.png");
            then.status(200)
                .delay(Duration::from_millis(300))
                .body(png(300, 400));
        });
        let rejected = server.mock(|when, then| {
            when.method(GET).path("/uploads/b.png");
            then.status(200).body(png(900, 200));
        });
        let fast = server.mock(|when, then| {
            when.method(GET).path("/uploads/c.png");
            then.status(200).body(png(400, 300));
        });
        server.mock(|when, then| {
            when.method(GET).path("/uploads/d.png");
            then.status(404);
        });

        let candidates: Vec<ImageCandidate> = ["a", "b", "c", "d"]
            .iter()
            .enumerate()
            .map(|(i, name)| ImageCandidate {
                url: Url::parse(&server.url(format!("/uploads/{name}.png"))).unwrap(),
                alt_text: String::new(),
                chapter_index: 1,
                page_index: i as u32 + 1,
            })
            .collect();

        let http = HttpClient::new(Duration::from_secs(5)).unwrap();
        let validator = Validator::new(http, rules(), 4);
        let recorder = Recorder::default();
        let narrator = Narrator::new(&recorder, true);

        let validated = validator
            .validate(candidates, &server.base_url(), &narrator)
            .await;

        slow.assert();
        rejected.assert();
        fast.assert();

        let names: Vec<&str> = validated
            .iter()
            .map(|image| image.candidate.url.path())
            .collect();
        assert_eq!(names, vec!["/uploads/a.png", "/uploads/c.png"]);
        assert_eq!((validated[0].width, validated[0].height), (300, 400));
        assert_eq!(validated[1].byte_size, validated[1].bytes.len());

        let progress = recorder.progress.lock().unwrap().clone();
        assert_eq!(progress, vec![(1, 4), (2, 4), (3, 4), (4, 4)]);

        let rejections = recorder
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|event| matches!(event, Event::CandidateRejected { .. }))
            .count();
        assert_eq!(rejections, 2);
    }

    #[tokio::test]
    async fn test_single_worker_downloads_one_at_a_time() {
        let server = MockServer::start();
        for name in ["a", "b"] {
            server.mock(|when, then| {
                when.method(GET).path(format!("/uploads/{name}.png"));
                then.status(200)
                    .delay(Duration::from_millis(250))
                    .body(png(300, 300));
            });
        }

        let candidates: Vec<ImageCandidate> = ["a", "b"]
            .iter()
            .map(|name| ImageCandidate {
                url: Url::parse(&server.url(format!("/uploads/{name}.png"))).unwrap(),
                alt_text: String::new(),
                chapter_index: 1,
                page_index: 1,
            })
            .collect();

        let http = HttpClient::new(Duration::from_secs(5)).unwrap();
        let validator = Validator::new(http, rules(), 1);

        let started = std::time::Instant::now();
        let validated = validator
            .validate(candidates, &server.base_url(), &Narrator::quiet())
            .await;

        assert_eq!(validated.len(), 2);
        assert!(started.elapsed() >= Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_empty_input() {
        let http = HttpClient::new(Duration::from_secs(1)).unwrap();
        let validator = Validator::new(http, rules(), 0);
        let validated = validator
            .validate(Vec::new(), "http://localhost", &Narrator::quiet())
            .await;
        assert!(validated.is_empty());
    }
}
