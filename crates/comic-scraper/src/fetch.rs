//! HTTP access with browser-like headers.
//!
//! Both article pages and image bytes go through [`HttpClient`]. There are no
//! retries: a failed request is reported once and the caller moves on.

use crate::error::FetchError;
use anyhow::Context;
use encoding_rs::{Encoding, UTF_8};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, REFERER};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Desktop browser identity sent with every request
pub const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const PAGE_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8";
const IMAGE_ACCEPT: &str = "image/avif,image/webp,image/apng,image/svg+xml,image/*,*/*;q=0.8";
const ACCEPT_LANGUAGES: &str = "ja,en-US;q=0.9,en;q=0.8";

/// Default timeout for pages and images
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Bytes of a page scanned for a `<meta>` charset declaration
const SNIFF_LIMIT: usize = 4096;

static HEADER_CHARSET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)charset\s*=\s*["']?([a-z0-9_\-:.]+)"#).expect("static regex is valid")
});

/// Covers both `<meta charset=..>` and `<meta http-equiv=.. content="..; charset=..">`
static META_CHARSET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<meta[^>]*?charset\s*=\s*["']?\s*([a-z0-9_\-:.]+)"#)
        .expect("static regex is valid")
});

/// Shared HTTP client for pages and images
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Create a new client with the given per-request timeout
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    /// Fetch an article page, sending its own origin as referer
    pub async fn fetch_page(&self, url: &Url) -> Result<String, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(PAGE_ACCEPT));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGES));
        if let Ok(referer) = HeaderValue::from_str(&origin_of(url)) {
            headers.insert(REFERER, referer);
        }

        debug!(url = %url, "Fetching page");
        let response = self.send(url, headers).await?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let bytes = response.bytes().await.map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })?;

        Ok(decode_page(&bytes, content_type.as_deref()))
    }

    /// Fetch raw image bytes
    pub async fn fetch_image(&self, url: &Url, referer: &str) -> Result<Vec<u8>, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(IMAGE_ACCEPT));
        if let Ok(referer) = HeaderValue::from_str(referer) {
            headers.insert(REFERER, referer);
        }

        let response = self.send(url, headers).await?;
        let bytes = response.bytes().await.map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })?;
        Ok(bytes.to_vec())
    }

    async fn send(&self, url: &Url, headers: HeaderMap) -> Result<reqwest::Response, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .headers(headers)
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        Ok(response)
    }
}

/// Decode a page body.
///
/// The charset comes from the `Content-Type` header, else from a `<meta>`
/// declaration near the top of the document, else UTF-8. A byte order mark
/// overrides both.
pub fn decode_page(bytes: &[u8], content_type: Option<&str>) -> String {
    let encoding = content_type
        .and_then(|value| charset_label(&HEADER_CHARSET, value))
        .or_else(|| {
            let head = String::from_utf8_lossy(&bytes[..bytes.len().min(SNIFF_LIMIT)]);
            charset_label(&META_CHARSET, &head)
        })
        .unwrap_or(UTF_8);

    let (text, used, had_errors) = encoding.decode(bytes);
    if had_errors {
        debug!(encoding = used.name(), "Page contained undecodable bytes");
    }
    text.into_owned()
}

fn charset_label(pattern: &Regex, haystack: &str) -> Option<&'static Encoding> {
    let label = pattern.captures(haystack)?.get(1)?.as_str();
    Encoding::for_label(label.as_bytes())
}

/// `scheme://host[:port]` of a URL
pub fn origin_of(url: &Url) -> String {
    url.origin().ascii_serialization()
}
