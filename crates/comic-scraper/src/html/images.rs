//! Image candidate extraction from a content region.

use crate::observer::{Event, ImageSkip, Narrator};
use once_cell::sync::Lazy;
use scraper::{node::Element, ElementRef, Selector};
use shared::ExtractedImage;
use std::collections::HashSet;
use url::Url;

static IMG: Lazy<Selector> = Lazy::new(|| Selector::parse("img").expect("static selector is valid"));

/// Direct and lazy-load source attributes, checked in order
const SOURCE_ATTRS: &[&str] = &[
    "src",
    "data-src",
    "data-lazy-src",
    "data-original",
    "data-full-url",
    "data-lazy",
    "data-image",
];

/// Source-set attributes; only their first URL token is used
const SRCSET_ATTRS: &[&str] = &["data-srcset", "data-lazy-srcset", "srcset"];

/// Substrings marking site chrome rather than content
const SKIP_PATTERNS: &[&str] = &[
    "icon",
    "logo",
    "avatar",
    "emoji",
    "button",
    "banner",
    "advertisement",
    "widget",
    "gravatar",
    "favicon",
    "sprite",
    "pixel",
    "tracking",
    "analytics",
    "1x1",
];

const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".webp", ".avif"];

const IMAGE_PATHS: &[&str] = &[
    "/uploads/",
    "/images/",
    "/wp-content/",
    "/img/",
    "/photo/",
    "/manga/",
    "/comic/",
];

const RESIZE_MARKERS: &[&str] = &["width=", "height=", "w=", "h=", "size=", "resize"];

/// Pull image candidates out of a content region, in document order.
///
/// Deterministic: the same region always yields the same list.
pub fn extract_images(
    region: ElementRef<'_>,
    page_url: &Url,
    narrator: &Narrator<'_>,
) -> Vec<ExtractedImage> {
    let mut seen = HashSet::new();
    let mut images = Vec::new();

    for img in region.select(&IMG) {
        let Some(url) = resolve_candidate(img, page_url, narrator) else {
            continue;
        };

        if !seen.insert(url.to_string()) {
            continue;
        }

        narrator.emit(Event::ImageAccepted { url: url.clone() });
        images.push(ExtractedImage {
            url,
            alt_text: img.value().attr("alt").unwrap_or_default().to_string(),
        });
    }

    images
}

fn resolve_candidate(img: ElementRef<'_>, page_url: &Url, narrator: &Narrator<'_>) -> Option<Url> {
    let Some(source) = source_of(img.value()) else {
        narrator.emit(Event::ImageSkipped {
            source: img.html(),
            reason: ImageSkip::MissingSource,
        });
        return None;
    };

    if source.starts_with("data:") {
        narrator.emit(Event::ImageSkipped {
            source: String::new(),
            reason: ImageSkip::DataUri,
        });
        return None;
    }

    let Ok(url) = page_url.join(source) else {
        narrator.emit(Event::ImageSkipped {
            source: source.to_string(),
            reason: ImageSkip::NoImageSignal,
        });
        return None;
    };

    let lowered = url.as_str().to_lowercase();
    if let Some(pattern) = SKIP_PATTERNS.iter().find(|p| lowered.contains(*p)) {
        narrator.emit(Event::ImageSkipped {
            source: url.to_string(),
            reason: ImageSkip::SkipPattern(*pattern),
        });
        return None;
    }

    if !has_image_signal(&lowered) {
        narrator.emit(Event::ImageSkipped {
            source: url.to_string(),
            reason: ImageSkip::NoImageSignal,
        });
        return None;
    }

    Some(url)
}

fn source_of(img: &Element) -> Option<&str> {
    SOURCE_ATTRS
        .iter()
        .filter_map(|attr| img.attr(attr))
        .map(str::trim)
        .find(|value| !value.is_empty())
        .or_else(|| {
            SRCSET_ATTRS
                .iter()
                .filter_map(|attr| img.attr(attr))
                .find_map(|value| value.split_whitespace().next())
        })
}

fn has_image_signal(lowered: &str) -> bool {
    IMAGE_EXTENSIONS.iter().any(|ext| lowered.contains(ext))
        || IMAGE_PATHS.iter().any(|path| lowered.contains(path))
        || RESIZE_MARKERS.iter().any(|marker| lowered.contains(marker))
}
