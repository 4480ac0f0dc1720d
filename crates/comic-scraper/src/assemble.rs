//! Packs validated images into a zip archive.
//!
//! Archive entries are named from the image position and a running index so
//! that a plain name sort reproduces reading order.

use image::ImageFormat;
use shared::{ValidatedImage, IMAGES_DIR};
use std::collections::HashMap;
use std::io::{Cursor, Write};
use tracing::debug;
use zip::result::ZipResult;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Extension used when the bytes match no known signature
pub const DEFAULT_EXTENSION: &str = ".jpg";

/// An in-memory archive plus where each image landed in it
#[derive(Debug, Clone, Default)]
pub struct Assembly {
    pub archive: Vec<u8>,
    /// Entry path per image, parallel to the input slice
    pub paths: Vec<String>,
    /// Image URL to entry path
    pub by_url: HashMap<String, String>,
}

/// File extension from magic bytes, with its leading dot
pub fn extension_for(bytes: &[u8]) -> &'static str {
    match image::guess_format(bytes) {
        Ok(ImageFormat::Jpeg) => ".jpg",
        Ok(ImageFormat::Png) => ".png",
        Ok(ImageFormat::WebP) => ".webp",
        Ok(ImageFormat::Gif) => ".gif",
        Ok(ImageFormat::Avif) => ".avif",
        _ => DEFAULT_EXTENSION,
    }
}

/// Entry path for the `index`-th image (1-based) of the run
pub fn archive_path(chapter: u32, page: u32, index: usize, extension: &str) -> String {
    format!(
        "{}/ep{:02}_p{:03}_{:04}{}",
        IMAGES_DIR, chapter, page, index, extension
    )
}

/// Write every image into a deflate-compressed archive, in input order
pub fn assemble(images: &[ValidatedImage]) -> ZipResult<Assembly> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut paths = Vec::with_capacity(images.len());
    let mut by_url = HashMap::with_capacity(images.len());

    for (index, image) in images.iter().enumerate() {
        let path = archive_path(
            image.candidate.chapter_index,
            image.candidate.page_index,
            index + 1,
            extension_for(&image.bytes),
        );

        writer.start_file(path.as_str(), options)?;
        writer.write_all(&image.bytes)?;

        by_url.insert(image.candidate.url.to_string(), path.clone());
        paths.push(path);
    }

    let archive = writer.finish()?.into_inner();
    debug!(entries = paths.len(), bytes = archive.len(), "Archive assembled");

    Ok(Assembly {
        archive,
        paths,
        by_url,
    })
}
