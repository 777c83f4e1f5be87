//! Image handling for captured documents
//!
//! - [`ImageExtractor`] finds image references in HTML or Markdown and
//!   rewrites them between remote URLs, local paths and servable URLs
//! - [`ImageDownloader`] fetches images into content-addressed files

mod downloader;
mod extractor;

pub use downloader::{
    image_extension, image_filename, write_image, ImageDownloader, ALLOWED_IMAGE_EXTENSIONS,
    DEFAULT_IMAGE_EXTENSION,
};
pub use extractor::{
    ImageExtractor, ImageReference, ReferenceKind, DEFAULT_SERVING_ROUTE, LOCAL_IMAGES_MARKER,
};
