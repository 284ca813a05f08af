//! Thumbnail generation and caching.

mod cache;
mod extractor;

pub use cache::{ThumbnailCache, ThumbnailSettings, DEFAULT_CACHE_DIR_NAME, DEFAULT_SEEK_OFFSETS};
pub use extractor::{FfmpegExtractor, FrameExtractor};
