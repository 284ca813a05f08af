//! Disk-backed thumbnail cache for a single source file.
//!
//! Cache files are named `<title>-<signature>.jpg`, where the signature is
//! derived from the source's absolute path, length, and modification time.
//! Editing the source changes the signature, so stale entries are simply
//! never looked up again.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use sha2::{Digest, Sha256};
use streamdir_common::{Error, Result};
use tokio::sync::Mutex;

use super::extractor::FrameExtractor;

/// Seek offsets tried in order when no others are configured.
pub const DEFAULT_SEEK_OFFSETS: &[&str] = &["00:00:10", "00:00:01"];

/// Directory name used under the system temp dir by default.
pub const DEFAULT_CACHE_DIR_NAME: &str = "streamdir-thumbnails";

/// Distinguishes in-flight extractions within this process.
static PARTIAL_SEQ: AtomicU64 = AtomicU64::new(0);

/// Where the cache lives and how frames are pulled.
#[derive(Debug, Clone)]
pub struct ThumbnailSettings {
    pub cache_dir: PathBuf,
    pub seek_offsets: Vec<String>,
}

impl Default for ThumbnailSettings {
    fn default() -> Self {
        Self {
            cache_dir: std::env::temp_dir().join(DEFAULT_CACHE_DIR_NAME),
            seek_offsets: DEFAULT_SEEK_OFFSETS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Identity of a source file at a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SourceSignature {
    hash: String,
    modified: SystemTime,
}

/// Thumbnail cache owned by one streaming server.
pub struct ThumbnailCache {
    source: PathBuf,
    safe_title: String,
    settings: ThumbnailSettings,
    extractor: Arc<dyn FrameExtractor>,
    generation: Mutex<()>,
}

impl ThumbnailCache {
    pub fn new(
        source: PathBuf,
        title: &str,
        settings: ThumbnailSettings,
        extractor: Arc<dyn FrameExtractor>,
    ) -> Self {
        Self {
            source,
            safe_title: sanitize(title),
            settings,
            extractor,
            generation: Mutex::new(()),
        }
    }

    /// Return the path of an up-to-date thumbnail, extracting one if needed.
    ///
    /// Extraction runs under a per-cache lock, so concurrent callers wait for
    /// a single extraction instead of launching their own.
    pub async fn get_thumbnail(&self) -> Result<PathBuf> {
        let signature = self.signature().await?;
        let path = self.cache_path(&signature);

        if is_fresh(&path, &signature).await {
            tracing::debug!("Thumbnail cache hit: {}", path.display());
            return Ok(path);
        }

        let _guard = self.generation.lock().await;

        // Another caller may have filled the cache while we waited.
        if is_fresh(&path, &signature).await {
            return Ok(path);
        }

        tokio::fs::create_dir_all(&self.settings.cache_dir)
            .await
            .map_err(|e| {
                tracing::warn!(
                    "Cannot create thumbnail directory {}: {e}",
                    self.settings.cache_dir.display()
                );
                Error::Io(e)
            })?;

        self.extract_into(&path).await?;
        tracing::info!("Thumbnail generated: {}", path.display());
        Ok(path)
    }

    /// Cache file for the source as it is right now.
    pub async fn current_cache_path(&self) -> Result<PathBuf> {
        let signature = self.signature().await?;
        Ok(self.cache_path(&signature))
    }

    async fn extract_into(&self, path: &Path) -> Result<()> {
        let partial = partial_path(path);
        let mut last_error =
            Error::ThumbnailToolUnavailable("no seek offsets configured".to_string());

        for seek in &self.settings.seek_offsets {
            match self.extractor.extract_frame(&self.source, seek, &partial).await {
                Ok(()) if non_empty(&partial).await => {
                    tokio::fs::rename(&partial, path).await?;
                    return Ok(());
                }
                Ok(()) => {
                    tracing::debug!("{} produced no frame at {seek}", self.extractor.name());
                    last_error = Error::tool(self.extractor.name(), format!("empty output at {seek}"));
                }
                Err(e) => {
                    tracing::debug!("{} failed at {seek}: {e}", self.extractor.name());
                    last_error = e;
                }
            }
        }

        let _ = tokio::fs::remove_file(&partial).await;
        Err(last_error)
    }

    async fn signature(&self) -> Result<SourceSignature> {
        let meta = tokio::fs::metadata(&self.source).await?;
        let modified = meta.modified()?;
        let absolute = std::path::absolute(&self.source)?;
        let millis = modified
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);

        let key = format!("{}|{}|{}", absolute.display(), meta.len(), millis);
        let digest = Sha256::digest(key.as_bytes());
        Ok(SourceSignature {
            hash: hex::encode(&digest[..8]),
            modified,
        })
    }

    fn cache_path(&self, signature: &SourceSignature) -> PathBuf {
        self.settings
            .cache_dir
            .join(format!("{}-{}.jpg", self.safe_title, signature.hash))
    }
}

/// A cache file is usable if it is non-empty and not older than the source.
async fn is_fresh(path: &Path, signature: &SourceSignature) -> bool {
    match tokio::fs::metadata(path).await {
        Ok(meta) => {
            meta.len() > 0
                && meta
                    .modified()
                    .map(|m| m >= signature.modified)
                    .unwrap_or(false)
        }
        Err(_) => false,
    }
}

/// Scratch file next to `path`, unique across processes sharing the cache.
fn partial_path(path: &Path) -> PathBuf {
    let seq = PARTIAL_SEQ.fetch_add(1, Ordering::Relaxed);
    path.with_extension(format!("{}-{seq}.partial.jpg", std::process::id()))
}

async fn non_empty(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.len() > 0)
        .unwrap_or(false)
}

fn sanitize(title: &str) -> String {
    title
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
