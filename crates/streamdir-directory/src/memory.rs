//! In-memory [`DirectoryService`] implementation.

use dashmap::DashMap;
use streamdir_common::{normalize_title, Result, VideoLocation};

use crate::service::DirectoryService;

/// Concurrent, process-local directory.
///
/// Entries live in a sharded [`DashMap`] keyed by the trimmed, lowercased
/// title. Each entry is an immutable [`VideoLocation`] swapped in whole, so a
/// reader sees either the old location or the new one, never a mix.
#[derive(Debug, Default)]
pub struct Directory {
    entries: DashMap<String, VideoLocation>,
}

impl Directory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered titles.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no titles are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn key(title: &str) -> Result<String> {
        Ok(normalize_title(title)?.to_lowercase())
    }
}

#[async_trait::async_trait]
impl DirectoryService for Directory {
    async fn register(&self, title: &str, host: &str, port: u16) -> Result<()> {
        let location = VideoLocation::new(title, host, port)?;
        let key = location.title.to_lowercase();

        match self.entries.insert(key, location.clone()) {
            None => tracing::info!("Video registered: {location}"),
            Some(_) => tracing::info!("Video updated: {location}"),
        }
        Ok(())
    }

    async fn unregister(&self, title: &str) -> Result<()> {
        let key = Self::key(title)?;
        if let Some((_, removed)) = self.entries.remove(&key) {
            tracing::info!("Video unregistered: {}", removed.title);
        }
        Ok(())
    }

    async fn get(&self, title: &str) -> Result<Option<VideoLocation>> {
        let key = Self::key(title)?;
        Ok(self.entries.get(&key).map(|entry| entry.value().clone()))
    }

    async fn list(&self) -> Result<Vec<VideoLocation>> {
        let mut videos: Vec<VideoLocation> = self
            .entries
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        videos.sort_by(|a, b| {
            a.title
                .to_lowercase()
                .cmp(&b.title.to_lowercase())
                .then_with(|| a.title.cmp(&b.title))
        });
        Ok(videos)
    }
}
