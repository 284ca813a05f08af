//! The [`DirectoryService`] trait.

use streamdir_common::{Result, VideoLocation};

/// A registry mapping stream titles to network locations.
///
/// Titles are trimmed before use and must not be blank. Implementations must
/// be safe to share across threads and tolerate any number of concurrent
/// callers without external locking.
#[async_trait::async_trait]
pub trait DirectoryService: Send + Sync {
    /// Publish `title` at `host:port`, replacing any previous location for the
    /// same title.
    ///
    /// Fails with [`streamdir_common::Error::InvalidArgument`] for a blank
    /// title or host, or port 0.
    async fn register(&self, title: &str, host: &str, port: u16) -> Result<()>;

    /// Withdraw `title`. Unknown titles are ignored.
    async fn unregister(&self, title: &str) -> Result<()>;

    /// Look up a title. Absence is `Ok(None)`, not an error.
    async fn get(&self, title: &str) -> Result<Option<VideoLocation>>;

    /// Every registered location, sorted by title (case-insensitive).
    async fn list(&self) -> Result<Vec<VideoLocation>>;
}
