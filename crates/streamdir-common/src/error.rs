//! Common error types used throughout streamdir.
//!
//! All crates funnel their failures into [`Error`]. The directory RPC puts
//! [`Error::kind`] on the wire so remote callers can tell variants apart.

use std::path::PathBuf;
use std::time::Duration;

/// Unified error type covering all failure modes in streamdir.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A title, host, or port failed validation.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The file a streaming server was asked to serve is unusable.
    #[error("Invalid video file {}: {reason}", path.display())]
    InvalidVideoFile {
        /// The offending path.
        path: PathBuf,
        /// Why the file was rejected.
        reason: String,
    },

    /// `start()` was called on a server that is not stopped.
    #[error("Streaming server is already running")]
    AlreadyRunning,

    /// An operation that needs a running server was called on a stopped one.
    #[error("Streaming server is not running")]
    NotRunning,

    /// The directory service could not be reached or answered garbage.
    #[error("Directory unreachable: {0}")]
    DirectoryUnreachable(String),

    /// The frame-extraction tool could not be found or launched.
    #[error("Thumbnail tool unavailable: {0}")]
    ThumbnailToolUnavailable(String),

    /// The frame-extraction tool ran past its deadline and was killed.
    #[error("Thumbnail extraction timed out after {0:?}")]
    ThumbnailTimeout(Duration),

    /// An external tool ran but failed.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Short machine-readable name of the variant, used on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidArgument(_) => "InvalidArgument",
            Error::InvalidVideoFile { .. } => "InvalidVideoFile",
            Error::AlreadyRunning => "AlreadyRunning",
            Error::NotRunning => "NotRunning",
            Error::DirectoryUnreachable(_) => "DirectoryUnreachable",
            Error::ThumbnailToolUnavailable(_) => "ThumbnailToolUnavailable",
            Error::ThumbnailTimeout(_) => "ThumbnailTimeout",
            Error::Tool { .. } => "Tool",
            Error::Io(_) => "Io",
        }
    }

    /// Create a new InvalidArgument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a new InvalidVideoFile error.
    pub fn invalid_video_file(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidVideoFile {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a new DirectoryUnreachable error.
    pub fn directory_unreachable<S: Into<String>>(msg: S) -> Self {
        Self::DirectoryUnreachable(msg.into())
    }

    /// Create a new Tool error.
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
