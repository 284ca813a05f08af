//! Path utilities for detecting file types by extension.
//!
//! The streaming server derives its `Content-Type` header from the served
//! file's extension; anything unrecognized is sent as opaque binary.

use std::path::Path;

/// Content type used when the extension is unknown.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// List of recognized video file extensions.
const VIDEO_EXTENSIONS: &[&str] = &[
    "mkv", "mp4", "avi", "m4v", "ts", "webm", "mov", "wmv", "flv", "ogv",
];

/// Check if a path has a video file extension.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use streamdir_common::paths::is_video_file;
///
/// assert!(is_video_file(Path::new("movie.MKV")));
/// assert!(!is_video_file(Path::new("notes.txt")));
/// ```
pub fn is_video_file(path: &Path) -> bool {
    extension(path)
        .map(|ext| VIDEO_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Determine the MIME type to advertise for a file.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use streamdir_common::paths::content_type_for;
///
/// assert_eq!(content_type_for(Path::new("a.mp4")), "video/mp4");
/// assert_eq!(content_type_for(Path::new("a.bin")), "application/octet-stream");
/// ```
pub fn content_type_for(path: &Path) -> &'static str {
    match extension(path).as_deref() {
        Some("mp4") | Some("m4v") => "video/mp4",
        Some("webm") => "video/webm",
        Some("ogv") => "video/ogg",
        Some("mkv") => "video/x-matroska",
        Some("avi") => "video/x-msvideo",
        Some("mov") => "video/quicktime",
        Some("ts") => "video/mp2t",
        Some("wmv") => "video/x-ms-wmv",
        Some("flv") => "video/x-flv",
        _ => OCTET_STREAM,
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}
