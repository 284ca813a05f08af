//! Response head builders.
//!
//! Every response closes the connection, so each head carries
//! `Connection: close` and an exact `Content-Length`.

use http::StatusCode;

use crate::range::ByteRange;

/// `Cache-Control` sent with thumbnails.
pub const THUMBNAIL_CACHE_CONTROL: &str = "public, max-age=300";

/// Head for a file-content response (`200` or `206`).
pub fn content_head(range: &ByteRange, file_len: u64, content_type: &str) -> String {
    let status = if range.partial {
        StatusCode::PARTIAL_CONTENT
    } else {
        StatusCode::OK
    };

    let mut head = status_line(status, reason(status));
    head.push_str(&format!("Content-Type: {content_type}\r\n"));
    head.push_str("Accept-Ranges: bytes\r\n");
    head.push_str("Connection: close\r\n");
    head.push_str(&format!("Content-Length: {}\r\n", range.length));
    if range.partial {
        head.push_str(&format!("Content-Range: {}\r\n", range.content_range(file_len)));
    }
    head.push_str("\r\n");
    head
}

/// Full `416` response for a file of `file_len` bytes.
pub fn range_not_satisfiable(file_len: u64) -> String {
    let status = StatusCode::RANGE_NOT_SATISFIABLE;
    let mut head = status_line(status, reason(status));
    head.push_str(&format!("Content-Range: bytes */{file_len}\r\n"));
    head.push_str("Connection: close\r\n");
    head.push_str("Content-Length: 0\r\n\r\n");
    head
}

/// Head for a JPEG thumbnail of `len` bytes.
pub fn thumbnail_head(len: u64) -> String {
    let mut head = status_line(StatusCode::OK, "OK");
    head.push_str("Content-Type: image/jpeg\r\n");
    head.push_str(&format!("Cache-Control: {THUMBNAIL_CACHE_CONTROL}\r\n"));
    head.push_str("Connection: close\r\n");
    head.push_str(&format!("Content-Length: {len}\r\n\r\n"));
    head
}

/// Complete plain-text error response using the canonical reason phrase.
pub fn error(status: StatusCode) -> String {
    error_with_reason(status, reason(status))
}

/// Complete plain-text error response with a custom reason phrase.
pub fn error_with_reason(status: StatusCode, reason: &str) -> String {
    let body = format!("{} {}\n", status.as_u16(), reason);
    let mut response = status_line(status, reason);
    response.push_str("Content-Type: text/plain; charset=utf-8\r\n");
    response.push_str("Connection: close\r\n");
    response.push_str(&format!("Content-Length: {}\r\n\r\n", body.len()));
    response.push_str(&body);
    response
}

fn status_line(status: StatusCode, reason: &str) -> String {
    format!("HTTP/1.1 {} {}\r\n", status.as_u16(), reason)
}

fn reason(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("Unknown")
}
