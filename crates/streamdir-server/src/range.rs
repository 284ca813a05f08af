//! Byte-range resolution for `Range` request headers.
//!
//! Only the first `bytes=<start>-<end>` range in the header is honoured.
//! Headers that do not contain one are ignored and the whole file is served;
//! they are never rejected.

use std::sync::LazyLock;

use regex::Regex;

static RANGE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)bytes=(\d*)-(\d*)").expect("range pattern is a valid regex")
});

/// The slice of a file a response will carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    /// Offset of the first byte.
    pub start: u64,
    /// Number of bytes; zero only for the full range of an empty file.
    pub length: u64,
    /// Whether the client asked for this range explicitly (`206`).
    pub partial: bool,
}

/// The requested range lies outside the file (`416`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeNotSatisfiable;

impl ByteRange {
    /// The whole file, served as a plain `200`.
    pub fn full(file_len: u64) -> Self {
        Self {
            start: 0,
            length: file_len,
            partial: false,
        }
    }

    fn partial(start: u64, end_inclusive: u64) -> Self {
        Self {
            start,
            length: end_inclusive - start + 1,
            partial: true,
        }
    }

    /// Inclusive offset of the last byte, `None` for an empty range.
    pub fn end(&self) -> Option<u64> {
        self.length.checked_sub(1).map(|n| self.start + n)
    }

    /// Value of the `Content-Range` header for a `206` response.
    pub fn content_range(&self, file_len: u64) -> String {
        let end = self.end().unwrap_or(self.start);
        format!("bytes {}-{}/{}", self.start, end, file_len)
    }
}

/// Resolve an optional `Range` header value against a file of `file_len`
/// bytes.
///
/// ```
/// use streamdir_server::range::{resolve, ByteRange};
///
/// assert_eq!(resolve(None, 50), Ok(ByteRange::full(50)));
/// assert_eq!(resolve(Some("bytes=-100"), 50).unwrap().length, 50);
/// assert!(resolve(Some("bytes=1000-"), 50).is_err());
/// ```
pub fn resolve(header: Option<&str>, file_len: u64) -> Result<ByteRange, RangeNotSatisfiable> {
    let Some(value) = header.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(ByteRange::full(file_len));
    };
    let Some(caps) = RANGE_PATTERN.captures(value) else {
        return Ok(ByteRange::full(file_len));
    };

    let start = caps.get(1).map_or("", |m| m.as_str());
    let end = caps.get(2).map_or("", |m| m.as_str());

    match (start.is_empty(), end.is_empty()) {
        (true, true) => Ok(ByteRange::full(file_len)),
        (true, false) => {
            let suffix: u64 = end.parse().map_err(|_| RangeNotSatisfiable)?;
            if suffix == 0 || file_len == 0 {
                return Err(RangeNotSatisfiable);
            }
            let suffix = suffix.min(file_len);
            Ok(ByteRange::partial(file_len - suffix, file_len - 1))
        }
        (false, _) => {
            let start: u64 = start.parse().map_err(|_| RangeNotSatisfiable)?;
            if start >= file_len {
                return Err(RangeNotSatisfiable);
            }
            let last = file_len - 1;
            let end = if end.is_empty() {
                last
            } else {
                let end: u64 = end.parse().map_err(|_| RangeNotSatisfiable)?;
                if end < start {
                    return Err(RangeNotSatisfiable);
                }
                end.min(last)
            };
            Ok(ByteRange::partial(start, end))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_header_is_full_file() {
        let range = resolve(None, 1000).unwrap();
        assert_eq!(range, ByteRange::full(1000));
        assert!(!range.partial);
        assert_eq!(range.end(), Some(999));
    }

    #[test]
    fn test_blank_header_is_full_file() {
        assert_eq!(resolve(Some("   "), 10), Ok(ByteRange::full(10)));
    }

    #[test]
    fn test_open_ended_from_zero_is_partial() {
        let range = resolve(Some("bytes=0-"), 1000).unwrap();
        assert!(range.partial);
        assert_eq!((range.start, range.end()), (0, Some(999)));
    }

    #[test]
    fn test_closed_range() {
        let range = resolve(Some("bytes=100-199"), 2048).unwrap();
        assert_eq!((range.start, range.length), (100, 100));
        assert_eq!(range.content_range(2048), "bytes 100-199/2048");
    }

    #[test]
    fn test_end_is_clamped() {
        let range = resolve(Some("bytes=10-5000"), 50).unwrap();
        assert_eq!((range.start, range.end()), (10, Some(49)));
    }

    #[test]
    fn test_suffix_longer_than_file_serves_everything() {
        let range = resolve(Some("bytes=-100"), 50).unwrap();
        assert!(range.partial);
        assert_eq!((range.start, range.length), (0, 50));
    }

    #[test]
    fn test_suffix_within_file() {
        let range = resolve(Some("bytes=-200"), 1000).unwrap();
        assert_eq!((range.start, range.end()), (800, Some(999)));
    }

    #[test]
    fn test_zero_suffix_is_unsatisfiable() {
        assert_eq!(resolve(Some("bytes=-0"), 50), Err(RangeNotSatisfiable));
    }

    #[test]
    fn test_start_past_end_is_unsatisfiable() {
        assert_eq!(resolve(Some("bytes=1000-"), 50), Err(RangeNotSatisfiable));
        assert_eq!(resolve(Some("bytes=50-"), 50), Err(RangeNotSatisfiable));
    }

    #[test]
    fn test_inverted_range_is_unsatisfiable() {
        assert_eq!(resolve(Some("bytes=10-5"), 50), Err(RangeNotSatisfiable));
    }

    #[test]
    fn test_malformed_headers_are_ignored() {
        assert_eq!(resolve(Some("bytes=-"), 50), Ok(ByteRange::full(50)));
        assert_eq!(resolve(Some("bytes=abc-def"), 50), Ok(ByteRange::full(50)));
        assert_eq!(resolve(Some("items=0-10"), 50), Ok(ByteRange::full(50)));
        assert_eq!(resolve(Some("garbage"), 50), Ok(ByteRange::full(50)));
    }

    #[test]
    fn test_unit_is_case_insensitive() {
        let range = resolve(Some("BYTES=5-9"), 50).unwrap();
        assert_eq!((range.start, range.length), (5, 5));
    }

    #[test]
    fn test_only_first_range_is_used() {
        let range = resolve(Some("bytes=0-9, 20-29"), 50).unwrap();
        assert_eq!((range.start, range.length), (0, 10));
    }

    #[test]
    fn test_overflowing_numbers_are_unsatisfiable() {
        assert_eq!(
            resolve(Some("bytes=99999999999999999999999-"), 50),
            Err(RangeNotSatisfiable)
        );
    }

    #[test]
    fn test_empty_file() {
        let full = resolve(None, 0).unwrap();
        assert_eq!(full.length, 0);
        assert_eq!(full.end(), None);
        assert_eq!(resolve(Some("bytes=0-"), 0), Err(RangeNotSatisfiable));
        assert_eq!(resolve(Some("bytes=-10"), 0), Err(RangeNotSatisfiable));
    }
}
