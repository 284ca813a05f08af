//! Minimal HTTP/1.x request-head reader.
//!
//! Reads one request line and the header block that follows. Only the `Range`
//! header is kept; everything else is skipped.

use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

/// Longest request or header line accepted, in bytes.
const MAX_LINE: u64 = 8 * 1024;

/// Most header lines read before the request is rejected.
const MAX_HEADERS: usize = 100;

/// A parsed request head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Method exactly as sent.
    pub method: String,
    /// Path with any scheme, authority and query removed.
    pub path: String,
    /// Raw value of the last `Range` header, if any.
    pub range: Option<String>,
}

/// Outcome of reading a request head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestHead {
    /// The connection closed or sent a blank first line.
    Empty,
    /// The request line or headers could not be parsed.
    Malformed,
    Request(Request),
}

/// Read a request head from `reader`.
///
/// A blank or malformed request line is reported without reading further.
/// Socket errors other than bad data are returned as `Err`.
pub async fn read_head<R>(reader: &mut R) -> io::Result<RequestHead>
where
    R: AsyncBufRead + Unpin,
{
    let request_line = match read_line(reader).await {
        Ok(Some(line)) if !line.trim().is_empty() => line,
        Ok(_) => return Ok(RequestHead::Empty),
        Err(e) if e.kind() == io::ErrorKind::InvalidData => return Ok(RequestHead::Malformed),
        Err(e) => return Err(e),
    };

    let tokens: Vec<&str> = request_line.split_whitespace().collect();
    if tokens.len() < 3 {
        return Ok(RequestHead::Malformed);
    }
    let method = tokens[0].to_string();
    let path = extract_path(tokens[1]);

    let mut range = None;
    let mut count = 0;
    loop {
        let line = match read_line(reader).await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) if e.kind() == io::ErrorKind::InvalidData => return Ok(RequestHead::Malformed),
            Err(e) => return Err(e),
        };
        if line.is_empty() {
            break;
        }
        count += 1;
        if count > MAX_HEADERS {
            return Ok(RequestHead::Malformed);
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("range") {
                range = Some(value.trim().to_string());
            }
        }
    }

    Ok(RequestHead::Request(Request {
        method,
        path,
        range,
    }))
}

/// Reduce a request target to its path.
///
/// Absolute-form targets (`http://host:port/path`) lose their scheme and
/// authority, query strings are dropped, and an empty result becomes `/`.
pub fn extract_path(target: &str) -> String {
    let mut target = target.trim();

    if let Some(scheme_end) = target.find("://") {
        let after_scheme = &target[scheme_end + 3..];
        target = match after_scheme.find('/') {
            Some(slash) => &after_scheme[slash..],
            None => "/",
        };
    }

    if let Some(q) = target.find('?') {
        target = &target[..q];
    }

    if target.is_empty() {
        "/".to_string()
    } else {
        target.to_string()
    }
}

/// Read one line without its terminator. `Ok(None)` at end of input.
///
/// Bytes that are not valid UTF-8 are replaced rather than rejected.
async fn read_line<R>(reader: &mut R) -> io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let n = (&mut *reader).take(MAX_LINE).read_until(b'\n', &mut buf).await?;
    if n == 0 {
        return Ok(None);
    }
    if buf.last() != Some(&b'\n') && n as u64 >= MAX_LINE {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "line too long"));
    }
    while matches!(buf.last(), Some(b'\r' | b'\n')) {
        buf.pop();
    }
    Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    async fn parse(raw: &[u8]) -> RequestHead {
        let mut reader = BufReader::new(raw);
        read_head(&mut reader).await.unwrap()
    }

    #[tokio::test]
    async fn parses_get_with_range() {
        let head = parse(b"GET /stream HTTP/1.1\r\nHost: x\r\nrange: bytes=0-99\r\n\r\n").await;
        assert_eq!(
            head,
            RequestHead::Request(Request {
                method: "GET".into(),
                path: "/stream".into(),
                range: Some("bytes=0-99".into()),
            })
        );
    }

    #[tokio::test]
    async fn last_range_header_wins() {
        let head = parse(b"GET / HTTP/1.1\r\nRange: bytes=0-1\r\nRANGE: bytes=5-6\r\n\r\n").await;
        match head {
            RequestHead::Request(req) => assert_eq!(req.range.as_deref(), Some("bytes=5-6")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn headers_may_end_at_eof() {
        let head = parse(b"GET /thumbnail HTTP/1.0\r\nAccept: */*\r\n").await;
        assert!(matches!(head, RequestHead::Request(ref r) if r.path == "/thumbnail"));
    }

    #[tokio::test]
    async fn empty_and_blank_lines() {
        assert_eq!(parse(b"").await, RequestHead::Empty);
        assert_eq!(parse(b"\r\n").await, RequestHead::Empty);
        assert_eq!(parse(b"   \r\n").await, RequestHead::Empty);
    }

    #[tokio::test]
    async fn short_request_line_is_malformed() {
        assert_eq!(parse(b"GET /\r\n\r\n").await, RequestHead::Malformed);
    }

    #[tokio::test]
    async fn overlong_line_is_malformed() {
        let mut raw = b"GET /".to_vec();
        raw.extend(std::iter::repeat(b'a').take(10_000));
        raw.extend_from_slice(b" HTTP/1.1\r\n\r\n");
        assert_eq!(parse(&raw).await, RequestHead::Malformed);
    }

    #[tokio::test]
    async fn non_utf8_header_is_ignored() {
        let head = parse(b"GET /stream HTTP/1.1\r\nUser-Agent: caf\xe9\r\nRange: bytes=0-9\r\n\r\n").await;
        assert_eq!(
            head,
            RequestHead::Request(Request {
                method: "GET".into(),
                path: "/stream".into(),
                range: Some("bytes=0-9".into()),
            })
        );
    }

    #[tokio::test]
    async fn method_is_kept_verbatim() {
        match parse(b"post / HTTP/1.1\r\n\r\n").await {
            RequestHead::Request(req) => assert_eq!(req.method, "post"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn extract_path_variants() {
        assert_eq!(extract_path("/stream"), "/stream");
        assert_eq!(extract_path("/stream?t=10"), "/stream");
        assert_eq!(extract_path("http://host:9000/thumbnail"), "/thumbnail");
        assert_eq!(extract_path("https://host:9000"), "/");
        assert_eq!(extract_path("http://host/?x=1"), "/");
        assert_eq!(extract_path("?x=1"), "/");
        assert_eq!(extract_path(""), "/");
    }
}
