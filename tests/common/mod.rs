//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`], which owns an in-memory [`Directory`] and a temp
//! directory for fixture videos and thumbnails. Streams are started on
//! loopback ports and spoken to over raw TCP.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use streamdir_common::{Error, Result};
use streamdir_directory::{rpc, Directory, DirectoryService};
use streamdir_server::{FrameExtractor, StreamConfig, StreamingServer, ThumbnailSettings};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

/// Test harness wrapping an in-memory directory and a scratch directory.
pub struct TestHarness {
    pub directory: Arc<Directory>,
    pub dir: TempDir,
}

impl TestHarness {
    pub fn new() -> Self {
        Self {
            directory: Arc::new(Directory::new()),
            dir: tempfile::tempdir().expect("failed to create temp dir"),
        }
    }

    /// Write a fixture video and return its path.
    pub fn write_video(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, contents).expect("failed to write fixture");
        path
    }

    pub fn thumbnail_settings(&self) -> ThumbnailSettings {
        ThumbnailSettings {
            cache_dir: self.dir.path().join("thumbs"),
            ..ThumbnailSettings::default()
        }
    }

    /// Loopback stream config on a free port.
    pub fn stream_config(&self, file: &Path, title: &str) -> StreamConfig {
        let mut config = StreamConfig::new(file, title, free_port());
        config.bind_host = "127.0.0.1".into();
        config.advertise_host = "127.0.0.1".into();
        config.shutdown_grace = Duration::from_millis(500);
        config.request_timeout = Duration::from_secs(2);
        config
    }

    /// Build a stopped server registered against the harness directory.
    pub fn server(&self, file: &Path, title: &str, extractor: Arc<dyn FrameExtractor>) -> StreamingServer {
        StreamingServer::new(self.stream_config(file, title), self.directory.clone())
            .expect("valid stream config")
            .with_thumbnails(self.thumbnail_settings(), extractor)
    }

    /// Start a stream of `contents` and return it with its address.
    pub async fn with_stream(&self, name: &str, contents: &[u8]) -> (StreamingServer, SocketAddr) {
        let file = self.write_video(name, contents);
        let server = self.server(&file, name, Arc::new(FakeExtractor::succeeding()));
        server.start().await.expect("stream should start");
        let addr = server.local_addr().expect("running server has an address");
        (server, addr)
    }

    /// Serve the harness directory over RPC on a random port.
    pub async fn with_rpc(&self) -> (SocketAddr, CancellationToken) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");
        let cancel = CancellationToken::new();

        let directory: Arc<dyn DirectoryService> = self.directory.clone();
        let shutdown = cancel.clone();
        tokio::spawn(async move {
            rpc::serve(listener, directory, shutdown).await.ok();
        });

        (addr, cancel)
    }
}

/// A loopback port that was free a moment ago.
pub fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("failed to bind random port");
    listener.local_addr().expect("failed to get local addr").port()
}

/// Deterministic non-trivial file contents.
pub fn sample_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// Send `request` verbatim and read until the server closes.
pub async fn raw_request(addr: SocketAddr, request: &str) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.expect("failed to connect");
    stream
        .write_all(request.as_bytes())
        .await
        .expect("failed to write request");
    let mut out = Vec::new();
    stream
        .read_to_end(&mut out)
        .await
        .expect("failed to read response");
    out
}

/// `GET <path>` with an optional `Range` header.
pub async fn get(addr: SocketAddr, path: &str, range: Option<&str>) -> Response {
    let mut request = format!("GET {path} HTTP/1.1\r\nHost: {addr}\r\n");
    if let Some(range) = range {
        request.push_str(&format!("Range: {range}\r\n"));
    }
    request.push_str("\r\n");
    Response::parse(&raw_request(addr, &request).await)
}

/// A response split into status, headers and body.
#[derive(Debug)]
pub struct Response {
    pub status: u16,
    pub reason: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn parse(raw: &[u8]) -> Self {
        let split = raw
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .expect("response has a header terminator");
        let head = String::from_utf8_lossy(&raw[..split]).to_string();
        let body = raw[split + 4..].to_vec();

        let mut lines = head.split("\r\n");
        let status_line = lines.next().expect("status line");
        let mut parts = status_line.splitn(3, ' ');
        assert_eq!(parts.next(), Some("HTTP/1.1"));
        let status = parts
            .next()
            .and_then(|s| s.parse().ok())
            .expect("numeric status");
        let reason = parts.next().unwrap_or_default().to_string();

        let headers = lines
            .filter_map(|l| l.split_once(':'))
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            .collect();

        Self {
            status,
            reason,
            headers,
            body,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Frame extractor that writes a fixed payload, optionally failing on
/// chosen offsets.
pub struct FakeExtractor {
    pub failing: Vec<String>,
    pub calls: AtomicUsize,
    pub payload: Vec<u8>,
}

impl FakeExtractor {
    pub fn succeeding() -> Self {
        Self {
            failing: Vec::new(),
            calls: AtomicUsize::new(0),
            payload: b"\xFF\xD8\xFFfake-jpeg".to_vec(),
        }
    }

    pub fn failing_at(offsets: &[&str]) -> Self {
        Self {
            failing: offsets.iter().map(|s| s.to_string()).collect(),
            ..Self::succeeding()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl FrameExtractor for FakeExtractor {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn extract_frame(&self, _source: &Path, seek: &str, output: &Path) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.iter().any(|s| s == seek) {
            return Err(Error::tool("fake", format!("no frame at {seek}")));
        }
        tokio::fs::write(output, &self.payload).await?;
        Ok(())
    }
}
