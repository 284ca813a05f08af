//! Per-connection request handling.
//!
//! Each accepted socket serves exactly one request and is then closed.

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use http::StatusCode;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::range;
use crate::request::{self, Request, RequestHead};
use crate::response;
use crate::thumbnail::ThumbnailCache;

/// Size of each body write.
pub(crate) const CHUNK_SIZE: usize = 64 * 1024;

/// Everything a connection needs to answer a request.
pub(crate) struct ConnectionContext {
    pub title: String,
    pub file: PathBuf,
    pub content_type: &'static str,
    pub thumbnails: ThumbnailCache,
    pub request_timeout: Duration,
}

/// Serve one request on `stream`, then close it.
pub(crate) async fn handle(stream: TcpStream, peer: SocketAddr, ctx: Arc<ConnectionContext>) {
    let (read_half, mut writer) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let head = match tokio::time::timeout(ctx.request_timeout, request::read_head(&mut reader)).await
    {
        Ok(Ok(head)) => head,
        Ok(Err(e)) => {
            log_io_error(peer, &e);
            return;
        }
        Err(_) => {
            tracing::debug!("Request head from {peer} timed out");
            return;
        }
    };

    if let Err(e) = respond(head, &ctx, &mut writer).await {
        log_io_error(peer, &e);
    }
    let _ = writer.shutdown().await;
}

async fn respond<W>(head: RequestHead, ctx: &ConnectionContext, writer: &mut W) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let req = match head {
        RequestHead::Request(req) => req,
        RequestHead::Empty | RequestHead::Malformed => {
            return write_str(writer, &response::error(StatusCode::BAD_REQUEST)).await;
        }
    };

    if !req.method.eq_ignore_ascii_case("GET") {
        return write_str(writer, &response::error(StatusCode::METHOD_NOT_ALLOWED)).await;
    }

    match req.path.as_str() {
        "/" | "/stream" => serve_file(&req, ctx, writer).await,
        "/thumbnail" => serve_thumbnail(ctx, writer).await,
        _ => write_str(writer, &response::error(StatusCode::NOT_FOUND)).await,
    }
}

async fn serve_file<W>(req: &Request, ctx: &ConnectionContext, writer: &mut W) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut file = match tokio::fs::File::open(&ctx.file).await {
        Ok(f) => f,
        Err(e) => {
            tracing::warn!("Cannot open {} for '{}': {e}", ctx.file.display(), ctx.title);
            return write_str(writer, &response::error(StatusCode::INTERNAL_SERVER_ERROR)).await;
        }
    };
    let file_len = match file.metadata().await {
        Ok(meta) => meta.len(),
        Err(e) => {
            tracing::warn!("Cannot stat {}: {e}", ctx.file.display());
            return write_str(writer, &response::error(StatusCode::INTERNAL_SERVER_ERROR)).await;
        }
    };

    let range = match range::resolve(req.range.as_deref(), file_len) {
        Ok(r) => r,
        Err(_) => {
            tracing::debug!(
                "Unsatisfiable range {:?} for '{}' ({file_len} bytes)",
                req.range,
                ctx.title
            );
            return write_str(writer, &response::range_not_satisfiable(file_len)).await;
        }
    };

    write_str(writer, &response::content_head(&range, file_len, ctx.content_type)).await?;
    if range.length == 0 {
        return writer.flush().await;
    }

    file.seek(io::SeekFrom::Start(range.start)).await?;
    copy_exact(&mut file, writer, range.length).await
}

async fn serve_thumbnail<W>(ctx: &ConnectionContext, writer: &mut W) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let path = match ctx.thumbnails.get_thumbnail().await {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!("Thumbnail unavailable for '{}': {e}", ctx.title);
            return write_str(
                writer,
                &response::error_with_reason(StatusCode::SERVICE_UNAVAILABLE, "Thumbnail Unavailable"),
            )
            .await;
        }
    };

    let bytes = match tokio::fs::read(&path).await {
        Ok(b) => b,
        Err(e) => {
            tracing::warn!("Cannot read thumbnail {}: {e}", path.display());
            return write_str(
                writer,
                &response::error_with_reason(StatusCode::SERVICE_UNAVAILABLE, "Thumbnail Unavailable"),
            )
            .await;
        }
    };

    write_str(writer, &response::thumbnail_head(bytes.len() as u64)).await?;
    writer.write_all(&bytes).await?;
    writer.flush().await
}

/// Copy `remaining` bytes from `file` in chunks. Stops early if the file
/// shrank underneath us.
async fn copy_exact<W>(file: &mut tokio::fs::File, writer: &mut W, mut remaining: u64) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; CHUNK_SIZE];
    while remaining > 0 {
        let want = remaining.min(CHUNK_SIZE as u64) as usize;
        let n = file.read(&mut buf[..want]).await?;
        if n == 0 {
            tracing::debug!("File ended with {remaining} bytes still promised");
            break;
        }
        writer.write_all(&buf[..n]).await?;
        remaining -= n as u64;
    }
    writer.flush().await
}

async fn write_str<W>(writer: &mut W, s: &str) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(s.as_bytes()).await?;
    writer.flush().await
}

/// Clients routinely drop connections mid-body while seeking.
fn log_io_error(peer: SocketAddr, e: &io::Error) {
    match e.kind() {
        io::ErrorKind::ConnectionReset
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::UnexpectedEof => {
            tracing::info!("Client {peer} disconnected: {e}");
        }
        _ => tracing::warn!("Connection error with {peer}: {e}"),
    }
}
