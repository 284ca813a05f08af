//! Streaming server lifecycle.
//!
//! A [`StreamingServer`] serves one file on one port. Starting it registers
//! the title with a directory; stopping it deregisters and drains in-flight
//! connections.

use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use streamdir_common::paths::content_type_for;
use streamdir_common::{normalize_host, normalize_title, validate_port, Error, Result};
use streamdir_directory::DirectoryService;
use tokio::net::TcpListener;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::connection::{self, ConnectionContext};
use crate::thumbnail::{FfmpegExtractor, FrameExtractor, ThumbnailCache, ThumbnailSettings};

/// Default wait for in-flight connections during `stop()`.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Default wait for a client to send its request head.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Static configuration for one stream.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// File to serve.
    pub file: PathBuf,
    /// Title advertised in the directory.
    pub title: String,
    /// Listening port, also advertised.
    pub port: u16,
    /// Host clients should connect to.
    pub advertise_host: String,
    /// Interface the listener binds.
    pub bind_host: String,
    pub shutdown_grace: Duration,
    pub request_timeout: Duration,
}

impl StreamConfig {
    pub fn new(file: impl Into<PathBuf>, title: impl Into<String>, port: u16) -> Self {
        Self {
            file: file.into(),
            title: title.into(),
            port,
            advertise_host: "localhost".to_string(),
            bind_host: "0.0.0.0".to_string(),
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Observable lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

struct RunningStream {
    local_addr: SocketAddr,
    cancel: CancellationToken,
    accept_task: JoinHandle<()>,
}

enum Lifecycle {
    Stopped,
    Starting,
    Running(RunningStream),
    Stopping,
}

impl Lifecycle {
    fn state(&self) -> ServerState {
        match self {
            Lifecycle::Stopped => ServerState::Stopped,
            Lifecycle::Starting => ServerState::Starting,
            Lifecycle::Running(_) => ServerState::Running,
            Lifecycle::Stopping => ServerState::Stopping,
        }
    }
}

/// Serves a single video file and keeps its directory entry in sync.
pub struct StreamingServer {
    config: StreamConfig,
    directory: Arc<dyn DirectoryService>,
    thumbnails: ThumbnailSettings,
    extractor: Arc<dyn FrameExtractor>,
    lifecycle: Mutex<Lifecycle>,
}

impl fmt::Debug for StreamingServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamingServer")
            .field("config", &self.config)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Puts an unfinished `start()` back to `Stopped`, withdrawing any
/// registration it may have made. Disarmed by [`StartGuard::complete`].
struct StartGuard<'a> {
    lifecycle: &'a Mutex<Lifecycle>,
    registration: Option<(Arc<dyn DirectoryService>, String)>,
    armed: bool,
}

impl<'a> StartGuard<'a> {
    fn new(lifecycle: &'a Mutex<Lifecycle>) -> Self {
        Self {
            lifecycle,
            registration: None,
            armed: true,
        }
    }

    fn complete(mut self, running: RunningStream) {
        *self.lifecycle.lock() = Lifecycle::Running(running);
        self.armed = false;
    }
}

impl Drop for StartGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        *self.lifecycle.lock() = Lifecycle::Stopped;

        if let Some((directory, title)) = self.registration.take() {
            // Dropped mid-start: no caller is left to await the rollback.
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move {
                    if let Err(e) = directory.unregister(&title).await {
                        tracing::warn!("Failed to roll back registration of '{title}': {e}");
                    }
                });
            }
        }
    }
}

impl StreamingServer {
    /// Validate `config` and build a stopped server.
    ///
    /// Title and advertised host are trimmed; blank values and port 0 are
    /// rejected with [`Error::InvalidArgument`].
    pub fn new(mut config: StreamConfig, directory: Arc<dyn DirectoryService>) -> Result<Self> {
        config.title = normalize_title(&config.title)?;
        config.advertise_host = normalize_host(&config.advertise_host)?;
        config.port = validate_port(u32::from(config.port))?;
        if config.bind_host.trim().is_empty() {
            return Err(Error::invalid_argument("bind host must not be blank"));
        }

        Ok(Self {
            config,
            directory,
            thumbnails: ThumbnailSettings::default(),
            extractor: Arc::new(FfmpegExtractor::default()),
            lifecycle: Mutex::new(Lifecycle::Stopped),
        })
    }

    /// Replace the thumbnail cache location and frame extractor.
    pub fn with_thumbnails(
        mut self,
        settings: ThumbnailSettings,
        extractor: Arc<dyn FrameExtractor>,
    ) -> Self {
        self.thumbnails = settings;
        self.extractor = extractor;
        self
    }

    pub fn title(&self) -> &str {
        &self.config.title
    }

    pub fn port(&self) -> u16 {
        self.config.port
    }

    pub fn file(&self) -> &Path {
        &self.config.file
    }

    pub fn state(&self) -> ServerState {
        self.lifecycle.lock().state()
    }

    pub fn is_running(&self) -> bool {
        self.state() == ServerState::Running
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        match &*self.lifecycle.lock() {
            Lifecycle::Running(running) => Ok(running.local_addr),
            _ => Err(Error::NotRunning),
        }
    }

    /// Validate the file, register with the directory, bind, and begin
    /// accepting connections in the background.
    ///
    /// Any failure, or dropping the returned future before it completes,
    /// leaves the server `Stopped`.
    pub async fn start(&self) -> Result<()> {
        {
            let mut lifecycle = self.lifecycle.lock();
            if !matches!(*lifecycle, Lifecycle::Stopped) {
                return Err(Error::AlreadyRunning);
            }
            *lifecycle = Lifecycle::Starting;
        }

        let mut guard = StartGuard::new(&self.lifecycle);
        let running = self.launch(&mut guard).await?;
        tracing::info!(
            "Streaming '{}' on {} (advertised as {}:{})",
            self.config.title,
            running.local_addr,
            self.config.advertise_host,
            self.config.port
        );
        guard.complete(running);
        Ok(())
    }

    async fn launch(&self, guard: &mut StartGuard<'_>) -> Result<RunningStream> {
        validate_source(&self.config.file).await?;

        guard.registration = Some((self.directory.clone(), self.config.title.clone()));
        if let Err(e) = self
            .directory
            .register(
                &self.config.title,
                &self.config.advertise_host,
                self.config.port,
            )
            .await
        {
            guard.registration = None;
            return Err(e);
        }

        let bind = (self.config.bind_host.as_str(), self.config.port);
        let listener = match TcpListener::bind(bind).await {
            Ok(l) => l,
            Err(e) => {
                tracing::warn!(
                    "Cannot bind {}:{} for '{}': {e}",
                    self.config.bind_host,
                    self.config.port,
                    self.config.title
                );
                if let Err(rollback) = self.directory.unregister(&self.config.title).await {
                    tracing::warn!("Failed to roll back registration: {rollback}");
                }
                guard.registration = None;
                return Err(Error::Io(e));
            }
        };
        let local_addr = listener.local_addr()?;

        let ctx = Arc::new(ConnectionContext {
            title: self.config.title.clone(),
            file: self.config.file.clone(),
            content_type: content_type_for(&self.config.file),
            thumbnails: ThumbnailCache::new(
                self.config.file.clone(),
                &self.config.title,
                self.thumbnails.clone(),
                self.extractor.clone(),
            ),
            request_timeout: self.config.request_timeout,
        });

        let cancel = CancellationToken::new();
        let accept_task = tokio::spawn(accept_loop(
            listener,
            ctx,
            cancel.clone(),
            self.config.shutdown_grace,
        ));

        Ok(RunningStream {
            local_addr,
            cancel,
            accept_task,
        })
    }

    /// Deregister, stop accepting, and wait for in-flight connections.
    ///
    /// Does nothing unless the server is running.
    pub async fn stop(&self) {
        let running = {
            let mut lifecycle = self.lifecycle.lock();
            match std::mem::replace(&mut *lifecycle, Lifecycle::Stopping) {
                Lifecycle::Running(running) => running,
                other => {
                    *lifecycle = other;
                    return;
                }
            }
        };

        if let Err(e) = self.directory.unregister(&self.config.title).await {
            tracing::warn!("Failed to unregister '{}': {e}", self.config.title);
        }

        running.cancel.cancel();
        if let Err(e) = running.accept_task.await {
            tracing::warn!("Accept loop for '{}' ended abnormally: {e}", self.config.title);
        }

        *self.lifecycle.lock() = Lifecycle::Stopped;
        tracing::info!("Stopped streaming '{}'", self.config.title);
    }
}

impl Drop for StreamingServer {
    fn drop(&mut self) {
        if let Lifecycle::Running(running) = &*self.lifecycle.lock() {
            running.cancel.cancel();
        }
    }
}

async fn validate_source(path: &Path) -> Result<()> {
    let meta = tokio::fs::metadata(path)
        .await
        .map_err(|e| Error::invalid_video_file(path, format!("cannot access file: {e}")))?;
    if !meta.is_file() {
        return Err(Error::invalid_video_file(path, "not a regular file"));
    }
    tokio::fs::File::open(path)
        .await
        .map_err(|e| Error::invalid_video_file(path, format!("not readable: {e}")))?;
    Ok(())
}

/// Accept connections until cancelled, then give workers `grace` to finish.
async fn accept_loop(
    listener: TcpListener,
    ctx: Arc<ConnectionContext>,
    cancel: CancellationToken,
    grace: Duration,
) {
    let mut workers = JoinSet::new();

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    tracing::debug!("Connection from {peer} for '{}'", ctx.title);
                    workers.spawn(connection::handle(stream, peer, ctx.clone()));
                }
                Err(e) => {
                    tracing::warn!("Accept error on '{}': {e}", ctx.title);
                    tokio::time::sleep(Duration::from_millis(50)).await;
                }
            },
            Some(joined) = workers.join_next(), if !workers.is_empty() => {
                if let Err(e) = joined {
                    if e.is_panic() {
                        tracing::warn!("Connection worker panicked: {e}");
                    }
                }
            }
        }
    }

    drop(listener);

    let drain = async {
        while workers.join_next().await.is_some() {}
    };
    if tokio::time::timeout(grace, drain).await.is_err() {
        tracing::warn!(
            "Aborting {} connection(s) for '{}' after {:?}",
            workers.len(),
            ctx.title,
            grace
        );
        workers.abort_all();
        while workers.join_next().await.is_some() {}
    }
}
