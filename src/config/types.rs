use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub directory: DirectoryConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub streaming: StreamingConfig,

    #[serde(default)]
    pub thumbnails: ThumbnailConfig,

    #[serde(default)]
    pub streams: Vec<StreamEntry>,
}

/// Where the directory service listens, and how clients reach it.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DirectoryConfig {
    #[serde(default = "default_directory_host")]
    pub host: String,

    #[serde(default = "default_directory_port")]
    pub port: u16,

    /// Timeout for each RPC call made by clients (default: 5)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_directory_host() -> String {
    "localhost".to_string()
}

fn default_directory_port() -> u16 {
    1099
}

fn default_request_timeout() -> u64 {
    5
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            host: default_directory_host(),
            port: default_directory_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_host")]
    pub host: String,

    #[serde(default = "default_api_port")]
    pub port: u16,
}

fn default_api_host() -> String {
    "0.0.0.0".to_string()
}

fn default_api_port() -> u16 {
    8080
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_api_host(),
            port: default_api_port(),
        }
    }
}

/// Settings shared by every stream served by `serve`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StreamingConfig {
    /// Interface stream listeners bind to
    #[serde(default = "default_bind_host")]
    pub bind_host: String,

    /// Host name published in the directory
    #[serde(default = "default_advertise_host")]
    pub advertise_host: String,

    /// Seconds in-flight connections get to finish on stop (default: 5)
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_secs: u64,

    /// Seconds a client has to send its request head (default: 10)
    #[serde(default = "default_head_timeout")]
    pub request_timeout_secs: u64,
}

fn default_bind_host() -> String {
    "0.0.0.0".to_string()
}

fn default_advertise_host() -> String {
    "localhost".to_string()
}

fn default_shutdown_grace() -> u64 {
    5
}

fn default_head_timeout() -> u64 {
    10
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            bind_host: default_bind_host(),
            advertise_host: default_advertise_host(),
            shutdown_grace_secs: default_shutdown_grace(),
            request_timeout_secs: default_head_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ThumbnailConfig {
    /// Cache directory (default: `<tmp>/streamdir-thumbnails`)
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// Explicit ffmpeg binary; otherwise looked up on PATH
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    #[serde(default = "default_thumbnail_timeout")]
    pub timeout_secs: u64,

    /// Offsets tried in order, `HH:MM:SS`
    #[serde(default = "default_seek_offsets")]
    pub seek_offsets: Vec<String>,
}

fn default_thumbnail_timeout() -> u64 {
    20
}

fn default_seek_offsets() -> Vec<String> {
    vec!["00:00:10".to_string(), "00:00:01".to_string()]
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            ffmpeg_path: None,
            timeout_secs: default_thumbnail_timeout(),
            seek_offsets: default_seek_offsets(),
        }
    }
}

/// One file to serve.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StreamEntry {
    pub file: PathBuf,

    /// Title to advertise (default: file stem)
    #[serde(default)]
    pub title: Option<String>,

    pub port: u16,
}

impl StreamEntry {
    /// Advertised title, falling back to the file name without extension.
    pub fn resolved_title(&self) -> String {
        match &self.title {
            Some(t) if !t.trim().is_empty() => t.trim().to_string(),
            _ => self
                .file
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default(),
        }
    }
}
