mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use streamdir_common::paths::is_video_file;
use streamdir_server::{StreamConfig, ThumbnailSettings};

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./streamdir.toml",
        "./config.toml",
        "~/.config/streamdir/config.toml",
        "/etc/streamdir/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.directory.host.trim().is_empty() {
        anyhow::bail!("Directory host cannot be blank");
    }
    if config.directory.port == 0 {
        anyhow::bail!("Directory port cannot be 0");
    }
    if config.api.host.trim().is_empty() {
        anyhow::bail!("API host cannot be blank");
    }
    if config.api.port == 0 {
        anyhow::bail!("API port cannot be 0");
    }
    if config.streaming.bind_host.trim().is_empty() {
        anyhow::bail!("Streaming bind_host cannot be blank");
    }
    if config.streaming.advertise_host.trim().is_empty() {
        anyhow::bail!("Streaming advertise_host cannot be blank");
    }
    if config.thumbnails.seek_offsets.is_empty() {
        anyhow::bail!("At least one thumbnail seek offset is required");
    }

    let mut ports = HashSet::new();
    for stream in &config.streams {
        if stream.port == 0 {
            anyhow::bail!("Stream {:?} has port 0", stream.file);
        }
        if stream.resolved_title().is_empty() {
            anyhow::bail!("Stream {:?} has a blank title", stream.file);
        }
        if !ports.insert(stream.port) {
            anyhow::bail!("Port {} is used by more than one stream", stream.port);
        }
        if !stream.file.exists() {
            tracing::warn!("Stream file does not exist: {:?}", stream.file);
        } else if !is_video_file(&stream.file) {
            tracing::warn!("Stream file has no known video extension: {:?}", stream.file);
        }
    }

    Ok(())
}

impl Config {
    /// Server configuration for one `[[streams]]` entry.
    pub fn stream_config(&self, entry: &StreamEntry) -> StreamConfig {
        let mut stream = StreamConfig::new(&entry.file, entry.resolved_title(), entry.port);
        stream.bind_host = self.streaming.bind_host.clone();
        stream.advertise_host = self.streaming.advertise_host.clone();
        stream.shutdown_grace = Duration::from_secs(self.streaming.shutdown_grace_secs);
        stream.request_timeout = Duration::from_secs(self.streaming.request_timeout_secs);
        stream
    }

    pub fn thumbnail_settings(&self) -> ThumbnailSettings {
        let mut settings = ThumbnailSettings::default();
        if let Some(dir) = &self.thumbnails.cache_dir {
            settings.cache_dir = dir.clone();
        }
        settings.seek_offsets = self.thumbnails.seek_offsets.clone();
        settings
    }

    pub fn directory_timeout(&self) -> Duration {
        Duration::from_secs(self.directory.request_timeout_secs)
    }
}
