mod cli;

use streamdir::{
    api::{self, ApiContext},
    config::{self, Config, StreamEntry},
    shutdown::shutdown_signal,
};
use streamdir_directory::{rpc, Directory, DirectoryService, RemoteDirectory};
use streamdir_server::{FfmpegExtractor, FrameExtractor, StreamingServer};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "streamdir=trace,streamdir_server=trace,streamdir_directory=debug,streamdir_common=debug,tower_http=debug".to_string()
        } else {
            "streamdir=info,streamdir_server=info,streamdir_directory=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Directory { host, port } => {
            let config = config::load_config_or_default(config_path)?;
            let port = port.unwrap_or(config.directory.port);
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run_directory(host, port))
        }
        Commands::Serve { file, title, port } => {
            let config = config::load_config_or_default(config_path)?;
            let entries = match file {
                Some(file) => vec![StreamEntry { file, title, port }],
                None => config.streams.clone(),
            };
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run_streams(config, entries))
        }
        Commands::Api { host, port } => {
            let mut config = config::load_config_or_default(config_path)?;
            if let Some(host) = host {
                config.api.host = host;
            }
            if let Some(port) = port {
                config.api.port = port;
            }
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run_api(config))
        }
        Commands::List { json } => {
            let config = config::load_config_or_default(config_path)?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(list_videos(config, json))
        }
        Commands::CheckTools => {
            let config = config::load_config_or_default(config_path)?;
            check_tools(&config)
        }
        Commands::Validate {
            config: validate_path,
        } => {
            let path = validate_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("streamdir {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn run_directory(host: String, port: u16) -> Result<()> {
    let listener = tokio::net::TcpListener::bind((host.as_str(), port))
        .await
        .with_context(|| format!("Failed to bind directory on {host}:{port}"))?;

    let directory: Arc<dyn DirectoryService> = Arc::new(Directory::new());
    let cancel = CancellationToken::new();
    tokio::spawn(shutdown_signal(cancel.clone()));

    rpc::serve(listener, directory, cancel)
        .await
        .context("Directory service failed")?;

    tracing::info!("Directory service stopped");
    Ok(())
}

fn remote_directory(config: &Config) -> Result<Arc<RemoteDirectory>> {
    let remote = RemoteDirectory::with_timeout(
        &config.directory.host,
        config.directory.port,
        config.directory_timeout(),
    )
    .context("Invalid directory address")?;
    Ok(Arc::new(remote))
}

fn frame_extractor(config: &Config) -> Arc<dyn FrameExtractor> {
    Arc::new(FfmpegExtractor::discover(
        config.thumbnails.ffmpeg_path.as_deref(),
        Duration::from_secs(config.thumbnails.timeout_secs),
    ))
}

async fn run_streams(config: Config, entries: Vec<StreamEntry>) -> Result<()> {
    if entries.is_empty() {
        anyhow::bail!("Nothing to serve: pass a file or add [[streams]] to the config");
    }

    let directory: Arc<dyn DirectoryService> = remote_directory(&config)?;
    let extractor = frame_extractor(&config);

    let mut servers = Vec::with_capacity(entries.len());
    for entry in &entries {
        let server = StreamingServer::new(config.stream_config(entry), directory.clone())
            .with_context(|| format!("Invalid stream {:?}", entry.file))?
            .with_thumbnails(config.thumbnail_settings(), extractor.clone());

        if let Err(e) = server.start().await {
            stop_all(&servers).await;
            return Err(e).with_context(|| {
                format!("Failed to start '{}' on port {}", server.title(), server.port())
            });
        }
        println!(
            "Streaming '{}' on port {} ({})",
            server.title(),
            server.port(),
            server.file().display()
        );
        servers.push(server);
    }

    let cancel = CancellationToken::new();
    shutdown_signal(cancel).await;

    stop_all(&servers).await;
    Ok(())
}

async fn stop_all(servers: &[StreamingServer]) {
    futures::future::join_all(servers.iter().map(|s| s.stop())).await;
}

async fn run_api(config: Config) -> Result<()> {
    let ctx = ApiContext {
        directory: remote_directory(&config)?,
        directory_host: config.directory.host.clone(),
        directory_port: config.directory.port,
    };

    let listener = tokio::net::TcpListener::bind((config.api.host.as_str(), config.api.port))
        .await
        .with_context(|| {
            format!(
                "Failed to bind API on {}:{}",
                config.api.host, config.api.port
            )
        })?;

    let cancel = CancellationToken::new();
    tokio::spawn(shutdown_signal(cancel.clone()));

    api::serve(listener, ctx, cancel)
        .await
        .context("API server failed")?;
    Ok(())
}

async fn list_videos(config: Config, json: bool) -> Result<()> {
    let directory = remote_directory(&config)?;
    let videos = directory
        .list()
        .await
        .context("Failed to list videos")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&videos)?);
        return Ok(());
    }

    if videos.is_empty() {
        println!("No videos registered.");
        return Ok(());
    }
    for video in &videos {
        println!("{}  {}", video, video.stream_url());
    }
    Ok(())
}

fn check_tools(config: &Config) -> Result<()> {
    println!("Checking external tools...\n");

    let extractor = FfmpegExtractor::discover(
        config.thumbnails.ffmpeg_path.as_deref(),
        Duration::from_secs(config.thumbnails.timeout_secs),
    );

    match extractor.program() {
        Some(path) => {
            println!("✓ ffmpeg - {}", path.display());
            println!();
            println!("All required tools are available!");
        }
        None => {
            println!("✗ ffmpeg");
            println!();
            println!("ffmpeg is missing. Install it to enable thumbnails.");
        }
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            print_summary(&config);
        }
        None => {
            println!("No config file specified, using defaults");
            print_summary(&Config::default());
        }
    }

    Ok(())
}

fn print_summary(config: &Config) {
    println!(
        "  Directory: {}:{}",
        config.directory.host, config.directory.port
    );
    println!("  API: {}:{}", config.api.host, config.api.port);
    println!(
        "  Thumbnail cache: {}",
        config
            .thumbnails
            .cache_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("(system temp)"))
            .display()
    );
    println!("  Streams: {}", config.streams.len());
    for entry in &config.streams {
        println!("    {} -> port {}", entry.resolved_title(), entry.port);
    }
}
