use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "streamdir")]
#[command(author, version, about = "Stream video files with range requests and a shared title directory")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the in-memory directory service
    Directory {
        /// Host to bind to
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        /// Port to listen on (defaults to the configured directory port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Stream one file, or every `[[streams]]` entry when no file is given
    Serve {
        /// File to stream
        file: Option<PathBuf>,

        /// Title to advertise (defaults to the file name)
        #[arg(short, long)]
        title: Option<String>,

        /// Port to stream on
        #[arg(short, long, default_value = "9000")]
        port: u16,
    },

    /// Run the read-only JSON API over the directory
    Api {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print every title registered in the directory
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
