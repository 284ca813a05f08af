//! Range-capable single-file streaming server.
//!
//! Each [`StreamingServer`] owns one listening port and one source file. It
//! answers `GET /` and `GET /stream` with the file (honouring `Range`),
//! `GET /thumbnail` with a cached JPEG still, and advertises itself in a
//! [`DirectoryService`](streamdir_directory::DirectoryService) while running.

pub mod command;
pub(crate) mod connection;
pub mod range;
pub mod request;
pub mod response;
pub mod server;
pub mod thumbnail;

pub use server::{ServerState, StreamConfig, StreamingServer};
pub use thumbnail::{FfmpegExtractor, FrameExtractor, ThumbnailSettings};
