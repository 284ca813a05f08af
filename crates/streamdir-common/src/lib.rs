//! Streamdir-Common: Shared types, validation, and utilities.
//!
//! This crate provides common functionality used across streamdir:
//!
//! - **Core Types**: [`VideoLocation`], the value the directory hands out
//! - **Validation**: Title, host, and port normalization shared by the
//!   directory and the streaming server
//! - **Path Utilities**: Content-type detection by file extension
//! - **Error Handling**: Common error type and result alias
//!
//! # Examples
//!
//! ```
//! use streamdir_common::{VideoLocation, Error, Result};
//! use streamdir_common::paths::content_type_for;
//! use std::path::Path;
//!
//! let location = VideoLocation::new("  Big Buck Bunny ", "10.0.0.5", 9000).unwrap();
//! assert_eq!(location.title, "Big Buck Bunny");
//!
//! assert_eq!(content_type_for(Path::new("movie.mkv")), "video/x-matroska");
//!
//! fn example() -> Result<()> {
//!     Err(Error::invalid_argument("title must not be blank"))
//! }
//! assert!(example().is_err());
//! ```

pub mod error;
pub mod paths;
pub mod types;

pub use error::{Error, Result};
pub use types::*;
