//! streamdir-directory: the title → location registry.
//!
//! - [`DirectoryService`]: the four-operation contract every caller codes
//!   against (register, unregister, get, list)
//! - [`Directory`]: the in-memory, concurrent implementation
//! - [`rpc`]: an Axum router exposing a [`Directory`] over HTTP+JSON
//! - [`RemoteDirectory`]: a client that speaks that protocol and implements
//!   [`DirectoryService`] itself, so callers cannot tell local from remote

pub mod client;
pub mod memory;
pub mod rpc;
pub mod service;

pub use client::RemoteDirectory;
pub use memory::Directory;
pub use service::DirectoryService;
