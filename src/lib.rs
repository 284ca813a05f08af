//! Streamdir - single-file video streaming with a shared title directory
//!
//! This library crate exposes the application shell for integration testing.

pub mod api;
pub mod config;
pub mod shutdown;
