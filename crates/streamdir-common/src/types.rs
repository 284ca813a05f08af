//! Core value types and the validation rules they enforce.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Where a titled stream can be reached.
///
/// [`VideoLocation::new`] and deserialization both trim the title and host,
/// reject blank values, and reject port 0.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawLocation")]
pub struct VideoLocation {
    pub title: String,
    pub host: String,
    pub port: u16,
}

impl VideoLocation {
    /// Validate and normalize a `(title, host, port)` triple.
    pub fn new(title: &str, host: &str, port: u16) -> Result<Self> {
        Ok(Self {
            title: normalize_title(title)?,
            host: normalize_host(host)?,
            port: validate_port(u32::from(port))?,
        })
    }

    /// Base URL of the stream (`http://host:port`).
    pub fn stream_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// URL of the stream's thumbnail endpoint.
    pub fn thumbnail_url(&self) -> String {
        format!("{}/thumbnail", self.stream_url())
    }
}

#[derive(Deserialize)]
struct RawLocation {
    title: String,
    host: String,
    port: u16,
}

impl TryFrom<RawLocation> for VideoLocation {
    type Error = Error;

    fn try_from(raw: RawLocation) -> Result<Self> {
        Self::new(&raw.title, &raw.host, raw.port)
    }
}

impl fmt::Display for VideoLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}:{})", self.title, self.host, self.port)
    }
}

/// Trim a title, rejecting blank input.
pub fn normalize_title(title: &str) -> Result<String> {
    non_blank(title, "video title")
}

/// Trim a host name, rejecting blank input.
pub fn normalize_host(host: &str) -> Result<String> {
    non_blank(host, "host")
}

/// Check that `port` lies in `1..=65535`.
///
/// Takes a `u32` so values decoded from the wire can be range-checked before
/// narrowing.
pub fn validate_port(port: u32) -> Result<u16> {
    match u16::try_from(port) {
        Ok(p) if p >= 1 => Ok(p),
        _ => Err(Error::invalid_argument(format!(
            "port must be between 1 and 65535, got {port}"
        ))),
    }
}

fn non_blank(value: &str, field: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::invalid_argument(format!("{field} must not be blank")));
    }
    Ok(trimmed.to_string())
}
