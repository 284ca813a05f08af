//! Client side of the directory RPC transport.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use streamdir_common::{normalize_host, validate_port, Error, Result, VideoLocation};

use crate::rpc::{
    ErrorBody, GetResponse, ListResponse, RegisterRequest, TitleRequest, GET_PATH, LIST_PATH,
    REGISTER_PATH, UNREGISTER_PATH,
};
use crate::service::DirectoryService;

/// Default per-call timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// A [`DirectoryService`] reached over HTTP at `host:port`.
///
/// Transport failures (refused connections, timeouts, replies that are not
/// the expected JSON) surface as [`Error::DirectoryUnreachable`]; a `400`
/// from the directory surfaces as [`Error::InvalidArgument`].
#[derive(Debug, Clone)]
pub struct RemoteDirectory {
    client: Client,
    host: String,
    port: u16,
    base_url: String,
}

impl RemoteDirectory {
    /// Create a client for the directory at `host:port` with the default
    /// timeout.
    pub fn new(host: &str, port: u16) -> Result<Self> {
        Self::with_timeout(host, port, DEFAULT_TIMEOUT)
    }

    /// Create a client with an explicit per-call timeout.
    pub fn with_timeout(host: &str, port: u16, timeout: Duration) -> Result<Self> {
        let host = normalize_host(host)?;
        let port = validate_port(u32::from(port))?;

        let client = Client::builder().timeout(timeout).build().unwrap_or_else(|e| {
            tracing::warn!("Failed to build HTTP client with timeout: {}", e);
            Client::new()
        });

        Ok(Self {
            client,
            base_url: format!("http://{host}:{port}"),
            host,
            port,
        })
    }

    /// Directory host this client talks to.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Directory port this client talks to.
    pub fn port(&self) -> u16 {
        self.port
    }

    async fn call<B: Serialize>(&self, path: &str, body: &B) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::directory_unreachable(format!("{url}: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|b| b.message)
            .unwrap_or(text);

        if status == StatusCode::BAD_REQUEST {
            Err(Error::invalid_argument(message))
        } else {
            Err(Error::directory_unreachable(format!(
                "{url} returned {status}: {message}"
            )))
        }
    }

    async fn call_json<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        self.call(path, body)
            .await?
            .json::<T>()
            .await
            .map_err(|e| Error::directory_unreachable(format!("malformed reply from {path}: {e}")))
    }
}

#[async_trait::async_trait]
impl DirectoryService for RemoteDirectory {
    async fn register(&self, title: &str, host: &str, port: u16) -> Result<()> {
        let req = RegisterRequest {
            title: title.to_string(),
            host: host.to_string(),
            port: u32::from(port),
        };
        self.call(REGISTER_PATH, &req).await.map(|_| ())
    }

    async fn unregister(&self, title: &str) -> Result<()> {
        let req = TitleRequest {
            title: title.to_string(),
        };
        self.call(UNREGISTER_PATH, &req).await.map(|_| ())
    }

    async fn get(&self, title: &str) -> Result<Option<VideoLocation>> {
        let req = TitleRequest {
            title: title.to_string(),
        };
        let reply: GetResponse = self.call_json(GET_PATH, &req).await?;
        Ok(reply.location)
    }

    async fn list(&self) -> Result<Vec<VideoLocation>> {
        let reply: ListResponse = self.call_json(LIST_PATH, &serde_json::json!({})).await?;
        Ok(reply.videos)
    }
}
