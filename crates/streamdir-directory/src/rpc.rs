//! HTTP+JSON transport for the directory.
//!
//! Every operation is `POST /rpc/<method>` with a JSON body, mirroring a
//! "call method by name on a remote object" boundary:
//!
//! | method       | body                  | reply                         |
//! |--------------|-----------------------|-------------------------------|
//! | `register`   | `{title, host, port}` | `204`                         |
//! | `unregister` | `{title}`             | `204`                         |
//! | `get`        | `{title}`             | `{"location": loc or null}`   |
//! | `list`       | ignored               | `{"videos": [loc, ...]}`      |
//!
//! Failures carry `{"error": kind, "message": text}`; `InvalidArgument` is a
//! `400`, everything else a `500`.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use streamdir_common::{validate_port, Error, VideoLocation};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::service::DirectoryService;

pub const REGISTER_PATH: &str = "/rpc/register";
pub const UNREGISTER_PATH: &str = "/rpc/unregister";
pub const GET_PATH: &str = "/rpc/get";
pub const LIST_PATH: &str = "/rpc/list";

/// Shared handle the handlers operate on.
pub type SharedDirectory = Arc<dyn DirectoryService>;

/// Body of `register`. The port is wide so out-of-range values reach
/// validation instead of failing deserialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub title: String,
    pub host: String,
    pub port: u32,
}

/// Body of `unregister` and `get`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TitleRequest {
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetResponse {
    pub location: Option<VideoLocation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse {
    pub videos: Vec<VideoLocation>,
}

/// Error payload shared by every method.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

/// Wrapper so handlers can return `Result<T, RpcError>` directly.
#[derive(Debug)]
pub struct RpcError(pub Error);

impl From<Error> for RpcError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            Error::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(error = %self.0, "Directory call failed");
        } else {
            tracing::debug!(error = %self.0, "Directory call rejected");
        }

        let message = match &self.0 {
            Error::InvalidArgument(msg) => msg.clone(),
            other => other.to_string(),
        };
        let body = ErrorBody {
            error: self.0.kind().to_string(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

/// Build the RPC router for a directory.
pub fn router(directory: SharedDirectory) -> Router {
    Router::new()
        .route(REGISTER_PATH, post(register))
        .route(UNREGISTER_PATH, post(unregister))
        .route(GET_PATH, post(get))
        .route(LIST_PATH, post(list))
        .layer(TraceLayer::new_for_http())
        .with_state(directory)
}

/// Serve the RPC router on `listener` until `shutdown` fires.
pub async fn serve(
    listener: TcpListener,
    directory: SharedDirectory,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("Directory service listening on {addr}");
    }
    axum::serve(listener, router(directory))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}

async fn register(
    State(directory): State<SharedDirectory>,
    Json(req): Json<RegisterRequest>,
) -> Result<StatusCode, RpcError> {
    let port = validate_port(req.port)?;
    directory.register(&req.title, &req.host, port).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn unregister(
    State(directory): State<SharedDirectory>,
    Json(req): Json<TitleRequest>,
) -> Result<StatusCode, RpcError> {
    directory.unregister(&req.title).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get(
    State(directory): State<SharedDirectory>,
    Json(req): Json<TitleRequest>,
) -> Result<Json<GetResponse>, RpcError> {
    let location = directory.get(&req.title).await?;
    Ok(Json(GetResponse { location }))
}

async fn list(State(directory): State<SharedDirectory>) -> Result<Json<ListResponse>, RpcError> {
    let videos = directory.list().await?;
    Ok(Json(ListResponse { videos }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Directory;
    use axum::body::Body;
    use axum::http::{header, Request};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn app() -> (Router, Arc<Directory>) {
        let dir = Arc::new(Directory::new());
        (router(dir.clone()), dir)
    }

    fn post_json(path: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn register_returns_no_content() {
        let (app, dir) = app();
        let resp = app
            .oneshot(post_json(
                REGISTER_PATH,
                serde_json::json!({"title": "Sintel", "host": "h", "port": 9000}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert_eq!(dir.len(), 1);
    }

    #[tokio::test]
    async fn register_out_of_range_port_is_bad_request() {
        let (app, dir) = app();
        let resp = app
            .oneshot(post_json(
                REGISTER_PATH,
                serde_json::json!({"title": "Sintel", "host": "h", "port": 70000}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = body_json(resp).await;
        assert_eq!(body["error"], "InvalidArgument");
        assert!(dir.is_empty());
    }

    #[tokio::test]
    async fn get_reports_missing_as_null() {
        let (app, _dir) = app();
        let resp = app
            .oneshot(post_json(GET_PATH, serde_json::json!({"title": "nope"})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert!(body["location"].is_null());
    }

    #[tokio::test]
    async fn list_returns_sorted_videos() {
        let (app, dir) = app();
        dir.register("b", "h", 2).await.unwrap();
        dir.register("A", "h", 1).await.unwrap();

        let resp = app
            .oneshot(post_json(LIST_PATH, serde_json::json!({})))
            .await
            .unwrap();
        let body = body_json(resp).await;
        assert_eq!(body["videos"][0]["title"], "A");
        assert_eq!(body["videos"][1]["title"], "b");
    }
}
