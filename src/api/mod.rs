//! Read-only JSON view of the directory for browsers.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use streamdir_common::VideoLocation;
use streamdir_directory::DirectoryService;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

/// Shared state for the façade handlers
#[derive(Clone)]
pub struct ApiContext {
    pub directory: Arc<dyn DirectoryService>,
    /// Directory coordinates reported by `/api/health`
    pub directory_host: String,
    pub directory_port: u16,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub directory_host: String,
    pub directory_port: u16,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoEntry {
    pub title: String,
    pub host: String,
    pub port: u16,
    pub url: String,
    pub thumbnail_url: String,
}

impl From<VideoLocation> for VideoEntry {
    fn from(loc: VideoLocation) -> Self {
        Self {
            url: loc.stream_url(),
            thumbnail_url: loc.thumbnail_url(),
            title: loc.title,
            host: loc.host,
            port: loc.port,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct VideosResponse {
    pub count: usize,
    pub videos: Vec<VideoEntry>,
}

/// Create the façade router
pub fn create_router(ctx: ApiContext) -> Router {
    Router::new()
        .route("/api/health", get(health).fallback(method_not_allowed))
        .route("/api/videos", get(videos).fallback(method_not_allowed))
        .fallback(not_found)
        .layer(middleware::from_fn(cors))
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

/// Serve the façade on `listener` until `shutdown` fires
pub async fn serve(
    listener: TcpListener,
    ctx: ApiContext,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("API listening on http://{addr}");
    }
    axum::serve(listener, create_router(ctx))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}

/// Adds permissive CORS headers to every response and answers preflight
/// requests before routing.
async fn cors(req: Request, next: Next) -> Response {
    let mut response = if req.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(req).await
    };

    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    response
}

async fn health(State(ctx): State<ApiContext>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: chrono::Utc::now().to_rfc3339(),
        directory_host: ctx.directory_host,
        directory_port: ctx.directory_port,
    })
}

async fn videos(State(ctx): State<ApiContext>) -> Response {
    match ctx.directory.list().await {
        Ok(list) => {
            let videos: Vec<VideoEntry> = list.into_iter().map(VideoEntry::from).collect();
            Json(VideosResponse {
                count: videos.len(),
                videos,
            })
            .into_response()
        }
        Err(e) => {
            tracing::warn!("Directory listing failed: {e}");
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": "Directory unavailable", "details": e.to_string() })),
            )
                .into_response()
        }
    }
}

async fn method_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({ "error": "Method Not Allowed" })),
    )
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not Found" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;
    use streamdir_directory::Directory;
    use tower::ServiceExt;

    fn ctx(directory: Arc<dyn DirectoryService>) -> ApiContext {
        ApiContext {
            directory,
            directory_host: "localhost".into(),
            directory_port: 1099,
        }
    }

    fn request(method: Method, uri: &str) -> Request {
        axum::http::Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_directory() {
        let app = create_router(ctx(Arc::new(Directory::new())));
        let resp = app.oneshot(request(Method::GET, "/api/health")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");

        let json = body_json(resp).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["directoryHost"], "localhost");
        assert_eq!(json["directoryPort"], 1099);
        assert!(json["timestamp"].is_string());
    }

    #[tokio::test]
    async fn videos_are_listed_with_urls() {
        let directory = Arc::new(Directory::new());
        directory.register("Sintel", "10.0.0.5", 9001).await.unwrap();
        let app = create_router(ctx(directory));

        let resp = app.oneshot(request(Method::GET, "/api/videos")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["count"], 1);
        assert_eq!(json["videos"][0]["title"], "Sintel");
        assert_eq!(json["videos"][0]["url"], "http://10.0.0.5:9001");
        assert_eq!(
            json["videos"][0]["thumbnailUrl"],
            "http://10.0.0.5:9001/thumbnail"
        );
    }

    #[tokio::test]
    async fn preflight_is_no_content() {
        let app = create_router(ctx(Arc::new(Directory::new())));
        let resp = app
            .oneshot(request(Method::OPTIONS, "/api/videos"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            resp.headers()[header::ACCESS_CONTROL_ALLOW_METHODS],
            "GET, OPTIONS"
        );
    }

    #[tokio::test]
    async fn post_is_rejected() {
        let app = create_router(ctx(Arc::new(Directory::new())));
        let resp = app.oneshot(request(Method::POST, "/api/videos")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(body_json(resp).await["error"], "Method Not Allowed");
    }
}
