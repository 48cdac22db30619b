//! HTTP surface.
//!
//! | Route | Response |
//! |---|---|
//! | `GET /image/{source}` | `image/png` frame; `X-Thumbnail-URL` / `X-Thumbnail-ID` when a preview was cached |
//! | `GET /image/{source}/updates/{cursor}` | next ordered item with `X-Update-ID`, or `204 No Content` |
//! | `GET /served-image-thumbnail/{id}` | cached `image/jpeg` preview |
//! | `GET /api/status` | `{"status":"ok"}` |
//!
//! Failures answer with a JSON body `{"error": "..."}`. An unknown source
//! name is a bare 404, the same as any unmatched route.

use crate::cache::CacheError;
use crate::device::{DeviceHints, client_address};
use crate::error::FrameError;
use crate::pipeline::{FrameOutput, FrameRequest, Pipeline};
use crate::types::SourceFilter;
use axum::Json;
use axum::Router;
use axum::extract::{ConnectInfo, Path, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde_json::json;
use std::future::Future;
use std::net::SocketAddr;
use thiserror::Error;

pub const X_HOSTNAME: &str = "x-hostname";
pub const X_DISPLAY_WIDTH: &str = "x-display-width";
pub const X_DISPLAY_HEIGHT: &str = "x-display-height";
pub const X_DISPLAY_ORIENTATION: &str = "x-display-orientation";
pub const X_PROCESSING_SETTINGS: &str = "x-processing-settings";
pub const X_COLOR_PALETTE: &str = "x-color-palette";
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
pub const X_REAL_IP: &str = "x-real-ip";

static X_THUMBNAIL_URL: HeaderName = HeaderName::from_static("x-thumbnail-url");
static X_THUMBNAIL_ID: HeaderName = HeaderName::from_static("x-thumbnail-id");
static X_UPDATE_ID: HeaderName = HeaderName::from_static("x-update-id");

/// Errors a handler can answer with.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error(transparent)]
    Thumbnail(#[from] CacheError),
    #[error("{0}")]
    BadRequest(String),
    /// Unknown source name: empty 404 like an unmatched route.
    #[error("no such source")]
    UnknownSource,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Frame(FrameError::InvalidSource(_)) => StatusCode::BAD_REQUEST,
            ApiError::Frame(FrameError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Frame(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Thumbnail(CacheError::InvalidId(_)) => StatusCode::BAD_REQUEST,
            ApiError::Thumbnail(CacheError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Thumbnail(CacheError::Io(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::UnknownSource => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if matches!(self, ApiError::UnknownSource) {
            return status.into_response();
        }
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "request rejected");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub fn router(pipeline: Pipeline) -> Router {
    Router::new()
        .route("/image/{source}", get(display_image))
        .route("/image/{source}/updates/{cursor}", get(ordered_update))
        .route("/served-image-thumbnail/{id}", get(served_thumbnail))
        .route("/api/status", get(status))
        .with_state(pipeline)
}

/// Bind `addr` and serve until `shutdown` resolves.
pub async fn serve(
    pipeline: Pipeline,
    addr: SocketAddr,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "listening");
    axum::serve(
        listener,
        router(pipeline).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
}

async fn status() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn display_image(
    State(pipeline): State<Pipeline>,
    Path(source): Path<String>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let filter = SourceFilter::from_route(&source).ok_or(ApiError::UnknownSource)?;
    let request = frame_request(&headers, peer);
    let output = pipeline.serve_frame(filter, request).await?;
    Ok(png_response(output, host(&headers), None))
}

async fn ordered_update(
    State(pipeline): State<Pipeline>,
    Path((source, cursor)): Path<(String, String)>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let Some(kind) = SourceFilter::from_route(&source).and_then(SourceFilter::kind) else {
        return Err(ApiError::UnknownSource);
    };
    let cursor: i64 = cursor
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid update cursor {cursor:?}")))?;

    let request = frame_request(&headers, peer);
    match pipeline.serve_ordered(kind, cursor, request).await? {
        Some(update) => Ok(png_response(update.frame, host(&headers), Some(update.sequence))),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

async fn served_thumbnail(State(pipeline): State<Pipeline>, Path(id): Path<String>) -> Result<Response, ApiError> {
    let bytes = pipeline.thumbnails().get(&id).await?;
    let headers = [
        (header::CONTENT_TYPE, HeaderValue::from_static("image/jpeg")),
        (header::CACHE_CONTROL, HeaderValue::from_static("no-store")),
    ];
    Ok((StatusCode::OK, headers, bytes).into_response())
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    header_str(headers, name).map(str::to_string)
}

fn host(headers: &HeaderMap) -> Option<&str> {
    header_str(headers, header::HOST.as_str()).filter(|h| !h.is_empty())
}

/// Collect device hints and client tuning parameters from request headers.
pub fn frame_request(headers: &HeaderMap, peer: SocketAddr) -> FrameRequest {
    FrameRequest {
        hints: DeviceHints {
            hostname: header_string(headers, X_HOSTNAME),
            client_addr: client_address(
                header_str(headers, X_FORWARDED_FOR),
                header_str(headers, X_REAL_IP),
                Some(peer.ip()),
            ),
            width: header_string(headers, X_DISPLAY_WIDTH),
            height: header_string(headers, X_DISPLAY_HEIGHT),
            orientation: header_string(headers, X_DISPLAY_ORIENTATION),
        },
        settings: header_string(headers, X_PROCESSING_SETTINGS),
        palette: header_string(headers, X_COLOR_PALETTE),
    }
}

/// Build the frame response with its advertisement headers.
fn png_response(output: FrameOutput, host: Option<&str>, update_id: Option<i64>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("image/png"));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(output.image.len()));

    if let Some(thumb) = &output.thumbnail {
        if let Ok(id) = HeaderValue::from_str(&thumb.id) {
            headers.insert(X_THUMBNAIL_ID.clone(), id);
        }
        if let Some(host) = host {
            let url = format!("http://{host}/served-image-thumbnail/{}", thumb.id);
            match HeaderValue::from_str(&url) {
                Ok(value) => {
                    headers.insert(X_THUMBNAIL_URL.clone(), value);
                }
                Err(e) => tracing::warn!(host, error = %e, "cannot advertise thumbnail URL"),
            }
        }
    }
    if let Some(sequence) = update_id {
        headers.insert(X_UPDATE_ID.clone(), HeaderValue::from(sequence));
    }

    (StatusCode::OK, headers, output.image).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn peer() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 50)), 40000)
    }

    // =========================================================================
    // Header extraction
    // =========================================================================

    #[test]
    fn request_hints_come_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(X_HOSTNAME, HeaderValue::from_static("kitchen"));
        headers.insert(X_DISPLAY_WIDTH, HeaderValue::from_static("1200"));
        headers.insert(X_DISPLAY_ORIENTATION, HeaderValue::from_static("portrait"));
        headers.insert(X_COLOR_PALETTE, HeaderValue::from_static("{\"black\":\"#000\"}"));

        let req = frame_request(&headers, peer());
        assert_eq!(req.hints.hostname.as_deref(), Some("kitchen"));
        assert_eq!(req.hints.width.as_deref(), Some("1200"));
        assert_eq!(req.hints.height, None);
        assert_eq!(req.hints.orientation.as_deref(), Some("portrait"));
        assert_eq!(req.hints.client_addr.as_deref(), Some("192.168.1.50"));
        assert_eq!(req.palette.as_deref(), Some("{\"black\":\"#000\"}"));
        assert_eq!(req.settings, None);
    }

    #[test]
    fn forwarded_address_wins_over_peer() {
        let mut headers = HeaderMap::new();
        headers.insert(X_FORWARDED_FOR, HeaderValue::from_static("10.0.0.7, 172.16.0.1"));
        headers.insert(X_REAL_IP, HeaderValue::from_static("10.0.0.8"));
        let req = frame_request(&headers, peer());
        assert_eq!(req.hints.client_addr.as_deref(), Some("10.0.0.7"));
    }

    // =========================================================================
    // Error mapping
    // =========================================================================

    #[test]
    fn errors_map_to_statuses() {
        let cases = [
            (ApiError::from(FrameError::InvalidSource("all".into())), 400),
            (ApiError::from(FrameError::NotFound("x".into())), 404),
            (ApiError::from(FrameError::Upstream("down".into())), 500),
            (ApiError::from(FrameError::Processing("exit 1".into())), 500),
            (ApiError::from(FrameError::TaskFailed("panic".into())), 500),
            (ApiError::from(CacheError::InvalidId("..".into())), 400),
            (ApiError::from(CacheError::NotFound("abc".into())), 404),
            (ApiError::BadRequest("cursor".into()), 400),
            (ApiError::UnknownSource, 404),
        ];
        for (err, code) in cases {
            assert_eq!(err.into_response().status().as_u16(), code);
        }
    }

    #[test]
    fn frame_response_advertises_thumbnail_and_update() {
        let output = FrameOutput {
            image: vec![1, 2, 3, 4],
            thumbnail: Some(crate::cache::CachedThumbnail {
                id: "abc123".into(),
                path: "/tmp/thumb_abc123.jpg".into(),
                created_at: chrono::Utc::now(),
            }),
            kind: crate::select::SelectionKind::Placeholder,
        };
        let response = png_response(output, Some("frame.local:9607"), Some(42));
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "image/png");
        assert_eq!(headers[header::CONTENT_LENGTH], "4");
        assert_eq!(headers["x-thumbnail-id"], "abc123");
        assert_eq!(
            headers["x-thumbnail-url"],
            "http://frame.local:9607/served-image-thumbnail/abc123"
        );
        assert_eq!(headers["x-update-id"], "42");
    }

    #[test]
    fn no_thumbnail_means_no_advertisement() {
        let output = FrameOutput {
            image: vec![0; 10],
            thumbnail: None,
            kind: crate::select::SelectionKind::Single(1),
        };
        let response = png_response(output, Some("h"), None);
        assert!(response.headers().get("x-thumbnail-url").is_none());
        assert!(response.headers().get("x-thumbnail-id").is_none());
        assert!(response.headers().get("x-update-id").is_none());
    }
}
