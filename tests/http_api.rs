//! HTTP integration tests: a real listener on an ephemeral port, in-memory
//! stores, and the in-process processing delegate.
//!
//! Run with: `cargo test --test http_api`

use chrono::Utc;
use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};
use photoframe_server::cache::ThumbnailCache;
use photoframe_server::error::FrameError;
use photoframe_server::imaging::{FontSet, OverlayRenderer};
use photoframe_server::pipeline::{Collaborators, Pipeline};
use photoframe_server::processing::InProcessDelegate;
use photoframe_server::server::router;
use photoframe_server::store::MemoryStore;
use photoframe_server::types::{AssetLocation, DeviceProfile, Orientation, PhotoAsset, SourceKind};
use photoframe_server::upstream::{AssetLoader, PlaceholderProvider, Weather, WeatherProvider};
use reqwest::StatusCode;
use std::net::SocketAddr;
use std::sync::Arc;
use tempfile::TempDir;

// ===========================================================================
// Collaborator fakes
// ===========================================================================

/// Every asset decodes as a solid image of its stored size.
struct SolidLoader;

impl AssetLoader for SolidLoader {
    fn load(&self, asset: &PhotoAsset) -> Result<DynamicImage, FrameError> {
        Ok(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            asset.width,
            asset.height,
            Rgba([200, 40, 40, 255]),
        )))
    }
}

struct GreyPlaceholder;

impl PlaceholderProvider for GreyPlaceholder {
    fn fetch(&self) -> Result<DynamicImage, FrameError> {
        Ok(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            80,
            48,
            Rgba([128, 128, 128, 255]),
        )))
    }
}

struct NoWeather;

impl WeatherProvider for NoWeather {
    fn current(&self, _latitude: f64, _longitude: f64) -> Result<Weather, FrameError> {
        Err(FrameError::Upstream("offline".into()))
    }
}

// ===========================================================================
// Server setup
// ===========================================================================

fn photo(id: i64, source: SourceKind, width: u32, height: u32, sequence: i64) -> PhotoAsset {
    PhotoAsset {
        id,
        source,
        location: AssetLocation::Local(format!("/photos/{id}.jpg").into()),
        width,
        height,
        orientation: Orientation::of(width, height),
        sequence,
        created_at: Utc::now(),
    }
}

fn kitchen_frame() -> DeviceProfile {
    DeviceProfile {
        id: 1,
        host: "kitchen".into(),
        name: "Kitchen".into(),
        width: 800,
        height: 480,
        orientation: Some(Orientation::Landscape),
        enable_collage: true,
        show_date: false,
        show_weather: false,
        weather_lat: None,
        weather_lon: None,
    }
}

struct TestServer {
    addr: SocketAddr,
    client: reqwest::Client,
    _scratch: TempDir,
}

impl TestServer {
    async fn start() -> Self {
        let store = Arc::new(MemoryStore::with_assets(vec![
            photo(1, SourceKind::Google, 1600, 1200, 0),
            photo(2, SourceKind::Google, 1200, 1600, 0),
            photo(3, SourceKind::Telegram, 1024, 768, 4),
            photo(4, SourceKind::Telegram, 1024, 768, 9),
        ]));
        store.insert_profile(kitchen_frame()).unwrap();

        let scratch = TempDir::new().unwrap();
        let collaborators = Collaborators {
            assets: store.clone(),
            profiles: store,
            loader: Arc::new(SolidLoader),
            placeholder: Arc::new(GreyPlaceholder),
            delegate: Arc::new(InProcessDelegate::new()),
            overlay: OverlayRenderer::new(FontSet::default(), Arc::new(NoWeather)),
        };
        let pipeline = Pipeline::new(collaborators, ThumbnailCache::new(scratch.path()));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(
                listener,
                router(pipeline).into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .unwrap();
        });

        Self {
            addr,
            client: reqwest::Client::new(),
            _scratch: scratch,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    async fn get(&self, path: &str) -> reqwest::Response {
        self.client.get(self.url(path)).send().await.unwrap()
    }
}

fn header<'a>(response: &'a reqwest::Response, name: &str) -> Option<&'a str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}

// ===========================================================================
// Routes
// ===========================================================================

#[tokio::test]
async fn status_reports_ok() {
    let server = TestServer::start().await;
    let response = server.get("/api/status").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn all_source_is_bad_request() {
    let server = TestServer::start().await;
    let response = server.get("/image/all").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("all"));
}

#[tokio::test]
async fn unknown_source_is_empty_not_found() {
    let server = TestServer::start().await;
    let response = server.get("/image/flickr").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(response.bytes().await.unwrap().is_empty());
}

#[tokio::test]
async fn frame_is_png_at_native_size_with_thumbnail() {
    let server = TestServer::start().await;
    let response = server
        .client
        .get(server.url("/image/google_photos"))
        .header("X-Hostname", "kitchen")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "content-type"), Some("image/png"));
    let length: usize = header(&response, "content-length").unwrap().parse().unwrap();

    let id = header(&response, "x-thumbnail-id").unwrap().to_string();
    let url = header(&response, "x-thumbnail-url").unwrap().to_string();
    assert_eq!(
        url,
        format!("http://{}/served-image-thumbnail/{id}", server.addr)
    );

    let body = response.bytes().await.unwrap();
    assert_eq!(body.len(), length);
    let frame = image::load_from_memory(&body).unwrap();
    assert_eq!(frame.dimensions(), (800, 480));

    let thumb = server.client.get(&url).send().await.unwrap();
    assert_eq!(thumb.status(), StatusCode::OK);
    assert_eq!(header(&thumb, "content-type"), Some("image/jpeg"));
    let preview = image::load_from_memory(&thumb.bytes().await.unwrap()).unwrap();
    assert!(preview.width() <= 320 && preview.height() <= 320);
}

#[tokio::test]
async fn display_headers_override_profile_geometry() {
    let server = TestServer::start().await;
    let response = server
        .client
        .get(server.url("/image/google_photos"))
        .header("X-Hostname", "kitchen")
        .header("X-Display-Width", "400")
        .header("X-Display-Height", "240")
        .header("X-Processing-Settings", "{broken")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let frame = image::load_from_memory(&response.bytes().await.unwrap()).unwrap();
    assert_eq!(frame.dimensions(), (400, 240));
}

// ===========================================================================
// Ordered delivery
// ===========================================================================

#[tokio::test]
async fn ordered_updates_advance_then_no_content() {
    let server = TestServer::start().await;

    let first = server.get("/image/telegram/updates/1").await;
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(header(&first, "x-update-id"), Some("4"));

    let second = server.get("/image/telegram/updates/4").await;
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(header(&second, "x-update-id"), Some("9"));

    let done = server.get("/image/telegram/updates/9").await;
    assert_eq!(done.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn zero_cursor_serves_newest() {
    let server = TestServer::start().await;
    let response = server.get("/image/telegram/updates/0").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "x-update-id"), Some("9"));
}

#[tokio::test]
async fn ordered_route_rejects_bad_input() {
    let server = TestServer::start().await;
    assert_eq!(
        server.get("/image/synology/updates/0").await.status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        server.get("/image/telegram/updates/latest").await.status(),
        StatusCode::BAD_REQUEST
    );
}

// ===========================================================================
// Thumbnails
// ===========================================================================

#[tokio::test]
async fn thumbnail_ids_are_validated() {
    let server = TestServer::start().await;
    assert_eq!(
        server.get("/served-image-thumbnail/a.b").await.status(),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        server.get("/served-image-thumbnail/deadbeef").await.status(),
        StatusCode::NOT_FOUND
    );
}
