//! Request orchestration: device → selection → canvas → overlay → processing.
//!
//! ```text
//! resolve device ─▶ (detached) profile write-backs
//!      │
//!      ▼  spawn_blocking
//! select ─▶ cover-fit to logical geometry ─▶ overlay ─▶ processing delegate
//!      │
//!      ▼
//! cache preview (if any) ─▶ FrameOutput
//! ```
//!
//! Every collaborator is synchronous, so all work touching stores, decoders
//! or the network runs on the blocking pool. The orchestrator itself holds no
//! per-request state and is cheap to clone into handlers.

use crate::cache::{CachedThumbnail, ThumbnailCache};
use crate::device::{self, DeviceHints, ResolvedDevice};
use crate::error::FrameError;
use crate::imaging::{OverlayOptions, OverlayRenderer, cover_fit};
use crate::processing::{DIMENSION_KEY, Processed, ProcessingDelegate, ProcessingOptions, client_options};
use crate::select::ordered::OrderedItem;
use crate::select::{SelectionKind, Selector};
use crate::store::{AssetStore, DeviceProfileStore};
use crate::types::{SourceFilter, SourceKind};
use crate::upstream::{AssetLoader, PlaceholderProvider};
use chrono::NaiveDate;
use image::DynamicImage;
use std::sync::Arc;

/// Everything the pipeline calls out to.
pub struct Collaborators {
    pub assets: Arc<dyn AssetStore>,
    pub profiles: Arc<dyn DeviceProfileStore>,
    pub loader: Arc<dyn AssetLoader>,
    pub placeholder: Arc<dyn PlaceholderProvider>,
    pub delegate: Arc<dyn ProcessingDelegate>,
    pub overlay: OverlayRenderer,
}

/// Per-request inputs taken from headers.
#[derive(Debug, Clone, Default)]
pub struct FrameRequest {
    pub hints: DeviceHints,
    /// Raw `X-Processing-Settings` value.
    pub settings: Option<String>,
    /// Raw `X-Color-Palette` value.
    pub palette: Option<String>,
}

/// One rendered frame.
#[derive(Debug, Clone)]
pub struct FrameOutput {
    /// Encoded bytes from the processing delegate.
    pub image: Vec<u8>,
    pub thumbnail: Option<CachedThumbnail>,
    pub kind: SelectionKind,
}

#[derive(Debug, Clone)]
pub struct OrderedOutput {
    pub sequence: i64,
    pub frame: FrameOutput,
}

#[derive(Clone)]
pub struct Pipeline {
    collaborators: Arc<Collaborators>,
    thumbnails: ThumbnailCache,
}

impl Pipeline {
    pub fn new(collaborators: Collaborators, thumbnails: ThumbnailCache) -> Self {
        Self {
            collaborators: Arc::new(collaborators),
            thumbnails,
        }
    }

    pub fn thumbnails(&self) -> &ThumbnailCache {
        &self.thumbnails
    }

    /// Render one frame for a display request.
    pub async fn serve_frame(&self, filter: SourceFilter, request: FrameRequest) -> Result<FrameOutput, FrameError> {
        if filter.kind().is_none() {
            return Err(FrameError::InvalidSource(filter.to_string()));
        }
        let device = self.resolve_device(request.hints.clone()).await?;
        let options = processing_options(&device, &request);
        let date = today();

        let c = Arc::clone(&self.collaborators);
        let (processed, kind) = tokio::task::spawn_blocking(move || -> Result<_, FrameError> {
            let selector = Selector::new(c.assets.as_ref(), c.loader.as_ref(), c.placeholder.as_ref());
            let selection = selector.select(filter, device.logical, device.collage)?;
            let processed = compose(&c, &selection.image, &device, date, &options)?;
            Ok((processed, selection.kind))
        })
        .await??;

        tracing::info!(source = %filter, kind = ?kind, bytes = processed.image.len(), "frame rendered");
        Ok(FrameOutput {
            image: processed.image,
            thumbnail: self.cache_thumbnail(processed.thumbnail).await,
            kind,
        })
    }

    /// Render the next ordered item after `cursor`, or `None` when caught up.
    pub async fn serve_ordered(
        &self,
        source: SourceKind,
        cursor: i64,
        request: FrameRequest,
    ) -> Result<Option<OrderedOutput>, FrameError> {
        if !source.is_ordered() {
            return Err(FrameError::NotFound(format!(
                "{} has no ordered delivery",
                source.route_name()
            )));
        }
        let device = self.resolve_device(request.hints.clone()).await?;
        let options = processing_options(&device, &request);
        let date = today();

        let c = Arc::clone(&self.collaborators);
        let rendered = tokio::task::spawn_blocking(move || -> Result<Option<(i64, Processed, SelectionKind)>, FrameError> {
            let selector = Selector::new(c.assets.as_ref(), c.loader.as_ref(), c.placeholder.as_ref());
            let Some(OrderedItem { sequence, selection }) = selector.select_ordered(source, cursor)? else {
                return Ok(None);
            };
            let processed = compose(&c, &selection.image, &device, date, &options)?;
            Ok(Some((sequence, processed, selection.kind)))
        })
        .await??;

        let Some((sequence, processed, kind)) = rendered else {
            return Ok(None);
        };
        tracing::info!(%source, cursor, sequence, "ordered item rendered");
        Ok(Some(OrderedOutput {
            sequence,
            frame: FrameOutput {
                image: processed.image,
                thumbnail: self.cache_thumbnail(processed.thumbnail).await,
                kind,
            },
        }))
    }

    /// Resolve the device and persist header overrides in the background.
    async fn resolve_device(&self, hints: DeviceHints) -> Result<ResolvedDevice, FrameError> {
        let c = Arc::clone(&self.collaborators);
        let resolution = tokio::task::spawn_blocking(move || device::resolve(c.profiles.as_ref(), &hints)).await?;

        if !resolution.write_backs.is_empty() {
            let c = Arc::clone(&self.collaborators);
            let write_backs = resolution.write_backs;
            tokio::task::spawn_blocking(move || device::apply_write_backs(c.profiles.as_ref(), &write_backs));
        }
        Ok(resolution.device)
    }

    /// A failed preview write only costs the preview.
    async fn cache_thumbnail(&self, bytes: Option<Vec<u8>>) -> Option<CachedThumbnail> {
        let bytes = bytes?;
        match self.thumbnails.put(&bytes).await {
            Ok(cached) => Some(cached),
            Err(e) => {
                tracing::warn!(error = %e, "could not cache thumbnail");
                None
            }
        }
    }
}

/// Server-owned `dimension` plus whatever the client asked for.
pub fn processing_options(device: &ResolvedDevice, request: &FrameRequest) -> ProcessingOptions {
    let mut options = client_options(request.settings.as_deref(), request.palette.as_deref());
    options.insert(DIMENSION_KEY.to_string(), device.native.to_string());
    options
}

/// Full-frame canvas at logical size, decorated, then handed to the delegate.
fn compose(
    c: &Collaborators,
    image: &DynamicImage,
    device: &ResolvedDevice,
    date: NaiveDate,
    options: &ProcessingOptions,
) -> Result<Processed, FrameError> {
    let canvas = cover_fit(image, device.logical);
    let canvas = c.overlay.apply(
        canvas,
        &OverlayOptions {
            show_date: device.show_date,
            weather: device.weather,
            date,
        },
    );
    c.delegate.process(&canvas, options)
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}
