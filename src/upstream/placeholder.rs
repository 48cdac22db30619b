//! Fallback image used when the pool is empty or unreadable.

use crate::error::FrameError;
use image::DynamicImage;
use reqwest::blocking::Client;
use std::time::Duration;

/// Supplies a stand-in photograph. Its failure is the only selection error
/// that reaches the caller.
pub trait PlaceholderProvider: Send + Sync {
    fn fetch(&self) -> Result<DynamicImage, FrameError>;
}

/// Fetches the placeholder over HTTP on every call.
pub struct HttpPlaceholder {
    client: Client,
    url: String,
}

impl HttpPlaceholder {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, FrameError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

impl PlaceholderProvider for HttpPlaceholder {
    fn fetch(&self) -> Result<DynamicImage, FrameError> {
        tracing::debug!(url = %self.url, "fetching placeholder");
        let response = self.client.get(&self.url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(FrameError::Upstream(format!(
                "placeholder returned status {}",
                status.as_u16()
            )));
        }
        let bytes = response.bytes()?;
        Ok(image::load_from_memory(&bytes)?)
    }
}
