//! Error taxonomy of the composition pipeline.
//!
//! Most of these never reach a caller: acquisition failures (missing file,
//! corrupt bytes, empty pool) degrade to the placeholder, and overlay data
//! failures (weather, fonts) degrade to skipping that element. What does
//! surface is mapped to an HTTP status in [`crate::server`].

use crate::store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FrameError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid source filter: {0}")]
    InvalidSource(String),
    #[error("decode failed: {0}")]
    Decode(#[from] image::ImageError),
    #[error("upstream request failed: {0}")]
    Upstream(String),
    #[error("invalid client parameters: {0}")]
    ConfigurationInvalid(String),
    #[error("processing failed: {0}")]
    Processing(String),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("composition task failed: {0}")]
    TaskFailed(String),
}

impl From<reqwest::Error> for FrameError {
    fn from(err: reqwest::Error) -> Self {
        FrameError::Upstream(err.to_string())
    }
}

impl From<tokio::task::JoinError> for FrameError {
    fn from(err: tokio::task::JoinError) -> Self {
        FrameError::TaskFailed(err.to_string())
    }
}
