//! Hand-off of the composed canvas to the final tone-mapping step.
//!
//! The canvas arrives at the device's logical size. The option map always
//! carries [`DIMENSION_KEY`] with the native panel size; the delegate alone
//! decides whether to rotate. Two implementations ship:
//!
//! | Delegate | When | Does |
//! |---|---|---|
//! | [`CommandDelegate`] | `processing.command` configured | runs an external tool on temp files |
//! | [`InProcessDelegate`] | otherwise | rotate + Lanczos3 resize + PNG, JPEG preview |

mod command;
mod in_process;
pub mod options;

pub use command::CommandDelegate;
pub use in_process::InProcessDelegate;
pub use options::{DIMENSION_KEY, ProcessingOptions, client_options};

use crate::error::FrameError;
use crate::types::Geometry;
use image::RgbaImage;

/// Final bytes of one rendered frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Processed {
    /// Encoded PNG sent to the device.
    pub image: Vec<u8>,
    /// JPEG preview, if the delegate produced one.
    pub thumbnail: Option<Vec<u8>>,
}

/// Final encoding step. Called from the blocking pool.
pub trait ProcessingDelegate: Send + Sync {
    fn process(&self, canvas: &RgbaImage, options: &ProcessingOptions) -> Result<Processed, FrameError>;
}

/// Parse a `"{width}x{height}"` dimension option.
pub fn parse_dimension(value: &str) -> Option<Geometry> {
    let (w, h) = value.trim().split_once(['x', 'X'])?;
    let width: u32 = w.trim().parse().ok()?;
    let height: u32 = h.trim().parse().ok()?;
    (width > 0 && height > 0).then_some(Geometry::new(width, height))
}
