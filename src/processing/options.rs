//! Client tuning parameters forwarded to the processing step.
//!
//! Devices send two optional JSON headers:
//!
//! - `X-Processing-Settings`: an object such as
//!   `{"exposure": 1.2, "toneMode": "contrast", "compressDynamicRange": true}`.
//!   Each scalar entry becomes one option, with its camelCase key converted
//!   to kebab-case (`toneMode` → `tone-mode`).
//! - `X-Color-Palette`: an object of named colours, forwarded verbatim as
//!   compact JSON under the `palette` option.
//!
//! Malformed input is dropped with a warning; it never fails the request.

use crate::error::FrameError;
use serde_json::Value;
use std::collections::BTreeMap;

/// Option map handed to a [`ProcessingDelegate`](super::ProcessingDelegate).
pub type ProcessingOptions = BTreeMap<String, String>;

/// Native panel size, `"{width}x{height}"`. Always set by the server.
pub const DIMENSION_KEY: &str = "dimension";
pub const PALETTE_KEY: &str = "palette";

/// Keys a client may not set; the server or the delegate owns them.
const RESERVED_KEYS: &[&str] = &[DIMENSION_KEY, PALETTE_KEY, "output", "thumbnail"];

/// Settings keys with a documented meaning for the stock processor.
pub const KNOWN_SETTINGS: &[&str] = &[
    "exposure",
    "saturation",
    "toneMode",
    "contrast",
    "strength",
    "shadowBoost",
    "highlightCompress",
    "midpoint",
    "colorMethod",
    "ditherAlgorithm",
    "compressDynamicRange",
];

/// `shadowBoost` → `shadow-boost`.
pub fn kebab_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for (i, c) in key.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                out.push('-');
            }
            out.push(c.to_ascii_lowercase());
        } else if c == '_' {
            out.push('-');
        } else {
            out.push(c);
        }
    }
    out
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn parse_object(raw: &str, header: &str) -> Result<serde_json::Map<String, Value>, FrameError> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(FrameError::ConfigurationInvalid(format!(
            "{header} must be a JSON object"
        ))),
        Err(e) => Err(FrameError::ConfigurationInvalid(format!("{header}: {e}"))),
    }
}

/// Convert an `X-Processing-Settings` value into option pairs.
pub fn parse_settings(raw: &str) -> Result<ProcessingOptions, FrameError> {
    let map = parse_object(raw, "X-Processing-Settings")?;
    let mut options = ProcessingOptions::new();
    for (key, value) in &map {
        if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            tracing::debug!(key, "ignoring processing setting with unusable key");
            continue;
        }
        let option_key = kebab_case(key);
        if RESERVED_KEYS.contains(&option_key.as_str()) {
            tracing::debug!(key, "ignoring reserved processing setting");
            continue;
        }
        match scalar_text(value) {
            Some(text) => {
                options.insert(option_key, text);
            }
            None => tracing::debug!(key, "ignoring non-scalar processing setting"),
        }
    }
    Ok(options)
}

/// Validate an `X-Color-Palette` value and re-serialize it compactly.
pub fn parse_palette(raw: &str) -> Result<String, FrameError> {
    let map = parse_object(raw, "X-Color-Palette")?;
    serde_json::to_string(&Value::Object(map))
        .map_err(|e| FrameError::ConfigurationInvalid(format!("X-Color-Palette: {e}")))
}

/// Merge both optional headers into one option map, logging and dropping
/// whichever is malformed.
pub fn client_options(settings: Option<&str>, palette: Option<&str>) -> ProcessingOptions {
    let mut options = ProcessingOptions::new();
    if let Some(raw) = settings.filter(|s| !s.trim().is_empty()) {
        match parse_settings(raw) {
            Ok(parsed) => options.extend(parsed),
            Err(e) => tracing::warn!(error = %e, "dropping processing settings"),
        }
    }
    if let Some(raw) = palette.filter(|s| !s.trim().is_empty()) {
        match parse_palette(raw) {
            Ok(compact) => {
                options.insert(PALETTE_KEY.to_string(), compact);
            }
            Err(e) => tracing::warn!(error = %e, "dropping colour palette"),
        }
    }
    options
}
