//! Image payload helpers shared by the edit and animate flows.
//!
//! The image model returns pictures as `data:` URIs and the video model
//! consumes raw bytes plus a MIME type, so both directions of the
//! conversion live here, along with filename helpers for saving results.

use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use sha2::{Digest, Sha256};

/// MIME type assumed when the model omits one.
pub const DEFAULT_IMAGE_MIME: &str = "image/png";

/// A decoded `data:<mime>;base64,<payload>` URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl DataUri {
    /// Parse a base64 data URI into its MIME type and decoded bytes.
    pub fn parse(uri: &str) -> Result<Self, DataUriError> {
        let rest = uri
            .strip_prefix("data:")
            .ok_or_else(|| DataUriError::InvalidScheme(truncate_for_error(uri)))?;

        let (mime_type, payload) = rest
            .split_once(";base64,")
            .ok_or(DataUriError::MissingBase64Payload)?;

        let mime_type = if mime_type.is_empty() {
            DEFAULT_IMAGE_MIME.to_string()
        } else {
            mime_type.to_string()
        };

        let data = STANDARD.decode(payload)?;
        Ok(Self { mime_type, data })
    }

    /// Render bytes back into a `data:` URI.
    pub fn encode(mime_type: &str, data: &[u8]) -> String {
        format!("data:{};base64,{}", mime_type, STANDARD.encode(data))
    }
}

fn truncate_for_error(uri: &str) -> String {
    let mut short: String = uri.chars().take(32).collect();
    if short.len() < uri.len() {
        short.push_str("...");
    }
    short
}

/// Errors from [`DataUri::parse`].
#[derive(Debug, thiserror::Error)]
pub enum DataUriError {
    #[error("Not a data URI: {0}")]
    InvalidScheme(String),

    #[error("Data URI has no base64 payload")]
    MissingBase64Payload,

    #[error("Invalid base64 payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
}

/// Guess an image MIME type from a file extension.
///
/// Returns `None` for extensions the upstream models do not accept.
pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        _ => None,
    }
}

/// File extension for a MIME type, used when naming saved results.
pub fn extension_for_mime(mime_type: &str) -> &'static str {
    match mime_type {
        "image/jpeg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/bmp" => "bmp",
        _ => "png",
    }
}

/// Short stable filename stem derived from the given byte seeds.
pub fn stable_stem(seeds: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for seed in seeds {
        hasher.update(seed);
    }
    let result = hasher.finalize();
    // First 16 bytes (32 hex chars) keeps filenames short
    hex::encode(&result[..16])
}
