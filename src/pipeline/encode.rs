//! Image encoding: PNG file on disk → base64 payload for the detection request.
//!
//! The detection service accepts the image inline in a JSON body. The bytes
//! are sent exactly as the renderer wrote them; no re-encoding happens here,
//! so what the service sees is what a developer finds in the temp file.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;
use std::path::Path;
use tracing::debug;

/// Inline image as sent to the table-detection service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImagePayload {
    /// Standard base64 (with padding) of the raw file bytes.
    pub image: String,
    pub mime_type: &'static str,
}

/// Read the PNG at `path` and base64-encode it.
pub async fn encode_png_file(path: &Path) -> std::io::Result<ImagePayload> {
    let bytes = tokio::fs::read(path).await?;
    Ok(encode_png_bytes(&bytes))
}

pub fn encode_png_bytes(bytes: &[u8]) -> ImagePayload {
    let image = STANDARD.encode(bytes);
    debug!("Encoded {} PNG bytes → {} bytes base64", bytes.len(), image.len());
    ImagePayload {
        image,
        mime_type: "image/png",
    }
}
