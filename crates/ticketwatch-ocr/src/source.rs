//! Evidence image acquisition.

use crate::error::{OcrError, Result};
use base64::Engine as _;
use image::DynamicImage;
use std::time::Duration;
use ticketwatch_core::OcrConfig;

/// Fetches evidence images from inline `data:` URIs or over HTTP.
#[derive(Debug, Clone)]
pub struct ImageSource {
    client: reqwest::Client,
}

impl ImageSource {
    /// Create a source whose HTTP fetches are bounded by the configured timeout.
    pub fn new(config: &OcrConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .build()?;
        Ok(Self { client })
    }

    /// Raw bytes behind an image reference.
    pub async fn acquire(&self, image_ref: &str) -> Result<Vec<u8>> {
        if image_ref.starts_with("data:") {
            return decode_inline(image_ref);
        }

        tracing::debug!("Fetching evidence image {}", image_ref);
        let response = self.client.get(image_ref).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(OcrError::HttpStatus {
                status: status.as_u16(),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }

    /// Acquire and decode an image.
    pub async fn load(&self, image_ref: &str) -> Result<DynamicImage> {
        let bytes = self.acquire(image_ref).await?;
        Ok(image::load_from_memory(&bytes)?)
    }
}

/// Decode a base64 `data:` URI payload.
fn decode_inline(uri: &str) -> Result<Vec<u8>> {
    let (header, payload) = uri
        .split_once(',')
        .ok_or_else(|| OcrError::InlineData("missing ',' separator".to_string()))?;
    if !header.ends_with(";base64") {
        return Err(OcrError::InlineData(format!(
            "unsupported encoding in '{header}'"
        )));
    }
    base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| OcrError::InlineData(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_inline() {
        let bytes = decode_inline("data:image/png;base64,aGVsbG8=").unwrap();
        assert_eq!(bytes, b"hello");
    }

    #[test]
    fn test_decode_inline_rejects_plain_encoding() {
        let err = decode_inline("data:text/plain,hello").unwrap_err();
        assert!(matches!(err, OcrError::InlineData(_)));
    }

    #[test]
    fn test_decode_inline_rejects_missing_payload() {
        assert!(decode_inline("data:image/png;base64").is_err());
        assert!(decode_inline("data:image/png;base64,!!!").is_err());
    }
}
