//! Error types for evidence image OCR.

use thiserror::Error;

/// Errors raised while acquiring or recognizing an evidence image.
///
/// A missing or unparseable overlay is not represented here; extraction
/// reports it as `Ok(None)`.
#[derive(Debug, Error)]
pub enum OcrError {
    /// Network failure while fetching a remote image
    #[error("failed to fetch evidence image: {0}")]
    Fetch(#[from] reqwest::Error),

    /// Remote image request returned a non-success status
    #[error("evidence image request returned HTTP {status}")]
    HttpStatus {
        /// HTTP status code
        status: u16,
    },

    /// Malformed inline `data:` URI
    #[error("invalid inline image data: {0}")]
    InlineData(String),

    /// Image bytes could not be decoded
    #[error("failed to decode evidence image: {0}")]
    Decode(#[from] image::ImageError),

    /// The recognizer failed on a processed image
    #[error("text recognition failed: {0}")]
    Recognition(String),

    /// The recognizer could not be constructed
    #[error("recognition engine unavailable: {0}")]
    EngineUnavailable(String),

    /// I/O error (temporary files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for OCR operations.
pub type Result<T> = std::result::Result<T, OcrError>;
