//! Ticketwatch OCR - reads GPS coordinates from evidence photos.
//!
//! Evidence photos carry a text overlay of the form
//! `Lat: 42.4440 Lng: -76.5019` in their top band. The
//! [`EvidenceGpsExtractor`] acquires the image (inline `data:` URI or HTTP),
//! crops and binarizes the band, runs it through the shared
//! [`RecognitionEngine`], and parses the coordinates.
//!
//! Absence of a readable overlay is not an error: extraction returns
//! `Ok(None)`. Only acquisition, decoding and engine failures are errors.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ticketwatch_ocr::{EvidenceGpsExtractor, ImageSource, RecognitionEngine};
//!
//! let engine = Arc::new(RecognitionEngine::tesseract(&config.ocr));
//! let source = ImageSource::new(&config.ocr)?;
//! let extractor = EvidenceGpsExtractor::new(source, Arc::clone(&engine), &config.ocr);
//!
//! if let Some(fix) = extractor.extract("https://tickets.example.gov/img/1.jpg").await? {
//!     println!("{}, {}", fix.latitude, fix.longitude);
//! }
//! engine.shutdown().await;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod engine;
pub mod error;
pub mod extractor;
pub mod source;

// Re-export commonly used types
pub use engine::{RecognitionEngine, TesseractRecognizer, TextRecognizer};
pub use error::{OcrError, Result};
pub use extractor::{parse_coordinates, EvidenceGpsExtractor, GpsFix};
pub use source::ImageSource;
