//! Shared text recognition engine.
//!
//! The engine owns at most one recognizer. It is constructed on first use,
//! every call is serialized through it, and [`RecognitionEngine::shutdown`]
//! releases it.

use crate::error::{OcrError, Result};
use image::GrayImage;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use ticketwatch_core::OcrConfig;
use tokio::sync::Mutex;

/// Blocking text recognizer for preprocessed images.
pub trait TextRecognizer: Send + Sync {
    /// Recognize the text in a grayscale image.
    fn recognize(&self, image: &GrayImage) -> Result<String>;
}

type RecognizerFactory = dyn Fn() -> Result<Arc<dyn TextRecognizer>> + Send + Sync;

/// Lazily constructed, serialized recognizer shared across extractions.
pub struct RecognitionEngine {
    factory: Arc<RecognizerFactory>,
    slot: Arc<Mutex<Option<Arc<dyn TextRecognizer>>>>,
    constructions: Arc<AtomicUsize>,
}

impl RecognitionEngine {
    /// Create an engine that builds its recognizer with `factory` on first use.
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn TextRecognizer>> + Send + Sync + 'static,
    {
        Self {
            factory: Arc::new(factory),
            slot: Arc::new(Mutex::new(None)),
            constructions: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Engine backed by the Tesseract CLI.
    #[must_use]
    pub fn tesseract(config: &OcrConfig) -> Self {
        let language = config.language.clone();
        let psm = config.page_segmentation_mode;
        Self::new(move || {
            let recognizer = TesseractRecognizer::new(language.clone(), psm)?;
            Ok(Arc::new(recognizer) as Arc<dyn TextRecognizer>)
        })
    }

    /// Recognize text, constructing the recognizer if needed.
    ///
    /// Calls are serialized: the blocking task owns the lock until
    /// recognition finishes, even if the caller stops waiting for it.
    pub async fn recognize(&self, image: GrayImage) -> Result<String> {
        let mut slot = Arc::clone(&self.slot).lock_owned().await;
        let factory = Arc::clone(&self.factory);
        let constructions = Arc::clone(&self.constructions);

        tokio::task::spawn_blocking(move || {
            let recognizer = if let Some(recognizer) = slot.as_ref() {
                Arc::clone(recognizer)
            } else {
                let recognizer = (*factory)()?;
                constructions.fetch_add(1, Ordering::SeqCst);
                tracing::info!("Text recognition engine initialized");
                *slot = Some(Arc::clone(&recognizer));
                recognizer
            };
            recognizer.recognize(&image)
        })
        .await
        .map_err(|e| OcrError::Recognition(e.to_string()))?
    }

    /// Release the recognizer. A later call constructs a new one.
    pub async fn shutdown(&self) {
        if self.slot.lock().await.take().is_some() {
            tracing::info!("Text recognition engine released");
        }
    }

    /// Whether a recognizer currently exists.
    pub async fn is_initialized(&self) -> bool {
        self.slot.lock().await.is_some()
    }

    /// How many recognizers have been constructed so far.
    #[must_use]
    pub fn constructions(&self) -> usize {
        self.constructions.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for RecognitionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecognitionEngine")
            .field("constructions", &self.constructions())
            .finish_non_exhaustive()
    }
}

/// Recognizer that shells out to the `tesseract` binary.
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    language: String,
    page_segmentation_mode: i32,
}

impl TesseractRecognizer {
    /// Verify the Tesseract binary is available and create a recognizer.
    pub fn new(language: String, page_segmentation_mode: i32) -> Result<Self> {
        let version = rusty_tesseract::get_tesseract_version()
            .map_err(|e| OcrError::EngineUnavailable(e.to_string()))?;
        tracing::debug!("Using tesseract {}", version.trim());
        Ok(Self {
            language,
            page_segmentation_mode,
        })
    }
}

impl TextRecognizer for TesseractRecognizer {
    fn recognize(&self, image: &GrayImage) -> Result<String> {
        let file = tempfile::Builder::new()
            .prefix("ticketwatch-ocr-")
            .suffix(".png")
            .tempfile()?;
        image
            .save(file.path())
            .map_err(|e| OcrError::Recognition(e.to_string()))?;

        let input = rusty_tesseract::Image::from_path(file.path().to_path_buf())
            .map_err(|e| OcrError::Recognition(e.to_string()))?;
        let args = rusty_tesseract::Args {
            lang: self.language.clone(),
            psm: Some(self.page_segmentation_mode),
            config_variables: HashMap::new(),
            ..rusty_tesseract::Args::default()
        };
        rusty_tesseract::image_to_string(&input, &args)
            .map_err(|e| OcrError::Recognition(e.to_string()))
    }
}
