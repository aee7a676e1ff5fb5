//! GPS overlay extraction from evidence photos.

use crate::engine::RecognitionEngine;
use crate::error::Result;
use crate::source::ImageSource;
use image::{DynamicImage, GenericImageView, GrayImage};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use ticketwatch_core::OcrConfig;

/// `Lat: <num> ... Lng: <num>`, case-insensitive, signed decimals.
static COORDINATE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)lat:\s*([+-]?\d+(?:\.\d+)?)[\s,;]*lng:\s*([+-]?\d+(?:\.\d+)?)")
        .expect("Coordinate regex is hardcoded and valid")
});

/// Coordinates read from an evidence overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct GpsFix {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
    /// Text the coordinates were parsed from
    pub raw_text: String,
}

/// Reads the coordinate overlay from evidence photos.
#[derive(Debug, Clone)]
pub struct EvidenceGpsExtractor {
    source: ImageSource,
    engine: Arc<RecognitionEngine>,
    band_height: u32,
    threshold: u8,
}

impl EvidenceGpsExtractor {
    /// Create an extractor sharing the given engine.
    #[must_use]
    pub fn new(source: ImageSource, engine: Arc<RecognitionEngine>, config: &OcrConfig) -> Self {
        Self {
            source,
            engine,
            band_height: config.crop_band_height,
            threshold: config.binarize_threshold,
        }
    }

    /// Extract coordinates from the image behind `image_ref`.
    ///
    /// Returns `Ok(None)` when the overlay is absent or unreadable.
    pub async fn extract(&self, image_ref: &str) -> Result<Option<GpsFix>> {
        let image = self.source.load(image_ref).await?;
        let Some(band) = overlay_band(&image, self.band_height, self.threshold) else {
            tracing::debug!("Evidence image is empty; no overlay to read");
            return Ok(None);
        };

        let text = self.engine.recognize(band).await?;
        let fix = parse_coordinates(&text);
        if fix.is_none() {
            tracing::debug!("No coordinates in overlay text {:?}", text.trim());
        }
        Ok(fix)
    }
}

/// Crop the top band of an image and binarize it.
///
/// The band is clipped to the image height. Returns `None` for an empty image.
#[must_use]
pub fn overlay_band(image: &DynamicImage, band_height: u32, threshold: u8) -> Option<GrayImage> {
    let (width, height) = image.dimensions();
    let band_height = band_height.min(height);
    if width == 0 || band_height == 0 {
        return None;
    }
    let mut band = image.crop_imm(0, 0, width, band_height).to_luma8();
    binarize(&mut band, threshold);
    Some(band)
}

/// Map every pixel to black or white around `threshold`.
pub fn binarize(image: &mut GrayImage, threshold: u8) {
    for pixel in image.pixels_mut() {
        pixel.0[0] = if pixel.0[0] >= threshold { 255 } else { 0 };
    }
}

/// Parse `Lat: .. Lng: ..` out of recognized text.
#[must_use]
pub fn parse_coordinates(text: &str) -> Option<GpsFix> {
    let captures = COORDINATE_PATTERN.captures(text)?;
    let latitude: f64 = captures.get(1)?.as_str().parse().ok()?;
    let longitude: f64 = captures.get(2)?.as_str().parse().ok()?;
    if !latitude.is_finite() || !longitude.is_finite() {
        return None;
    }
    Some(GpsFix {
        latitude,
        longitude,
        raw_text: text.trim().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, RgbImage};

    #[test]
    fn test_parse_coordinates() {
        let fix = parse_coordinates("Lat: 42.4440 Lng: -76.5019").unwrap();
        assert!((fix.latitude - 42.444).abs() < f64::EPSILON);
        assert!((fix.longitude - -76.5019).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_coordinates_tolerates_ocr_noise() {
        let fix = parse_coordinates("  2026-02-17 09:41\nLAT:42.4440, lng: -76.5019 |").unwrap();
        assert!((fix.latitude - 42.444).abs() < f64::EPSILON);

        let fix = parse_coordinates("lat: +1 lng: 2").unwrap();
        assert!((fix.latitude - 1.0).abs() < f64::EPSILON);
        assert!((fix.longitude - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_coordinates_no_match() {
        assert!(parse_coordinates("").is_none());
        assert!(parse_coordinates("no overlay here").is_none());
        assert!(parse_coordinates("Lat: 42.4440").is_none());
    }

    #[test]
    fn test_overlay_band_clipped_to_image() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(40, 20));
        let band = overlay_band(&image, 60, 128).unwrap();
        assert_eq!(band.dimensions(), (40, 20));

        let image = DynamicImage::ImageRgb8(RgbImage::new(40, 200));
        let band = overlay_band(&image, 60, 128).unwrap();
        assert_eq!(band.dimensions(), (40, 60));
    }

    #[test]
    fn test_overlay_band_empty_image() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(0, 0));
        assert!(overlay_band(&image, 60, 128).is_none());
    }

    #[test]
    fn test_binarize() {
        let mut image = GrayImage::from_fn(3, 1, |x, _| Luma([[10, 128, 250][x as usize]]));
        binarize(&mut image, 128);
        assert_eq!(image.get_pixel(0, 0).0[0], 0);
        assert_eq!(image.get_pixel(1, 0).0[0], 255);
        assert_eq!(image.get_pixel(2, 0).0[0], 255);
    }
}
