//! Text extraction for textual regions.

#[cfg(feature = "ocr")]
mod agent;

#[cfg(feature = "ocr")]
pub use agent::TesseractAgent;

use crate::Result;

/// Reads the text in a cropped region image.
pub trait TextExtractor {
    fn extract_text(&mut self, img: &image::DynamicImage) -> Result<String>;
}
