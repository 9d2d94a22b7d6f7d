use tesseract::{OcrEngineMode, Tesseract, TesseractError};

use super::TextExtractor;
use crate::Result;

/// Tesseract OCR, reinitialized whenever an image fails to load.
pub struct TesseractAgent {
    data_path: Option<String>,
    lang: String,
    inner: Option<Tesseract>,
}

impl TesseractAgent {
    pub fn new() -> Result<Self> {
        Self::new_with_lang(&["eng"])
    }

    pub fn new_with_lang(lang: &[&str]) -> Result<Self> {
        Self::init(None, lang.join("+"))
    }

    /// `data_path` is a tessdata directory holding the traineddata files, e.g.
    /// <https://github.com/tesseract-ocr/tessdata_fast>.
    pub fn new_data_path(data_path: &str, lang: &[&str]) -> Result<Self> {
        Self::init(Some(data_path.to_string()), lang.join("+"))
    }

    fn init(data_path: Option<String>, lang: String) -> Result<Self> {
        let inner = Self::build(data_path.as_deref(), &lang)?;
        Ok(Self {
            data_path,
            lang,
            inner: Some(inner),
        })
    }

    fn build(data_path: Option<&str>, lang: &str) -> Result<Tesseract> {
        Ok(
            Tesseract::new_with_oem(data_path, Some(lang), OcrEngineMode::Default)
                .map_err(TesseractError::from)?,
        )
    }

    fn reinit(&mut self) -> Result<()> {
        self.inner = Some(Self::build(self.data_path.as_deref(), &self.lang)?);
        Ok(())
    }
}

impl TextExtractor for TesseractAgent {
    fn extract_text(&mut self, img: &image::DynamicImage) -> Result<String> {
        let img = img.to_rgba8();
        let (width, height) = img.dimensions();
        let bytes_per_line = 4 * width;

        let inner = match self.inner.take() {
            Some(inner) => inner,
            None => Self::build(self.data_path.as_deref(), &self.lang)?,
        };

        let mut inner = match inner
            .set_frame(
                img.as_raw(),
                width as i32,
                height as i32,
                4,
                bytes_per_line as i32,
            )
            .map_err(TesseractError::from)
        {
            Ok(tess) => tess,
            Err(err) => {
                self.reinit()?;
                return Err(err.into());
            }
        };

        let text = inner.get_text().map_err(TesseractError::from)?;
        self.inner = Some(inner);

        Ok(text.trim().to_string())
    }
}
