//! PDF rasterization.

use std::path::Path;

use image::{DynamicImage, RgbaImage};
use pdfium_render::prelude::*;

use crate::error::{Error, Result};

/// Turns a document into one image per page.
pub trait PageRasterizer {
    fn rasterize(&self, path: &Path) -> Result<Vec<DynamicImage>>;
}

/// Renders pages with pdfium, binding `./libpdfium` first and the system
/// library second.
pub struct PdfiumRasterizer {
    pdfium: Pdfium,
    dpi: f32,
}

impl PdfiumRasterizer {
    pub const DEFAULT_DPI: f32 = 144.0;

    pub fn new(dpi: f32) -> Result<Self> {
        if !(dpi.is_finite() && dpi > 0.0) {
            return Err(Error::InvalidConfig(format!("dpi must be positive, got {dpi}")));
        }

        let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library())?;

        Ok(Self {
            pdfium: Pdfium::new(bindings),
            dpi,
        })
    }

    pub fn dpi(&self) -> f32 {
        self.dpi
    }
}

impl PageRasterizer for PdfiumRasterizer {
    fn rasterize(&self, path: &Path) -> Result<Vec<DynamicImage>> {
        let document = self.pdfium.load_pdf_from_file(path, None)?;
        // PDF user space is 72 units per inch
        let render_config = PdfRenderConfig::new()
            .scale_page_by_factor(self.dpi / 72.0)
            .render_form_data(true)
            .render_annotations(true);

        let mut images = vec![];
        for (index, page) in document.pages().iter().enumerate() {
            let bitmap = page.render_with_config(&render_config)?;
            let (width, height) = (bitmap.width() as u32, bitmap.height() as u32);

            let rgba = RgbaImage::from_raw(width, height, bitmap.as_rgba_bytes()).ok_or_else(|| {
                Error::Render(format!(
                    "page {} of {} rendered to a truncated bitmap",
                    index + 1,
                    path.display()
                ))
            })?;
            images.push(DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(rgba).to_rgb8()));
        }

        tracing::debug!("Rendered {} page(s) at {} dpi", images.len(), self.dpi);
        Ok(images)
    }
}
