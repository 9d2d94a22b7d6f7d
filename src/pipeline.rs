//! The per-directory document loop.

use std::fs;
use std::path::{Path, PathBuf};

use image::DynamicImage;

use crate::batch::{BatchPredictor, ImagePredictor};
use crate::config::PipelineOptions;
use crate::document::Document;
use crate::error::{Error, Result};
use crate::models::Detectron2Model;
use crate::ocr::TextExtractor;
use crate::render::PageRasterizer;
use crate::Prediction;

/// Anything that turns page images into one prediction list per image.
pub trait LayoutDetector {
    fn detect(&self, images: &[DynamicImage]) -> Result<Vec<Vec<Prediction>>>;
}

impl LayoutDetector for Detectron2Model {
    fn detect(&self, images: &[DynamicImage]) -> Result<Vec<Vec<Prediction>>> {
        images.iter().map(|img| self.predict(img)).collect()
    }
}

impl<P: ImagePredictor> LayoutDetector for BatchPredictor<P> {
    fn detect(&self, images: &[DynamicImage]) -> Result<Vec<Vec<Prediction>>> {
        self.predict(images).collect()
    }
}

/// What a processed document produced.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentReport {
    pub source: PathBuf,
    pub pages: usize,
    pub regions: usize,
    pub json: PathBuf,
    pub html: PathBuf,
}

pub struct Pipeline<'a> {
    rasterizer: &'a dyn PageRasterizer,
    detector: &'a dyn LayoutDetector,
    text_extractor: Option<Box<dyn TextExtractor + 'a>>,
    options: PipelineOptions,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        rasterizer: &'a dyn PageRasterizer,
        detector: &'a dyn LayoutDetector,
        options: PipelineOptions,
    ) -> Self {
        Self {
            rasterizer,
            detector,
            text_extractor: None,
            options,
        }
    }

    pub fn with_text_extractor(mut self, extractor: Box<dyn TextExtractor + 'a>) -> Self {
        self.text_extractor = Some(extractor);
        self
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Processes every PDF in `docs_dir`, one after the other, writing the
    /// exports to `out_dir`. The first failing document stops the run.
    pub fn run(&mut self, docs_dir: &Path, out_dir: &Path) -> Result<Vec<DocumentReport>> {
        let paths = pdf_files(docs_dir)?;
        if paths.is_empty() {
            tracing::info!("No PDF documents in {}", docs_dir.display());
            return Ok(vec![]);
        }
        fs::create_dir_all(out_dir)?;

        let mut reports = Vec::with_capacity(paths.len());
        for path in paths {
            tracing::info!("document path: {}", path.display());
            let report = self
                .process(&path, out_dir)
                .map_err(|source| Error::Document {
                    path: path.clone(),
                    source: Box::new(source),
                })?;
            reports.push(report);
        }

        Ok(reports)
    }

    /// Runs every stage on a single document.
    pub fn process(&mut self, path: &Path, out_dir: &Path) -> Result<DocumentReport> {
        let mut doc = Document::new(path);

        doc.to_images(self.rasterizer)?;
        doc.extract_layouts(self.detector)?;
        if self.options.visualize {
            doc.save_visualizations(out_dir)?;
        }
        doc.order_layouts(&self.options.reading_order)?;
        if let Some(extractor) = self.text_extractor.as_deref_mut() {
            doc.extract_text(extractor)?;
        }
        if self.options.crop_figures {
            doc.save_crops(out_dir)?;
        }

        let json = doc.save_as_json(out_dir, self.options.segment_sections)?;
        let html = doc.save_as_html(out_dir, self.options.segment_sections)?;

        Ok(DocumentReport {
            source: path.to_path_buf(),
            pages: doc.pages().len(),
            regions: doc.pages().iter().map(|p| p.regions.len()).sum(),
            json,
            html,
        })
    }
}

/// PDF files directly inside `dir`, sorted by name.
pub fn pdf_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = vec![];
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_pdf = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if is_pdf && path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}
