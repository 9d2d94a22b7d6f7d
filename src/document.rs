//! A PDF and everything derived from it on the way to the exports.
//!
//! Stages run in a fixed order: [`Document::to_images`],
//! [`Document::extract_layouts`], [`Document::order_layouts`], then any of
//! the optional enrichments and the `save_*` exports. Calling a stage before
//! the one it depends on is an [`Error::Stage`].

use std::fs;
use std::path::{Path, PathBuf};

use image::DynamicImage;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::export;
use crate::metadata::LayoutClass;
use crate::ocr::TextExtractor;
use crate::pipeline::LayoutDetector;
use crate::reading_order::{order_regions, ReadingOrderConfig};
use crate::render::PageRasterizer;
use crate::visualize;
use crate::Prediction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Stage {
    Created,
    Rasterized,
    Detected,
    Ordered,
}

impl Stage {
    fn operation(&self) -> &'static str {
        match self {
            Stage::Created => "Document::new",
            Stage::Rasterized => "to_images",
            Stage::Detected => "extract_layouts",
            Stage::Ordered => "order_layouts",
        }
    }
}

/// A region placed in reading order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Region {
    /// Position in the page's reading order, from 0.
    pub order: usize,
    #[serde(flatten)]
    pub prediction: Prediction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Crop of the region, relative to the output directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset: Option<String>,
}

impl Region {
    pub fn layout_class(&self) -> Option<LayoutClass> {
        self.prediction.layout_class()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// 1-based page number.
    pub number: usize,
    pub width: u32,
    pub height: u32,
    /// Raw detector output, in model order.
    pub predictions: Vec<Prediction>,
    /// Empty until the layouts are ordered.
    pub regions: Vec<Region>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RegionRef {
    pub page: usize,
    pub order: usize,
}

/// Regions read under the same title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading: Option<RegionRef>,
    pub regions: Vec<RegionRef>,
}

pub struct Document {
    path: PathBuf,
    images: Vec<DynamicImage>,
    pages: Vec<Page>,
    stage: Stage,
}

impl Document {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            images: vec![],
            pages: vec![],
            stage: Stage::Created,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File stem, used to name every output of the document.
    pub fn name(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string())
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn images(&self) -> &[DynamicImage] {
        &self.images
    }

    pub fn region(&self, region: RegionRef) -> Option<&Region> {
        self.pages
            .get(region.page.checked_sub(1)?)?
            .regions
            .get(region.order)
    }

    fn require(&self, operation: &'static str, stage: Stage) -> Result<()> {
        if self.stage < stage {
            return Err(Error::Stage {
                stage: operation,
                requires: stage.operation(),
            });
        }
        Ok(())
    }

    pub fn to_images(&mut self, rasterizer: &dyn PageRasterizer) -> Result<()> {
        self.images = rasterizer.rasterize(&self.path)?;
        self.pages = self
            .images
            .iter()
            .enumerate()
            .map(|(i, img)| Page {
                number: i + 1,
                width: img.width(),
                height: img.height(),
                predictions: vec![],
                regions: vec![],
            })
            .collect();
        self.stage = Stage::Rasterized;

        tracing::info!("Rasterized {} page(s) of {}", self.pages.len(), self.path.display());
        Ok(())
    }

    pub fn extract_layouts(&mut self, detector: &dyn LayoutDetector) -> Result<()> {
        self.require("extract_layouts", Stage::Rasterized)?;

        let predictions = detector.detect(&self.images)?;
        if predictions.len() != self.pages.len() {
            return Err(Error::IncompatibleModel(format!(
                "detector returned {} results for {} pages",
                predictions.len(),
                self.pages.len()
            )));
        }

        for (page, predictions) in self.pages.iter_mut().zip(predictions) {
            tracing::debug!("Page {}: {} region(s)", page.number, predictions.len());
            page.predictions = predictions;
            page.regions.clear();
        }
        self.stage = Stage::Detected;
        Ok(())
    }

    pub fn order_layouts(&mut self, config: &ReadingOrderConfig) -> Result<()> {
        self.require("order_layouts", Stage::Detected)?;

        for page in &mut self.pages {
            let order = order_regions(
                &page.predictions,
                page.width as f32,
                page.height as f32,
                config,
            );
            page.regions = order
                .into_iter()
                .enumerate()
                .map(|(order, i)| Region {
                    order,
                    prediction: page.predictions[i].clone(),
                    text: None,
                    asset: None,
                })
                .collect();
        }
        self.stage = Stage::Ordered;
        Ok(())
    }

    /// Fills in the text of text, title and list regions.
    pub fn extract_text(&mut self, extractor: &mut dyn TextExtractor) -> Result<()> {
        self.require("extract_text", Stage::Ordered)?;

        for (page, img) in self.pages.iter_mut().zip(&self.images) {
            for region in page.regions.iter_mut() {
                if region.layout_class().is_some_and(|c| c.is_textual()) {
                    let crop = region.prediction.crop_from_image(img);
                    region.text = Some(extractor.extract_text(&crop)?);
                }
            }
        }
        Ok(())
    }

    /// Saves figure and table crops under `<out_dir>/<name>_assets/`.
    pub fn save_crops(&mut self, out_dir: &Path) -> Result<Vec<PathBuf>> {
        self.require("save_crops", Stage::Ordered)?;

        let assets = format!("{}_assets", self.name());
        let mut written = vec![];

        for (page, img) in self.pages.iter_mut().zip(&self.images) {
            for region in page.regions.iter_mut() {
                if region.layout_class().is_some_and(|c| c.is_textual()) {
                    continue;
                }
                let crop = region.prediction.crop_from_image(img);
                if crop.width() == 0 || crop.height() == 0 {
                    continue;
                }
                if written.is_empty() {
                    fs::create_dir_all(out_dir.join(&assets))?;
                }
                let relative = format!("{assets}/page{}_region{}.png", page.number, region.order);
                let path = out_dir.join(&relative);
                crop.save(&path)?;
                region.asset = Some(relative);
                written.push(path);
            }
        }
        Ok(written)
    }

    /// Saves every page with its detected boxes drawn under `<out_dir>/<name>_pages/`.
    pub fn save_visualizations(&self, out_dir: &Path) -> Result<Vec<PathBuf>> {
        self.require("save_visualizations", Stage::Detected)?;

        let dir = out_dir.join(format!("{}_pages", self.name()));
        fs::create_dir_all(&dir)?;

        let mut written = vec![];
        for (page, img) in self.pages.iter().zip(&self.images) {
            let path = dir.join(format!("page{}.png", page.number));
            visualize::draw_predictions(img, &page.predictions).save(&path)?;
            written.push(path);
        }
        Ok(written)
    }

    /// Splits the ordered regions into sections, each opened by a title.
    /// Regions before the first title form an untitled section.
    pub fn sections(&self) -> Result<Vec<Section>> {
        self.require("sections", Stage::Ordered)?;

        let mut sections: Vec<Section> = vec![];
        for page in &self.pages {
            for region in &page.regions {
                let region_ref = RegionRef {
                    page: page.number,
                    order: region.order,
                };
                if region.layout_class() == Some(LayoutClass::Title) {
                    sections.push(Section {
                        heading: Some(region_ref),
                        regions: vec![],
                    });
                    continue;
                }
                match sections.last_mut() {
                    Some(section) => section.regions.push(region_ref),
                    None => sections.push(Section {
                        heading: None,
                        regions: vec![region_ref],
                    }),
                }
            }
        }
        Ok(sections)
    }

    pub fn save_as_json(&self, out_dir: &Path, segment_sections: bool) -> Result<PathBuf> {
        self.require("save_as_json", Stage::Ordered)?;

        let sections = if segment_sections {
            Some(self.sections()?)
        } else {
            None
        };
        let path = out_dir.join(format!("{}.json", self.name()));
        fs::write(&path, export::json::to_json(self, sections.as_deref())?)?;

        tracing::info!("Saved layout as {}", path.display());
        Ok(path)
    }

    pub fn save_as_html(&self, out_dir: &Path, segment_sections: bool) -> Result<PathBuf> {
        self.require("save_as_html", Stage::Ordered)?;

        let sections = if segment_sections {
            Some(self.sections()?)
        } else {
            None
        };
        let path = out_dir.join(format!("{}.html", self.name()));
        fs::write(&path, export::html::to_html(self, sections.as_deref()))?;

        tracing::info!("Saved layout as {}", path.display());
        Ok(path)
    }
}
