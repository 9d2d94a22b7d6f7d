//! # Overview
//!
//! Detects layout regions (text, title, list, table, figure) on the pages of
//! PDF documents with [Detectron2](https://github.com/facebookresearch/detectron2)
//! models exported to ONNX and run through onnxruntime (bindings via
//! [ort](https://github.com/pykeio/ort)), puts them in reading order and
//! exports them as JSON and HTML.
//!
//! ```no_run
//! use doclayout_ort::{models::initialize_model, render::PdfiumRasterizer, Pipeline, PipelineOptions};
//!
//! # fn main() -> doclayout_ort::Result<()> {
//! let (model, _metadata) = initialize_model("model.yaml", "model.onnx", 0.7)?;
//! let rasterizer = PdfiumRasterizer::new(144.0)?;
//! let mut pipeline = Pipeline::new(&rasterizer, &model, PipelineOptions::default());
//! pipeline.run("pdfs".as_ref(), "out".as_ref())?;
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod config;
pub mod document;
mod error;
pub mod export;
pub mod metadata;
pub mod models;
pub mod ocr;
pub mod pipeline;
mod prediction;
pub mod reading_order;
pub mod render;
pub mod transforms;
mod utils;
pub mod visualize;

pub use error::{Error, Result};

// re-exports
pub use geo_types;
pub use image;
pub use ort;

pub use batch::BatchPredictor;
pub use config::{ModelConfig, PipelineOptions};
pub use document::Document;
pub use metadata::Metadata;
pub use pipeline::{LayoutDetector, Pipeline};
pub use prediction::Prediction;
