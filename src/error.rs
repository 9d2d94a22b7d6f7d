use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("ort (onnxruntime) error: {0}")]
    Ort(#[from] ort::Error),
    #[error("hf-hub: {0}")]
    HuggingFace(#[from] hf_hub::api::sync::ApiError),
    #[error("image: {0}")]
    Image(#[from] image::ImageError),
    #[error("pdfium: {0}")]
    Pdfium(#[from] pdfium_render::prelude::PdfiumError),
    #[error("tensor shape: {0}")]
    Shape(#[from] ndarray::ShapeError),
    #[error("worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("model config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[cfg(feature = "ocr")]
    #[error("tesseract: {0}")]
    Tesseract(#[from] tesseract::TesseractError),
    #[error("rendering failed: {0}")]
    Render(String),
    #[error("file not found: {}", .0.display())]
    MissingFile(PathBuf),
    #[error("invalid model config: {0}")]
    InvalidConfig(String),
    #[error("model is incompatible with its config: {0}")]
    IncompatibleModel(String),
    #[error("class index {index} is outside the label map ({len} labels)")]
    UnknownClass { index: i64, len: usize },
    /// The session run failed. Exported Detectron2 graphs do this on pages
    /// without a single proposal.
    #[error("no proposals (onnxruntime: {0})")]
    NoProposals(String),
    #[error("inference failed for image {index}: {source}")]
    Inference {
        index: usize,
        #[source]
        source: Box<Error>,
    },
    #[error("{stage} requires {requires} to run first")]
    Stage {
        stage: &'static str,
        requires: &'static str,
    },
    #[error("{}: {source}", .path.display())]
    Document {
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
