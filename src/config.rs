//! Model and pipeline configuration.
//!
//! A model is described by a small YAML file that mirrors the parts of a
//! Detectron2 config the runtime needs:
//!
//! ```yaml
//! name: publaynet-faster-rcnn
//! device: auto
//! score_threshold: 0.75
//! label_map: [text, title, list, table, figure]
//! input:
//!   format: BGR
//!   min_size_test: 800
//!   max_size_test: 1333
//! outputs:
//!   boxes: 0
//!   classes: 1
//!   scores: 2
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::reading_order::ReadingOrderConfig;

/// Default label map of PubLayNet-trained models.
pub const DEFAULT_LABEL_MAP: [&str; 5] = ["text", "title", "list", "table", "figure"];

/// Channel order the model expects. Page images are always RGB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum InputFormat {
    Rgb,
    #[default]
    Bgr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    /// CUDA when onnxruntime can register it, CPU otherwise.
    #[default]
    Auto,
    Cpu,
    Cuda,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub format: InputFormat,
    pub min_size_test: u32,
    pub max_size_test: u32,
    /// Static `(width, height)` input of graphs exported with a fixed shape.
    /// Takes precedence over the shortest-edge bounds.
    pub fixed_size: Option<(u32, u32)>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            format: InputFormat::Bgr,
            min_size_test: 800,
            max_size_test: 1333,
            fixed_size: None,
        }
    }
}

/// Positions of the box, class and score tensors among the graph outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub boxes: usize,
    pub classes: usize,
    pub scores: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            boxes: 0,
            classes: 1,
            scores: 2,
        }
    }
}

impl OutputConfig {
    pub(crate) fn max_index(&self) -> usize {
        self.boxes.max(self.classes).max(self.scores)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub name: String,
    pub device: Device,
    pub score_threshold: f32,
    pub label_map: Vec<String>,
    pub input: InputConfig,
    pub outputs: OutputConfig,
    /// onnxruntime intra-op threads, onnxruntime's own default when unset.
    pub intra_threads: Option<usize>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: "detectron2".to_string(),
            device: Device::Auto,
            score_threshold: 0.75,
            label_map: DEFAULT_LABEL_MAP.iter().map(|l| l.to_string()).collect(),
            input: InputConfig::default(),
            outputs: OutputConfig::default(),
            intra_threads: None,
        }
    }
}

impl ModelConfig {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::MissingFile(path.to_path_buf()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_score_threshold(mut self, threshold: f32) -> Result<Self> {
        self.score_threshold = threshold;
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.label_map.is_empty() {
            return Err(Error::InvalidConfig("label_map is empty".to_string()));
        }
        if !(0.0..=1.0).contains(&self.score_threshold) {
            return Err(Error::InvalidConfig(format!(
                "score_threshold {} is outside [0, 1]",
                self.score_threshold
            )));
        }
        let input = &self.input;
        if input.min_size_test == 0 || input.min_size_test > input.max_size_test {
            return Err(Error::InvalidConfig(format!(
                "input size bounds must satisfy 0 < min_size_test <= max_size_test, got {} and {}",
                input.min_size_test, input.max_size_test
            )));
        }
        if let Some((w, h)) = input.fixed_size {
            if w == 0 || h == 0 {
                return Err(Error::InvalidConfig(format!(
                    "fixed_size must be non-zero, got {w}x{h}"
                )));
            }
        }
        let outputs = [self.outputs.boxes, self.outputs.classes, self.outputs.scores];
        if outputs.iter().collect::<HashSet<_>>().len() != outputs.len() {
            return Err(Error::InvalidConfig(format!(
                "output indices must be distinct, got {outputs:?}"
            )));
        }
        Ok(())
    }
}

/// Knobs of the document pipeline. Everything here is fixed for a run.
/// Rasterization resolution belongs to the [`PageRasterizer`] instead.
///
/// [`PageRasterizer`]: crate::render::PageRasterizer
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
    pub use_batch_predictor: bool,
    pub batch_size: usize,
    /// Preprocessing threads of the batch predictor.
    pub workers: usize,
    /// Write page images with the detected boxes drawn on them.
    pub visualize: bool,
    /// Group ordered regions under their titles in the exports.
    pub segment_sections: bool,
    /// Save figure and table crops and embed them in the HTML.
    pub crop_figures: bool,
    pub reading_order: ReadingOrderConfig,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            use_batch_predictor: false,
            batch_size: 1,
            workers: 2,
            visualize: false,
            segment_sections: false,
            crop_figures: true,
            reading_order: ReadingOrderConfig::default(),
        }
    }
}
