use std::path::Path;

use ndarray::{ArrayView1, ArrayView2, Ix1, Ix2};
use ort::{Session, SessionBuilder, SessionOutputs};

pub use crate::error::{Error, Result};
use crate::config::{Device, InputConfig, InputFormat, ModelConfig, OutputConfig, DEFAULT_LABEL_MAP};
use crate::metadata::Metadata;
use crate::transforms::{self, PreparedImage, Resize};
use crate::{utils::vec_to_bbox, Prediction};

/// A Detectron2 layout model exported to ONNX.
#[derive(Debug)]
pub struct Detectron2Model {
    model_name: String,
    model: ort::Session,
    config: ModelConfig,
    metadata: Metadata,
    resize: Resize,
}

/// Detectron2 exports from [unstructured-inference](https://github.com/Unstructured-IO/unstructured-inference/) on Hugging Face.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detectron2PretrainedModel {
    FASTER_RCNN_R_50_FPN_3X,
    MASK_RCNN_X_101_32X8D_FPN_3x,
}

impl Detectron2PretrainedModel {
    pub fn name(&self) -> &str {
        self.hf_repo()
    }

    pub fn hf_repo(&self) -> &str {
        match self {
            Self::FASTER_RCNN_R_50_FPN_3X => "unstructuredio/detectron2_faster_rcnn_R_50_FPN_3x",
            Self::MASK_RCNN_X_101_32X8D_FPN_3x => {
                "unstructuredio/detectron2_mask_rcnn_X_101_32x8d_FPN_3x"
            }
        }
    }

    pub fn hf_filename(&self) -> &str {
        "model.onnx"
    }

    /// Index of the score tensor; the mask head adds an output before it.
    pub fn confidence_score_index(&self) -> usize {
        match self {
            Self::FASTER_RCNN_R_50_FPN_3X => 2,
            Self::MASK_RCNN_X_101_32X8D_FPN_3x => 3,
        }
    }

    /// These graphs take a fixed 800x1035 RGB input.
    pub fn model_config(&self) -> ModelConfig {
        ModelConfig {
            name: self.name().to_string(),
            device: Device::Auto,
            score_threshold: Detectron2Model::DEFAULT_CONFIDENCE_THRESHOLD,
            label_map: DEFAULT_LABEL_MAP.iter().map(|l| l.to_string()).collect(),
            input: InputConfig {
                format: InputFormat::Rgb,
                fixed_size: Some((800, 1035)),
                ..InputConfig::default()
            },
            outputs: OutputConfig {
                boxes: 0,
                classes: 1,
                scores: self.confidence_score_index(),
            },
            intra_threads: None,
        }
    }
}

impl Detectron2Model {
    pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.8;

    pub fn pretrained(p_model: Detectron2PretrainedModel) -> Result<Self> {
        Self::configure_pretrained(p_model, p_model.model_config())
    }

    /// Downloads `p_model` (or reuses the Hugging Face cache) and runs it with `config`.
    pub fn configure_pretrained(
        p_model: Detectron2PretrainedModel,
        config: ModelConfig,
    ) -> Result<Self> {
        let api = hf_hub::api::sync::Api::new()?;
        let filename = api
            .model(p_model.hf_repo().to_string())
            .get(p_model.hf_filename())?;

        Self::new_from_file(filename, config)
    }

    pub fn new_from_file(file_path: impl AsRef<Path>, config: ModelConfig) -> Result<Self> {
        let file_path = file_path.as_ref();
        if !file_path.is_file() {
            return Err(Error::MissingFile(file_path.to_path_buf()));
        }
        config.validate()?;

        let model = session_builder(&config)?.commit_from_file(file_path)?;
        check_graph(&model, &config)?;

        Ok(Self {
            model_name: config.name.clone(),
            metadata: Metadata::new(&config.label_map),
            resize: Resize::from(&config.input),
            model,
            config,
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Detects layout regions on a single page image. A page without
    /// proposals yields no regions.
    pub fn predict(&self, img: &image::DynamicImage) -> Result<Vec<Prediction>> {
        match self.infer(self.prepare(img)) {
            Err(Error::NoProposals(err)) => {
                tracing::warn!(
                    "Ignoring runtime error from onnx (likely due to encountering blank page): {err}"
                );
                Ok(vec![])
            }
            result => result,
        }
    }

    /// Resize and tensor conversion, independent of the session.
    pub fn prepare(&self, img: &image::DynamicImage) -> PreparedImage {
        transforms::prepare(img, self.resize, self.config.input.format)
    }

    /// Runs the session on a prepared image. A failing session run is
    /// reported as [`Error::NoProposals`].
    pub fn infer(&self, prepared: PreparedImage) -> Result<Vec<Prediction>> {
        let scale = prepared.scale();
        let input_name = self.model.inputs[0].name.as_str();

        let outputs = self
            .model
            .run(ort::inputs![input_name => prepared.tensor]?)
            .map_err(|err| Error::NoProposals(err.to_string()))?;
        self.postprocess(&outputs, scale)
    }

    fn postprocess<'s>(
        &self,
        outputs: &SessionOutputs<'s>,
        scale: (f32, f32),
    ) -> Result<Vec<Prediction>> {
        let indices = &self.config.outputs;
        let bboxes = outputs[indices.boxes].try_extract_tensor::<f32>()?;
        let classes = outputs[indices.classes].try_extract_tensor::<i64>()?;
        let scores = outputs[indices.scores].try_extract_tensor::<f32>()?;

        map_predictions(
            bboxes.view().into_dimensionality::<Ix2>()?,
            classes.view().into_dimensionality::<Ix1>()?,
            scores.view().into_dimensionality::<Ix1>()?,
            scale,
            self.config.score_threshold,
            &self.metadata,
        )
    }
}

/// Turns raw `(x1, y1, x2, y2)` boxes, class indices and scores into
/// predictions in original image coordinates, dropping anything scored at or
/// below `threshold`.
pub fn map_predictions(
    boxes: ArrayView2<f32>,
    classes: ArrayView1<i64>,
    scores: ArrayView1<f32>,
    scale: (f32, f32),
    threshold: f32,
    metadata: &Metadata,
) -> Result<Vec<Prediction>> {
    if boxes.ncols() != 4 {
        return Err(Error::IncompatibleModel(format!(
            "expected boxes of 4 coordinates, got {}",
            boxes.ncols()
        )));
    }
    if boxes.nrows() != classes.len() || classes.len() != scores.len() {
        return Err(Error::IncompatibleModel(format!(
            "output lengths differ: {} boxes, {} classes, {} scores",
            boxes.nrows(),
            classes.len(),
            scores.len()
        )));
    }

    let (width_conversion, height_conversion) = scale;
    let mut elements = vec![];

    for (bbox, (class_index, confidence_score)) in boxes
        .rows()
        .into_iter()
        .zip(classes.iter().zip(scores.iter()))
    {
        if *confidence_score <= threshold {
            continue;
        }
        let [x1, y1, x2, y2] = vec_to_bbox(bbox.iter().copied().collect());
        let class_name = metadata.resolve(*class_index)?;

        elements.push(Prediction::from_corners(
            x1 * width_conversion,
            y1 * height_conversion,
            x2 * width_conversion,
            y2 * height_conversion,
            *confidence_score,
            class_name,
        ));
    }

    Ok(elements)
}

fn session_builder(config: &ModelConfig) -> Result<SessionBuilder> {
    let mut builder = Session::builder()?;
    if let Some(threads) = config.intra_threads {
        builder = builder.with_intra_threads(threads)?;
    }

    match config.device {
        Device::Cpu => {}
        Device::Auto | Device::Cuda => {
            if config.device == Device::Cuda && cfg!(not(feature = "cuda")) {
                tracing::warn!("CUDA requested but the `cuda` feature is off, expect a CPU fallback");
            }
            builder = builder
                .with_execution_providers([ort::CUDAExecutionProvider::default().build()])?;
        }
    }

    Ok(builder)
}

fn check_graph(model: &Session, config: &ModelConfig) -> Result<()> {
    if model.inputs.len() != 1 {
        return Err(Error::IncompatibleModel(format!(
            "expected a single image input, found {}",
            model.inputs.len()
        )));
    }
    if model.outputs.len() <= config.outputs.max_index() {
        return Err(Error::IncompatibleModel(format!(
            "config reads output {} but the graph has {} outputs",
            config.outputs.max_index(),
            model.outputs.len()
        )));
    }
    Ok(())
}
