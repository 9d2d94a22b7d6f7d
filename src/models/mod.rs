//! Layout models and their initialization.

mod detectron2;

use std::path::Path;

pub use detectron2::{map_predictions, Detectron2Model, Detectron2PretrainedModel};

use crate::config::ModelConfig;
use crate::error::{Error, Result};
use crate::metadata::Metadata;

/// Builds a detector from a YAML model config and an ONNX weights file.
///
/// `threshold` replaces the config's score threshold. Returns the detector
/// and the label metadata attached to it.
pub fn initialize_model(
    config_path: impl AsRef<Path>,
    weights_path: impl AsRef<Path>,
    threshold: f32,
) -> Result<(Detectron2Model, Metadata)> {
    let weights_path = weights_path.as_ref();
    if !weights_path.is_file() {
        return Err(Error::MissingFile(weights_path.to_path_buf()));
    }

    let config = ModelConfig::from_yaml_file(config_path)?.with_score_threshold(threshold)?;

    tracing::info!(
        "Initializing model {} with a threshold of {} and the label map {:?} (device: {:?})",
        config.name,
        config.score_threshold,
        config.label_map,
        config.device
    );

    let model = Detectron2Model::new_from_file(weights_path, config)?;
    let metadata = model.metadata().clone();

    Ok((model, metadata))
}
