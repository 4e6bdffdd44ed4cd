mod arch;
mod pretrained;

pub use arch::{Activation, FreshModel, Layer, Loss, OutputHead};
pub use pretrained::PretrainedModel;

use crate::config::{RunConfig, RunMode};
use anyhow::Result;
use ndarray::{Array2, Array4};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    /// The pre-trained model's input is non-square, or square with an edge
    /// length no annotation level supports
    #[error("invalid model input shape: {0}")]
    InvalidModelShape(String),

    /// Prediction was requested without a usable pre-trained model
    #[error("please provide a pre-trained model")]
    MissingPretrainedModel,

    #[error(transparent)]
    Session(#[from] ort::Error),
}

/// Trait for tile classifiers
pub trait Classifier {
    /// Edge length (pixels) of the square tiles the classifier accepts
    fn input_edge(&self) -> u32;

    /// Number of output classes
    fn class_count(&self) -> usize;

    /// Predict class scores for a batch of normalized tiles
    ///
    /// # Arguments
    /// * `batch` - NHWC tensor of shape [n, edge, edge, 3], values in [0, 1]
    /// * `batch_size` - upper bound on how many tiles run through the model
    ///   at once; the batch is chunked internally, never padded
    ///
    /// # Returns
    /// * Scores of shape [n, class_count], preserving batch order
    fn predict(&self, batch: &Array4<f32>, batch_size: usize) -> Result<Array2<f32>>;
}

/// Outcome of model selection
///
/// Callers match on this instead of testing for a missing model after a
/// printed warning.
pub enum Provision {
    /// A pre-trained model, together with the run configuration rebuilt
    /// from its introspected input geometry
    Pretrained {
        model: PretrainedModel,
        config: RunConfig,
    },
    /// A fresh, untrained architecture for the configured level
    Fresh(FreshModel),
    /// The configured annotation level is not one this pipeline supports;
    /// carries the raw configured value
    UnsupportedLevel(String),
}

/// Select a model for this run
///
/// A configured model path that points at an existing file always wins,
/// in any run mode: the file is loaded and the annotation level is derived
/// from its input shape. Without one, prediction mode is a hard error
/// (there are no weights to predict with), while training mode builds an
/// untrained model for the configured level.
pub fn load(config: &RunConfig) -> Result<Provision, ModelError> {
    match config.model.as_deref().filter(|p| p.is_file()) {
        Some(path) => {
            let model = PretrainedModel::load(path)?;
            let config = config.with_level(model.level());
            Ok(Provision::Pretrained { model, config })
        }
        None => match config.run_mode {
            RunMode::Predict => Err(ModelError::MissingPretrainedModel),
            RunMode::Train => match config.annotation_level() {
                Some(level) => {
                    tracing::info!("Creating an untrained {} model", level);
                    Ok(Provision::Fresh(FreshModel::for_level(level)))
                }
                None => {
                    tracing::warn!("Unknown annotation level '{}'", config.level);
                    Ok(Provision::UnsupportedLevel(config.level.clone()))
                }
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnnotationLevel;
    use std::path::PathBuf;

    #[test]
    fn predict_mode_without_a_model_path_is_fatal() {
        let config = RunConfig::new(RunMode::Predict, None, "RootSegm", 32);
        assert!(matches!(
            load(&config),
            Err(ModelError::MissingPretrainedModel)
        ));
    }

    #[test]
    fn predict_mode_with_a_dangling_model_path_is_fatal() {
        let path = PathBuf::from("/nonexistent/trained.onnx");
        let config = RunConfig::new(RunMode::Predict, Some(path), "RootSegm", 32);
        assert!(matches!(
            load(&config),
            Err(ModelError::MissingPretrainedModel)
        ));
    }

    #[test]
    fn train_mode_builds_a_fresh_model_for_the_level() {
        let config = RunConfig::new(RunMode::Train, None, "RootSegm", 32);
        match load(&config) {
            Ok(Provision::Fresh(model)) => {
                assert_eq!(model.level(), AnnotationLevel::RootSegm);
                assert_eq!(model.class_count(), 3);
            }
            _ => panic!("expected a fresh model"),
        }
    }

    #[test]
    fn train_mode_with_an_unknown_level_is_a_typed_outcome() {
        let config = RunConfig::new(RunMode::Train, None, "AllFeatures", 32);
        match load(&config) {
            Ok(Provision::UnsupportedLevel(level)) => assert_eq!(level, "AllFeatures"),
            _ => panic!("expected an unsupported-level outcome"),
        }
    }
}
