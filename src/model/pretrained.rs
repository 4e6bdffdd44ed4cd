use super::{Classifier, ModelError};
use crate::config::AnnotationLevel;
use anyhow::Result;
use ndarray::{Array2, Array4, Axis, Ix2};
use ort::{GraphOptimizationLevel, Session};
use std::path::Path;

/// A trained tile classifier backed by an ONNX Runtime session
///
/// The annotation level is not trusted from configuration; it is derived
/// from the model file itself by inspecting the input tensor shape.
pub struct PretrainedModel {
    session: Session,
    edge: u32,
    classes: usize,
    level: AnnotationLevel,
}

impl PretrainedModel {
    /// Load a pre-trained model from an ONNX file
    ///
    /// Fails with [`ModelError::InvalidModelShape`] when the input is
    /// non-square or its edge length matches no annotation level. Models
    /// are exported channels-last, so the input tensor reads as
    /// [batch, height, width, channels].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        let path = path.as_ref();
        if let Some(name) = path.file_name() {
            tracing::info!("Pre-trained model: {}", name.to_string_lossy());
        }

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?
            .commit_from_file(path)?;

        let input_dims = session.inputs[0]
            .input_type
            .tensor_dimensions()
            .cloned()
            .ok_or_else(|| {
                ModelError::InvalidModelShape("model input is not a tensor".to_string())
            })?;
        let output_dims = session.outputs[0]
            .output_type
            .tensor_dimensions()
            .cloned()
            .ok_or_else(|| {
                ModelError::InvalidModelShape("model output is not a tensor".to_string())
            })?;

        let (edge, classes, level) = geometry_from_dims(&input_dims, &output_dims)?;
        tracing::info!(
            "Model expects {}x{} tiles, {} classes ({} level)",
            edge,
            edge,
            classes,
            level
        );

        Ok(Self {
            session,
            edge,
            classes,
            level,
        })
    }

    /// Annotation level derived from the model's tile edge length
    pub fn level(&self) -> AnnotationLevel {
        self.level
    }
}

impl Classifier for PretrainedModel {
    fn input_edge(&self) -> u32 {
        self.edge
    }

    fn class_count(&self) -> usize {
        self.classes
    }

    fn predict(&self, batch: &Array4<f32>, batch_size: usize) -> Result<Array2<f32>> {
        let _span = tracing::debug_span!("predict_batch").entered();

        let mut scores = Array2::<f32>::zeros((0, self.classes));
        for chunk in batch.axis_chunks_iter(Axis(0), batch_size.max(1)) {
            let chunk = chunk.to_owned();
            let outputs = self.session.run(ort::inputs![chunk.view()]?)?;
            let out = outputs[0]
                .try_extract_tensor::<f32>()?
                .view()
                .to_owned()
                .into_dimensionality::<Ix2>()?;
            scores.append(Axis(0), out.view())?;
        }

        Ok(scores)
    }
}

/// Derive tile edge, class count, and annotation level from the model's
/// input and output tensor shapes
///
/// Dynamic batch dimensions (-1) are expected in both shapes; the class
/// dimension must be fixed.
fn geometry_from_dims(
    input: &[i64],
    output: &[i64],
) -> Result<(u32, usize, AnnotationLevel), ModelError> {
    if input.len() != 4 {
        return Err(ModelError::InvalidModelShape(format!(
            "expected a 4-dimensional tile input, got {input:?}"
        )));
    }

    let height = input[1];
    let width = input[2];

    if height <= 0 || width <= 0 || height != width {
        return Err(ModelError::InvalidModelShape(format!(
            "rectangular input shape ({width}x{height} pixels)"
        )));
    }

    let edge = width as u32;
    let level = AnnotationLevel::from_tile_edge(edge).ok_or_else(|| {
        ModelError::InvalidModelShape(format!(
            "tile edge {edge} px matches no supported annotation level"
        ))
    })?;

    let classes = match output.last() {
        Some(&n) if n > 0 => n as usize,
        _ => {
            return Err(ModelError::InvalidModelShape(format!(
                "model output shape {output:?} has no fixed class dimension"
            )))
        }
    };

    Ok((edge, classes, level))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_62_maps_to_root_segm() {
        let (edge, classes, level) = geometry_from_dims(&[-1, 62, 62, 3], &[-1, 3]).unwrap();
        assert_eq!(edge, 62);
        assert_eq!(classes, 3);
        assert_eq!(level, AnnotationLevel::RootSegm);
    }

    #[test]
    fn edge_126_maps_to_ir_struct() {
        let (edge, classes, level) = geometry_from_dims(&[-1, 126, 126, 3], &[-1, 4]).unwrap();
        assert_eq!(edge, 126);
        assert_eq!(classes, 4);
        assert_eq!(level, AnnotationLevel::IRStruct);
    }

    #[test]
    fn unsupported_square_edge_is_rejected() {
        assert!(matches!(
            geometry_from_dims(&[-1, 100, 100, 3], &[-1, 3]),
            Err(ModelError::InvalidModelShape(_))
        ));
    }

    #[test]
    fn rectangular_input_is_rejected() {
        assert!(matches!(
            geometry_from_dims(&[-1, 62, 64, 3], &[-1, 3]),
            Err(ModelError::InvalidModelShape(_))
        ));
    }

    #[test]
    fn non_tile_input_rank_is_rejected() {
        assert!(matches!(
            geometry_from_dims(&[-1, 62], &[-1, 3]),
            Err(ModelError::InvalidModelShape(_))
        ));
    }

    #[test]
    fn dynamic_class_dimension_is_rejected() {
        assert!(matches!(
            geometry_from_dims(&[-1, 62, 62, 3], &[-1, -1]),
            Err(ModelError::InvalidModelShape(_))
        ));
    }
}
