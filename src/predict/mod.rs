mod activation;
mod table;
pub mod tiles;

pub use activation::{ActivationMapper, ActivationMaps};
pub use table::{PredictionRow, ResultsTable};

use crate::config::RunConfig;
use crate::model::{self, Classifier, Provision};
use crate::output;
use crate::progress::{ConsoleProgress, Progress};
use anyhow::{bail, Context, Result};
use image::RgbImage;
use ndarray::Axis;
use std::path::PathBuf;

/// Predict mycorrhizal structures on a large mosaic image
///
/// Walks the tile grid row by row: each row is extracted in column order,
/// normalized, classified as one batch, and fed to the activation mapper
/// before the next row starts. Rows are never cross-batched, so map
/// accumulation and progress reporting stay in grid order.
///
/// # Returns
/// * `Ok(None)` when the image is smaller than a single tile in either
///   axis; this is a legitimate empty input, not an error
/// * `Ok(Some(..))` with the row-major results table and the finalized
///   activation maps otherwise
pub fn predict_image(
    image: &RgbImage,
    model: &dyn Classifier,
    config: &RunConfig,
    progress: &mut dyn Progress,
) -> Result<Option<(ResultsTable, ActivationMaps)>> {
    let edge = config.tile_edge;
    if edge == 0 {
        bail!("tile edge is not set; configure a supported annotation level");
    }

    if model.input_edge() != edge {
        bail!(
            "model expects {} px tiles but the grid is cut at {} px",
            model.input_edge(),
            edge
        );
    }
    if model.class_count() != config.header.len() {
        bail!(
            "model predicts {} classes but the header names {}",
            model.class_count(),
            config.header.len()
        );
    }

    let nrows = image.height() / edge;
    let ncols = image.width() / edge;

    if nrows == 0 || ncols == 0 {
        tracing::warn!(
            "Image ({}x{}) is smaller than a single {}x{} tile, nothing to predict",
            image.width(),
            image.height(),
            edge,
            edge
        );
        return Ok(None);
    }

    let mut mapper = ActivationMapper::new(nrows as usize, ncols as usize, &config.header);
    let mut table = ResultsTable::new(config.header.clone());

    progress.update(0, nrows as usize);

    for r in 0..nrows {
        let batch = tiles::row_batch(image, edge, r, ncols);

        let scores = model
            .predict(&batch, config.batch_size)
            .with_context(|| format!("Prediction failed on tile row {r}"))?;

        mapper
            .generate(model, &batch, r as usize, config.batch_size)
            .with_context(|| format!("Activation mapping failed on tile row {r}"))?;

        progress.update(r as usize + 1, nrows as usize);

        for (c, tile_scores) in scores.axis_iter(Axis(0)).enumerate() {
            table.push(r, c as u32, tile_scores.to_vec());
        }
    }

    Ok(Some((table, mapper.retrieve())))
}

/// Predict every input image with a single shared model
///
/// The model is selected once per run; a load failure or an unsupported
/// annotation level aborts the whole run before any image is touched.
/// Per-image failures propagate and halt the run as well.
pub fn run(paths: &[PathBuf], config: &RunConfig) -> Result<()> {
    let (model, config) = match model::load(config)? {
        Provision::Pretrained { model, config } => (model, config),
        Provision::Fresh(_) => {
            bail!("an untrained model cannot predict; provide a pre-trained model")
        }
        Provision::UnsupportedLevel(level) => {
            bail!("unsupported annotation level '{level}', nothing to predict with")
        }
    };

    for path in paths {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        tracing::info!("Image {}", name);

        let image = image::open(path)
            .with_context(|| format!("Failed to open image {}", path.display()))?
            .to_rgb8();

        let mut progress = ConsoleProgress::new();
        match predict_image(&image, &model, &config, &mut progress)? {
            Some((table, maps)) => {
                output::save(&table, &maps, path)?;
            }
            None => {
                tracing::warn!("Skipping {}: no complete tile", name);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunMode;
    use crate::progress::NullProgress;
    use anyhow::Result;
    use ndarray::{Array2, Array4};

    /// Classifier that scores each tile with its batch index and the red
    /// channel of its first pixel, so tests can check both ordering and
    /// that normalized pixels reached the model
    struct StubClassifier {
        edge: u32,
        classes: usize,
    }

    impl Classifier for StubClassifier {
        fn input_edge(&self) -> u32 {
            self.edge
        }

        fn class_count(&self) -> usize {
            self.classes
        }

        fn predict(&self, batch: &Array4<f32>, _batch_size: usize) -> Result<Array2<f32>> {
            let n = batch.shape()[0];
            Ok(Array2::from_shape_fn((n, self.classes), |(i, k)| {
                if k == 0 {
                    i as f32
                } else {
                    batch[[i, 0, 0, 0]]
                }
            }))
        }
    }

    fn config(level: &str) -> RunConfig {
        RunConfig::new(RunMode::Predict, None, level, 32)
    }

    fn white_image(width: u32, height: u32) -> RgbImage {
        RgbImage::from_pixel(width, height, image::Rgb([255, 255, 255]))
    }

    #[test]
    fn grid_arithmetic_discards_remainder_pixels() {
        // 200x150 at edge 62: 3 columns, 2 rows, remainder discarded
        let model = StubClassifier { edge: 62, classes: 3 };
        let image = white_image(200, 150);
        let (table, maps) = predict_image(&image, &model, &config("RootSegm"), &mut NullProgress)
            .unwrap()
            .unwrap();
        assert_eq!(table.len(), 6);
        assert_eq!(maps.map(0).dim(), (2, 3));
    }

    #[test]
    fn sub_tile_image_yields_no_result() {
        let model = StubClassifier { edge: 62, classes: 3 };
        let image = white_image(61, 200);
        let result = predict_image(&image, &model, &config("RootSegm"), &mut NullProgress).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn indexes_recover_spatial_location() {
        // 248x248 at edge 62: a 4x4 grid, 16 table rows
        let model = StubClassifier { edge: 62, classes: 3 };
        let image = white_image(248, 248);
        let (table, maps) = predict_image(&image, &model, &config("RootSegm"), &mut NullProgress)
            .unwrap()
            .unwrap();

        assert_eq!(table.len(), 16);
        let rows: Vec<u32> = table.rows().iter().map(|r| r.row).collect();
        let cols: Vec<u32> = table.rows().iter().map(|r| r.col).collect();
        assert_eq!(rows, vec![0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3]);
        assert_eq!(cols, vec![0, 1, 2, 3, 0, 1, 2, 3, 0, 1, 2, 3, 0, 1, 2, 3]);
        for (i, row) in table.rows().iter().enumerate() {
            assert_eq!(row.row, i as u32 / 4);
            assert_eq!(row.col, i as u32 % 4);
        }
        assert_eq!(maps.map(0).dim(), (4, 4));
    }

    #[test]
    fn scores_keep_column_order_within_a_row() {
        let model = StubClassifier { edge: 62, classes: 3 };
        let image = white_image(248, 62);
        let (table, _) = predict_image(&image, &model, &config("RootSegm"), &mut NullProgress)
            .unwrap()
            .unwrap();
        // class 0 of the stub is the tile's index within its row batch
        for (c, row) in table.rows().iter().enumerate() {
            assert_eq!(row.scores[0], c as f32);
        }
    }

    #[test]
    fn pixels_reach_the_model_normalized() {
        let model = StubClassifier { edge: 62, classes: 3 };
        let image = white_image(62, 62);
        let (table, _) = predict_image(&image, &model, &config("RootSegm"), &mut NullProgress)
            .unwrap()
            .unwrap();
        // white pixels must arrive as exactly 1.0
        assert_eq!(table.rows()[0].scores[1], 1.0);
    }

    #[test]
    fn class_count_mismatch_with_the_header_is_an_error() {
        // a 4-class model paired with the 3-column RootSegm header
        let model = StubClassifier { edge: 62, classes: 4 };
        let image = white_image(62, 62);
        assert!(predict_image(&image, &model, &config("RootSegm"), &mut NullProgress).is_err());
    }

    #[test]
    fn progress_is_reported_per_row() {
        struct Recorder(Vec<(usize, usize)>);
        impl Progress for Recorder {
            fn update(&mut self, done: usize, total: usize) {
                self.0.push((done, total));
            }
        }

        let model = StubClassifier { edge: 62, classes: 3 };
        let image = white_image(62, 186);
        let mut recorder = Recorder(Vec::new());
        predict_image(&image, &model, &config("RootSegm"), &mut recorder)
            .unwrap()
            .unwrap();
        assert_eq!(recorder.0, vec![(0, 3), (1, 3), (2, 3), (3, 3)]);
    }
}
